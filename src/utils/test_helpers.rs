use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// This function is wrapped in a `Once` block to ensure that the global
/// subscriber is set exactly one time, even when tests are run in parallel.
pub fn setup_test_logging() {
    // In this crate's own unit-test binary, `tracing_test::traced_test` owns
    // the global subscriber and panics if another one is already installed.
    if cfg!(test) {
        return;
    }
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok(); // Ignore the error if it's already set by another crate.
    });
}

/// Writes an executable `sh` script with the given body.
#[cfg(unix)]
pub fn write_script(path: &std::path::Path, body: &str) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("#!/bin/sh\n{body}\n"))?;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

/// Writes a script that prints `stdout`, writes `stderr` and exits with
/// `exit_code`. Used to stand in for compression tools.
#[cfg(unix)]
pub fn write_fake_tool(
    path: &std::path::Path,
    stdout: &str,
    stderr: &str,
    exit_code: i32,
) -> std::io::Result<()> {
    write_script(
        path,
        &format!("printf '%s' '{stdout}'\nprintf '%s' '{stderr}' 1>&2\nexit {exit_code}"),
    )
}
