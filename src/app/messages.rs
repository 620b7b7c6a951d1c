//! Turns errors and batch results into text for the user.
//!
//! Lookups go through tables keyed by error kind and raw OS code, never by
//! matching on error strings.

use std::io;

use super::events::{ToastLevel, UserEvent};
use super::state::BatchSummary;
use crate::core::{CoreError, DedupOutcome, RejectReason};

const IO_KIND_MESSAGES: &[(io::ErrorKind, &str)] = &[
    (io::ErrorKind::NotFound, "The file or folder does not exist"),
    (io::ErrorKind::PermissionDenied, "Permission denied"),
    (io::ErrorKind::AlreadyExists, "The target already exists"),
    (io::ErrorKind::InvalidInput, "The path is invalid"),
    (io::ErrorKind::InvalidData, "The file contents are invalid"),
    (io::ErrorKind::TimedOut, "The operation timed out"),
    (io::ErrorKind::WouldBlock, "The resource is busy"),
    (io::ErrorKind::Interrupted, "The operation was interrupted"),
    (io::ErrorKind::UnexpectedEof, "The file ended unexpectedly"),
    (io::ErrorKind::OutOfMemory, "Not enough memory"),
];

/// Raw OS error codes that have no dedicated `io::ErrorKind`.
#[cfg(unix)]
const OS_CODE_MESSAGES: &[(i32, &str)] = &[
    (24, "Too many open files"),
    (23, "Too many open files in the system"),
    (28, "No space left on the device"),
];

#[cfg(windows)]
const OS_CODE_MESSAGES: &[(i32, &str)] = &[
    (4, "Too many open files"),
    (112, "No space left on the device"),
    (123, "The path is invalid"),
];

#[cfg(not(any(unix, windows)))]
const OS_CODE_MESSAGES: &[(i32, &str)] = &[];

/// A short phrase for an I/O error.
pub fn describe_io(err: &io::Error) -> String {
    if let Some(code) = err.raw_os_error() {
        if let Some((_, text)) = OS_CODE_MESSAGES.iter().find(|(c, _)| *c == code) {
            return (*text).to_string();
        }
    }
    IO_KIND_MESSAGES
        .iter()
        .find(|(kind, _)| *kind == err.kind())
        .map(|(_, text)| (*text).to_string())
        .unwrap_or_else(|| err.to_string())
}

/// The user-facing message for any pipeline error.
pub fn describe(err: &CoreError) -> String {
    match err {
        CoreError::Io(e, path) => format!("{}: {}", describe_io(e), path.display()),
        CoreError::Timeout { .. } => format!("The operation timed out ({err})"),
        CoreError::Join(_) => "An internal task failed".to_string(),
        CoreError::Serialization(_) => "The library file is damaged".to_string(),
        _ => err.to_string(),
    }
}

/// Why a non-accepted outcome did not add anything, or `None` for acceptance.
pub fn outcome_reason(outcome: &DedupOutcome) -> Option<String> {
    match outcome {
        DedupOutcome::Accepted(_) => None,
        DedupOutcome::SkippedExactDuplicate { unit, .. } => {
            Some(format!("{} is already in the library", unit.logical_name))
        }
        DedupOutcome::PathUpdateCandidate { unit, .. } => {
            Some(format!("{} was not relinked", unit.logical_name))
        }
        DedupOutcome::Rejected { unit, reason } => Some(match reason {
            RejectReason::EmptyPath => format!("{}: {}", unit.logical_name, reason),
        }),
    }
}

/// One toast for a finished batch: success if anything was added or
/// relinked, otherwise an error listing every reason.
pub fn batch_toast(summary: &BatchSummary) -> UserEvent {
    if summary.added > 0 || summary.path_updates > 0 {
        let mut parts = Vec::new();
        if summary.added > 0 {
            parts.push(format!("Added {}", summary.added));
        }
        if summary.path_updates > 0 {
            parts.push(format!("relinked {}", summary.path_updates));
        }
        if summary.skipped > 0 {
            parts.push(format!("skipped {} already present", summary.skipped));
        }
        let failed = summary.failures.len().saturating_sub(summary.skipped);
        if failed > 0 {
            parts.push(format!("{failed} failed"));
        }
        return UserEvent::toast(ToastLevel::Success, "Import finished", parts.join(", "));
    }

    let body = if summary.failures.is_empty() {
        "Nothing was added".to_string()
    } else {
        summary.failures.join("\n")
    };
    UserEvent::toast(ToastLevel::Error, "Nothing imported", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ProcessResult, ToolKind};
    use std::path::PathBuf;

    #[test]
    fn io_errors_map_by_kind() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "EACCES: whatever");
        assert_eq!(describe_io(&err), "Permission denied");
        let err = io::Error::new(io::ErrorKind::Other, "odd");
        assert_eq!(describe_io(&err), "odd");
    }

    #[cfg(unix)]
    #[test]
    fn io_errors_map_by_raw_code() {
        assert_eq!(describe_io(&io::Error::from_raw_os_error(24)), "Too many open files");
        assert_eq!(
            describe_io(&io::Error::from_raw_os_error(2)),
            "The file or folder does not exist"
        );
    }

    #[test]
    fn core_errors_are_described() {
        let io = CoreError::io(
            io::Error::new(io::ErrorKind::NotFound, "gone"),
            "/music/a.mp3",
        );
        assert_eq!(describe(&io), "The file or folder does not exist: /music/a.mp3");

        let tool = CoreError::ToolInvocation {
            message: "7-Zip failed to extract (exit code 2): bad archive".into(),
            result: Box::new(ProcessResult {
                success: false,
                output_path: PathBuf::from("out"),
                stdout: String::new(),
                stderr: "bad archive".into(),
                exit_code: Some(2),
                tool: ToolKind::SevenZip,
            }),
        };
        assert!(describe(&tool).ends_with("bad archive"));
        assert!(describe(&CoreError::ToolNotFound).contains("7-Zip"));

        let timeout = CoreError::Timeout {
            what: "reg query HKLM\\SOFTWARE\\WinRAR /v exe64".into(),
            after: std::time::Duration::from_millis(1500),
        };
        assert_eq!(
            describe(&timeout),
            "The operation timed out (reg query HKLM\\SOFTWARE\\WinRAR /v exe64 timed out after 1.5s)"
        );
    }

    #[test]
    fn batch_toast_levels() {
        let ok = BatchSummary {
            added: 2,
            skipped: 1,
            ..Default::default()
        };
        match batch_toast(&ok) {
            UserEvent::Toast { level, body, .. } => {
                assert_eq!(level, ToastLevel::Success);
                assert_eq!(body, "Added 2, skipped 1 already present");
            }
            other => panic!("unexpected {other:?}"),
        }

        let failed = BatchSummary {
            failures: vec!["a is already in the library".into(), "b: path is empty".into()],
            ..Default::default()
        };
        match batch_toast(&failed) {
            UserEvent::Toast { level, body, .. } => {
                assert_eq!(level, ToastLevel::Error);
                assert_eq!(body, "a is already in the library\nb: path is empty");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
