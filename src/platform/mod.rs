//! Platform-specific integration helpers.
//!
//! Keep OS quirks here to avoid leaking them into the app's core logic.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

use crate::core::CoreResult;

#[cfg(windows)]
pub mod windows;

/// Reads a single string value from the system registry.
#[async_trait]
pub trait RegistryQuery: Send + Sync {
    /// Returns the value's data. A missing key, unparsable output, or a query
    /// running longer than `timeout` are all errors; callers decide whether
    /// to swallow them.
    async fn query_value(&self, key: &str, value: &str, timeout: Duration) -> CoreResult<String>;
}

/// Extracts the data of a `REG_SZ` line from `reg query` output.
///
/// ```text
/// HKEY_LOCAL_MACHINE\SOFTWARE\WinRAR
///     exe64    REG_SZ    C:\Program Files\WinRAR\WinRAR.exe
/// ```
pub fn parse_reg_sz(output: &str) -> Option<String> {
    let re = Regex::new(r"REG_SZ\s+(.+)").ok()?;
    let value = re.captures(output)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
