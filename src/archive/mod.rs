//! External compression tool discovery and invocation.
//!
//! The pipeline never links an archive library; it shells out to WinRAR or
//! 7-Zip, whichever is installed, preferring WinRAR.

pub mod locator;
pub mod process;
pub mod runner;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The two supported external tools, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    WinRar,
    SevenZip,
}

impl ToolKind {
    pub const PREFERENCE: [ToolKind; 2] = [ToolKind::WinRar, ToolKind::SevenZip];

    /// Directory name below `Program Files`.
    pub fn install_dir_name(&self) -> &'static str {
        match self {
            ToolKind::WinRar => "WinRAR",
            ToolKind::SevenZip => "7-Zip",
        }
    }

    /// Executables able to perform `op`, most capable first.
    ///
    /// `unrar.exe` ships with WinRAR but can only extract.
    pub fn executables(&self, op: ArchiveOperation) -> &'static [&'static str] {
        match (self, op) {
            (ToolKind::WinRar, ArchiveOperation::Compress) => &["WinRAR.exe"],
            (ToolKind::WinRar, ArchiveOperation::Extract) => &["WinRAR.exe", "unrar.exe"],
            (ToolKind::SevenZip, _) => &["7z.exe"],
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::WinRar => f.write_str("WinRAR"),
            ToolKind::SevenZip => f.write_str("7-Zip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveOperation {
    Compress,
    Extract,
}

impl fmt::Display for ArchiveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveOperation::Compress => f.write_str("compress"),
            ArchiveOperation::Extract => f.write_str("extract"),
        }
    }
}

/// A located, runnable compression executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveToolDescriptor {
    pub tool_kind: ToolKind,
    pub executable_path: PathBuf,
    pub executable_name: String,
}

/// Answer to "is this tool installed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl From<Option<ArchiveToolDescriptor>> for ToolLookup {
    fn from(descriptor: Option<ArchiveToolDescriptor>) -> Self {
        match descriptor {
            Some(d) => ToolLookup {
                found: true,
                path: Some(d.executable_path),
            },
            None => ToolLookup::default(),
        }
    }
}

/// Outcome of one compress or extract run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    pub success: bool,
    /// The archive written by a compress, or the directory filled by an extract.
    pub output_path: PathBuf,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub tool: ToolKind,
}

impl ProcessResult {
    /// The text shown to the user when the tool failed.
    pub fn failure_detail(&self) -> &str {
        [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("unknown error")
    }
}

pub use locator::{platform_locator, InstallPathLocator, ToolLocator, UnsupportedLocator};
pub use process::{ProcessExecutor, ProcessOutput, TokioProcessExecutor, ToolCommand};
pub use runner::ArchiveProcessRunner;
