//! Defines the event and message structures for communication between the backend and frontend.

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveOperation, ProcessResult, ToolKind, ToolLookup};
use crate::core::{AuditReport, ResourceKind, ResourceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// What the user is asked when a dropped item looks like a moved record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathUpdatePrompt {
    pub kind: ResourceKind,
    pub existing_id: String,
    pub existing_name: String,
    pub old_path: String,
    pub new_path: String,
}

/// Events sent from the Rust backend to the WebView (UI thread).
///
/// All of them are fire-and-forget; the backend never waits for an answer.
#[derive(Debug)]
pub enum UserEvent {
    /// Ask whether a missing record should point at a newly dropped path.
    ShowPathUpdateDialog(PathUpdatePrompt),
    /// A notification for the user.
    Toast {
        level: ToastLevel,
        title: String,
        body: String,
    },
    /// The full record list of a catalog after a change.
    CatalogChanged {
        kind: ResourceKind,
        records: Vec<ResourceRecord>,
    },
    /// An existence audit completed.
    AuditFinished {
        kind: ResourceKind,
        report: AuditReport,
    },
    /// A compress or extract run succeeded.
    ArchiveFinished {
        operation: ArchiveOperation,
        result: ProcessResult,
    },
    /// Answer to an "is this tool installed" query.
    ToolStatus { tool: ToolKind, lookup: ToolLookup },
}

impl UserEvent {
    pub fn toast(level: ToastLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        UserEvent::Toast {
            level,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A message received from the WebView via the IPC channel.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}
