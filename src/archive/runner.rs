//! Compress and extract through whichever tool the locator finds.

use std::ffi::OsString;
use std::path::{Path, MAIN_SEPARATOR};
use std::sync::Arc;

use super::{
    ArchiveOperation, ArchiveToolDescriptor, ProcessExecutor, ProcessResult, ToolCommand,
    ToolKind, ToolLocator,
};
use crate::core::{CoreError, CoreResult, FileSystem};

pub struct ArchiveProcessRunner {
    locator: Arc<dyn ToolLocator>,
    executor: Arc<dyn ProcessExecutor>,
    fs: Arc<dyn FileSystem>,
}

impl ArchiveProcessRunner {
    pub fn new(
        locator: Arc<dyn ToolLocator>,
        executor: Arc<dyn ProcessExecutor>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            locator,
            executor,
            fs,
        }
    }

    /// Packs `source` (file or folder) into `archive`.
    pub async fn compress(&self, source: &Path, archive: &Path) -> CoreResult<ProcessResult> {
        self.ensure_supported("Compression")?;
        self.require_exists("Source", source).await?;

        let tool = self.tool_for(ArchiveOperation::Compress).await?;
        let args = compress_args(tool.tool_kind, source, archive);
        tracing::info!("Compressing {:?} into {:?} with {}", source, archive, tool.tool_kind);
        self.execute(&tool, ArchiveOperation::Compress, args, archive)
            .await
    }

    /// Unpacks `archive` into `output_dir`, creating it when needed.
    pub async fn extract(&self, archive: &Path, output_dir: &Path) -> CoreResult<ProcessResult> {
        self.ensure_supported("Extraction")?;
        self.require_exists("Archive", archive).await?;
        self.fs
            .ensure_directory(output_dir)
            .await
            .map_err(|e| CoreError::io(e, output_dir))?;

        let tool = self.tool_for(ArchiveOperation::Extract).await?;
        let args = extract_args(tool.tool_kind, archive, output_dir);
        tracing::info!("Extracting {:?} into {:?} with {}", archive, output_dir, tool.tool_kind);
        self.execute(&tool, ArchiveOperation::Extract, args, output_dir)
            .await
    }

    fn ensure_supported(&self, what: &'static str) -> CoreResult<()> {
        if self.locator.is_supported() {
            Ok(())
        } else {
            Err(CoreError::UnsupportedPlatform(what))
        }
    }

    async fn require_exists(&self, what: &'static str, path: &Path) -> CoreResult<()> {
        let exists = self
            .fs
            .exists(path)
            .await
            .map_err(|e| CoreError::io(e, path))?;
        if exists {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                what,
                path: path.to_path_buf(),
            })
        }
    }

    async fn tool_for(&self, op: ArchiveOperation) -> CoreResult<ArchiveToolDescriptor> {
        self.locator
            .locate_best_for(op)
            .await?
            .ok_or(CoreError::ToolNotFound)
    }

    async fn execute(
        &self,
        tool: &ArchiveToolDescriptor,
        op: ArchiveOperation,
        args: Vec<OsString>,
        output_path: &Path,
    ) -> CoreResult<ProcessResult> {
        let command = ToolCommand {
            program: tool.executable_path.clone(),
            args,
            cwd: tool.executable_path.parent().map(Path::to_path_buf),
        };
        let output = self.executor.run(&command).await?;

        // A missing exit code means the tool was stopped after doing its work.
        let success = matches!(output.exit_code, None | Some(0));
        let result = ProcessResult {
            success,
            output_path: output_path.to_path_buf(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            tool: tool.tool_kind,
        };

        if success {
            tracing::info!("{} {} finished: {:?}", tool.tool_kind, op, output_path);
            return Ok(result);
        }

        let message = format!(
            "{} failed to {} (exit code {}): {}",
            tool.tool_kind,
            op,
            result.exit_code.unwrap_or_default(),
            result.failure_detail()
        );
        tracing::error!("{}", message);
        Err(CoreError::ToolInvocation {
            message,
            result: Box::new(result),
        })
    }
}

fn compress_args(kind: ToolKind, source: &Path, archive: &Path) -> Vec<OsString> {
    match kind {
        ToolKind::WinRar => vec![
            "a".into(),
            "-r".into(),
            "-ep1".into(),
            archive.into(),
            source.into(),
        ],
        ToolKind::SevenZip => vec!["a".into(), archive.into(), source.into(), "-r".into()],
    }
}

fn extract_args(kind: ToolKind, archive: &Path, output_dir: &Path) -> Vec<OsString> {
    let dir = with_trailing_separator(output_dir);
    match kind {
        ToolKind::WinRar => vec!["x".into(), "-o+".into(), archive.into(), dir],
        ToolKind::SevenZip => {
            let mut out = OsString::from("-o");
            out.push(dir);
            vec!["x".into(), archive.into(), out, "-y".into()]
        }
    }
}

fn with_trailing_separator(dir: &Path) -> OsString {
    let mut s = dir.as_os_str().to_os_string();
    let has_separator = {
        let text = dir.to_string_lossy();
        text.ends_with('/') || text.ends_with('\\')
    };
    if !has_separator {
        s.push(MAIN_SEPARATOR.to_string());
    }
    s
}
