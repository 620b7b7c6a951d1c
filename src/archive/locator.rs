//! Finds installed compression tools.
//!
//! Lookup is recomputed on every call; installs and uninstalls between two
//! operations are picked up without a restart.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{ArchiveOperation, ArchiveToolDescriptor, ToolKind, ToolLookup};
use crate::core::{CoreError, CoreResult, FileSystem, TokioFileSystem};
use crate::platform::RegistryQuery;

const WINRAR_REGISTRY_KEY: &str = r"HKLM\SOFTWARE\WinRAR";
const WINRAR_REGISTRY_VALUES: [&str; 2] = ["exe64", "exe32"];

/// Capability interface over tool discovery.
#[async_trait]
pub trait ToolLocator: Send + Sync {
    /// `false` when the host has no notion of these tools at all.
    fn is_supported(&self) -> bool;

    /// Finds an executable of `kind` that can perform `op`.
    async fn locate_for(
        &self,
        kind: ToolKind,
        op: ArchiveOperation,
    ) -> CoreResult<Option<ArchiveToolDescriptor>>;

    /// Reports whether any executable of `kind` is installed. Never fails;
    /// an unsupported host simply reports "not found".
    async fn locate(&self, kind: ToolKind) -> ToolLookup {
        match self.locate_for(kind, ArchiveOperation::Extract).await {
            Ok(found) => found.into(),
            Err(e) => {
                tracing::debug!("Lookup of {} failed: {}", kind, e);
                ToolLookup::default()
            }
        }
    }

    /// The first tool in preference order that can perform `op`.
    async fn locate_best_for(
        &self,
        op: ArchiveOperation,
    ) -> CoreResult<Option<ArchiveToolDescriptor>> {
        for kind in ToolKind::PREFERENCE {
            if let Some(descriptor) = self.locate_for(kind, op).await? {
                return Ok(Some(descriptor));
            }
        }
        Ok(None)
    }

    /// The preferred installed tool, WinRAR over 7-Zip.
    async fn locate_best(&self) -> CoreResult<Option<ArchiveToolDescriptor>> {
        self.locate_best_for(ArchiveOperation::Extract).await
    }
}

/// Locator for hosts without the Windows tool ecosystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLocator;

#[async_trait]
impl ToolLocator for UnsupportedLocator {
    fn is_supported(&self) -> bool {
        false
    }

    async fn locate_for(
        &self,
        _kind: ToolKind,
        _op: ArchiveOperation,
    ) -> CoreResult<Option<ArchiveToolDescriptor>> {
        Err(CoreError::UnsupportedPlatform("Archive tool lookup"))
    }
}

/// Probes `<root>/<install dir>/<executable>` for every configured root, then
/// falls back to the registry for WinRAR.
pub struct InstallPathLocator {
    roots: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
    registry: Option<Arc<dyn RegistryQuery>>,
    registry_timeout: Duration,
}

impl InstallPathLocator {
    pub fn new(roots: Vec<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            roots,
            fs,
            registry: None,
            registry_timeout: Duration::from_secs(3),
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn RegistryQuery>, timeout: Duration) -> Self {
        self.registry = Some(registry);
        self.registry_timeout = timeout;
        self
    }

    /// The fixed `Program Files` locations followed by whatever the
    /// environment says they are, without duplicates.
    pub fn default_roots() -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = vec![
            PathBuf::from(r"C:\Program Files"),
            PathBuf::from(r"C:\Program Files (x86)"),
        ];
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Some(value) = std::env::var_os(var) {
                let root = PathBuf::from(value);
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
        roots
    }

    /// The locator used by the running application.
    pub fn from_env(registry_timeout: Duration) -> Self {
        let locator = Self::new(Self::default_roots(), Arc::new(TokioFileSystem));
        #[cfg(windows)]
        let locator = locator.with_registry(
            Arc::new(crate::platform::windows::RegQuery),
            registry_timeout,
        );
        #[cfg(not(windows))]
        let locator = Self {
            registry_timeout,
            ..locator
        };
        locator
    }

    fn candidates(&self, kind: ToolKind, op: ArchiveOperation) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for root in &self.roots {
            for exe in kind.executables(op) {
                let path = root.join(kind.install_dir_name()).join(exe);
                if !candidates.contains(&path) {
                    candidates.push(path);
                }
            }
        }
        candidates
    }

    async fn path_exists(&self, path: &Path) -> bool {
        match self.fs.exists(path).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!("Could not probe {:?}: {}", path, e);
                false
            }
        }
    }

    async fn first_existing(
        &self,
        kind: ToolKind,
        op: ArchiveOperation,
        candidates: Vec<PathBuf>,
    ) -> Option<ArchiveToolDescriptor> {
        for path in candidates {
            if self.path_exists(&path).await {
                return Some(descriptor(kind, path));
            }
        }
        tracing::debug!("No {} executable for {} among probed paths", kind, op);
        None
    }

    /// Asks the registry where WinRAR lives. Every failure is swallowed, and
    /// the whole lookup, both values included, shares one time bound.
    async fn from_registry(&self, op: ArchiveOperation) -> Option<ArchiveToolDescriptor> {
        let registry = self.registry.as_ref()?;
        let deadline = tokio::time::Instant::now() + self.registry_timeout;

        let lookup = self.query_registry(registry.as_ref(), op, deadline);
        match tokio::time::timeout_at(deadline, lookup).await {
            Ok(found) => found,
            Err(_) => {
                tracing::warn!(
                    "Registry lookup of WinRAR did not finish within {:?}",
                    self.registry_timeout
                );
                None
            }
        }
    }

    async fn query_registry(
        &self,
        registry: &dyn RegistryQuery,
        op: ArchiveOperation,
        deadline: tokio::time::Instant,
    ) -> Option<ArchiveToolDescriptor> {
        for value in WINRAR_REGISTRY_VALUES {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let resolved = match registry
                .query_value(WINRAR_REGISTRY_KEY, value, remaining)
                .await
            {
                Ok(resolved) => PathBuf::from(resolved),
                Err(e) => {
                    tracing::debug!("Registry lookup of {} failed: {}", value, e);
                    continue;
                }
            };

            let allowed = ToolKind::WinRar.executables(op);
            let mut candidates = Vec::new();
            let resolved_name = resolved
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if allowed.iter().any(|exe| exe.to_lowercase() == resolved_name) {
                candidates.push(resolved.clone());
            }
            if let Some(dir) = resolved.parent() {
                candidates.extend(allowed.iter().map(|exe| dir.join(exe)));
            }

            for path in candidates {
                if self.path_exists(&path).await {
                    tracing::info!("Found WinRAR through the registry at {:?}", path);
                    return Some(descriptor(ToolKind::WinRar, path));
                }
            }
            tracing::warn!("Registry points at {:?}, which no longer exists", resolved);
        }
        None
    }
}

fn descriptor(kind: ToolKind, path: PathBuf) -> ArchiveToolDescriptor {
    let executable_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ArchiveToolDescriptor {
        tool_kind: kind,
        executable_path: path,
        executable_name,
    }
}

#[async_trait]
impl ToolLocator for InstallPathLocator {
    fn is_supported(&self) -> bool {
        true
    }

    async fn locate_for(
        &self,
        kind: ToolKind,
        op: ArchiveOperation,
    ) -> CoreResult<Option<ArchiveToolDescriptor>> {
        let candidates = self.candidates(kind, op);
        if let Some(found) = self.first_existing(kind, op, candidates).await {
            tracing::debug!("Located {} at {:?}", kind, found.executable_path);
            return Ok(Some(found));
        }
        if kind == ToolKind::WinRar {
            return Ok(self.from_registry(op).await);
        }
        Ok(None)
    }
}

/// The locator matching the compile target.
pub fn platform_locator(registry_timeout: Duration) -> Arc<dyn ToolLocator> {
    if cfg!(windows) {
        Arc::new(InstallPathLocator::from_env(registry_timeout))
    } else {
        Arc::new(UnsupportedLocator)
    }
}
