//! Virtual file system over the module asset sets
//!
//! Each module ships an embedded asset set. In development every set can be
//! swapped for its source directory so edits show up without a rebuild.

use crate::config::HostEnvironment;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

#[derive(RustEmbed)]
#[folder = "modules/domain-shared"]
struct DomainSharedAssets;

#[derive(RustEmbed)]
#[folder = "modules/domain"]
struct DomainAssets;

#[derive(RustEmbed)]
#[folder = "modules/application-contracts"]
struct ApplicationContractsAssets;

#[derive(RustEmbed)]
#[folder = "modules/application"]
struct ApplicationAssets;

/// Names of the module asset sets, in registration order
pub const MODULE_ASSET_SETS: [&str; 4] = [
    "domain-shared",
    "domain",
    "application-contracts",
    "application",
];

type EmbeddedLookup = fn(&str) -> Option<rust_embed::EmbeddedFile>;

#[derive(Debug, Clone)]
enum FileSource {
    Embedded(EmbeddedLookup),
    Physical(PathBuf),
}

#[derive(Debug, Clone)]
struct FileSet {
    name: &'static str,
    source: FileSource,
}

/// Options recorded while configuring the file system
#[derive(Debug, Clone, Default)]
pub struct VirtualFileOptions {
    /// Replace embedded sets with their source directories
    pub use_physical_files: bool,

    /// Directory holding one sub-directory per asset set
    pub physical_root: Option<PathBuf>,
}

impl VirtualFileOptions {
    /// Remapping is active only in development
    pub fn for_environment(environment: HostEnvironment) -> Self {
        Self {
            use_physical_files: environment.is_development(),
            physical_root: environment
                .is_development()
                .then(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("modules")),
        }
    }
}

/// Layered view over the registered asset sets; later sets win
#[derive(Debug, Clone)]
pub struct VirtualFileSystem {
    sets: Vec<FileSet>,
}

impl VirtualFileSystem {
    /// The embedded module asset sets
    pub fn embedded() -> Self {
        let lookups: [EmbeddedLookup; 4] = [
            DomainSharedAssets::get,
            DomainAssets::get,
            ApplicationContractsAssets::get,
            ApplicationAssets::get,
        ];

        Self {
            sets: MODULE_ASSET_SETS
                .into_iter()
                .zip(lookups)
                .map(|(name, lookup)| FileSet {
                    name,
                    source: FileSource::Embedded(lookup),
                })
                .collect(),
        }
    }

    /// Build the file system described by `options`
    pub fn from_options(options: &VirtualFileOptions) -> Self {
        let mut vfs = Self::embedded();
        if let (true, Some(root)) = (options.use_physical_files, options.physical_root.as_ref()) {
            for name in MODULE_ASSET_SETS {
                vfs.replace_with_physical(name, root.join(name));
            }
        }
        vfs
    }

    /// Serve a set from a directory instead of the binary
    pub fn replace_with_physical(&mut self, name: &str, dir: PathBuf) {
        if let Some(set) = self.sets.iter_mut().find(|s| s.name == name) {
            info!(set = name, dir = %dir.display(), "Serving asset set from disk");
            set.source = FileSource::Physical(dir);
        }
    }

    /// Whether a set currently reads from disk
    pub fn is_physical(&self, name: &str) -> bool {
        self.sets
            .iter()
            .any(|s| s.name == name && matches!(s.source, FileSource::Physical(_)))
    }

    /// Read a file, searching sets from last to first
    pub async fn read(&self, path: &str) -> Option<Cow<'static, [u8]>> {
        let path = sanitize(path)?;
        for set in self.sets.iter().rev() {
            match &set.source {
                FileSource::Embedded(lookup) => {
                    if let Some(file) = lookup(&path) {
                        return Some(file.data);
                    }
                }
                FileSource::Physical(dir) => {
                    if let Ok(bytes) = tokio::fs::read(dir.join(&path)).await {
                        debug!(set = set.name, path = %path, "Read physical asset");
                        return Some(Cow::Owned(bytes));
                    }
                }
            }
        }
        None
    }
}

/// Relative path with no parent or root components
fn sanitize(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    let normal = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    normal.then(|| path.to_string())
}
