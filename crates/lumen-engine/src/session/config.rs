use std::path::{Path, PathBuf};

use super::args::ArgumentList;

/// Locations the engine may read assets from and write files to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetContext {
    /// Read-only sample assets (shaders, textures, models).
    pub asset_root: PathBuf,

    /// Persistent per-application storage.
    pub storage_dir: PathBuf,

    /// Scratch space; may be cleared between launches.
    pub temp_dir: PathBuf,
}

impl AssetContext {
    /// Lays out `assets/`, `files/` and `cache/` under `base`.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            asset_root: base.join("assets"),
            storage_dir: base.join("files"),
            temp_dir: base.join("cache"),
        }
    }

    /// Uses `asset_root` as given and keeps writable directories out of it.
    pub fn with_asset_root(asset_root: impl Into<PathBuf>) -> Self {
        let scratch = std::env::temp_dir().join("lumen");
        Self {
            asset_root: asset_root.into(),
            storage_dir: scratch.join("files"),
            temp_dir: scratch.join("cache"),
        }
    }
}

impl Default for AssetContext {
    fn default() -> Self {
        Self::with_asset_root("assets")
    }
}

/// Per-coordinator configuration, fixed for every session it runs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Arguments handed to `NativeEngine::init`.
    pub args: ArgumentList,

    /// The sample cannot initialize until an image has been injected.
    pub requires_input: bool,

    pub assets: AssetContext,

    /// Name given to each session's render thread.
    pub thread_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            args: ArgumentList::default(),
            requires_input: false,
            assets: AssetContext::default(),
            thread_name: "lumen-render".to_string(),
        }
    }
}
