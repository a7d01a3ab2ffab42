//! Shader asset loading
//!
//! Programs are looked up by a path-like key. Loaders answer with the bytes
//! or `NotFound`; a chain of loaders lets an app directory override the
//! built-in shader without touching code.

use crate::error::AssetError;
use crate::shaders::{LIQUID_GLASS_KEY, LIQUID_GLASS_SHADER};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Where an asset lives
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetPath {
    /// Relative to a loader's root
    Relative(String),
    /// Absolute filesystem path
    Absolute(String),
    /// Compiled into the binary
    Embedded(&'static str),
}

impl AssetPath {
    /// Interpret a config/asset key
    pub fn parse(key: &str) -> Self {
        if Path::new(key).is_absolute() {
            Self::Absolute(key.to_string())
        } else {
            Self::Relative(key.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Relative(rel) => rel,
            Self::Absolute(abs) => abs,
            Self::Embedded(name) => name,
        }
    }
}

impl std::fmt::Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of asset bytes
pub trait AssetLoader: Send + Sync {
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>, AssetError>;

    fn exists(&self, path: &AssetPath) -> bool;

    fn name(&self) -> &'static str;
}

/// Loads files under a root directory
#[derive(Clone, Debug)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a file path; relative keys may not escape the root
    fn resolve(&self, path: &AssetPath) -> Option<PathBuf> {
        match path {
            AssetPath::Absolute(abs) => Some(PathBuf::from(abs)),
            AssetPath::Relative(rel) => {
                let rel = Path::new(rel);
                let escapes = rel
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                (!escapes).then(|| self.root.join(rel))
            }
            AssetPath::Embedded(_) => None,
        }
    }
}

impl AssetLoader for FsAssetLoader {
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>, AssetError> {
        let Some(file) = self.resolve(path) else {
            return Err(AssetError::NotFound(path.to_string()));
        };
        match std::fs::read(&file) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.to_string()))
            }
            Err(e) => Err(AssetError::Io {
                path: file.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn exists(&self, path: &AssetPath) -> bool {
        self.resolve(path).is_some_and(|file| file.is_file())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

/// In-memory assets keyed by name
#[derive(Clone, Debug, Default)]
pub struct EmbeddedAssets {
    entries: FxHashMap<String, Cow<'static, [u8]>>,
}

impl EmbeddedAssets {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The shaders that ship with the crate
    pub fn builtin() -> Self {
        let mut assets = Self::new();
        assets.insert_static(LIQUID_GLASS_KEY, LIQUID_GLASS_SHADER.as_bytes());
        assets
    }

    pub fn insert_static(&mut self, key: &str, bytes: &'static [u8]) {
        self.entries.insert(key.to_string(), Cow::Borrowed(bytes));
    }

    pub fn insert(&mut self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), Cow::Owned(bytes.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AssetLoader for EmbeddedAssets {
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>, AssetError> {
        self.entries
            .get(path.as_str())
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &AssetPath) -> bool {
        self.entries.contains_key(path.as_str())
    }

    fn name(&self) -> &'static str {
        "embedded"
    }
}

/// Ordered loader chain; the first loader that has the asset wins
#[derive(Default)]
pub struct AssetLoaders {
    loaders: Vec<Box<dyn AssetLoader>>,
}

impl AssetLoaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Optional directory overrides followed by the built-in shaders
    pub fn with_builtin(dir: Option<PathBuf>) -> Self {
        let mut chain = Self::new();
        if let Some(dir) = dir {
            chain.push(FsAssetLoader::new(dir));
        }
        chain.push(EmbeddedAssets::builtin());
        chain
    }

    pub fn push(&mut self, loader: impl AssetLoader + 'static) -> &mut Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl AssetLoader for AssetLoaders {
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>, AssetError> {
        for loader in &self.loaders {
            match loader.load(path) {
                Ok(bytes) => {
                    tracing::debug!(asset = %path, loader = loader.name(), "asset loaded");
                    return Ok(bytes);
                }
                Err(AssetError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(AssetError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &AssetPath) -> bool {
        self.loaders.iter().any(|loader| loader.exists(path))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shader_is_embedded() {
        let assets = EmbeddedAssets::builtin();
        let path = AssetPath::parse(LIQUID_GLASS_KEY);
        assert!(assets.exists(&path));
        assert_eq!(assets.load(&path).unwrap(), LIQUID_GLASS_SHADER.as_bytes());
    }

    #[test]
    fn chain_falls_through_not_found() {
        let mut overrides = EmbeddedAssets::new();
        overrides.insert("shaders/other.wgsl", "// other");

        let mut chain = AssetLoaders::new();
        chain.push(overrides).push(EmbeddedAssets::builtin());

        let path = AssetPath::parse(LIQUID_GLASS_KEY);
        assert_eq!(chain.load(&path).unwrap(), LIQUID_GLASS_SHADER.as_bytes());
        assert_eq!(
            chain.load(&AssetPath::parse("shaders/missing.wgsl")),
            Err(AssetError::NotFound("shaders/missing.wgsl".into()))
        );
    }

    #[test]
    fn relative_keys_cannot_escape_the_root() {
        let loader = FsAssetLoader::new("/tmp/vitro-assets");
        assert_eq!(
            loader.load(&AssetPath::parse("../etc/passwd")),
            Err(AssetError::NotFound("../etc/passwd".into()))
        );
    }

    #[test]
    fn fs_loader_reads_files() {
        let dir = std::env::temp_dir().join(format!("vitro-assets-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("shaders")).unwrap();
        std::fs::write(dir.join("shaders/custom.wgsl"), b"// custom").unwrap();

        let loader = FsAssetLoader::new(&dir);
        let path = AssetPath::parse("shaders/custom.wgsl");
        assert!(loader.exists(&path));
        assert_eq!(loader.load(&path).unwrap(), b"// custom");
        assert!(matches!(
            loader.load(&AssetPath::parse("shaders/none.wgsl")),
            Err(AssetError::NotFound(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
}
