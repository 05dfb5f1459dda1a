use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use rgb::RGBA8;
use thiserror::Error;

use crate::sequence::Image;

/// Which file a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// `<name>.png`, shown as a single still.
    Still,
    /// `<name>.gif`, decoded into a frame sequence.
    Animated,
}

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Still => "png",
            AssetKind::Animated => "gif",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRequest {
    pub name: String,
    pub kind: AssetKind,
}

impl AssetRequest {
    pub fn still(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AssetKind::Still,
        }
    }

    pub fn animated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AssetKind::Animated,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

/// What a store hands back for a request.
#[derive(Debug, Clone)]
pub enum Asset {
    /// Raw container bytes, still to be decoded.
    Container(Vec<u8>),
    Still(Image),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("decoding still {name}: {message}")]
    Still { name: String, message: String },
}

/// Name -> asset lookup. Missing names are `Ok(None)`, never an error.
pub trait AssetStore {
    fn fetch(&self, request: &AssetRequest) -> Result<Option<Asset>, StoreError>;

    fn contains(&self, request: &AssetRequest) -> bool;
}

// ---------------------------------------------------------------------------
// Directory store
// ---------------------------------------------------------------------------

/// Assets as loose files in one directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, request: &AssetRequest) -> PathBuf {
        self.root.join(request.file_name())
    }
}

impl AssetStore for DirStore {
    fn fetch(&self, request: &AssetRequest) -> Result<Option<Asset>, StoreError> {
        let path = self.path_for(request);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        match request.kind {
            AssetKind::Animated => Ok(Some(Asset::Container(bytes))),
            AssetKind::Still => decode_png(&request.name, &bytes).map(|img| Some(Asset::Still(img))),
        }
    }

    fn contains(&self, request: &AssetRequest) -> bool {
        self.path_for(request).is_file()
    }
}

fn decode_png(name: &str, bytes: &[u8]) -> Result<Image, StoreError> {
    let bitmap = lodepng::decode32(bytes).map_err(|e| StoreError::Still {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    Ok(Image::new(bitmap.buffer, bitmap.width, bitmap.height))
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    assets: HashMap<AssetRequest, Asset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_still(&mut self, name: &str, image: Image) {
        self.assets
            .insert(AssetRequest::still(name), Asset::Still(image));
    }

    pub fn insert_container(&mut self, name: &str, bytes: Vec<u8>) {
        self.assets
            .insert(AssetRequest::animated(name), Asset::Container(bytes));
    }
}

impl AssetStore for MemoryStore {
    fn fetch(&self, request: &AssetRequest) -> Result<Option<Asset>, StoreError> {
        Ok(self.assets.get(request).cloned())
    }

    fn contains(&self, request: &AssetRequest) -> bool {
        self.assets.contains_key(request)
    }
}

// ---------------------------------------------------------------------------
// Fallbacks
// ---------------------------------------------------------------------------

/// Edge length of the built-in icon.
const ICON_SIZE: usize = 64;

/// Built-in last-resort image: a soft grey disc with a darker rim on a
/// transparent square. Always available, never blank.
pub fn platform_icon() -> Image {
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = ICON_SIZE as f32 / 2.0 - 2.0;
    let pixels = (0..ICON_SIZE * ICON_SIZE)
        .map(|i| {
            let dx = (i % ICON_SIZE) as f32 - center;
            let dy = (i / ICON_SIZE) as f32 - center;
            let d = (dx * dx + dy * dy).sqrt();
            if d > radius {
                RGBA8::new(0, 0, 0, 0)
            } else if d > radius - 4.0 {
                RGBA8::new(90, 90, 100, 255)
            } else {
                RGBA8::new(200, 200, 210, 255)
            }
        })
        .collect();
    Image::new(pixels, ICON_SIZE, ICON_SIZE)
}

/// Ordered list of still names to try when something fails, ending in
/// the built-in icon.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    names: Vec<String>,
}

impl FallbackChain {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// First still the store can produce, else the built-in icon.
    pub fn resolve(&self, store: &dyn AssetStore) -> Image {
        for name in &self.names {
            match store.fetch(&AssetRequest::still(name.as_str())) {
                Ok(Some(Asset::Still(image))) => return image,
                Ok(_) => log::debug!("Fallback still {name} not available"),
                Err(e) => log::warn!("Fallback still {name} unusable: {e}"),
            }
        }
        log::info!("No fallback still found, using built-in icon");
        platform_icon()
    }
}
