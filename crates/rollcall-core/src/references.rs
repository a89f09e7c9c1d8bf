//! Reference store: known faces loaded from a directory of named images.

use image::RgbImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions treated as reference images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("cannot read reference directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot load reference image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// One known person: name (from the filename stem) and their face image.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub name: String,
    pub image: RgbImage,
}

/// Immutable name → image mapping, iterated in name order.
#[derive(Debug, Default)]
pub struct ReferenceStore {
    entries: BTreeMap<String, ReferenceEntry>,
}

impl ReferenceStore {
    /// Load every image file in `dir`. Later files with a duplicate stem
    /// replace earlier ones; files are visited in filename order.
    pub fn load(dir: &Path) -> Result<Self, ReferenceError> {
        let read_dir_err = |source| ReferenceError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
            let path = entry.map_err(read_dir_err)?.path();
            if path.is_file() && is_image_path(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut store = Self::default();
        for path in paths {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let image = decode(&path).map_err(|source| ReferenceError::Image {
                path: path.clone(),
                source,
            })?;

            tracing::debug!(name = %name, path = %path.display(), "loaded reference image");
            if store.insert(name.clone(), image) {
                tracing::debug!(name = %name, "duplicate reference name replaced");
            }
        }

        if store.is_empty() {
            tracing::warn!(dir = %dir.display(), "no reference images found; every face will be unknown");
        } else {
            tracing::info!(dir = %dir.display(), count = store.len(), "reference store loaded");
        }

        Ok(store)
    }

    /// Insert or replace an entry. Returns true if a previous entry was replaced.
    pub fn insert(&mut self, name: String, image: RgbImage) -> bool {
        self.entries
            .insert(name.clone(), ReferenceEntry { name, image })
            .is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode by content rather than trusting the extension.
fn decode(path: &Path) -> Result<RgbImage, image::ImageError> {
    Ok(image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgb8())
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
