use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType};
use serde::Serialize;
use tracing::debug;

/// URL prefix under which the images directory is served.
pub const IMAGES_URL_PREFIX: &str = "/images";

const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// A listed image file and the relative URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoEntry {
    pub filename: String,
    pub url: String,
}

impl PhotoEntry {
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let url = image_url(&filename);
        Self { filename, url }
    }
}

/// `snapshot_<unix_seconds>.jpg`
pub fn snapshot_filename(timestamp: i64) -> String {
    format!("snapshot_{timestamp}.jpg")
}

pub fn image_url(filename: &str) -> String {
    format!("{IMAGES_URL_PREFIX}/{filename}")
}

fn is_image_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Flat directory of snapshot images. The directory itself is the only index.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Use `dir` as the images directory, creating it if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::CreateDir(dir.display().to_string(), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Image files in the directory, sorted by filename descending.
    pub fn list(&self) -> Result<Vec<PhotoEntry>, StoreError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| StoreError::ReadDir(self.dir.display().to_string(), e))?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_image_name(name))
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));

        Ok(names.into_iter().map(PhotoEntry::new).collect())
    }

    /// Encode `image` as JPEG under `filename`, replacing any existing file.
    ///
    /// The bytes go to a uniquely named hidden temp file that is renamed into
    /// place. A failed write leaves nothing behind and listings never see a
    /// partial file. Concurrent writers of one name each succeed; the last
    /// rename wins.
    pub fn save_jpeg(
        &self,
        filename: &str,
        image: &DynamicImage,
        quality: u8,
    ) -> Result<PathBuf, StoreError> {
        let final_path = self.dir.join(filename);

        // Dropped (and removed) on any early return.
        let mut tmp = tempfile::Builder::new()
            .prefix(".snapshot-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| StoreError::Write(self.dir.display().to_string(), e))?;

        write_jpeg(tmp.as_file_mut(), &final_path, image, quality)?;

        tmp.persist(&final_path)
            .map_err(|e| StoreError::Write(final_path.display().to_string(), e.error))?;

        debug!(path = %final_path.display(), "snapshot written");
        Ok(final_path)
    }
}

fn write_jpeg(
    file: &mut File,
    path: &Path,
    image: &DynamicImage,
    quality: u8,
) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(file);

    // JPEG has no alpha channel.
    let rgb = image.to_rgb8();
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(StoreError::Encode)?;

    writer
        .flush()
        .map_err(|e| StoreError::Write(path.display().to_string(), e))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create images directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to read images directory {0}: {1}")]
    ReadDir(String, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
    #[error("failed to encode JPEG: {0}")]
    Encode(image::ImageError),
}
