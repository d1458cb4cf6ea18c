use anyhow::{Context, Result};
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::task;
use tracing::{info, warn};

/// Stores uploaded listing images, re-encoded to WebP, and cleans them up
/// again when a listing is purged.
pub struct ImageService {
    images_dir: PathBuf,
}

impl ImageService {
    #[must_use]
    pub fn new(images_path: &str) -> Self {
        Self {
            images_dir: PathBuf::from(images_path),
        }
    }

    /// Decode the uploaded bytes, re-encode them as WebP and write the
    /// result under the images directory. Returns the stored filename.
    pub async fn store_webp(&self, original_name: &str, bytes: Vec<u8>) -> Result<String> {
        let stem = sanitize_stem(original_name);
        let filename = format!("{}-{}.webp", stem, uuid::Uuid::new_v4().simple());

        // Decoding + encoding is CPU-bound, keep it off the async runtime
        let encoded = task::spawn_blocking(move || encode_webp(&bytes))
            .await
            .context("Image encoding task panicked")??;

        if !self.images_dir.exists() {
            fs::create_dir_all(&self.images_dir).await?;
        }

        let file_path = self.images_dir.join(&filename);
        fs::write(&file_path, encoded)
            .await
            .with_context(|| format!("Failed to write image to {}", file_path.display()))?;

        info!(path = %file_path.display(), "Stored listing image");
        Ok(filename)
    }

    /// Best-effort removal of a stored image. A missing file is fine; any
    /// other failure is logged and swallowed since the database record is
    /// the operation's contract, not the file.
    pub async fn remove(&self, filename: &str) {
        let file_path = self.images_dir.join(filename);

        match fs::remove_file(&file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %file_path.display(), "Failed to remove image: {}", e);
            }
        }
    }

    #[must_use]
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.images_dir.join(filename)
    }
}

fn encode_webp(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("Unsupported or corrupt image data")?;

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::WebP)
        .context("Failed to encode image as WebP")?;

    Ok(out.into_inner())
}

/// Keep only a safe subset of the uploaded filename's stem, so the stored
/// name can never traverse out of the images directory.
fn sanitize_stem(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("photo.png"), "photo");
        assert_eq!(sanitize_stem("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_stem("my acc #1.jpg"), "myacc1");
        assert_eq!(sanitize_stem("...."), "upload");
    }

    #[test]
    fn test_encode_webp_roundtrip() {
        let img = image::RgbImage::new(4, 4);
        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let webp = encode_webp(png.get_ref()).unwrap();
        assert!(!webp.is_empty());
        assert_eq!(&webp[..4], b"RIFF");
    }

    #[test]
    fn test_encode_webp_rejects_garbage() {
        assert!(encode_webp(b"definitely not an image").is_err());
    }
}
