//! Model downloading and loading utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ort::session::Session;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Local model file used when no other source is configured.
pub const DEFAULT_MODEL_PATH: &str = "models/arbitrary_image_stylization.onnx";

/// Approximate model size in bytes, used when the server sends no length.
const APPROX_MODEL_SIZE: u64 = 10_000_000; // ~10 MB

/// Where the stylization model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Downloaded once into the model cache, then reused.
    Remote { url: String },
    /// An ONNX file already on disk.
    Local(PathBuf),
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::Local(PathBuf::from(DEFAULT_MODEL_PATH))
    }
}

/// File name a remote model is cached under.
///
/// The last path segment of the URL is kept for readability and prefixed
/// with a digest of the full URL, so distinct URLs never share a cache entry.
#[must_use]
pub fn cache_filename(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));

    let segment: String = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let segment = if segment.is_empty() { "model.onnx" } else { segment.as_str() };

    format!("{}-{segment}", &digest[..16])
}

/// Manages the model cache directory and downloads.
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Uses the platform-appropriate cache directory:
    /// - Windows: `%LOCALAPPDATA%\neuralstyle\models`
    /// - Linux: `~/.cache/neuralstyle/models`
    /// - macOS: `~/Library/Caches/neuralstyle/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(base.join("neuralstyle").join("models"))
    }

    /// Create a model cache rooted at an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_dir<P: Into<PathBuf>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.into();

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self { cache_dir })
    }

    /// Directory downloaded models are stored in.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolve a model source to a file on disk, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if a local model is missing or a remote one cannot be
    /// downloaded.
    pub fn get_model_path(&self, source: &ModelSource) -> Result<PathBuf> {
        match source {
            ModelSource::Local(path) => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(Error::InvalidParameter {
                        name: "model".to_string(),
                        reason: format!("model file not found: {}", path.display()),
                    })
                }
            }
            ModelSource::Remote { url } => {
                let filename = cache_filename(url);
                let path = self.cache_dir.join(&filename);

                if path.exists() {
                    tracing::debug!("Using cached model {} for {url}", path.display());
                } else {
                    download_file(url, &path, &filename, APPROX_MODEL_SIZE)?;
                }

                Ok(path)
            }
        }
    }

    /// Load an ONNX model session.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be resolved or loaded.
    pub fn load_session(
        &self,
        source: &ModelSource,
        intra_threads: Option<usize>,
    ) -> Result<Session> {
        let path = self.get_model_path(source)?;
        let name = path.display().to_string();
        let load_error = |source| Error::ModelLoad {
            name: name.clone(),
            source,
        };

        tracing::info!("Loading stylization model from {name}");

        let mut builder = Session::builder().map_err(load_error)?;
        if let Some(threads) = intra_threads {
            builder = builder.with_intra_threads(threads).map_err(load_error)?;
        }

        builder.commit_from_file(&path).map_err(load_error)
    }
}

/// Download a file from a URL to a path with progress indication.
#[allow(clippy::cast_possible_truncation)]
fn download_file(url: &str, path: &Path, name: &str, approx_size: u64) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let download_error = |source| Error::ModelDownload {
        name: name.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(download_error)?;

    let total_size = response.content_length().unwrap_or(approx_size);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {name}"));

    // Write to a temporary file first, then rename for atomicity
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;

    let mut downloaded = 0u64;
    let mut reader = response;

    loop {
        let mut buffer = [0u8; 8192];
        let bytes_read = std::io::Read::read(&mut reader, &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    pb.finish_with_message(format!("Downloaded {name}"));

    fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_source_is_local() {
        assert_eq!(
            ModelSource::default(),
            ModelSource::Local(PathBuf::from(DEFAULT_MODEL_PATH))
        );
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = tempdir().unwrap();
        let cache_dir = dir.path().join("nested").join("models");

        let cache = ModelCache::with_dir(&cache_dir).unwrap();

        assert!(cache_dir.is_dir());
        assert_eq!(cache.cache_dir(), cache_dir.as_path());
    }

    #[test]
    fn test_cache_filename_keeps_last_segment() {
        let name = cache_filename("https://example.com/models/style.onnx?download=1");

        assert!(name.ends_with("-style.onnx"), "{name}");
        assert_eq!(name.len(), 16 + 1 + "style.onnx".len());
    }

    #[test]
    fn test_cache_filename_without_segment() {
        let name = cache_filename("https://example.com/");
        assert!(name.ends_with("-model.onnx"), "{name}");
    }

    #[test]
    fn test_distinct_urls_use_distinct_cache_files() {
        // Same final segment, different hosts
        let a = cache_filename("https://a.example.com/model.onnx");
        let b = cache_filename("https://b.example.com/model.onnx");

        assert_ne!(a, b);
        assert_eq!(a, cache_filename("https://a.example.com/model.onnx"));
    }

    #[test]
    fn test_cached_remote_model_is_reused() {
        let dir = tempdir().unwrap();
        let cache = ModelCache::with_dir(dir.path()).unwrap();
        let url = "http://127.0.0.1:9/style.onnx";
        let cached = dir.path().join(cache_filename(url));
        fs::write(&cached, b"cached").unwrap();

        // The URL is never contacted because the file is already cached
        let source = ModelSource::Remote {
            url: url.to_string(),
        };
        let path = cache.get_model_path(&source).unwrap();

        assert_eq!(path, cached);
    }

    #[test]
    fn test_other_url_is_not_served_from_cache() {
        let dir = tempdir().unwrap();
        let cache = ModelCache::with_dir(dir.path()).unwrap();
        let cached_url = "http://127.0.0.1:9/style.onnx";
        fs::write(dir.path().join(cache_filename(cached_url)), b"cached").unwrap();

        // Nothing listens on the discard port, so resolving must try to
        // download instead of returning the other URL's file
        let source = ModelSource::Remote {
            url: "http://127.0.0.1:9/other-style.onnx".to_string(),
        };
        let err = cache.get_model_path(&source).unwrap_err();

        assert!(matches!(err, Error::ModelDownload { .. }));
    }

    #[test]
    fn test_local_model_path() {
        let dir = tempdir().unwrap();
        let cache = ModelCache::with_dir(dir.path().join("cache")).unwrap();
        let model = dir.path().join("style.onnx");
        fs::write(&model, b"onnx").unwrap();

        let path = cache.get_model_path(&ModelSource::Local(model.clone())).unwrap();

        assert_eq!(path, model);
    }

    #[test]
    fn test_missing_local_model() {
        let dir = tempdir().unwrap();
        let cache = ModelCache::with_dir(dir.path()).unwrap();

        let err = cache
            .get_model_path(&ModelSource::Local(dir.path().join("missing.onnx")))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}
