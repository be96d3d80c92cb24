use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Cache folder name under the platform cache root.
const APP_DIR: &str = "FaceTrack";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download interrupted for {url}: {source}")]
    Interrupted {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64)>;

/// Resolve the detector model file.
///
/// An explicit path wins and must exist. Otherwise the model is looked up by
/// `name` in the user cache directory and downloaded from `url` on a miss.
pub fn resolve(
    name: &str,
    url: &str,
    explicit: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::NotFound(path.to_path_buf()))
        };
    }

    let cache_dir = model_cache_dir()?;
    resolve_in(&cache_dir, name, url, progress)
}

fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.is_file() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    log::info!("Downloading {name} to {}", cache_dir.display());
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceTrack/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceTrack/models/` or `~/.cache/FaceTrack/models/`
/// - Windows: `%LOCALAPPDATA%/FaceTrack/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let root = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let root = dirs::cache_dir();

    root.map(|d| d.join(APP_DIR).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_to(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Streams the body into `temp_path`, then renames it over `dest`.
fn download_to(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let download_err = |source: reqwest::Error| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;
    copy_with_progress(&mut response, &mut file, url, temp_path, total, progress.as_ref())?;
    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))?;
    Ok(())
}

/// Copies `body` into `file` in 1 MiB chunks, reporting progress after each.
/// Read failures are download errors; write failures name `temp_path`.
fn copy_with_progress(
    body: &mut impl Read,
    file: &mut impl Write,
    url: &str,
    temp_path: &Path,
    total: u64,
    progress: Option<&ProgressFn>,
) -> Result<u64, ModelResolveError> {
    let mut buf = vec![0u8; 1024 * 1024];
    let mut downloaded: u64 = 0;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(ModelResolveError::Interrupted {
                    url: url.to_string(),
                    source,
                })
            }
        };
        file.write_all(&buf[..n]).map_err(|source| ModelResolveError::Write {
            path: temp_path.to_path_buf(),
            source,
        })?;
        downloaded += n as u64;
        if let Some(cb) = progress {
            cb(downloaded, total);
        }
    }
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNREACHABLE_URL: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_explicit_path_is_returned() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("face.onnx");
        fs::write(&model, b"model").unwrap();

        let resolved = resolve("ignored.onnx", UNREACHABLE_URL, Some(&model), None).unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("absent.onnx");

        let err = resolve("ignored.onnx", UNREACHABLE_URL, Some(&model), None).unwrap_err();
        assert!(matches!(err, ModelResolveError::NotFound(ref p) if p == &model));
    }

    #[test]
    fn test_explicit_directory_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let result = resolve("ignored.onnx", UNREACHABLE_URL, Some(tmp.path()), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_cached_file_skips_download() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("face.onnx"), b"cached").unwrap();

        let resolved = resolve_in(tmp.path(), "face.onnx", UNREACHABLE_URL, None).unwrap();
        assert_eq!(resolved, tmp.path().join("face.onnx"));
    }

    #[test]
    fn test_cache_miss_with_unreachable_url_fails_cleanly() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("models");

        let err = resolve_in(&cache, "face.onnx", UNREACHABLE_URL, None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Download { .. }));
        assert!(!cache.join("face.onnx").exists());
        assert!(!cache.join("face.part").exists());
    }

    /// Yields `chunk` once, then fails like a dropped connection.
    struct FailingBody {
        chunk: Option<Vec<u8>>,
    }

    impl Read for FailingBody {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.chunk.take() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                )),
            }
        }
    }

    #[test]
    fn test_body_read_failure_is_reported_as_interrupted_download() {
        let mut body = FailingBody {
            chunk: Some(b"partial".to_vec()),
        };
        let mut sink = Vec::new();

        let err = copy_with_progress(
            &mut body,
            &mut sink,
            UNREACHABLE_URL,
            Path::new("face.part"),
            0,
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ModelResolveError::Interrupted { ref url, .. } if url == UNREACHABLE_URL
        ));
        assert!(err.to_string().starts_with("download interrupted"));
        assert_eq!(sink, b"partial");
    }

    #[test]
    fn test_copy_reports_cumulative_progress() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink_seen = std::rc::Rc::clone(&seen);
        let progress: ProgressFn =
            Box::new(move |done, total| sink_seen.borrow_mut().push((done, total)));

        let mut body: &[u8] = b"model bytes";
        let mut sink = Vec::new();
        let copied = copy_with_progress(
            &mut body,
            &mut sink,
            UNREACHABLE_URL,
            Path::new("face.part"),
            11,
            Some(&progress),
        )
        .unwrap();

        assert_eq!(copied, 11);
        assert_eq!(sink, b"model bytes");
        assert_eq!(*seen.borrow(), vec![(11, 11)]);
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR));
        assert!(path.ends_with("models"));
    }
}
