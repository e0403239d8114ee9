//! Temporary files produced by a run and the image sources a caller can
//! supply.
//!
//! Owned artifacts are [`TempPath`] handles: dropping one deletes the file,
//! so every exit path of a run cleans up after itself.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};
use url::Url;

use crate::error::{GenerationError, Result};

/// Where a segment's image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Remote image, downloaded into an owned temp file.
    Url(String),
    /// Existing local file, referenced and never deleted.
    Path(PathBuf),
}

impl ImageSource {
    /// Classify a user-supplied string as an http(s) URL or a local path.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Url(source.to_string()),
            _ => Self::Path(PathBuf::from(source)),
        }
    }
}

impl FromStr for ImageSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Image attached to a segment.
#[derive(Debug)]
pub enum ImageArtifact {
    /// Downloaded or generated; deleted on release.
    Owned(TempPath),
    /// Caller's own file; left in place.
    Referenced(PathBuf),
}

impl ImageArtifact {
    /// Reference an existing local file.
    pub fn reference(path: &Path) -> Result<Self> {
        if path.is_file() {
            Ok(Self::Referenced(path.to_path_buf()))
        } else {
            Err(GenerationError::InvalidImageSource(path.to_path_buf()))
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Owned(temp) => &**temp,
            Self::Referenced(path) => path.as_path(),
        }
    }

    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Delete the file if it is owned; referenced files are untouched.
    pub fn release(self) {
        match self {
            Self::Owned(temp) => discard(temp),
            Self::Referenced(path) => debug!("Keeping referenced image {:?}", path),
        }
    }
}

/// Create an empty temp file in `dir` with the given suffix.
pub fn create_temp(dir: &Path, suffix: &str) -> io::Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    tempfile::Builder::new()
        .prefix("vidmaker-")
        .suffix(suffix)
        .tempfile_in(dir)
}

/// Reserve a temp path in `dir` for a tool that writes the file itself.
pub fn reserve_temp(dir: &Path, suffix: &str) -> io::Result<TempPath> {
    create_temp(dir, suffix).map(NamedTempFile::into_temp_path)
}

/// Delete an owned temp file, tolerating one that is already gone.
pub fn discard(temp: TempPath) {
    let path = temp.to_path_buf();
    match temp.close() {
        Ok(()) => debug!("Deleted {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to delete {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_urls() {
        assert_eq!(
            ImageSource::parse("https://example.com/cat.png"),
            ImageSource::Url("https://example.com/cat.png".to_string())
        );
        assert_eq!(
            ImageSource::parse("http://example.com/cat.png"),
            ImageSource::Url("http://example.com/cat.png".to_string())
        );
    }

    #[test]
    fn everything_else_is_a_path() {
        assert_eq!(
            ImageSource::parse("/srv/img/cat.png"),
            ImageSource::Path(PathBuf::from("/srv/img/cat.png"))
        );
        assert_eq!(
            ImageSource::parse("file:///srv/cat.png"),
            ImageSource::Path(PathBuf::from("file:///srv/cat.png"))
        );
        assert_eq!(
            ImageSource::parse("cat.png"),
            ImageSource::Path(PathBuf::from("cat.png"))
        );
    }

    #[test]
    fn referencing_missing_file_fails() {
        let err = ImageArtifact::reference(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidImageSource(_)));
    }

    #[test]
    fn owned_release_deletes_referenced_release_keeps() {
        let dir = tempfile::tempdir().unwrap();

        let owned = reserve_temp(dir.path(), ".png").unwrap();
        let owned_path = owned.to_path_buf();
        ImageArtifact::Owned(owned).release();
        assert!(!owned_path.exists());

        let kept = dir.path().join("mine.png");
        std::fs::write(&kept, b"png").unwrap();
        let referenced = ImageArtifact::reference(&kept).unwrap();
        assert!(!referenced.is_owned());
        referenced.release();
        assert!(kept.exists());
    }

    #[test]
    fn discarding_vanished_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let temp = reserve_temp(dir.path(), ".mp3").unwrap();
        std::fs::remove_file(&temp).unwrap();
        discard(temp);
    }
}
