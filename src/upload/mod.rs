//! Storage for finished recordings.
//!
//! [`AudioUploader`] takes the assembled audio plus [`AudioMetadata`] and
//! returns a location string the user can retrieve it from.
//! [`LocalUploader`] writes into a directory under the name
//! `YYYY-MM-DD_<8 hex chars>.mp3` and reports either the file path or a URL
//! under a configured public base (for a directory served or synced
//! elsewhere).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::OutputConfig;
use crate::tts::Voice;

/// Attempts at finding an unused file name before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no free file name in {} after {} attempts", .0.display(), MAX_NAME_ATTEMPTS)]
    NameExhausted(PathBuf),
}

/// Descriptive data travelling with a recording.
#[derive(Debug, Clone)]
pub struct AudioMetadata {
    pub title: String,
    pub voice: Voice,
    pub created_at: DateTime<Local>,
}

impl AudioMetadata {
    /// Metadata stamped with the current local time.
    pub fn now(title: impl Into<String>, voice: Voice) -> Self {
        Self {
            title: title.into(),
            voice,
            created_at: Local::now(),
        }
    }
}

#[async_trait]
pub trait AudioUploader: Send + Sync {
    async fn upload(&self, audio: &[u8], meta: &AudioMetadata) -> Result<String, UploadError>;
}

/// `YYYY-MM-DD_<suffix as hex>.mp3`
pub fn audio_file_name(created_at: &DateTime<Local>, suffix: [u8; 4]) -> String {
    format!("{}_{}.mp3", created_at.format("%Y-%m-%d"), hex::encode(suffix))
}

// ---------------------------------------------------------------------------
// LocalUploader
// ---------------------------------------------------------------------------

pub struct LocalUploader {
    dir: PathBuf,
    public_base_url: Option<String>,
}

impl LocalUploader {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.resolved_dir(), config.public_base_url.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn location(&self, path: &Path, file_name: &str) -> String {
        match self.public_base_url.as_deref().filter(|u| !u.is_empty()) {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), file_name),
            None => path.display().to_string(),
        }
    }
}

#[async_trait]
impl AudioUploader for LocalUploader {
    async fn upload(&self, audio: &[u8], meta: &AudioMetadata) -> Result<String, UploadError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| UploadError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = audio_file_name(&meta.created_at, rand::random());
            let path = self.dir.join(&file_name);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(UploadError::Write { path, source }),
            };

            log::info!(
                "upload: writing '{}' ({}, {} bytes) to {}",
                meta.title,
                meta.voice,
                audio.len(),
                path.display()
            );
            let started = std::time::Instant::now();
            write_or_discard(&mut file, &path, audio).await?;
            log::debug!("upload: took {:?}", started.elapsed());

            return Ok(self.location(&path, &file_name));
        }

        Err(UploadError::NameExhausted(self.dir.clone()))
    }
}

async fn write_and_flush<W>(writer: &mut W, audio: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(audio).await?;
    writer.flush().await
}

/// Write `audio` through `writer`; on failure the partial file at `path` is
/// removed so no truncated recording is left behind.
async fn write_or_discard<W>(writer: &mut W, path: &Path, audio: &[u8]) -> Result<(), UploadError>
where
    W: AsyncWrite + Unpin,
{
    let Err(source) = write_and_flush(writer, audio).await else {
        return Ok(());
    };
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::warn!("upload: could not remove partial file {}: {e}", path.display());
    }
    Err(UploadError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;

    fn fixed_meta() -> AudioMetadata {
        AudioMetadata {
            title: "An Article".into(),
            voice: Voice::Onyx,
            created_at: Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn file_name_is_date_and_hex_suffix() {
        let name = audio_file_name(&fixed_meta().created_at, [0xde, 0xad, 0x00, 0x0f]);
        assert_eq!(name, "2024-03-09_dead000f.mp3");
    }

    #[tokio::test]
    async fn writes_audio_and_returns_path() {
        let dir = tempdir().unwrap();
        let uploader = LocalUploader::new(dir.path().join("nested/out"), None);

        let location = uploader.upload(b"ID3 frames", &fixed_meta()).await.unwrap();

        let path = PathBuf::from(&location);
        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("2024-03-09_"));
        assert!(name.ends_with(".mp3"));
        assert_eq!(name.len(), "2024-03-09_".len() + 8 + ".mp3".len());
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3 frames");
    }

    #[tokio::test]
    async fn public_base_url_replaces_local_path() {
        let dir = tempdir().unwrap();
        let uploader =
            LocalUploader::new(dir.path(), Some("https://cdn.example.com/speecher/".into()));

        let location = uploader.upload(b"x", &fixed_meta()).await.unwrap();

        assert!(location.starts_with("https://cdn.example.com/speecher/2024-03-09_"));
        assert!(location.ends_with(".mp3"));
    }

    #[tokio::test]
    async fn repeated_uploads_get_distinct_names() {
        let dir = tempdir().unwrap();
        let uploader = LocalUploader::new(dir.path(), None);
        let meta = fixed_meta();

        let a = uploader.upload(b"a", &meta).await.unwrap();
        let b = uploader.upload(b"b", &meta).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn unwritable_directory_is_reported() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let uploader = LocalUploader::new(blocker.join("sub"), None);

        let err = uploader.upload(b"x", &fixed_meta()).await.unwrap_err();
        assert!(matches!(err, UploadError::CreateDir { .. }));
    }

    #[test]
    fn from_config_uses_output_settings() {
        let config = OutputConfig {
            dir: Some(PathBuf::from("/srv/audio")),
            public_base_url: None,
        };
        let uploader = LocalUploader::from_config(&config);
        assert_eq!(uploader.dir(), Path::new("/srv/audio"));
    }

    /// Accepts nothing; every write fails.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::Error::new(ErrorKind::Other, "no space left")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(audio_file_name(&fixed_meta().created_at, [1, 2, 3, 4]));
        std::fs::write(&path, b"ID3 ").unwrap();

        let err = write_or_discard(&mut FullDisk, &path, &[0u8; 4096])
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Write { ref path, .. } if path.ends_with("2024-03-09_01020304.mp3")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn successful_write_keeps_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keep.mp3");
        let mut file = tokio::fs::File::create(&path).await.unwrap();

        write_or_discard(&mut file, &path, b"frames").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"frames");
    }
}
