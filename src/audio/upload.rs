use crate::error::AppError;
use actix_multipart::Multipart;
use futures_util::stream::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// A file on disk that is removed when this guard is dropped.
///
/// Uploads and their re-encoded derivatives only live for the duration of one
/// request; holding them behind this guard means no code path, early return
/// or provider failure can leak them.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove temporary file");
            }
        }
    }
}

/// An upload spooled to disk, plus what the client told us about it.
#[derive(Debug)]
pub struct SavedUpload {
    /// Guard holding the uploaded bytes.
    pub file: TempFile,
    /// Filename as sent by the client; its extension drives container
    /// detection downstream.
    pub filename: String,
    pub size_bytes: usize,
}

/// Stream the multipart `file` field into `upload_dir` under a fresh
/// UUID-based name.
///
/// Returns `Ok(None)` when the form contained no `file` field; the caller
/// decides whether that is an error. The size cap is enforced per chunk, so
/// an oversized upload is rejected (and its partial spool file removed)
/// without ever being buffered whole.
pub async fn save_upload(
    mut payload: Multipart,
    upload_dir: &Path,
    max_bytes: usize,
) -> Result<Option<SavedUpload>, AppError> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))?;

    let mut saved: Option<SavedUpload> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::ValidationError("Missing content disposition".to_string()))?;

        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::ValidationError("Missing field name".to_string()))?;

        if field_name != "file" {
            continue;
        }

        // Browsers typically record with MediaRecorder and name the blob
        // something like "recording.webm"; fall back to that when the client
        // sent no filename at all.
        let client_filename = content_disposition
            .get_filename()
            .unwrap_or("recording.webm")
            .to_string();

        let temp_name = match Path::new(&client_filename)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        let guard = TempFile::new(upload_dir.join(temp_name));
        let mut file = tokio::fs::File::create(guard.path())
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload file: {}", e)))?;

        let mut size_bytes: usize = 0;
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::ValidationError(format!("Upload stream error: {}", e)))?;

            size_bytes += chunk.len();
            if size_bytes > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "Audio file too large (max: {} bytes)",
                    max_bytes
                )));
            }

            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to write upload: {}", e)))?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to flush upload: {}", e)))?;
        drop(file);

        debug!(
            filename = %client_filename,
            size_bytes,
            path = %guard.path().display(),
            "Upload spooled to disk"
        );

        saved = Some(SavedUpload {
            file: guard,
            filename: client_filename,
            size_bytes,
        });
    }

    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::error::PayloadError;
    use actix_web::http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use actix_web::web::Bytes;
    use futures_util::stream;

    const BOUNDARY: &str = "test-boundary-7f3a";

    fn form_with_field(field_name: &str, filename: &str, content: &[u8]) -> Multipart {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field_name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: audio/webm\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={}", BOUNDARY)).unwrap(),
        );

        Multipart::new(
            &headers,
            stream::once(async move { Ok::<_, PayloadError>(Bytes::from(body)) }),
        )
    }

    #[actix_web::test]
    async fn test_save_upload_spools_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let payload = form_with_field("file", "clip.webm", b"fake-opus-bytes");

        let saved = save_upload(payload, dir.path(), 1024)
            .await
            .unwrap()
            .expect("file field should be saved");

        assert_eq!(saved.filename, "clip.webm");
        assert_eq!(saved.size_bytes, b"fake-opus-bytes".len());
        assert_eq!(
            saved.file.path().extension().and_then(|e| e.to_str()),
            Some("webm")
        );
        let on_disk = std::fs::read(saved.file.path()).unwrap();
        assert_eq!(on_disk, b"fake-opus-bytes");

        let path = saved.file.path().to_path_buf();
        drop(saved);
        assert!(!path.exists(), "guard should remove the file on drop");
    }

    #[actix_web::test]
    async fn test_save_upload_ignores_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let payload = form_with_field("attachment", "clip.webm", b"bytes");

        let saved = save_upload(payload, dir.path(), 1024).await.unwrap();
        assert!(saved.is_none());
    }

    #[actix_web::test]
    async fn test_save_upload_enforces_size_cap() {
        let dir = tempfile::tempdir().unwrap();
        let payload = form_with_field("file", "clip.webm", &[0u8; 64]);

        let err = save_upload(payload, dir.path(), 16).await.unwrap_err();
        match err {
            AppError::ValidationError(msg) => assert!(msg.contains("too large")),
            other => panic!("expected ValidationError, got {:?}", other),
        }

        // The partial spool file must have been cleaned up with the failure
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_temp_file_guard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.bin");
        std::fs::write(&path, b"scratch").unwrap();

        let guard = TempFile::new(path.clone());
        assert!(path.exists());
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_file_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        // Never created; drop must not panic
        let guard = TempFile::new(dir.path().join("never-created.bin"));
        drop(guard);
    }
}
