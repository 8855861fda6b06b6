use super::TempFile;
use byteorder::{ByteOrder, LittleEndian};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Check at startup whether the external encoder can be spawned at all.
pub async fn encoder_available(binary: &str) -> bool {
    match Command::new(binary).arg("-version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Re-encode an uploaded recording to 16 kHz mono 16-bit PCM WAV next to the
/// input file (`<input>.wav`).
///
/// Returns `None` when the encoder fails for any reason; the caller then
/// submits the original upload unchanged. The returned guard removes the
/// converted file when dropped.
pub async fn convert_to_wav(binary: &str, input: &Path) -> Option<TempFile> {
    let output_path = {
        let mut name = input.as_os_str().to_os_string();
        name.push(".wav");
        PathBuf::from(name)
    };

    let result = Command::new(binary)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
        .arg(&output_path)
        .output()
        .await;

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            warn!(binary = %binary, error = %e, "Could not spawn audio encoder, submitting original upload");
            return None;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            exit_code = ?output.status.code(),
            stderr = %stderr.trim(),
            "Audio conversion failed, submitting original upload"
        );
        // ffmpeg can leave a partial output file behind on failure
        let _ = std::fs::remove_file(&output_path);
        return None;
    }

    let converted = TempFile::new(output_path);

    match is_riff_wav(converted.path()).await {
        Ok(true) => {
            debug!(path = %converted.path().display(), "Upload re-encoded to WAV");
            Some(converted)
        }
        Ok(false) => {
            warn!("Encoder output is not a RIFF/WAVE stream, submitting original upload");
            None
        }
        Err(e) => {
            warn!(error = %e, "Could not inspect encoder output, submitting original upload");
            None
        }
    }
}

/// Sanity-check the first bytes of the encoder output: "RIFF", a non-zero
/// little-endian chunk size, then "WAVE".
async fn is_riff_wav(path: &Path) -> std::io::Result<bool> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut header = [0u8; 12];
    file.read_exact(&mut header).await?;

    let declared_size = LittleEndian::read_u32(&header[4..8]);

    Ok(&header[0..4] == b"RIFF" && declared_size > 0 && &header[8..12] == b"WAVE")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header_bytes(declared_size: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        let mut size = [0u8; 4];
        LittleEndian::write_u32(&mut size, declared_size);
        bytes.extend_from_slice(&size);
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes
    }

    #[tokio::test]
    async fn test_riff_header_detection() {
        let dir = tempfile::tempdir().unwrap();

        let wav = dir.path().join("good.wav");
        std::fs::write(&wav, wav_header_bytes(36)).unwrap();
        assert!(is_riff_wav(&wav).await.unwrap());

        let not_wav = dir.path().join("bad.wav");
        std::fs::write(&not_wav, b"OggS-not-a-wav-at-all").unwrap();
        assert!(!is_riff_wav(&not_wav).await.unwrap());

        // Zero declared size means the encoder produced an empty shell
        let empty_shell = dir.path().join("empty.wav");
        std::fs::write(&empty_shell, wav_header_bytes(0)).unwrap();
        assert!(!is_riff_wav(&empty_shell).await.unwrap());
    }

    #[tokio::test]
    async fn test_riff_check_fails_on_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("tiny.wav");
        std::fs::write(&stub, b"RIFF").unwrap();

        assert!(is_riff_wav(&stub).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_encoder_is_not_available() {
        assert!(!encoder_available("ffmpeg-binary-that-does-not-exist-anywhere").await);
    }

    #[tokio::test]
    async fn test_conversion_with_missing_encoder_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.webm");
        std::fs::write(&input, b"fake-opus-bytes").unwrap();

        let converted =
            convert_to_wav("ffmpeg-binary-that-does-not-exist-anywhere", &input).await;
        assert!(converted.is_none());

        // No stray output file may be left behind
        assert!(!dir.path().join("clip.webm.wav").exists());
        // And the input must be untouched
        assert!(input.exists());
    }
}
