//! Media type detection from magic bytes

use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Media type assumed when the leading bytes are not recognised
pub const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";

/// Enough leading bytes for the longest signature (`RIFF....WEBP`)
const SNIFF_LEN: u64 = 16;

/// Detects the media type of cached images; never fails
pub struct ContentTypeSniffer;

impl ContentTypeSniffer {
    /// Detect from the leading bytes of an in-memory image
    pub fn detect_bytes(bytes: &[u8]) -> &'static str {
        infer::get(bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type())
            .unwrap_or(FALLBACK_MEDIA_TYPE)
    }

    /// Detect from the leading bytes of a file on disk
    ///
    /// For callers holding only a path. The request path already has the
    /// bytes in memory and uses [`Self::detect_bytes`].
    pub async fn detect(path: &Path) -> &'static str {
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        let read = async {
            let file = tokio::fs::File::open(path).await?;
            file.take(SNIFF_LEN).read_to_end(&mut head).await
        };

        match read.await {
            Ok(_) => Self::detect_bytes(&head),
            Err(e) => {
                debug!("Could not sniff {}: {}", path.display(), e);
                FALLBACK_MEDIA_TYPE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const PNG_HEAD: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const WEBP_HEAD: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 ";

    #[test]
    fn test_detects_known_signatures() {
        assert_eq!(ContentTypeSniffer::detect_bytes(JPEG_HEAD), "image/jpeg");
        assert_eq!(ContentTypeSniffer::detect_bytes(PNG_HEAD), "image/png");
        assert_eq!(ContentTypeSniffer::detect_bytes(WEBP_HEAD), "image/webp");
    }

    #[test]
    fn test_falls_back_to_jpeg() {
        assert_eq!(ContentTypeSniffer::detect_bytes(b"<html>nope</html>"), FALLBACK_MEDIA_TYPE);
        assert_eq!(ContentTypeSniffer::detect_bytes(&[]), FALLBACK_MEDIA_TYPE);
        // Recognised but not an image
        assert_eq!(
            ContentTypeSniffer::detect_bytes(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3"),
            FALLBACK_MEDIA_TYPE
        );
    }

    #[tokio::test]
    async fn test_detects_from_file_and_tolerates_missing_files() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("thumb.jpg");
        let mut png = PNG_HEAD.to_vec();
        png.extend_from_slice(&[0u8; 64]);
        tokio::fs::write(&path, &png).await.unwrap();

        assert_eq!(ContentTypeSniffer::detect(&path).await, "image/png");
        assert_eq!(
            ContentTypeSniffer::detect(&temp.path().join("absent.jpg")).await,
            FALLBACK_MEDIA_TYPE
        );
    }
}
