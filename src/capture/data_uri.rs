/// Self-contained `data:` URI encoding for captured images
///
/// Both acquisition variants hand images around as
/// `data:<mime>;base64,<payload>` so callers never need extra I/O.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::error::AcquisitionError;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Encode raw bytes as a base64 data URI
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("{}{}{},{}", SCHEME, mime, BASE64_MARKER, STANDARD.encode(bytes))
}

/// Split a base64 data URI into its MIME type and decoded bytes
///
/// Only base64 payloads are accepted; percent-encoded text URIs never
/// come out of a camera.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>), AcquisitionError> {
    let rest = uri
        .strip_prefix(SCHEME)
        .ok_or_else(|| AcquisitionError::UnsupportedFormat("not a data URI".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AcquisitionError::UnsupportedFormat("data URI has no payload".to_string()))?;

    let mime = header.strip_suffix(BASE64_MARKER).ok_or_else(|| {
        AcquisitionError::UnsupportedFormat("data URI is not base64 encoded".to_string())
    })?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AcquisitionError::UnsupportedFormat(format!("bad base64 payload: {}", e)))?;

    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape() {
        let uri = encode("image/png", &[0x89, b'P', b'N', b'G']);
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_decode_recovers_mime_and_bytes() {
        let (mime, bytes) = decode("data:image/jpeg;base64,/9j/").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_decode_rejects_file_paths() {
        let err = decode("/storage/emulated/0/DCIM/photo.jpg").unwrap_err();
        assert!(matches!(err, AcquisitionError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_decode_rejects_non_base64() {
        assert!(decode("data:text/plain,hello").is_err());
        assert!(decode("data:image/png;base64,@@@").is_err());
    }
}
