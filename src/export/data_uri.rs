//! Transport decoding for overlay artifacts.
//!
//! Overlays travel as self-describing data URIs, e.g.
//! `data:image/png;base64,iVBOR...`.

use base64::{engine::general_purpose, Engine as _};

/// Media type declared by a data URI, when one is present.
pub fn media_type(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("data:")?;
    let header = rest.split_once(',')?.0;
    let media = header.split(';').next().unwrap_or("");
    (!media.is_empty()).then_some(media)
}

/// Decode the payload of a base64 data URI into raw bytes.
pub fn decode(uri: &str) -> Result<Vec<u8>, String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| "missing `data:` scheme".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "missing `,` payload separator".to_string())?;
    if !header.split(';').any(|part| part == "base64") {
        return Err("payload is not base64-encoded".to_string());
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_png_data_uri() {
        let uri = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(b"not-really-a-png")
        );
        assert_eq!(decode(&uri).unwrap(), b"not-really-a-png");
        assert_eq!(media_type(&uri), Some("image/png"));
    }

    #[test]
    fn rejects_a_uri_without_the_scheme() {
        assert!(decode("image/png;base64,AAAA").is_err());
    }

    #[test]
    fn rejects_a_uri_without_a_payload_separator() {
        assert!(decode("data:image/png;base64").is_err());
    }

    #[test]
    fn rejects_a_non_base64_encoding() {
        assert!(decode("data:image/png,rawbytes").is_err());
    }

    #[test]
    fn rejects_an_invalid_payload() {
        let err = decode("data:image/png;base64,@@@@").unwrap_err();
        assert!(err.contains("invalid base64"));
    }

    #[test]
    fn media_type_is_absent_when_the_header_is_empty() {
        assert_eq!(media_type("data:;base64,AAAA"), None);
        assert_eq!(media_type("plain text"), None);
    }
}
