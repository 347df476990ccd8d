//! Ambient helpers shared across the crate: dynamic input normalization
//! (spec §6) and the named page-size table (spec §5).

use crate::error::{PdfError, Result};

/// Caller-facing dynamic input shape for the few entry points that accept
/// more than a plain byte buffer (`Document::load`, `embed_font`,
/// `embed_jpg`, `embed_png`).
#[derive(Clone, Debug)]
pub enum PdfInput {
    Bytes(Vec<u8>),
    Base64(String),
    DataUri(String),
}

impl From<Vec<u8>> for PdfInput {
    fn from(bytes: Vec<u8>) -> PdfInput {
        PdfInput::Bytes(bytes)
    }
}

impl From<&[u8]> for PdfInput {
    fn from(bytes: &[u8]) -> PdfInput {
        PdfInput::Bytes(bytes.to_vec())
    }
}

/// Normalize any accepted input shape into a canonical byte buffer before
/// parsing begins. Base64 payloads tolerate interior whitespace; a data URI's
/// MIME type is not validated, only its `;base64,` payload is extracted.
pub fn normalize_input(input: PdfInput) -> Result<Vec<u8>> {
    match input {
        PdfInput::Bytes(b) => Ok(b),
        PdfInput::Base64(s) => decode_base64(&s),
        PdfInput::DataUri(s) => {
            let payload = s
                .split_once(";base64,")
                .map(|(_, payload)| payload)
                .ok_or(PdfError::InvalidInputType { reason: "malformed data URI".into() })?;
            decode_base64(payload)
        }
    }
}

fn decode_base64(s: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|_| PdfError::InvalidInputType { reason: "invalid base64".into() })
}

pub fn encode_base64(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// A named page size, in PDF points (1/72 inch), as `[width, height]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    A3,
    A5,
    A7,
}

impl PageSize {
    pub fn dimensions(&self) -> [f64; 2] {
        match self {
            PageSize::A4 => [595.28, 841.89],
            PageSize::Letter => [612.0, 792.0],
            PageSize::Legal => [612.0, 1008.0],
            PageSize::A3 => [841.89, 1190.55],
            PageSize::A5 => [419.53, 595.28],
            PageSize::A7 => [209.76, 297.64],
        }
    }
}

impl Default for PageSize {
    fn default() -> PageSize {
        PageSize::A4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_dimensions() {
        assert_eq!(PageSize::A4.dimensions(), [595.28, 841.89]);
    }

    #[test]
    fn base64_roundtrip() {
        let data = b"hello pdf".to_vec();
        let encoded = encode_base64(&data);
        let decoded = normalize_input(PdfInput::Base64(encoded)).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn base64_tolerates_whitespace() {
        let data = b"hi".to_vec();
        let encoded = encode_base64(&data);
        let spaced = format!(" {}\n{} ", &encoded[..1], &encoded[1..]);
        assert_eq!(normalize_input(PdfInput::Base64(spaced)).unwrap(), data);
    }

    #[test]
    fn data_uri_extracts_payload() {
        let data = b"xyz".to_vec();
        let encoded = encode_base64(&data);
        let uri = format!("data:application/pdf;base64,{}", encoded);
        assert_eq!(normalize_input(PdfInput::DataUri(uri)).unwrap(), data);
    }
}
