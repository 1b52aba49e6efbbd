//! Answer-sheet payload repair.
//!
//! The sheet holds either a plain image URL or a base64 data uri that was too
//! long for one cell and got split across every column from `image_start` to
//! the end of the row. On its way into the sheet the text is mangled in three
//! known ways, undone here in this order:
//!
//! 1. `_` was inserted upstream to stop the editor from auto-formatting the
//!    text; every underscore is dropped.
//! 2. the editor wraps long cells, leaving CR/LF in the value; they are dropped.
//! 3. the sheet displays `+` as a space; spaces are turned back into `+`
//!    (space is never part of the base64 alphabet).
//!
//! This mirrors whatever the sheet does today and nothing more. If the sheet's
//! text handling changes, this module is where images start breaking.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::ImageError;

const DATA_IMAGE_PREFIX: &str = "data:image/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Empty,
    Url,
    DataUri,
    Malformed,
}

pub fn reconstruct(row: &[String], image_start: usize) -> String {
    let Some(first) = row.get(image_start) else {
        return String::new();
    };
    if is_http_url(first) {
        return first.clone();
    }
    let joined: String = row[image_start..].concat();
    repair(&joined)
}

pub fn repair(joined: &str) -> String {
    joined
        .replace('_', "")
        .replace(['\r', '\n'], "")
        .replace(' ', "+")
}

pub fn is_http_url(value: &str) -> bool {
    let head = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}

pub fn inspect_payload(payload: &str) -> PayloadKind {
    if payload.is_empty() {
        PayloadKind::Empty
    } else if is_http_url(payload) {
        PayloadKind::Url
    } else if payload.starts_with(DATA_IMAGE_PREFIX) {
        PayloadKind::DataUri
    } else {
        PayloadKind::Malformed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Splits `data:<mime>;base64,<payload>` and decodes the payload.
pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, ImageError> {
    let rest = uri.strip_prefix("data:").ok_or(ImageError::NotDataUri)?;
    let (meta, payload) = rest.split_once(',').ok_or(ImageError::NotDataUri)?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or(ImageError::NotDataUri)?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(pad_base64(&cleaned).as_bytes())
        .map_err(|err| ImageError::Base64(err.to_string()))?;
    Ok(DecodedImage {
        mime: mime.to_string(),
        bytes,
    })
}

fn pad_base64(payload: &str) -> String {
    let trimmed = payload.trim_end_matches('=');
    let mut padded = trimmed.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn http_url_is_returned_untouched() {
        let row = cells(&["1", "d", "n", "s", "10", "https://example.com/x.jpg", "ignored_ shard"]);
        assert_eq!(reconstruct(&row, 5), "https://example.com/x.jpg");
        let upper = cells(&["HTTP://example.com/a b_c.png"]);
        assert_eq!(reconstruct(&upper, 0), "HTTP://example.com/a b_c.png");
    }

    #[test]
    fn shards_are_joined_then_repaired_in_order() {
        // Brittle by nature: pinned to the sheet's current text mangling.
        let row = cells(&["data:image/jpeg;base64,/9j_4AA", "Q_ w=="]);
        assert_eq!(reconstruct(&row, 0), "data:image/jpeg;base64,/9j4AAQ+w==");
    }

    #[test]
    fn line_breaks_of_every_flavour_are_stripped() {
        let row = cells(&["x", "data:image/png;base64,iV\r\nBO", "Rw\n0K\rGg"]);
        assert_eq!(reconstruct(&row, 1), "data:image/png;base64,iVBORw0KGg");
    }

    #[test]
    fn missing_image_column_yields_empty() {
        let row = cells(&["1", "2005-01-01", "name"]);
        assert_eq!(reconstruct(&row, 5), "");
        assert_eq!(inspect_payload(""), PayloadKind::Empty);
    }

    #[test]
    fn payload_kinds() {
        assert_eq!(inspect_payload("https://a/b.jpg"), PayloadKind::Url);
        assert_eq!(inspect_payload("data:image/png;base64,AAAA"), PayloadKind::DataUri);
        assert_eq!(inspect_payload("/9j/4AAQ"), PayloadKind::Malformed);
    }

    #[test]
    fn decodes_data_uri_with_missing_padding() {
        let decoded = decode_data_uri("data:image/png;base64,aGVsbG8").unwrap();
        assert_eq!(decoded.mime, "image/png");
        assert_eq!(decoded.bytes, b"hello");
    }

    #[test]
    fn rejects_non_base64_uris() {
        assert_eq!(
            decode_data_uri("https://example.com/x.jpg"),
            Err(ImageError::NotDataUri)
        );
        assert_eq!(
            decode_data_uri("data:text/plain,hello"),
            Err(ImageError::NotDataUri)
        );
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@@@"),
            Err(ImageError::Base64(_))
        ));
    }
}
