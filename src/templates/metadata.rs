//! Best-effort facts about template files.
//!
//! Categories come from folder and file name keywords. Dimensions and photo
//! counts come from the PNG header or from `width`/`height`/`photoCount`
//! fields found in JSON and XML layout descriptions. Nothing here fails: an
//! unrecognised file simply yields fewer facts.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Keyword table, checked in order against a lowercased name.
const CATEGORY_KEYWORDS: &[(&[&str], &str)] = &[
    (&["4x6", "print"], "Prints"),
    (&["strip", "2x6"], "Strips"),
    (&["gif", "boomerang"], "Animated"),
    (&["green", "screen"], "GreenScreen"),
];

pub const DEFAULT_CATEGORY: &str = "General";

// Matches `"width": 600`, `width="600"` and `<Width>600</Width>`.
static DIMENSION_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(width|height|photo_?count)\b["']?\s*[:=>]\s*["']?(\d+)"#).ok()
});

fn keyword_category(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, category)| *category)
}

/// Category for a template, by its relative id (`Strips/classic.png`).
///
/// The containing folder wins over the file name.
#[must_use]
pub fn categorize(item_id: &str) -> &'static str {
    let mut parts = item_id.rsplit('/');
    let file_name = parts.next().unwrap_or_default();
    parts
        .next()
        .and_then(keyword_category)
        .or_else(|| keyword_category(file_name))
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Width and height from a PNG IHDR chunk.
#[must_use]
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || &bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

/// Dimension fields mentioned in a text layout. First occurrence wins.
#[must_use]
pub fn text_dimensions(text: &str) -> Map<String, Value> {
    let mut found = Map::new();
    let Some(pattern) = DIMENSION_PATTERN.as_ref() else {
        return found;
    };
    for caps in pattern.captures_iter(text) {
        let key = match caps[1].to_ascii_lowercase().as_str() {
            "width" => "width",
            "height" => "height",
            _ => "photoCount",
        };
        if found.contains_key(key) {
            continue;
        }
        if let Ok(n) = caps[2].parse::<u64>() {
            found.insert(key.to_string(), Value::from(n));
        }
    }
    found
}

/// Metadata for a template file's contents.
#[must_use]
pub fn extract(path: &Path, bytes: &[u8]) -> Map<String, Value> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut metadata = match extension.as_str() {
        "png" => png_dimensions(bytes)
            .map(|(w, h)| {
                let mut m = Map::new();
                m.insert("width".to_string(), Value::from(w));
                m.insert("height".to_string(), Value::from(h));
                m
            })
            .unwrap_or_default(),
        "json" | "xml" => std::str::from_utf8(bytes)
            .map(text_dimensions)
            .unwrap_or_default(),
        _ => Map::new(),
    };
    metadata.insert("size".to_string(), Value::from(bytes.len()));
    metadata.insert("extension".to_string(), Value::String(extension));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_categorize_by_keyword() {
        assert_eq!(categorize("Template_4x6.png"), "Prints");
        assert_eq!(categorize("wedding_strip.png"), "Strips");
        assert_eq!(categorize("party-boomerang.json"), "Animated");
        assert_eq!(categorize("GreenScreen_Beach.jpg"), "GreenScreen");
        assert_eq!(categorize("logo.png"), "General");
    }

    #[test]
    fn test_folder_wins_over_file_name() {
        assert_eq!(categorize("Strips/postcard_4x6.png"), "Strips");
        // Only the containing folder is consulted.
        assert_eq!(categorize("gif/misc/strip.png"), "Strips");
        assert_eq!(categorize("misc/logo.png"), "General");
    }

    #[test]
    fn test_png_dimensions() {
        assert_eq!(png_dimensions(&png_header(1800, 1200)), Some((1800, 1200)));
        assert_eq!(png_dimensions(b"not a png"), None);
    }

    #[test]
    fn test_text_dimensions_json_and_xml() {
        let json = text_dimensions(r#"{"Width": 600, "Height": 1800, "PhotoCount": 3}"#);
        assert_eq!(json["width"], 600);
        assert_eq!(json["height"], 1800);
        assert_eq!(json["photoCount"], 3);

        let xml = text_dimensions(r#"<Layout width="1200"><Height>1800</Height><photo_count>4</photo_count></Layout>"#);
        assert_eq!(xml["width"], 1200);
        assert_eq!(xml["height"], 1800);
        assert_eq!(xml["photoCount"], 4);
    }

    #[test]
    fn test_extract_tolerates_garbage() {
        let metadata = extract(Path::new("broken.png"), &[0xff, 0x00, 0x12]);
        assert!(!metadata.contains_key("width"));
        assert_eq!(metadata["size"], 3);

        let metadata = extract(Path::new("layout.json"), &[0xff, 0xfe]);
        assert_eq!(metadata["extension"], "json");
    }
}
