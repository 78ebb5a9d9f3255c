//! The allow-list of syncable configuration keys.
//!
//! Only keys listed in [`SYNCABLE_SETTINGS`] ever leave or enter a kiosk.
//! Each key carries its static type, which drives conversion of incoming
//! values through an exhaustive match instead of runtime type inspection.

use std::fmt;

use crate::sync::{SettingValue, SyncError, SyncResult};

/// Statically known type of a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Int,
    Float,
    String,
    /// Enum with its variant names.
    Enum(&'static [&'static str]),
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::Enum(variants) => write!(f, "enum({})", variants.join("|")),
        }
    }
}

fn conversion(key: &str, message: impl Into<String>) -> SyncError {
    SyncError::Conversion {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl SettingKind {
    /// Convert `value` into this type.
    ///
    /// Numbers widen and narrow when lossless, strings parse, enums match
    /// their variant names case-insensitively (or by ordinal).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Conversion`] when no sensible conversion exists.
    pub fn convert(&self, key: &str, value: SettingValue) -> SyncResult<SettingValue> {
        let mismatch = |v: &SettingValue| conversion(key, format!("cannot read {} '{v}' as {self}", v.type_name()));

        match (self, value) {
            (Self::Bool, SettingValue::Bool(b)) => Ok(SettingValue::Bool(b)),
            (Self::Bool, SettingValue::Int(i)) => Ok(SettingValue::Bool(i != 0)),
            (Self::Bool, SettingValue::String(s) | SettingValue::Enum(s)) => parse_bool(&s)
                .map(SettingValue::Bool)
                .ok_or_else(|| mismatch(&SettingValue::String(s))),
            (Self::Bool, v @ SettingValue::Float(_)) => Err(mismatch(&v)),

            (Self::Int, SettingValue::Int(i)) => Ok(SettingValue::Int(i)),
            (Self::Int, SettingValue::Bool(b)) => Ok(SettingValue::Int(i64::from(b))),
            (Self::Int, SettingValue::Float(f)) => float_to_int(f)
                .map(SettingValue::Int)
                .ok_or_else(|| mismatch(&SettingValue::Float(f))),
            (Self::Int, SettingValue::String(s) | SettingValue::Enum(s)) => s
                .trim()
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|_| mismatch(&SettingValue::String(s))),

            (Self::Float, SettingValue::Float(f)) => Ok(SettingValue::Float(f)),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float, SettingValue::Int(i)) => Ok(SettingValue::Float(i as f64)),
            (Self::Float, SettingValue::String(s) | SettingValue::Enum(s)) => s
                .trim()
                .parse::<f64>()
                .map(SettingValue::Float)
                .map_err(|_| mismatch(&SettingValue::String(s))),
            (Self::Float, v @ SettingValue::Bool(_)) => Err(mismatch(&v)),

            (Self::String, SettingValue::String(s) | SettingValue::Enum(s)) => {
                Ok(SettingValue::String(s))
            }
            (Self::String, v) => Ok(SettingValue::String(v.to_string())),

            (Self::Enum(variants), SettingValue::String(s) | SettingValue::Enum(s)) => variants
                .iter()
                .find(|name| name.eq_ignore_ascii_case(s.trim()))
                .map(|name| SettingValue::Enum((*name).to_string()))
                .ok_or_else(|| conversion(key, format!("'{s}' is not one of {}", variants.join(", ")))),
            (Self::Enum(variants), SettingValue::Int(i)) => usize::try_from(i)
                .ok()
                .and_then(|idx| variants.get(idx))
                .map(|name| SettingValue::Enum((*name).to_string()))
                .ok_or_else(|| conversion(key, format!("ordinal {i} out of range"))),
            (Self::Enum(_), v) => Err(mismatch(&v)),
        }
    }

    /// Parse text typed by a user (or a default) into this type.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Conversion`] when the text does not fit the type.
    pub fn parse_text(&self, key: &str, text: &str) -> SyncResult<SettingValue> {
        self.convert(key, SettingValue::String(text.to_string()))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// One syncable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDescriptor {
    pub key: &'static str,
    pub category: &'static str,
    pub kind: SettingKind,
    /// Unset values are allowed and simply not synced.
    pub nullable: bool,
    /// Textual default; empty for nullable keys without one.
    pub default: &'static str,
}

impl SettingDescriptor {
    const fn new(key: &'static str, category: &'static str, kind: SettingKind, default: &'static str) -> Self {
        Self {
            key,
            category,
            kind,
            nullable: false,
            default,
        }
    }

    const fn nullable(key: &'static str, category: &'static str, kind: SettingKind) -> Self {
        Self {
            key,
            category,
            kind,
            nullable: true,
            default: "",
        }
    }

    /// Typed default, `None` for unset nullable keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the default text does not parse as the key's type.
    pub fn default_value(&self) -> SyncResult<Option<SettingValue>> {
        if self.nullable && self.default.is_empty() {
            return Ok(None);
        }
        self.kind.parse_text(self.key, self.default).map(Some)
    }

    /// Ordering hint derived from the category.
    #[must_use]
    pub fn priority(&self) -> i32 {
        match self.category {
            "Camera" => 10,
            "Capture" => 20,
            "Printing" => 30,
            "GreenScreen" => 40,
            "Animated" => 50,
            _ => 90,
        }
    }
}

const ROTATIONS: &[&str] = &["None", "Rotate90", "Rotate180", "Rotate270"];
const PRINT_LAYOUTS: &[&str] = &["Strip", "Postcard4x6", "Both"];

/// Keys that are synchronised between kiosks. Everything else stays local.
pub static SYNCABLE_SETTINGS: &[SettingDescriptor] = &[
    SettingDescriptor::new("Brightness", "Camera", SettingKind::Int, "0"),
    SettingDescriptor::new("Contrast", "Camera", SettingKind::Int, "0"),
    SettingDescriptor::new("Saturation", "Camera", SettingKind::Int, "0"),
    SettingDescriptor::new("MirrorPreview", "Camera", SettingKind::Bool, "true"),
    SettingDescriptor::new("CameraRotation", "Camera", SettingKind::Enum(ROTATIONS), "None"),
    SettingDescriptor::new("CountdownSeconds", "Capture", SettingKind::Int, "5"),
    SettingDescriptor::new("PhotosPerSession", "Capture", SettingKind::Int, "4"),
    SettingDescriptor::new("DelayBetweenPhotosSeconds", "Capture", SettingKind::Float, "1.5"),
    SettingDescriptor::new("AutoPrint", "Printing", SettingKind::Bool, "false"),
    SettingDescriptor::new("PrintCopies", "Printing", SettingKind::Int, "1"),
    SettingDescriptor::new("PrintLayout", "Printing", SettingKind::Enum(PRINT_LAYOUTS), "Strip"),
    SettingDescriptor::nullable("PrinterName", "Printing", SettingKind::String),
    SettingDescriptor::new("GreenScreenEnabled", "GreenScreen", SettingKind::Bool, "false"),
    SettingDescriptor::new("ChromaKeyColor", "GreenScreen", SettingKind::String, "#00FF00"),
    SettingDescriptor::new("ChromaKeyTolerance", "GreenScreen", SettingKind::Float, "0.3"),
    SettingDescriptor::new("GifEnabled", "Animated", SettingKind::Bool, "true"),
    SettingDescriptor::new("GifFrameDelayMs", "Animated", SettingKind::Int, "200"),
    SettingDescriptor::new("BoomerangEnabled", "Animated", SettingKind::Bool, "false"),
    SettingDescriptor::nullable("EventName", "General", SettingKind::String),
    SettingDescriptor::new("WelcomeMessage", "General", SettingKind::String, "Strike a pose!"),
];

/// Look up a syncable key.
#[must_use]
pub fn find_descriptor(key: &str) -> Option<&'static SettingDescriptor> {
    SYNCABLE_SETTINGS.iter().find(|d| d.key == key)
}
