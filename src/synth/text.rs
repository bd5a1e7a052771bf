//! Burned-in text captions.
//!
//! Captions arrive as a JSON list of overlay objects; only `text` and
//! `emoji` entries are rendered, each as one `drawtext` stage.

use serde::Deserialize;

use crate::error::{EditError, Result};

/// Font size of a caption at scale 1.0.
pub const BASE_FONT_SIZE: f64 = 40.0;

/// One caption drawn onto every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    /// Left offset in pixels
    pub x: f64,
    /// Top offset in pixels
    pub y: f64,
    /// Multiplier on [`BASE_FONT_SIZE`]
    pub scale: f64,
}

impl TextItem {
    pub fn new<S: Into<String>>(text: S, x: f64, y: f64, scale: f64) -> Self {
        Self { text: text.into(), x, y, scale }
    }

    /// Whole-pixel font size; fractions are dropped.
    pub fn font_size(&self) -> i64 {
        (self.scale * BASE_FONT_SIZE) as i64
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(EditError::invalid_parameter("caption text is empty"));
        }
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(EditError::invalid_parameter(format!(
                "caption '{}' has a non-finite position",
                self.text
            )));
        }
        if !self.scale.is_finite() || self.font_size() < 1 {
            return Err(EditError::invalid_parameter(format!(
                "caption '{}' scale {} gives no visible font size",
                self.text, self.scale
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct OverlayEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default = "default_scale")]
    scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Parse an overlay list such as
/// `[{"type": "text", "content": "Hi", "x": 10, "y": 20, "scale": 1.5}]`.
///
/// Entries of other types are skipped.
pub fn parse_text_items(json: &str) -> Result<Vec<TextItem>> {
    let entries: Vec<OverlayEntry> = serde_json::from_str(json)
        .map_err(|e| EditError::invalid_parameter(format!("invalid overlay list: {}", e)))?;

    Ok(entries
        .into_iter()
        .filter(|e| e.kind == "text" || e.kind == "emoji")
        .map(|e| TextItem::new(e.content, e.x, e.y, e.scale))
        .collect())
}

/// Escape text for `drawtext` expansion, where `\` and `%` are special.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\").replace('%', "\\%")
}
