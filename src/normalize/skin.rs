//! Skin-analysis normalization
//!
//! The skin-analysis flow must never hard-fail: whatever happens upstream,
//! the app gets HTTP 200 with a complete record. Absent fields are filled
//! from the default record; total failures return the default record with
//! `success: false` and a human-readable error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Error string when the model's answer could not be parsed
pub const PARSE_FALLBACK: &str = "Analysis temporarily unavailable";
/// Error string when the provider stayed overloaded through every retry
pub const OVERLOAD_FALLBACK: &str = "Service temporarily overloaded, showing default analysis";
/// Error string for any other handler failure
pub const SERVICE_FALLBACK: &str = "Analysis service error";

fn default_current_hex() -> String {
    "#D8BFA5".to_string()
}

fn default_tanned_hex() -> String {
    "#B19C87".to_string()
}

fn default_current_shade() -> u32 {
    3
}

fn default_next_shade() -> u32 {
    4
}

fn default_tone() -> String {
    "medium".to_string()
}

fn default_undertone() -> String {
    "warm".to_string()
}

fn default_uv_sensitivity() -> String {
    "medium".to_string()
}

fn default_texture() -> String {
    "smooth".to_string()
}

/// Complete skin-analysis record in the shape the app expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinAnalysis {
    #[serde(default = "default_current_hex")]
    pub current_hex: String,
    #[serde(default = "default_tanned_hex")]
    pub tanned_hex: String,
    #[serde(default = "default_current_shade")]
    pub current_shade_number: u32,
    #[serde(default = "default_next_shade")]
    pub next_shade_number: u32,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_undertone")]
    pub undertone: String,
    #[serde(default = "default_uv_sensitivity")]
    pub uv_sensitivity: String,
    #[serde(default = "default_texture")]
    pub texture: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SkinAnalysis {
    /// The full default record carrying a fallback error
    pub fn fallback(error: &str) -> Self {
        Self {
            current_hex: default_current_hex(),
            tanned_hex: default_tanned_hex(),
            current_shade_number: default_current_shade(),
            next_shade_number: default_next_shade(),
            tone: default_tone(),
            undertone: default_undertone(),
            uv_sensitivity: default_uv_sensitivity(),
            texture: default_texture(),
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// Parse the model's answer, tolerating prose around the JSON object.
    ///
    /// Parse failure degrades to the default record rather than an error.
    pub fn from_provider_text(text: &str) -> Self {
        let candidate = extract_json_object(text).unwrap_or(text);

        match serde_json::from_str::<SkinAnalysis>(candidate) {
            Ok(mut analysis) => {
                analysis.success = true;
                analysis.error = None;
                debug!("Skin analysis parsed successfully");
                analysis
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse skin analysis, using defaults");
                Self::fallback(PARSE_FALLBACK)
            }
        }
    }
}

/// Find the first syntactically complete JSON object inside `text`.
///
/// Tracks string and escape state so braces inside string literals do not
/// unbalance the scan. Returns `None` when no balanced object exists.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in text.as_bytes()[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }

        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}
