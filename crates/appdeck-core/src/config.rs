//! Application configuration: the cosmetic shell around a user-supplied model.

use serde::{Deserialize, Serialize};

/// Horizontal alignment of the camera / preview block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
    Right,
}

impl std::fmt::Display for Align {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Align::Left => write!(f, "left"),
            Align::Center => write!(f, "center"),
            Align::Right => write!(f, "right"),
        }
    }
}

/// Visual style of an application page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub align: Align,
    /// Font family name, normally one of [`FONT_LIST`].
    pub font: String,
    /// Foreground color, `#RRGGBB`.
    pub foreground: String,
    /// Background color, `#RRGGBB`.
    pub background: String,
    /// Whether the camera preview is shown.
    pub cam_visible: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            align: Align::Center,
            font: "Arial".to_string(),
            foreground: "#FFFFFF".to_string(),
            background: "#353535".to_string(),
            cam_visible: true,
        }
    }
}

/// Fonts offered by the editor, as (display name, CSS value) pairs.
pub const FONT_LIST: &[(&str, &str)] = &[
    ("Arial", "Arial, sans-serif"),
    ("Verdana", "Verdana, sans-serif"),
    ("Times New Roman", "Times New Roman, serif"),
    ("Courier New", "Courier New, monospace"),
    ("Georgia", "Georgia, serif"),
    ("Palatino", "Palatino, serif"),
    ("Garamond", "Garamond, serif"),
    ("Bookman", "Bookman, serif"),
    ("Comic Sans MS", "Comic Sans MS, cursive"),
    ("Trebuchet MS", "Trebuchet MS, sans-serif"),
    ("Arial Black", "Arial Black, sans-serif"),
    ("Impact", "Impact, sans-serif"),
];

/// Color presets offered by the editor.
pub const COLOR_PRESETS: &[&str] = &[
    "#FFFFFF", "#000000", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
    "#FFA500", "#800080", "#FFC0CB", "#008000", "#000080", "#800000", "#808080", "#FFD700",
];

/// One output category of a classifier application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            icon: None,
        }
    }
}

/// Configuration of one application.
///
/// Only the identifier is validated for correctness (see
/// [`crate::validate`]); the remaining fields are cosmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Unique identifier, 1-20 chars from `[a-zA-Z0-9ñÑ._-]`.
    pub id: String,
    /// Rich-text title shown at the top of the application page.
    pub title: String,
    /// Rich-text description.
    pub description: String,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub published: bool,
}

impl AppConfig {
    /// A fresh, unsaved configuration for a new create session.
    pub fn draft() -> Self {
        Self {
            id: String::new(),
            title: "<h1 style='text-align: center'>Application title</h1>".to_string(),
            description: String::new(),
            categories: Vec::new(),
            style: Style::default(),
            published: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults() {
        let config = AppConfig::draft();
        assert!(config.id.is_empty());
        assert!(!config.published);
        assert_eq!(config.style.align, Align::Center);
        assert_eq!(config.style.font, "Arial");
        assert!(config.style.cam_visible);
    }

    #[test]
    fn test_align_serde_round_trip() {
        let json = serde_json::to_string(&Align::Center).unwrap();
        assert_eq!(json, "\"center\"");
        let back: Align = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Align::Center);
    }

    #[test]
    fn test_config_json_round_trip() {
        let mut config = AppConfig::draft();
        config.id = "my-app".into();
        config.categories.push(Category::new("Dog"));

        let json = serde_json::to_vec(&config).unwrap();
        let back: AppConfig = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_missing_optional_fields() {
        // Older records may lack categories/style/published entirely
        let json = r#"{"id":"a","title":"t","description":""}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!(config.categories.is_empty());
        assert_eq!(config.style, Style::default());
        assert!(!config.published);
    }

    #[test]
    fn test_align_display() {
        assert_eq!(format!("{}", Align::Left), "left");
        assert_eq!(format!("{}", Align::Right), "right");
    }
}
