//! Editor configuration
//!
//! Holds the tunable constants of the engine: stroke widths, minimum shape sizes,
//! default colors, zoom behaviour and label styling. Configuration can be loaded
//! from a JSON file, from environment variables, or built programmatically.

use crate::coords::Size;
use crate::error::ConfigError;
use std::fs;
use std::path::Path;

/// Styling used when building label sub-nodes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    /// Font size in display pixels
    pub font_size: f64,
    /// Padding around the text on every side
    pub padding: f64,
    /// Average glyph advance as a fraction of the font size
    pub char_width_ratio: f64,
    /// Text color
    pub text_fill: String,
    /// Opacity of the background rectangle
    pub background_opacity: f64,
    /// Background color used when the annotation has no stroke color
    pub fallback_background: String,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            padding: 5.0,
            char_width_ratio: 0.6,
            text_fill: "white".to_string(),
            background_opacity: 0.8,
            fallback_background: "black".to_string(),
        }
    }
}

impl LabelStyle {
    /// Natural bounds of a label's text including padding.
    pub fn measure(&self, text: &str) -> Size {
        let glyphs = text.chars().count() as f64;
        Size::new(
            glyphs * self.font_size * self.char_width_ratio + self.padding * 2.0,
            self.font_size + self.padding * 2.0,
        )
    }

    /// Checks label metrics and opacity ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(ConfigError::InvalidValue("label.font_size".to_string()));
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ConfigError::InvalidValue("label.padding".to_string()));
        }
        if !self.char_width_ratio.is_finite() || self.char_width_ratio <= 0.0 {
            return Err(ConfigError::InvalidValue("label.char_width_ratio".to_string()));
        }
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(ConfigError::InvalidValue("label.background_opacity".to_string()));
        }
        Ok(())
    }
}

/// Configuration for the annotation editor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Stroke width at view zoom 1.0
    pub base_stroke_width: f64,
    /// Smallest width/height (display px) a drawn rectangle may have
    pub min_rect_size: f64,
    /// Smallest radius (display px) a drawn circle may have
    pub min_circle_radius: f64,
    /// Resize frames producing a box smaller than this on either axis are rejected
    pub resize_min_size: f64,
    /// Floor applied to rectangle sides when a resize is folded back
    pub min_folded_extent: f64,
    /// Stroke color for newly drawn rectangles
    pub rect_stroke: String,
    /// Stroke color for newly drawn circles
    pub circle_stroke: String,
    /// Multiplicative zoom step for one wheel notch
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub label: LabelStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            base_stroke_width: 2.0,
            min_rect_size: 10.0,
            min_circle_radius: 5.0,
            resize_min_size: 5.0,
            min_folded_extent: 1.0,
            rect_stroke: "#e74c3c".to_string(),
            circle_stroke: "#3498db".to_string(),
            zoom_step: 1.1,
            min_zoom: 0.05,
            max_zoom: 50.0,
            label: LabelStyle::default(),
        }
    }
}

impl EditorConfig {
    /// Sets the base stroke width.
    pub fn with_base_stroke_width(mut self, width: f64) -> Self {
        self.base_stroke_width = width;
        self
    }

    /// Sets the zoom step used by wheel zooming.
    pub fn with_zoom_step(mut self, step: f64) -> Self {
        self.zoom_step = step;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ANNOTATOR_BASE_STROKE_WIDTH` (default: 2)
    /// - `ANNOTATOR_MIN_RECT_SIZE` (default: 10)
    /// - `ANNOTATOR_MIN_CIRCLE_RADIUS` (default: 5)
    /// - `ANNOTATOR_ZOOM_STEP` (default: 1.1)
    ///
    /// # Errors
    /// Returns an error if any variable does not hold a positive number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let overrides: [(&str, &mut f64); 4] = [
            ("ANNOTATOR_BASE_STROKE_WIDTH", &mut config.base_stroke_width),
            ("ANNOTATOR_MIN_RECT_SIZE", &mut config.min_rect_size),
            ("ANNOTATOR_MIN_CIRCLE_RADIUS", &mut config.min_circle_radius),
            ("ANNOTATOR_ZOOM_STEP", &mut config.zoom_step),
        ];
        for (key, slot) in overrides {
            if let Ok(val) = std::env::var(key) {
                *slot = val
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Parses configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every size and factor is positive and finite, and that the
    /// label style is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("base_stroke_width", self.base_stroke_width),
            ("min_rect_size", self.min_rect_size),
            ("min_circle_radius", self.min_circle_radius),
            ("resize_min_size", self.resize_min_size),
            ("min_folded_extent", self.min_folded_extent),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
        ];
        for (key, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue(key.to_string()));
            }
        }
        if !self.zoom_step.is_finite() || self.zoom_step <= 1.0 {
            return Err(ConfigError::InvalidValue("zoom_step".to_string()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::InvalidValue("min_zoom".to_string()));
        }
        self.label.validate()
    }
}
