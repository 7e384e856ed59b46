//! Shared editing context
//!
//! Coordinate state and configuration travel together as one borrowed value into
//! the store, the drawing state machine and the selection controller.

use crate::config::EditorConfig;
use crate::coords::{CoordinateSpace, Size};

/// Coordinate state and configuration shared by every component
#[derive(Debug, Clone)]
pub struct EditingContext {
    pub coords: CoordinateSpace,
    pub config: EditorConfig,
}

impl EditingContext {
    /// Context for a surface with no image loaded
    pub fn new(surface: Size, config: EditorConfig) -> Self {
        Self {
            coords: CoordinateSpace::new(surface, config.base_stroke_width),
            config,
        }
    }

    /// Stroke width for the current view zoom
    pub fn stroke_width(&self) -> f64 {
        self.coords.stroke_width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_configured_stroke() {
        let ctx = EditingContext::new(
            Size::new(800.0, 600.0),
            EditorConfig::default().with_base_stroke_width(3.0),
        );
        assert_eq!(ctx.stroke_width(), 3.0);
        assert!(ctx.coords.fit().is_none());
    }
}
