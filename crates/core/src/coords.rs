//! Image and display coordinate spaces
//!
//! Three coordinate systems are involved when annotating an image:
//! - Image space: native pixels of the original raster
//! - Display (stage) space: the fitted image inside the canvas, before view zoom/pan
//! - Screen space: canvas pixels after the interactive view zoom/pan
//!
//! Annotations are stored in image space. The engine builds display geometry from
//! them with the fit computed on image load; the view transform is applied by the
//! rendering surface and only matters here for pointer input and stroke widths.

/// A point in any of the coordinate spaces
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Width and height pair
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both sides are finite and strictly positive
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle described by its minimum corner and size
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Translate the bounds by an offset
    pub fn offset(&self, by: Point) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }
}

/// Placement of the fitted image within the canvas.
///
/// Computed once per image (re)load or container resize; never touched by
/// interactive pan/zoom.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fit {
    /// Displayed image width divided by original image width
    pub fit_scale: f64,
    /// Top-left corner of the displayed image within the canvas
    pub image_origin: Point,
    /// Size of the displayed image
    pub displayed_size: Size,
}

impl Fit {
    /// Fit an image into a container, preserving aspect ratio and centering it.
    ///
    /// Returns `None` if either size is zero, negative or non-finite.
    pub fn compute(container: Size, image: Size) -> Option<Fit> {
        if !container.is_usable() || !image.is_usable() {
            return None;
        }

        let fit_scale = (container.width / image.width).min(container.height / image.height);
        let displayed_size = Size::new(image.width * fit_scale, image.height * fit_scale);
        let image_origin = Point::new(
            (container.width - displayed_size.width) / 2.0,
            (container.height - displayed_size.height) / 2.0,
        );

        Some(Fit {
            fit_scale,
            image_origin,
            displayed_size,
        })
    }

    /// Map an image-space point to display space
    pub fn to_display(&self, image_point: Point) -> Point {
        Point::new(
            image_point.x * self.fit_scale + self.image_origin.x,
            image_point.y * self.fit_scale + self.image_origin.y,
        )
    }

    /// Map a display-space point back to image space
    pub fn to_image(&self, display_point: Point) -> Point {
        Point::new(
            (display_point.x - self.image_origin.x) / self.fit_scale,
            (display_point.y - self.image_origin.y) / self.fit_scale,
        )
    }

    /// Scale an image-space length to display space
    pub fn length_to_display(&self, length: f64) -> f64 {
        length * self.fit_scale
    }

    /// Scale a display-space length to image space
    pub fn length_to_image(&self, length: f64) -> f64 {
        length / self.fit_scale
    }

    /// Displayed image rectangle in display space
    pub fn image_bounds(&self) -> Bounds {
        Bounds::new(
            self.image_origin.x,
            self.image_origin.y,
            self.displayed_size.width,
            self.displayed_size.height,
        )
    }

    /// Clamp a display-space point into the displayed image rectangle
    pub fn clamp_to_image(&self, point: Point) -> Point {
        let bounds = self.image_bounds();
        Point::new(
            point.x.max(bounds.x).min(bounds.max_x()),
            point.y.max(bounds.y).min(bounds.max_y()),
        )
    }

    /// Clamp a candidate position so that a box, expressed relative to that
    /// position, stays inside the displayed image rectangle.
    ///
    /// A box larger than the image on some axis is pinned to the image's minimum
    /// edge on that axis.
    pub fn clamp_box(&self, candidate: Point, relative_box: Bounds) -> Point {
        let image = self.image_bounds();
        let min_x = image.x - relative_box.x;
        let max_x = image.max_x() - relative_box.max_x();
        let min_y = image.y - relative_box.y;
        let max_y = image.max_y() - relative_box.max_y();

        Point::new(
            candidate.x.min(max_x).max(min_x),
            candidate.y.min(max_y).max(min_y),
        )
    }
}

/// Interactive view transform applied by the rendering surface
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::default(),
        }
    }
}

impl ViewTransform {
    /// Convert a screen (canvas) pointer position to stage coordinates
    pub fn screen_to_stage(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// Convert a stage position to screen coordinates
    pub fn stage_to_screen(&self, stage: Point) -> Point {
        Point::new(
            stage.x * self.zoom + self.pan.x,
            stage.y * self.zoom + self.pan.y,
        )
    }

    /// Change zoom while keeping the stage point under `pointer` fixed on screen
    pub fn zoomed_at(&self, pointer: Point, new_zoom: f64) -> Self {
        let anchor = self.screen_to_stage(pointer);
        Self {
            zoom: new_zoom,
            pan: Point::new(
                pointer.x - anchor.x * new_zoom,
                pointer.y - anchor.y * new_zoom,
            ),
        }
    }
}

/// Stroke width that renders at constant apparent thickness under `view_zoom`
pub fn stroke_width_for(base_stroke_width: f64, view_zoom: f64) -> f64 {
    base_stroke_width / view_zoom
}

/// Combined coordinate state for the currently displayed image.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSpace {
    container: Size,
    natural_size: Option<Size>,
    fit: Option<Fit>,
    view: ViewTransform,
    base_stroke_width: f64,
}

impl CoordinateSpace {
    /// Create a coordinate space for a container with no image loaded
    pub fn new(container: Size, base_stroke_width: f64) -> Self {
        Self {
            container,
            natural_size: None,
            fit: None,
            view: ViewTransform::default(),
            base_stroke_width,
        }
    }

    /// Recompute the fit for a freshly loaded image and reset the view.
    ///
    /// Returns the new fit, or `None` (leaving state untouched) for unusable sizes.
    pub fn recompute_fit(&mut self, natural_size: Size) -> Option<Fit> {
        let fit = Fit::compute(self.container, natural_size)?;
        self.natural_size = Some(natural_size);
        self.fit = Some(fit);
        self.view = ViewTransform::default();
        Some(fit)
    }

    /// Update the container size and refit the current image, if any.
    ///
    /// The view transform is preserved.
    pub fn set_container(&mut self, container: Size) -> Option<Fit> {
        self.container = container;
        let natural = self.natural_size?;
        self.fit = Fit::compute(container, natural);
        self.fit
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// Natural size of the loaded image
    pub fn natural_size(&self) -> Option<Size> {
        self.natural_size
    }

    /// Current fit, `None` until an image is loaded
    pub fn fit(&self) -> Option<&Fit> {
        self.fit.as_ref()
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    pub fn base_stroke_width(&self) -> f64 {
        self.base_stroke_width
    }

    /// Stroke width for the current view zoom
    pub fn stroke_width(&self) -> f64 {
        stroke_width_for(self.base_stroke_width, self.view.zoom)
    }

    /// Convert a screen pointer position to a stage point clamped to the image.
    ///
    /// Returns `None` when no image is loaded.
    pub fn pointer_to_clamped_stage(&self, screen: Point) -> Option<Point> {
        let fit = self.fit.as_ref()?;
        Some(fit.clamp_to_image(self.view.screen_to_stage(screen)))
    }
}
