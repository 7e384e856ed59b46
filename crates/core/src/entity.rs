//! Annotation composites
//!
//! An [`AnnotationEntity`] is the display-space counterpart of an [`Annotation`]:
//! a positioned group holding the primary shape and an optional label made of a
//! background rectangle and a text node. Every visual part carries a [`NodeId`]
//! so raw pointer hits reported by the host can be traced back to their owner.

use crate::annotation::{Annotation, AnnotationId, Shape};
use crate::config::LabelStyle;
use crate::coords::{Bounds, Fit, Point, Size};

/// Identifier of one node in the host scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Hands out scene node identifiers, never reusing one
#[derive(Debug, Default)]
pub struct NodeAllocator {
    next: u64,
}

impl NodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> NodeId {
        self.next += 1;
        NodeId(self.next)
    }
}

/// Role of a node inside a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Group,
    Shape,
    LabelBackground,
    LabelText,
}

/// Per-axis scale factors
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Reciprocal scale used to keep a child at constant apparent size
    pub fn inverse(&self) -> Scale {
        Scale::new(1.0 / self.x, 1.0 / self.y)
    }

    pub fn is_identity(&self) -> bool {
        self.x == 1.0 && self.y == 1.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::IDENTITY
    }
}

/// Label sub-node: background rectangle plus text
#[derive(Debug, Clone, PartialEq)]
pub struct LabelNode {
    pub text: String,
    /// Background fill, the annotation's stroke color by default
    pub background: String,
    /// Position in the group's local frame
    pub offset: Point,
    /// Background size, matching the text's natural bounds
    pub size: Size,
    /// Counter-scale applied while the group is being resized
    pub scale: Scale,
    background_node: NodeId,
    text_node: NodeId,
}

impl LabelNode {
    pub fn background_node(&self) -> NodeId {
        self.background_node
    }

    pub fn text_node(&self) -> NodeId {
        self.text_node
    }
}

/// Display-space composite for one annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntity {
    id: AnnotationId,
    group_node: NodeId,
    shape_node: NodeId,
    /// Group position in display space
    position: Point,
    /// Intrinsic display geometry of the primary shape, anchored at the group origin
    shape: Shape,
    stroke: String,
    stroke_width: f64,
    /// Transient group scale, non-identity only during a resize gesture
    scale: Scale,
    label: Option<LabelNode>,
    draggable: bool,
}

impl AnnotationEntity {
    /// Build a composite from display-space geometry
    pub fn new(
        id: AnnotationId,
        group_node: NodeId,
        shape_node: NodeId,
        position: Point,
        shape: Shape,
        stroke: String,
        stroke_width: f64,
    ) -> Self {
        Self {
            id,
            group_node,
            shape_node,
            position,
            shape,
            stroke,
            stroke_width,
            scale: Scale::IDENTITY,
            label: None,
            draggable: false,
        }
    }

    /// Build a composite from an image-space record
    pub fn from_annotation(
        id: AnnotationId,
        annotation: &Annotation,
        fit: &Fit,
        stroke_width: f64,
        style: &LabelStyle,
        nodes: &mut NodeAllocator,
    ) -> Self {
        let mut entity = Self::new(
            id,
            nodes.allocate(),
            nodes.allocate(),
            fit.to_display(annotation.position),
            annotation.shape.scaled(fit.fit_scale),
            annotation.stroke.clone(),
            stroke_width,
        );
        if let Some(text) = annotation.label.as_deref().filter(|text| !text.is_empty()) {
            entity.set_label(text, style, nodes);
        }
        entity
    }

    /// Read the composite back into an image-space record
    pub fn to_annotation(&self, fit: &Fit) -> Annotation {
        Annotation {
            id: Some(self.id),
            position: fit.to_image(self.position),
            shape: self.effective_shape().scaled(1.0 / fit.fit_scale),
            stroke: self.stroke.clone(),
            label: self.label.as_ref().map(|label| label.text.clone()),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn group_node(&self) -> NodeId {
        self.group_node
    }

    pub fn shape_node(&self) -> NodeId {
        self.shape_node
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// Intrinsic shape, without the transient group scale
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn stroke(&self) -> &str {
        &self.stroke
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.stroke_width = width;
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn label(&self) -> Option<&LabelNode> {
        self.label.as_ref()
    }

    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub fn set_draggable(&mut self, draggable: bool) {
        self.draggable = draggable;
    }

    /// Role of `node` within this composite, if it belongs here
    pub fn role_of(&self, node: NodeId) -> Option<NodeRole> {
        if node == self.group_node {
            return Some(NodeRole::Group);
        }
        if node == self.shape_node {
            return Some(NodeRole::Shape);
        }
        let label = self.label.as_ref()?;
        if node == label.background_node {
            Some(NodeRole::LabelBackground)
        } else if node == label.text_node {
            Some(NodeRole::LabelText)
        } else {
            None
        }
    }

    /// Shape geometry with the transient scale folded in.
    ///
    /// A circle cannot represent independent axis scaling, so its radius uses
    /// the average of both factors.
    pub fn effective_shape(&self) -> Shape {
        match self.shape {
            Shape::Rect { width, height } => Shape::Rect {
                width: width * self.scale.x,
                height: height * self.scale.y,
            },
            Shape::Circle { radius } => Shape::Circle {
                radius: radius * (self.scale.x + self.scale.y) / 2.0,
            },
        }
    }

    /// Bounding box of the scaled shape relative to the group position
    pub fn local_bounds(&self) -> Bounds {
        let bounds = self.shape.local_bounds();
        Bounds::new(
            bounds.x * self.scale.x,
            bounds.y * self.scale.y,
            bounds.width * self.scale.x,
            bounds.height * self.scale.y,
        )
    }

    /// Bounding box of the scaled shape in display space
    pub fn display_bounds(&self) -> Bounds {
        self.local_bounds().offset(self.position)
    }

    /// Bounding box of the whole composite, label included, relative to the
    /// group position
    pub fn composite_bounds(&self) -> Bounds {
        let shape = self.local_bounds();
        let Some(label) = self.label.as_ref() else {
            return shape;
        };
        // The label is counter-scaled, so its on-screen size is its natural size
        let label_x = label.offset.x * self.scale.x;
        let label_y = label.offset.y * self.scale.y;
        let min_x = shape.x.min(label_x);
        let min_y = shape.y.min(label_y);
        let max_x = shape.max_x().max(label_x + label.size.width);
        let max_y = shape.max_y().max(label_y + label.size.height);
        Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Add or replace the label, sizing its background to the text
    pub fn set_label(&mut self, text: &str, style: &LabelStyle, nodes: &mut NodeAllocator) {
        let background = if self.stroke.is_empty() {
            style.fallback_background.clone()
        } else {
            self.stroke.clone()
        };
        match self.label.as_mut() {
            Some(label) => {
                label.text = text.to_string();
                label.background = background;
            }
            None => {
                self.label = Some(LabelNode {
                    text: text.to_string(),
                    background,
                    offset: Point::default(),
                    size: Size::default(),
                    scale: self.scale.inverse(),
                    background_node: nodes.allocate(),
                    text_node: nodes.allocate(),
                });
            }
        }
        if let Some(label) = self.label.as_mut() {
            label.size = style.measure(&label.text);
        }
        self.layout_label();
    }

    /// Remove the label, returning it if one existed
    pub fn clear_label(&mut self) -> Option<LabelNode> {
        self.label.take()
    }

    /// Apply a transient resize scale, counter-scaling the label
    pub fn apply_scale(&mut self, scale: Scale) {
        self.scale = scale;
        if let Some(label) = self.label.as_mut() {
            label.scale = scale.inverse();
        }
        self.layout_label();
    }

    /// Fold the transient scale into the intrinsic geometry and reset it.
    ///
    /// Rectangle sides are floored to `min_extent`.
    pub fn fold_scale(&mut self, min_extent: f64, style: &LabelStyle) {
        self.shape = match self.effective_shape() {
            Shape::Rect { width, height } => Shape::Rect {
                width: width.max(min_extent),
                height: height.max(min_extent),
            },
            circle => circle,
        };
        self.scale = Scale::IDENTITY;
        if let Some(label) = self.label.as_mut() {
            label.scale = Scale::IDENTITY;
            label.size = style.measure(&label.text);
        }
        self.layout_label();
    }

    /// Anchor the label just above the shape's top-left bounding corner.
    ///
    /// The offset lives in the group's local frame, so the label height is divided
    /// by the group scale to keep the on-screen gap equal to the label height.
    fn layout_label(&mut self) {
        let bounds = self.shape.local_bounds();
        let scale_y = self.scale.y;
        if let Some(label) = self.label.as_mut() {
            label.offset = Point::new(bounds.x, bounds.y - label.size.height / scale_y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_entity(nodes: &mut NodeAllocator) -> AnnotationEntity {
        AnnotationEntity::new(
            AnnotationId::new_v4(),
            nodes.allocate(),
            nodes.allocate(),
            Point::new(100.0, 100.0),
            Shape::Rect {
                width: 50.0,
                height: 20.0,
            },
            "red".to_string(),
            2.0,
        )
    }

    #[test]
    fn test_node_allocator_is_unique() {
        let mut nodes = NodeAllocator::new();
        let a = nodes.allocate();
        let b = nodes.allocate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_role_of_resolves_every_part() {
        let mut nodes = NodeAllocator::new();
        let mut entity = rect_entity(&mut nodes);
        entity.set_label("car", &LabelStyle::default(), &mut nodes);

        let label = entity.label().unwrap().clone();
        assert_eq!(entity.role_of(entity.group_node()), Some(NodeRole::Group));
        assert_eq!(entity.role_of(entity.shape_node()), Some(NodeRole::Shape));
        assert_eq!(entity.role_of(label.background_node()), Some(NodeRole::LabelBackground));
        assert_eq!(entity.role_of(label.text_node()), Some(NodeRole::LabelText));
        assert_eq!(entity.role_of(NodeId(9999)), None);
    }

    #[test]
    fn test_label_sits_above_shape() {
        let mut nodes = NodeAllocator::new();
        let style = LabelStyle::default();
        let mut entity = rect_entity(&mut nodes);
        entity.set_label("car", &style, &mut nodes);

        let label = entity.label().unwrap();
        assert_eq!(label.background, "red");
        assert_eq!(label.size, style.measure("car"));
        assert_eq!(label.offset, Point::new(0.0, -24.0));

        let mut circle = AnnotationEntity::new(
            AnnotationId::new_v4(),
            nodes.allocate(),
            nodes.allocate(),
            Point::new(50.0, 50.0),
            Shape::Circle { radius: 10.0 },
            String::new(),
            2.0,
        );
        circle.set_label("x", &style, &mut nodes);
        let label = circle.label().unwrap();
        assert_eq!(label.background, "black");
        assert_eq!(label.offset, Point::new(-10.0, -34.0));
    }

    #[test]
    fn test_composite_bounds_include_label() {
        let mut nodes = NodeAllocator::new();
        let mut entity = rect_entity(&mut nodes);
        assert_eq!(entity.composite_bounds(), Bounds::new(0.0, 0.0, 50.0, 20.0));

        entity.set_label("a much longer label", &LabelStyle::default(), &mut nodes);
        let label = entity.label().unwrap().size;
        let bounds = entity.composite_bounds();
        assert_eq!(bounds.y, -24.0);
        assert_eq!(bounds.height, 44.0);
        assert_eq!(bounds.width, label.width);
    }

    #[test]
    fn test_apply_scale_counter_scales_label() {
        let mut nodes = NodeAllocator::new();
        let mut entity = rect_entity(&mut nodes);
        entity.set_label("car", &LabelStyle::default(), &mut nodes);

        entity.apply_scale(Scale::new(2.0, 4.0));
        let label = entity.label().unwrap();
        assert_eq!(label.scale, Scale::new(0.5, 0.25));
        // 24px label height divided by the 4x group scale
        assert_eq!(label.offset, Point::new(0.0, -6.0));
        assert_eq!(entity.local_bounds(), Bounds::new(0.0, 0.0, 100.0, 80.0));
    }

    #[test]
    fn test_fold_scale_resets_scale() {
        let mut nodes = NodeAllocator::new();
        let style = LabelStyle::default();
        let mut entity = rect_entity(&mut nodes);
        entity.set_label("car", &style, &mut nodes);

        entity.apply_scale(Scale::new(2.0, 0.01));
        entity.fold_scale(1.0, &style);

        assert_eq!(
            entity.shape(),
            Shape::Rect {
                width: 100.0,
                height: 1.0
            }
        );
        assert!(entity.scale().is_identity());
        let label = entity.label().unwrap();
        assert!(label.scale.is_identity());
        assert_eq!(label.offset, Point::new(0.0, -24.0));
    }

    #[test]
    fn test_fold_scale_averages_circle_radius() {
        let mut nodes = NodeAllocator::new();
        let mut entity = AnnotationEntity::new(
            AnnotationId::new_v4(),
            nodes.allocate(),
            nodes.allocate(),
            Point::new(50.0, 50.0),
            Shape::Circle { radius: 10.0 },
            "blue".to_string(),
            2.0,
        );
        entity.apply_scale(Scale::new(1.0, 3.0));
        entity.fold_scale(1.0, &LabelStyle::default());
        assert_eq!(entity.shape(), Shape::Circle { radius: 20.0 });
    }

    #[test]
    fn test_annotation_round_trip_through_fit() {
        let mut nodes = NodeAllocator::new();
        let fit = Fit::compute(Size::new(800.0, 600.0), Size::new(1600.0, 1200.0)).unwrap();
        let id = AnnotationId::new_v4();
        let annotation = Annotation::circle(400.0, 300.0, 40.0, "blue")
            .with_id(id)
            .with_label("ball");

        let entity = AnnotationEntity::from_annotation(
            id,
            &annotation,
            &fit,
            2.0,
            &LabelStyle::default(),
            &mut nodes,
        );
        assert_eq!(entity.position(), Point::new(200.0, 150.0));
        assert_eq!(entity.shape(), Shape::Circle { radius: 20.0 });
        assert_eq!(entity.to_annotation(&fit), annotation);
    }

    #[test]
    fn test_clear_label() {
        let mut nodes = NodeAllocator::new();
        let mut entity = rect_entity(&mut nodes);
        entity.set_label("car", &LabelStyle::default(), &mut nodes);
        assert!(entity.clear_label().is_some());
        assert!(entity.label().is_none());
        assert!(entity.clear_label().is_none());
    }
}
