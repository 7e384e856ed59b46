//! Selection, drag containment and resize normalization
//!
//! The controller keeps the ordered set of selected annotations and resolves raw
//! scene hits to their owning composite. Drag and resize gestures on selected
//! composites are routed through here so that positions stay inside the image
//! and transient resize scales never accumulate.

use crate::annotation::AnnotationId;
use crate::context::EditingContext;
use crate::coords::{Bounds, Fit, Point};
use crate::drawing::HitTarget;
use crate::entity::{AnnotationEntity, Scale};
use crate::store::AnnotationStore;

/// Modifier keys held during a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    /// Whether the click toggles membership instead of replacing the selection
    pub fn is_multi_select(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// Anchor of the resize overlay drawn around the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Right,
        ResizeHandle::BottomRight,
        ResizeHandle::Bottom,
        ResizeHandle::BottomLeft,
        ResizeHandle::Left,
    ];

    /// Position of this anchor on a bounding box
    pub fn position(&self, bounds: &Bounds) -> Point {
        let center_x = bounds.x + bounds.width / 2.0;
        let center_y = bounds.y + bounds.height / 2.0;
        match self {
            ResizeHandle::TopLeft => Point::new(bounds.x, bounds.y),
            ResizeHandle::Top => Point::new(center_x, bounds.y),
            ResizeHandle::TopRight => Point::new(bounds.max_x(), bounds.y),
            ResizeHandle::Right => Point::new(bounds.max_x(), center_y),
            ResizeHandle::BottomRight => Point::new(bounds.max_x(), bounds.max_y()),
            ResizeHandle::Bottom => Point::new(center_x, bounds.max_y()),
            ResizeHandle::BottomLeft => Point::new(bounds.x, bounds.max_y()),
            ResizeHandle::Left => Point::new(bounds.x, center_y),
        }
    }

    /// Find the anchor within `radius` of `point`, if any
    pub fn hit_test(bounds: &Bounds, point: Point, radius: f64) -> Option<ResizeHandle> {
        Self::ALL
            .into_iter()
            .find(|handle| handle.position(bounds).distance_to(&point) <= radius)
    }
}

/// One frame of a resize gesture reported by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformUpdate {
    /// Group scale relative to the geometry at gesture start
    pub scale: Scale,
    /// New group position, when the dragged anchor moves the origin
    pub position: Option<Point>,
}

impl TransformUpdate {
    pub fn scale(x: f64, y: f64) -> Self {
        Self {
            scale: Scale::new(x, y),
            position: None,
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }
}

/// Clamp a drag candidate so the composite's full bounding box stays on the image
pub fn clamp_drag(fit: &Fit, entity: &AnnotationEntity, candidate: Point) -> Point {
    fit.clamp_box(candidate, entity.composite_bounds())
}

/// Ordered set of selected annotation ids
#[derive(Debug, Default)]
pub struct SelectionController {
    selected: Vec<AnnotationId>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected ids in the order they were selected
    pub fn selected(&self) -> &[AnnotationId] {
        &self.selected
    }

    pub fn is_selected(&self, id: AnnotationId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Apply a click to the selection.
    ///
    /// Returns `true` if the selection changed.
    pub fn handle_click(
        &mut self,
        store: &AnnotationStore,
        target: HitTarget,
        modifiers: Modifiers,
    ) -> bool {
        let node = match target {
            HitTarget::Canvas | HitTarget::Background => return self.clear(),
            HitTarget::Handle => return false,
            HitTarget::Node(node) => node,
        };
        let Some(id) = store.owner_of(node) else {
            tracing::debug!(?node, "click on a node outside any annotation");
            return false;
        };

        if !modifiers.is_multi_select() {
            return self.select_only(id);
        }
        if self.is_selected(id) {
            self.remove(id)
        } else {
            self.selected.push(id);
            true
        }
    }

    /// Replace the selection with a single id
    pub fn select_only(&mut self, id: AnnotationId) -> bool {
        if self.selected == [id] {
            return false;
        }
        self.selected.clear();
        self.selected.push(id);
        true
    }

    /// Drop an id from the selection
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        let before = self.selected.len();
        self.selected.retain(|selected| *selected != id);
        self.selected.len() != before
    }

    pub fn clear(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        self.selected.clear();
        true
    }

    /// Drop ids whose composite no longer exists
    pub fn retain_existing(&mut self, store: &AnnotationStore) -> bool {
        let before = self.selected.len();
        self.selected.retain(|id| store.contains(*id));
        self.selected.len() != before
    }

    /// Union of the selected composites' display bounds, where the resize
    /// overlay is drawn
    pub fn overlay_bounds(&self, store: &AnnotationStore) -> Option<Bounds> {
        self.selected
            .iter()
            .filter_map(|id| store.get(*id))
            .map(|entity| entity.display_bounds())
            .reduce(|a, b| {
                let x = a.x.min(b.x);
                let y = a.y.min(b.y);
                Bounds::new(x, y, a.max_x().max(b.max_x()) - x, a.max_y().max(b.max_y()) - y)
            })
    }

    /// Move a composite to the clamped drag position.
    ///
    /// Returns the position actually applied, or `None` for an unknown or
    /// non-draggable composite or when no image is displayed.
    pub fn drag_move(
        &self,
        ctx: &EditingContext,
        store: &mut AnnotationStore,
        id: AnnotationId,
        candidate: Point,
    ) -> Option<Point> {
        let fit = ctx.coords.fit()?;
        let entity = store.get_mut(id)?;
        if !entity.is_draggable() {
            return None;
        }
        let position = clamp_drag(fit, entity, candidate);
        entity.set_position(position);
        Some(position)
    }

    /// Apply one resize frame.
    ///
    /// A frame that would shrink the shape below the minimum resize size on
    /// either axis, or that carries a non-positive scale, is rejected and the
    /// previous frame stays in place. Returns whether the frame was applied.
    pub fn transform(
        &self,
        ctx: &EditingContext,
        store: &mut AnnotationStore,
        id: AnnotationId,
        update: TransformUpdate,
    ) -> bool {
        let Some(entity) = store.get_mut(id) else {
            return false;
        };
        let Scale { x, y } = update.scale;
        if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
            return false;
        }
        let bounds = entity.shape().local_bounds();
        let min = ctx.config.resize_min_size;
        if bounds.width * x < min || bounds.height * y < min {
            tracing::debug!(%id, scale_x = x, scale_y = y, "resize frame below minimum size");
            return false;
        }

        entity.apply_scale(update.scale);
        if let Some(position) = update.position {
            entity.set_position(position);
        }
        true
    }

    /// Finish a resize gesture by folding the transient scale into the geometry
    pub fn transform_end(
        &self,
        ctx: &EditingContext,
        store: &mut AnnotationStore,
        id: AnnotationId,
    ) -> bool {
        let Some(entity) = store.get_mut(id) else {
            return false;
        };
        entity.fold_scale(ctx.config.min_folded_extent, &ctx.config.label);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, Shape};
    use crate::config::{EditorConfig, LabelStyle};
    use crate::coords::Size;
    use crate::entity::{NodeAllocator, NodeId};

    struct Fixture {
        ctx: EditingContext,
        store: AnnotationStore,
    }

    impl Fixture {
        /// 800x600 container with an image that fills it exactly
        fn new(annotations: &[Annotation]) -> Self {
            let mut ctx = EditingContext::new(Size::new(800.0, 600.0), EditorConfig::default());
            ctx.coords.recompute_fit(Size::new(800.0, 600.0)).unwrap();
            let mut nodes = NodeAllocator::new();
            let mut store = AnnotationStore::new();
            store.load_annotations(&ctx, &mut nodes, annotations);
            Self { ctx, store }
        }

        fn entity(&self, index: usize) -> &AnnotationEntity {
            self.store.iter().nth(index).unwrap()
        }
    }

    fn two_rects() -> Fixture {
        Fixture::new(&[
            Annotation::rect(10.0, 10.0, 50.0, 50.0, "red"),
            Annotation::rect(200.0, 200.0, 50.0, 50.0, "red").with_label("car"),
        ])
    }

    #[test]
    fn test_click_replaces_toggles_and_clears() {
        let fixture = two_rects();
        let a = fixture.entity(0);
        let b = fixture.entity(1);
        let mut selection = SelectionController::new();

        assert!(selection.handle_click(
            &fixture.store,
            HitTarget::Node(a.shape_node()),
            Modifiers::NONE
        ));
        assert_eq!(selection.selected(), &[a.id()]);

        // Plain click on another composite replaces
        assert!(selection.handle_click(
            &fixture.store,
            HitTarget::Node(b.group_node()),
            Modifiers::NONE
        ));
        assert_eq!(selection.selected(), &[b.id()]);

        // Modifier adds, then removes
        assert!(selection.handle_click(
            &fixture.store,
            HitTarget::Node(a.shape_node()),
            Modifiers::shift()
        ));
        assert_eq!(selection.selected(), &[b.id(), a.id()]);
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert!(selection.handle_click(&fixture.store, HitTarget::Node(b.shape_node()), ctrl));
        assert_eq!(selection.selected(), &[a.id()]);

        assert!(selection.handle_click(&fixture.store, HitTarget::Background, Modifiers::NONE));
        assert!(selection.is_empty());
        assert!(!selection.handle_click(&fixture.store, HitTarget::Canvas, Modifiers::NONE));
    }

    #[test]
    fn test_label_hits_resolve_to_owner() {
        let fixture = two_rects();
        let b = fixture.entity(1);
        let label = b.label().unwrap();
        let mut selection = SelectionController::new();

        selection.handle_click(&fixture.store, HitTarget::Node(label.text_node()), Modifiers::NONE);
        assert_eq!(selection.selected(), &[b.id()]);
        // Same composite through another sub-node is not a change
        assert!(!selection.handle_click(
            &fixture.store,
            HitTarget::Node(label.background_node()),
            Modifiers::NONE
        ));
    }

    #[test]
    fn test_handle_and_foreign_hits_are_ignored() {
        let fixture = two_rects();
        let mut selection = SelectionController::new();
        selection.select_only(fixture.entity(0).id());

        assert!(!selection.handle_click(&fixture.store, HitTarget::Handle, Modifiers::NONE));
        let foreign = HitTarget::Node(NodeId(10_000));
        assert!(!selection.handle_click(&fixture.store, foreign, Modifiers::NONE));
        assert_eq!(selection.selected(), &[fixture.entity(0).id()]);
    }

    #[test]
    fn test_retain_existing_prunes_removed() {
        let mut fixture = two_rects();
        let a = fixture.entity(0).id();
        let b = fixture.entity(1).id();
        let mut selection = SelectionController::new();
        selection.select_only(a);
        selection.handle_click(
            &fixture.store,
            HitTarget::Node(fixture.entity(1).shape_node()),
            Modifiers::shift(),
        );

        fixture.store.remove(a);
        assert!(selection.retain_existing(&fixture.store));
        assert_eq!(selection.selected(), &[b]);
        assert!(!selection.retain_existing(&fixture.store));
    }

    #[test]
    fn test_drag_is_contained_in_image() {
        let mut fixture = Fixture::new(&[
            Annotation::rect(10.0, 10.0, 100.0, 50.0, "red"),
            Annotation::circle(300.0, 300.0, 20.0, "blue"),
        ]);
        let rect = fixture.entity(0).id();
        let circle = fixture.entity(1).id();
        let selection = SelectionController::new();
        let ctx = &fixture.ctx;

        let moved = selection.drag_move(ctx, &mut fixture.store, rect, Point::new(760.0, 580.0));
        assert_eq!(moved, Some(Point::new(700.0, 550.0)));
        let moved = selection.drag_move(ctx, &mut fixture.store, rect, Point::new(-5.0, -5.0));
        assert_eq!(moved, Some(Point::new(0.0, 0.0)));

        let moved = selection.drag_move(ctx, &mut fixture.store, circle, Point::new(5.0, 599.0));
        assert_eq!(moved, Some(Point::new(20.0, 580.0)));
        assert_eq!(fixture.store.get(circle).unwrap().position(), Point::new(20.0, 580.0));

        let inside = selection.drag_move(ctx, &mut fixture.store, circle, Point::new(400.0, 300.0));
        assert_eq!(inside, Some(Point::new(400.0, 300.0)));
    }

    #[test]
    fn test_drag_keeps_label_on_image() {
        let mut fixture = two_rects();
        let labelled = fixture.entity(1).id();
        let selection = SelectionController::new();
        let ctx = &fixture.ctx;

        // The label sits 24px above the rectangle
        let moved = selection.drag_move(ctx, &mut fixture.store, labelled, Point::new(100.0, 0.0));
        assert_eq!(moved, Some(Point::new(100.0, 24.0)));
    }

    #[test]
    fn test_scale_folding_does_not_compound() {
        let mut fixture = Fixture::new(&[Annotation::rect(10.0, 10.0, 50.0, 40.0, "red")]);
        let id = fixture.entity(0).id();
        let selection = SelectionController::new();
        let ctx = &fixture.ctx;

        assert!(selection.transform(ctx, &mut fixture.store, id, TransformUpdate::scale(2.0, 1.0)));
        assert!(selection.transform_end(ctx, &mut fixture.store, id));
        let entity = fixture.store.get(id).unwrap();
        assert_eq!(
            entity.shape(),
            Shape::Rect {
                width: 100.0,
                height: 40.0
            }
        );
        assert!(entity.scale().is_identity());

        selection.transform(ctx, &mut fixture.store, id, TransformUpdate::scale(1.5, 1.0));
        selection.transform_end(ctx, &mut fixture.store, id);
        assert_eq!(
            fixture.store.get(id).unwrap().shape(),
            Shape::Rect {
                width: 150.0,
                height: 40.0
            }
        );
    }

    #[test]
    fn test_transform_moves_origin_and_counter_scales_label() {
        let mut fixture = two_rects();
        let id = fixture.entity(1).id();
        let selection = SelectionController::new();
        let ctx = &fixture.ctx;

        let update = TransformUpdate::scale(2.0, 2.0).with_position(Point::new(150.0, 150.0));
        assert!(selection.transform(ctx, &mut fixture.store, id, update));
        let entity = fixture.store.get(id).unwrap();
        assert_eq!(entity.position(), Point::new(150.0, 150.0));
        assert_eq!(entity.label().unwrap().scale, Scale::new(0.5, 0.5));

        selection.transform_end(ctx, &mut fixture.store, id);
        let entity = fixture.store.get(id).unwrap();
        assert!(entity.label().unwrap().scale.is_identity());
        assert_eq!(entity.label().unwrap().size, LabelStyle::default().measure("car"));
    }

    #[test]
    fn test_tiny_resize_frame_is_rejected() {
        let mut fixture = Fixture::new(&[Annotation::rect(10.0, 10.0, 50.0, 50.0, "red")]);
        let id = fixture.entity(0).id();
        let selection = SelectionController::new();
        let ctx = &fixture.ctx;

        assert!(selection.transform(ctx, &mut fixture.store, id, TransformUpdate::scale(0.5, 0.5)));
        for (x, y) in [(0.05, 1.0), (-1.0, 1.0)] {
            let update = TransformUpdate::scale(x, y);
            assert!(!selection.transform(ctx, &mut fixture.store, id, update));
        }
        assert_eq!(fixture.store.get(id).unwrap().scale(), Scale::new(0.5, 0.5));
    }

    #[test]
    fn test_overlay_bounds_and_handles() {
        let fixture = two_rects();
        let mut selection = SelectionController::new();
        assert!(selection.overlay_bounds(&fixture.store).is_none());

        selection.select_only(fixture.entity(0).id());
        selection.handle_click(
            &fixture.store,
            HitTarget::Node(fixture.entity(1).shape_node()),
            Modifiers::shift(),
        );
        let bounds = selection.overlay_bounds(&fixture.store).unwrap();
        assert_eq!(bounds, Bounds::new(10.0, 10.0, 240.0, 240.0));

        assert_eq!(ResizeHandle::Right.position(&bounds), Point::new(250.0, 130.0));
        assert_eq!(
            ResizeHandle::hit_test(&bounds, Point::new(249.0, 251.0), 4.0),
            Some(ResizeHandle::BottomRight)
        );
        assert_eq!(ResizeHandle::hit_test(&bounds, Point::new(130.0, 130.0), 4.0), None);
    }
}
