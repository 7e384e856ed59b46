//! Editor façade
//!
//! [`Editor`] owns every component and routes host input through them: pointer
//! gestures go to the drawing state machine or the selection controller, and
//! every committed action snapshots the store into history. Components never
//! reference each other; they borrow the shared [`EditingContext`] per call.

use crate::annotation::{Annotation, AnnotationId, AnnotationRecord, BoundingBox};
use crate::config::EditorConfig;
use crate::context::EditingContext;
use crate::coords::{Bounds, Fit, Point, Size, ViewTransform};
use crate::drawing::{DrawMode, DrawOutcome, DrawingStateMachine, HitTarget, ProvisionalShape};
use crate::entity::{NodeAllocator, NodeId};
use crate::error::{EditorError, EditorResult};
use crate::events::{EditAction, Notifier};
use crate::history::{HistoryItem, HistoryStack, HistoryState};
use crate::selection::{Modifiers, SelectionController, TransformUpdate};
use crate::store::AnnotationStore;

/// Direction of one wheel zoom step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug)]
pub struct Editor {
    ctx: EditingContext,
    store: AnnotationStore,
    drawing: DrawingStateMachine,
    selection: SelectionController,
    history: HistoryStack,
    nodes: NodeAllocator,
    notifier: Notifier,
}

impl Editor {
    /// Create an editor for a drawing surface of the given size.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidSurface`] if the surface has no usable area,
    /// or [`EditorError::Config`] if the configuration fails validation.
    pub fn new(config: EditorConfig, surface: Size) -> EditorResult<Self> {
        if !surface.is_usable() {
            return Err(EditorError::InvalidSurface {
                width: surface.width,
                height: surface.height,
            });
        }
        config.validate()?;
        Ok(Self {
            ctx: EditingContext::new(surface, config),
            store: AnnotationStore::new(),
            drawing: DrawingStateMachine::new(),
            selection: SelectionController::new(),
            history: HistoryStack::new(),
            nodes: NodeAllocator::new(),
            notifier: Notifier::new(),
        })
    }

    /// Attach host callbacks
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    pub fn context(&self) -> &EditingContext {
        &self.ctx
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn fit(&self) -> Option<&Fit> {
        self.ctx.coords.fit()
    }

    pub fn view(&self) -> ViewTransform {
        self.ctx.coords.view()
    }

    // Image and surface

    /// Display a freshly decoded image.
    ///
    /// Clears annotations, selection and history, and resets the view.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidImage`] for zero or non-finite dimensions;
    /// nothing is changed in that case.
    pub fn load_image(&mut self, natural_size: Size) -> EditorResult<Fit> {
        let fit = self
            .ctx
            .coords
            .recompute_fit(natural_size)
            .ok_or(EditorError::InvalidImage {
                width: natural_size.width,
                height: natural_size.height,
            })?;
        tracing::debug!(
            width = natural_size.width,
            height = natural_size.height,
            fit_scale = fit.fit_scale,
            "image fitted"
        );

        self.reset_current_shape();
        self.store.clear();
        if self.selection.clear() {
            self.notifier.selection_change(self.selection.selected());
        }
        self.history.reset();
        self.notifier.history_change(&self.history.display());
        Ok(fit)
    }

    /// Resize the drawing surface, refitting the image and re-deriving every
    /// annotation's display geometry from its image-space data.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidSurface`] if the new size has no usable area.
    pub fn resize_surface(&mut self, surface: Size) -> EditorResult<Option<Fit>> {
        if !surface.is_usable() {
            return Err(EditorError::InvalidSurface {
                width: surface.width,
                height: surface.height,
            });
        }
        let data = self.store.to_data(&self.ctx);
        self.reset_current_shape();
        let fit = self.ctx.coords.set_container(surface);
        self.store.load_annotations(&self.ctx, &mut self.nodes, &data);
        self.prune_selection();
        Ok(fit)
    }

    // Drawing

    pub fn draw_mode(&self) -> DrawMode {
        self.drawing.mode()
    }

    /// Switch the active tool, aborting any drawing in progress
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        let aborted = self.drawing.set_mode(mode);
        self.cancel_drawing(aborted);
    }

    /// Provisional shape of the drawing in progress
    pub fn current_shape(&self) -> Option<&ProvisionalShape> {
        self.drawing.current_shape()
    }

    /// Abort the drawing in progress
    pub fn reset_current_shape(&mut self) {
        let aborted = self.drawing.reset_current_shape();
        self.cancel_drawing(aborted);
    }

    /// Pointer pressed at a screen position. Returns whether a drawing started.
    pub fn pointer_down(&mut self, target: HitTarget, screen: Point) -> bool {
        let started = self
            .drawing
            .pointer_down(&self.ctx, &mut self.nodes, target, screen)
            .map(|shape| shape.node);
        match started {
            Some(node) => {
                self.notifier.draw_start(node);
                true
            }
            None => false,
        }
    }

    pub fn pointer_move(&mut self, screen: Point) -> Option<&ProvisionalShape> {
        self.drawing.pointer_move(&self.ctx, screen)
    }

    /// Pointer released. Returns the id of the annotation created, if any.
    pub fn pointer_up(&mut self) -> Option<AnnotationId> {
        let drawn = match self.drawing.pointer_up(&self.ctx) {
            DrawOutcome::Finished(drawn) => drawn,
            DrawOutcome::Discarded(node) => {
                self.notifier.draw_cancel(node);
                return None;
            }
            DrawOutcome::Ignored => return None,
        };
        let node = drawn.node;
        let id = self.store.insert_drawn(drawn, &mut self.nodes);
        self.notifier.draw_end(node);
        self.commit(EditAction::Create);
        Some(id)
    }

    // Selection

    pub fn selected(&self) -> &[AnnotationId] {
        self.selection.selected()
    }

    /// Route a click to the selection controller
    pub fn click(&mut self, target: HitTarget, modifiers: Modifiers) -> bool {
        let changed = self.selection.handle_click(&self.store, target, modifiers);
        if changed {
            self.notifier.selection_change(self.selection.selected());
        }
        changed
    }

    /// Select exactly one annotation by id
    pub fn select(&mut self, id: AnnotationId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        let changed = self.selection.select_only(id);
        if changed {
            self.notifier.selection_change(self.selection.selected());
        }
        changed
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear();
        if changed {
            self.notifier.selection_change(self.selection.selected());
        }
        changed
    }

    /// Resize overlay bounds around the current selection
    pub fn selection_bounds(&self) -> Option<Bounds> {
        self.selection.overlay_bounds(&self.store)
    }

    /// One drag tick. Returns the clamped position applied to the composite.
    pub fn drag_move(&mut self, id: AnnotationId, candidate: Point) -> Option<Point> {
        self.selection.drag_move(&self.ctx, &mut self.store, id, candidate)
    }

    /// Drag gesture finished
    pub fn drag_end(&mut self, id: AnnotationId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        self.commit(EditAction::Move);
        true
    }

    /// One resize frame. Returns whether the frame was accepted.
    pub fn transform(&mut self, id: AnnotationId, update: TransformUpdate) -> bool {
        self.selection.transform(&self.ctx, &mut self.store, id, update)
    }

    /// Resize gesture finished
    pub fn transform_end(&mut self, id: AnnotationId) -> bool {
        if !self.selection.transform_end(&self.ctx, &mut self.store, id) {
            return false;
        }
        self.commit(EditAction::Transform);
        true
    }

    // Editing

    /// Remove one annotation
    pub fn delete(&mut self, id: AnnotationId) -> bool {
        if self.store.remove(id).is_none() {
            return false;
        }
        if self.selection.remove(id) {
            self.notifier.selection_change(self.selection.selected());
        }
        self.commit(EditAction::Delete);
        true
    }

    /// Remove every selected annotation as one history step.
    ///
    /// Returns the number removed.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selection.selected().to_vec();
        let removed = ids
            .into_iter()
            .filter(|id| self.store.remove(*id).is_some())
            .count();
        if self.selection.clear() {
            self.notifier.selection_change(self.selection.selected());
        }
        if removed > 0 {
            self.commit(EditAction::Delete);
        }
        removed
    }

    /// Add, replace or remove (`None` or empty) the label of an annotation
    pub fn set_label(&mut self, id: AnnotationId, label: Option<&str>) -> bool {
        let Some(entity) = self.store.get_mut(id) else {
            return false;
        };
        match label.filter(|text| !text.is_empty()) {
            Some(text) => entity.set_label(text, &self.ctx.config.label, &mut self.nodes),
            None => {
                if entity.clear_label().is_none() {
                    return false;
                }
            }
        }
        self.commit(EditAction::Label);
        true
    }

    /// Replace the collection without touching history.
    ///
    /// Returns the number of composites built.
    pub fn load_annotations(&mut self, annotations: &[Annotation]) -> usize {
        let count = self.store.load_annotations(&self.ctx, &mut self.nodes, annotations);
        self.prune_selection();
        count
    }

    /// Load interchange records and commit an import step.
    ///
    /// Invalid records are skipped. Returns the number of composites built.
    pub fn import(&mut self, records: &[AnnotationRecord]) -> usize {
        let count = self.store.load_records(&self.ctx, &mut self.nodes, records);
        self.prune_selection();
        self.commit(EditAction::Import);
        count
    }

    /// Parse and import a JSON array of interchange records.
    ///
    /// Elements that are not valid records are skipped.
    ///
    /// # Errors
    /// Returns [`EditorError::Json`] if the text is not a JSON array.
    pub fn import_json(&mut self, json: &str) -> EditorResult<usize> {
        let records = crate::annotation::parse_records(json)?;
        Ok(self.import(&records))
    }

    /// Import image-space bounding boxes as rectangles in the default
    /// rectangle stroke, committing one import step.
    pub fn import_boxes(&mut self, boxes: &[BoundingBox]) -> usize {
        let stroke = &self.ctx.config.rect_stroke;
        let records: Vec<AnnotationRecord> =
            boxes.iter().map(|bbox| bbox.to_record(stroke)).collect();
        self.import(&records)
    }

    /// Parse and import a JSON array of bounding boxes
    ///
    /// # Errors
    /// Returns [`EditorError::Json`] if the text is not a JSON array.
    pub fn import_boxes_json(&mut self, json: &str) -> EditorResult<usize> {
        let boxes = crate::annotation::parse_boxes(json)?;
        Ok(self.import_boxes(&boxes))
    }

    /// Current annotations in image space
    pub fn annotations(&self) -> Vec<Annotation> {
        self.store.to_data(&self.ctx)
    }

    pub fn bounding_boxes(&self) -> Vec<BoundingBox> {
        self.annotations()
            .iter()
            .map(Annotation::bounding_box)
            .collect()
    }

    /// Current annotations as pretty interchange JSON
    pub fn to_json(&self) -> EditorResult<String> {
        Ok(crate::annotation::to_json(&self.annotations())?)
    }

    // View

    /// Zoom one step about a screen position, keeping the point under it fixed.
    ///
    /// Returns the new zoom.
    pub fn zoom_at(&mut self, pointer: Point, direction: ZoomDirection) -> f64 {
        let view = self.ctx.coords.view();
        let step = self.ctx.config.zoom_step;
        let target = match direction {
            ZoomDirection::In => view.zoom * step,
            ZoomDirection::Out => view.zoom / step,
        };
        let zoom = target.clamp(self.ctx.config.min_zoom, self.ctx.config.max_zoom);
        self.set_view(view.zoomed_at(pointer, zoom));
        zoom
    }

    /// Replace the view transform, clamping its zoom
    pub fn set_view(&mut self, view: ViewTransform) {
        let zoom = view.zoom.clamp(self.ctx.config.min_zoom, self.ctx.config.max_zoom);
        self.ctx.coords.set_view(ViewTransform { zoom, ..view });
        let width = self.ctx.coords.stroke_width();
        self.store.apply_stroke_width(width);
        self.drawing.set_stroke_width(width);
    }

    /// Move the view by a screen-space offset
    pub fn pan_by(&mut self, delta: Point) {
        let mut view = self.ctx.coords.view();
        view.pan = Point::new(view.pan.x + delta.x, view.pan.y + delta.y);
        self.ctx.coords.set_view(view);
    }

    // History

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let snapshot = self.history.undo();
        self.replay(snapshot)
    }

    pub fn redo(&mut self) -> bool {
        let snapshot = self.history.redo();
        self.replay(snapshot)
    }

    pub fn go_to(&mut self, index: usize) -> bool {
        let snapshot = self.history.go_to(index);
        self.replay(snapshot)
    }

    /// Clear the annotations and collapse history to the initial scene
    pub fn reset_history(&mut self) {
        self.history.reset();
        self.replay(Some(Vec::new()));
    }

    pub fn history_items(&self) -> Vec<HistoryItem> {
        self.history.display()
    }

    pub fn history_state(&self) -> HistoryState {
        self.history.state()
    }

    /// Reinstate a persisted history and display the state at its cursor
    pub fn restore_history(&mut self, state: HistoryState) {
        let snapshot = self.history.restore(state);
        self.replay(Some(snapshot));
    }

    fn replay(&mut self, snapshot: Option<Vec<Annotation>>) -> bool {
        let Some(snapshot) = snapshot else {
            return false;
        };
        tracing::debug!(cursor = self.history.cursor(), count = snapshot.len(), "history replay");
        self.reset_current_shape();
        self.store.load_annotations(&self.ctx, &mut self.nodes, &snapshot);
        self.prune_selection();
        self.notifier.history_change(&self.history.display());
        true
    }

    fn cancel_drawing(&mut self, aborted: Option<NodeId>) {
        if let Some(node) = aborted {
            self.notifier.draw_cancel(node);
        }
    }

    fn prune_selection(&mut self) {
        if self.selection.retain_existing(&self.store) {
            self.notifier.selection_change(self.selection.selected());
        }
    }

    fn commit(&mut self, action: EditAction) {
        self.history.push(self.store.to_data(&self.ctx), action.label());
        self.notifier.state_change(action);
        self.notifier.history_change(&self.history.display());
    }
}
