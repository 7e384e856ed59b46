//! Live annotation collection for the displayed image
//!
//! The store exclusively owns the composites bound to the current image. It
//! converts between image-space [`Annotation`] records and display-space
//! [`AnnotationEntity`] composites using the current fit.

use crate::annotation::{Annotation, AnnotationId, AnnotationRecord, Shape};
use crate::context::EditingContext;
use crate::coords::Point;
use crate::entity::{AnnotationEntity, NodeAllocator, NodeId};

/// Geometry handed over by the drawing state machine once a gesture completes
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnShape {
    /// Scene node created for the provisional shape
    pub node: NodeId,
    /// Display-space anchor (top-left for rectangles, center for circles)
    pub position: Point,
    /// Normalized display-space geometry
    pub shape: Shape,
    pub stroke: String,
    pub stroke_width: f64,
}

/// Ordered collection of annotation composites. Insertion order is z-order.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    entities: Vec<AnnotationEntity>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection with composites built from `annotations`.
    ///
    /// Records without an id get a fresh one. Returns the number of composites
    /// built; nothing is loaded when no image is displayed.
    pub fn load_annotations(
        &mut self,
        ctx: &EditingContext,
        nodes: &mut NodeAllocator,
        annotations: &[Annotation],
    ) -> usize {
        self.clear();

        let Some(fit) = ctx.coords.fit() else {
            tracing::debug!(
                count = annotations.len(),
                "no image displayed, annotations not loaded"
            );
            return 0;
        };
        let stroke_width = ctx.stroke_width();

        for annotation in annotations {
            let mut id = annotation.id.unwrap_or_else(AnnotationId::new_v4);
            if self.contains(id) {
                tracing::warn!(%id, "duplicate annotation id, assigning a new one");
                id = AnnotationId::new_v4();
            }

            let mut entity = AnnotationEntity::from_annotation(
                id,
                annotation,
                fit,
                stroke_width,
                &ctx.config.label,
                nodes,
            );
            entity.set_draggable(true);
            self.entities.push(entity);
        }

        self.entities.len()
    }

    /// Load interchange records, skipping any that cannot become an annotation.
    ///
    /// Returns the number of composites built.
    pub fn load_records(
        &mut self,
        ctx: &EditingContext,
        nodes: &mut NodeAllocator,
        records: &[AnnotationRecord],
    ) -> usize {
        let annotations = records_to_annotations(records);
        self.load_annotations(ctx, nodes, &annotations)
    }

    /// Read every composite back into image space, in z-order.
    ///
    /// Returns an empty list when no image is displayed.
    pub fn to_data(&self, ctx: &EditingContext) -> Vec<Annotation> {
        let Some(fit) = ctx.coords.fit() else {
            return Vec::new();
        };
        self.entities.iter().map(|entity| entity.to_annotation(fit)).collect()
    }

    /// Remove every composite
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Turn a finished drawing into a draggable composite on top of the stack
    pub fn insert_drawn(&mut self, drawn: DrawnShape, nodes: &mut NodeAllocator) -> AnnotationId {
        let id = AnnotationId::new_v4();
        let mut entity = AnnotationEntity::new(
            id,
            nodes.allocate(),
            drawn.node,
            drawn.position,
            drawn.shape,
            drawn.stroke,
            drawn.stroke_width,
        );
        entity.set_draggable(true);
        self.entities.push(entity);
        id
    }

    /// Remove a composite by id
    pub fn remove(&mut self, id: AnnotationId) -> Option<AnnotationEntity> {
        let index = self.entities.iter().position(|entity| entity.id() == id)?;
        Some(self.entities.remove(index))
    }

    pub fn get(&self, id: AnnotationId) -> Option<&AnnotationEntity> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut AnnotationEntity> {
        self.entities.iter_mut().find(|entity| entity.id() == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    /// Resolve any node of a composite to the composite's id
    pub fn owner_of(&self, node: NodeId) -> Option<AnnotationId> {
        self.entities
            .iter()
            .find(|entity| entity.role_of(node).is_some())
            .map(AnnotationEntity::id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationEntity> {
        self.entities.iter()
    }

    pub fn ids(&self) -> Vec<AnnotationId> {
        self.entities.iter().map(AnnotationEntity::id).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Set the stroke width of every composite
    pub fn apply_stroke_width(&mut self, width: f64) {
        for entity in &mut self.entities {
            entity.set_stroke_width(width);
        }
    }
}

/// Convert interchange records, logging and dropping the ones that are invalid
pub fn records_to_annotations(records: &[AnnotationRecord]) -> Vec<Annotation> {
    records
        .iter()
        .cloned()
        .filter_map(|record| {
            let kind = record.kind.clone();
            match Annotation::try_from(record) {
                Ok(annotation) => Some(annotation),
                Err(error) => {
                    tracing::warn!(%kind, %error, "skipping annotation record");
                    None
                }
            }
        })
        .collect()
}
