//! Annotator Core Library
//!
//! Interactive 2D image-annotation engine: coordinate mapping between image,
//! display and screen space, annotation composites, drawing and selection
//! gestures, and linear undo/redo history.

pub mod annotation;
pub mod config;
pub mod context;
pub mod coords;
pub mod drawing;
pub mod editor;
pub mod entity;
pub mod error;
pub mod events;
pub mod history;
pub mod selection;
pub mod store;

pub use annotation::{
    parse_boxes, parse_records, to_json, Annotation, AnnotationId, AnnotationRecord, BoundingBox,
    Shape, ShapeKind,
};
pub use config::{EditorConfig, LabelStyle};
pub use context::EditingContext;
pub use coords::{stroke_width_for, Bounds, CoordinateSpace, Fit, Point, Size, ViewTransform};
pub use drawing::{DrawMode, DrawOutcome, DrawingStateMachine, HitTarget, ProvisionalShape};
pub use editor::{Editor, ZoomDirection};
pub use entity::{AnnotationEntity, LabelNode, NodeAllocator, NodeId, NodeRole, Scale};
pub use error::{ConfigError, EditorError, EditorResult, RecordError};
pub use events::{EditAction, Notifier};
pub use history::{HistoryEntry, HistoryItem, HistoryStack, HistoryState, SavedEntry};
pub use selection::{clamp_drag, Modifiers, ResizeHandle, SelectionController, TransformUpdate};
pub use store::{records_to_annotations, AnnotationStore, DrawnShape};
