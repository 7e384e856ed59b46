//! Drawing state machine
//!
//! Turns pointer-down/move/up into a validated shape. A gesture starts only on
//! the background image or the empty canvas, grows a provisional primitive while
//! the pointer moves, and on release either hands a normalized shape to the
//! caller or silently discards it when it is below the minimum size.

use crate::annotation::Shape;
use crate::config::EditorConfig;
use crate::context::EditingContext;
use crate::coords::Point;
use crate::entity::{NodeAllocator, NodeId};
use crate::store::DrawnShape;

/// Active tool selected by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Pointer input selects and edits existing annotations
    #[default]
    Select,
    Rect,
    Circle,
}

/// What a pointer event landed on, as reported by the host scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// Empty canvas outside any node
    Canvas,
    /// The background image node
    Background,
    /// A node of the selection-handle overlay
    Handle,
    /// Any other scene node
    Node(NodeId),
}

/// Shape being drawn, in display space. Rectangle sides may be negative.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalShape {
    pub node: NodeId,
    /// Gesture start point, the rectangle corner or circle center
    pub origin: Point,
    pub shape: Shape,
    pub stroke: String,
    pub stroke_width: f64,
}

impl ProvisionalShape {
    /// Whether the normalized shape meets the minimum creation size
    fn is_large_enough(&self, config: &EditorConfig) -> bool {
        match self.shape {
            Shape::Rect { width, height } => {
                width.abs() >= config.min_rect_size && height.abs() >= config.min_rect_size
            }
            Shape::Circle { radius } => radius >= config.min_circle_radius,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DrawState {
    Idle,
    Drawing(ProvisionalShape),
}

/// Result of releasing the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    /// No gesture was in progress
    Ignored,
    /// The shape was below the minimum size and its node was destroyed
    Discarded(NodeId),
    /// The gesture produced a valid shape; ownership passes to the caller
    Finished(DrawnShape),
}

/// Idle/Drawing state machine for creating annotations
#[derive(Debug)]
pub struct DrawingStateMachine {
    mode: DrawMode,
    state: DrawState,
}

impl Default for DrawingStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingStateMachine {
    pub fn new() -> Self {
        Self {
            mode: DrawMode::Select,
            state: DrawState::Idle,
        }
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    /// Set the active tool. Leaving a draw mode aborts any gesture in progress.
    ///
    /// Returns the node of an aborted provisional shape.
    pub fn set_mode(&mut self, mode: DrawMode) -> Option<NodeId> {
        let aborted = if mode != self.mode {
            self.reset_current_shape()
        } else {
            None
        };
        self.mode = mode;
        aborted
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing(_))
    }

    /// Provisional shape of the gesture in progress
    pub fn current_shape(&self) -> Option<&ProvisionalShape> {
        match &self.state {
            DrawState::Drawing(shape) => Some(shape),
            DrawState::Idle => None,
        }
    }

    /// Start a gesture.
    ///
    /// Returns the new provisional shape, or `None` when the machine stays idle:
    /// select mode, a target other than the canvas or background, a gesture
    /// already running, or no image loaded.
    pub fn pointer_down(
        &mut self,
        ctx: &EditingContext,
        nodes: &mut NodeAllocator,
        target: HitTarget,
        screen: Point,
    ) -> Option<&ProvisionalShape> {
        let (shape, stroke) = match self.mode {
            DrawMode::Select => return None,
            DrawMode::Rect => (
                Shape::Rect {
                    width: 0.0,
                    height: 0.0,
                },
                ctx.config.rect_stroke.clone(),
            ),
            DrawMode::Circle => (Shape::Circle { radius: 0.0 }, ctx.config.circle_stroke.clone()),
        };
        if !matches!(target, HitTarget::Canvas | HitTarget::Background) || self.is_drawing() {
            return None;
        }
        let origin = ctx.coords.pointer_to_clamped_stage(screen)?;

        tracing::debug!(mode = ?self.mode, x = origin.x, y = origin.y, "drawing started");
        self.state = DrawState::Drawing(ProvisionalShape {
            node: nodes.allocate(),
            origin,
            shape,
            stroke,
            stroke_width: ctx.stroke_width(),
        });
        self.current_shape()
    }

    /// Grow the provisional shape towards the pointer.
    ///
    /// Rectangle sides are left signed until the pointer is released.
    pub fn pointer_move(
        &mut self,
        ctx: &EditingContext,
        screen: Point,
    ) -> Option<&ProvisionalShape> {
        let DrawState::Drawing(current) = &mut self.state else {
            return None;
        };
        let point = ctx.coords.pointer_to_clamped_stage(screen)?;

        current.shape = match current.shape {
            Shape::Rect { .. } => Shape::Rect {
                width: point.x - current.origin.x,
                height: point.y - current.origin.y,
            },
            Shape::Circle { .. } => Shape::Circle {
                radius: point.distance_to(&current.origin),
            },
        };
        Some(current)
    }

    /// Finish the gesture and return to idle
    pub fn pointer_up(&mut self, ctx: &EditingContext) -> DrawOutcome {
        let DrawState::Drawing(current) = std::mem::replace(&mut self.state, DrawState::Idle) else {
            return DrawOutcome::Ignored;
        };

        if !current.is_large_enough(&ctx.config) {
            tracing::debug!(shape = ?current.shape, "drawing abandoned, below minimum size");
            return DrawOutcome::Discarded(current.node);
        }

        let (position, shape) = current.shape.normalized(current.origin);
        DrawOutcome::Finished(DrawnShape {
            node: current.node,
            position,
            shape,
            stroke: current.stroke,
            stroke_width: current.stroke_width,
        })
    }

    /// Abort any gesture in progress, returning the destroyed provisional node
    pub fn reset_current_shape(&mut self) -> Option<NodeId> {
        match std::mem::replace(&mut self.state, DrawState::Idle) {
            DrawState::Drawing(current) => {
                tracing::debug!("drawing cancelled");
                Some(current.node)
            }
            DrawState::Idle => None,
        }
    }

    /// Update the provisional shape's stroke after a zoom change
    pub fn set_stroke_width(&mut self, width: f64) {
        if let DrawState::Drawing(current) = &mut self.state {
            current.stroke_width = width;
        }
    }
}
