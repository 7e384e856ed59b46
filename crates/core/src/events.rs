//! Outbound notifications to the host
//!
//! The host subscribes with plain closures. Each channel holds at most one
//! subscriber; an unset channel is a no-op.

use crate::annotation::AnnotationId;
use crate::entity::NodeId;
use crate::history::HistoryItem;

/// User action that commits a history snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Create,
    Move,
    Transform,
    Delete,
    Label,
    Import,
}

impl EditAction {
    /// Name shown in the history list
    pub fn label(&self) -> &'static str {
        match self {
            EditAction::Create => "Create",
            EditAction::Move => "Move",
            EditAction::Transform => "Transform",
            EditAction::Delete => "Delete",
            EditAction::Label => "Label",
            EditAction::Import => "Import",
        }
    }
}

impl std::fmt::Display for EditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

type NodeCallback = Box<dyn FnMut(NodeId)>;
type ActionCallback = Box<dyn FnMut(EditAction)>;
type SelectionCallback = Box<dyn FnMut(&[AnnotationId])>;
type HistoryCallback = Box<dyn FnMut(&[HistoryItem])>;

#[derive(Default)]
pub struct Notifier {
    on_draw_start: Option<NodeCallback>,
    on_draw_end: Option<NodeCallback>,
    on_draw_cancel: Option<NodeCallback>,
    on_state_change: Option<ActionCallback>,
    on_selection_change: Option<SelectionCallback>,
    on_history_change: Option<HistoryCallback>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("on_draw_start", &self.on_draw_start.is_some())
            .field("on_draw_end", &self.on_draw_end.is_some())
            .field("on_draw_cancel", &self.on_draw_cancel.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_selection_change", &self.on_selection_change.is_some())
            .field("on_history_change", &self.on_history_change.is_some())
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provisional drawing node entered the scene
    pub fn on_draw_start(mut self, callback: impl FnMut(NodeId) + 'static) -> Self {
        self.on_draw_start = Some(Box::new(callback));
        self
    }

    /// A drawing gesture produced a shape; the node now belongs to the store
    pub fn on_draw_end(mut self, callback: impl FnMut(NodeId) + 'static) -> Self {
        self.on_draw_end = Some(Box::new(callback));
        self
    }

    /// A provisional drawing node was destroyed without producing a shape
    pub fn on_draw_cancel(mut self, callback: impl FnMut(NodeId) + 'static) -> Self {
        self.on_draw_cancel = Some(Box::new(callback));
        self
    }

    /// An action was committed to history
    pub fn on_state_change(mut self, callback: impl FnMut(EditAction) + 'static) -> Self {
        self.on_state_change = Some(Box::new(callback));
        self
    }

    pub fn on_selection_change(mut self, callback: impl FnMut(&[AnnotationId]) + 'static) -> Self {
        self.on_selection_change = Some(Box::new(callback));
        self
    }

    pub fn on_history_change(mut self, callback: impl FnMut(&[HistoryItem]) + 'static) -> Self {
        self.on_history_change = Some(Box::new(callback));
        self
    }

    pub(crate) fn draw_start(&mut self, node: NodeId) {
        if let Some(callback) = self.on_draw_start.as_mut() {
            callback(node);
        }
    }

    pub(crate) fn draw_end(&mut self, node: NodeId) {
        if let Some(callback) = self.on_draw_end.as_mut() {
            callback(node);
        }
    }

    pub(crate) fn draw_cancel(&mut self, node: NodeId) {
        if let Some(callback) = self.on_draw_cancel.as_mut() {
            callback(node);
        }
    }

    pub(crate) fn state_change(&mut self, action: EditAction) {
        if let Some(callback) = self.on_state_change.as_mut() {
            callback(action);
        }
    }

    pub(crate) fn selection_change(&mut self, selected: &[AnnotationId]) {
        if let Some(callback) = self.on_selection_change.as_mut() {
            callback(selected);
        }
    }

    pub(crate) fn history_change(&mut self, items: &[HistoryItem]) {
        if let Some(callback) = self.on_history_change.as_mut() {
            callback(items);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_unset_channels_are_noops() {
        let mut notifier = Notifier::new();
        notifier.draw_start(NodeId(1));
        notifier.draw_cancel(NodeId(1));
        notifier.state_change(EditAction::Move);
        notifier.selection_change(&[]);
        notifier.history_change(&[]);
    }

    #[test]
    fn test_callbacks_receive_payloads() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let nodes = Rc::clone(&log);
        let cancelled = Rc::clone(&log);
        let mut notifier = Notifier::new()
            .on_state_change(move |action| sink.borrow_mut().push(action.to_string()))
            .on_draw_end(move |node| nodes.borrow_mut().push(format!("node {}", node.0)))
            .on_draw_cancel(move |node| cancelled.borrow_mut().push(format!("cancel {}", node.0)));

        notifier.state_change(EditAction::Transform);
        notifier.draw_end(NodeId(7));
        notifier.draw_start(NodeId(8));
        notifier.draw_cancel(NodeId(9));

        assert_eq!(*log.borrow(), vec!["Transform", "node 7", "cancel 9"]);
    }
}
