//! Custom widget registration.
//!
//! Widgets are values: a name → function table populated at construction
//! (and extended by the embedder), invocable from key bindings through
//! `Target::Widget(name)`.

use core_buffer::EditBuffer;
use core_history::History;
use std::collections::HashMap;
use std::sync::Arc;

/// State a widget may inspect and edit.
pub struct WidgetCtx<'a> {
    pub buffer: &'a mut EditBuffer,
    pub history: &'a History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetOutcome {
    /// Keep editing.
    Continue,
    /// The widget failed; ring the bell.
    Beep,
    /// Treat the line as accepted.
    Accept,
}

pub type WidgetFn = Arc<dyn Fn(&mut WidgetCtx<'_>) -> WidgetOutcome + Send + Sync>;

#[derive(Default, Clone)]
pub struct WidgetRegistry {
    widgets: HashMap<String, WidgetFn>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut WidgetCtx<'_>) -> WidgetOutcome + Send + Sync + 'static,
    {
        self.widgets.insert(name.into(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<WidgetFn> {
        self.widgets.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.widgets.contains_key(name)
    }
}
