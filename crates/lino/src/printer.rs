//! External printing above the prompt.
//!
//! A background task (status updater, log forwarder) clones an
//! [`ExternalPrinter`] and queues messages; the read loop drains the queue
//! between events, prints above the frame through the single output path,
//! and repaints. The printer never touches buffer or frame state itself.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct ExternalPrinter {
    queue: Arc<Mutex<VecDeque<String>>>,
}

impl ExternalPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for display above the prompt.
    pub fn print(&self, message: impl Into<String>) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(message.into());
        }
    }

    pub(crate) fn drain(&self) -> Vec<String> {
        match self.queue.lock() {
            Ok(mut q) => q.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().map(|q| q.is_empty()).unwrap_or(true)
    }
}
