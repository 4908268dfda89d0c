use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::fs::lister::DirEntry;

/// A user intent relayed by whatever renders the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Flip a directory's expansion.
    Toggle(String),
    /// Expand or collapse a directory.
    SetOpen(String, bool),
    /// Re-fetch a directory that is already loaded.
    Refresh(String),
    /// Flip a node's explicit selection.
    ToggleSelect(String),
    /// Set a node's explicit selection.
    SetSelect(String, bool),
}

/// Result of a background listing, delivered back to the session.
#[derive(Debug)]
pub struct ListingComplete {
    pub path: String,
    pub result: Result<Vec<DirEntry>>,
}

/// Everything the session queue processes.
#[derive(Debug)]
pub enum Event {
    Intent(Intent),
    ListingComplete(ListingComplete),
}

/// The session's single serialized event queue.
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { rx, tx }
    }

    /// Get a sender clone for fetch tasks and intent producers.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (waits until one is available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx.recv().await.ok_or(AppError::ChannelClosed)
    }

    /// Take an already queued event without waiting.
    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let mut queue = EventQueue::new();
        let tx = queue.sender();
        tx.send(Event::Intent(Intent::Toggle("/a".into()))).unwrap();
        tx.send(Event::Intent(Intent::ToggleSelect("/b".into())))
            .unwrap();

        match queue.next().await.unwrap() {
            Event::Intent(Intent::Toggle(p)) => assert_eq!(p, "/a"),
            other => panic!("unexpected event: {:?}", other),
        }
        match queue.next().await.unwrap() {
            Event::Intent(Intent::ToggleSelect(p)) => assert_eq!(p, "/b"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn try_next_on_empty_queue() {
        let mut queue = EventQueue::new();
        assert!(queue.try_next().is_none());
    }
}
