//! Compositor readiness status.

use tokio::sync::watch;

/// Tri-state readiness consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositorStatus {
    /// Waiting on camera permission or model construction.
    Initializing,
    /// Frames are flowing.
    Ready,
    /// Terminal for the session; carries a human-readable reason.
    Error(String),
}

impl CompositorStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Self::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Broadcast cell for the status. Once `Error`, it never changes again.
#[derive(Debug)]
pub struct StatusCell {
    tx: watch::Sender<CompositorStatus>,
}

impl StatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CompositorStatus::Initializing);
        Self { tx }
    }

    pub fn get(&self) -> CompositorStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CompositorStatus> {
        self.tx.subscribe()
    }

    /// Move to `next` unless already in the terminal error state.
    /// Returns whether the status changed.
    pub fn set(&self, next: CompositorStatus) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_error() || *current == next {
                return false;
            }
            tracing::debug!(from = ?current, to = ?next, "Compositor status change");
            *current = next;
            true
        })
    }

    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.set(CompositorStatus::Error(reason.into()))
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_initializing() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), CompositorStatus::Initializing);
    }

    #[test]
    fn error_is_terminal() {
        let cell = StatusCell::new();
        assert!(cell.fail("camera denied"));
        assert!(!cell.set(CompositorStatus::Ready));
        assert!(!cell.fail("again"));
        assert_eq!(cell.get().error_reason(), Some("camera denied"));
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let cell = StatusCell::new();
        let mut rx = cell.subscribe();
        cell.set(CompositorStatus::Ready);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_ready());
    }
}
