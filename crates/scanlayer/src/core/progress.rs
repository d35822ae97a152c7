//! Progress reporting and cooperative cancellation for recognition runs.
//!
//! The pipeline publishes [`ProgressEvent`]s to a [`ProgressSink`]; it never
//! knows whether the sink is a closure, a channel or a log line. Cancellation is
//! coarse-grained: a [`CancellationToken`] is checked before each page is
//! rasterized.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phase of a recognition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    DetectingLanguage,
    AcquiringWorker,
    ProcessingPages,
    Finalizing,
    Complete,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::Failed)
    }

    /// Whether the run may move from `self` to `next`.
    ///
    /// `Failed` is reachable from every non-idle, non-terminal phase.
    /// Language detection may be skipped.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (Idle, DetectingLanguage) | (Idle, AcquiringWorker) => true,
            (DetectingLanguage, AcquiringWorker) => true,
            (AcquiringWorker, ProcessingPages) => true,
            (ProcessingPages, Finalizing) => true,
            (Finalizing, Complete) => true,
            (Idle, Failed) => false,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0-100
    pub percent: u8,
    pub message: String,
    pub phase: RunPhase,
}

impl ProgressEvent {
    pub fn new(percent: u8, message: impl Into<String>, phase: RunPhase) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
            phase,
        }
    }

    /// Event for page `index` (1-based position in the run) of `total`.
    pub fn page(index: usize, total: usize, page_number: u32) -> Self {
        let percent = if total == 0 { 100 } else { (index * 100 / total).min(100) as u8 };
        let mut event = Self::new(
            percent,
            format!("processing page {} of {}", index, total),
            RunPhase::ProcessingPages,
        );
        if index != page_number as usize {
            event.message.push_str(&format!(" (document page {})", page_number));
        }
        event
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

impl ProgressSink for tokio::sync::mpsc::UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.send(event);
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Sink that forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        tracing::info!(phase = ?event.phase, percent = event.percent, "{}", event.message);
    }
}

/// Cloneable cancellation flag shared between a caller and a running pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_page_event_percent() {
        let event = ProgressEvent::page(1, 3, 1);
        assert_eq!(event.percent, 33);
        assert_eq!(event.message, "processing page 1 of 3");

        let last = ProgressEvent::page(3, 3, 3);
        assert_eq!(last.percent, 100);
    }

    #[test]
    fn test_page_event_mentions_document_page_for_ranges() {
        let event = ProgressEvent::page(1, 2, 5);
        assert_eq!(event.message, "processing page 1 of 2 (document page 5)");
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(ProgressEvent::new(250, "x", RunPhase::Complete).percent, 100);
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| seen.lock().push(event.percent);
        sink.report(ProgressEvent::new(10, "a", RunPhase::DetectingLanguage));
        sink.report(ProgressEvent::new(20, "b", RunPhase::AcquiringWorker));
        assert_eq!(*seen.lock(), vec![10, 20]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.report(ProgressEvent::new(50, "half", RunPhase::ProcessingPages));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.message, "half");

        drop(rx);
        tx.report(ProgressEvent::new(60, "nobody listening", RunPhase::ProcessingPages));
    }

    #[test]
    fn test_phase_transitions() {
        use RunPhase::*;
        assert!(Idle.can_transition_to(DetectingLanguage));
        assert!(Idle.can_transition_to(AcquiringWorker));
        assert!(ProcessingPages.can_transition_to(Finalizing));
        assert!(ProcessingPages.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Failed));
        assert!(!Complete.can_transition_to(Failed));
        assert!(!ProcessingPages.can_transition_to(DetectingLanguage));
        assert!(Complete.is_terminal());
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
