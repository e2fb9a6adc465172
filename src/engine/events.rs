//! Progress and lifecycle events emitted by the engine.
//!
//! Observers (CLI progress output, a UI, analytics) subscribe by handing
//! the engine an unbounded channel sender. Event delivery is best-effort:
//! send errors are ignored so a departed observer never stalls execution.

use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedSender;

use crate::task::{StepResult, TaskId};

/// What happened to a file as a side effect of step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Created,
    Modified,
    Deleted,
}

/// Engine-to-observer notifications.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    StepStarted {
        task_id: TaskId,
        step_id: String,
        order: u32,
        title: String,
    },
    StepCompleted {
        task_id: TaskId,
        step_id: String,
        result: StepResult,
    },
    StepErrored {
        task_id: TaskId,
        step_id: String,
        message: String,
    },
    /// `completed` out of `total` steps done.
    TaskProgress {
        task_id: TaskId,
        completed: usize,
        total: usize,
    },
    TaskCompleted {
        task_id: TaskId,
    },
    TaskError {
        task_id: TaskId,
        message: String,
    },
    FileChanged {
        path: PathBuf,
        change: FileChange,
    },
}

/// Cloneable handle that emits events if an observer is attached.
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<EngineEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<EngineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event (headless execution).
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Send an event, ignoring errors (the observer may have closed).
    pub fn emit(&self, event: EngineEvent) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sink_accepts_events() {
        let sink = EventSink::disabled();
        sink.emit(EngineEvent::TaskCompleted {
            task_id: "t1".into(),
        });
    }

    #[tokio::test]
    async fn sink_delivers_to_channel() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        sink.emit(EngineEvent::TaskProgress {
            task_id: "t1".into(),
            completed: 1,
            total: 3,
        });

        match rx.recv().await {
            Some(EngineEvent::TaskProgress { completed, total, .. }) => {
                assert_eq!(completed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let sink = EventSink::new(tx);
        sink.emit(EngineEvent::TaskCompleted {
            task_id: "t1".into(),
        });
    }
}
