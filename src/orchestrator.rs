// src/orchestrator.rs

use std::{sync::Arc, thread, time::Duration};

use crossbeam::channel;

use crate::{errors::TweakError, tweaks::TweakDomain};

/// Outcome of a processed task.
#[derive(Debug)]
pub struct TweakResult {
    pub id: String,
    pub action: TweakAction,
    pub success: bool,
    pub error: Option<TweakError>,
    /// Some(true) if applied, Some(false) if not, None if unknown.
    pub applied: Option<bool>,
}

/// A tweak action to run off the calling thread.
#[derive(Clone)]
pub struct TweakTask {
    pub id: String,
    pub domain: Arc<dyn TweakDomain>,
    pub action: TweakAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweakAction {
    Apply,
    Revert,
    ReadState,
}

/// Runs each submitted task on its own thread and collects results on a channel.
pub struct TaskOrchestrator {
    result_receiver: channel::Receiver<TweakResult>,
    result_sender: channel::Sender<TweakResult>,
}

impl Default for TaskOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskOrchestrator {
    pub fn new() -> Self {
        let (result_sender, result_receiver) = channel::unbounded::<TweakResult>();
        Self {
            result_sender,
            result_receiver,
        }
    }

    pub fn submit(&self, task: TweakTask) {
        let result_sender = self.result_sender.clone();
        thread::spawn(move || {
            let outcome = match task.action {
                TweakAction::Apply => task.domain.apply(&task.id).map(|_| true),
                TweakAction::Revert => task.domain.revert(&task.id).map(|_| false),
                TweakAction::ReadState => task.domain.is_applied(&task.id),
            };
            let result = match outcome {
                Ok(applied) => TweakResult {
                    id: task.id,
                    action: task.action,
                    success: true,
                    error: None,
                    applied: Some(applied),
                },
                Err(e) => TweakResult {
                    id: task.id,
                    action: task.action,
                    success: false,
                    error: Some(e),
                    applied: None,
                },
            };
            if let Err(e) = result_sender.send(result) {
                tracing::error!("Failed to send result: {:?}", e.into_inner().id);
            }
        });
    }

    /// Blocks until the next result arrives or `timeout` elapses.
    pub fn recv_result(&self, timeout: Duration) -> Option<TweakResult> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    /// Attempts to receive a task result without blocking.
    pub fn try_recv_result(&self) -> Option<TweakResult> {
        self.result_receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backup::BackupLedger,
        testing::{FakeServiceControl, FixedElevation, MemoryRegistry},
        tweaks::{RegistryApplier, TweakEngine},
    };

    fn engine() -> Arc<dyn TweakDomain> {
        let registry = Arc::new(MemoryRegistry::new());
        let ledger = Arc::new(BackupLedger::new(
            registry.clone(),
            Arc::new(FakeServiceControl::new()),
            std::env::temp_dir(),
        ));
        let applier = Arc::new(RegistryApplier::new(
            registry,
            ledger,
            Arc::new(FixedElevation(false)),
        ));
        Arc::new(TweakEngine::new(applier))
    }

    fn run(
        orchestrator: &TaskOrchestrator,
        domain: &Arc<dyn TweakDomain>,
        id: &str,
        action: TweakAction,
    ) -> TweakResult {
        orchestrator.submit(TweakTask {
            id: id.to_string(),
            domain: domain.clone(),
            action,
        });
        orchestrator
            .recv_result(Duration::from_secs(5))
            .expect("task result")
    }

    #[test]
    fn test_apply_read_revert_cycle() {
        let orchestrator = TaskOrchestrator::new();
        let domain = engine();

        let read = run(&orchestrator, &domain, "game_mode", TweakAction::ReadState);
        assert!(read.success);
        assert_eq!(read.applied, Some(false));

        let applied = run(&orchestrator, &domain, "game_mode", TweakAction::Apply);
        assert!(applied.success);
        assert_eq!(applied.applied, Some(true));

        let read = run(&orchestrator, &domain, "game_mode", TweakAction::ReadState);
        assert_eq!(read.applied, Some(true));

        let reverted = run(&orchestrator, &domain, "game_mode", TweakAction::Revert);
        assert_eq!(reverted.action, TweakAction::Revert);
        assert_eq!(reverted.applied, Some(false));
    }

    #[test]
    fn test_failures_carry_the_error() {
        let orchestrator = TaskOrchestrator::new();
        let domain = engine();

        // Machine-wide target without elevation.
        let result = run(&orchestrator, &domain, "disable_game_dvr", TweakAction::Apply);
        assert!(!result.success);
        assert!(result.error.as_ref().is_some_and(TweakError::is_permission));
        assert_eq!(result.applied, None);
        assert!(orchestrator.try_recv_result().is_none());
    }
}
