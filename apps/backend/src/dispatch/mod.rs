//! Stage dispatcher.
//!
//! Routes delivered tasks to the handler registered for their stage. Each
//! stage has exactly one handler; registration is checked at startup.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use crate::error::AppError;
use crate::queue::Task;
use crate::trace_ctx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    StartGame,
    StartRound,
    StartDeal,
    NextMove,
    FinishDeal,
    FinishRound,
    FinishGame,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::StartGame,
        Stage::StartRound,
        Stage::StartDeal,
        Stage::NextMove,
        Stage::FinishDeal,
        Stage::FinishRound,
        Stage::FinishGame,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::StartGame => "START_GAME",
            Stage::StartRound => "START_ROUND",
            Stage::StartDeal => "START_DEAL",
            Stage::NextMove => "NEXT_MOVE",
            Stage::FinishDeal => "FINISH_DEAL",
            Stage::FinishRound => "FINISH_ROUND",
            Stage::FinishGame => "FINISH_GAME",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownStage(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("stage {0} already has a handler")]
    AlreadyRegistered(Stage),
    #[error("no handler registered for stage {0}")]
    Missing(Stage),
    #[error("unknown stage {0:?}")]
    UnknownStage(String),
    #[error(transparent)]
    Handler(#[from] AppError),
}

#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn handle(&self, task: Task) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<Stage, Arc<dyn StageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        stage: Stage,
        handler: Arc<dyn StageHandler>,
    ) -> Result<(), DispatchError> {
        if self.handlers.contains_key(&stage) {
            return Err(DispatchError::AlreadyRegistered(stage));
        }
        self.handlers.insert(stage, handler);
        Ok(())
    }

    /// Fails on the first stage without a handler.
    pub fn ensure_complete(&self) -> Result<(), DispatchError> {
        match Stage::ALL
            .into_iter()
            .find(|stage| !self.handlers.contains_key(stage))
        {
            Some(stage) => Err(DispatchError::Missing(stage)),
            None => Ok(()),
        }
    }

    pub async fn dispatch(&self, task: Task) -> Result<(), DispatchError> {
        let stage: Stage = task.callback.parse()?;
        let handler = self
            .handlers
            .get(&stage)
            .cloned()
            .ok_or(DispatchError::Missing(stage))?;

        let span = info_span!(
            "task",
            stage = stage.as_str(),
            topic = %task.topic,
            task_id = %task.id,
        );
        let trace_id = task.id.clone();
        trace_ctx::with_trace_id(trace_id, handler.handle(task).instrument(span))
            .await
            .map_err(DispatchError::from)
    }

    /// Consume the delivery channel one task at a time until it closes or
    /// `cancel` fires. Failed tasks are logged and dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<Task>, cancel: CancellationToken) {
        info!(stages = self.handlers.len(), "Dispatcher started");
        loop {
            let task = tokio::select! {
                _ = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(task) => task,
                    None => break,
                },
            };

            let task_id = task.id.clone();
            let callback = task.callback.clone();
            let topic = task.topic.clone();
            if let Err(err) = self.dispatch(task).await {
                match &err {
                    DispatchError::Handler(app) => error!(
                        task_id = %task_id,
                        stage = %callback,
                        topic = %topic,
                        code = app.code().as_str(),
                        error = %app,
                        "Stage handler failed"
                    ),
                    other => error!(
                        task_id = %task_id,
                        stage = %callback,
                        error = %other,
                        "Task dropped"
                    ),
                }
            }
        }
        info!("Dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::errors::ErrorCode;

    struct Counting(AtomicUsize);

    #[async_trait]
    impl StageHandler for Counting {
        async fn handle(&self, task: Task) -> Result<(), AppError> {
            assert_eq!(trace_ctx::trace_id(), task.id);
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl StageHandler for Failing {
        async fn handle(&self, _task: Task) -> Result<(), AppError> {
            Err(AppError::conflict(ErrorCode::RoundClosed, "round 1 is closed"))
        }
    }

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!(matches!(
            "SHUFFLE".parse::<Stage>(),
            Err(DispatchError::UnknownStage(_))
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(Stage::StartGame, Arc::new(Failing))
            .unwrap();
        let err = dispatcher
            .register(Stage::StartGame, Arc::new(Failing))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::AlreadyRegistered(Stage::StartGame)
        ));
    }

    #[test]
    fn incomplete_registration_is_reported() {
        let mut dispatcher = Dispatcher::new();
        for stage in Stage::ALL.into_iter().skip(1) {
            dispatcher.register(stage, Arc::new(Failing)).unwrap();
        }
        assert!(matches!(
            dispatcher.ensure_complete(),
            Err(DispatchError::Missing(Stage::StartGame))
        ));
    }

    #[tokio::test]
    async fn routes_by_callback_under_task_trace_id() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(Stage::NextMove, counter.clone())
            .unwrap();

        dispatcher
            .dispatch(Task::new("NEXT_MOVE", "1"))
            .await
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        let err = dispatcher
            .dispatch(Task::new("START_DEAL", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Missing(Stage::StartDeal)));
    }

    #[tokio::test]
    async fn run_survives_failing_handlers() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(Stage::FinishRound, Arc::new(Failing))
            .unwrap();
        dispatcher.register(Stage::FinishGame, counter.clone()).unwrap();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Task::new("FINISH_ROUND", "1")).await.unwrap();
        tx.send(Task::new("BOGUS", "1")).await.unwrap();
        tx.send(Task::new("FINISH_GAME", "1")).await.unwrap();
        drop(tx);

        dispatcher.run(rx, CancellationToken::new()).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
