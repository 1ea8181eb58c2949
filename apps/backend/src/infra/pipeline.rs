//! Wiring of the stage pipeline: the queue worker feeding the dispatcher.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dispatch::Dispatcher;
use crate::error::AppError;
use crate::queue::{Worker, WorkerConfig};
use crate::state::app_state::AppState;

/// Register every stage, then spawn the worker and the dispatcher. Both stop
/// when `cancel` fires.
pub fn spawn_pipeline(
    state: &AppState,
    config: WorkerConfig,
    cancel: CancellationToken,
) -> Result<Vec<JoinHandle<()>>, AppError> {
    let mut dispatcher = Dispatcher::new();
    state
        .flow
        .register_stages(&mut dispatcher)
        .map_err(|e| AppError::config(e.to_string()))?;
    dispatcher
        .ensure_complete()
        .map_err(|e| AppError::config(e.to_string()))?;
    let dispatcher = Arc::new(dispatcher);

    let (worker, rx) = Worker::new(state.tasks.clone(), config);
    info!("Starting stage pipeline");

    let worker_cancel = cancel.clone();
    let worker = tokio::spawn(async move { worker.run(worker_cancel).await });
    let dispatch = tokio::spawn(async move { dispatcher.run(rx, cancel).await });
    Ok(vec![worker, dispatch])
}
