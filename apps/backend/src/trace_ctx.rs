//! Task-local trace id.
//!
//! HTTP requests run under the id minted by `RequestTrace`; dispatched stage
//! tasks run under their task id, so an error logged or rendered anywhere
//! below either entry point can be correlated back to it.

use std::future::Future;

use tokio::task_local;

task_local! {
    static TRACE_ID: String;
}

const UNKNOWN: &str = "unknown";

/// Trace id of the current task, or `"unknown"` outside any scope.
pub fn trace_id() -> String {
    TRACE_ID
        .try_with(Clone::clone)
        .unwrap_or_else(|_| UNKNOWN.to_string())
}

pub async fn with_trace_id<F, R>(trace_id: String, future: F) -> R
where
    F: Future<Output = R>,
{
    TRACE_ID.scope(trace_id, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_outside_scope() {
        assert_eq!(trace_id(), "unknown");
    }

    #[tokio::test]
    async fn inner_scope_shadows_outer() {
        let seen = with_trace_id("task-1".into(), async {
            let inner = with_trace_id("req-2".into(), async { trace_id() }).await;
            (trace_id(), inner)
        })
        .await;

        assert_eq!(seen, ("task-1".to_string(), "req-2".to_string()));
        assert_eq!(trace_id(), "unknown");
    }
}
