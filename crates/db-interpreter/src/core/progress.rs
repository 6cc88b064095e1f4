//! Progress sinks.

use tracing::{debug, info};

use super::traits::{FeedbackInfo, OperationState, ProgressSink};

/// Logs begin/end feedback through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_feedback(&self, info: &FeedbackInfo) {
        match info.state {
            OperationState::Begin => debug!("Begin {} {}", info.kind, info.name),
            OperationState::End => info!("Finished {} {}", info.kind, info.name),
        }
    }
}

/// Adapts a closure into a progress sink.
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: Fn(&FeedbackInfo) + Send + Sync,
{
    fn on_feedback(&self, info: &FeedbackInfo) {
        (self.0)(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::DatabaseObjectKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fn_progress_invokes_closure() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let sink = FnProgress(move |_: &FeedbackInfo| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        sink.on_feedback(&FeedbackInfo::begin(DatabaseObjectKind::Table, "a"));
        sink.on_feedback(&FeedbackInfo::end(DatabaseObjectKind::Table, "a"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
