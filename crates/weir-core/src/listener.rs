//! System event listeners.
//!
//! Modules register listeners to be told when a collection first comes
//! into existence (for example, to provision downstream storage). A
//! listener runs on whichever thread triggered the creation; its failure
//! is logged and swallowed so ingestion is never held hostage by a
//! side-channel.

use std::sync::Arc;

/// Result of a listener invocation.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Callback interface for collection lifecycle events.
pub trait SystemEventListener: Send + Sync {
    /// Called exactly once per newly created collection, with the project
    /// and the canonical collection name.
    fn on_create_collection(&self, project: &str, collection: &str) -> ListenerResult;
}

/// Fans a creation event out to every listener, isolating failures.
///
/// Errors are logged at ERROR and dropped; remaining listeners still run.
pub fn notify_collection_created(
    listeners: &[Arc<dyn SystemEventListener>],
    project: &str,
    collection: &str,
) {
    for listener in listeners {
        if let Err(error) = listener.on_create_collection(project, collection) {
            tracing::error!(project, collection, error = %error, "system event listener failed");
        }
    }
}
