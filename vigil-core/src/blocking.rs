//! Synchronous waiting on provider operations.
//!
//! The blocking call paths of [`AuditDataProvider`](crate::AuditDataProvider)
//! are implemented by waiting on the exact same future the asynchronous call
//! paths use, so both issue structurally identical requests.

use crate::{AuditError, AuditResult};
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// Block the current thread until the given operation completes.
///
/// Works from three contexts:
/// - inside a multi-threaded tokio runtime, via `block_in_place`
/// - inside a current-thread runtime, by driving the future on a scoped
///   thread with its own transient runtime
/// - outside any runtime, on a transient current-thread runtime
pub fn wait<T, F>(future: F) -> AuditResult<T>
where
    F: Future<Output = AuditResult<T>> + Send,
    T: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(future))
        }
        Ok(_) => std::thread::scope(|scope| {
            let worker = scope.spawn(move || transient_runtime()?.block_on(future));
            match worker.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }),
        Err(_) => transient_runtime()?.block_on(future),
    }
}

fn transient_runtime() -> AuditResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AuditError::Configuration(format!("cannot start blocking runtime: {e}")))
}
