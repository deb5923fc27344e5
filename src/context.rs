// Correlation context.
//
// A correlation id is an opaque string attached to every structured log
// record produced while handling one logical unit of work. The id lives in
// a tokio task-local slot when one is installed (see
// `with_correlation_scope`), falling back to a thread-local slot for plain
// threads. Concurrent logical tasks never observe each other's id.

use std::cell::RefCell;
use std::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static TASK_CORRELATION_ID: RefCell<Option<String>>;
}

thread_local! {
    static THREAD_CORRELATION_ID: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Mint a fresh correlation id.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Read the correlation id of the current logical context, if any.
pub fn get_correlation_id() -> Option<String> {
    if let Ok(id) = TASK_CORRELATION_ID.try_with(|slot| slot.borrow().clone()) {
        return id;
    }
    THREAD_CORRELATION_ID.with(|slot| slot.borrow().clone())
}

/// Set (or clear, with `None`) the correlation id of the current logical
/// context.
///
/// Inside a scope installed by [`with_correlation_scope`] this updates the
/// task-local slot; otherwise it updates the calling thread's slot. Async
/// code should prefer the scoped form: a bare thread-local write on a
/// runtime worker thread would leak across unrelated tasks scheduled there.
pub fn set_correlation_id(id: Option<String>) {
    let updated = TASK_CORRELATION_ID
        .try_with(|slot| *slot.borrow_mut() = id.clone())
        .is_ok();
    if !updated {
        THREAD_CORRELATION_ID.with(|slot| *slot.borrow_mut() = id);
    }
}

/// Clear the correlation id of the current logical context.
pub fn clear_correlation_id() {
    set_correlation_id(None);
}

/// Run `future` with `id` installed as its correlation id.
///
/// The id travels with the task across await points and worker threads, and
/// is invisible to any other task.
pub fn with_correlation_scope<F>(id: Option<String>, future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    TASK_CORRELATION_ID.scope(RefCell::new(id), future)
}
