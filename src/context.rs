//! Ambient actor context
//!
//! Changes made outside a direct user action (background jobs, imports,
//! maintenance scripts) are attributed through a per-thread "current actor"
//! slot. Each thread owns its own slot, so concurrent work never sees another
//! thread's actor. Prefer [`run_as`] over manual set/clear: the slot is
//! restored when the body finishes, returns an error, or panics.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::models::{ActorRef, RequestId};

#[derive(Debug, Default)]
struct Slot {
    actor: Option<ActorRef>,
    request: Option<RequestId>,
}

thread_local! {
    static CURRENT: RefCell<Slot> = RefCell::new(Slot::default());
}

/// Set the current thread's actor
pub fn set_current_actor(actor: ActorRef) {
    CURRENT.with(|slot| slot.borrow_mut().actor = Some(actor));
}

/// Clear the current thread's actor
pub fn clear_current_actor() {
    CURRENT.with(|slot| slot.borrow_mut().actor = None);
}

/// The current thread's actor, if any
pub fn current_actor() -> Option<ActorRef> {
    CURRENT.with(|slot| slot.borrow().actor.clone())
}

/// The current thread's request id, if any
pub fn current_request() -> Option<RequestId> {
    CURRENT.with(|slot| slot.borrow().request)
}

/// Restores the previous actor when dropped
///
/// Not `Send`: the guard must be dropped on the thread that created it.
#[must_use = "the actor is cleared as soon as the guard is dropped"]
pub struct ActorGuard {
    previous: Option<ActorRef>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for ActorGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The slot may already be gone during thread teardown
        let _ = CURRENT.try_with(|slot| slot.borrow_mut().actor = previous);
    }
}

/// Install `actor` until the returned guard is dropped
pub fn enter(actor: ActorRef) -> ActorGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().actor.replace(actor));
    ActorGuard {
        previous,
        _thread_bound: PhantomData,
    }
}

/// Run `body` with `actor` as the current actor
pub fn run_as<T>(actor: ActorRef, body: impl FnOnce() -> T) -> T {
    let _guard = enter(actor);
    body()
}

/// Restores the previous request id when dropped
#[must_use = "the request id is cleared as soon as the guard is dropped"]
pub struct RequestGuard {
    previous: Option<RequestId>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = CURRENT.try_with(|slot| slot.borrow_mut().request = previous);
    }
}

/// Tag every record written until the guard drops with `request`
pub fn enter_request(request: RequestId) -> RequestGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().request.replace(request));
    RequestGuard {
        previous,
        _thread_bound: PhantomData,
    }
}

/// Run `body` with all records correlated under `request`
pub fn with_request<T>(request: RequestId, body: impl FnOnce() -> T) -> T {
    let _guard = enter_request(request);
    body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityRef;

    #[test]
    fn test_set_and_clear() {
        set_current_actor(ActorRef::named("importer"));
        assert_eq!(current_actor(), Some(ActorRef::named("importer")));
        clear_current_actor();
        assert_eq!(current_actor(), None);
    }

    #[test]
    fn test_run_as_scopes_actor() {
        let seen = run_as(ActorRef::named("job"), current_actor);
        assert_eq!(seen, Some(ActorRef::named("job")));
        assert_eq!(current_actor(), None);
    }

    #[test]
    fn test_run_as_nests() {
        let user = ActorRef::entity(EntityRef::new("User", 1));
        run_as(user.clone(), || {
            run_as(ActorRef::named("inner"), || {
                assert_eq!(current_actor(), Some(ActorRef::named("inner")));
            });
            assert_eq!(current_actor(), Some(user.clone()));
        });
        assert_eq!(current_actor(), None);
    }

    #[test]
    fn test_run_as_clears_on_error() {
        let result: Result<(), &str> = run_as(ActorRef::named("job"), || Err("boom"));
        assert!(result.is_err());
        assert_eq!(current_actor(), None);
    }

    #[test]
    fn test_run_as_clears_on_panic() {
        let outcome = std::panic::catch_unwind(|| {
            run_as(ActorRef::named("job"), || panic!("boom"));
        });
        assert!(outcome.is_err());
        assert_eq!(current_actor(), None);
    }

    #[test]
    fn test_actor_is_thread_local() {
        run_as(ActorRef::named("main"), || {
            let other = std::thread::spawn(current_actor).join().unwrap();
            assert_eq!(other, None);
        });
    }

    #[test]
    fn test_with_request() {
        let request = RequestId::new();
        let seen = with_request(request, current_request);
        assert_eq!(seen, Some(request));
        assert_eq!(current_request(), None);
    }
}
