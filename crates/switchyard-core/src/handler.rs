//! Lifetime-safe callback handles.
//!
//! A [`HandlerOwner`] is the single writer of a callback slot and its
//! liveness flag. It hands out any number of [`Handler`] handles which share
//! the slot but never keep the callback's target alive on their own: the
//! routing table checks [`Handler::is_alive`] before every call, so dropping
//! the owner is enough to stop a callback from firing, regardless of who
//! still holds a handle.
//!
//! # Example
//!
//! ```
//! use switchyard_core::{HandlerOwner, Message, codes};
//!
//! let owner = HandlerOwner::new(|_msg: &Message| 42);
//! let handle = owner.handle();
//! assert_eq!(handle.invoke(&Message::new(codes::USER)), 42);
//!
//! drop(owner);
//! assert!(!handle.is_alive());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::{ReactorError, Result};
use crate::event::{LResult, Message};

/// The callable stored behind a handler.
pub type HandlerFn = dyn Fn(&Message) -> LResult;

/// Storage shared between one owner and all handles it issued.
struct Slot {
    alive: Cell<bool>,
    callback: RefCell<Option<Rc<HandlerFn>>>,
}

impl Slot {
    fn empty() -> Rc<Self> {
        Rc::new(Self {
            alive: Cell::new(false),
            callback: RefCell::new(None),
        })
    }
}

/// A copyable, non-owning reference to a callback and its liveness flag.
///
/// Handles are created by [`HandlerOwner::handle`]. A default-constructed
/// handle was never bound and is never alive.
#[derive(Clone, Default)]
pub struct Handler {
    slot: Option<Rc<Slot>>,
}

impl Handler {
    /// Whether invoking this handle is meaningful.
    pub fn is_alive(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| slot.alive.get())
    }

    /// Invoke the callback.
    ///
    /// Checking liveness first is the caller's job; an unbound handle
    /// returns 0 without calling anything.
    pub fn invoke(&self, message: &Message) -> LResult {
        let Some(slot) = self.slot.as_ref() else {
            return 0;
        };
        // Clone out of the cell so the callback may rebind its own owner.
        let callback = slot.callback.borrow().clone();
        match callback {
            Some(callback) => callback(message),
            None => 0,
        }
    }

    /// Whether two handles were issued for the same owner storage.
    pub fn same_as(&self, other: &Handler) -> bool {
        match (&self.slot, &other.slot) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Handles share single-thread storage.
static_assertions::assert_not_impl_any!(Handler: Send, Sync);
static_assertions::assert_not_impl_any!(HandlerOwner: Send, Sync);

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("bound", &self.slot.is_some())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Exclusive owner of a callback and its liveness flag.
///
/// Dropping the owner marks every handle it issued as dead. Assigning over
/// an owner drops the previous one, so the overwritten callback stops firing
/// while the assigned-in storage keeps serving the handles issued for it.
pub struct HandlerOwner {
    slot: Rc<Slot>,
}

impl HandlerOwner {
    /// Create a live owner around a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Message) -> LResult + 'static,
    {
        let owner = Self::empty();
        owner.set(callback);
        owner
    }

    /// Create an owner with no callback; its handles stay dead until
    /// [`set`](Self::set) is called.
    pub fn empty() -> Self {
        Self { slot: Slot::empty() }
    }

    /// Issue a handle observing this owner's storage.
    pub fn handle(&self) -> Handler {
        Handler {
            slot: Some(Rc::clone(&self.slot)),
        }
    }

    /// Install a callback and mark the owner alive.
    ///
    /// The storage is reused, so handles issued earlier observe the new
    /// callback immediately.
    pub fn set<F>(&self, callback: F)
    where
        F: Fn(&Message) -> LResult + 'static,
    {
        *self.slot.callback.borrow_mut() = Some(Rc::new(callback));
        self.slot.alive.set(true);
    }

    /// Change liveness without touching the callback.
    ///
    /// # Errors
    ///
    /// Marking an owner alive that never received a callback is an
    /// [`InvalidState`](ReactorError::InvalidState) error.
    pub fn set_alive(&self, alive: bool) -> Result<()> {
        if alive && !self.has_callback() {
            return Err(ReactorError::InvalidState(
                "cannot mark an empty handler owner alive",
            ));
        }
        self.slot.alive.set(alive);
        Ok(())
    }

    /// Whether the owned callback is meant to be invoked.
    pub fn is_alive(&self) -> bool {
        self.slot.alive.get()
    }

    /// Whether a callback was ever installed.
    pub fn has_callback(&self) -> bool {
        self.slot.callback.borrow().is_some()
    }

    /// Move the storage out, leaving an empty owner behind.
    ///
    /// Handles issued before the call follow the returned owner.
    pub fn take(&mut self) -> HandlerOwner {
        HandlerOwner {
            slot: std::mem::replace(&mut self.slot, Slot::empty()),
        }
    }
}

impl Default for HandlerOwner {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for HandlerOwner {
    fn drop(&mut self) {
        self.slot.alive.set(false);
    }
}

impl fmt::Debug for HandlerOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOwner")
            .field("alive", &self.is_alive())
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::codes;

    fn msg() -> Message {
        Message::new(codes::USER)
    }

    #[test]
    fn test_default_handle_is_dead() {
        let handle = Handler::default();
        assert!(!handle.is_alive());
        assert_eq!(handle.invoke(&msg()), 0);
    }

    #[test]
    fn test_empty_owner_cannot_be_marked_alive() {
        let owner = HandlerOwner::empty();
        assert!(!owner.is_alive());
        assert!(matches!(
            owner.set_alive(true),
            Err(ReactorError::InvalidState(_))
        ));
        // Marking dead is always allowed.
        assert!(owner.set_alive(false).is_ok());
    }

    #[test]
    fn test_drop_kills_handles() {
        let owner = HandlerOwner::new(|_| 1);
        let handle = owner.handle();
        assert!(handle.is_alive());
        drop(owner);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_set_updates_issued_handles() {
        let owner = HandlerOwner::empty();
        let handle = owner.handle();
        assert!(!handle.is_alive());

        owner.set(|_| 5);
        assert!(handle.is_alive());
        assert_eq!(handle.invoke(&msg()), 5);

        owner.set(|_| 9);
        assert_eq!(handle.invoke(&msg()), 9);
    }

    #[test]
    fn test_set_revives_after_set_alive_false() {
        let owner = HandlerOwner::new(|_| 1);
        let handle = owner.handle();
        owner.set_alive(false).unwrap();
        assert!(!handle.is_alive());
        owner.set(|_| 2);
        assert!(handle.is_alive());
    }

    #[test]
    fn test_assignment_kills_overwritten_callback() {
        let mut dest = HandlerOwner::new(|_| 1);
        let old_handle = dest.handle();
        let src = HandlerOwner::new(|_| 2);
        let src_handle = src.handle();

        dest = src;

        assert!(!old_handle.is_alive());
        assert!(src_handle.is_alive());
        assert!(dest.handle().same_as(&src_handle));
    }

    #[test]
    fn test_take_transfers_storage() {
        let mut owner = HandlerOwner::new(|_| 3);
        let handle = owner.handle();
        let taken = owner.take();

        assert!(!owner.is_alive());
        assert!(handle.is_alive());
        assert!(taken.handle().same_as(&handle));
        drop(taken);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_callback_may_rebind_its_own_owner() {
        let owner = Rc::new(HandlerOwner::empty());
        let weak = Rc::downgrade(&owner);
        owner.set(move |_| {
            if let Some(owner) = weak.upgrade() {
                owner.set(|_| 20);
            }
            10
        });
        let handle = owner.handle();
        assert_eq!(handle.invoke(&msg()), 10);
        assert_eq!(handle.invoke(&msg()), 20);
    }
}
