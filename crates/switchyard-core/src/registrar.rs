//! Process-wide hotkey registration.
//!
//! Global hotkeys are process-wide state: the host environment knows a
//! combination by a numeric identity, and claiming the same combination
//! twice fails. [`HotkeyRegistry`] deduplicates claims so each combination
//! is registered with the platform at most once, and releases every claim
//! exactly once on [`shutdown`](HotkeyRegistry::shutdown).
//!
//! The registry is an explicit object owned by the application and passed
//! to each [`Reactor`](crate::Reactor); it is a cheap cloneable handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ReactorError, Result};
use crate::hotkey::Hotkey;

/// Identity under which a hotkey is registered with the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HotkeyId(pub u32);

impl fmt::Display for HotkeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hotkey#{}", self.0)
    }
}

/// Platform side of hotkey registration.
pub trait HotkeyBackend: Send {
    /// Claim `hotkey` under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::RegistrationConflict`] when the platform
    /// refuses the combination.
    fn claim(&mut self, id: HotkeyId, hotkey: Hotkey) -> Result<()>;

    /// Release a previous claim. Best-effort.
    fn release(&mut self, id: HotkeyId);
}

struct RegistryState {
    backend: Box<dyn HotkeyBackend>,
    registered: HashMap<Hotkey, HotkeyId>,
    shut_down: bool,
}

impl RegistryState {
    fn release_all(&mut self) {
        let mut ids: Vec<HotkeyId> = self.registered.drain().map(|(_, id)| id).collect();
        ids.sort();
        for id in ids {
            self.backend.release(id);
        }
        tracing::debug!(target: "switchyard_core::hotkey", "released all hotkeys");
    }
}

impl Drop for RegistryState {
    fn drop(&mut self) {
        if !self.shut_down {
            self.release_all();
        }
    }
}

/// Deduplicating, process-wide hotkey registry.
#[derive(Clone)]
pub struct HotkeyRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

static_assertions::assert_impl_all!(HotkeyRegistry: Send, Sync);

impl HotkeyRegistry {
    /// Create the registry around a platform backend.
    pub fn init(backend: impl HotkeyBackend + 'static) -> Self {
        tracing::debug!(target: "switchyard_core::hotkey", "hotkey registry initialized");
        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                backend: Box::new(backend),
                registered: HashMap::new(),
                shut_down: false,
            })),
        }
    }

    /// Resolve a hotkey to its identity, registering it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the backend's registration conflict; fails with
    /// [`ReactorError::InvalidState`] after [`shutdown`](Self::shutdown).
    pub fn register(&self, hotkey: Hotkey) -> Result<HotkeyId> {
        let mut state = self.inner.lock();
        if state.shut_down {
            return Err(ReactorError::InvalidState("hotkey registry is shut down"));
        }
        if let Some(&id) = state.registered.get(&hotkey) {
            return Ok(id);
        }

        let id = HotkeyId(state.registered.len() as u32 + 1);
        if let Err(err) = state.backend.claim(id, hotkey) {
            tracing::warn!(target: "switchyard_core::hotkey", %hotkey, %err, "hotkey registration refused");
            return Err(err);
        }
        state.registered.insert(hotkey, id);
        tracing::debug!(target: "switchyard_core::hotkey", %hotkey, %id, "hotkey registered");
        Ok(id)
    }

    /// Look up the identity of an already registered hotkey.
    pub fn lookup(&self, hotkey: Hotkey) -> Option<HotkeyId> {
        self.inner.lock().registered.get(&hotkey).copied()
    }

    /// All registered hotkeys, ordered by identity.
    pub fn registered(&self) -> Vec<(HotkeyId, Hotkey)> {
        let state = self.inner.lock();
        let mut list: Vec<_> = state.registered.iter().map(|(hk, id)| (*id, *hk)).collect();
        list.sort_by_key(|(id, _)| *id);
        list
    }

    /// Release every registered hotkey. Later registrations fail.
    ///
    /// Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        if state.shut_down {
            return;
        }
        state.release_all();
        state.shut_down = true;
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shut_down
    }
}

impl fmt::Debug for HotkeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("HotkeyRegistry")
            .field("registered", &state.registered.len())
            .field("shut_down", &state.shut_down)
            .finish()
    }
}
