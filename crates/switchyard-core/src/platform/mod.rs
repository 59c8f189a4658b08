//! Platform seams.
//!
//! The reactor never talks to an operating system directly. It polls an
//! [`EventSource`], asks it for default handling, and manipulates targets
//! through [`TargetControl`]. Hotkey claims go through
//! [`HotkeyBackend`](crate::HotkeyBackend).
//!
//! [`headless`] implements every seam in memory and is what the test suites
//! drive.

pub mod headless;

use std::time::Duration;

use crate::error::Result;
use crate::event::{DispatchFilter, LResult, Message, TargetId};
use crate::target::TargetAttributes;

/// The thread's event queue.
pub trait EventSource {
    /// Remove and return every queued message matching `filter`, in queue
    /// order.
    ///
    /// Messages posted after this call returns are not part of the batch.
    fn drain(&mut self, filter: &DispatchFilter) -> Vec<Message>;

    /// Append a message to the queue.
    fn post(&mut self, message: Message);

    /// The environment's own handling for a message nobody handled.
    fn default_handling(&mut self, message: &Message) -> LResult;
}

/// Operations on realized targets.
pub trait TargetControl {
    /// Show or hide a target.
    fn set_visible(&self, target: TargetId, visible: bool);

    /// Whether a target is currently shown.
    fn is_visible(&self, target: TargetId) -> bool;

    /// Start a repeating timer; restarting an existing timer resets it.
    fn set_timer(&self, target: TargetId, timer: u32, interval: Duration);

    /// Stop a timer. Unknown timers are ignored.
    fn kill_timer(&self, target: TargetId, timer: u32);

    /// Ask the environment to destroy a target. The environment answers
    /// with a [`DESTROY`](crate::codes::DESTROY) message.
    fn destroy(&self, target: TargetId);
}

/// Creation of new targets.
///
/// Creation is two-phase so that handlers can be bound to the identity
/// before the environment starts delivering events for it.
pub trait TargetFactory: TargetControl {
    /// Reserve a fresh target identity.
    fn reserve(&self) -> Result<TargetId>;

    /// Bring a reserved target to life.
    fn realize(&self, target: TargetId, attributes: &TargetAttributes) -> Result<()>;
}
