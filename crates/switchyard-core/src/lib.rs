//! Core of the Switchyard event reactor.
//!
//! This crate provides the single-threaded machinery that routes polled
//! events to callbacks:
//!
//! - **Handlers**: callback handles that know whether their owner is alive
//! - **Reactor**: the routing table keyed by event code, target and hotkey
//! - **Method binding**: callbacks into components of composite objects that
//!   survive the composite moving to a new address
//! - **Hotkeys**: global hotkey values and a deduplicating registry
//! - **Targets**: configuration and lifetime of addressable targets
//! - **Platform**: the seams to the environment, with an in-memory
//!   implementation
//!
//! # Example
//!
//! ```
//! use switchyard_core::platform::headless::HeadlessPlatform;
//! use switchyard_core::{codes, DispatchFilter, HandlerOwner, HotkeyRegistry, Message, Reactor};
//!
//! let platform = HeadlessPlatform::new();
//! let registry = HotkeyRegistry::init(platform.hotkey_backend());
//! let mut reactor = Reactor::new(platform.source(), registry.clone());
//!
//! let on_user = HandlerOwner::new(|msg: &Message| msg.wparam() as isize * 2);
//! reactor.add_thread_handling(codes::USER, on_user.handle());
//!
//! reactor.post(Message::new(codes::USER).with_params(21, 0));
//! let deliveries = reactor.dispatch(DispatchFilter::all());
//! assert_eq!(deliveries[0].result, 42);
//!
//! // Hotkeys are claimed once per combination.
//! let pressed = HandlerOwner::new(|_: &Message| 1);
//! let id = reactor
//!     .add_hotkey_handling("ctrl alt T".parse().unwrap(), pressed.handle())
//!     .unwrap();
//! platform.press("alt ctrl T".parse().unwrap());
//! let deliveries = reactor.dispatch(DispatchFilter::all());
//! assert_eq!(deliveries[0].message.hotkey_id(), Some(id));
//!
//! registry.shutdown();
//! ```

pub mod binding;
pub mod color;
mod error;
mod event;
mod handler;
mod hotkey;
pub mod logging;
pub mod platform;
mod reactor;
mod registrar;
pub mod target;
mod timer;

pub use binding::{anchor, overwrite, relocate, BindingState, Composite, Method, MethodRegistry};
pub use color::RgbColor;
pub use error::{LiteralError, ReactorError, Result};
pub use event::{
    codes, AddressedKey, Delivery, DispatchFilter, EventCode, EventKey, LResult, Message, Payload,
    TargetId,
};
pub use handler::{Handler, HandlerFn, HandlerOwner};
pub use hotkey::{Hotkey, Modifiers};
pub use logging::{BindingTableDebug, PerfSpan, TableStyle};
pub use platform::{EventSource, TargetControl, TargetFactory};
pub use reactor::{BindingSummary, HandlerSlot, Reactor};
pub use registrar::{HotkeyBackend, HotkeyId, HotkeyRegistry};
pub use target::{MixBehavior, Target, TargetAttributes, TargetConfig, TargetLink};
pub use timer::{TimerKey, TimerQueue};
