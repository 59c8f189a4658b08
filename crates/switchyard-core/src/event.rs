//! Messages, event keys and dispatch filters.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::registrar::HotkeyId;

/// Numeric event code.
pub type EventCode = u32;

/// Value returned by a handler for one message.
pub type LResult = isize;

/// Well-known event codes.
///
/// Values follow the Win32 numbering so that a native event source can pass
/// codes through untouched.
pub mod codes {
    use super::EventCode;

    /// A target has been created.
    pub const CREATE: EventCode = 0x0001;
    /// A target is being destroyed.
    pub const DESTROY: EventCode = 0x0002;
    /// A target should repaint.
    pub const PAINT: EventCode = 0x000F;
    /// The thread should leave its loop.
    pub const QUIT: EventCode = 0x0012;
    /// Non-client area size calculation.
    pub const NC_CALC_SIZE: EventCode = 0x0083;
    /// Non-client hit testing.
    pub const NC_HIT_TEST: EventCode = 0x0084;
    /// Double click in the non-client area.
    pub const NC_LBUTTON_DBLCLK: EventCode = 0x00A3;
    /// A timer set on a target elapsed.
    pub const TIMER: EventCode = 0x0113;
    /// Double click in the client area.
    pub const LBUTTON_DBLCLK: EventCode = 0x0203;
    /// Files were dropped on a target.
    pub const DROP_FILES: EventCode = 0x0233;
    /// A registered global hotkey was pressed.
    pub const HOTKEY: EventCode = 0x0312;
    /// First code available for application-defined events.
    pub const USER: EventCode = 0x0400;
}

/// Identity of an addressable target.
///
/// `TargetId::THREAD` (zero) addresses the owning thread rather than a
/// specific target and doubles as the wildcard in bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TargetId(pub u32);

impl TargetId {
    /// The thread-wide wildcard target.
    pub const THREAD: TargetId = TargetId(0);

    /// Returns `true` for the thread-wide wildcard.
    #[inline]
    pub fn is_thread(self) -> bool {
        self == Self::THREAD
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_thread() {
            write!(f, "thread")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Data carried by a message.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No data.
    #[default]
    Empty,
    /// Two machine words, as carried by native messages.
    Params {
        /// First parameter.
        wparam: usize,
        /// Second parameter.
        lparam: isize,
    },
    /// Paths of files dropped on a target.
    Files(Rc<[PathBuf]>),
}

/// A polled event.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The event code.
    pub code: EventCode,
    /// The addressed target, or `None` for events posted to the thread.
    pub target: Option<TargetId>,
    /// Event data.
    pub payload: Payload,
}

impl Message {
    /// Create a thread-wide message with no payload.
    pub fn new(code: EventCode) -> Self {
        Self {
            code,
            target: None,
            payload: Payload::Empty,
        }
    }

    /// Address this message to a target.
    pub fn to(mut self, target: TargetId) -> Self {
        self.target = if target.is_thread() { None } else { Some(target) };
        self
    }

    /// Attach word parameters.
    pub fn with_params(mut self, wparam: usize, lparam: isize) -> Self {
        self.payload = Payload::Params { wparam, lparam };
        self
    }

    /// Attach dropped files.
    pub fn with_files(mut self, files: impl Into<Rc<[PathBuf]>>) -> Self {
        self.payload = Payload::Files(files.into());
        self
    }

    /// Create the message a hotkey press produces.
    pub fn hotkey(id: HotkeyId) -> Self {
        Self::new(codes::HOTKEY).with_params(id.0 as usize, 0)
    }

    /// The first word parameter, or 0 when the payload carries none.
    pub fn wparam(&self) -> usize {
        match self.payload {
            Payload::Params { wparam, .. } => wparam,
            _ => 0,
        }
    }

    /// The second word parameter, or 0 when the payload carries none.
    pub fn lparam(&self) -> isize {
        match self.payload {
            Payload::Params { lparam, .. } => lparam,
            _ => 0,
        }
    }

    /// Dropped files, if any.
    pub fn files(&self) -> &[PathBuf] {
        match &self.payload {
            Payload::Files(files) => files,
            _ => &[],
        }
    }

    /// Returns `true` for global hotkey presses.
    pub fn is_hotkey(&self) -> bool {
        self.code == codes::HOTKEY
    }

    /// The hotkey identity of a hotkey press. A `wparam` outside the
    /// identity range yields `None`.
    pub fn hotkey_id(&self) -> Option<HotkeyId> {
        if !self.is_hotkey() {
            return None;
        }
        u32::try_from(self.wparam()).ok().map(HotkeyId)
    }
}

/// Routing key for an addressed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressedKey {
    /// The event code.
    pub code: EventCode,
    /// The target, `TargetId::THREAD` for wildcard bindings.
    pub target: TargetId,
}

impl AddressedKey {
    /// Create a key for a specific target.
    pub fn new(code: EventCode, target: TargetId) -> Self {
        Self { code, target }
    }

    /// Create a wildcard key.
    pub fn thread(code: EventCode) -> Self {
        Self::new(code, TargetId::THREAD)
    }
}

/// Key under which handlers are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// An event code addressed to a target or to the thread.
    Addressed(AddressedKey),
    /// A registered global hotkey.
    Hotkey(HotkeyId),
}

/// Selects which queued messages a dispatch call drains.
///
/// The default filter matches every message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchFilter {
    /// Inclusive code range, `None` for all codes.
    pub codes: Option<(EventCode, EventCode)>,
    /// Only messages addressed to this target, `None` for all.
    pub target: Option<TargetId>,
}

impl DispatchFilter {
    /// Match every message.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match a single code.
    pub fn code(code: EventCode) -> Self {
        Self {
            codes: Some((code, code)),
            target: None,
        }
    }

    /// Restrict to a target.
    pub fn for_target(mut self, target: TargetId) -> Self {
        self.target = Some(target);
        self
    }

    /// Check whether a message passes the filter.
    pub fn matches(&self, message: &Message) -> bool {
        if let Some((first, last)) = self.codes {
            if message.code < first || message.code > last {
                return false;
            }
        }
        match self.target {
            Some(target) => message.target == Some(target),
            None => true,
        }
    }
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// The dispatched message.
    pub message: Message,
    /// The surfaced handler result, or the default handling result.
    pub result: LResult,
    /// Whether at least one live handler ran.
    pub handled: bool,
}
