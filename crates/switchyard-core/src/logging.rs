//! Logging and debugging facilities.
//!
//! Switchyard is instrumented with `tracing`. Install any subscriber to see
//! the output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("switchyard_core::reactor=trace")
//!     .init();
//! ```
//!
//! [`BindingTableDebug`] renders a reactor's routing table, which is handy
//! when a handler silently never fires.

use std::fmt::Write as FmtWrite;

use crate::event::EventKey;
use crate::reactor::Reactor;

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "switchyard_core";
    /// Routing table and dispatch.
    pub const REACTOR: &str = "switchyard_core::reactor";
    /// Hotkey registration.
    pub const HOTKEY: &str = "switchyard_core::hotkey";
    /// Method binding and rebinding.
    pub const BINDING: &str = "switchyard_core::binding";
    /// Target creation.
    pub const TARGET: &str = "switchyard_core::target";
    /// Timers.
    pub const TIMER: &str = "switchyard_core::timer";
    /// Platform implementations.
    pub const PLATFORM: &str = "switchyard_core::platform";
}

/// Layout of the routing table dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    /// One line per key with live and total counts.
    #[default]
    Detailed,
    /// Keys only, dead-only keys omitted.
    Compact,
}

/// Renders a reactor's routing table.
#[derive(Debug, Clone, Default)]
pub struct BindingTableDebug {
    style: TableStyle,
}

impl BindingTableDebug {
    /// Create a renderer with the detailed style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a renderer with a specific style.
    pub fn with_style(style: TableStyle) -> Self {
        Self { style }
    }

    /// Format the routing table.
    pub fn format(&self, reactor: &Reactor) -> String {
        let bindings = reactor.bindings();
        let mut output = String::new();
        let _ = writeln!(output, "Routing table ({} handler slots):", reactor.handler_count());
        if bindings.is_empty() {
            let _ = writeln!(output, "  (empty)");
            return output;
        }

        for binding in bindings {
            if self.style == TableStyle::Compact && binding.live == 0 {
                continue;
            }
            let key = match binding.key {
                EventKey::Addressed(key) if key.target.is_thread() => {
                    format!("code {:#06x} @ *", key.code)
                }
                EventKey::Addressed(key) => format!("code {:#06x} @ {}", key.code, key.target),
                EventKey::Hotkey(id) => id.to_string(),
            };
            match self.style {
                TableStyle::Detailed => {
                    let _ = writeln!(output, "  {key}: {}/{} live", binding.live, binding.handlers);
                }
                TableStyle::Compact => {
                    let _ = writeln!(output, "  {key}");
                }
            }
        }
        output
    }
}

/// A guard that keeps a tracing span entered until dropped.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a span named after `operation`.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::debug_span!(target: "switchyard_core::perf", "perf", operation);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{codes, TargetId};
    use crate::handler::HandlerOwner;
    use crate::platform::headless::HeadlessPlatform;
    use crate::registrar::HotkeyRegistry;

    fn reactor() -> Reactor {
        let platform = HeadlessPlatform::new();
        Reactor::new(
            platform.source(),
            HotkeyRegistry::init(platform.hotkey_backend()),
        )
    }

    #[test]
    fn test_empty_table() {
        let output = BindingTableDebug::new().format(&reactor());
        assert!(output.contains("Routing table (0 handler slots)"));
        assert!(output.contains("(empty)"));
    }

    #[test]
    fn test_detailed_lists_live_counts() {
        let mut reactor = reactor();
        let live = HandlerOwner::new(|_| 0);
        let dead = HandlerOwner::new(|_| 0);
        reactor.add_addressed_handling(codes::TIMER, TargetId(7), live.handle());
        reactor.add_thread_handling(codes::TIMER, dead.handle());
        drop(dead);

        let output = BindingTableDebug::new().format(&reactor);
        assert!(output.contains("code 0x0113 @ #7: 1/1 live"));
        assert!(output.contains("code 0x0113 @ *: 0/1 live"));
    }

    #[test]
    fn test_compact_hides_dead_keys() {
        let mut reactor = reactor();
        let dead = HandlerOwner::new(|_| 0);
        reactor.add_thread_handling(codes::PAINT, dead.handle());
        drop(dead);

        let output = BindingTableDebug::with_style(TableStyle::Compact).format(&reactor);
        assert!(!output.contains("0x000f"));
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("dispatch");
    }
}
