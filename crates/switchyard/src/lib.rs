//! Switchyard - a hotkey launcher built on the Switchyard event reactor.
//!
//! This crate wires the reactor core to an application: global hotkeys
//! that open consoles and the browser, a file drop target that hands
//! dropped files to an editor, and a log panel for startup notes.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use switchyard::{AppConfig, Application, CommandActions};
//! use switchyard::reactor::platform::headless::HeadlessPlatform;
//! use switchyard::reactor::HotkeyRegistry;
//!
//! let config = AppConfig::default();
//! let platform = HeadlessPlatform::new();
//! let registry = HotkeyRegistry::init(platform.hotkey_backend());
//! let actions = Rc::new(CommandActions::new(&config));
//!
//! let mut app = Application::new(config, platform.source(), platform.factory(), registry, actions)?;
//! app.poll_once();
//! assert!(app.is_running());
//! app.shutdown()?;
//! # Ok::<(), switchyard::AppError>(())
//! ```

pub mod actions;
mod app;
pub mod components;
pub mod config;
pub mod environment;
mod error;
pub mod fallback;
pub mod file_drop;
pub mod log_panel;

pub use actions::{AppActions, CommandActions};
pub use app::{Application, RootApp};
pub use config::{AppConfig, ConsoleColor, ConsoleConfig, HotkeyConfig, LaunchConfig};
pub use environment::{EnvironmentConfig, PortableEnv};
pub use error::{AppError, AppResult};
pub use fallback::{add_hotkey_with_backup, HotkeyBinding, BACKUP_MODIFIERS};

/// The reactor core.
pub mod reactor {
    pub use switchyard_core::*;
}
