//! Application configuration.
//!
//! Configuration is a TOML document. Every field is optional:
//!
//! ```toml
//! font_name = "Cascadia Mono"
//! font_size = 16
//! term_colors = ["12,12,12", "197,15,31"]
//! poll_interval_ms = 50
//!
//! [launch]
//! console = ["cmd.exe"]
//! editor = ["nvim"]
//!
//! [console]
//! columns = 120
//! rows = 30
//! foreground = 7
//! background = 0
//!
//! [environment]
//! root_offset = ".."
//! apps_bin_paths = ["git/bin"]
//!
//! [hotkeys]
//! spawn_console = "alt ctrl A"
//! exit = "alt ctrl nr D"
//! ```
//!
//! Hotkeys use their canonical string form and colors the `"r,g,b"` form.
//! Without an `[environment]` table, launched programs inherit the
//! application's environment unchanged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use switchyard_core::{Hotkey, Modifiers, RgbColor};

use crate::environment::EnvironmentConfig;
use crate::error::{AppError, AppResult};

/// File name of the configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "switchyard.toml";

const DEFAULT_SPAWN_CONSOLE: Hotkey = Hotkey::letter('A', Modifiers::empty());
const DEFAULT_LAUNCH_BROWSER: Hotkey = Hotkey::letter('B', Modifiers::empty());
const DEFAULT_FILE_PICK: Hotkey = Hotkey::letter('C', Modifiers::empty());
const DEFAULT_EXIT: Hotkey = Hotkey::letter('D', Modifiers::empty());

/// Global hotkeys of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Opens a new console.
    pub spawn_console: Hotkey,
    /// Opens the browser.
    pub launch_browser: Hotkey,
    /// Shows the file drop target.
    pub file_pick: Hotkey,
    /// Quits the application.
    pub exit: Hotkey,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            spawn_console: DEFAULT_SPAWN_CONSOLE,
            launch_browser: DEFAULT_LAUNCH_BROWSER,
            file_pick: DEFAULT_FILE_PICK,
            exit: DEFAULT_EXIT,
        }
    }
}

/// Command lines used by the process-launching actions.
///
/// Each entry is a program followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Opens a new console.
    pub console: Vec<String>,
    /// Opens the browser.
    pub browser: Vec<String>,
    /// Console arguments that open dropped files; the paths are appended.
    pub editor: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            console: vec!["cmd.exe".into()],
            browser: vec!["cmd.exe".into(), "/C".into(), "start".into(), "chrome.exe".into()],
            editor: vec!["/K".into(), "nvim".into()],
        }
    }
}

/// One of the 16 console palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ConsoleColor(u8);

impl ConsoleColor {
    /// Palette entry 0.
    pub const BLACK: Self = Self(0);
    /// Palette entry 7.
    pub const WHITE: Self = Self(7);

    /// The palette index.
    pub fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ConsoleColor {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if index < 16 {
            Ok(Self(index))
        } else {
            Err(format!("console color {index} is out of range 0..=15"))
        }
    }
}

impl From<ConsoleColor> for u8 {
    fn from(color: ConsoleColor) -> Self {
        color.0
    }
}

/// Appearance of spawned consoles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Width in character cells.
    pub columns: u16,
    /// Height in character cells.
    pub rows: u16,
    /// Text color.
    pub foreground: ConsoleColor,
    /// Background color.
    pub background: ConsoleColor,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            columns: 120,
            rows: 30,
            foreground: ConsoleColor::WHITE,
            background: ConsoleColor::BLACK,
        }
    }
}

impl ConsoleConfig {
    /// Foreground in the low nibble, background in the high one.
    pub fn text_attribute(&self) -> u16 {
        u16::from(self.foreground.index()) | u16::from(self.background.index()) << 4
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Color table passed to spawned consoles.
    pub term_colors: Vec<RgbColor>,
    /// Console font face.
    pub font_name: String,
    /// Console font size in points.
    pub font_size: u32,
    /// Pause between two polls of the event queue.
    pub poll_interval_ms: u64,
    /// How long the file drop target stays visible once summoned.
    pub file_drop_visible_ms: u64,
    /// How long the greeting stays visible at startup.
    pub greeting_visible_ms: u64,
    /// External commands.
    pub launch: LaunchConfig,
    /// Spawned console appearance.
    pub console: ConsoleConfig,
    /// Portable environment for launched programs.
    pub environment: Option<EnvironmentConfig>,
    /// Global hotkeys.
    pub hotkeys: HotkeyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            term_colors: Vec::new(),
            font_name: String::new(),
            font_size: 14,
            poll_interval_ms: 50,
            file_drop_visible_ms: 10_000,
            greeting_visible_ms: 1_000,
            launch: LaunchConfig::default(),
            console: ConsoleConfig::default(),
            environment: None,
            hotkeys: HotkeyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(document: &str) -> AppResult<Self> {
        Ok(toml::from_str(document)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&document)?;
        tracing::debug!(target: "switchyard::config", path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(target: "switchyard::config", path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// The per-user configuration file, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "switchyard").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let document = self.to_toml_string()?;
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, document)
        };
        write().map_err(|source| AppError::ConfigSave {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> AppResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// [`poll_interval_ms`](Self::poll_interval_ms) as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// [`file_drop_visible_ms`](Self::file_drop_visible_ms) as a duration.
    pub fn file_drop_visible(&self) -> Duration {
        Duration::from_millis(self.file_drop_visible_ms)
    }

    /// [`greeting_visible_ms`](Self::greeting_visible_ms) as a duration.
    pub fn greeting_visible(&self) -> Duration {
        Duration::from_millis(self.greeting_visible_ms)
    }
}
