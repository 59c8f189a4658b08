//! External actions triggered by hotkeys and dropped files.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use switchyard_core::RgbColor;

use crate::config::{AppConfig, ConsoleConfig, LaunchConfig};
use crate::environment::PortableEnv;
use crate::error::AppResult;

/// Side effects the application asks its environment for.
///
/// The reactor side only decides *when* to act; implementations decide
/// *how*. Tests substitute a recorder.
pub trait AppActions {
    /// Open a new console, optionally running extra arguments in it.
    fn spawn_console(&self, extra: Option<&[OsString]>) -> io::Result<()>;

    /// Open the browser.
    fn launch_browser(&self) -> io::Result<()>;

    /// Open dropped files in the editor.
    fn open_files(&self, files: &[PathBuf]) -> io::Result<()>;
}

/// Environment variables handed to spawned consoles.
pub mod env {
    /// Console font face.
    pub const FONT_NAME: &str = "SWITCHYARD_FONT_NAME";
    /// Console font size in points.
    pub const FONT_SIZE: &str = "SWITCHYARD_FONT_SIZE";
    /// Color table, `r,g,b` entries separated by `;`.
    pub const TERM_COLORS: &str = "SWITCHYARD_TERM_COLORS";
    /// Console width in character cells.
    pub const COLUMNS: &str = "SWITCHYARD_COLUMNS";
    /// Console height in character cells.
    pub const ROWS: &str = "SWITCHYARD_ROWS";
    /// Console text attribute, foreground in the low nibble.
    pub const TEXT_ATTRIBUTE: &str = "SWITCHYARD_TEXT_ATTRIBUTE";
}

/// [`AppActions`] that start child processes.
#[derive(Debug, Clone)]
pub struct CommandActions {
    launch: LaunchConfig,
    font_name: String,
    font_size: u32,
    term_colors: Vec<RgbColor>,
    console: ConsoleConfig,
    environment: Option<PortableEnv>,
}

impl CommandActions {
    /// Build from the application configuration. Launched programs inherit
    /// the application's environment; see [`from_config`](Self::from_config).
    pub fn new(config: &AppConfig) -> Self {
        Self {
            launch: config.launch.clone(),
            font_name: config.font_name.clone(),
            font_size: config.font_size,
            term_colors: config.term_colors.clone(),
            console: config.console,
            environment: None,
        }
    }

    /// Build from the application configuration, resolving its
    /// `[environment]` table, if any, against `program_dir`.
    ///
    /// # Errors
    ///
    /// Fails with [`AppError::Environment`](crate::AppError::Environment)
    /// when a configured path does not exist.
    pub fn from_config(config: &AppConfig, program_dir: &Path) -> AppResult<Self> {
        let mut actions = Self::new(config);
        if let Some(environment) = &config.environment {
            actions.environment = Some(PortableEnv::resolve(program_dir, environment)?);
        }
        Ok(actions)
    }

    /// The resolved portable environment.
    pub fn environment(&self) -> Option<&PortableEnv> {
        self.environment.as_ref()
    }

    fn command(&self, line: &[String]) -> io::Result<Command> {
        let (program, args) = line
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;
        let mut command = Command::new(program);
        command.args(args);
        if let Some(environment) = &self.environment {
            environment.apply(&mut command);
        }
        Ok(command)
    }

    fn console(&self) -> io::Result<Command> {
        let mut command = self.command(&self.launch.console)?;
        let colors: Vec<String> = self.term_colors.iter().map(RgbColor::to_string).collect();
        command
            .env(env::FONT_NAME, &self.font_name)
            .env(env::FONT_SIZE, self.font_size.to_string())
            .env(env::TERM_COLORS, colors.join(";"))
            .env(env::COLUMNS, self.console.columns.to_string())
            .env(env::ROWS, self.console.rows.to_string())
            .env(env::TEXT_ATTRIBUTE, self.console.text_attribute().to_string());
        if let Some(environment) = &self.environment {
            command.current_dir(environment.root());
        }
        Ok(command)
    }

    fn spawn(mut command: Command) -> io::Result<()> {
        let child: Child = command.spawn()?;
        tracing::debug!(target: "switchyard::app", pid = child.id(), program = ?command.get_program(), "process spawned");
        Ok(())
    }
}

impl AppActions for CommandActions {
    fn spawn_console(&self, extra: Option<&[OsString]>) -> io::Result<()> {
        let mut command = self.console()?;
        if let Some(extra) = extra {
            command.args(extra);
        }
        Self::spawn(command)
    }

    fn launch_browser(&self) -> io::Result<()> {
        Self::spawn(self.command(&self.launch.browser)?)
    }

    fn open_files(&self, files: &[PathBuf]) -> io::Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let extra: Vec<OsString> = self
            .launch
            .editor
            .iter()
            .map(OsString::from)
            .chain(files.iter().map(|file| file.clone().into_os_string()))
            .collect();
        self.spawn_console(Some(&extra))
    }
}
