//! Portable environment for launched programs.
//!
//! The application can carry its own tool tree next to the executable:
//!
//! ```text
//! <program dir>/<root_offset>/
//!     <apps_dir>/<bin path>...   prepended to PATH
//!     <apps_data>/
//!     <xdg_home>/                XDG_CONFIG_HOME, XDG_DATA_HOME, ...
//! ```
//!
//! [`PortableEnv::resolve`] turns the configured relative paths into
//! canonical absolute ones once, at startup. Every path must exist.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Variables set on every launched program.
pub mod vars {
    /// Absolute path of the environment root.
    pub const ROOT: &str = "SWITCHYARD_ROOT";
    /// Search path, with the application bin paths first.
    pub const PATH: &str = "PATH";
    /// Directories that XDG-aware programs store their files in.
    pub const XDG: [&str; 4] = [
        "XDG_CONFIG_HOME",
        "XDG_DATA_HOME",
        "XDG_RUNTIME_HOME",
        "XDG_STATE_HOME",
    ];
}

/// The `[environment]` configuration table. Paths are relative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment root, relative to the program directory.
    pub root_offset: PathBuf,
    /// Application tree, relative to the root.
    pub apps_dir: PathBuf,
    /// Application data, relative to the root.
    pub apps_data: PathBuf,
    /// Home of XDG-aware programs, relative to the root.
    pub xdg_home: PathBuf,
    /// Directories added to `PATH`, relative to `apps_dir`.
    pub apps_bin_paths: Vec<PathBuf>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            root_offset: PathBuf::from("."),
            apps_dir: PathBuf::from("apps"),
            apps_data: PathBuf::from("data"),
            xdg_home: PathBuf::from("home"),
            apps_bin_paths: Vec::new(),
        }
    }
}

/// A resolved [`EnvironmentConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortableEnv {
    root: PathBuf,
    apps_data: PathBuf,
    xdg_home: PathBuf,
    bin_paths: Vec<PathBuf>,
}

fn canonical(path: PathBuf) -> AppResult<PathBuf> {
    std::fs::canonicalize(&path).map_err(|source| AppError::Environment { path, source })
}

impl PortableEnv {
    /// Resolve `config` against `program_dir`.
    ///
    /// # Errors
    ///
    /// Fails with [`AppError::Environment`] naming the first path that does
    /// not exist.
    pub fn resolve(program_dir: &Path, config: &EnvironmentConfig) -> AppResult<Self> {
        let root = canonical(program_dir.join(&config.root_offset))?;
        let apps_dir = canonical(root.join(&config.apps_dir))?;
        let apps_data = canonical(root.join(&config.apps_data))?;
        let xdg_home = canonical(root.join(&config.xdg_home))?;
        let bin_paths = config
            .apps_bin_paths
            .iter()
            .map(|bin| canonical(apps_dir.join(bin)))
            .collect::<AppResult<Vec<_>>>()?;
        tracing::debug!(target: "switchyard::app", root = %root.display(), bin_paths = bin_paths.len(), "portable environment resolved");
        Ok(Self {
            root,
            apps_data,
            xdg_home,
            bin_paths,
        })
    }

    /// The environment root. Consoles start here.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The application data directory.
    pub fn apps_data(&self) -> &Path {
        &self.apps_data
    }

    /// The XDG home directory.
    pub fn xdg_home(&self) -> &Path {
        &self.xdg_home
    }

    /// The bin paths, in `PATH` order.
    pub fn bin_paths(&self) -> &[PathBuf] {
        &self.bin_paths
    }

    /// `PATH` with the bin paths in front of `inherited`.
    pub fn search_path(&self, inherited: Option<&OsStr>) -> OsString {
        let tail: Vec<PathBuf> = inherited
            .map(|path| std::env::split_paths(path).collect())
            .unwrap_or_default();
        let paths = self.bin_paths.iter().cloned().chain(tail);
        std::env::join_paths(paths).unwrap_or_else(|err| {
            tracing::warn!(target: "switchyard::app", %err, "bin path not representable in PATH");
            inherited.map(OsStr::to_os_string).unwrap_or_default()
        })
    }

    /// Set the environment variables on `command`.
    pub fn apply(&self, command: &mut Command) {
        command.env(vars::ROOT, &self.root);
        for var in vars::XDG {
            command.env(var, &self.xdg_home);
        }
        command.env(vars::PATH, self.search_path(std::env::var_os(vars::PATH).as_deref()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (tempfile::TempDir, EnvironmentConfig) {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["root/apps/git/bin", "root/apps/nvim", "root/data", "root/home", "bin"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        let config = EnvironmentConfig {
            root_offset: PathBuf::from("../root"),
            apps_bin_paths: vec![PathBuf::from("git/bin"), PathBuf::from("nvim")],
            ..EnvironmentConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_resolve_relative_paths() {
        let (dir, config) = tree();
        let env = PortableEnv::resolve(&dir.path().join("bin"), &config).unwrap();
        let root = std::fs::canonicalize(dir.path().join("root")).unwrap();

        assert_eq!(env.root(), root);
        assert_eq!(env.apps_data(), root.join("data"));
        assert_eq!(env.xdg_home(), root.join("home"));
        assert_eq!(
            env.bin_paths(),
            [root.join("apps/git/bin"), root.join("apps/nvim")]
        );
    }

    #[test]
    fn test_missing_path_is_named() {
        let (dir, mut config) = tree();
        config.xdg_home = PathBuf::from("nowhere");
        let err = PortableEnv::resolve(&dir.path().join("bin"), &config).unwrap_err();
        match err {
            AppError::Environment { path, .. } => assert!(path.ends_with("nowhere")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_search_path_prepends_bin_paths() {
        let (dir, config) = tree();
        let env = PortableEnv::resolve(&dir.path().join("bin"), &config).unwrap();
        let inherited = std::env::join_paths([PathBuf::from("/usr/bin")]).unwrap();

        let path = env.search_path(Some(&inherited));
        let entries: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[..2], *env.bin_paths());
        assert_eq!(entries[2], PathBuf::from("/usr/bin"));
    }

    #[test]
    fn test_apply_sets_root_and_xdg() {
        let (dir, config) = tree();
        let env = PortableEnv::resolve(&dir.path().join("bin"), &config).unwrap();
        let mut command = Command::new("true");
        env.apply(&mut command);

        let value = |key: &str| {
            command
                .get_envs()
                .find(|(name, _)| *name == OsStr::new(key))
                .and_then(|(_, value)| value.map(PathBuf::from))
        };
        assert_eq!(value(vars::ROOT).as_deref(), Some(env.root()));
        for var in vars::XDG {
            assert_eq!(value(var).as_deref(), Some(env.xdg_home()));
        }
        let path = value(vars::PATH).unwrap();
        assert_eq!(std::env::split_paths(&path).next().as_ref(), env.bin_paths().first());
    }
}
