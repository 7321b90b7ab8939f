use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

/// Full path of the config file, bypassing directory discovery.
pub const ENV_CONFIG_FILE: &str = "IRIDESCENCE_CONFIG";
/// Directory holding `config.toml`.
pub const ENV_CONFIG_DIR: &str = "IRIDESCENCE_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "iridescence";
const APPLICATION: &str = "iridescence";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let config_dir = match env_override(ENV_CONFIG_DIR) {
            Some(dir) => dir,
            None => ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
                .ok_or_else(|| anyhow!("failed to determine user directories"))?
                .config_dir()
                .to_path_buf(),
        };
        let config_file =
            env_override(ENV_CONFIG_FILE).unwrap_or_else(|| config_dir.join(CONFIG_FILE_NAME));

        Ok(Self {
            config_dir,
            config_file,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// `--config` wins over everything discovered.
    pub fn with_config_file(mut self, explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            self.config_file = path.to_path_buf();
        }
        self
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn config_dir_override_places_the_file_inside_it() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");

        let _dir_guard = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _file_guard = EnvGuard::clear(ENV_CONFIG_FILE);

        let paths = AppPaths::discover().unwrap();
        assert_eq!(paths.config_dir(), config_dir.as_path());
        assert_eq!(paths.config_file(), config_dir.join("config.toml").as_path());
    }

    #[test]
    fn config_file_override_takes_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let config_file = root.path().join("elsewhere.toml");

        let _dir_guard = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _file_guard = EnvGuard::set(ENV_CONFIG_FILE, &config_file);

        let paths = AppPaths::discover().unwrap();
        assert_eq!(paths.config_file(), config_file.as_path());

        let flag = root.path().join("flag.toml");
        let paths = paths.with_config_file(Some(&flag));
        assert_eq!(paths.config_file(), flag.as_path());
    }
}
