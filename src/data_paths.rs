use std::path::{Path, PathBuf};

/// Default data directory (relative to current working directory)
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Environment override for the data directory
pub const DATA_DIR_ENV: &str = "PAPERBROKER_DATA_DIR";

/// Subdirectory paths relative to the data directory
pub const ACCOUNTS_DIR: &str = "accounts";
pub const ORDERS_DIR: &str = "orders";
pub const EXPORTS_DIR: &str = "exports";
pub const LOGS_DIR: &str = "logs";

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Helper struct to manage data paths
#[derive(Clone, Debug)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create a new DataPaths instance with the given root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve the data root: CLI override, then environment, then the
    /// platform data directory, then `./data`.
    pub fn resolve(cli_override: Option<PathBuf>) -> Self {
        if let Some(root) = cli_override {
            return Self::new(root);
        }
        if let Ok(root) = std::env::var(DATA_DIR_ENV) {
            return Self::new(root);
        }
        if let Some(dirs) = directories::ProjectDirs::from("", "", "paperbroker") {
            return Self::new(dirs.data_dir());
        }
        Self::new(DEFAULT_DATA_DIR)
    }

    /// Get the root data directory
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Get the per-user account ledger directory
    pub fn accounts(&self) -> PathBuf {
        self.root.join(ACCOUNTS_DIR)
    }

    /// Get the order documents directory
    pub fn orders(&self) -> PathBuf {
        self.root.join(ORDERS_DIR)
    }

    /// Get the CSV export directory
    pub fn exports(&self) -> PathBuf {
        self.root.join(EXPORTS_DIR)
    }

    /// Get the logs directory
    pub fn logs(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// Get the engine config file path
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Ensure all directories exist
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.accounts())?;
        std::fs::create_dir_all(self.orders())?;
        std::fs::create_dir_all(self.exports())?;
        std::fs::create_dir_all(self.logs())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdirectories_hang_off_the_root() {
        let paths = DataPaths::new("/tmp/pb-test");
        assert_eq!(paths.accounts(), PathBuf::from("/tmp/pb-test/accounts"));
        assert_eq!(paths.orders(), PathBuf::from("/tmp/pb-test/orders"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/pb-test/config.yaml"));
    }

    #[test]
    fn cli_override_wins() {
        let paths = DataPaths::resolve(Some(PathBuf::from("/tmp/custom")));
        assert_eq!(paths.root(), &PathBuf::from("/tmp/custom"));
    }

    #[test]
    fn ensure_directories_creates_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("data"));
        paths.ensure_directories().unwrap();
        assert!(paths.accounts().is_dir());
        assert!(paths.orders().is_dir());
        assert!(paths.exports().is_dir());
        assert!(paths.logs().is_dir());
    }
}
