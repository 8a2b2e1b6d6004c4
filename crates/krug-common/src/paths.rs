//! Standard filesystem paths for Krug.

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Default root directory for Krug data.
pub static KRUG_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("KRUG_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/var/lib/krug"))
});

/// Default runtime directory for Krug.
pub static KRUG_RUNTIME_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("KRUG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/run/krug"))
});

/// Host files consulted when synthesizing container network files.
pub mod host {
    /// The host's own hosts database.
    pub const ETC_HOSTS: &str = "/etc/hosts";
    /// The host's resolver configuration.
    pub const RESOLV_CONF: &str = "/etc/resolv.conf";
}

/// Standard paths used by the Krug daemon.
#[derive(Debug, Clone)]
pub struct KrugPaths {
    /// Root data directory (default: /var/lib/krug).
    pub root: PathBuf,
    /// Runtime directory (default: /run/krug).
    pub runtime: PathBuf,
}

impl KrugPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let runtime = root.join("run");
        Self { root, runtime }
    }

    /// Directory for container data.
    #[must_use]
    pub fn containers(&self) -> PathBuf {
        self.root.join("containers")
    }

    /// Directory for a specific container.
    #[must_use]
    pub fn container(&self, id: &str) -> PathBuf {
        self.containers().join(id)
    }

    /// A container's persisted record.
    #[must_use]
    pub fn container_record(&self, id: &str) -> PathBuf {
        self.container(id).join("netconf.json")
    }

    /// A container's generated hostname file.
    #[must_use]
    pub fn container_hostname(&self, id: &str) -> PathBuf {
        self.container(id).join("hostname")
    }

    /// A container's generated hosts file.
    #[must_use]
    pub fn container_hosts(&self, id: &str) -> PathBuf {
        self.container(id).join("hosts")
    }

    /// A container's generated resolv.conf.
    #[must_use]
    pub fn container_resolv_conf(&self, id: &str) -> PathBuf {
        self.container(id).join("resolv.conf")
    }

    /// Runtime directory for a specific container.
    #[must_use]
    pub fn container_runtime(&self, id: &str) -> PathBuf {
        self.runtime.join("containers").join(id)
    }

    /// Create all necessary directories.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.runtime)?;
        std::fs::create_dir_all(self.containers())?;
        Ok(())
    }
}

impl Default for KrugPaths {
    fn default() -> Self {
        Self {
            root: KRUG_ROOT.clone(),
            runtime: KRUG_RUNTIME_DIR.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths() {
        let paths = KrugPaths::new();
        assert_eq!(paths.containers(), PathBuf::from("/var/lib/krug/containers"));
        assert_eq!(
            paths.container("abc123"),
            PathBuf::from("/var/lib/krug/containers/abc123")
        );
    }

    #[test]
    fn custom_root() {
        let paths = KrugPaths::with_root("/tmp/krug-test");
        assert_eq!(paths.containers(), PathBuf::from("/tmp/krug-test/containers"));
        assert_eq!(paths.runtime, PathBuf::from("/tmp/krug-test/run"));
    }

    #[test]
    fn network_file_paths() {
        let paths = KrugPaths::with_root("/tmp/krug-test");
        assert_eq!(
            paths.container_resolv_conf("abc"),
            PathBuf::from("/tmp/krug-test/containers/abc/resolv.conf")
        );
        assert_eq!(
            paths.container_record("abc"),
            PathBuf::from("/tmp/krug-test/containers/abc/netconf.json")
        );
    }
}
