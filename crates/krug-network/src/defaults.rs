//! Synthesis of default container network files.
//!
//! Fresh containers get a generated `hostname`, `hosts` and `resolv.conf`
//! under the runtime's container directory; system containers instead get
//! their files merged in place under a caller-supplied rootfs.

use std::path::{Path, PathBuf};

use krug_common::KrugResult;

use crate::fsutil::{self, NETWORK_FILE_MODE};
use crate::netfiles;
use crate::spec::{HostNetworkSpec, UserRemap};

/// Hosts entries every generated hosts file starts with.
const DEFAULT_HOSTS: &str = "127.0.0.1       localhost\n\
                             ::1     localhost ip6-localhost ip6-loopback\n\
                             fe00::0 ip6-localnet\n\
                             ff00::0 ip6-mcastprefix\n\
                             ff02::1 ip6-allnodes\n\
                             ff02::2 ip6-allrouters\n";

/// Resolver fallback used when the host has no resolv.conf to copy.
const DEFAULT_RESOLV: &str = "\nnameserver 8.8.8.8\nnameserver 8.8.4.4\n";

/// Synthesize the hostname file for a fresh container.
///
/// When no hostname is configured, the daemon host's hostname is used if the
/// container shares the host network namespace, `localhost` otherwise.
/// Returns the effective hostname and the path written.
///
/// # Errors
///
/// Fails if the hostname cannot be determined or the file cannot be written.
pub fn create_default_hostname(
    id: &str,
    rootpath: &Path,
    share_host: bool,
    configured: Option<&str>,
) -> KrugResult<(String, PathBuf)> {
    let hostname = match configured {
        Some(name) => name.to_string(),
        None if share_host => host_hostname()?,
        None => "localhost".to_string(),
    };

    let path = rootpath.join(id).join("hostname");
    fsutil::write_file(&path, &format!("{hostname}\n"), NETWORK_FILE_MODE)?;

    tracing::debug!(container_id = id, hostname, "Created default hostname");
    Ok((hostname, path))
}

/// Synthesize the hosts file for a fresh container.
///
/// Copies the host's own hosts database when the container shares the host
/// network namespace and it exists; otherwise writes the default loopback
/// block plus one entry for the container's hostname. Returns the path
/// written.
///
/// # Errors
///
/// Fails if the copy or write fails.
pub fn create_default_hosts(
    id: &str,
    rootpath: &Path,
    share_host: bool,
    hostname: &str,
    host_hosts: &Path,
) -> KrugResult<PathBuf> {
    let path = rootpath.join(id).join("hosts");

    if share_host && fsutil::file_exists(host_hosts) {
        fsutil::copy_file(host_hosts, &path, NETWORK_FILE_MODE)?;
    } else {
        let content = format!("{DEFAULT_HOSTS}127.0.0.1    {hostname}\n");
        fsutil::write_file(&path, &content, NETWORK_FILE_MODE)?;
    }

    tracing::debug!(container_id = id, "Created default hosts");
    Ok(path)
}

/// Synthesize the resolv.conf for a fresh container.
///
/// Copies the host's resolver configuration when present, otherwise writes
/// the public-DNS fallback. Returns the path written.
///
/// # Errors
///
/// Fails if the copy or write fails.
pub fn create_default_resolv_conf(
    id: &str,
    rootpath: &Path,
    host_resolv: &Path,
) -> KrugResult<PathBuf> {
    let path = rootpath.join(id).join("resolv.conf");

    if fsutil::file_exists(host_resolv) {
        fsutil::copy_file(host_resolv, &path, NETWORK_FILE_MODE)?;
    } else {
        fsutil::write_file(&path, DEFAULT_RESOLV, NETWORK_FILE_MODE)?;
    }

    tracing::debug!(container_id = id, "Created default resolv.conf");
    Ok(path)
}

/// Write a hostname into `/etc/hostname` under a rootfs.
///
/// An existing file whose trimmed content is neither empty nor `localhost`
/// is left untouched.
///
/// # Errors
///
/// Fails on path resolution or write errors.
pub fn write_hostname_file(rootfs: &Path, hostname: &str) -> KrugResult<()> {
    let path = fsutil::scoped_join(rootfs, "/etc/hostname")?;

    if fsutil::file_exists(&path) {
        let existing = fsutil::read_or_empty(&path)?;
        let existing = existing.trim();
        if !existing.is_empty() && existing != "localhost" {
            return Ok(());
        }
    }

    fsutil::write_file(&path, hostname, NETWORK_FILE_MODE)
}

/// Apply the configured `uid:gid:size` remap to a network file under a
/// rootfs. A missing remap is a no-op.
///
/// # Errors
///
/// Fails if the remap string is malformed or the ownership change fails.
pub fn chown_network_file(
    user_remap: Option<&str>,
    rootfs: &Path,
    filename: &str,
) -> KrugResult<()> {
    let Some(remap) = user_remap else {
        return Ok(());
    };

    let remap = UserRemap::parse(remap)?;
    let path = fsutil::scoped_join(rootfs, filename)?;
    std::os::unix::fs::chown(&path, Some(remap.uid), Some(remap.gid))?;

    tracing::debug!(
        path = %path.display(),
        uid = remap.uid,
        gid = remap.gid,
        "Remapped network file ownership"
    );
    Ok(())
}

/// Merge the host network specification into a container's network files.
///
/// System containers with a caller-supplied rootfs get hostname, hosts and
/// resolv.conf merged in place under it, each ownership-remapped when a
/// remap is configured. Every other container only gets its resolv.conf
/// under `<runtime_root>/<id>` merged, with no remap.
///
/// # Errors
///
/// Fails on the first file that cannot be merged, written or remapped.
pub fn merge_network_files(
    spec: &HostNetworkSpec,
    rootfs: Option<&Path>,
    runtime_root: &Path,
    id: &str,
    hostname: Option<&str>,
) -> KrugResult<()> {
    match rootfs {
        Some(rootfs) if spec.system_container => {
            merge_for_system_container(spec, rootfs, hostname)
        }
        _ => netfiles::merge_resolv(spec, &runtime_root.join(id), "/resolv.conf"),
    }
}

fn merge_for_system_container(
    spec: &HostNetworkSpec,
    rootfs: &Path,
    hostname: Option<&str>,
) -> KrugResult<()> {
    if let Some(hostname) = hostname {
        write_hostname_file(rootfs, hostname)?;
    }
    chown_network_file(spec.user_remap.as_deref(), rootfs, "/etc/hostname")?;

    netfiles::merge_hosts(spec, rootfs)?;
    chown_network_file(spec.user_remap.as_deref(), rootfs, "/etc/hosts")?;

    netfiles::merge_resolv(spec, rootfs, "/etc/resolv.conf")?;
    chown_network_file(spec.user_remap.as_deref(), rootfs, "/etc/resolv.conf")
}

/// The daemon host's own hostname.
fn host_hostname() -> KrugResult<String> {
    let raw = std::fs::read_to_string("/proc/sys/kernel/hostname")?;
    Ok(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hostname_falls_back_to_localhost() {
        let root = tempfile::tempdir().unwrap();
        let (hostname, path) =
            create_default_hostname("abc", root.path(), false, None).unwrap();

        assert_eq!(hostname, "localhost");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "localhost\n");
    }

    #[test]
    fn default_hostname_keeps_configured_name() {
        let root = tempfile::tempdir().unwrap();
        let (hostname, _) =
            create_default_hostname("abc", root.path(), false, Some("web-1")).unwrap();
        assert_eq!(hostname, "web-1");
    }

    #[test]
    fn default_hosts_contains_loopback_and_hostname() {
        let root = tempfile::tempdir().unwrap();
        let path = create_default_hosts(
            "abc",
            root.path(),
            false,
            "web-1",
            Path::new("/nonexistent/hosts"),
        )
        .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("127.0.0.1       localhost\n"));
        assert!(content.contains("ff02::2 ip6-allrouters\n"));
        assert!(content.ends_with("127.0.0.1    web-1\n"));
    }

    #[test]
    fn shared_host_copies_host_hosts() {
        let root = tempfile::tempdir().unwrap();
        let host_hosts = root.path().join("host-hosts");
        std::fs::write(&host_hosts, "10.1.1.1 gateway\n").unwrap();

        let path =
            create_default_hosts("abc", root.path(), true, "web-1", &host_hosts).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "10.1.1.1 gateway\n"
        );
    }

    #[test]
    fn default_resolv_uses_fallback_servers() {
        let root = tempfile::tempdir().unwrap();
        let path =
            create_default_resolv_conf("abc", root.path(), Path::new("/nonexistent/resolv"))
                .unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "\nnameserver 8.8.8.8\nnameserver 8.8.4.4\n"
        );
    }

    #[test]
    fn default_resolv_copies_host_file() {
        let root = tempfile::tempdir().unwrap();
        let host_resolv = root.path().join("host-resolv");
        std::fs::write(&host_resolv, "nameserver 192.168.1.1\n").unwrap();

        let path = create_default_resolv_conf("abc", root.path(), &host_resolv).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "nameserver 192.168.1.1\n"
        );
    }

    #[test]
    fn hostname_file_preserves_custom_content() {
        let rootfs = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(rootfs.path().join("etc")).unwrap();
        let path = rootfs.path().join("etc/hostname");
        std::fs::write(&path, "already-named\n").unwrap();

        write_hostname_file(rootfs.path(), "new-name").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "already-named\n");
    }

    #[test]
    fn hostname_file_replaces_localhost() {
        let rootfs = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(rootfs.path().join("etc")).unwrap();
        let path = rootfs.path().join("etc/hostname");
        std::fs::write(&path, "localhost\n").unwrap();

        write_hostname_file(rootfs.path(), "new-name").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new-name");
    }

    #[test]
    fn universal_merge_touches_only_resolv_conf() {
        let runtime_root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(runtime_root.path().join("abc")).unwrap();
        std::fs::write(
            runtime_root.path().join("abc/resolv.conf"),
            "nameserver 1.1.1.1\n",
        )
        .unwrap();

        let spec = HostNetworkSpec {
            dns: vec!["8.8.8.8".to_string()],
            extra_hosts: vec!["db:10.0.0.5".to_string()],
            ..HostNetworkSpec::default()
        };
        merge_network_files(&spec, None, runtime_root.path(), "abc", None).unwrap();

        let resolv =
            std::fs::read_to_string(runtime_root.path().join("abc/resolv.conf")).unwrap();
        assert_eq!(resolv, "nameserver 1.1.1.1\nnameserver 8.8.8.8\n");
        assert!(!runtime_root.path().join("abc/hosts").exists());
    }

    #[test]
    fn system_container_merges_under_rootfs() {
        let rootfs = tempfile::tempdir().unwrap();
        let runtime_root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(rootfs.path().join("etc")).unwrap();
        std::fs::write(rootfs.path().join("etc/hosts"), "127.0.0.1 localhost\n").unwrap();

        let spec = HostNetworkSpec {
            system_container: true,
            extra_hosts: vec!["db:10.0.0.5".to_string()],
            dns: vec!["9.9.9.9".to_string()],
            ..HostNetworkSpec::default()
        };
        merge_network_files(
            &spec,
            Some(rootfs.path()),
            runtime_root.path(),
            "abc",
            Some("sysbox"),
        )
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(rootfs.path().join("etc/hostname")).unwrap(),
            "sysbox"
        );
        assert_eq!(
            std::fs::read_to_string(rootfs.path().join("etc/hosts")).unwrap(),
            "127.0.0.1 localhost\n10.0.0.5 db\n"
        );
        assert_eq!(
            std::fs::read_to_string(rootfs.path().join("etc/resolv.conf")).unwrap(),
            "nameserver 9.9.9.9\n"
        );
    }
}
