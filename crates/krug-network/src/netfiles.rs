//! Line-oriented merging of container network files.
//!
//! Reconciles an existing `hosts` or `resolv.conf` against the host network
//! specification: comments and well-formed existing lines are preserved in
//! their original order, and entries from the specification are appended only
//! when not already present.

use std::collections::HashSet;
use std::path::Path;

use krug_common::{KrugError, KrugResult};

use crate::fsutil::{self, NETWORK_FILE_MODE};
use crate::spec::HostNetworkSpec;

/// Merge `extra_hosts` entries into `/etc/hosts` under a rootfs.
///
/// A missing file is treated as empty and created by the final write.
///
/// # Errors
///
/// Fails on I/O errors or on a malformed `extra_hosts` entry; in the latter
/// case the file is left untouched.
pub fn merge_hosts(spec: &HostNetworkSpec, rootfs: &Path) -> KrugResult<()> {
    let path = fsutil::scoped_join(rootfs, "/etc/hosts")?;
    let existing = fsutil::read_or_empty(&path)?;
    let merged = merge_hosts_content(&existing, &spec.extra_hosts)?;
    fsutil::write_file(&path, &merged, NETWORK_FILE_MODE)
}

/// Merge DNS servers, search domains and options into a resolver file
/// under a rootfs.
///
/// `resolv_path` is the file's path relative to the rootfs (usually
/// `/etc/resolv.conf`). A missing file is treated as empty and created by
/// the final write.
///
/// # Errors
///
/// Fails only on I/O errors; malformed lines inside the file are skipped.
pub fn merge_resolv(spec: &HostNetworkSpec, rootfs: &Path, resolv_path: &str) -> KrugResult<()> {
    let path = fsutil::scoped_join(rootfs, resolv_path)?;
    let existing = fsutil::read_or_empty(&path)?;
    let merged = merge_resolv_content(&existing, spec);
    fsutil::write_file(&path, &merged, NETWORK_FILE_MODE)
}

/// Produce merged hosts content from the existing file body.
///
/// Comment lines pass through verbatim. Content lines are tokenized on
/// whitespace into `(ip, name)`; lines yielding both fields are kept and
/// keyed as `ip:name`, anything else is dropped. Each `name:ip` entry from
/// `extra_hosts` not already keyed is appended as `"<ip> <name>\n"`.
///
/// # Errors
///
/// Returns [`KrugError::InvalidExtraHost`] for an entry without both a name
/// and an IP, before anything is emitted for it.
pub fn merge_hosts_content(existing: &str, extra_hosts: &[String]) -> KrugResult<String> {
    let mut content = String::with_capacity(existing.len());
    let mut seen: HashSet<String> = HashSet::new();

    for line in existing.lines() {
        if line.starts_with('#') {
            content.push_str(line);
            content.push('\n');
            continue;
        }

        let mut fields = line.split_whitespace();
        if let (Some(ip), Some(name)) = (fields.next(), fields.next()) {
            seen.insert(format!("{ip}:{name}"));
            content.push_str(line);
            content.push('\n');
        }
    }

    for entry in extra_hosts {
        let (name, ip) = split_extra_host(entry)?;
        if seen.insert(format!("{ip}:{name}")) {
            content.push_str(ip);
            content.push(' ');
            content.push_str(name);
            content.push('\n');
        }
    }

    Ok(content)
}

/// Split a `name:ip` extra-host entry on its first separator, so IPv6
/// addresses in the ip part survive.
fn split_extra_host(entry: &str) -> KrugResult<(&str, &str)> {
    entry
        .split_once(':')
        .filter(|(name, ip)| !name.is_empty() && !ip.is_empty())
        .ok_or_else(|| KrugError::InvalidExtraHost {
            entry: entry.to_string(),
        })
}

/// Produce merged resolver content from the existing file body.
///
/// Lines are classified by their first token. `search` and `options` lines
/// absorb missing specification entries onto the same logical line;
/// `nameserver` lines record the address already present. Any other content
/// line passes through unmodified. Blank lines are dropped, and a malformed
/// line is logged and skipped rather than failing the merge.
#[must_use]
pub fn merge_resolv_content(existing: &str, spec: &HostNetworkSpec) -> String {
    let mut content = String::with_capacity(existing.len());
    let mut dns_seen: HashSet<String> = HashSet::new();
    let mut search_handled = false;
    let mut options_handled = false;

    for line in existing.lines() {
        if line.starts_with('#') {
            content.push_str(line);
            content.push('\n');
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(directive) = tokens.next() else {
            continue;
        };

        match directive {
            "search" => {
                search_handled = true;
                append_inline(&mut content, line, tokens, &spec.dns_search);
            }
            "options" => {
                options_handled = true;
                append_inline(&mut content, line, tokens, &spec.dns_options);
            }
            "nameserver" => {
                if let Some(addr) = tokens.next() {
                    dns_seen.insert(addr.to_string());
                    content.push_str(line);
                    content.push('\n');
                } else {
                    tracing::warn!(line, "Failed to handle resolv config line, skip");
                }
            }
            _ => {
                content.push_str(line);
                content.push('\n');
            }
        }
    }

    for server in &spec.dns {
        if dns_seen.insert(server.clone()) {
            content.push_str("nameserver ");
            content.push_str(server);
            content.push('\n');
        }
    }

    if !search_handled {
        append_directive(&mut content, "search", &spec.dns_search);
    }
    if !options_handled {
        append_directive(&mut content, "options", &spec.dns_options);
    }

    content
}

/// Keep an existing `search`/`options` line and extend it in place with the
/// specification entries it does not already carry.
fn append_inline<'a>(
    content: &mut String,
    line: &str,
    present: impl Iterator<Item = &'a str>,
    wanted: &[String],
) {
    let mut seen: HashSet<String> = present.map(str::to_string).collect();

    content.push_str(line);
    for entry in wanted {
        if seen.insert(entry.clone()) {
            content.push(' ');
            content.push_str(entry);
        }
    }
    content.push('\n');
}

/// Synthesize a `search`/`options` line for entries the file never declared.
fn append_directive(content: &mut String, directive: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let unique: Vec<&str> = entries
        .iter()
        .map(String::as_str)
        .filter(|e| seen.insert(e))
        .collect();

    content.push_str(directive);
    for entry in unique {
        content.push(' ');
        content.push_str(entry);
    }
    content.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(dns: &[&str], search: &[&str], options: &[&str]) -> HostNetworkSpec {
        HostNetworkSpec {
            dns: dns.iter().map(ToString::to_string).collect(),
            dns_search: search.iter().map(ToString::to_string).collect(),
            dns_options: options.iter().map(ToString::to_string).collect(),
            ..HostNetworkSpec::default()
        }
    }

    #[test]
    fn hosts_merge_appends_missing_entry() {
        let merged = merge_hosts_content(
            "# comment\n127.0.0.1 localhost\n",
            &["foo:10.0.0.5".to_string()],
        )
        .unwrap();
        assert_eq!(merged, "# comment\n127.0.0.1 localhost\n10.0.0.5 foo\n");
    }

    #[test]
    fn hosts_merge_is_idempotent() {
        let extra = vec!["foo:10.0.0.5".to_string(), "bar:10.0.0.6".to_string()];
        let once = merge_hosts_content("127.0.0.1 localhost\n", &extra).unwrap();
        let twice = merge_hosts_content(&once, &extra).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn hosts_merge_skips_present_entries() {
        let merged = merge_hosts_content(
            "10.0.0.5 foo\n",
            &["foo:10.0.0.5".to_string(), "foo:10.0.0.9".to_string()],
        )
        .unwrap();
        assert_eq!(merged, "10.0.0.5 foo\n10.0.0.9 foo\n");
    }

    #[test]
    fn hosts_merge_dedupes_within_extra_hosts() {
        let merged = merge_hosts_content(
            "",
            &["foo:10.0.0.5".to_string(), "foo:10.0.0.5".to_string()],
        )
        .unwrap();
        assert_eq!(merged, "10.0.0.5 foo\n");
    }

    #[test]
    fn hosts_merge_drops_malformed_existing_lines() {
        let merged = merge_hosts_content("\nonly-one-field\n10.0.0.1 db\n", &[]).unwrap();
        assert_eq!(merged, "10.0.0.1 db\n");
    }

    #[test]
    fn hosts_merge_rejects_malformed_extra_host() {
        for entry in ["nofield", "name:", ":10.0.0.5"] {
            let err = merge_hosts_content("", &[entry.to_string()]).unwrap_err();
            assert!(matches!(err, KrugError::InvalidExtraHost { .. }), "{entry}");
        }
    }

    #[test]
    fn hosts_merge_keeps_ipv6_extra_host() {
        let merged = merge_hosts_content("", &["v6host:fe80::1".to_string()]).unwrap();
        assert_eq!(merged, "fe80::1 v6host\n");
    }

    #[test]
    fn resolv_merge_appends_servers_and_search() {
        let spec = spec_with(&["8.8.8.8"], &["example.com"], &[]);
        let merged = merge_resolv_content("nameserver 1.1.1.1\n", &spec);
        assert_eq!(
            merged,
            "nameserver 1.1.1.1\nnameserver 8.8.8.8\nsearch example.com\n"
        );
    }

    #[test]
    fn resolv_merge_extends_search_line_in_place() {
        let spec = spec_with(&[], &["a.com", "b.com"], &[]);
        let merged = merge_resolv_content("search a.com c.com\n", &spec);
        assert_eq!(merged, "search a.com c.com b.com\n");
    }

    #[test]
    fn resolv_merge_extends_options_line_in_place() {
        let spec = spec_with(&[], &[], &["timeout:2", "ndots:1"]);
        let merged = merge_resolv_content("options ndots:1\n", &spec);
        assert_eq!(merged, "options ndots:1 timeout:2\n");
    }

    #[test]
    fn resolv_merge_never_duplicates_servers() {
        let spec = spec_with(&["1.1.1.1", "8.8.8.8", "1.1.1.1"], &[], &[]);
        let merged = merge_resolv_content("nameserver 8.8.8.8\n# keep\n", &spec);
        assert_eq!(merged, "nameserver 8.8.8.8\n# keep\nnameserver 1.1.1.1\n");
    }

    #[test]
    fn resolv_merge_synthesizes_options_line() {
        let spec = spec_with(&[], &[], &["use-vc", "rotate"]);
        let merged = merge_resolv_content("", &spec);
        assert_eq!(merged, "options use-vc rotate\n");
    }

    #[test]
    fn resolv_merge_omits_empty_directives() {
        let spec = spec_with(&["8.8.8.8"], &[], &[]);
        let merged = merge_resolv_content("", &spec);
        assert_eq!(merged, "nameserver 8.8.8.8\n");
    }

    #[test]
    fn resolv_merge_passes_unknown_lines_through() {
        let spec = spec_with(&[], &[], &[]);
        let merged = merge_resolv_content("domain example.org\nsortlist 10.0.0.0\n", &spec);
        assert_eq!(merged, "domain example.org\nsortlist 10.0.0.0\n");
    }

    #[test]
    fn resolv_merge_skips_blank_and_malformed_lines() {
        let spec = spec_with(&["9.9.9.9"], &[], &[]);
        let merged = merge_resolv_content("\n   \nnameserver\nnameserver 1.1.1.1\n", &spec);
        assert_eq!(merged, "nameserver 1.1.1.1\nnameserver 9.9.9.9\n");
    }

    #[test]
    fn resolv_merge_is_idempotent() {
        let spec = spec_with(&["8.8.8.8"], &["example.com"], &["ndots:2"]);
        let once = merge_resolv_content("nameserver 1.1.1.1\n", &spec);
        let twice = merge_resolv_content(&once, &spec);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_writes_into_rootfs() {
        let rootfs = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(rootfs.path().join("etc")).unwrap();
        std::fs::write(rootfs.path().join("etc/hosts"), "127.0.0.1 localhost\n").unwrap();

        let spec = HostNetworkSpec {
            extra_hosts: vec!["db:10.0.0.7".to_string()],
            ..HostNetworkSpec::default()
        };
        merge_hosts(&spec, rootfs.path()).unwrap();

        let content = std::fs::read_to_string(rootfs.path().join("etc/hosts")).unwrap();
        assert_eq!(content, "127.0.0.1 localhost\n10.0.0.7 db\n");
    }

    #[test]
    fn merge_creates_missing_resolv_conf() {
        let rootfs = tempfile::tempdir().unwrap();
        let spec = spec_with(&["8.8.4.4"], &[], &[]);

        merge_resolv(&spec, rootfs.path(), "/etc/resolv.conf").unwrap();

        let content = std::fs::read_to_string(rootfs.path().join("etc/resolv.conf")).unwrap();
        assert_eq!(content, "nameserver 8.8.4.4\n");
    }

    #[test]
    fn malformed_extra_host_leaves_file_untouched() {
        let rootfs = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(rootfs.path().join("etc")).unwrap();
        std::fs::write(rootfs.path().join("etc/hosts"), "10.0.0.1 db\n").unwrap();

        let spec = HostNetworkSpec {
            extra_hosts: vec!["broken".to_string()],
            ..HostNetworkSpec::default()
        };
        assert!(merge_hosts(&spec, rootfs.path()).is_err());

        let content = std::fs::read_to_string(rootfs.path().join("etc/hosts")).unwrap();
        assert_eq!(content, "10.0.0.1 db\n");
    }
}
