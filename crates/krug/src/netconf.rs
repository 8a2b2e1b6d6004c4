//! Network configuration operations on containers.
//!
//! The two entry points here are consumed by the container-creation and
//! start workflows: [`NetworkConfigurator::init_container_network_confs`]
//! materializes a container's network files, and
//! [`NetworkConfigurator::setup_network`] attaches a running container to
//! its declared bridge networks through the plugin backend and persists the
//! outcome.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use krug_common::paths::host;
use krug_common::{KrugError, KrugResult};
use krug_network::backend::{AttachConfig, AttachNetConf, AttachResult, NetworkBackend};
use krug_network::spec::{MAX_NETWORK_NAME_LEN, NetworkMode, validate_network_name};
use krug_network::{IfnameAllocator, NetworkEndpoint, NetworkSettings, defaults};

use crate::container::Container;
use crate::store::ContainerStore;

/// Orchestrates network configuration against the container store and the
/// plugin backend.
pub struct NetworkConfigurator {
    store: Arc<ContainerStore>,
    backend: Arc<dyn NetworkBackend>,
}

impl NetworkConfigurator {
    /// Create a configurator over a store and a plugin backend.
    #[must_use]
    pub fn new(store: Arc<ContainerStore>, backend: Arc<dyn NetworkBackend>) -> Self {
        Self { store, backend }
    }

    /// Validate that the requested networks can be attached.
    ///
    /// Modes other than bridge have nothing to validate. For bridge mode the
    /// list must be non-empty, every name well-formed and within length, and
    /// every network known to an available backend.
    ///
    /// # Errors
    ///
    /// Returns the violation for the first offending name.
    pub fn validate_attach_networks(
        &self,
        mode: &NetworkMode,
        networks: &[String],
    ) -> KrugResult<()> {
        if !mode.is_bridge() {
            return Ok(());
        }

        if networks.is_empty() {
            return Err(KrugError::Config {
                message: "no networks requested for bridge mode".to_string(),
            });
        }

        if !self.backend.is_available() {
            return Err(KrugError::BackendUnavailable);
        }

        for name in networks {
            if !validate_network_name(name) || name.len() > MAX_NETWORK_NAME_LEN {
                return Err(KrugError::InvalidNetworkName { name: name.clone() });
            }
            if !self.backend.exists(name) {
                return Err(KrugError::NetworkNotFound { name: name.clone() });
            }
        }

        Ok(())
    }

    /// Attach a running container to its declared bridge networks.
    ///
    /// A no-op returning success when the network mode is not bridge. On
    /// success the assigned addresses are committed to the container's
    /// network settings under its exclusive lock and the record is persisted;
    /// on any failure the persisted settings are left unchanged.
    ///
    /// # Errors
    ///
    /// Validation, build, backend or commit failures, each carrying the
    /// originating cause.
    pub fn setup_network(&self, cont: &Container) -> KrugResult<()> {
        let spec = cont.host_spec();

        if !spec.network_mode.is_bridge() {
            tracing::debug!(
                container_id = %cont.id(),
                mode = %spec.network_mode,
                "Network mode is not bridge, nothing to set up"
            );
            return Ok(());
        }

        self.validate_attach_networks(&spec.network_mode, &spec.bridge_networks)?;

        let config = self.build_attach_config(cont)?;
        let results = self.backend.attach(&config)?;

        let mut record = cont.lock_record();
        let entries = parse_results(&results)?;
        let settings = record
            .network_settings
            .get_or_insert_with(NetworkSettings::default);
        settings.extend_within_cap(entries)?;
        self.store.save(&record)?;

        tracing::info!(
            container_id = %cont.id(),
            networks = results.len(),
            "Attached container networks"
        );
        Ok(())
    }

    /// Materialize a container's hostname/hosts/resolv.conf files.
    ///
    /// When the container shares another container's network namespace, the
    /// peer's file paths and hostname are adopted by reference and nothing
    /// is written. Otherwise the three files are synthesized under
    /// `<rootpath>/<id>/` and their paths recorded.
    ///
    /// # Errors
    ///
    /// Fails if the referenced peer is missing or is the container itself,
    /// or on any file synthesis error.
    pub fn init_container_network_confs(
        &self,
        cont: &Container,
        rootpath: &Path,
    ) -> KrugResult<()> {
        let spec = cont.host_spec();

        if let Some(peer_id) = spec.network_mode.connected_container() {
            return self.adopt_peer_network_files(cont, peer_id);
        }

        let share_host = spec.network_mode.is_host();
        let id = cont.id().to_string();
        let mut record = cont.lock_record();

        let (hostname, hostname_path) = defaults::create_default_hostname(
            &id,
            rootpath,
            share_host,
            record.hostname.as_deref(),
        )?;
        record.hostname = Some(hostname.clone());
        record.hostname_path = Some(hostname_path);

        record.hosts_path = Some(defaults::create_default_hosts(
            &id,
            rootpath,
            share_host,
            &hostname,
            Path::new(host::ETC_HOSTS),
        )?);

        record.resolv_conf_path = Some(defaults::create_default_resolv_conf(
            &id,
            rootpath,
            Path::new(host::RESOLV_CONF),
        )?);

        Ok(())
    }

    /// Merge the host network specification into a container's network
    /// files at start time.
    ///
    /// # Errors
    ///
    /// Propagates any merge, write or ownership-remap failure.
    pub fn merge_network_files(&self, cont: &Container, rootfs: Option<&Path>) -> KrugResult<()> {
        let record = cont.read_record();
        defaults::merge_network_files(
            cont.host_spec(),
            rootfs,
            &self.store.paths().containers(),
            cont.id().as_str(),
            record.hostname.as_deref(),
        )
    }

    /// Resolve the container whose network namespace `id` wants to join.
    ///
    /// With `check_state` set the peer must also be running and not
    /// restarting.
    ///
    /// # Errors
    ///
    /// Fails when the peer is missing, is the container itself, or fails the
    /// state checks.
    pub fn networked_container(
        &self,
        id: &str,
        connected_id: &str,
        check_state: bool,
    ) -> KrugResult<Arc<Container>> {
        let peer = self
            .store
            .get(connected_id)
            .ok_or_else(|| KrugError::ContainerNotFound {
                id: connected_id.to_string(),
            })?;

        if peer.id().as_str() == id {
            return Err(KrugError::SelfJoin { id: id.to_string() });
        }

        if !check_state {
            return Ok(peer);
        }

        let status = peer.status();
        if !status.is_running() {
            return Err(KrugError::Config {
                message: format!("cannot join network of a non running container: {connected_id}"),
            });
        }
        if status.is_restarting() {
            return Err(KrugError::Config {
                message: format!(
                    "container {connected_id} is restarting, wait until the container is running"
                ),
            });
        }

        Ok(peer)
    }

    fn adopt_peer_network_files(&self, cont: &Container, peer_id: &str) -> KrugResult<()> {
        let peer = self.networked_container(cont.id().as_str(), peer_id, false)?;
        let peer_record = peer.record();

        let mut record = cont.lock_record();
        if let Some(path) = peer_record.hostname_path {
            record.hostname_path = Some(path);
        }
        if let Some(path) = peer_record.hosts_path {
            record.hosts_path = Some(path);
        }
        if let Some(path) = peer_record.resolv_conf_path {
            record.resolv_conf_path = Some(path);
        }
        if let Some(hostname) = peer_record.hostname {
            record.hostname = Some(hostname);
        }

        tracing::debug!(
            container_id = %cont.id(),
            peer = peer_id,
            "Sharing network files with connected container"
        );
        Ok(())
    }

    fn build_attach_config(&self, cont: &Container) -> KrugResult<AttachConfig> {
        let spec = cont.host_spec();
        let record = cont.read_record();

        let pid = record
            .pid
            .filter(|pid| *pid != 0)
            .ok_or_else(|| KrugError::NoNetworkNamespace {
                id: cont.id().to_string(),
            })?;
        let netns_path = format!("/proc/{pid}/ns/net");

        let mut allocator = match record.network_settings.as_ref() {
            Some(settings) => IfnameAllocator::from_settings(settings)?,
            None => IfnameAllocator::default(),
        };

        let mut networks = Vec::with_capacity(spec.bridge_networks.len());
        for name in &spec.bridge_networks {
            networks.push(AttachNetConf {
                name: name.clone(),
                if_name: allocator.next()?,
            });
        }

        let mut args = HashMap::new();
        args.insert("IgnoreUnknown".to_string(), "1".to_string());
        args.insert("K8S_POD_NAMESPACE".to_string(), record.name.clone());
        args.insert("K8S_POD_NAME".to_string(), record.name.clone());
        args.insert(
            "K8S_POD_INFRA_CONTAINER_ID".to_string(),
            cont.id().to_string(),
        );
        if let Some(ip) = &spec.ip {
            args.insert("IP".to_string(), ip.clone());
        }
        if let Some(mac) = &spec.mac_address {
            args.insert("MAC".to_string(), mac.clone());
        }

        Ok(AttachConfig {
            name: record.name.clone(),
            pod_id: cont.id().to_string(),
            netns_path,
            networks,
            args,
        })
    }
}

/// Turn the backend's result set into settings entries.
///
/// Every item is parsed before anything is applied: the first address, when
/// present, must be a single `ip/prefixlen` pair.
fn parse_results(results: &[AttachResult]) -> KrugResult<Vec<(String, NetworkEndpoint)>> {
    if results.is_empty() {
        return Err(KrugError::Backend {
            message: "backend returned no attachment results".to_string(),
        });
    }

    let mut entries = Vec::with_capacity(results.len());
    for item in results {
        let mut endpoint = NetworkEndpoint {
            if_name: item.if_name.clone(),
            mac_address: item.mac.clone(),
            ..NetworkEndpoint::default()
        };

        if let Some(address) = item.ips.first() {
            let invalid = || KrugError::InvalidAddress {
                address: address.clone(),
            };

            let parts: Vec<&str> = address.split('/').collect();
            if parts.len() != 2 || parts[0].is_empty() {
                return Err(invalid());
            }
            let prefix: u32 = parts[1].parse().map_err(|_| invalid())?;

            endpoint.ip_address = Some(parts[0].to_string());
            endpoint.ip_prefix_len = Some(prefix);
        }

        entries.push((item.name.clone(), endpoint));
    }

    Ok(entries)
}
