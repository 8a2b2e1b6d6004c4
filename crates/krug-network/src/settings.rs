//! Persisted per-container network settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use krug_common::{KrugError, KrugResult};

/// Maximum number of networks a container may be attached to.
pub const MAX_NETWORKS: usize = 200;

/// The recorded outcome of attaching one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEndpoint {
    /// Interface name inside the container (e.g. `eth0`).
    pub if_name: String,
    /// Assigned IP address, if the backend reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Prefix length of the assigned address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_prefix_len: Option<u32>,
    /// Assigned MAC address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// Mapping from network name to the endpoint recorded for it.
///
/// Created lazily on first successful attach, only ever extended afterwards,
/// and bounded by [`MAX_NETWORKS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkSettings {
    networks: HashMap<String, NetworkEndpoint>,
}

impl NetworkSettings {
    /// Number of attached networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Whether no network is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Endpoint recorded for a network, if attached.
    #[must_use]
    pub fn get(&self, network: &str) -> Option<&NetworkEndpoint> {
        self.networks.get(network)
    }

    /// Whether a network is attached.
    #[must_use]
    pub fn contains(&self, network: &str) -> bool {
        self.networks.contains_key(network)
    }

    /// Iterate over `(network name, endpoint)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NetworkEndpoint)> {
        self.networks.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Record an endpoint for a network.
    pub fn insert(&mut self, network: impl Into<String>, endpoint: NetworkEndpoint) {
        self.networks.insert(network.into(), endpoint);
    }

    /// Record a batch of endpoints, refusing the whole batch if it would
    /// push the mapping past [`MAX_NETWORKS`].
    ///
    /// The cap is checked against the pre-existing count plus the incoming
    /// count before anything is applied, so a failure leaves prior entries
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`KrugError::TooManyNetworks`] when the batch does not fit.
    pub fn extend_within_cap(
        &mut self,
        entries: Vec<(String, NetworkEndpoint)>,
    ) -> KrugResult<()> {
        if self.networks.len() + entries.len() > MAX_NETWORKS {
            return Err(KrugError::TooManyNetworks {
                limit: MAX_NETWORKS,
            });
        }

        for (network, endpoint) in entries {
            self.networks.insert(network, endpoint);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(if_name: &str) -> NetworkEndpoint {
        NetworkEndpoint {
            if_name: if_name.to_string(),
            ..NetworkEndpoint::default()
        }
    }

    #[test]
    fn insert_and_lookup() {
        let mut settings = NetworkSettings::default();
        settings.insert("frontend", endpoint("eth0"));

        assert_eq!(settings.len(), 1);
        assert!(settings.contains("frontend"));
        assert_eq!(settings.get("frontend").unwrap().if_name, "eth0");
    }

    #[test]
    fn batch_within_cap_is_applied() {
        let mut settings = NetworkSettings::default();
        settings
            .extend_within_cap(vec![
                ("a".to_string(), endpoint("eth0")),
                ("b".to_string(), endpoint("eth1")),
            ])
            .unwrap();
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn batch_past_cap_is_rejected_untouched() {
        let mut settings = NetworkSettings::default();
        for i in 0..MAX_NETWORKS {
            settings.insert(format!("net{i}"), endpoint(&format!("eth{i}")));
        }

        let err = settings
            .extend_within_cap(vec![("extra".to_string(), endpoint("eth9999"))])
            .unwrap_err();
        assert!(matches!(err, KrugError::TooManyNetworks { limit: MAX_NETWORKS }));
        assert_eq!(settings.len(), MAX_NETWORKS);
        assert!(!settings.contains("extra"));
    }

    #[test]
    fn settings_serialize_as_plain_map() {
        let mut settings = NetworkSettings::default();
        settings.insert(
            "frontend",
            NetworkEndpoint {
                if_name: "eth0".to_string(),
                ip_address: Some("10.1.0.7".to_string()),
                ip_prefix_len: Some(16),
                mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
            },
        );

        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"frontend\""));
        assert!(json.contains("\"ifName\":\"eth0\""));

        let back: NetworkSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
