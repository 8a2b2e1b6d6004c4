//! Host-level network specification for a container.

use serde::{Deserialize, Serialize};
use std::fmt;

use krug_common::{KrugError, KrugResult};

/// Prefix marking a mode that shares another container's network namespace.
const CONTAINER_MODE_PREFIX: &str = "container:";

/// Maximum length of a network name accepted for attachment.
pub const MAX_NETWORK_NAME_LEN: usize = 128;

/// The network portion of a container's host configuration.
///
/// Owned by the container record; immutable for the duration of any single
/// network-configuration operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostNetworkSpec {
    /// User-declared hostname-to-IP mappings, each in `name:ip` form.
    pub extra_hosts: Vec<String>,
    /// DNS servers to make available inside the container.
    pub dns: Vec<String>,
    /// DNS search domains.
    pub dns_search: Vec<String>,
    /// DNS resolver options.
    pub dns_options: Vec<String>,
    /// How the container's network namespace is set up.
    pub network_mode: NetworkMode,
    /// Whether this is a system container (network files live under an
    /// externally supplied rootfs and are configured via direct merge).
    pub system_container: bool,
    /// Optional `uid:gid:size` remap applied to generated network files.
    pub user_remap: Option<String>,
    /// Networks to attach to when the mode is bridge.
    pub bridge_networks: Vec<String>,
    /// User-requested IP hint passed through to the plugin backend.
    pub ip: Option<String>,
    /// User-requested MAC hint passed through to the plugin backend.
    pub mac_address: Option<String>,
}

/// Classified network mode of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkMode {
    /// Share the daemon host's network namespace.
    Host,
    /// Share the network namespace of another container.
    Container(String),
    /// Attach to named networks through the plugin backend.
    #[default]
    Bridge,
    /// No networking.
    None,
    /// An unrecognized mode string, passed through untouched.
    Other(String),
}

impl NetworkMode {
    /// Classify a mode string.
    #[must_use]
    pub fn parse(mode: &str) -> Self {
        match mode {
            "host" => Self::Host,
            "bridge" => Self::Bridge,
            "none" => Self::None,
            m => m.strip_prefix(CONTAINER_MODE_PREFIX).map_or_else(
                || Self::Other(mode.to_string()),
                |id| Self::Container(id.to_string()),
            ),
        }
    }

    /// Whether the container shares the host's network namespace.
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    /// Whether the container attaches to bridge networks.
    #[must_use]
    pub const fn is_bridge(&self) -> bool {
        matches!(self, Self::Bridge)
    }

    /// Whether the container has no networking at all.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The ID of the container whose namespace is shared, if any.
    #[must_use]
    pub fn connected_container(&self) -> Option<&str> {
        match self {
            Self::Container(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Bridge => write!(f, "bridge"),
            Self::None => write!(f, "none"),
            Self::Container(id) => write!(f, "{CONTAINER_MODE_PREFIX}{id}"),
            Self::Other(mode) => write!(f, "{mode}"),
        }
    }
}

impl From<String> for NetworkMode {
    fn from(mode: String) -> Self {
        Self::parse(&mode)
    }
}

impl From<NetworkMode> for String {
    fn from(mode: NetworkMode) -> Self {
        mode.to_string()
    }
}

/// A parsed `uid:gid:size` ownership remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRemap {
    /// Host uid the container's root maps to.
    pub uid: u32,
    /// Host gid the container's root maps to.
    pub gid: u32,
    /// Size of the mapped range.
    pub size: u32,
}

impl UserRemap {
    /// Parse a `uid:gid:size` string.
    ///
    /// # Errors
    ///
    /// Returns [`KrugError::InvalidUserRemap`] unless all three fields are
    /// present and numeric.
    pub fn parse(value: &str) -> KrugResult<Self> {
        let invalid = || KrugError::InvalidUserRemap {
            value: value.to_string(),
        };

        let mut fields = value.split(':');
        let uid = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
        let gid = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
        let size = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
        if fields.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { uid, gid, size })
    }
}

/// Whether a name is acceptable as a network name.
///
/// Names start with an ASCII alphanumeric character and may contain `.`,
/// `_` and `-` afterwards.
#[must_use]
pub fn validate_network_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}
