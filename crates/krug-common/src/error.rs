//! Common error types for the Krug ecosystem.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`KrugError`].
pub type KrugResult<T> = Result<T, KrugError>;

/// Common errors across the Krug ecosystem.
#[derive(Error, Diagnostic, Debug)]
pub enum KrugError {
    /// Container not found.
    #[error("Container not found: {id}")]
    #[diagnostic(code(krug::container::not_found))]
    ContainerNotFound {
        /// The container ID that was not found.
        id: String,
    },

    /// Network not found in the plugin backend registry.
    #[error("Network not found: {name}")]
    #[diagnostic(code(krug::network::not_found))]
    NetworkNotFound {
        /// The network name that was not found.
        name: String,
    },

    /// Invalid container ID format.
    #[error("Invalid container ID: {id}")]
    #[diagnostic(
        code(krug::container::invalid_id),
        help("Container IDs must be alphanumeric with hyphens and underscores, 1-64 characters")
    )]
    InvalidContainerId {
        /// The invalid container ID.
        id: String,
    },

    /// Invalid network name.
    #[error("Invalid network name: {name}")]
    #[diagnostic(
        code(krug::network::invalid_name),
        help("Network names start with an alphanumeric character and may contain '.', '_' and '-', 128 characters max")
    )]
    InvalidNetworkName {
        /// The offending network name.
        name: String,
    },

    /// Malformed extra-hosts entry.
    #[error("Extra host '{entry}' format error")]
    #[diagnostic(
        code(krug::netfiles::invalid_extra_host),
        help("Extra hosts use the form 'name:ip', e.g. 'db:10.0.0.5'")
    )]
    InvalidExtraHost {
        /// The entry that failed to parse.
        entry: String,
    },

    /// Address returned by the backend failed to parse.
    #[error("Invalid address: {address}")]
    #[diagnostic(
        code(krug::network::invalid_address),
        help("Backend addresses use the form 'ip/prefixlen', e.g. '10.1.0.7/16'")
    )]
    InvalidAddress {
        /// The address that failed to parse.
        address: String,
    },

    /// Malformed user-remap specification.
    #[error("Invalid user remap: {value}")]
    #[diagnostic(
        code(krug::config::invalid_user_remap),
        help("User remaps use the form 'uid:gid:size', all numeric")
    )]
    InvalidUserRemap {
        /// The value that failed to parse.
        value: String,
    },

    /// A container attempted to join its own network namespace.
    #[error("Container {id} cannot join its own network")]
    #[diagnostic(code(krug::network::self_join))]
    SelfJoin {
        /// The container ID.
        id: String,
    },

    /// Two persisted network entries claim the same interface name.
    #[error("Interface name conflict: {name}")]
    #[diagnostic(
        code(krug::network::duplicate_interface),
        help("The persisted network settings are corrupt; detach the conflicting networks")
    )]
    DuplicateInterface {
        /// The conflicting interface name.
        name: String,
    },

    /// No free interface name below the allocation ceiling.
    #[error("No available interface name")]
    #[diagnostic(code(krug::network::ifnames_exhausted))]
    IfnamesExhausted,

    /// The per-container network count cap would be exceeded.
    #[error("Too many networks, limit is {limit}")]
    #[diagnostic(code(krug::network::too_many))]
    TooManyNetworks {
        /// Maximum number of networks a container may join.
        limit: usize,
    },

    /// The container has no live network namespace.
    #[error("Cannot find network namespace for the terminated container {id}")]
    #[diagnostic(code(krug::network::no_namespace))]
    NoNetworkNamespace {
        /// The container ID.
        id: String,
    },

    /// A path escaped the container rootfs.
    #[error("Path escapes rootfs scope: {path}")]
    #[diagnostic(code(krug::fs::unsafe_path))]
    UnsafePath {
        /// The offending path.
        path: String,
    },

    /// The plugin backend is not available.
    #[error("No available network backend")]
    #[diagnostic(code(krug::backend::unavailable))]
    BackendUnavailable,

    /// The plugin backend failed an invocation.
    #[error("Network backend error: {message}")]
    #[diagnostic(code(krug::backend::failed))]
    Backend {
        /// The backend's error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(krug::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(krug::serialization))]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(krug::config))]
    Config {
        /// The error message.
        message: String,
    },
}

impl From<serde_json::Error> for KrugError {
    fn from(err: serde_json::Error) -> Self {
        KrugError::Serialization(err.to_string())
    }
}
