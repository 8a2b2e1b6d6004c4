//! # krug-network
//!
//! Network-configuration primitives for Krug containers.
//!
//! This crate materializes a container's network files (`hostname`, `hosts`,
//! `resolv.conf`) from a host-level network specification, and carries the
//! building blocks the daemon uses to attach containers to declared networks
//! through a plugin backend: interface-name allocation, the attach
//! request/response contract, and the persisted per-container settings.

#![warn(missing_docs)]

pub mod backend;
pub mod defaults;
pub mod fsutil;
pub mod ifname;
pub mod netfiles;
pub mod settings;
pub mod spec;

pub use backend::{AttachConfig, AttachNetConf, AttachResult, BackendKind, NetworkBackend};
pub use ifname::IfnameAllocator;
pub use settings::{MAX_NETWORKS, NetworkEndpoint, NetworkSettings};
pub use spec::{HostNetworkSpec, NetworkMode, UserRemap};
