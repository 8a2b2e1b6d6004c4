//! # krug
//!
//! Daemon-side container glue for the Krug network-configuration subsystem.
//!
//! This crate owns the container record and registry, persists network
//! settings to durable storage, and exposes the two operations consumed by
//! the container-creation and start workflows:
//!
//! - [`NetworkConfigurator::init_container_network_confs`] materializes a
//!   container's hostname/hosts/resolv.conf files;
//! - [`NetworkConfigurator::setup_network`] attaches a running container to
//!   its declared bridge networks through the plugin backend.

#![warn(missing_docs)]

pub mod container;
pub mod netconf;
pub mod state;
pub mod store;

pub use container::{Container, ContainerRecord};
pub use netconf::NetworkConfigurator;
pub use state::ContainerStatus;
pub use store::ContainerStore;
