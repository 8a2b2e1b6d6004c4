//! Container interface-name allocation.

use std::collections::HashSet;

use krug_common::{KrugError, KrugResult};

use crate::settings::NetworkSettings;

/// Hard ceiling on the `eth<N>` naming sequence.
pub const IFNAME_MAX: usize = 10_000;

/// Tracks the interface names reserved for one container while an attach
/// request is being built, so repeated allocations never collide.
#[derive(Debug, Default)]
pub struct IfnameAllocator {
    reserved: HashSet<String>,
}

impl IfnameAllocator {
    /// Build the reservation set from a container's persisted settings.
    ///
    /// # Errors
    ///
    /// Returns [`KrugError::DuplicateInterface`] when two persisted entries
    /// claim the same interface name; that is a corruption signal and the
    /// caller must abort rather than continue.
    pub fn from_settings(settings: &NetworkSettings) -> KrugResult<Self> {
        let mut reserved = HashSet::new();

        for (network, endpoint) in settings.iter() {
            if endpoint.if_name.is_empty() {
                tracing::warn!(network, "network doesn't have an interface name");
                continue;
            }
            if !reserved.insert(endpoint.if_name.clone()) {
                return Err(KrugError::DuplicateInterface {
                    name: endpoint.if_name.clone(),
                });
            }
        }

        Ok(Self { reserved })
    }

    /// Mark a name as reserved. Returns false if it already was.
    pub fn reserve(&mut self, name: impl Into<String>) -> bool {
        self.reserved.insert(name.into())
    }

    /// Allocate the lowest free `eth<N>` name and mark it reserved.
    ///
    /// # Errors
    ///
    /// Returns [`KrugError::IfnamesExhausted`] when every name below the
    /// ceiling is taken.
    pub fn next(&mut self) -> KrugResult<String> {
        for index in 0..IFNAME_MAX {
            let candidate = format!("eth{index}");
            if self.reserved.contains(&candidate) {
                continue;
            }
            self.reserved.insert(candidate.clone());
            return Ok(candidate);
        }

        tracing::error!("Failed to find available ifname");
        Err(KrugError::IfnamesExhausted)
    }
}
