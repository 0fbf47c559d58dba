//! Real landmark <-> map replica linking.
//!
//! Links are implied by names: a real landmark `LandmarkGaze_3` pairs with
//! the replica `LandmarkReplicasGaze_3(Clone)`. The resolver turns that
//! convention into an id map once per scene setup and only falls back to a
//! name lookup for entities spawned after the map was built.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{DEFAULT_REAL_PREFIX, DEFAULT_REPLICA_PREFIX, DEFAULT_REPLICA_SUFFIX};
use crate::scene::{EntityId, EntityRegistry};

/// Which side of a link an entity sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRole {
    Real,
    Replica,
}

/// Prefix/suffix convention pairing real landmarks with replicas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    pub real_prefix: String,
    pub replica_prefix: String,
    pub replica_suffix: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            real_prefix: DEFAULT_REAL_PREFIX.to_string(),
            replica_prefix: DEFAULT_REPLICA_PREFIX.to_string(),
            replica_suffix: DEFAULT_REPLICA_SUFFIX.to_string(),
        }
    }
}

impl NamingConvention {
    pub fn new(real_prefix: &str, replica_prefix: &str, replica_suffix: &str) -> Self {
        Self {
            real_prefix: real_prefix.to_string(),
            replica_prefix: replica_prefix.to_string(),
            replica_suffix: replica_suffix.to_string(),
        }
    }

    /// Role implied by `name`, or `None` for unrelated entities.
    ///
    /// When one prefix extends the other the longer one wins.
    pub fn role(&self, name: &str) -> Option<LinkRole> {
        let real = !self.real_prefix.is_empty() && name.starts_with(&self.real_prefix);
        let replica = !self.replica_prefix.is_empty() && name.starts_with(&self.replica_prefix);
        match (real, replica) {
            (true, true) if self.replica_prefix.len() >= self.real_prefix.len() => {
                Some(LinkRole::Replica)
            }
            (true, _) => Some(LinkRole::Real),
            (false, true) => Some(LinkRole::Replica),
            (false, false) => None,
        }
    }

    /// Name the counterpart of `name` must carry.
    pub fn counterpart_name(&self, name: &str) -> Option<String> {
        match self.role(name)? {
            LinkRole::Real => {
                let rest = name.strip_prefix(&self.real_prefix)?;
                Some(format!(
                    "{}{}{}",
                    self.replica_prefix, rest, self.replica_suffix
                ))
            }
            LinkRole::Replica => {
                let rest = name.strip_prefix(&self.replica_prefix)?;
                let rest = rest.strip_suffix(&self.replica_suffix).unwrap_or(rest);
                Some(format!("{}{}", self.real_prefix, rest))
            }
        }
    }
}

/// Bidirectional id map built from a [`NamingConvention`].
#[derive(Clone, Debug, Default)]
pub struct CounterpartResolver {
    naming: NamingConvention,
    links: HashMap<EntityId, EntityId>,
    roles: HashMap<EntityId, LinkRole>,
}

impl CounterpartResolver {
    pub fn new(naming: NamingConvention) -> Self {
        Self {
            naming,
            links: HashMap::new(),
            roles: HashMap::new(),
        }
    }

    pub fn naming(&self) -> &NamingConvention {
        &self.naming
    }

    /// Number of linked pairs.
    pub fn len(&self) -> usize {
        self.links.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Rebuild the map from every live entity in `registry`.
    pub fn rebuild<R: EntityRegistry + ?Sized>(&mut self, registry: &R) {
        self.links.clear();
        self.roles.clear();

        for id in registry.entities() {
            let Some(name) = registry.name(id) else {
                continue;
            };
            if self.naming.role(name) != Some(LinkRole::Real) {
                continue;
            }
            if let Some(other) = self.lookup_by_name(registry, name) {
                self.link(id, LinkRole::Real, other);
            }
        }
        debug!(pairs = self.len(), "counterpart map rebuilt");
    }

    /// Counterpart of `id`, or `None` if no entity carries the derived name.
    pub fn resolve<R: EntityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        id: EntityId,
    ) -> Option<EntityId> {
        if let Some(&other) = self.links.get(&id) {
            if registry.name(other).is_some() && registry.name(id).is_some() {
                return Some(other);
            }
            // One side was destroyed since the map was built
            self.unlink(id);
        }

        let name = registry.name(id)?;
        let Some(role) = self.naming.role(name) else {
            warn!(entity = %id, name, "entity does not follow the landmark naming convention");
            return None;
        };
        match self.lookup_by_name(registry, name) {
            Some(other) => {
                self.link(id, role, other);
                Some(other)
            }
            None => {
                warn!(entity = %id, name, "counterpart not found");
                None
            }
        }
    }

    /// Role of `id` under the naming convention.
    pub fn role<R: EntityRegistry + ?Sized>(&self, registry: &R, id: EntityId) -> Option<LinkRole> {
        if let Some(role) = self.roles.get(&id) {
            return Some(*role);
        }
        registry.name(id).and_then(|n| self.naming.role(n))
    }

    fn lookup_by_name<R: EntityRegistry + ?Sized>(&self, registry: &R, name: &str) -> Option<EntityId> {
        let target = self.naming.counterpart_name(name)?;
        registry.find(&target)
    }

    fn link(&mut self, id: EntityId, role: LinkRole, other: EntityId) {
        let other_role = match role {
            LinkRole::Real => LinkRole::Replica,
            LinkRole::Replica => LinkRole::Real,
        };
        self.links.insert(id, other);
        self.links.insert(other, id);
        self.roles.insert(id, role);
        self.roles.insert(other, other_role);
    }

    fn unlink(&mut self, id: EntityId) {
        if let Some(other) = self.links.remove(&id) {
            self.links.remove(&other);
            self.roles.remove(&other);
        }
        self.roles.remove(&id);
    }
}
