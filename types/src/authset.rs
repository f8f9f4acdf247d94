//! The authority roster and its majority arithmetic.
//!
//! An [`AuthSet`] lists every authority known for an election together with its
//! [`Role`]. Insertion order is significant: it is the deterministic tie-break
//! used when enumerating federated servers (vote factories, explorer targets)
//! and when ranking audit servers as volunteers.
//!
//! The roster is built once, before any round exists, and is treated as
//! immutable afterwards. `Clone` produces a fully independent copy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{AuthSetError, Identity};

/// The role an authority plays for the lifetime of an election.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// In the active leader rotation; votes in elections.
    Federated,
    /// Standby authority; may volunteer to replace a stalled leader.
    Audit,
    /// Known to the roster but neither voting nor volunteering.
    Neither,
}

#[derive(Clone, Debug, Default)]
pub struct AuthSet {
    members: Vec<(Identity, Role)>,
    index: HashMap<Identity, usize>,
    /// `federated / 2 + 1`, computed on first use and reset by `add`.
    majority: OnceLock<usize>,
}

impl AuthSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an authority, returning its position in insertion order.
    pub fn add(&mut self, id: Identity, role: Role) -> Result<usize, AuthSetError> {
        if self.index.contains_key(&id) {
            return Err(AuthSetError::DuplicateIdentity(id));
        }
        let position = self.members.len();
        self.members.push((id, role));
        self.index.insert(id, position);
        self.majority = OnceLock::new();
        Ok(position)
    }

    /// Number of matching federated signatures needed for a decision.
    pub fn majority(&self) -> usize {
        *self
            .majority
            .get_or_init(|| self.federated_count() / 2 + 1)
    }

    pub fn federated_count(&self) -> usize {
        self.members
            .iter()
            .filter(|(_, role)| *role == Role::Federated)
            .count()
    }

    pub fn role(&self, id: &Identity) -> Option<Role> {
        self.index.get(id).map(|&i| self.members[i].1)
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.index.contains_key(id)
    }

    /// True iff `id` is a federated server. Unknown identities are not leaders.
    pub fn is_leader(&self, id: &Identity) -> bool {
        self.role(id) == Some(Role::Federated)
    }

    pub fn is_audit(&self, id: &Identity) -> bool {
        self.role(id) == Some(Role::Audit)
    }

    /// Federated identities in insertion order.
    pub fn federated_identities(&self) -> Vec<Identity> {
        self.with_role(Role::Federated)
    }

    /// Audit identities in insertion order.
    pub fn audit_identities(&self) -> Vec<Identity> {
        self.with_role(Role::Audit)
    }

    /// Position of `id` among the federated servers.
    pub fn federated_index(&self, id: &Identity) -> Option<usize> {
        self.federated_identities().iter().position(|f| f == id)
    }

    /// Priority of an audit server as a volunteer; the last audit added has
    /// priority 0 and the first has the highest.
    pub fn volunteer_priority(&self, id: &Identity) -> Option<usize> {
        let audits = self.audit_identities();
        audits
            .iter()
            .position(|a| a == id)
            .map(|i| audits.len() - i - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Identity, Role)> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn with_role(&self, role: Role) -> Vec<Identity> {
        self.members
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(id, _)| *id)
            .collect()
    }
}
