//! Nullable authority: fixed identities and slots.

use fedelect_types::{AuthSet, Identity, ProcessListLocation, Role};

/// Index of the first federated identity.
pub const FIRST_FEDERATED: u32 = 1;
/// Index of the first audit identity.
pub const FIRST_AUDIT: u32 = 101;

/// The `n`th federated identity, counting from zero.
pub fn federated_id(n: u32) -> Identity {
    Identity::from_index(FIRST_FEDERATED + n)
}

/// The `n`th audit identity, counting from zero.
pub fn audit_id(n: u32) -> Identity {
    Identity::from_index(FIRST_AUDIT + n)
}

/// An authority set of `federated` leaders followed by `audits` audit servers.
pub fn null_auth_set(federated: u32, audits: u32) -> AuthSet {
    let mut set = AuthSet::new();
    for n in 0..federated {
        set.add(federated_id(n), Role::Federated)
            .expect("fixture identities are unique");
    }
    for n in 0..audits {
        set.add(audit_id(n), Role::Audit)
            .expect("fixture identities are unique");
    }
    set
}

/// An authority set together with the slot being elected.
#[derive(Clone, Debug)]
pub struct NullAuthority {
    pub auth_set: AuthSet,
    pub location: ProcessListLocation,
}

impl NullAuthority {
    pub fn new(federated: u32, audits: u32) -> Self {
        Self {
            auth_set: null_auth_set(federated, audits),
            location: ProcessListLocation::new(0, 0, 10),
        }
    }

    /// Elect for a different slot.
    pub fn at(mut self, location: ProcessListLocation) -> Self {
        self.location = location;
        self
    }

    pub fn federated(&self) -> Vec<Identity> {
        self.auth_set.federated_identities()
    }

    pub fn audits(&self) -> Vec<Identity> {
        self.auth_set.audit_identities()
    }

    /// Every member, federated first.
    pub fn participants(&self) -> Vec<Identity> {
        let mut all = self.federated();
        all.extend(self.audits());
        all
    }
}

impl Default for NullAuthority {
    fn default() -> Self {
        Self::new(3, 2)
    }
}
