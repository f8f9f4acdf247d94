//! A stalled slot with one round per authority member.

use std::sync::Arc;

use fedelect_consensus::Round;
use fedelect_crypto::Ed25519Signer;
use fedelect_messages::{EomMessage, Message};
use fedelect_types::{AuthSet, Identity, MessageSigner, ProcessListLocation, Role};

use crate::engine::DirectedMessage;
use crate::{Explorer, ExplorerConfig, ExplorerError, Router};

/// Federated servers take indices `1..=federated`, audit servers follow.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub auth_set: AuthSet,
    pub location: ProcessListLocation,
    federated: Vec<Round>,
    audits: Vec<Round>,
}

impl Scenario {
    /// Build the authority set and every member's round. With `signed`, each
    /// member gets an Ed25519 key seeded from its index.
    pub fn new(
        federated: u32,
        audits: u32,
        location: ProcessListLocation,
        signed: bool,
    ) -> Result<Self, ExplorerError> {
        let members: Vec<(Option<Arc<Ed25519Signer>>, Identity, Role)> = (1..=federated + audits)
            .map(|index| {
                let role = if index <= federated {
                    Role::Federated
                } else {
                    Role::Audit
                };
                let seed = Identity::from_index(index);
                if signed {
                    let signer = Arc::new(Ed25519Signer::from_seed(seed.as_bytes()));
                    let identity = signer.identity();
                    (Some(signer), identity, role)
                } else {
                    (None, seed, role)
                }
            })
            .collect();

        let mut auth_set = AuthSet::new();
        for (_, identity, role) in &members {
            auth_set
                .add(*identity, *role)
                .map_err(|e| ExplorerError::Config(e.to_string()))?;
        }

        let mut scenario = Self {
            auth_set,
            location,
            federated: Vec::new(),
            audits: Vec::new(),
        };
        for (signer, identity, role) in members {
            let mut round = Round::new(scenario.auth_set.clone(), identity, location)?;
            if let Some(signer) = signer {
                round = round.with_signer(signer)?;
            }
            match role {
                Role::Federated => scenario.federated.push(round),
                Role::Audit | Role::Neither => scenario.audits.push(round),
            }
        }
        tracing::debug!(
            federated,
            audits,
            majority = scenario.auth_set.majority(),
            location = %location,
            signed,
            "scenario built"
        );
        Ok(scenario)
    }

    pub fn from_config(config: &ExplorerConfig) -> Result<Self, ExplorerError> {
        config.validate()?;
        Self::new(config.federated, config.audits, config.location(), config.signed)
    }

    pub fn federated_rounds(&self) -> &[Round] {
        &self.federated
    }

    pub fn audit_rounds(&self) -> &[Round] {
        &self.audits
    }

    /// The end-of-minute timeout for the stalled slot, attributed to the
    /// first federated server.
    pub fn eom(&self) -> Option<EomMessage> {
        let stalled = self.federated.first()?.self_id();
        Some(EomMessage::new(self.location, stalled))
    }

    /// Each audit server's volunteer, produced by its own round.
    pub fn volunteers(&self) -> Result<Vec<Message>, ExplorerError> {
        let Some(eom) = self.eom() else {
            return Ok(Vec::new());
        };
        let eom = Message::from(eom);
        let mut volunteers = Vec::with_capacity(self.audits.len());
        for round in &self.audits {
            volunteers.extend(round.clone().execute(&eom)?);
        }
        Ok(volunteers)
    }

    /// Every volunteer addressed to every federated server.
    pub fn initial_pending(&self) -> Result<Vec<DirectedMessage<Message>>, ExplorerError> {
        Ok(self
            .volunteers()?
            .into_iter()
            .flat_map(|volunteer| {
                (0..self.federated.len()).map(move |target| DirectedMessage::new(target, volunteer.clone()))
            })
            .collect())
    }

    /// An explorer over the federated rounds.
    pub fn explorer(&self, config: &ExplorerConfig) -> Result<Explorer<Round>, ExplorerError> {
        Ok(Explorer::new(self.federated.clone(), config.limit)?
            .with_fan_out(config.fan_out)
            .with_mirrors(config.mirrors)
            .with_progress_interval(config.progress_interval))
    }

    /// A router over every member, federated first, with the EOM queued for
    /// each audit server.
    pub fn router(&self) -> Result<Router<Round>, ExplorerError> {
        let mut participants = self.federated.clone();
        participants.extend(self.audits.iter().cloned());
        let mut router = Router::new(participants)?;
        if let Some(eom) = self.eom() {
            for target in self.federated.len()..self.federated.len() + self.audits.len() {
                router.send(DirectedMessage::new(target, Message::from(eom.clone())))?;
            }
        }
        Ok(router)
    }
}
