use anyhow::Result;

use crate::fingerprint::Fingerprint;

use super::{FieldCheck, Location};

/// How the stored checkpoint relates to the fresh fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointState {
    NoCheckpoint,
    Matches,
    Differs,
}

/// Outcome of comparing a fresh fingerprint with every stored value
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Some location held a value
    pub value_exists: bool,
    /// Some stored value differs from the fresh fingerprint
    pub has_changed: bool,
    /// Every checked field held a value
    pub is_complete: bool,
    pub fingerprint: Fingerprint,
    pub checks: Vec<FieldCheck>,
}

impl Reconciliation {
    pub fn from_checks(fingerprint: Fingerprint, checks: Vec<FieldCheck>) -> Self {
        Self {
            value_exists: checks.iter().any(FieldCheck::is_present),
            has_changed: checks.iter().any(FieldCheck::differs),
            is_complete: checks.iter().all(FieldCheck::is_present),
            fingerprint,
            checks,
        }
    }

    pub fn state(&self) -> CheckpointState {
        match (self.value_exists, self.has_changed) {
            (false, _) => CheckpointState::NoCheckpoint,
            (true, false) => CheckpointState::Matches,
            (true, true) => CheckpointState::Differs,
        }
    }

    /// Nothing to write: every field is present and matches
    pub fn is_up_to_date(&self) -> bool {
        self.value_exists && !self.has_changed && self.is_complete
    }

    pub fn drifted(&self) -> impl Iterator<Item = &FieldCheck> {
        self.checks.iter().filter(|c| c.differs())
    }

    pub fn missing(&self) -> impl Iterator<Item = &FieldCheck> {
        self.checks.iter().filter(|c| !c.is_present())
    }
}

/// Result of an update run
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// State before anything was written
    pub reconciliation: Reconciliation,
    /// Labels of the locations that were rewritten
    pub written: Vec<String>,
}

/// Compares and stores fingerprints across a set of locations
pub struct ReconciliationService {
    locations: Vec<Location>,
}

impl ReconciliationService {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn verify(&self, fingerprint: &Fingerprint) -> Result<Reconciliation> {
        let mut checks = Vec::new();
        for location in &self.locations {
            let location_checks = location.read(fingerprint)?;
            tracing::debug!(location = %location.label(), fields = location_checks.len(), "Read checkpoint");
            checks.extend(location_checks);
        }

        Ok(Reconciliation::from_checks(fingerprint.clone(), checks))
    }

    /// Write the fingerprint everywhere unless every location already holds it
    pub fn update(&self, fingerprint: &Fingerprint) -> Result<UpdateOutcome> {
        let reconciliation = self.verify(fingerprint)?;

        let mut written = Vec::new();
        if !reconciliation.is_up_to_date() {
            for location in &self.locations {
                location.write(fingerprint)?;
                tracing::debug!(location = %location.label(), "Wrote checkpoint");
                written.push(location.label());
            }
        }

        Ok(UpdateOutcome {
            reconciliation,
            written,
        })
    }
}
