//! Nullable verifier: programmable proposal and ballot acceptance.

use anyhow::bail;
use lattice_consensus::factory::{DataVerifier, VoteVerifier};
use lattice_consensus::message::{Data, Vote};
use lattice_types::DataId;
use std::collections::HashSet;

/// A verifier that accepts everything except an explicit reject list.
#[derive(Default)]
pub struct NullVerifier {
    rejected: HashSet<DataId>,
}

impl NullVerifier {
    /// Accepts every proposal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects exactly the given data ids: proposals carrying the id and
    /// ballots targeting it.
    pub fn rejecting(ids: impl IntoIterator<Item = DataId>) -> Self {
        Self {
            rejected: ids.into_iter().collect(),
        }
    }
}

impl DataVerifier for NullVerifier {
    fn verify(&self, data: &Data) -> anyhow::Result<()> {
        if self.rejected.contains(&data.id) {
            bail!("proposal {} rejected by test verifier", data.id);
        }
        Ok(())
    }
}

impl VoteVerifier for NullVerifier {
    fn verify(&self, vote: &Vote) -> anyhow::Result<()> {
        if self.rejected.contains(&vote.data_id) {
            bail!("ballot for {} rejected by test verifier", vote.data_id);
        }
        Ok(())
    }
}
