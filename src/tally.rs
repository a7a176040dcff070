// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! Homomorphic accumulation of cast ballots into one ciphertext per selection, and its
//! decryption.

use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    ballot::{CiphertextBallot, CiphertextBallotContest},
    elgamal::{self, Ciphertext, DiscreteLog},
    election_context::ElectionContext,
    guardian::ElectionPublicKey,
    manifest::InternalManifest,
    threshold_decryption::{combine_decryption_shares, CompensatedDecryptionShare, DecryptionShare},
    ElementModP, ElementModQ, Error, GroupParameters, GuardianId, Result, SanityCheckError,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTally {
    pub object_id: String,
    pub sequence_order: u64,
    pub description_hash: ElementModQ,
    pub ciphertext: Ciphertext,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestTally {
    pub object_id: String,
    pub sequence_order: u64,
    pub description_hash: ElementModQ,
    // Placeholder selections are not tallied.
    pub selections: Vec<SelectionTally>,
}

impl ContestTally {
    /// Adds the real selections of `contest` to the tally.
    ///
    /// The contest must carry exactly the selections of the tally, placeholders aside.
    fn accumulate(&self, group: &GroupParameters, contest: &CiphertextBallotContest) -> Result<Self> {
        let ballot_selections: HashMap<&str, &Ciphertext> = contest
            .selections
            .iter()
            .filter(|selection| !selection.is_placeholder)
            .map(|selection| (selection.object_id.as_str(), &selection.ciphertext))
            .collect();

        if ballot_selections.len() != self.selections.len() {
            log::warn!("cannot accumulate mismatched selections of contest {}", self.object_id);

            return Err(SanityCheckError::UnknownObject(contest.object_id.clone()).into());
        }

        #[cfg(not(feature = "parallel"))]
        let iter = self.selections.iter();
        #[cfg(feature = "parallel")]
        let iter = self.selections.par_iter();

        let selections = iter
            .map(|selection| {
                let ciphertext = ballot_selections
                    .get(selection.object_id.as_str())
                    .ok_or_else(|| SanityCheckError::UnknownObject(selection.object_id.clone()))?;

                Ok(SelectionTally {
                    ciphertext: elgamal::add(group, &[selection.ciphertext, **ciphertext])?,
                    ..selection.clone()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            selections,
            ..self.clone()
        })
    }
}

/// The encrypted tally of an election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextTally {
    pub object_id: String,
    pub manifest_hash: ElementModQ,
    pub contests: Vec<ContestTally>,
    cast_ballot_ids: HashSet<String>,
}

impl CiphertextTally {
    /// An empty tally, every selection an encryption of zero with the nonce zero.
    pub fn new(group: &GroupParameters, object_id: impl Into<String>, manifest: &InternalManifest) -> Self {
        let contests = manifest
            .contests
            .iter()
            .map(|contest| ContestTally {
                object_id: contest.object_id().to_string(),
                sequence_order: contest.description.sequence_order,
                description_hash: contest.crypto_hash(group),
                selections: contest
                    .description
                    .selections
                    .iter()
                    .map(|selection| SelectionTally {
                        object_id: selection.object_id.clone(),
                        sequence_order: selection.sequence_order,
                        description_hash: selection.crypto_hash(group),
                        ciphertext: Ciphertext {
                            pad: ElementModP::ONE,
                            data: ElementModP::ONE,
                        },
                    })
                    .collect(),
            })
            .collect();

        Self {
            object_id: object_id.into(),
            manifest_hash: manifest.manifest_hash,
            contests,
            cast_ballot_ids: HashSet::new(),
        }
    }

    pub fn cast_ballot_count(&self) -> usize {
        self.cast_ballot_ids.len()
    }

    pub fn contains(&self, ballot_id: &str) -> bool {
        self.cast_ballot_ids.contains(ballot_id)
    }

    /// Adds a cast ballot to the tally, after checking all of its proofs.
    ///
    /// A ballot that fails is not added at all.
    pub fn append(
        &mut self,
        group: &GroupParameters,
        context: &ElectionContext,
        ballot: &CiphertextBallot,
    ) -> Result<()> {
        if self.cast_ballot_ids.contains(&ballot.object_id) {
            return Err(SanityCheckError::DuplicateBallot(ballot.object_id.clone()).into());
        }

        ballot
            .is_valid_encryption(
                group,
                &self.manifest_hash,
                &context.elgamal_public_key,
                &context.crypto_extended_base_hash,
            )
            .into_result()?;

        let contests = self
            .contests
            .iter()
            .map(|contest_tally| {
                let contest = ballot
                    .contests
                    .iter()
                    .find(|contest| contest.object_id == contest_tally.object_id)
                    .ok_or_else(|| SanityCheckError::UnknownObject(contest_tally.object_id.clone()))?;

                contest_tally.accumulate(group, contest)
            })
            .collect::<Result<Vec<_>>>()?;

        self.contests = contests;
        self.cast_ballot_ids.insert(ballot.object_id.clone());

        Ok(())
    }

    /// Appends every ballot, stopping at the first that fails.
    pub fn batch_append<'a>(
        &mut self,
        group: &GroupParameters,
        context: &ElectionContext,
        ballots: impl IntoIterator<Item = &'a CiphertextBallot>,
    ) -> Result<usize> {
        let mut count = 0;
        for ballot in ballots {
            self.append(group, context, ballot)?;
            count += 1;
        }

        Ok(count)
    }

    /// Every selection's ciphertext, contest by contest.
    pub fn ciphertexts(&self) -> Vec<Ciphertext> {
        self.contests
            .iter()
            .flat_map(|contest| contest.selections.iter().map(|selection| selection.ciphertext))
            .collect()
    }

    /// Decrypts with the joint secret key, which only exists in single-guardian elections.
    pub fn decrypt_with_secret(
        &self,
        group: &GroupParameters,
        secret_key: &ElementModQ,
        discrete_log: &DiscreteLog,
    ) -> Result<PlaintextTally> {
        let counts = self
            .ciphertexts()
            .iter()
            .map(|ciphertext| ciphertext.decrypt(group, secret_key, discrete_log))
            .collect::<Result<Vec<_>>>()?;

        self.plaintext(counts)
    }

    /// Decrypts from the guardians' shares of [`CiphertextTally::ciphertexts()`].
    #[allow(clippy::too_many_arguments)]
    pub fn decrypt(
        &self,
        group: &GroupParameters,
        context: &ElectionContext,
        guardians: &[ElectionPublicKey],
        decryption_shares: &HashMap<GuardianId, Vec<DecryptionShare>>,
        compensated_shares: &HashMap<(GuardianId, GuardianId), Vec<CompensatedDecryptionShare>>,
        discrete_log: &DiscreteLog,
    ) -> Result<PlaintextTally> {
        let counts = combine_decryption_shares(
            group,
            context,
            guardians,
            &self.ciphertexts(),
            decryption_shares,
            compensated_shares,
            discrete_log,
        )?;

        self.plaintext(counts)
    }

    fn plaintext(&self, counts: Vec<u64>) -> Result<PlaintextTally> {
        let mut counts = counts.into_iter();

        let contests = self
            .contests
            .iter()
            .map(|contest| {
                let selections = contest
                    .selections
                    .iter()
                    .map(|selection| Ok((selection.object_id.clone(), counts.next().ok_or(Error::InternalError)?)))
                    .collect::<Result<HashMap<_, _>>>()?;

                Ok((contest.object_id.clone(), selections))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(PlaintextTally {
            object_id: self.object_id.clone(),
            contests,
        })
    }
}

/// The decrypted tally: the vote count of every selection, by contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextTally {
    pub object_id: String,
    pub contests: HashMap<String, HashMap<String, u64>>,
}

impl PlaintextTally {
    pub fn count(&self, contest_id: &str, selection_id: &str) -> Option<u64> {
        self.contests.get(contest_id)?.get(selection_id).copied()
    }
}
