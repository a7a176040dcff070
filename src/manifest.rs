// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! The minimal structure of an election that ballot encryption needs: contests, their
//! selections, and the placeholder selections added to every contest.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{hash_elems, CryptoHashable, ElementModQ, GroupParameters, Result, SanityCheckError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionDescription {
    pub object_id: String,
    pub candidate_id: String,
    pub sequence_order: u64,
}

impl SelectionDescription {
    pub fn new(object_id: impl Into<String>, candidate_id: impl Into<String>, sequence_order: u64) -> Self {
        Self {
            object_id: object_id.into(),
            candidate_id: candidate_id.into(),
            sequence_order,
        }
    }

    pub fn crypto_hash(&self, group: &GroupParameters) -> ElementModQ {
        hash_elems(
            group,
            &[&self.object_id, &self.sequence_order, &self.candidate_id],
        )
    }
}

impl CryptoHashable for SelectionDescription {
    fn hash_fragment(&self, group: &GroupParameters) -> String {
        self.crypto_hash(group).to_hex()
    }
}

/// A contest in which a voter may select up to `number_elected` of its selections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestDescription {
    pub object_id: String,
    pub sequence_order: u64,
    pub number_elected: u64,
    pub votes_allowed: u64,
    pub name: String,
    pub selections: Vec<SelectionDescription>,
}

impl ContestDescription {
    pub fn crypto_hash(&self, group: &GroupParameters) -> ElementModQ {
        hash_elems(
            group,
            &[
                &self.object_id,
                &self.sequence_order,
                &self.number_elected,
                &self.votes_allowed,
                &self.name,
                &self.selections,
            ],
        )
    }

    /// Selection ids and sequence orders are unique, and no more candidates can be elected
    /// than there are selections or votes.
    pub fn is_valid(&self) -> bool {
        let object_ids: HashSet<&str> = self
            .selections
            .iter()
            .map(|selection| selection.object_id.as_str())
            .collect();
        let sequence_orders: HashSet<u64> = self
            .selections
            .iter()
            .map(|selection| selection.sequence_order)
            .collect();

        let valid = object_ids.len() == self.selections.len()
            && sequence_orders.len() == self.selections.len()
            && self.number_elected <= self.votes_allowed
            && self.number_elected as usize <= self.selections.len();

        if !valid {
            log::warn!("contest {} is not a valid description", self.object_id);
        }

        valid
    }
}

impl CryptoHashable for ContestDescription {
    fn hash_fragment(&self, group: &GroupParameters) -> String {
        self.crypto_hash(group).to_hex()
    }
}

/// Generates a placeholder selection for `contest` at `sequence_order`, with identifiers that
/// cannot collide with a real selection of the contest.
pub fn generate_placeholder_selection(
    contest: &ContestDescription,
    sequence_order: u64,
) -> SelectionDescription {
    SelectionDescription::new(
        format!("{}-{}-placeholder", contest.object_id, sequence_order),
        format!("{}-{}-candidate", contest.object_id, sequence_order),
        sequence_order,
    )
}

/// A contest description extended by `number_elected` placeholder selections, numbered after
/// the largest sequence order of the real selections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestWithPlaceholders {
    pub description: ContestDescription,
    pub placeholders: Vec<SelectionDescription>,
}

impl ContestWithPlaceholders {
    pub fn new(description: ContestDescription) -> Self {
        let max_sequence_order = description
            .selections
            .iter()
            .map(|selection| selection.sequence_order)
            .max()
            .unwrap_or(0);

        let placeholders = (1..=description.number_elected)
            .map(|i| generate_placeholder_selection(&description, max_sequence_order + i))
            .collect();

        Self {
            description,
            placeholders,
        }
    }

    pub fn object_id(&self) -> &str {
        &self.description.object_id
    }

    pub fn number_elected(&self) -> u64 {
        self.description.number_elected
    }

    pub fn crypto_hash(&self, group: &GroupParameters) -> ElementModQ {
        self.description.crypto_hash(group)
    }

    pub fn is_valid(&self) -> bool {
        self.description.is_valid()
            && self.placeholders.len() as u64 == self.description.number_elected
    }
}

/// An election manifest, reduced to what ballot encryption and tallying depend on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub election_scope_id: String,
    pub contests: Vec<ContestDescription>,
}

impl Manifest {
    pub fn crypto_hash(&self, group: &GroupParameters) -> ElementModQ {
        hash_elems(group, &[&self.election_scope_id, &self.contests])
    }

    pub fn is_valid(&self) -> bool {
        let object_ids: HashSet<&str> = self
            .contests
            .iter()
            .map(|contest| contest.object_id.as_str())
            .collect();

        object_ids.len() == self.contests.len()
            && self.contests.iter().all(ContestDescription::is_valid)
    }
}

/// A validated [`Manifest`] with its hash computed once and placeholders added to each contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalManifest {
    pub manifest: Manifest,
    pub manifest_hash: ElementModQ,
    pub contests: Vec<ContestWithPlaceholders>,
}

impl InternalManifest {
    pub fn new(group: &GroupParameters, manifest: Manifest) -> Result<Self> {
        if !manifest.is_valid() {
            return Err(SanityCheckError::InvalidParams().into());
        }

        let manifest_hash = manifest.crypto_hash(group);
        let contests = manifest
            .contests
            .iter()
            .cloned()
            .map(ContestWithPlaceholders::new)
            .collect();

        Ok(Self {
            manifest,
            manifest_hash,
            contests,
        })
    }

    pub fn get_contest(&self, object_id: &str) -> Option<&ContestWithPlaceholders> {
        self.contests
            .iter()
            .find(|contest| contest.object_id() == object_id)
    }
}
