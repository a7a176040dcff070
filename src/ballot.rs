// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! Plaintext ballots, as filled in by a voter, and the encrypted ballots produced from them.
//!
//! Every encrypted node carries a crypto hash over its children and its description hash, so
//! the ballot's hash commits to all of its ciphertexts. Proofs are excluded from the hashes.

use serde::{Deserialize, Serialize};

use crate::{
    elgamal::{self, Ciphertext},
    hash_elems,
    manifest::ContestWithPlaceholders,
    proofs::{ConstantChaumPedersenProof, DisjunctiveChaumPedersenProof, ProofValidation},
    ElementModP, ElementModQ, GroupParameters, Result, SanityCheckError,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextBallotSelection {
    pub selection_id: String,
    pub vote: i64,
    pub is_placeholder: bool,
}

impl PlaintextBallotSelection {
    pub fn new(selection_id: impl Into<String>, vote: i64) -> Self {
        Self {
            selection_id: selection_id.into(),
            vote,
            is_placeholder: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextBallotContest {
    pub contest_id: String,
    pub selections: Vec<PlaintextBallotSelection>,
}

impl PlaintextBallotContest {
    /// An explicit all-zero contest for a contest the voter left out.
    pub fn empty(description: &ContestWithPlaceholders) -> Self {
        Self {
            contest_id: description.object_id().to_string(),
            selections: description
                .description
                .selections
                .iter()
                .map(|selection| PlaintextBallotSelection::new(selection.object_id.clone(), 0))
                .collect(),
        }
    }

    /// Checks the contest against its description: every vote is zero or one, and the total
    /// does not exceed the number of candidates to be elected.
    pub fn validate(&self, description: &ContestWithPlaceholders) -> Result<()> {
        if self.contest_id != description.object_id() {
            return Err(SanityCheckError::UnknownObject(self.contest_id.clone()).into());
        }

        let mut votes = 0u64;
        for selection in &self.selections {
            match selection.vote {
                0 => {}
                1 => votes += 1,
                vote => {
                    return Err(SanityCheckError::InvalidVote {
                        selection_id: selection.selection_id.clone(),
                        vote,
                    }
                    .into())
                }
            }
        }

        if votes > description.number_elected() {
            return Err(SanityCheckError::Overvote {
                contest_id: self.contest_id.clone(),
                votes,
                limit: description.number_elected(),
            }
            .into());
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextBallot {
    pub object_id: String,
    pub style_id: String,
    pub contests: Vec<PlaintextBallotContest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallotSelection {
    pub object_id: String,
    pub sequence_order: u64,
    // The crypto hash of the selection's description.
    pub description_hash: ElementModQ,
    pub ciphertext: Ciphertext,
    pub crypto_hash: ElementModQ,
    pub is_placeholder: bool,
    pub proof: Option<DisjunctiveChaumPedersenProof>,
    pub nonce: Option<ElementModQ>,
}

impl CiphertextBallotSelection {
    /// $H(id, seed, H(\alpha, \beta))$
    pub fn crypto_hash_with(&self, group: &GroupParameters, seed_hash: &ElementModQ) -> ElementModQ {
        hash_elems(group, &[&self.object_id, seed_hash, &self.ciphertext])
    }

    pub fn is_valid_encryption(
        &self,
        group: &GroupParameters,
        seed_hash: &ElementModQ,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new(format!("selection {}", self.object_id));

        validation.check("description_hash", *seed_hash == self.description_hash);
        validation.check(
            "crypto_hash",
            self.crypto_hash_with(group, seed_hash) == self.crypto_hash,
        );
        validation.check("proof_present", self.proof.is_some());

        if let Some(proof) = &self.proof {
            validation.merge(proof.is_valid(group, &self.ciphertext, public_key, extended_base_hash));
        }

        validation
    }

    pub fn without_nonce(&self) -> Self {
        Self {
            nonce: None,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallotContest {
    pub object_id: String,
    pub sequence_order: u64,
    pub description_hash: ElementModQ,
    pub selections: Vec<CiphertextBallotSelection>,
    // The homomorphic sum of all selections, placeholders included.
    pub encrypted_total: Ciphertext,
    pub crypto_hash: ElementModQ,
    pub proof: Option<ConstantChaumPedersenProof>,
    pub nonce: Option<ElementModQ>,
}

impl CiphertextBallotContest {
    /// $H(id, seed, [H_{selection}])$ with the selection hashes in sequence order, or zero for a
    /// contest without selections.
    pub fn crypto_hash_with(&self, group: &GroupParameters, seed_hash: &ElementModQ) -> ElementModQ {
        let mut selections: Vec<&CiphertextBallotSelection> = self.selections.iter().collect();
        selections.sort_by_key(|selection| selection.sequence_order);

        crypto_hash_of_children(
            group,
            &self.object_id,
            seed_hash,
            selections.iter().map(|selection| selection.crypto_hash).collect(),
        )
    }

    pub fn elgamal_accumulate(&self, group: &GroupParameters) -> Result<Ciphertext> {
        let ciphertexts: Vec<Ciphertext> = self
            .selections
            .iter()
            .map(|selection| selection.ciphertext)
            .collect();

        elgamal::add(group, &ciphertexts)
    }

    /// Checks the contest's own hashes and proof; the proofs of its selections are checked
    /// separately.
    pub fn is_valid_encryption(
        &self,
        group: &GroupParameters,
        seed_hash: &ElementModQ,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new(format!("contest {}", self.object_id));

        validation.check("description_hash", *seed_hash == self.description_hash);
        validation.check(
            "crypto_hash",
            self.crypto_hash_with(group, seed_hash) == self.crypto_hash,
        );
        validation.check("proof_present", self.proof.is_some());

        let accumulation = self.elgamal_accumulate(group);
        validation.check(
            "encrypted_total",
            accumulation.as_ref() == Ok(&self.encrypted_total),
        );

        if let (Some(proof), Ok(accumulation)) = (&self.proof, accumulation) {
            validation.merge(proof.is_valid(group, &accumulation, public_key, extended_base_hash));
        }

        validation
    }

    pub fn without_nonce(&self) -> Self {
        Self {
            nonce: None,
            selections: self
                .selections
                .iter()
                .map(CiphertextBallotSelection::without_nonce)
                .collect(),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallot {
    pub object_id: String,
    pub style_id: String,
    pub manifest_hash: ElementModQ,
    // The previous ballot's code, or the device hash for a device's first ballot.
    pub code_seed: ElementModQ,
    pub code: ElementModQ,
    // Seconds since the epoch.
    pub timestamp: u64,
    pub contests: Vec<CiphertextBallotContest>,
    pub crypto_hash: ElementModQ,
    pub nonce: Option<ElementModQ>,
}

impl CiphertextBallot {
    /// $H(id, seed, [H_{contest}])$ with the contest hashes in sequence order.
    pub fn crypto_hash_with(&self, group: &GroupParameters, seed_hash: &ElementModQ) -> ElementModQ {
        let mut contests: Vec<&CiphertextBallotContest> = self.contests.iter().collect();
        contests.sort_by_key(|contest| contest.sequence_order);

        crypto_hash_of_children(
            group,
            &self.object_id,
            seed_hash,
            contests.iter().map(|contest| contest.crypto_hash).collect(),
        )
    }

    /// Checks the ballot hashes, its tracking code, and every selection and contest proof.
    pub fn is_valid_encryption(
        &self,
        group: &GroupParameters,
        manifest_hash: &ElementModQ,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new(format!("ballot {}", self.object_id));

        validation.check("manifest_hash", *manifest_hash == self.manifest_hash);
        validation.check(
            "crypto_hash",
            self.crypto_hash_with(group, manifest_hash) == self.crypto_hash,
        );
        validation.check(
            "code",
            ballot_code(group, &self.code_seed, self.timestamp, &self.crypto_hash) == self.code,
        );

        for contest in &self.contests {
            for selection in &contest.selections {
                validation.merge(selection.is_valid_encryption(
                    group,
                    &selection.description_hash,
                    public_key,
                    extended_base_hash,
                ));
            }

            validation.merge(contest.is_valid_encryption(
                group,
                &contest.description_hash,
                public_key,
                extended_base_hash,
            ));
        }

        validation
    }

    pub fn without_nonce(&self) -> Self {
        Self {
            nonce: None,
            contests: self
                .contests
                .iter()
                .map(CiphertextBallotContest::without_nonce)
                .collect(),
            ..self.clone()
        }
    }
}

fn crypto_hash_of_children(
    group: &GroupParameters,
    object_id: &str,
    seed_hash: &ElementModQ,
    children: Vec<ElementModQ>,
) -> ElementModQ {
    if children.is_empty() {
        log::warn!("{object_id} has no children to hash");

        return ElementModQ::ZERO;
    }

    hash_elems(group, &[&object_id, seed_hash, &children])
}

/// The nonce every other nonce of a ballot is derived from: $H(H_{manifest}, id, n)$.
pub fn ballot_nonce(
    group: &GroupParameters,
    manifest_hash: &ElementModQ,
    ballot_id: &str,
    master_nonce: &ElementModQ,
) -> ElementModQ {
    hash_elems(group, &[manifest_hash, &ballot_id, master_nonce])
}

/// The rotating tracking code $H(seed, timestamp, H_{ballot})$, chaining the ballots of a
/// device together.
pub fn ballot_code(
    group: &GroupParameters,
    code_seed: &ElementModQ,
    timestamp: u64,
    crypto_hash: &ElementModQ,
) -> ElementModQ {
    hash_elems(group, &[code_seed, &timestamp, crypto_hash])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{manifest::tests::contest, test_exports::test_group, Error};

    fn plaintext_contest(votes: &[i64]) -> PlaintextBallotContest {
        PlaintextBallotContest {
            contest_id: "council".to_string(),
            selections: votes
                .iter()
                .enumerate()
                .map(|(i, vote)| PlaintextBallotSelection::new(format!("council-selection-{}", i + 1), *vote))
                .collect(),
        }
    }

    #[rstest]
    #[case::undervote(&[0, 0, 0, 1])]
    #[case::full_vote(&[1, 0, 0, 1])]
    #[case::blank(&[])]
    fn accepts_valid_contests(#[case] votes: &[i64]) {
        let description = ContestWithPlaceholders::new(contest("council", 2, 4, 2));

        assert_eq!(plaintext_contest(votes).validate(&description), Ok(()));
    }

    #[rstest]
    #[case::overvote(&[1, 1, 1, 0], Error::SanityCheckError(SanityCheckError::Overvote { contest_id: "council".to_string(), votes: 3, limit: 2 }))]
    #[case::vote_of_two(&[2, 0, 0, 0], Error::SanityCheckError(SanityCheckError::InvalidVote { selection_id: "council-selection-1".to_string(), vote: 2 }))]
    #[case::negative_vote(&[0, -1, 0, 0], Error::SanityCheckError(SanityCheckError::InvalidVote { selection_id: "council-selection-2".to_string(), vote: -1 }))]
    fn rejects_invalid_contests(#[case] votes: &[i64], #[case] error: Error) {
        let description = ContestWithPlaceholders::new(contest("council", 2, 4, 2));

        assert_eq!(plaintext_contest(votes).validate(&description), Err(error));
    }

    #[test]
    fn empty_contest_votes_for_nobody() {
        let description = ContestWithPlaceholders::new(contest("council", 2, 4, 2));
        let empty = PlaintextBallotContest::empty(&description);

        assert_eq!(empty.selections.len(), 4);
        assert!(empty.selections.iter().all(|selection| selection.vote == 0));
        assert_eq!(empty.validate(&description), Ok(()));
    }

    #[test]
    fn ballot_code_chains_its_inputs() {
        let group = test_group();
        let seed = group.u64_to_q(1);
        let crypto_hash = group.u64_to_q(2);

        assert_eq!(
            ballot_code(&group, &seed, 1_700_000_000, &crypto_hash),
            hash_elems(&group, &[&seed, &1_700_000_000u64, &crypto_hash])
        );
        assert_ne!(
            ballot_code(&group, &seed, 1_700_000_000, &crypto_hash),
            ballot_code(&group, &seed, 1_700_000_001, &crypto_hash)
        );
    }
}
