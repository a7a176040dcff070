// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! Encryption of plaintext ballots into verifiable ciphertext ballots.
//!
//! All nonces of a ballot derive from one master nonce:
//! the ballot nonce $H(H_{manifest}, id, n)$ seeds a [`NonceSequence`] per contest, whose
//! contest nonce in turn seeds a [`NonceSequence`] per selection.

use std::time::{SystemTime, UNIX_EPOCH};

use crypto_bigint::rand_core::CryptoRngCore;
#[cfg(feature = "benchmarking")]
pub use benches::benchmark_encrypt_ballot;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    ballot::{
        ballot_code, ballot_nonce, CiphertextBallot, CiphertextBallotContest,
        CiphertextBallotSelection, PlaintextBallot, PlaintextBallotContest,
        PlaintextBallotSelection,
    },
    elgamal,
    election_context::ElectionContext,
    hash_elems,
    manifest::{ContestWithPlaceholders, InternalManifest, SelectionDescription},
    nonces::NonceSequence,
    proofs::{ConstantChaumPedersenProof, DisjunctiveChaumPedersenProof, ProofValidation},
    ElementModP, ElementModQ, Error, GroupParameters, Result, SanityCheckError,
};

/// The device a ballot is encrypted on. Its hash seeds the tracking code chain of the
/// device's first ballot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionDevice {
    pub device_id: u64,
    pub session_id: u64,
    pub launch_code: u64,
    pub location: String,
}

impl EncryptionDevice {
    pub fn new(device_id: u64, session_id: u64, launch_code: u64, location: impl Into<String>) -> Self {
        Self {
            device_id,
            session_id,
            launch_code,
            location: location.into(),
        }
    }

    pub fn hash(&self, group: &GroupParameters) -> ElementModQ {
        hash_elems(
            group,
            &[
                &self.device_id,
                &self.session_id,
                &self.launch_code,
                &self.location,
            ],
        )
    }
}

/// Encrypts the ballots of a single device, chaining each ballot's tracking code to the
/// previous one.
#[derive(Clone, Debug)]
pub struct EncryptionMediator<'a> {
    group: &'a GroupParameters,
    manifest: &'a InternalManifest,
    context: &'a ElectionContext,
    previous_code: ElementModQ,
}

impl<'a> EncryptionMediator<'a> {
    pub fn new(
        group: &'a GroupParameters,
        manifest: &'a InternalManifest,
        context: &'a ElectionContext,
        device: &EncryptionDevice,
    ) -> Self {
        Self {
            group,
            manifest,
            context,
            previous_code: device.hash(group),
        }
    }

    /// The code the next ballot will be chained to.
    pub fn previous_code(&self) -> &ElementModQ {
        &self.previous_code
    }

    /// Encrypts `ballot` with a random master nonce, verifying every proof.
    ///
    /// The chain only advances on success.
    pub fn encrypt(
        &mut self,
        ballot: &PlaintextBallot,
        rng: &mut impl CryptoRngCore,
    ) -> Result<CiphertextBallot> {
        let encrypted_ballot = encrypt_ballot(
            self.group,
            self.manifest,
            self.context,
            ballot,
            &self.previous_code,
            None,
            None,
            true,
            rng,
        )?;

        self.previous_code = encrypted_ballot.code;

        Ok(encrypted_ballot)
    }
}

/// Encrypts a single selection, deriving its nonces from `nonce_seed`, the contest nonce.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_selection(
    group: &GroupParameters,
    selection: &PlaintextBallotSelection,
    description: &SelectionDescription,
    public_key: &ElementModP,
    extended_base_hash: &ElementModQ,
    nonce_seed: &ElementModQ,
    is_placeholder: bool,
    should_verify_proofs: bool,
) -> Result<CiphertextBallotSelection> {
    if selection.selection_id != description.object_id {
        return Err(SanityCheckError::UnknownObject(selection.selection_id.clone()).into());
    }

    let vote = match selection.vote {
        0 => 0,
        1 => 1,
        vote => {
            return Err(SanityCheckError::InvalidVote {
                selection_id: selection.selection_id.clone(),
                vote,
            }
            .into())
        }
    };

    let description_hash = description.crypto_hash(group);
    let nonces = NonceSequence::with_headers(group, description_hash, &[nonce_seed]);
    let selection_nonce = nonces.get(description.sequence_order);
    let proof_seed = nonces.get(0);

    let ciphertext = elgamal::encrypt(group, vote as i64, &selection_nonce, public_key)?;
    let proof = DisjunctiveChaumPedersenProof::make(
        group,
        &ciphertext,
        &selection_nonce,
        public_key,
        extended_base_hash,
        &proof_seed,
        vote,
    )?;

    let mut encrypted_selection = CiphertextBallotSelection {
        object_id: description.object_id.clone(),
        sequence_order: description.sequence_order,
        description_hash,
        ciphertext,
        crypto_hash: ElementModQ::ZERO,
        is_placeholder,
        proof: Some(proof),
        nonce: Some(selection_nonce),
    };
    encrypted_selection.crypto_hash = encrypted_selection.crypto_hash_with(group, &description_hash);

    if should_verify_proofs {
        verified(encrypted_selection.is_valid_encryption(
            group,
            &description_hash,
            public_key,
            extended_base_hash,
        ))?;
    }

    Ok(encrypted_selection)
}

/// Encrypts a contest, filling in zero votes for the selections the voter left out and the
/// placeholder selections that bring the total to exactly `number_elected`.
///
/// `nonce_seed` is the ballot nonce.
pub fn encrypt_contest(
    group: &GroupParameters,
    contest: &PlaintextBallotContest,
    description: &ContestWithPlaceholders,
    public_key: &ElementModP,
    extended_base_hash: &ElementModQ,
    nonce_seed: &ElementModQ,
    should_verify_proofs: bool,
) -> Result<CiphertextBallotContest> {
    if !description.is_valid() {
        return Err(SanityCheckError::InvalidParams().into());
    }
    contest.validate(description)?;

    for selection in &contest.selections {
        if !description
            .description
            .selections
            .iter()
            .any(|description| description.object_id == selection.selection_id)
        {
            log::info!(
                "ignoring selection {} which is not part of contest {}",
                selection.selection_id,
                contest.contest_id
            );
        }
    }

    let description_hash = description.crypto_hash(group);
    let nonces = NonceSequence::with_headers(group, description_hash, &[nonce_seed]);
    let contest_nonce = nonces.get(description.description.sequence_order);
    let proof_seed = nonces.get(0);

    let mut votes = 0u64;
    let mut plaintexts: Vec<(PlaintextBallotSelection, &SelectionDescription, bool)> = description
        .description
        .selections
        .iter()
        .map(|selection_description| {
            let selection = contest
                .selections
                .iter()
                .find(|selection| selection.selection_id == selection_description.object_id)
                .cloned()
                .unwrap_or_else(|| {
                    PlaintextBallotSelection::new(selection_description.object_id.clone(), 0)
                });
            votes += selection.vote as u64;

            (selection, selection_description, false)
        })
        .collect();

    for (placeholder, vote) in description
        .placeholders
        .iter()
        .zip(placeholder_votes(description, votes))
    {
        plaintexts.push((
            PlaintextBallotSelection {
                selection_id: placeholder.object_id.clone(),
                vote,
                is_placeholder: true,
            },
            placeholder,
            true,
        ));
    }

    #[cfg(not(feature = "parallel"))]
    let iter = plaintexts.iter();
    #[cfg(feature = "parallel")]
    let iter = plaintexts.par_iter();

    let selections = iter
        .map(|(selection, selection_description, is_placeholder)| {
            encrypt_selection(
                group,
                selection,
                selection_description,
                public_key,
                extended_base_hash,
                &contest_nonce,
                *is_placeholder,
                should_verify_proofs,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let ciphertexts: Vec<elgamal::Ciphertext> =
        selections.iter().map(|selection| selection.ciphertext).collect();
    let encrypted_total = elgamal::add(group, &ciphertexts)?;

    let selection_nonces = selections
        .iter()
        .map(|selection| selection.nonce.ok_or(Error::InternalError))
        .collect::<Result<Vec<_>>>()?;
    let aggregate_nonce = group.add_all_q(&selection_nonces);

    let proof = ConstantChaumPedersenProof::make(
        group,
        &encrypted_total,
        &aggregate_nonce,
        public_key,
        &proof_seed,
        extended_base_hash,
        description.number_elected(),
    );

    let mut encrypted_contest = CiphertextBallotContest {
        object_id: description.object_id().to_string(),
        sequence_order: description.description.sequence_order,
        description_hash,
        selections,
        encrypted_total,
        crypto_hash: ElementModQ::ZERO,
        proof: Some(proof),
        nonce: Some(contest_nonce),
    };
    encrypted_contest.crypto_hash = encrypted_contest.crypto_hash_with(group, &description_hash);

    if should_verify_proofs {
        verified(encrypted_contest.is_valid_encryption(
            group,
            &description_hash,
            public_key,
            extended_base_hash,
        ))?;
    }

    Ok(encrypted_contest)
}

/// The votes of the placeholder selections of a contest in which the voter cast `votes`
/// votes: one for each vote short of `number_elected`, so the contest total is always exactly
/// `number_elected`.
pub(crate) fn placeholder_votes(description: &ContestWithPlaceholders, votes: u64) -> Vec<i64> {
    let missing_votes = description.number_elected().saturating_sub(votes);

    if missing_votes > 0 {
        log::info!(
            "contest {} is undervoted with {votes} of {} votes",
            description.object_id(),
            description.number_elected()
        );
    }

    (0..description.placeholders.len() as u64)
        .map(|i| i64::from(i < missing_votes))
        .collect()
}

/// Encrypts `ballot` under the election `context`, chaining its tracking code to `code_seed`.
///
/// Contests the ballot leaves out are encrypted as all-zero contests, so every encrypted
/// ballot covers every contest of the manifest. Without a `master_nonce` a random one is
/// sampled, and without a `timestamp` the current time is used.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_ballot(
    group: &GroupParameters,
    manifest: &InternalManifest,
    context: &ElectionContext,
    ballot: &PlaintextBallot,
    code_seed: &ElementModQ,
    master_nonce: Option<ElementModQ>,
    timestamp: Option<u64>,
    should_verify_proofs: bool,
    rng: &mut impl CryptoRngCore,
) -> Result<CiphertextBallot> {
    for contest in &ballot.contests {
        if manifest.get_contest(&contest.contest_id).is_none() {
            log::info!(
                "ignoring contest {} of ballot {} which is not part of the manifest",
                contest.contest_id,
                ballot.object_id
            );
        }
    }

    let master_nonce = master_nonce.unwrap_or_else(|| group.rand_q(rng));
    let nonce_seed = ballot_nonce(group, &manifest.manifest_hash, &ballot.object_id, &master_nonce);

    let timestamp = match timestamp {
        Some(timestamp) => timestamp,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::InternalError)?
            .as_secs(),
    };

    let plaintexts: Vec<(PlaintextBallotContest, &ContestWithPlaceholders)> = manifest
        .contests
        .iter()
        .map(|description| {
            let contest = ballot
                .contests
                .iter()
                .find(|contest| contest.contest_id == description.object_id())
                .cloned()
                .unwrap_or_else(|| PlaintextBallotContest::empty(description));

            (contest, description)
        })
        .collect();

    #[cfg(not(feature = "parallel"))]
    let iter = plaintexts.iter();
    #[cfg(feature = "parallel")]
    let iter = plaintexts.par_iter();

    let contests = iter
        .map(|(contest, description)| {
            encrypt_contest(
                group,
                contest,
                description,
                &context.elgamal_public_key,
                &context.crypto_extended_base_hash,
                &nonce_seed,
                should_verify_proofs,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let mut encrypted_ballot = CiphertextBallot {
        object_id: ballot.object_id.clone(),
        style_id: ballot.style_id.clone(),
        manifest_hash: manifest.manifest_hash,
        code_seed: *code_seed,
        code: ElementModQ::ZERO,
        timestamp,
        contests,
        crypto_hash: ElementModQ::ZERO,
        nonce: Some(master_nonce),
    };
    encrypted_ballot.crypto_hash = encrypted_ballot.crypto_hash_with(group, &manifest.manifest_hash);
    encrypted_ballot.code = ballot_code(group, code_seed, timestamp, &encrypted_ballot.crypto_hash);

    if should_verify_proofs {
        verified(encrypted_ballot.is_valid_encryption(
            group,
            &manifest.manifest_hash,
            &context.elgamal_public_key,
            &context.crypto_extended_base_hash,
        ))?;
    }

    Ok(encrypted_ballot)
}

fn verified(validation: ProofValidation) -> Result<()> {
    if validation.is_valid() {
        return Ok(());
    }

    log::warn!("{validation}");

    Err(Error::EncryptionFailure {
        object_id: validation.subject().to_string(),
        failures: validation.failures().to_vec(),
    })
}


#[cfg(feature = "benchmarking")]
mod benches {
    use criterion::Criterion;
    use rand_core::OsRng;

    use super::*;
    use crate::{
        elgamal::KeyPair,
        manifest::{ContestDescription, Manifest},
        test_exports::standard_group,
    };

    pub fn benchmark_encrypt_ballot(c: &mut Criterion) {
        let mut g = c.benchmark_group("ballot encryption");
        g.sample_size(10);

        let group = standard_group();
        let key_pair = KeyPair::random(group, &mut OsRng).unwrap();

        for candidates in [2u64, 5, 10] {
            let contest = ContestDescription {
                object_id: "contest".to_string(),
                sequence_order: 1,
                number_elected: 1,
                votes_allowed: 1,
                name: "contest".to_string(),
                selections: (1..=candidates)
                    .map(|i| SelectionDescription::new(format!("selection-{i}"), format!("candidate-{i}"), i))
                    .collect(),
            };
            let manifest = InternalManifest::new(
                group,
                Manifest {
                    election_scope_id: "benchmark".to_string(),
                    contests: vec![contest],
                },
            )
            .unwrap();
            let context = ElectionContext::from_parts(
                group,
                1,
                1,
                *key_pair.public_key(),
                ElementModQ::ONE,
                manifest.manifest_hash,
            )
            .unwrap();
            let ballot = PlaintextBallot {
                object_id: "ballot".to_string(),
                style_id: "style".to_string(),
                contests: vec![PlaintextBallotContest {
                    contest_id: "contest".to_string(),
                    selections: vec![PlaintextBallotSelection::new("selection-1", 1)],
                }],
            };

            for should_verify_proofs in [false, true] {
                g.bench_function(
                    format!(
                        "encrypt_ballot() for {candidates} candidates with verification {should_verify_proofs}"
                    ),
                    |bench| {
                        bench.iter(|| {
                            encrypt_ballot(
                                group,
                                &manifest,
                                &context,
                                &ballot,
                                &ElementModQ::ONE,
                                None,
                                Some(0),
                                should_verify_proofs,
                                &mut OsRng,
                            )
                        })
                    },
                );
            }
        }

        g.finish();
    }
}
