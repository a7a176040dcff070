// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! Threshold decryption by the guardians of an election.
//!
//! Every present guardian $i$ publishes $M_i = \alpha^{s_i}$ with a Chaum-Pedersen proof that
//! it used the secret behind its public key $K_i$. For a missing guardian $i$, each present
//! guardian $\ell$ publishes the compensated share $M_{i,\ell} = \alpha^{P_i(\ell)}$ from the
//! backup it holds, and any quorum of those reconstructs
//! $M_i = \prod_\ell M_{i,\ell}^{w_\ell}$. The plaintext is then the discrete log of
//! $\beta / \prod_i M_i$.

use std::collections::{HashMap, HashSet};

use crypto_bigint::rand_core::CryptoRngCore;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    elgamal::{Ciphertext, DiscreteLog},
    election_context::ElectionContext,
    guardian::{ElectionKeyPair, ElectionPublicKey, PartialKeyBackup},
    proofs::{ChaumPedersenProof, ProofValidation},
    secret_sharing::compute_lagrange_coefficient,
    ElementModP, ElementModQ, Error, GroupParameters, GuardianId, ProtocolError, Result,
    SanityCheckError,
};

/// A guardian's share $M_i = \alpha^{s_i}$ of the decryption of one ciphertext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionShare {
    pub guardian_id: GuardianId,
    pub share: ElementModP,
    pub proof: ChaumPedersenProof,
}

impl DecryptionShare {
    pub fn is_valid(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        guardian: &ElectionPublicKey,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new(format!("share of guardian {}", self.guardian_id));

        validation.check("guardian_id", self.guardian_id == guardian.sequence_order);
        validation.merge(self.proof.is_valid(
            group,
            ciphertext,
            &guardian.key,
            &self.share,
            extended_base_hash,
        ));

        validation
    }
}

/// The share $M_{i,\ell} = \alpha^{P_i(\ell)}$ computed by guardian $\ell$ on behalf of the
/// missing guardian $i$.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensatedDecryptionShare {
    // $ \ell $
    pub guardian_id: GuardianId,
    // $ i $
    pub missing_guardian_id: GuardianId,
    pub share: ElementModP,
    // $ g^{P_i(\ell)} $
    pub recovery_public_key: ElementModP,
    pub proof: ChaumPedersenProof,
}

impl CompensatedDecryptionShare {
    /// Checks the share against the recovery key derived from the missing guardian's
    /// commitments.
    pub fn is_valid(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        missing_guardian: &ElectionPublicKey,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new(format!(
            "share of guardian {} for guardian {}",
            self.guardian_id, self.missing_guardian_id
        ));

        validation.check(
            "missing_guardian_id",
            self.missing_guardian_id == missing_guardian.sequence_order,
        );
        validation.check(
            "recovery_public_key",
            self.recovery_public_key
                == missing_guardian.recovery_public_key_for(group, self.guardian_id),
        );
        validation.merge(self.proof.is_valid(
            group,
            ciphertext,
            &self.recovery_public_key,
            &self.share,
            extended_base_hash,
        ));

        validation
    }
}

/// A guardian at decryption time: its own key and the backups other guardians sent it.
#[derive(Clone, Debug)]
pub struct DecryptingGuardian {
    pub guardian_id: GuardianId,
    secret_key: ElementModQ,
    public_key: ElementModP,
    // Keyed by the owner's sequence order.
    backups: HashMap<GuardianId, PartialKeyBackup>,
}

impl DecryptingGuardian {
    /// Backups designated for another guardian are rejected.
    pub fn new(key_pair: &ElectionKeyPair, backups: Vec<PartialKeyBackup>) -> Result<Self> {
        if backups
            .iter()
            .any(|backup| backup.designated_sequence_order != key_pair.sequence_order)
        {
            return Err(SanityCheckError::InvalidParams().into());
        }

        Ok(Self {
            guardian_id: key_pair.sequence_order,
            secret_key: *key_pair.key_pair().secret_key(),
            public_key: *key_pair.key_pair().public_key(),
            backups: backups
                .into_iter()
                .map(|backup| (backup.owner_sequence_order, backup))
                .collect(),
        })
    }

    pub fn public_key(&self) -> &ElementModP {
        &self.public_key
    }

    /// Computes this guardian's decryption share of every ciphertext.
    pub fn partially_decrypt(
        &self,
        group: &GroupParameters,
        ciphertexts: &[Ciphertext],
        extended_base_hash: &ElementModQ,
        rng: &mut impl CryptoRngCore,
    ) -> Vec<DecryptionShare> {
        let seeds: Vec<ElementModQ> = ciphertexts.iter().map(|_| group.rand_q(rng)).collect();

        #[cfg(not(feature = "parallel"))]
        let iter = ciphertexts.iter().zip(seeds.iter());
        #[cfg(feature = "parallel")]
        let iter = ciphertexts.par_iter().zip(seeds.par_iter());

        iter.map(|(ciphertext, seed)| {
            let share = ciphertext.partial_decrypt(group, &self.secret_key);

            DecryptionShare {
                guardian_id: self.guardian_id,
                share,
                proof: ChaumPedersenProof::make(
                    group,
                    ciphertext,
                    &self.secret_key,
                    &share,
                    seed,
                    extended_base_hash,
                ),
            }
        })
        .collect()
    }

    /// Computes this guardian's compensated share of every ciphertext for `missing_guardian`,
    /// using the backup it holds of that guardian's secret.
    pub fn compensate_decrypt(
        &self,
        group: &GroupParameters,
        missing_guardian: &ElectionPublicKey,
        ciphertexts: &[Ciphertext],
        extended_base_hash: &ElementModQ,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Vec<CompensatedDecryptionShare>> {
        let backup = self
            .backups
            .get(&missing_guardian.sequence_order)
            .ok_or_else(|| SanityCheckError::UnknownObject(missing_guardian.owner_id.clone()))?;

        let recovery_public_key = missing_guardian.recovery_public_key_for(group, self.guardian_id);
        let seeds: Vec<ElementModQ> = ciphertexts.iter().map(|_| group.rand_q(rng)).collect();

        #[cfg(not(feature = "parallel"))]
        let iter = ciphertexts.iter().zip(seeds.iter());
        #[cfg(feature = "parallel")]
        let iter = ciphertexts.par_iter().zip(seeds.par_iter());

        Ok(iter
            .map(|(ciphertext, seed)| {
                let share = ciphertext.partial_decrypt(group, &backup.value);

                CompensatedDecryptionShare {
                    guardian_id: self.guardian_id,
                    missing_guardian_id: missing_guardian.sequence_order,
                    share,
                    recovery_public_key,
                    proof: ChaumPedersenProof::make(
                        group,
                        ciphertext,
                        &backup.value,
                        &share,
                        seed,
                        extended_base_hash,
                    ),
                }
            })
            .collect())
    }
}

/// The Lagrange coefficient $w_\ell$ of each of the `guardians`, relative to the others.
pub fn compute_lagrange_coefficients(
    group: &GroupParameters,
    guardians: &[GuardianId],
) -> Result<HashMap<GuardianId, ElementModQ>> {
    guardians
        .iter()
        .map(|guardian_id| {
            let others: Vec<GuardianId> = guardians
                .iter()
                .copied()
                .filter(|other| other != guardian_id)
                .collect();

            Ok((
                *guardian_id,
                compute_lagrange_coefficient(group, *guardian_id, &others)?,
            ))
        })
        .collect()
}

/// Reconstructs a missing guardian's share $M_i = \prod_\ell M_{i,\ell}^{w_\ell}$ of one
/// ciphertext from the compensated shares.
pub fn reconstruct_decryption_share(
    group: &GroupParameters,
    compensated_shares: &[&CompensatedDecryptionShare],
    lagrange_coefficients: &HashMap<GuardianId, ElementModQ>,
) -> Result<ElementModP> {
    let factors = compensated_shares
        .iter()
        .map(|compensated_share| {
            let lagrange_coefficient = lagrange_coefficients
                .get(&compensated_share.guardian_id)
                .ok_or(Error::InternalError)?;

            Ok(group.pow_p(&compensated_share.share, lagrange_coefficient))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(group.mult_all_p(&factors))
}

/// Decrypts `ciphertexts` from the decryption shares of the present guardians and, for each
/// missing guardian, the compensated shares of at least a quorum of present guardians.
///
/// `decryption_shares` holds one share per ciphertext for each present guardian.
/// `compensated_shares` is keyed by `(missing, compensating)` guardian and likewise holds one
/// share per ciphertext.
///
/// Every proof is checked before anything is combined, and all guardians with invalid shares
/// are reported together.
#[allow(clippy::too_many_arguments)]
pub fn combine_decryption_shares(
    group: &GroupParameters,
    context: &ElectionContext,
    guardians: &[ElectionPublicKey],
    ciphertexts: &[Ciphertext],
    decryption_shares: &HashMap<GuardianId, Vec<DecryptionShare>>,
    compensated_shares: &HashMap<(GuardianId, GuardianId), Vec<CompensatedDecryptionShare>>,
    discrete_log: &DiscreteLog,
) -> Result<Vec<u64>> {
    let batch_size = ciphertexts.len();
    let guardians: HashMap<GuardianId, &ElectionPublicKey> = guardians
        .iter()
        .map(|guardian| (guardian.sequence_order, guardian))
        .collect();

    if guardians.len() as u64 != context.number_of_guardians
        || decryption_shares
            .keys()
            .any(|guardian_id| !guardians.contains_key(guardian_id))
        || compensated_shares
            .keys()
            .any(|(missing_guardian, compensating_guardian)| {
                !guardians.contains_key(missing_guardian)
                    || !decryption_shares.contains_key(compensating_guardian)
            })
        || decryption_shares
            .values()
            .any(|shares| shares.len() != batch_size)
        || compensated_shares
            .values()
            .any(|shares| shares.len() != batch_size)
    {
        return Err(SanityCheckError::InvalidParams().into());
    }

    let mut present: Vec<GuardianId> = decryption_shares.keys().copied().collect();
    present.sort_unstable();
    let mut missing: Vec<GuardianId> = guardians
        .keys()
        .copied()
        .filter(|guardian_id| !decryption_shares.contains_key(guardian_id))
        .collect();
    missing.sort_unstable();

    // The compensating guardians of each missing guardian, all of whom must be present.
    let compensating: HashMap<GuardianId, Vec<GuardianId>> = missing
        .iter()
        .map(|missing_guardian| {
            let mut compensating: Vec<GuardianId> = present
                .iter()
                .copied()
                .filter(|guardian_id| {
                    compensated_shares.contains_key(&(*missing_guardian, *guardian_id))
                })
                .collect();
            compensating.sort_unstable();

            (*missing_guardian, compensating)
        })
        .collect();

    let unrecoverable: Vec<GuardianId> = missing
        .iter()
        .copied()
        .filter(|missing_guardian| {
            compensating
                .get(missing_guardian)
                .map_or(0, Vec::len) < context.quorum as usize
        })
        .collect();

    if !unrecoverable.is_empty() {
        return Err(ProtocolError::MissingDecryptionShares {
            missing_guardians: unrecoverable,
        }
        .into());
    }

    let mut malicious_guardians: HashSet<GuardianId> = decryption_shares
        .iter()
        .filter(|(guardian_id, shares)| {
            guardians.get(*guardian_id).map_or(true, |guardian| {
                shares.iter().zip(ciphertexts).any(|(share, ciphertext)| {
                    !share
                        .is_valid(group, ciphertext, guardian, &context.crypto_extended_base_hash)
                        .is_valid()
                })
            })
        })
        .map(|(guardian_id, _)| *guardian_id)
        .collect();

    malicious_guardians.extend(
        compensated_shares
            .iter()
            .filter(|((missing_guardian, compensating_guardian), shares)| {
                guardians.get(missing_guardian).map_or(true, |missing_guardian| {
                    shares.iter().zip(ciphertexts).any(|(share, ciphertext)| {
                        share.guardian_id != *compensating_guardian
                            || !share
                                .is_valid(
                                    group,
                                    ciphertext,
                                    missing_guardian,
                                    &context.crypto_extended_base_hash,
                                )
                                .is_valid()
                    })
                })
            })
            .map(|((_, compensating_guardian), _)| *compensating_guardian),
    );

    if !malicious_guardians.is_empty() {
        let mut malicious_guardians: Vec<GuardianId> = malicious_guardians.into_iter().collect();
        malicious_guardians.sort_unstable();

        log::warn!("guardians {malicious_guardians:?} submitted invalid decryption shares");

        return Err(ProtocolError::ProofVerificationError {
            malicious_guardians,
        }
        .into());
    }

    let lagrange_coefficients: HashMap<GuardianId, HashMap<GuardianId, ElementModQ>> = compensating
        .iter()
        .map(|(missing_guardian, compensating)| {
            Ok((
                *missing_guardian,
                compute_lagrange_coefficients(group, compensating)?,
            ))
        })
        .collect::<Result<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let iter = ciphertexts.iter().enumerate();
    #[cfg(feature = "parallel")]
    let iter = ciphertexts.par_iter().enumerate();

    iter.map(|(i, ciphertext)| {
        let mut shares: Vec<ElementModP> = present
            .iter()
            .map(|guardian_id| {
                decryption_shares
                    .get(guardian_id)
                    .and_then(|shares| shares.get(i))
                    .map(|share| share.share)
                    .ok_or(Error::InternalError)
            })
            .collect::<Result<_>>()?;

        for missing_guardian in &missing {
            let compensated: Vec<&CompensatedDecryptionShare> = compensating
                .get(missing_guardian)
                .ok_or(Error::InternalError)?
                .iter()
                .map(|compensating_guardian| {
                    compensated_shares
                        .get(&(*missing_guardian, *compensating_guardian))
                        .and_then(|shares| shares.get(i))
                        .ok_or(Error::InternalError)
                })
                .collect::<Result<_>>()?;

            shares.push(reconstruct_decryption_share(
                group,
                &compensated,
                lagrange_coefficients
                    .get(missing_guardian)
                    .ok_or(Error::InternalError)?,
            )?);
        }

        ciphertext.decrypt_known_product(group, &group.mult_all_p(&shares), discrete_log)
    })
    .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::seq::IteratorRandom;
    use rand_core::OsRng;
    use rstest::rstest;

    use super::*;
    use crate::{elgamal, guardian::tests::guardians, test_exports::test_group};

    pub(crate) struct Ceremony {
        pub(crate) context: ElectionContext,
        pub(crate) public_keys: Vec<ElectionPublicKey>,
        pub(crate) guardians: Vec<DecryptingGuardian>,
    }

    /// Runs a key ceremony in which every guardian backs up its secret to every other.
    pub(crate) fn ceremony(group: &GroupParameters, number_of_guardians: u64, quorum: u64) -> Ceremony {
        let key_pairs = guardians(group, number_of_guardians, quorum as usize);
        let public_keys: Vec<ElectionPublicKey> = key_pairs.iter().map(|key_pair| key_pair.share()).collect();
        let context = ElectionContext::new(
            group,
            number_of_guardians,
            quorum,
            group.u64_to_q(42),
            &public_keys,
        )
        .unwrap();

        let guardians = key_pairs
            .iter()
            .map(|designated| {
                let backups = key_pairs
                    .iter()
                    .filter(|owner| owner.sequence_order != designated.sequence_order)
                    .map(|owner| owner.partial_key_backup(group, &designated.share()).unwrap())
                    .collect();

                DecryptingGuardian::new(designated, backups).unwrap()
            })
            .collect();

        Ceremony {
            context,
            public_keys,
            guardians,
        }
    }

    fn encrypt(group: &GroupParameters, context: &ElectionContext, messages: &[i64]) -> Vec<Ciphertext> {
        messages
            .iter()
            .map(|message| {
                elgamal::encrypt(
                    group,
                    *message,
                    &group.rand_range_q(1, &mut OsRng).unwrap(),
                    &context.elgamal_public_key,
                )
                .unwrap()
            })
            .collect()
    }

    /// Decrypts with the guardians in `present`, compensating for the others.
    fn decrypt(
        group: &GroupParameters,
        ceremony: &Ceremony,
        ciphertexts: &[Ciphertext],
        present: &[GuardianId],
    ) -> (
        HashMap<GuardianId, Vec<DecryptionShare>>,
        HashMap<(GuardianId, GuardianId), Vec<CompensatedDecryptionShare>>,
    ) {
        let extended_base_hash = ceremony.context.crypto_extended_base_hash;
        let present_guardians: Vec<&DecryptingGuardian> = ceremony
            .guardians
            .iter()
            .filter(|guardian| present.contains(&guardian.guardian_id))
            .collect();

        let decryption_shares = present_guardians
            .iter()
            .map(|guardian| {
                (
                    guardian.guardian_id,
                    guardian.partially_decrypt(group, ciphertexts, &extended_base_hash, &mut OsRng),
                )
            })
            .collect();

        let mut compensated_shares = HashMap::new();
        for missing in ceremony
            .public_keys
            .iter()
            .filter(|public_key| !present.contains(&public_key.sequence_order))
        {
            for guardian in &present_guardians {
                compensated_shares.insert(
                    (missing.sequence_order, guardian.guardian_id),
                    guardian
                        .compensate_decrypt(group, missing, ciphertexts, &extended_base_hash, &mut OsRng)
                        .unwrap(),
                );
            }
        }

        (decryption_shares, compensated_shares)
    }

    #[test]
    fn all_guardians_decrypt() {
        let group = test_group();
        let ceremony = ceremony(&group, 3, 2);
        let ciphertexts = encrypt(&group, &ceremony.context, &[0, 1, 5]);
        let (decryption_shares, compensated_shares) = decrypt(&group, &ceremony, &ciphertexts, &[1, 2, 3]);

        for (guardian_id, shares) in &decryption_shares {
            let public_key = &ceremony.public_keys[*guardian_id as usize - 1];
            for (share, ciphertext) in shares.iter().zip(&ciphertexts) {
                assert!(share
                    .is_valid(&group, ciphertext, public_key, &ceremony.context.crypto_extended_base_hash)
                    .is_valid());
            }
        }

        assert_eq!(
            combine_decryption_shares(
                &group,
                &ceremony.context,
                &ceremony.public_keys,
                &ciphertexts,
                &decryption_shares,
                &compensated_shares,
                &DiscreteLog::new(&group),
            ),
            Ok(vec![0, 1, 5])
        );
    }

    #[test]
    fn compensated_shares_recover_a_missing_guardian() {
        let group = test_group();
        let ceremony = ceremony(&group, 3, 2);
        let ciphertexts = encrypt(&group, &ceremony.context, &[3, 7]);
        let (decryption_shares, compensated_shares) = decrypt(&group, &ceremony, &ciphertexts, &[1, 3]);

        let missing = &ceremony.guardians[1];
        let lagrange_coefficients = compute_lagrange_coefficients(&group, &[1, 3]).unwrap();
        for (i, ciphertext) in ciphertexts.iter().enumerate() {
            let compensated: Vec<&CompensatedDecryptionShare> = [1, 3]
                .iter()
                .map(|guardian_id| &compensated_shares[&(2, *guardian_id)][i])
                .collect();

            assert_eq!(
                reconstruct_decryption_share(&group, &compensated, &lagrange_coefficients),
                Ok(ciphertext.partial_decrypt(&group, &missing.secret_key))
            );
        }

        assert_eq!(
            combine_decryption_shares(
                &group,
                &ceremony.context,
                &ceremony.public_keys,
                &ciphertexts,
                &decryption_shares,
                &compensated_shares,
                &DiscreteLog::new(&group),
            ),
            Ok(vec![3, 7])
        );
    }

    #[rstest]
    #[case(3, 2)]
    #[case(5, 3)]
    fn any_quorum_of_guardians_decrypts(#[case] number_of_guardians: u64, #[case] quorum: u64) {
        let group = test_group();
        let ceremony = ceremony(&group, number_of_guardians, quorum);
        let ciphertexts = encrypt(&group, &ceremony.context, &[0, 2, 4]);
        let present: Vec<GuardianId> =
            (1..=number_of_guardians).choose_multiple(&mut OsRng, quorum as usize);
        let (decryption_shares, compensated_shares) =
            decrypt(&group, &ceremony, &ciphertexts, &present);

        assert_eq!(
            combine_decryption_shares(
                &group,
                &ceremony.context,
                &ceremony.public_keys,
                &ciphertexts,
                &decryption_shares,
                &compensated_shares,
                &DiscreteLog::new(&group),
            ),
            Ok(vec![0, 2, 4])
        );
    }

    #[test]
    fn reports_guardians_with_invalid_shares() {
        let group = test_group();
        let ceremony = ceremony(&group, 3, 2);
        let ciphertexts = encrypt(&group, &ceremony.context, &[1]);
        let (mut decryption_shares, mut compensated_shares) =
            decrypt(&group, &ceremony, &ciphertexts, &[1, 3]);

        decryption_shares.get_mut(&1).unwrap()[0].share = group.generator();
        compensated_shares.get_mut(&(2, 3)).unwrap()[0].share = group.generator();

        assert_eq!(
            combine_decryption_shares(
                &group,
                &ceremony.context,
                &ceremony.public_keys,
                &ciphertexts,
                &decryption_shares,
                &compensated_shares,
                &DiscreteLog::new(&group),
            ),
            Err(Error::ProtocolError(ProtocolError::ProofVerificationError {
                malicious_guardians: vec![1, 3]
            }))
        );
    }

    #[test]
    fn too_few_guardians_cannot_decrypt() {
        let group = test_group();
        let ceremony = ceremony(&group, 3, 3);
        let ciphertexts = encrypt(&group, &ceremony.context, &[1]);
        let (decryption_shares, compensated_shares) = decrypt(&group, &ceremony, &ciphertexts, &[1, 2]);

        assert_eq!(
            combine_decryption_shares(
                &group,
                &ceremony.context,
                &ceremony.public_keys,
                &ciphertexts,
                &decryption_shares,
                &compensated_shares,
                &DiscreteLog::new(&group),
            ),
            Err(Error::ProtocolError(ProtocolError::MissingDecryptionShares {
                missing_guardians: vec![3]
            }))
        );
    }

    #[test]
    fn compensation_requires_a_backup() {
        let group = test_group();
        let ceremony = ceremony(&group, 2, 1);
        let lonely = DecryptingGuardian::new(
            &guardians(&group, 1, 1).remove(0),
            vec![],
        )
        .unwrap();

        assert_eq!(
            lonely.compensate_decrypt(
                &group,
                &ceremony.public_keys[1],
                &[],
                &ceremony.context.crypto_extended_base_hash,
                &mut OsRng
            ),
            Err(Error::SanityCheckError(SanityCheckError::UnknownObject(
                "guardian-2".to_string()
            )))
        );
    }
}
