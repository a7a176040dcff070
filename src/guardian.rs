// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! A guardian's key material: the election key pair derived from its secret polynomial, the
//! public half it shares with the other guardians, and the partial key backups that let a
//! quorum decrypt on its behalf.

use crypto_bigint::rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    elgamal::KeyPair,
    proofs::{ProofValidation, SchnorrProof},
    secret_sharing::{calculate_g_exp_pi_at_l, verify_polynomial_coordinate, ElectionPolynomial},
    ElementModP, ElementModQ, GroupParameters, GuardianId, Result, SanityCheckError,
};

/// The public part of a guardian's election key, published during the key ceremony.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPublicKey {
    pub owner_id: String,
    // The guardian's x-coordinate, starting at 1.
    pub sequence_order: GuardianId,
    // $ K_i = K_{i,0} $
    pub key: ElementModP,
    pub coefficient_commitments: Vec<ElementModP>,
    pub coefficient_proofs: Vec<SchnorrProof>,
}

impl ElectionPublicKey {
    /// The quorum this guardian's polynomial was generated for.
    pub fn quorum(&self) -> usize {
        self.coefficient_commitments.len()
    }

    pub fn is_valid(&self, group: &GroupParameters) -> ProofValidation {
        let mut validation = ProofValidation::new(format!("guardian {}", self.owner_id));

        validation.check(
            "key_is_first_commitment",
            self.coefficient_commitments.first() == Some(&self.key),
        );
        validation.check(
            "consistent_lengths",
            self.coefficient_commitments.len() == self.coefficient_proofs.len(),
        );

        for (commitment, proof) in self
            .coefficient_commitments
            .iter()
            .zip(&self.coefficient_proofs)
        {
            validation.check("proof_matches_commitment", proof.public_key() == commitment);
            validation.merge(proof.is_valid(group));
        }

        validation
    }

    /// $g^{P_i(\ell)}$, the public key a present guardian $\ell$ proves its compensated
    /// decryption shares for this (missing) guardian against.
    pub fn recovery_public_key_for(
        &self,
        group: &GroupParameters,
        compensating_guardian: GuardianId,
    ) -> ElementModP {
        calculate_g_exp_pi_at_l(group, compensating_guardian, &self.coefficient_commitments)
    }
}

/// A guardian's election key pair and the polynomial it was derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionKeyPair {
    pub owner_id: String,
    pub sequence_order: GuardianId,
    key_pair: KeyPair,
    polynomial: ElectionPolynomial,
}

impl ElectionKeyPair {
    pub fn generate(
        group: &GroupParameters,
        owner_id: impl Into<String>,
        sequence_order: GuardianId,
        quorum: usize,
        nonce: Option<&ElementModQ>,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Self> {
        if sequence_order == 0 {
            // $P_i(0)$ is the secret itself.
            return Err(SanityCheckError::InvalidParams().into());
        }

        let polynomial = ElectionPolynomial::generate(group, quorum, nonce, rng)?;
        let key_pair = KeyPair::new_unchecked(group, polynomial.secret()?);

        Ok(Self {
            owner_id: owner_id.into(),
            sequence_order,
            key_pair,
            polynomial,
        })
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn polynomial(&self) -> &ElectionPolynomial {
        &self.polynomial
    }

    /// The Schnorr proof of knowledge of the secret $a_{i,0}$.
    pub fn proof(&self) -> Result<&SchnorrProof> {
        self.polynomial
            .proofs()
            .first()
            .ok_or(SanityCheckError::InvalidQuorum.into())
    }

    pub fn share(&self) -> ElectionPublicKey {
        ElectionPublicKey {
            owner_id: self.owner_id.clone(),
            sequence_order: self.sequence_order,
            key: *self.key_pair.public_key(),
            coefficient_commitments: self.polynomial.commitments().to_vec(),
            coefficient_proofs: self.polynomial.proofs().to_vec(),
        }
    }

    /// Computes the backup $P_i(\ell)$ of this guardian's secret for `designated`.
    pub fn partial_key_backup(
        &self,
        group: &GroupParameters,
        designated: &ElectionPublicKey,
    ) -> Result<PartialKeyBackup> {
        Ok(PartialKeyBackup {
            owner_id: self.owner_id.clone(),
            owner_sequence_order: self.sequence_order,
            designated_id: designated.owner_id.clone(),
            designated_sequence_order: designated.sequence_order,
            value: self
                .polynomial
                .value_at(group, designated.sequence_order)?,
        })
    }
}

/// The value $P_i(\ell)$ of the owner's polynomial at the designated guardian's coordinate.
///
/// The designated guardian keeps it to decrypt on the owner's behalf should the owner be
/// missing at decryption time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialKeyBackup {
    pub owner_id: String,
    pub owner_sequence_order: GuardianId,
    pub designated_id: String,
    pub designated_sequence_order: GuardianId,
    pub value: ElementModQ,
}

impl PartialKeyBackup {
    /// Verifies the backup against the commitments the owner published.
    pub fn verify(&self, group: &GroupParameters, owner: &ElectionPublicKey) -> bool {
        let verified = self.owner_id == owner.owner_id
            && self.owner_sequence_order == owner.sequence_order
            && verify_polynomial_coordinate(
                group,
                &self.value,
                self.designated_sequence_order,
                &owner.coefficient_commitments,
            );

        if !verified {
            log::debug!(
                "backup from {} for {} failed verification",
                self.owner_id,
                self.designated_id
            );
        }

        verified
    }
}
