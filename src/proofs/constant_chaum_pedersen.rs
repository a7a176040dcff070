// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use serde::{Deserialize, Serialize};

use super::{Commitments, ProofValidation, CONSTANT_PROOF_HEADER};
use crate::{
    elgamal::Ciphertext, hash_elems, nonces::NonceSequence, ElementModP, ElementModQ,
    GroupParameters,
};

/// Constants at or above this bound are rejected by the verifier.
pub const MAX_CONSTANT: u64 = 1_000_000_000;

/// A proof that an ElGamal ciphertext encrypts a known constant $L$, typically the selection
/// limit of a contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantChaumPedersenProof {
    // $ (a, b) = (g^u, K^u) $
    commitments: Commitments<(ElementModP, ElementModP)>,
    challenge: ElementModQ,
    response: ElementModQ,
    constant: u64,
}

impl ConstantChaumPedersenProof {
    /// Proves that `ciphertext`, encrypted with the aggregate `nonce` under `public_key`,
    /// encrypts `constant`.
    pub fn make(
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        nonce: &ElementModQ,
        public_key: &ElementModP,
        seed: &ElementModQ,
        extended_base_hash: &ElementModQ,
        constant: u64,
    ) -> Self {
        let u = NonceSequence::with_headers(group, *seed, &[&CONSTANT_PROOF_HEADER]).get(0);

        let a = group.g_pow_p(&u);
        let b = group.pow_p(public_key, &u);

        let challenge = hash_elems(
            group,
            &[extended_base_hash, &ciphertext.pad, &ciphertext.data, &a, &b],
        );
        // $ v = u + c \cdot r $
        let response = group.a_plus_bc_q(&u, &challenge, nonce);

        Self {
            commitments: Commitments::Stored((a, b)),
            challenge,
            response,
            constant,
        }
    }

    pub fn challenge(&self) -> &ElementModQ {
        &self.challenge
    }

    pub fn response(&self) -> &ElementModQ {
        &self.response
    }

    pub fn constant(&self) -> u64 {
        self.constant
    }

    /// The stored commitments, or $(g^v \alpha^{-c}, g^{Lc} K^v \beta^{-c})$ when they are
    /// derived.
    pub fn commitments(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
    ) -> (ElementModP, ElementModP) {
        self.commitments.stored().unwrap_or_else(|| {
            let minus_c = group.negate_q(&self.challenge);
            let lc = group.mult_q(&group.u64_to_q(self.constant), &self.challenge);

            (
                group.mult_p(
                    &group.g_pow_p(&self.response),
                    &group.pow_p(&ciphertext.pad, &minus_c),
                ),
                group.mult_all_p(&[
                    group.g_pow_p(&lc),
                    group.pow_p(public_key, &self.response),
                    group.pow_p(&ciphertext.data, &minus_c),
                ]),
            )
        })
    }

    pub fn expand(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
    ) -> Self {
        Self {
            commitments: Commitments::Stored(self.commitments(group, ciphertext, public_key)),
            ..self.clone()
        }
    }

    pub fn without_commitments(&self) -> Self {
        Self {
            commitments: Commitments::Derived,
            ..self.clone()
        }
    }

    pub fn is_valid(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new("constant chaum pedersen proof");
        let (alpha, beta) = (&ciphertext.pad, &ciphertext.data);
        let (a, b) = self.commitments(group, ciphertext, public_key);

        validation.check("in_bounds_alpha", group.is_valid_residue(alpha));
        validation.check("in_bounds_beta", group.is_valid_residue(beta));
        validation.check("in_bounds_k", group.is_valid_residue(public_key));
        validation.check("in_bounds_a", group.is_valid_residue(&a));
        validation.check("in_bounds_b", group.is_valid_residue(&b));
        validation.check("in_bounds_c", group.is_in_bounds_q(&self.challenge));
        validation.check("in_bounds_v", group.is_in_bounds_q(&self.response));
        validation.check("in_bounds_constant", self.constant < MAX_CONSTANT);

        let challenge = hash_elems(group, &[extended_base_hash, alpha, beta, &a, &b]);
        validation.check("same_c", challenge == self.challenge);

        // $ g^v = a \alpha^c $
        validation.check(
            "consistent_gv",
            group.g_pow_p(&self.response)
                == group.mult_p(&a, &group.pow_p(alpha, &self.challenge)),
        );
        // $ g^{Lc} K^v = b \beta^c $
        let lc = group.mult_q(&group.u64_to_q(self.constant), &self.challenge);
        validation.check(
            "consistent_kv",
            group.mult_p(&group.g_pow_p(&lc), &group.pow_p(public_key, &self.response))
                == group.mult_p(&b, &group.pow_p(beta, &self.challenge)),
        );

        validation
    }
}
