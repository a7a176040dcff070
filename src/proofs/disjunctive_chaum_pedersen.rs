// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use serde::{Deserialize, Serialize};

use super::{Commitments, ProofValidation, DISJUNCTIVE_PROOF_HEADER};
use crate::{
    elgamal::Ciphertext, hash_elems, nonces::NonceSequence, ElementModP, ElementModQ,
    GroupParameters, Result, SanityCheckError,
};

/// One branch of a disjunctive proof: a Chaum-Pedersen proof for one of the two possible
/// plaintexts, of which exactly one is real and the other simulated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjunctiveBranch {
    commitments: Commitments<(ElementModP, ElementModP)>,
    challenge: ElementModQ,
    response: ElementModQ,
}

impl DisjunctiveBranch {
    fn stored(a: ElementModP, b: ElementModP, challenge: ElementModQ, response: ElementModQ) -> Self {
        Self {
            commitments: Commitments::Stored((a, b)),
            challenge,
            response,
        }
    }

    pub fn challenge(&self) -> &ElementModQ {
        &self.challenge
    }

    pub fn response(&self) -> &ElementModQ {
        &self.response
    }
}

/// A proof that an ElGamal ciphertext encrypts either zero or one, without revealing which.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjunctiveChaumPedersenProof {
    zero: DisjunctiveBranch,
    one: DisjunctiveBranch,
    // $ c = c_0 + c_1 $
    challenge: ElementModQ,
}

impl DisjunctiveChaumPedersenProof {
    /// Proves that `ciphertext`, encrypted with `nonce` under `public_key`, encrypts
    /// `plaintext`, which must be zero or one.
    pub fn make(
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        nonce: &ElementModQ,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
        seed: &ElementModQ,
        plaintext: u64,
    ) -> Result<Self> {
        let nonces = NonceSequence::with_headers(group, *seed, &[&DISJUNCTIVE_PROOF_HEADER]);
        let (n0, n1, n2) = (nonces.get(0), nonces.get(1), nonces.get(2));

        let challenge = |a0: &ElementModP, b0: &ElementModP, a1: &ElementModP, b1: &ElementModP| {
            hash_elems(
                group,
                &[
                    extended_base_hash,
                    &ciphertext.pad,
                    &ciphertext.data,
                    a0,
                    b0,
                    a1,
                    b1,
                ],
            )
        };

        match plaintext {
            0 => {
                // The zero branch is real, the one branch is simulated with challenge $c_1$.
                let (c1, v, u0) = (n0, n1, n2);

                let a0 = group.g_pow_p(&u0);
                let b0 = group.pow_p(public_key, &u0);
                let a1 = group.g_pow_p(&v);
                let b1 = group.mult_p(&group.pow_p(public_key, &v), &group.g_pow_p(&c1));

                let c = challenge(&a0, &b0, &a1, &b1);
                let c0 = group.a_minus_b_q(&c, &c1);
                let v0 = group.a_plus_bc_q(&u0, &c0, nonce);
                let v1 = group.a_plus_bc_q(&v, &c1, nonce);

                Ok(Self {
                    zero: DisjunctiveBranch::stored(a0, b0, c0, v0),
                    one: DisjunctiveBranch::stored(a1, b1, c1, v1),
                    challenge: c,
                })
            }
            1 => {
                // The one branch is real, the zero branch is simulated with challenge $-w$.
                let (w, v, u1) = (n0, n1, n2);

                let a0 = group.g_pow_p(&v);
                let b0 = group.mult_p(&group.pow_p(public_key, &v), &group.g_pow_p(&w));
                let a1 = group.g_pow_p(&u1);
                let b1 = group.pow_p(public_key, &u1);

                let c = challenge(&a0, &b0, &a1, &b1);
                let c0 = group.negate_q(&w);
                let c1 = group.add_q(&c, &w);
                let v0 = group.a_plus_bc_q(&v, &c0, nonce);
                let v1 = group.a_plus_bc_q(&u1, &c1, nonce);

                Ok(Self {
                    zero: DisjunctiveBranch::stored(a0, b0, c0, v0),
                    one: DisjunctiveBranch::stored(a1, b1, c1, v1),
                    challenge: c,
                })
            }
            _ => Err(SanityCheckError::InvalidPlaintext(plaintext).into()),
        }
    }

    pub fn challenge(&self) -> &ElementModQ {
        &self.challenge
    }

    pub fn zero(&self) -> &DisjunctiveBranch {
        &self.zero
    }

    pub fn one(&self) -> &DisjunctiveBranch {
        &self.one
    }

    /// The commitments $(a_0, b_0, a_1, b_1)$, re-derived from the challenges and responses
    /// where they are not stored.
    pub fn commitments(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
    ) -> (ElementModP, ElementModP, ElementModP, ElementModP) {
        let (alpha, beta) = (&ciphertext.pad, &ciphertext.data);

        let (a0, b0) = self.zero.commitments.stored().unwrap_or_else(|| {
            let minus_c0 = group.negate_q(&self.zero.challenge);

            // $ a_0 = g^{v_0} \alpha^{-c_0}, b_0 = K^{v_0} \beta^{-c_0} $
            (
                group.mult_p(&group.g_pow_p(&self.zero.response), &group.pow_p(alpha, &minus_c0)),
                group.mult_p(
                    &group.pow_p(public_key, &self.zero.response),
                    &group.pow_p(beta, &minus_c0),
                ),
            )
        });

        let (a1, b1) = self.one.commitments.stored().unwrap_or_else(|| {
            let minus_c1 = group.negate_q(&self.one.challenge);

            // $ a_1 = g^{v_1} \alpha^{-c_1}, b_1 = g^{c_1} K^{v_1} \beta^{-c_1} $
            (
                group.mult_p(&group.g_pow_p(&self.one.response), &group.pow_p(alpha, &minus_c1)),
                group.mult_all_p(&[
                    group.g_pow_p(&self.one.challenge),
                    group.pow_p(public_key, &self.one.response),
                    group.pow_p(beta, &minus_c1),
                ]),
            )
        });

        (a0, b0, a1, b1)
    }

    pub fn expand(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
    ) -> Self {
        let (a0, b0, a1, b1) = self.commitments(group, ciphertext, public_key);

        Self {
            zero: DisjunctiveBranch::stored(a0, b0, self.zero.challenge, self.zero.response),
            one: DisjunctiveBranch::stored(a1, b1, self.one.challenge, self.one.response),
            challenge: self.challenge,
        }
    }

    pub fn without_commitments(&self) -> Self {
        let mut proof = self.clone();
        proof.zero.commitments = Commitments::Derived;
        proof.one.commitments = Commitments::Derived;

        proof
    }

    pub fn is_valid(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new("disjunctive chaum pedersen proof");
        let (alpha, beta) = (&ciphertext.pad, &ciphertext.data);
        let (a0, b0, a1, b1) = self.commitments(group, ciphertext, public_key);
        let (c0, v0) = (&self.zero.challenge, &self.zero.response);
        let (c1, v1) = (&self.one.challenge, &self.one.response);

        validation.check("in_bounds_alpha", group.is_valid_residue(alpha));
        validation.check("in_bounds_beta", group.is_valid_residue(beta));
        validation.check("in_bounds_k", group.is_valid_residue(public_key));
        validation.check("in_bounds_a0", group.is_valid_residue(&a0));
        validation.check("in_bounds_b0", group.is_valid_residue(&b0));
        validation.check("in_bounds_a1", group.is_valid_residue(&a1));
        validation.check("in_bounds_b1", group.is_valid_residue(&b1));
        validation.check("in_bounds_c0", group.is_in_bounds_q(c0));
        validation.check("in_bounds_c1", group.is_in_bounds_q(c1));
        validation.check("in_bounds_v0", group.is_in_bounds_q(v0));
        validation.check("in_bounds_v1", group.is_in_bounds_q(v1));

        let challenge = hash_elems(
            group,
            &[extended_base_hash, alpha, beta, &a0, &b0, &a1, &b1],
        );
        validation.check("same_c", challenge == self.challenge);
        validation.check("consistent_c", group.add_q(c0, c1) == self.challenge);

        // $ g^{v_0} = a_0 \alpha^{c_0} $
        validation.check(
            "consistent_gv0",
            group.g_pow_p(v0) == group.mult_p(&a0, &group.pow_p(alpha, c0)),
        );
        // $ g^{v_1} = a_1 \alpha^{c_1} $
        validation.check(
            "consistent_gv1",
            group.g_pow_p(v1) == group.mult_p(&a1, &group.pow_p(alpha, c1)),
        );
        // $ K^{v_0} = b_0 \beta^{c_0} $
        validation.check(
            "consistent_kv0",
            group.pow_p(public_key, v0) == group.mult_p(&b0, &group.pow_p(beta, c0)),
        );
        // $ g^{c_1} K^{v_1} = b_1 \beta^{c_1} $
        validation.check(
            "consistent_gc1kv1",
            group.mult_p(&group.g_pow_p(c1), &group.pow_p(public_key, v1))
                == group.mult_p(&b1, &group.pow_p(beta, c1)),
        );

        validation
    }
}
