// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use serde::{Deserialize, Serialize};

use super::{Commitments, ProofValidation, CONSTANT_PROOF_HEADER};
use crate::{
    elgamal::Ciphertext, hash_elems, nonces::NonceSequence, ElementModP, ElementModQ,
    GroupParameters,
};

/// A proof that $\log_g K = \log_\alpha M$, i.e. that the partial decryption $M = \alpha^s$ of
/// a ciphertext $(\alpha, \beta)$ was computed with the secret $s$ behind the public key
/// $K = g^s$.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaumPedersenProof {
    // $ (a, b) = (g^u, \alpha^u) $
    commitments: Commitments<(ElementModP, ElementModP)>,
    challenge: ElementModQ,
    response: ElementModQ,
}

impl ChaumPedersenProof {
    pub fn make(
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        secret: &ElementModQ,
        partial_decryption: &ElementModP,
        seed: &ElementModQ,
        extended_base_hash: &ElementModQ,
    ) -> Self {
        let u = NonceSequence::with_headers(group, *seed, &[&CONSTANT_PROOF_HEADER]).get(0);

        let a = group.g_pow_p(&u);
        let b = group.pow_p(&ciphertext.pad, &u);

        let challenge = hash_elems(
            group,
            &[
                extended_base_hash,
                &ciphertext.pad,
                &ciphertext.data,
                &a,
                &b,
                partial_decryption,
            ],
        );
        // $ v = u + c \cdot s $
        let response = group.a_plus_bc_q(&u, &challenge, secret);

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

    /// The stored commitments, or $(g^v / K^c, \alpha^v / M^c)$ when they are derived.
    pub fn commitments(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
        partial_decryption: &ElementModP,
    ) -> (ElementModP, ElementModP) {
        match self.commitments {
            Commitments::Stored(commitments) => commitments,
            Commitments::Derived => {
                let a = group
                    .div_p(
                        &group.g_pow_p(&self.response),
                        &group.pow_p(public_key, &self.challenge),
                    )
                    .unwrap_or(ElementModP::ZERO);
                let b = group
                    .div_p(
                        &group.pow_p(&ciphertext.pad, &self.response),
                        &group.pow_p(partial_decryption, &self.challenge),
                    )
                    .unwrap_or(ElementModP::ZERO);

                (a, b)
            }
        }
    }

    pub fn expand(
        &self,
        group: &GroupParameters,
        ciphertext: &Ciphertext,
        public_key: &ElementModP,
        partial_decryption: &ElementModP,
    ) -> Self {
        Self {
            commitments: Commitments::Stored(self.commitments(
                group,
                ciphertext,
                public_key,
                partial_decryption,
            )),
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
        partial_decryption: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> ProofValidation {
        let mut validation = ProofValidation::new("chaum pedersen proof");
        let (a, b) = self.commitments(group, ciphertext, public_key, partial_decryption);

        validation.check("in_bounds_alpha", group.is_valid_residue(&ciphertext.pad));
        validation.check("in_bounds_beta", group.is_valid_residue(&ciphertext.data));
        validation.check("in_bounds_k", group.is_valid_residue(public_key));
        validation.check("in_bounds_m", group.is_valid_residue(partial_decryption));
        validation.check("in_bounds_a", group.is_valid_residue(&a));
        validation.check("in_bounds_b", group.is_valid_residue(&b));
        validation.check("in_bounds_c", group.is_in_bounds_q(&self.challenge));
        validation.check("in_bounds_v", group.is_in_bounds_q(&self.response));

        let challenge = hash_elems(
            group,
            &[
                extended_base_hash,
                &ciphertext.pad,
                &ciphertext.data,
                &a,
                &b,
                partial_decryption,
            ],
        );
        validation.check("same_c", challenge == self.challenge);

        // $ g^v = a \cdot K^c $
        validation.check(
            "consistent_gv",
            group.g_pow_p(&self.response)
                == group.mult_p(&a, &group.pow_p(public_key, &self.challenge)),
        );
        // $ \alpha^v = b \cdot M^c $
        validation.check(
            "consistent_av",
            group.pow_p(&ciphertext.pad, &self.response)
                == group.mult_p(&b, &group.pow_p(partial_decryption, &self.challenge)),
        );

        validation
    }
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;
    use rstest::rstest;

    use super::*;
    use crate::{elgamal, elgamal::KeyPair, test_exports::test_group};

    struct Statement {
        ciphertext: Ciphertext,
        key_pair: KeyPair,
        partial_decryption: ElementModP,
        extended_base_hash: ElementModQ,
    }

    fn statement(group: &GroupParameters) -> Statement {
        let key_pair = KeyPair::random(group, &mut OsRng).unwrap();
        let ciphertext = elgamal::encrypt(
            group,
            5,
            &group.rand_range_q(1, &mut OsRng).unwrap(),
            key_pair.public_key(),
        )
        .unwrap();
        let partial_decryption = ciphertext.partial_decrypt(group, key_pair.secret_key());

        Statement {
            ciphertext,
            key_pair,
            partial_decryption,
            extended_base_hash: group.rand_q(&mut OsRng),
        }
    }

    fn make(group: &GroupParameters, statement: &Statement) -> ChaumPedersenProof {
        ChaumPedersenProof::make(
            group,
            &statement.ciphertext,
            statement.key_pair.secret_key(),
            &statement.partial_decryption,
            &group.rand_q(&mut OsRng),
            &statement.extended_base_hash,
        )
    }

    fn is_valid(
        group: &GroupParameters,
        proof: &ChaumPedersenProof,
        statement: &Statement,
    ) -> ProofValidation {
        proof.is_valid(
            group,
            &statement.ciphertext,
            statement.key_pair.public_key(),
            &statement.partial_decryption,
            &statement.extended_base_hash,
        )
    }

    #[test]
    fn valid_proof_verifies() {
        let group = GroupParameters::standard();
        let statement = statement(group);
        let proof = make(group, &statement);

        assert!(is_valid(group, &proof, &statement).is_valid());
        assert!(is_valid(group, &proof.without_commitments(), &statement).is_valid());
        assert_eq!(
            proof.without_commitments().expand(
                group,
                &statement.ciphertext,
                statement.key_pair.public_key(),
                &statement.partial_decryption
            ),
            proof
        );
    }

    #[test]
    fn wrong_partial_decryption_fails_verification() {
        let group = test_group();
        let mut statement = statement(&group);
        let proof = make(&group, &statement);

        statement.partial_decryption = group.mult_p(&statement.partial_decryption, &group.generator());

        let validation = is_valid(&group, &proof, &statement);
        assert!(validation.failures().contains(&"same_c".to_string()));
        assert!(validation.failures().contains(&"consistent_av".to_string()));
    }

    #[rstest]
    #[case::a(0)]
    #[case::b(1)]
    #[case::challenge(2)]
    #[case::response(3)]
    fn changing_any_field_fails_verification(#[case] field: usize) {
        let group = test_group();
        let statement = statement(&group);
        let valid_proof = make(&group, &statement);
        let random_element = group.g_pow_p(&group.rand_q(&mut OsRng));

        let mut invalid_proof = valid_proof.clone();
        let (a, b) = valid_proof.commitments.stored().unwrap();
        match field {
            0 => invalid_proof.commitments = Commitments::Stored((random_element, b)),
            1 => invalid_proof.commitments = Commitments::Stored((a, random_element)),
            2 => invalid_proof.challenge = group.add_q(&valid_proof.challenge, &ElementModQ::ONE),
            _ => invalid_proof.response = group.add_q(&valid_proof.response, &ElementModQ::ONE),
        }

        assert!(!is_valid(&group, &invalid_proof, &statement).is_valid());
    }
}
