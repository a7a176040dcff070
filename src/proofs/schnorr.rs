// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use serde::{Deserialize, Serialize};

use super::{Commitments, ProofValidation};
use crate::{elgamal::KeyPair, hash_elems, ElementModP, ElementModQ, GroupParameters};

/// A proof of knowledge of the secret key $s$ behind a public key $K = g^s$.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    public_key: ElementModP,
    // $ h = g^n $
    commitment: Commitments<ElementModP>,
    challenge: ElementModQ,
    response: ElementModQ,
}

impl SchnorrProof {
    pub fn make(group: &GroupParameters, key_pair: &KeyPair, nonce: &ElementModQ) -> Self {
        let public_key = *key_pair.public_key();
        let commitment = group.g_pow_p(nonce);

        // $ c = H(K, h) $
        let challenge = hash_elems(group, &[&public_key, &commitment]);
        // $ u = n + s \cdot c $
        let response = group.a_plus_bc_q(nonce, key_pair.secret_key(), &challenge);

        Self {
            public_key,
            commitment: Commitments::Stored(commitment),
            challenge,
            response,
        }
    }

    pub fn public_key(&self) -> &ElementModP {
        &self.public_key
    }

    pub fn challenge(&self) -> &ElementModQ {
        &self.challenge
    }

    pub fn response(&self) -> &ElementModQ {
        &self.response
    }

    /// The stored commitment, or $h = g^u / K^c$ when it is derived.
    pub fn commitment(&self, group: &GroupParameters) -> ElementModP {
        match self.commitment {
            Commitments::Stored(commitment) => commitment,
            Commitments::Derived => group
                .div_p(
                    &group.g_pow_p(&self.response),
                    &group.pow_p(&self.public_key, &self.challenge),
                )
                .unwrap_or(ElementModP::ZERO),
        }
    }

    pub fn expand(&self, group: &GroupParameters) -> Self {
        Self {
            commitment: Commitments::Stored(self.commitment(group)),
            ..self.clone()
        }
    }

    pub fn without_commitment(&self) -> Self {
        Self {
            commitment: Commitments::Derived,
            ..self.clone()
        }
    }

    pub fn is_valid(&self, group: &GroupParameters) -> ProofValidation {
        let mut validation = ProofValidation::new("schnorr proof");
        let commitment = self.commitment(group);

        validation.check("valid_public_key", group.is_valid_residue(&self.public_key));
        validation.check("in_bounds_h", group.is_in_bounds_p(&commitment) && !commitment.is_zero());
        validation.check("in_bounds_u", group.is_in_bounds_q(&self.response));
        validation.check(
            "same_c",
            hash_elems(group, &[&self.public_key, &commitment]) == self.challenge,
        );
        validation.check(
            "consistent_gu",
            group.g_pow_p(&self.response)
                == group.mult_p(&commitment, &group.pow_p(&self.public_key, &self.challenge)),
        );

        validation
    }
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;
    use rstest::rstest;

    use super::*;
    use crate::test_exports::test_group;

    fn valid_proof(group: &GroupParameters) -> SchnorrProof {
        let key_pair = KeyPair::random(group, &mut OsRng).unwrap();

        SchnorrProof::make(group, &key_pair, &group.rand_q(&mut OsRng))
    }

    #[test]
    fn valid_proof_verifies() {
        let group = GroupParameters::standard();
        let proof = valid_proof(group);

        assert!(proof.is_valid(group).is_valid());
        assert!(proof.without_commitment().is_valid(group).is_valid());
        assert_eq!(proof.without_commitment().expand(group), proof);
    }

    #[test]
    fn proofs_of_coefficients_below_two_verify() {
        let group = test_group();

        for secret in [0, 1] {
            let key_pair = KeyPair::new_unchecked(&group, group.u64_to_q(secret));
            let proof = SchnorrProof::make(&group, &key_pair, &group.rand_q(&mut OsRng));

            assert!(proof.is_valid(&group).is_valid());
        }
    }

    #[rstest]
    #[case::commitment("commitment")]
    #[case::challenge("challenge")]
    #[case::response("response")]
    #[case::public_key("public_key")]
    fn changing_any_field_fails_verification(#[case] field: &str) {
        let group = test_group();
        let valid_proof = valid_proof(&group);
        let other = valid_proof.clone();
        let random_element = group.g_pow_p(&group.rand_q(&mut OsRng));

        let mut invalid_proof = valid_proof;
        match field {
            "commitment" => invalid_proof.commitment = Commitments::Stored(random_element),
            "challenge" => {
                invalid_proof.challenge = group.add_q(&other.challenge, &ElementModQ::ONE)
            }
            "response" => invalid_proof.response = group.add_q(&other.response, &ElementModQ::ONE),
            _ => invalid_proof.public_key = random_element,
        }

        let validation = invalid_proof.is_valid(&group);
        assert!(!validation.is_valid());
        assert!(validation.failures().contains(&"same_c".to_string()) || field == "response");
        if field != "commitment" {
            assert!(!invalid_proof.without_commitment().is_valid(&group).is_valid());
        }
    }
}
