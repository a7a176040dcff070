// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! Shamir secret sharing of a guardian's election secret over $\mathbb{Z}_q$, with public
//! commitments to every coefficient so that shares can be verified.

use crypto_bigint::rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    elgamal::KeyPair,
    proofs::{ProofValidation, SchnorrProof},
    AsNaturalNumber, AsRingElement, ElementModP, ElementModQ, GroupParameters, ResidueModQ,
    Result, SanityCheckError,
};

pub mod shamir;

use shamir::Polynomial;

/// A guardian's secret polynomial $P(x) = \sum_{i=0}^{k-1} a_i x^i$ of degree $k - 1$, where $k$
/// is the quorum, together with the commitments $K_i = g^{a_i}$ and a Schnorr proof of
/// knowledge for each coefficient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPolynomial {
    coefficients: Vec<ElementModQ>,
    commitments: Vec<ElementModP>,
    proofs: Vec<SchnorrProof>,
}

impl ElectionPolynomial {
    /// Generates a polynomial with `quorum` coefficients.
    ///
    /// With a `nonce` the coefficients are $a_i = nonce + i$, which is only meant for
    /// reproducible tests; otherwise they are sampled uniformly.
    pub fn generate(
        group: &GroupParameters,
        quorum: usize,
        nonce: Option<&ElementModQ>,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Self> {
        if quorum == 0 {
            return Err(SanityCheckError::InvalidQuorum.into());
        }

        let coefficients: Vec<ElementModQ> = (0..quorum as u64)
            .map(|i| match nonce {
                Some(nonce) => group.add_q(nonce, &group.u64_to_q(i)),
                None => group.rand_q(rng),
            })
            .collect();

        let key_pairs: Vec<KeyPair> = coefficients
            .iter()
            .map(|coefficient| KeyPair::new_unchecked(group, *coefficient))
            .collect();

        let commitments = key_pairs
            .iter()
            .map(|key_pair| *key_pair.public_key())
            .collect();

        let proofs = key_pairs
            .iter()
            .map(|key_pair| SchnorrProof::make(group, key_pair, &group.rand_q(rng)))
            .collect();

        Ok(Self {
            coefficients,
            commitments,
            proofs,
        })
    }

    pub fn quorum(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[ElementModQ] {
        &self.coefficients
    }

    pub fn commitments(&self) -> &[ElementModP] {
        &self.commitments
    }

    pub fn proofs(&self) -> &[SchnorrProof] {
        &self.proofs
    }

    /// The secret $a_0$.
    pub fn secret(&self) -> Result<ElementModQ> {
        self.coefficients
            .first()
            .copied()
            .ok_or(SanityCheckError::InvalidQuorum.into())
    }

    /// Evaluates $P(x) \bmod q$; $P(\ell)$ is the share sent to the guardian with sequence
    /// order $\ell$.
    pub fn value_at(&self, group: &GroupParameters, x: u64) -> Result<ElementModQ> {
        let polynomial = Polynomial::from_coefficients(
            self.coefficients
                .iter()
                .map(|coefficient| coefficient.value().as_ring_element(group.q_params()))
                .collect::<Vec<ResidueModQ>>(),
        )?;

        let x = group.u64_to_q(x).value().as_ring_element(group.q_params());

        Ok(group.int_to_q_unchecked(polynomial.evaluate(&x).as_natural_number()))
    }

    /// Checks that every coefficient has a valid proof for its commitment.
    pub fn is_valid(&self, group: &GroupParameters) -> ProofValidation {
        let mut validation = ProofValidation::new("election polynomial");

        validation.check(
            "consistent_lengths",
            self.coefficients.len() == self.commitments.len()
                && self.commitments.len() == self.proofs.len(),
        );

        for (commitment, proof) in self.commitments.iter().zip(&self.proofs) {
            validation.check("proof_matches_commitment", proof.public_key() == commitment);
            validation.merge(proof.is_valid(group));
        }

        validation
    }
}

/// Computes the Lagrange coefficient $w = \prod_j j / \prod_j (j - \ell) \bmod q$ of the
/// `coordinate` $\ell$ over the other present `degrees` $j$.
pub fn compute_lagrange_coefficient(
    group: &GroupParameters,
    coordinate: u64,
    degrees: &[u64],
) -> Result<ElementModQ> {
    let coordinate_q = group.u64_to_q(coordinate);

    let mut numerator = ElementModQ::ONE;
    let mut denominator = ElementModQ::ONE;
    for degree in degrees {
        if *degree == coordinate {
            return Err(SanityCheckError::DuplicateCoordinate(coordinate).into());
        }

        let degree = group.u64_to_q(*degree);
        numerator = group.mult_q(&numerator, &degree);
        denominator = group.mult_q(&denominator, &group.a_minus_b_q(&degree, &coordinate_q));
    }

    group
        .div_q(&numerator, &denominator)
        .ok_or(SanityCheckError::DuplicateCoordinate(coordinate).into())
}

/// Computes $\prod_j K_j^{x^j} = g^{P(x)}$ from the commitments $K_j$ alone.
///
/// For a missing guardian's polynomial evaluated at a present guardian's coordinate this is
/// the public key that guardian's compensated share is proven against.
pub fn calculate_g_exp_pi_at_l(
    group: &GroupParameters,
    coordinate: u64,
    commitments: &[ElementModP],
) -> ElementModP {
    let x = group.u64_to_q(coordinate);

    let (product, _) = commitments.iter().fold(
        (ElementModP::ONE, ElementModQ::ONE),
        |(product, power_of_x), commitment| {
            (
                group.mult_p(&product, &group.pow_p(commitment, &power_of_x)),
                group.mult_q(&power_of_x, &x),
            )
        },
    );

    product
}

/// Verifies that `expected` $= P(x)$ for the polynomial committed to by `commitments`,
/// i.e. $g^{expected} = \prod_j K_j^{x^j}$.
pub fn verify_polynomial_coordinate(
    group: &GroupParameters,
    expected: &ElementModQ,
    coordinate: u64,
    commitments: &[ElementModP],
) -> bool {
    group.g_pow_p(expected) == calculate_g_exp_pi_at_l(group, coordinate, commitments)
}

#[cfg(test)]
mod tests {
    use rand::seq::IteratorRandom;
    use rand_core::OsRng;
    use rstest::rstest;

    use super::*;
    use crate::{test_exports::test_group, Error};

    #[test]
    fn generates_consistent_polynomials() {
        let group = GroupParameters::standard();
        let polynomial = ElectionPolynomial::generate(group, 3, None, &mut OsRng).unwrap();

        assert_eq!(polynomial.quorum(), 3);
        assert_eq!(polynomial.commitments().len(), 3);
        assert_eq!(polynomial.proofs().len(), 3);
        assert!(polynomial.is_valid(group).is_valid());
        assert_eq!(
            polynomial.commitments()[0],
            group.g_pow_p(&polynomial.secret().unwrap())
        );
    }

    #[test]
    fn nonce_determines_coefficients() {
        let group = test_group();
        let nonce = group.u64_to_q(10);
        let polynomial = ElectionPolynomial::generate(&group, 3, Some(&nonce), &mut OsRng).unwrap();

        assert_eq!(
            polynomial.coefficients(),
            [group.u64_to_q(10), group.u64_to_q(11), group.u64_to_q(12)]
        );
        // $ 10 + 11 \cdot 2 + 12 \cdot 4 $
        assert_eq!(polynomial.value_at(&group, 2), Ok(group.u64_to_q(80)));
        assert_eq!(polynomial.value_at(&group, 0), Ok(nonce));
    }

    #[test]
    fn rejects_empty_quorum() {
        let group = test_group();

        assert_eq!(
            ElectionPolynomial::generate(&group, 0, None, &mut OsRng),
            Err(Error::SanityCheckError(SanityCheckError::InvalidQuorum))
        );
    }

    #[test]
    fn tampered_commitment_fails_validation() {
        let group = test_group();
        let mut polynomial = ElectionPolynomial::generate(&group, 2, None, &mut OsRng).unwrap();
        polynomial.commitments[1] = group.generator();

        assert_eq!(
            polynomial.is_valid(&group).failures(),
            ["proof_matches_commitment"]
        );
    }

    #[test]
    fn shares_verify_against_commitments() {
        let group = test_group();
        let polynomial = ElectionPolynomial::generate(&group, 4, None, &mut OsRng).unwrap();

        for coordinate in 1..=5 {
            let share = polynomial.value_at(&group, coordinate).unwrap();

            assert!(verify_polynomial_coordinate(
                &group,
                &share,
                coordinate,
                polynomial.commitments()
            ));
            assert_eq!(
                calculate_g_exp_pi_at_l(&group, coordinate, polynomial.commitments()),
                group.g_pow_p(&share)
            );
            assert!(!verify_polynomial_coordinate(
                &group,
                &group.add_q(&share, &ElementModQ::ONE),
                coordinate,
                polynomial.commitments()
            ));
        }
    }

    #[rstest]
    #[case::first_three(vec![1, 2, 3])]
    #[case::last_three(vec![3, 4, 5])]
    #[case::spread(vec![1, 3, 5])]
    #[case::all(vec![1, 2, 3, 4, 5])]
    fn lagrange_interpolation_reconstructs_the_secret(#[case] coordinates: Vec<u64>) {
        let group = GroupParameters::standard();
        let polynomial = ElectionPolynomial::generate(group, 3, None, &mut OsRng).unwrap();

        let reconstructed = coordinates.iter().fold(ElementModQ::ZERO, |sum, coordinate| {
            let others: Vec<u64> = coordinates
                .iter()
                .copied()
                .filter(|other| other != coordinate)
                .collect();
            let weight = compute_lagrange_coefficient(group, *coordinate, &others).unwrap();
            let share = polynomial.value_at(group, *coordinate).unwrap();

            group.a_plus_bc_q(&sum, &weight, &share)
        });

        assert_eq!(Ok(reconstructed), polynomial.secret());
    }

    #[rstest]
    #[case(2, 3)]
    #[case(3, 5)]
    #[case(5, 7)]
    fn any_quorum_reconstructs_the_secret(#[case] quorum: usize, #[case] number_of_guardians: u64) {
        let group = test_group();
        let polynomial = ElectionPolynomial::generate(&group, quorum, None, &mut OsRng).unwrap();
        let coordinates: Vec<u64> = (1..=number_of_guardians).choose_multiple(&mut OsRng, quorum);

        let reconstructed = coordinates.iter().fold(ElementModQ::ZERO, |sum, coordinate| {
            let others: Vec<u64> = coordinates
                .iter()
                .copied()
                .filter(|other| other != coordinate)
                .collect();
            let weight = compute_lagrange_coefficient(&group, *coordinate, &others).unwrap();

            group.a_plus_bc_q(&sum, &weight, &polynomial.value_at(&group, *coordinate).unwrap())
        });

        assert_eq!(Ok(reconstructed), polynomial.secret());
    }

    #[test]
    fn lagrange_coefficient_matches_hand_computation() {
        let group = test_group();

        // $ w_1 = (2 \cdot 3) / ((2 - 1)(3 - 1)) = 3 $
        assert_eq!(
            compute_lagrange_coefficient(&group, 1, &[2, 3]),
            Ok(group.u64_to_q(3))
        );
        // $ w_2 = 3 / (3 - 2) = 3 $
        assert_eq!(compute_lagrange_coefficient(&group, 2, &[3]), Ok(group.u64_to_q(3)));
        assert_eq!(
            compute_lagrange_coefficient(&group, 2, &[2, 3]),
            Err(Error::SanityCheckError(SanityCheckError::DuplicateCoordinate(2)))
        );
    }
}
