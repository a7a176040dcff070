// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! Exponential ElGamal over the order-$q$ subgroup of $\mathbb{Z}_p^*$.
//!
//! A message $m$ is encrypted as $(g^r, g^m \cdot K^r)$, which makes ciphertexts additively
//! homomorphic: component-wise multiplication adds the underlying messages.

use crypto_bigint::rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{
    hash_elems, CryptoHashable, ElementModP, ElementModQ, Error, GroupParameters, Result,
    SanityCheckError, SmallPrimeSizedNumber,
};

mod discrete_log;
pub use discrete_log::{DiscreteLog, DEFAULT_DISCRETE_LOG_BOUND};

/// An ElGamal key pair $(s, K = g^s)$ with $2 \le s < q$.
#[derive(Clone, Debug)]
pub struct KeyPair {
    secret_key: ElementModQ,
    public_key: ElementModP,
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.secret_key.ct_eq(&other.secret_key).into() && self.public_key == other.public_key
    }
}

impl Eq for KeyPair {}

impl KeyPair {
    pub fn from_secret(group: &GroupParameters, secret_key: ElementModQ) -> Result<Self> {
        if secret_key.0 < SmallPrimeSizedNumber::from_u64(2) || !group.is_in_bounds_q(&secret_key)
        {
            return Err(SanityCheckError::InvalidSecretKey.into());
        }

        Ok(Self::new_unchecked(group, secret_key))
    }

    pub fn random(group: &GroupParameters, rng: &mut impl CryptoRngCore) -> Result<Self> {
        let secret_key = group
            .rand_range_q(2, rng)
            .ok_or(SanityCheckError::InvalidSecretKey)?;

        Ok(Self::new_unchecked(group, secret_key))
    }

    /// Polynomial coefficients may legitimately be zero or one, so key material derived from
    /// them skips the lower bound on the secret.
    pub(crate) fn new_unchecked(group: &GroupParameters, secret_key: ElementModQ) -> Self {
        Self {
            secret_key,
            public_key: group.g_pow_p(&secret_key),
        }
    }

    pub fn secret_key(&self) -> &ElementModQ {
        &self.secret_key
    }

    pub fn public_key(&self) -> &ElementModP {
        &self.public_key
    }
}

/// An ElGamal ciphertext $(\alpha, \beta) = (g^r, g^m \cdot K^r)$.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, Deserialize)]
pub struct Ciphertext {
    pub pad: ElementModP,
    pub data: ElementModP,
}

/// Encrypts `message` under `public_key` with the given `nonce`.
pub fn encrypt(
    group: &GroupParameters,
    message: i64,
    nonce: &ElementModQ,
    public_key: &ElementModP,
) -> Result<Ciphertext> {
    if nonce.is_zero() {
        return Err(SanityCheckError::ZeroNonce.into());
    }

    let message = u64::try_from(message).map_err(|_| SanityCheckError::NegativeMessage(message))?;

    let pad = group.g_pow_p(nonce);
    let g_to_m = group.g_pow_p(&group.u64_to_q(message));
    let data = group.mult_p(&g_to_m, &group.pow_p(public_key, nonce));

    Ok(Ciphertext { pad, data })
}

/// Homomorphically adds `ciphertexts`.
pub fn add(group: &GroupParameters, ciphertexts: &[Ciphertext]) -> Result<Ciphertext> {
    if ciphertexts.is_empty() {
        return Err(SanityCheckError::EmptyCiphertexts.into());
    }

    let pads: Vec<ElementModP> = ciphertexts.iter().map(|c| c.pad).collect();
    let datas: Vec<ElementModP> = ciphertexts.iter().map(|c| c.data).collect();

    Ok(Ciphertext {
        pad: group.mult_all_p(&pads),
        data: group.mult_all_p(&datas),
    })
}

/// The product of the guardians' public keys, i.e. the joint election key.
pub fn combine_public_keys(group: &GroupParameters, public_keys: &[ElementModP]) -> ElementModP {
    group.mult_all_p(public_keys)
}

impl Ciphertext {
    /// Decrypts with the full secret key: $\beta / \alpha^s$, then the discrete log.
    pub fn decrypt(
        &self,
        group: &GroupParameters,
        secret_key: &ElementModQ,
        discrete_log: &DiscreteLog,
    ) -> Result<u64> {
        self.decrypt_known_product(group, &self.partial_decrypt(group, secret_key), discrete_log)
    }

    /// Decrypts with the encryption nonce: $\beta / K^r$, then the discrete log.
    pub fn decrypt_known_nonce(
        &self,
        group: &GroupParameters,
        public_key: &ElementModP,
        nonce: &ElementModQ,
        discrete_log: &DiscreteLog,
    ) -> Result<u64> {
        self.decrypt_known_product(group, &group.pow_p(public_key, nonce), discrete_log)
    }

    /// Decrypts given the blinding factor $K^r = \alpha^s$, e.g. the product of all
    /// guardians' decryption shares.
    pub fn decrypt_known_product(
        &self,
        group: &GroupParameters,
        product: &ElementModP,
        discrete_log: &DiscreteLog,
    ) -> Result<u64> {
        let g_to_m = group
            .div_p(&self.data, product)
            .ok_or(Error::from(SanityCheckError::OutOfRange))?;

        discrete_log.discrete_log(&g_to_m)
    }

    /// A guardian's share of a decryption: $\alpha^{s_i}$.
    pub fn partial_decrypt(&self, group: &GroupParameters, secret_share: &ElementModQ) -> ElementModP {
        group.pow_p(&self.pad, secret_share)
    }

    pub fn crypto_hash(&self, group: &GroupParameters) -> ElementModQ {
        hash_elems(group, &[&self.pad, &self.data])
    }

    pub fn is_valid_residue(&self, group: &GroupParameters) -> bool {
        group.is_valid_residue(&self.pad) && group.is_valid_residue(&self.data)
    }
}

impl CryptoHashable for Ciphertext {
    fn hash_fragment(&self, group: &GroupParameters) -> String {
        self.crypto_hash(group).to_hex()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand_core::OsRng;
    use rstest::rstest;

    use super::*;
    use crate::test_exports::{test_group, TEST_SMALL_PRIME};

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(7)]
    #[case(100)]
    fn decrypts_what_it_encrypts(#[case] message: i64) {
        let group = test_group();
        let discrete_log = DiscreteLog::new(&group);
        let key_pair = KeyPair::random(&group, &mut OsRng).unwrap();
        let nonce = group.rand_range_q(1, &mut OsRng).unwrap();

        let ciphertext = encrypt(&group, message, &nonce, key_pair.public_key()).unwrap();

        assert_eq!(
            ciphertext.decrypt(&group, key_pair.secret_key(), &discrete_log),
            Ok(message as u64)
        );
        assert_eq!(
            ciphertext.decrypt_known_nonce(&group, key_pair.public_key(), &nonce, &discrete_log),
            Ok(message as u64)
        );
        assert!(ciphertext.is_valid_residue(&group));
    }

    #[test]
    fn decrypts_in_the_standard_group() {
        let group = GroupParameters::standard();
        let discrete_log = DiscreteLog::new(group);
        let key_pair = KeyPair::random(group, &mut OsRng).unwrap();
        let nonce = group.rand_range_q(1, &mut OsRng).unwrap();

        let ciphertext = encrypt(group, 42, &nonce, key_pair.public_key()).unwrap();

        assert_eq!(
            ciphertext.decrypt(group, key_pair.secret_key(), &discrete_log),
            Ok(42)
        );
    }

    #[test]
    fn rejects_malformed_inputs() {
        let group = test_group();
        let key_pair = KeyPair::random(&group, &mut OsRng).unwrap();

        assert_eq!(
            encrypt(&group, 1, &ElementModQ::ZERO, key_pair.public_key()),
            Err(SanityCheckError::ZeroNonce.into())
        );
        assert_eq!(
            encrypt(&group, -1, &ElementModQ::ONE, key_pair.public_key()),
            Err(SanityCheckError::NegativeMessage(-1).into())
        );
        assert_eq!(add(&group, &[]), Err(SanityCheckError::EmptyCiphertexts.into()));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::one(1)]
    fn rejects_trivial_secret_keys(#[case] secret: u64) {
        let group = test_group();

        assert_eq!(
            KeyPair::from_secret(&group, group.u64_to_q(secret)),
            Err(SanityCheckError::InvalidSecretKey.into())
        );
        assert!(KeyPair::from_secret(&group, group.u64_to_q(2)).is_ok());
    }

    #[test]
    fn combined_key_decrypts_with_summed_secrets() {
        let group = test_group();
        let discrete_log = DiscreteLog::new(&group);
        let first = KeyPair::random(&group, &mut OsRng).unwrap();
        let second = KeyPair::random(&group, &mut OsRng).unwrap();

        let joint_key = combine_public_keys(&group, &[*first.public_key(), *second.public_key()]);
        let joint_secret = group.add_q(first.secret_key(), second.secret_key());

        let ciphertext = encrypt(&group, 3, &group.u64_to_q(11), &joint_key).unwrap();
        let product = group.mult_p(
            &ciphertext.partial_decrypt(&group, first.secret_key()),
            &ciphertext.partial_decrypt(&group, second.secret_key()),
        );

        assert_eq!(
            ciphertext.decrypt_known_product(&group, &product, &discrete_log),
            Ok(3)
        );
        assert_eq!(ciphertext.decrypt(&group, &joint_secret, &discrete_log), Ok(3));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn addition_is_homomorphic(first in 0i64..200, second in 0i64..200, r1 in 1u64..TEST_SMALL_PRIME, r2 in 1u64..TEST_SMALL_PRIME) {
            let group = test_group();
            let discrete_log = DiscreteLog::new(&group);
            let key_pair = KeyPair::random(&group, &mut OsRng).unwrap();

            let c1 = encrypt(&group, first, &group.u64_to_q(r1), key_pair.public_key()).unwrap();
            let c2 = encrypt(&group, second, &group.u64_to_q(r2), key_pair.public_key()).unwrap();
            let sum = add(&group, &[c1, c2]).unwrap();

            prop_assert_eq!(
                sum.decrypt(&group, key_pair.secret_key(), &discrete_log),
                Ok((first + second) as u64)
            );
        }
    }
}
