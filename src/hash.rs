// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! The Fiat-Shamir hash $H: \{0,1\}^* \to \mathbb{Z}_q$.
//!
//! A sequence of elements is rendered as `|e_1|e_2|...|e_n|`, hashed with SHA-256, and the
//! digest, read as a big-endian integer, is reduced modulo $q$.

use sha2::{Digest, Sha256};

use crate::{ElementModP, ElementModQ, GroupParameters, SmallPrimeSizedNumber};

/// Anything that can take part in [`hash_elems()`].
///
/// The fragment is the text placed between two `|` separators.
pub trait CryptoHashable {
    fn hash_fragment(&self, group: &GroupParameters) -> String;
}

impl CryptoHashable for ElementModP {
    fn hash_fragment(&self, _group: &GroupParameters) -> String {
        self.to_hex()
    }
}

impl CryptoHashable for ElementModQ {
    fn hash_fragment(&self, _group: &GroupParameters) -> String {
        self.to_hex()
    }
}

impl CryptoHashable for str {
    fn hash_fragment(&self, _group: &GroupParameters) -> String {
        self.to_string()
    }
}

impl CryptoHashable for String {
    fn hash_fragment(&self, _group: &GroupParameters) -> String {
        self.clone()
    }
}

macro_rules! impl_crypto_hashable_for_integer {
    ($($integer:ty),*) => {
        $(
            impl CryptoHashable for $integer {
                fn hash_fragment(&self, _group: &GroupParameters) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_crypto_hashable_for_integer!(u8, u16, u32, u64, usize, i32, i64);

/// An absent value renders as `null`.
impl<T: CryptoHashable> CryptoHashable for Option<T> {
    fn hash_fragment(&self, group: &GroupParameters) -> String {
        match self {
            Some(value) => value.hash_fragment(group),
            None => "null".to_string(),
        }
    }
}

/// A nested sequence renders as the hex of its own hash, or `null` when empty.
impl<T: CryptoHashable> CryptoHashable for [T] {
    fn hash_fragment(&self, group: &GroupParameters) -> String {
        if self.is_empty() {
            return "null".to_string();
        }

        let elements: Vec<&dyn CryptoHashable> =
            self.iter().map(|element| element as &dyn CryptoHashable).collect();

        hash_elems(group, &elements).to_hex()
    }
}

impl<T: CryptoHashable> CryptoHashable for Vec<T> {
    fn hash_fragment(&self, group: &GroupParameters) -> String {
        self.as_slice().hash_fragment(group)
    }
}

impl<T: CryptoHashable + ?Sized> CryptoHashable for &T {
    fn hash_fragment(&self, group: &GroupParameters) -> String {
        (**self).hash_fragment(group)
    }
}

/// Hashes `elements` into $\mathbb{Z}_q$.
///
/// An empty sequence hashes the string `|null|`.
pub fn hash_elems(group: &GroupParameters, elements: &[&dyn CryptoHashable]) -> ElementModQ {
    let mut hasher = Sha256::new();
    hasher.update(b"|");

    if elements.is_empty() {
        hasher.update(b"null|");
    }

    for element in elements {
        hasher.update(element.hash_fragment(group).as_bytes());
        hasher.update(b"|");
    }

    let digest = hasher.finalize();

    group.reduce_q(SmallPrimeSizedNumber::from_be_slice(&digest))
}
