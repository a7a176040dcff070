// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use crate::{hash_elems, CryptoHashable, ElementModQ, GroupParameters, Result, SanityCheckError};

/// A deterministic, indexable sequence of nonces derived from a seed.
///
/// The `i`-th nonce is $H(seed, i)$. Accessing indices in any order yields the same values,
/// so callers can derive sibling nonces independently.
#[derive(Clone, Debug)]
pub struct NonceSequence<'a> {
    group: &'a GroupParameters,
    seed: ElementModQ,
}

impl<'a> NonceSequence<'a> {
    pub fn new(group: &'a GroupParameters, seed: ElementModQ) -> Self {
        Self { group, seed }
    }

    /// Mixes `headers` into the seed as $H(seed, headers...)$.
    ///
    /// With no headers this is the same as [`NonceSequence::new()`].
    pub fn with_headers(
        group: &'a GroupParameters,
        seed: ElementModQ,
        headers: &[&dyn CryptoHashable],
    ) -> Self {
        if headers.is_empty() {
            return Self::new(group, seed);
        }

        let mut elements: Vec<&dyn CryptoHashable> = Vec::with_capacity(headers.len() + 1);
        elements.push(&seed);
        elements.extend_from_slice(headers);

        Self::new(group, hash_elems(group, &elements))
    }

    pub fn seed(&self) -> ElementModQ {
        self.seed
    }

    pub fn get(&self, index: u64) -> ElementModQ {
        hash_elems(self.group, &[&self.seed, &index])
    }

    /// Like [`NonceSequence::get()`] for a signed index, rejecting negative ones.
    pub fn try_get(&self, index: i64) -> Result<ElementModQ> {
        let index =
            u64::try_from(index).map_err(|_| SanityCheckError::NegativeNonceIndex(index))?;

        Ok(self.get(index))
    }

    /// The first `count` nonces.
    pub fn take(&self, count: usize) -> Vec<ElementModQ> {
        (0..count as u64).map(|index| self.get(index)).collect()
    }
}
