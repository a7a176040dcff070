// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use serde::{Deserialize, Serialize};

use crate::{
    elgamal::combine_public_keys, guardian::ElectionPublicKey, hash_elems, ElementModP,
    ElementModQ, GroupParameters, Result, SanityCheckError,
};

/// The public cryptographic context of an election, fixed once the key ceremony completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionContext {
    pub number_of_guardians: u64,
    pub quorum: u64,
    // The joint public key $K = \prod_i K_i$.
    pub elgamal_public_key: ElementModP,
    pub commitment_hash: ElementModQ,
    pub manifest_hash: ElementModQ,
    // $ Q $
    pub crypto_base_hash: ElementModQ,
    // $ \bar{Q} = H(Q, commitment\_hash) $
    pub crypto_extended_base_hash: ElementModQ,
}

impl ElectionContext {
    /// Builds the context from every guardian's published key.
    ///
    /// All `number_of_guardians` keys must be present, each generated for `quorum`, and each
    /// with valid coefficient proofs.
    pub fn new(
        group: &GroupParameters,
        number_of_guardians: u64,
        quorum: u64,
        manifest_hash: ElementModQ,
        guardians: &[ElectionPublicKey],
    ) -> Result<Self> {
        check_quorum(number_of_guardians, quorum)?;

        if guardians.len() as u64 != number_of_guardians
            || guardians
                .iter()
                .any(|guardian| guardian.quorum() as u64 != quorum)
        {
            return Err(SanityCheckError::InvalidParams().into());
        }

        for guardian in guardians {
            guardian.is_valid(group).into_result()?;
        }

        let public_keys: Vec<ElementModP> = guardians.iter().map(|guardian| guardian.key).collect();

        Self::from_parts(
            group,
            number_of_guardians,
            quorum,
            combine_public_keys(group, &public_keys),
            commitment_hash(group, guardians),
            manifest_hash,
        )
    }

    /// Builds the context from an already-computed joint key and commitment hash.
    pub fn from_parts(
        group: &GroupParameters,
        number_of_guardians: u64,
        quorum: u64,
        elgamal_public_key: ElementModP,
        commitment_hash: ElementModQ,
        manifest_hash: ElementModQ,
    ) -> Result<Self> {
        check_quorum(number_of_guardians, quorum)?;

        let crypto_base_hash = crypto_base_hash(group, number_of_guardians, quorum, &manifest_hash);
        let crypto_extended_base_hash = hash_elems(group, &[&crypto_base_hash, &commitment_hash]);

        Ok(Self {
            number_of_guardians,
            quorum,
            elgamal_public_key,
            commitment_hash,
            manifest_hash,
            crypto_base_hash,
            crypto_extended_base_hash,
        })
    }
}

fn check_quorum(number_of_guardians: u64, quorum: u64) -> Result<()> {
    if quorum == 0 || quorum > number_of_guardians {
        return Err(SanityCheckError::InvalidQuorum.into());
    }

    Ok(())
}

/// $Q = H(p, q, g, n, k, H_{manifest})$
pub fn crypto_base_hash(
    group: &GroupParameters,
    number_of_guardians: u64,
    quorum: u64,
    manifest_hash: &ElementModQ,
) -> ElementModQ {
    hash_elems(
        group,
        &[
            &group.large_prime_element(),
            &group.small_prime_element(),
            &group.generator(),
            &number_of_guardians,
            &quorum,
            manifest_hash,
        ],
    )
}

/// $H(K_{1,0}, \dots, K_{1,k-1}, K_{2,0}, \dots, K_{n,k-1})$, the guardians taken in
/// sequence order.
pub fn commitment_hash(group: &GroupParameters, guardians: &[ElectionPublicKey]) -> ElementModQ {
    let mut guardians: Vec<&ElectionPublicKey> = guardians.iter().collect();
    guardians.sort_by_key(|guardian| guardian.sequence_order);

    let commitments: Vec<ElementModP> = guardians
        .iter()
        .flat_map(|guardian| guardian.coefficient_commitments.iter().copied())
        .collect();

    hash_elems(group, &[&commitments])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{guardian::tests::guardians, test_exports::test_group, Error};

    #[test]
    fn context_chains_its_hashes() {
        let group = test_group();
        let manifest_hash = group.u64_to_q(42);
        let public_keys: Vec<ElectionPublicKey> = guardians(&group, 3, 2)
            .iter()
            .map(|guardian| guardian.share())
            .collect();

        let context = ElectionContext::new(&group, 3, 2, manifest_hash, &public_keys).unwrap();

        assert_eq!(
            context.elgamal_public_key,
            group.mult_all_p(&public_keys.iter().map(|key| key.key).collect::<Vec<_>>())
        );
        assert_eq!(
            context.crypto_base_hash,
            crypto_base_hash(&group, 3, 2, &manifest_hash)
        );
        assert_eq!(
            context.crypto_extended_base_hash,
            hash_elems(&group, &[&context.crypto_base_hash, &context.commitment_hash])
        );

        // Key order does not matter, sequence order does.
        let mut reversed = public_keys.clone();
        reversed.reverse();
        assert_eq!(
            ElectionContext::new(&group, 3, 2, manifest_hash, &reversed),
            Ok(context)
        );
    }

    #[rstest]
    #[case::zero_quorum(3, 0, 3, Error::SanityCheckError(SanityCheckError::InvalidQuorum))]
    #[case::quorum_above_guardians(2, 3, 2, Error::SanityCheckError(SanityCheckError::InvalidQuorum))]
    #[case::missing_guardian(3, 2, 2, Error::SanityCheckError(SanityCheckError::InvalidParams()))]
    fn rejects_inconsistent_ceremonies(
        #[case] number_of_guardians: u64,
        #[case] quorum: u64,
        #[case] present: u64,
        #[case] error: Error,
    ) {
        let group = test_group();
        let public_keys: Vec<ElectionPublicKey> = guardians(&group, present, 2)
            .iter()
            .map(|guardian| guardian.share())
            .collect();

        assert_eq!(
            ElectionContext::new(&group, number_of_guardians, quorum, ElementModQ::ONE, &public_keys),
            Err(error)
        );
    }

    #[rstest]
    #[case::zero_quorum(3, 0)]
    #[case::quorum_above_guardians(2, 3)]
    #[case::no_guardians(0, 0)]
    fn rejects_inconsistent_parts(#[case] number_of_guardians: u64, #[case] quorum: u64) {
        let group = test_group();

        assert_eq!(
            ElectionContext::from_parts(
                &group,
                number_of_guardians,
                quorum,
                group.generator(),
                ElementModQ::ONE,
                ElementModQ::ONE,
            ),
            Err(Error::SanityCheckError(SanityCheckError::InvalidQuorum))
        );
        assert!(ElectionContext::from_parts(
            &group,
            3,
            2,
            group.generator(),
            ElementModQ::ONE,
            ElementModQ::ONE,
        )
        .is_ok());
    }

    #[test]
    fn rejects_invalid_guardian_keys() {
        let group = test_group();
        let mut public_keys: Vec<ElectionPublicKey> = guardians(&group, 2, 2)
            .iter()
            .map(|guardian| guardian.share())
            .collect();
        public_keys[1].key = group.generator();

        assert!(matches!(
            ElectionContext::new(&group, 2, 2, ElementModQ::ONE, &public_keys),
            Err(Error::ProtocolError(_))
        ));
    }
}
