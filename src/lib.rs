// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use crypto_bigint::modular::runtime_mod::{DynResidue, DynResidueParams};
use crypto_bigint::{Uint, U256, U4096};

pub mod ballot;
pub mod election_context;
pub mod elgamal;
mod error;
pub mod encrypt;
pub mod group;
pub mod guardian;
pub mod hash;
pub mod manifest;
pub mod nonces;
pub mod proofs;
pub mod secret_sharing;
pub mod tally;
pub mod threshold_decryption;

pub use error::{Error, ProtocolError, Result, SanityCheckError};
pub use group::{ElementModP, ElementModQ, GroupParameters};
pub use hash::{hash_elems, CryptoHashable};

#[cfg(feature = "benchmarking")]
pub use encrypt::benchmark_encrypt_ballot;
#[cfg(feature = "benchmarking")]
pub use proofs::benchmark_disjunctive_chaum_pedersen;

/* Types & Trait (impls) around `crypto_bigint` for internal use */

pub type LargePrimeSizedNumber = U4096;
pub type SmallPrimeSizedNumber = U256;
pub(crate) type ResidueModP = DynResidue<{ LargePrimeSizedNumber::LIMBS }>;
pub(crate) type ResidueModQ = DynResidue<{ SmallPrimeSizedNumber::LIMBS }>;

/// A guardian is identified by its sequence order, which is also the x-coordinate of its share.
pub type GuardianId = u64;

pub(crate) trait AsNaturalNumber<const LIMBS: usize> {
    fn as_natural_number(&self) -> Uint<LIMBS>;
}

pub(crate) trait AsRingElement<const LIMBS: usize> {
    fn as_ring_element(&self, params: &DynResidueParams<LIMBS>) -> DynResidue<LIMBS>;
}

impl<const LIMBS: usize> AsNaturalNumber<LIMBS> for DynResidue<LIMBS> {
    fn as_natural_number(&self) -> Uint<LIMBS> {
        self.retrieve()
    }
}

impl<const LIMBS: usize> AsRingElement<LIMBS> for Uint<LIMBS> {
    fn as_ring_element(&self, params: &DynResidueParams<LIMBS>) -> DynResidue<LIMBS> {
        DynResidue::new(self, *params)
    }
}

#[cfg(any(test, feature = "test_exports"))]
pub mod test_exports {
    use crate::group::GroupParameters;
    use crate::{LargePrimeSizedNumber, SmallPrimeSizedNumber};

    /// A 64-bit group with a 32-bit subgroup, for fast tests of group validation and arithmetic.
    pub const TEST_LARGE_PRIME: u64 = 0x8000_000C_0000_0017;
    pub const TEST_SMALL_PRIME: u64 = 0x8000_000B;
    pub const TEST_GENERATOR: u64 = 0x7748_9CA7_694C_083F;

    pub fn test_group() -> GroupParameters {
        GroupParameters::new(
            LargePrimeSizedNumber::from_u64(TEST_LARGE_PRIME),
            SmallPrimeSizedNumber::from_u64(TEST_SMALL_PRIME),
            LargePrimeSizedNumber::from_u64(TEST_GENERATOR),
        )
        .unwrap()
    }

    pub fn standard_group() -> &'static GroupParameters {
        GroupParameters::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupParameters;
    use crypto_bigint::NonZero;

    #[test]
    fn as_natural_number_and_as_ring_element_circles_correctly() {
        let group = GroupParameters::standard();
        let x = LargePrimeSizedNumber::from_be_hex("19BB1B2E0015AA04BEE4F8321819448A2C809DF799C6627668DAA936E3A367CF87BEC43C47551221E40724FE115FF8A4E72D5D46A0E98A934C45CD6904DA0F07499D798EE611497C9493354A9A48C35ECB6318CA55B8322E4295E67F8BC0BE1E0923685E1727B7925920D4F0E9CC30C2A10135DB447EDAD3BCE87C3416252C8B4DF32C24029E0269E7103E80D02DD5A42A99B69A613C6274255DF0599B0DED35A8969463636C6D56D67A05AE11F347A5D5B81896DF5F8A52E6EA7F05359A9FEFC90297BDD298DD77714D3557325DF1C52F42470606ECBFA5E964C0A782AE19CED2E20C73F0438EB597CAE4159B5E5333C97272D8EFEDB49CEB98078E92D990076E6E4101FD97588E4BBAA9DD5D19C671424108EE7FA5F2D74F9F3DEAB4A0AC89CF9833FD9BA1F66719978D7BD13DD2ECDE2BDC9628B1AC1E0A0C44B1408E8869A8B2245DF2A877E01730500AD15466A808E6D9636EEA7A7A0A06568413408E588C52451D189774D84547FBB4171255D6E0BFC9B63C56D582E02FA0F110EEAA2B728E51BC85F529805EBA5E1D6B7323597F1647B0A3DC6D61448C1C062CADE9831DB9E3029322D79D04BB3287B7C5D857AE11802B68921FBC403E390ED693DEAD66E1A728B7F7432408EB2ED9EB9BC3B2BCD8EB2CD44D41A5EBFB32F55BAF47D3AC048F5D1F60B2CB61C0F4E3C178DC7723B8298E9D52771DCF1DABA4088EF74B");
        let x = x % NonZero::new(*group.large_prime()).unwrap();

        assert_eq!(
            x.as_ring_element(group.p_params()).as_natural_number(),
            x
        );
    }
}
