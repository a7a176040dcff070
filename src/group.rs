// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use std::sync::OnceLock;

use crypto_bigint::{
    modular::runtime_mod::DynResidueParams, rand_core::CryptoRngCore, NonZero, RandomMod,
};
use serde::{Deserialize, Serialize};

use crate::{
    AsNaturalNumber, AsRingElement, Error, LargePrimeSizedNumber, ResidueModP, ResidueModQ,
    Result, SanityCheckError, SmallPrimeSizedNumber,
};

mod elements;
pub use elements::{ElementModP, ElementModQ};

const LARGE_PRIME: LargePrimeSizedNumber = LargePrimeSizedNumber::from_be_hex("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF93C467E37DB0C7A4D1BE3F810152CB56A1CECC3AF65CC0190C03DF34709AFFBD8E4B59FA03A9F0EED0649CCB621057D11056AE9132135A08E43B4673D74BAFEA58DEB878CC86D733DBE7BF38154B36CF8A96D1567899AAAE0C09D4C8B6B7B86FD2A1EA1DE62FF8643EC7C271827977225E6AC2F0BD61C746961542A3CE3BEA5DB54FE70E63E6D09F8FC28658E80567A47CFDE60EE741E5D85A7BD46931CED8220365594964B839896FCAABCCC9B31959C083F22AD3EE591C32FAB2C7448F2A057DB2DB49EE52E0182741E53865F004CC8E704B7C5C40BF304C4D8C4F13EDF6047C555302D2238D8CE11DF2424F1B66C2C5D238D0744DB679AF2890487031F9C0AEA1C4BB6FE9554EE528FDF1B05E5B256223B2F09215F3719F9C7CCC69DDF172D0D6234217FCC0037F18B93EF5389130B7A661E5C26E54214068BBCAFEA32A67818BD3075AD1F5C7E9CC3D1737FB28171BAF84DBB6612B7881C1A48E439CD03A92BF52225A2B38E6542E9F722BCE15A381B5753EA842763381CCAE83512B30511B32E5E8D80362149AD030AABA5F3A5798BB22AA7EC1B6D0F17903F4E234EA6034AA85973F79A93FFB82A75C47C03D43D2F9CA02D03199BACEDDD45334DBC6B5FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF");
// $ q = 2^{256} - 189 $
const SMALL_PRIME: SmallPrimeSizedNumber = SmallPrimeSizedNumber::from_be_hex(
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF43",
);
// $ g = 2^{(p - 1) / q} \bmod p $
const GENERATOR: LargePrimeSizedNumber = LargePrimeSizedNumber::from_be_hex("037DE384F98F6E038D2A3141825B33D5D45EC4CC64CFD15E750D6798F5196CF2A142CDF33F6EF853840EC7D4EC804794CFB0CFB65363B2566387B98EE0E3DEF1B706FA55D5038FFB4A62DCBB93B1DDD8D3B308DA86D1C3A525EF356FE5BB59314E65633480B396E1DD4B795F78DE07D86B0E2A05BE6AF78FD7F736FCBA6C032E26E050AF50A03C65FA7B6C87F4554CB57F3DABCBAD8EB9D8FDEBEEF58570669ACC3EDA17DBFC47B8B3C39AA08B829B28872E62B5D1B13A98F09D40AC20C2AB74A6750E7C8750B5141E221C41F55BBA31D8E41422B64D2CBA7AAA0E9FD8785702F6932825BF45DE8386D24900742062C1322B37C50AF182158090C35DA9355E6CF7F72DA39A2284FDFB1918B2A2A30E69501FA2342B728263DF23F1DB8355BDE1EB276FB3685F371672CEB313FDAB069CC9B11AB6C59BCE62BAAD96AAC96B0DBE0C7E71FCB22552545A5D1CEDEEE01E4BC0CDBDB76B6AD45F09AF5E71114A005F93AD97B8FE09274E76C94B2008926B38CAEC94C95E96D628F6BC80662BA06207801328B2C6A60526BF7CD02D9661385AC3B1CBDB50F759D0E9F61C11A07BF4218F299BCB2900520076EBD2D95A3DEE96D4809EF34ABEB83FDBA8A12C5CA82757288A89C931CF564F00E8A317AE1E1D828E61369BA0DDBADB10C136F8691101AD82DC54775AB8353840D9992197D80A6E94B38AC417CDDF40B0C73ABF03E8E0AA");

/// The serialized form of [`GroupParameters`]: the primes and generator as uppercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConstants {
    pub large_prime: String,
    pub small_prime: String,
    pub cofactor: String,
    pub generator: String,
}

/// The group $\mathbb{Z}_p^*$ together with its order-$q$ subgroup generated by $g$,
/// where $p \equiv 1 \pmod q$.
///
/// Every arithmetic operation on [`ElementModP`] and [`ElementModQ`] is performed through an
/// instance of this type, which holds the Montgomery parameters for both moduli. Instances
/// are immutable; the production group is available through [`GroupParameters::standard()`],
/// and alternate groups (e.g. for test vectors) are built with [`GroupParameters::new()`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "ElectionConstants", into = "ElectionConstants")]
pub struct GroupParameters {
    large_prime: NonZero<LargePrimeSizedNumber>,
    small_prime: NonZero<SmallPrimeSizedNumber>,
    // $ r = (p - 1) / q $
    cofactor: LargePrimeSizedNumber,
    generator: ElementModP,
    p_params: DynResidueParams<{ LargePrimeSizedNumber::LIMBS }>,
    q_params: DynResidueParams<{ SmallPrimeSizedNumber::LIMBS }>,
}

impl PartialEq for GroupParameters {
    fn eq(&self, other: &Self) -> bool {
        *self.large_prime == *other.large_prime
            && *self.small_prime == *other.small_prime
            && self.generator == other.generator
    }
}

impl Eq for GroupParameters {}

impl GroupParameters {
    /// Builds and validates a group from a large prime `p`, a small prime `q` and a generator
    /// `g` of the order-`q` subgroup.
    ///
    /// Primality itself is not tested; the structural requirements are: both moduli odd,
    /// `q < p`, `q | p - 1`, `1 < g < p` and `g^q = 1 mod p`.
    pub fn new(
        large_prime: LargePrimeSizedNumber,
        small_prime: SmallPrimeSizedNumber,
        generator: LargePrimeSizedNumber,
    ) -> Result<Self> {
        #[allow(deprecated)]
        let p_params = DynResidueParams::new_checked(&large_prime);
        let p_params = Option::<DynResidueParams<{ LargePrimeSizedNumber::LIMBS }>>::from(p_params)
            .ok_or(SanityCheckError::InvalidGroupParameters("p must be odd"))?;

        #[allow(deprecated)]
        let q_params = DynResidueParams::new_checked(&small_prime);
        let q_params = Option::<DynResidueParams<{ SmallPrimeSizedNumber::LIMBS }>>::from(q_params)
            .ok_or(SanityCheckError::InvalidGroupParameters("q must be odd"))?;

        let q_as_p: LargePrimeSizedNumber = small_prime.resize();
        if small_prime <= SmallPrimeSizedNumber::ONE || q_as_p >= large_prime {
            return Err(SanityCheckError::InvalidGroupParameters("q must be in (1, p)").into());
        }

        // Both moduli are odd here and so non-zero.
        let large_prime = Option::<NonZero<LargePrimeSizedNumber>>::from(NonZero::new(large_prime))
            .ok_or(Error::InternalError)?;
        let small_prime = Option::<NonZero<SmallPrimeSizedNumber>>::from(NonZero::new(small_prime))
            .ok_or(Error::InternalError)?;
        let q_as_p = Option::<NonZero<LargePrimeSizedNumber>>::from(NonZero::new(q_as_p))
            .ok_or(Error::InternalError)?;

        let p_minus_one = large_prime.wrapping_sub(&LargePrimeSizedNumber::ONE);
        let (cofactor, remainder) = p_minus_one.div_rem(&q_as_p);
        if remainder != LargePrimeSizedNumber::ZERO {
            return Err(SanityCheckError::InvalidGroupParameters("q must divide p - 1").into());
        }

        if generator <= LargePrimeSizedNumber::ONE || generator >= *large_prime {
            return Err(SanityCheckError::InvalidGroupParameters("g must be in (1, p)").into());
        }

        let group = Self {
            large_prime,
            small_prime,
            cofactor,
            generator: ElementModP(generator),
            p_params,
            q_params,
        };

        if !group.is_valid_residue(&group.generator) {
            return Err(
                SanityCheckError::InvalidGroupParameters("g must generate the order-q subgroup")
                    .into(),
            );
        }

        Ok(group)
    }

    /// The 4096-bit production group with $q = 2^{256} - 189$.
    ///
    /// Built once per process and shared read-only afterwards.
    pub fn standard() -> &'static Self {
        static STANDARD: OnceLock<GroupParameters> = OnceLock::new();

        STANDARD.get_or_init(|| {
            let p_params = DynResidueParams::new(&LARGE_PRIME);
            let q_params = DynResidueParams::new(&SMALL_PRIME);

            Self {
                large_prime: NonZero::from_uint(LARGE_PRIME),
                small_prime: NonZero::from_uint(SMALL_PRIME),
                cofactor: LARGE_PRIME
                    .wrapping_sub(&LargePrimeSizedNumber::ONE)
                    .wrapping_div(&SMALL_PRIME.resize()),
                generator: ElementModP(GENERATOR),
                p_params,
                q_params,
            }
        })
    }

    pub fn large_prime(&self) -> &LargePrimeSizedNumber {
        &self.large_prime
    }

    pub fn small_prime(&self) -> &SmallPrimeSizedNumber {
        &self.small_prime
    }

    pub fn cofactor(&self) -> &LargePrimeSizedNumber {
        &self.cofactor
    }

    pub fn generator(&self) -> ElementModP {
        self.generator
    }

    pub(crate) fn p_params(&self) -> &DynResidueParams<{ LargePrimeSizedNumber::LIMBS }> {
        &self.p_params
    }

    pub(crate) fn q_params(&self) -> &DynResidueParams<{ SmallPrimeSizedNumber::LIMBS }> {
        &self.q_params
    }

    /// `p` itself as an element, for hashing the group into the base hash.
    pub fn large_prime_element(&self) -> ElementModP {
        ElementModP(*self.large_prime)
    }

    /// `q` itself as an element, for hashing the group into the base hash.
    pub fn small_prime_element(&self) -> ElementModQ {
        ElementModQ(*self.small_prime)
    }

    fn mod_p(&self, element: &ElementModP) -> ResidueModP {
        element.0.as_ring_element(&self.p_params)
    }

    fn mod_q(&self, element: &ElementModQ) -> ResidueModQ {
        element.0.as_ring_element(&self.q_params)
    }

    /* Conversions */

    /// Returns `None` unless `0 <= value < p`.
    pub fn int_to_p(&self, value: LargePrimeSizedNumber) -> Option<ElementModP> {
        (value < *self.large_prime).then_some(ElementModP(value))
    }

    /// Returns `None` unless `0 <= value < q`.
    pub fn int_to_q(&self, value: SmallPrimeSizedNumber) -> Option<ElementModQ> {
        (value < *self.small_prime).then_some(ElementModQ(value))
    }

    /// Wraps `value` without a bounds check. The caller guarantees `value < p`.
    pub fn int_to_p_unchecked(&self, value: LargePrimeSizedNumber) -> ElementModP {
        ElementModP(value)
    }

    /// Wraps `value` without a bounds check. The caller guarantees `value < q`.
    pub fn int_to_q_unchecked(&self, value: SmallPrimeSizedNumber) -> ElementModQ {
        ElementModQ(value)
    }

    /// Reduces an arbitrary 256-bit integer modulo `q`.
    pub fn reduce_q(&self, value: SmallPrimeSizedNumber) -> ElementModQ {
        ElementModQ(value % self.small_prime)
    }

    pub fn u64_to_q(&self, value: u64) -> ElementModQ {
        self.reduce_q(SmallPrimeSizedNumber::from_u64(value))
    }

    pub fn u64_to_p(&self, value: u64) -> ElementModP {
        ElementModP(LargePrimeSizedNumber::from_u64(value) % self.large_prime)
    }

    /* Predicates */

    pub fn is_in_bounds_p(&self, element: &ElementModP) -> bool {
        element.0 < *self.large_prime
    }

    pub fn is_in_bounds_q(&self, element: &ElementModQ) -> bool {
        element.0 < *self.small_prime
    }

    /// `1 <= x < p` and `x^q = 1 mod p`, i.e. `x` is in the order-`q` subgroup.
    pub fn is_valid_residue(&self, element: &ElementModP) -> bool {
        if element.is_zero() || !self.is_in_bounds_p(element) {
            return false;
        }

        self.mod_p(element)
            .pow_bounded_exp(&*self.small_prime, SmallPrimeSizedNumber::BITS)
            .as_natural_number()
            == LargePrimeSizedNumber::ONE
    }

    /* Arithmetic modulo p */

    pub fn mult_p(&self, lhs: &ElementModP, rhs: &ElementModP) -> ElementModP {
        ElementModP((self.mod_p(lhs) * self.mod_p(rhs)).as_natural_number())
    }

    /// The product of all `elements`, or one for an empty slice.
    pub fn mult_all_p(&self, elements: &[ElementModP]) -> ElementModP {
        let one = ResidueModP::one(self.p_params);

        ElementModP(
            elements
                .iter()
                .fold(one, |acc, element| acc * self.mod_p(element))
                .as_natural_number(),
        )
    }

    /// `base^exponent mod p`.
    pub fn pow_p(&self, base: &ElementModP, exponent: &ElementModQ) -> ElementModP {
        ElementModP(
            self.mod_p(base)
                .pow_bounded_exp(&exponent.0, SmallPrimeSizedNumber::BITS)
                .as_natural_number(),
        )
    }

    /// `g^exponent mod p`.
    pub fn g_pow_p(&self, exponent: &ElementModQ) -> ElementModP {
        self.pow_p(&self.generator, exponent)
    }

    /// `numerator / denominator mod p`, or `None` when `denominator` is zero mod p.
    pub fn div_p(&self, numerator: &ElementModP, denominator: &ElementModP) -> Option<ElementModP> {
        let denominator = self.mod_p(denominator);
        if denominator == ResidueModP::zero(self.p_params) {
            return None;
        }

        // `p` is prime, so every non-zero element has an inverse.
        let (inverse, _) = denominator.invert();

        Some(ElementModP(
            (self.mod_p(numerator) * inverse).as_natural_number(),
        ))
    }

    /* Arithmetic modulo q */

    pub fn add_q(&self, lhs: &ElementModQ, rhs: &ElementModQ) -> ElementModQ {
        ElementModQ((self.mod_q(lhs) + self.mod_q(rhs)).as_natural_number())
    }

    /// The sum of all `elements`, or zero for an empty slice.
    pub fn add_all_q(&self, elements: &[ElementModQ]) -> ElementModQ {
        let zero = ResidueModQ::zero(self.q_params);

        ElementModQ(
            elements
                .iter()
                .fold(zero, |acc, element| acc + self.mod_q(element))
                .as_natural_number(),
        )
    }

    /// `a - b mod q`.
    pub fn a_minus_b_q(&self, a: &ElementModQ, b: &ElementModQ) -> ElementModQ {
        ElementModQ((self.mod_q(a) - self.mod_q(b)).as_natural_number())
    }

    /// `a + b * c mod q`.
    pub fn a_plus_bc_q(&self, a: &ElementModQ, b: &ElementModQ, c: &ElementModQ) -> ElementModQ {
        ElementModQ((self.mod_q(a) + self.mod_q(b) * self.mod_q(c)).as_natural_number())
    }

    pub fn mult_q(&self, lhs: &ElementModQ, rhs: &ElementModQ) -> ElementModQ {
        ElementModQ((self.mod_q(lhs) * self.mod_q(rhs)).as_natural_number())
    }

    /// `-element mod q`.
    pub fn negate_q(&self, element: &ElementModQ) -> ElementModQ {
        ElementModQ((-self.mod_q(element)).as_natural_number())
    }

    /// `base^exponent mod q`.
    pub fn pow_q(&self, base: &ElementModQ, exponent: u64) -> ElementModQ {
        ElementModQ(
            self.mod_q(base)
                .pow_bounded_exp(&crypto_bigint::U64::from_u64(exponent), 64)
                .as_natural_number(),
        )
    }

    /// `numerator / denominator mod q`, or `None` when `denominator` is zero mod q.
    pub fn div_q(&self, numerator: &ElementModQ, denominator: &ElementModQ) -> Option<ElementModQ> {
        let denominator = self.mod_q(denominator);
        if denominator == ResidueModQ::zero(self.q_params) {
            return None;
        }

        let (inverse, _) = denominator.invert();

        Some(ElementModQ(
            (self.mod_q(numerator) * inverse).as_natural_number(),
        ))
    }

    /* Sampling */

    /// A uniformly random element of $[0, q)$.
    pub fn rand_q(&self, rng: &mut impl CryptoRngCore) -> ElementModQ {
        ElementModQ(SmallPrimeSizedNumber::random_mod(rng, &self.small_prime))
    }

    /// A uniformly random element of $[start, q)$, or `None` when `start >= q`.
    pub fn rand_range_q(&self, start: u64, rng: &mut impl CryptoRngCore) -> Option<ElementModQ> {
        let start = SmallPrimeSizedNumber::from_u64(start);
        if start >= *self.small_prime {
            return None;
        }

        let width: NonZero<SmallPrimeSizedNumber> =
            Option::from(NonZero::new(self.small_prime.wrapping_sub(&start)))?;

        Some(ElementModQ(
            SmallPrimeSizedNumber::random_mod(rng, &width).wrapping_add(&start),
        ))
    }
}

impl TryFrom<ElectionConstants> for GroupParameters {
    type Error = Error;

    fn try_from(constants: ElectionConstants) -> Result<Self> {
        let large_prime = ElementModP::from_hex(&constants.large_prime)?;
        let small_prime = ElementModQ::from_hex(&constants.small_prime)?;
        let generator = ElementModP::from_hex(&constants.generator)?;

        let group = GroupParameters::new(large_prime.0, small_prime.0, generator.0)?;

        if ElementModP::from_hex(&constants.cofactor)?.0 != group.cofactor {
            return Err(SanityCheckError::InvalidGroupParameters("cofactor must be (p - 1) / q").into());
        }

        Ok(group)
    }
}

impl From<GroupParameters> for ElectionConstants {
    fn from(group: GroupParameters) -> Self {
        ElectionConstants {
            large_prime: group.large_prime_element().to_hex(),
            small_prime: group.small_prime_element().to_hex(),
            cofactor: ElementModP(group.cofactor).to_hex(),
            generator: group.generator.to_hex(),
        }
    }
}
