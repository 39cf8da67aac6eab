//! BN254 scalar field arithmetic
//!
//! Elements are stored in canonical form as four little-endian 64-bit limbs,
//! always strictly below the modulus. Addition and subtraction reduce with a
//! conditional correction; multiplication reduces the double-width product
//! through Montgomery reduction; inversion is a Fermat exponentiation.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::WitnessError;

/// BN254 scalar field modulus, little-endian limbs
///
/// p = 21888242871839275222246405745257275088548364400416034343698204186575808495617
pub const MODULUS: [u64; 4] = [
    0x43e1_f593_f000_0001,
    0x2833_e848_79b9_7091,
    0xb850_45b6_8181_585d,
    0x3064_4e72_e131_a029,
];

/// p - 2, the Fermat inversion exponent
const MODULUS_MINUS_TWO: [u64; 4] = [
    0x43e1_f593_efff_ffff,
    0x2833_e848_79b9_7091,
    0xb850_45b6_8181_585d,
    0x3064_4e72_e131_a029,
];

/// -p^-1 mod 2^64, the Montgomery reduction parameter
const INV: u64 = 0xc2e1_f593_efff_ffff;

/// R^2 mod p where R = 2^256, used to enter the Montgomery domain
const R2: [u64; 4] = [
    0x1bb8_e645_ae21_6da7,
    0x53fe_3ab1_e35c_59e3,
    0x8c49_833d_53bb_8085,
    0x0216_d0b1_7f4e_44a5,
];

/// An element of the BN254 scalar field.
///
/// Invariant: the limbs always encode an integer in `[0, p)`. Constructors
/// enforce the range; arithmetic preserves it. Values are immutable once
/// constructed and every operation produces a new value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct FieldElement([u64; 4]);

const fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = a as u128 + b as u128 + carry as u128;
    (t as u64, (t >> 64) as u64)
}

const fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let t = (a as u128).wrapping_sub(b as u128 + borrow as u128);
    (t as u64, ((t >> 64) as u64) & 1)
}

const fn mac(a: u64, b: u64, c: u64, carry: u64) -> (u64, u64) {
    let t = a as u128 + (b as u128) * (c as u128) + carry as u128;
    (t as u64, (t >> 64) as u64)
}

const fn geq_modulus(limbs: &[u64; 4]) -> bool {
    let mut i = 3;
    loop {
        if limbs[i] > MODULUS[i] {
            return true;
        }
        if limbs[i] < MODULUS[i] {
            return false;
        }
        if i == 0 {
            return true;
        }
        i -= 1;
    }
}

const fn sub_limbs(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], u64) {
    let mut out = [0u64; 4];
    let mut borrow = 0;
    let mut i = 0;
    while i < 4 {
        let (v, next) = sbb(a[i], b[i], borrow);
        out[i] = v;
        borrow = next;
        i += 1;
    }
    (out, borrow)
}

/// Schoolbook 256x256 -> 512 bit product
fn widening_mul(a: &[u64; 4], b: &[u64; 4]) -> [u64; 8] {
    let mut t = [0u64; 8];
    for i in 0..4 {
        let mut carry = 0;
        for j in 0..4 {
            let (v, c) = mac(t[i + j], a[i], b[j], carry);
            t[i + j] = v;
            carry = c;
        }
        t[i + 4] = carry;
    }
    t
}

/// Montgomery reduction of a 512-bit value: returns `t * R^-1 mod p`.
///
/// The result of reducing a product of two canonical elements is below 2p,
/// and 2p < 2^255, so a single conditional subtraction restores canonical
/// form and the top carry never survives.
fn montgomery_reduce(mut t: [u64; 8]) -> [u64; 4] {
    let mut carry2 = 0;
    for i in 0..4 {
        let k = t[i].wrapping_mul(INV);
        let mut carry = 0;
        for j in 0..4 {
            let (v, c) = mac(t[i + j], k, MODULUS[j], carry);
            t[i + j] = v;
            carry = c;
        }
        let (v, c) = adc(t[i + 4], carry2, carry);
        t[i + 4] = v;
        carry2 = c;
    }

    let mut limbs = [t[4], t[5], t[6], t[7]];
    if carry2 != 0 || geq_modulus(&limbs) {
        limbs = sub_limbs(&limbs, &MODULUS).0;
    }
    limbs
}

/// `a * b * R^-1 mod p`
fn mont_mul(a: &[u64; 4], b: &[u64; 4]) -> [u64; 4] {
    montgomery_reduce(widening_mul(a, b))
}

impl FieldElement {
    /// Additive identity
    pub const ZERO: Self = Self([0, 0, 0, 0]);
    /// Multiplicative identity
    pub const ONE: Self = Self([1, 0, 0, 0]);

    /// Construct from little-endian limbs.
    ///
    /// Intended for compile-time constants; panics at definition time if the
    /// value is not below the field modulus.
    pub const fn from_raw(limbs: [u64; 4]) -> Self {
        assert!(
            !geq_modulus(&limbs),
            "field literal out of range for the BN254 scalar field"
        );
        Self(limbs)
    }

    /// Construct from a `u64`, which is always canonical
    pub const fn from_u64(value: u64) -> Self {
        Self([value, 0, 0, 0])
    }

    /// Parse a decimal literal, rejecting values `>= p`
    pub fn from_decimal(s: &str) -> Result<Self, WitnessError> {
        if s.is_empty() {
            return Err(WitnessError::MalformedLiteral(s.into()));
        }
        let mut limbs = [0u64; 4];
        for byte in s.bytes() {
            let digit = match byte {
                b'0'..=b'9' => (byte - b'0') as u64,
                _ => return Err(WitnessError::MalformedLiteral(s.into())),
            };
            // limbs = limbs * 10 + digit
            let mut carry = digit;
            for limb in limbs.iter_mut() {
                let t = (*limb as u128) * 10 + carry as u128;
                *limb = t as u64;
                carry = (t >> 64) as u64;
            }
            if carry != 0 {
                return Err(WitnessError::LiteralOutOfRange(s.into()));
            }
        }
        if geq_modulus(&limbs) {
            return Err(WitnessError::LiteralOutOfRange(s.into()));
        }
        Ok(Self(limbs))
    }

    /// Parse a big-endian hex literal, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, WitnessError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() {
            return Err(WitnessError::MalformedLiteral(s.into()));
        }
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|_| WitnessError::MalformedLiteral(s.into()))?;
        if bytes.len() > 32 {
            return Err(WitnessError::LiteralOutOfRange(s.into()));
        }
        let mut be = [0u8; 32];
        be[32 - bytes.len()..].copy_from_slice(&bytes);
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = BigEndian::read_u64(&be[(3 - i) * 8..(4 - i) * 8]);
        }
        if geq_modulus(&limbs) {
            return Err(WitnessError::LiteralOutOfRange(s.into()));
        }
        Ok(Self(limbs))
    }

    /// Decode the fixed 32-byte little-endian encoding, rejecting
    /// non-canonical values
    pub fn from_bytes_le(bytes: &[u8; 32]) -> Result<Self, WitnessError> {
        let mut limbs = [0u64; 4];
        LittleEndian::read_u64_into(bytes, &mut limbs);
        if geq_modulus(&limbs) {
            return Err(WitnessError::NonCanonicalBytes);
        }
        Ok(Self(limbs))
    }

    /// Fixed 32-byte little-endian encoding
    pub fn to_bytes_le(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        LittleEndian::write_u64_into(&self.0, &mut out);
        out
    }

    /// Fixed 32-byte big-endian encoding
    pub fn to_bytes_be(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            BigEndian::write_u64(&mut out[(3 - i) * 8..(4 - i) * 8], *limb);
        }
        out
    }

    /// Raw little-endian limbs of the canonical value
    pub const fn to_raw(&self) -> [u64; 4] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Exponentiation by a little-endian limb exponent
    pub fn pow(&self, exp: &[u64; 4]) -> Self {
        // Square-and-multiply inside the Montgomery domain
        let base = mont_mul(&self.0, &R2);
        let mut acc = mont_mul(&Self::ONE.0, &R2);
        for limb in exp.iter().rev() {
            for bit in (0..64).rev() {
                acc = mont_mul(&acc, &acc);
                if (limb >> bit) & 1 == 1 {
                    acc = mont_mul(&acc, &base);
                }
            }
        }
        Self(mont_mul(&acc, &Self::ONE.0))
    }

    /// Multiplicative inverse, `None` for zero
    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self.pow(&MODULUS_MINUS_TWO))
        }
    }

    pub fn square(&self) -> Self {
        *self * *self
    }
}

impl Add for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        // Both operands are below p < 2^254, so the raw sum never overflows
        // the four limbs and a single conditional subtraction reduces it.
        let mut limbs = [0u64; 4];
        let mut carry = 0;
        for i in 0..4 {
            let (v, c) = adc(self.0[i], rhs.0[i], carry);
            limbs[i] = v;
            carry = c;
        }
        if geq_modulus(&limbs) {
            limbs = sub_limbs(&limbs, &MODULUS).0;
        }
        Self(limbs)
    }
}

impl Sub for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (mut limbs, borrow) = sub_limbs(&self.0, &rhs.0);
        if borrow != 0 {
            // Wrap by adding p back
            let mut carry = 0;
            for i in 0..4 {
                let (v, c) = adc(limbs[i], MODULUS[i], carry);
                limbs[i] = v;
                carry = c;
            }
        }
        Self(limbs)
    }
}

impl Mul for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        // mont_mul(a, b) = a*b*R^-1; a second pass against R^2 removes the
        // stray R^-1 factor and lands back in canonical form.
        Self(mont_mul(&mont_mul(&self.0, &rhs.0), &R2))
    }
}

impl Neg for FieldElement {
    type Output = Self;

    fn neg(self) -> Self {
        if self.is_zero() {
            self
        } else {
            Self(sub_limbs(&MODULUS, &self.0).0)
        }
    }
}

impl AddAssign for FieldElement {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for FieldElement {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for FieldElement {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl FromStr for FieldElement {
    type Err = WitnessError;

    /// Accepts decimal literals and `0x`-prefixed hex literals
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(stripped) = s.strip_prefix("0x") {
            Self::from_hex(stripped)
        } else {
            Self::from_decimal(s)
        }
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let mut limbs = self.0;
        let mut digits = Vec::new();
        while limbs != [0, 0, 0, 0] {
            let mut rem = 0u64;
            for i in (0..4).rev() {
                let t = ((rem as u128) << 64) | limbs[i] as u128;
                limbs[i] = (t / 10) as u64;
                rem = (t % 10) as u64;
            }
            digits.push(char::from(b'0' + rem as u8));
        }
        for digit in digits.iter().rev() {
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement(0x{})", hex::encode(self.to_bytes_be()))
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}
