//! Modular arithmetic over a curve's scalar field

pub mod linear_system;

use anyhow::{anyhow, bail, Result};
use num_bigint::{BigInt, BigUint};
use num_traits::{Num, One, Signed, Zero};

/// secp256k1 group order n, big-endian.
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

const MILLER_RABIN_BASES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Which signature component a value is parsed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    RorS,
    Z,
}

/// What to do with input values that are not already reduced mod n.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputPolicy {
    /// Fail on any value >= n.
    #[default]
    Reject,
    /// Reduce values mod n silently.
    Reduce,
}

/// The integers modulo a prime group order `n`.
///
/// Values are plain `BigUint`s. Operations accept unreduced operands and
/// always return reduced results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarField {
    n: BigUint,
    half: BigUint,
    byte_len: usize,
}

impl ScalarField {
    /// Builds the field for modulus `n`, which must be a prime >= 3.
    pub fn new(n: BigUint) -> Result<Self> {
        if n < BigUint::from(3u32) {
            bail!("Modulus must be a prime >= 3, got {}", n);
        }
        if !is_probable_prime(&n) {
            bail!("Modulus {} is not prime, field inverses would not exist", n);
        }
        Ok(Self::new_unchecked(n))
    }

    /// The secp256k1 group order.
    pub fn secp256k1() -> Self {
        Self::new_unchecked(BigUint::from_bytes_be(&SECP256K1_ORDER))
    }

    /// Parses a decimal or `0x` hexadecimal modulus.
    pub fn from_str_modulus(text: &str) -> Result<Self> {
        Self::new(parse_integer(text)?)
    }

    fn new_unchecked(n: BigUint) -> Self {
        let half = &n / 2u32;
        let byte_len = ((n.bits() + 7) / 8) as usize;
        Self { n, half, byte_len }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// `floor(n / 2)`.
    pub fn half(&self) -> &BigUint {
        &self.half
    }

    pub fn reduce(&self, a: &BigUint) -> BigUint {
        a % &self.n
    }

    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.n
    }

    pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let a = self.reduce(a);
        let b = self.reduce(b);
        if a >= b {
            a - b
        } else {
            a + &self.n - b
        }
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.n
    }

    pub fn neg(&self, a: &BigUint) -> BigUint {
        self.sub(&BigUint::zero(), a)
    }

    /// Multiplicative inverse via the extended Euclidean algorithm.
    ///
    /// Returns `None` for elements congruent to zero.
    pub fn inverse(&self, a: &BigUint) -> Option<BigUint> {
        let a = self.reduce(a);
        if a.is_zero() {
            return None;
        }

        let n = BigInt::from(self.n.clone());
        let mut t = BigInt::zero();
        let mut new_t = BigInt::one();
        let mut r = n.clone();
        let mut new_r = BigInt::from(a);

        while !new_r.is_zero() {
            let quotient = &r / &new_r;
            let temp_t = &t - &quotient * &new_t;
            t = new_t;
            new_t = temp_t;
            let temp_r = &r - &quotient * &new_r;
            r = new_r;
            new_r = temp_r;
        }

        if !r.is_one() {
            return None;
        }
        if t.is_negative() {
            t += &n;
        }
        t.to_biguint()
    }

    /// Parses one signature component and applies `policy` to out-of-range values.
    pub fn parse_scalar(
        &self,
        text: &str,
        kind: ScalarKind,
        policy: InputPolicy,
    ) -> Result<BigUint> {
        let value = parse_integer(text)?;

        let value = if value >= self.n {
            match policy {
                InputPolicy::Reject => {
                    bail!("Value >= group order n, ensure your data is already reduced")
                }
                InputPolicy::Reduce => self.reduce(&value),
            }
        } else {
            value
        };

        if kind == ScalarKind::RorS && value.is_zero() {
            bail!("r and s values cannot be zero mod n");
        }

        Ok(value)
    }

    /// Big-endian hex, zero padded to the byte width of `n`.
    pub fn to_hex(&self, a: &BigUint) -> String {
        let bytes = a.to_bytes_be();
        let mut padded = vec![0u8; self.byte_len.max(bytes.len())];
        let offset = padded.len() - bytes.len();
        padded[offset..].copy_from_slice(&bytes);
        hex::encode(padded)
    }
}

/// Parses a strict decimal integer or a `0x`-prefixed hexadecimal one.
pub fn parse_integer(text: &str) -> Result<BigUint> {
    let text = text.trim();
    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Invalid hex string: {:?}", text);
        }
        return BigUint::from_str_radix(digits, 16)
            .map_err(|e| anyhow!("Failed to parse hex: {}", e));
    }

    if text.is_empty() {
        bail!("Empty decimal string");
    }
    if !text.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid decimal string: only digits 0-9 allowed");
    }
    if text.len() > 1 && text.starts_with('0') {
        bail!("Invalid decimal string: no leading zeros allowed");
    }

    BigUint::from_str_radix(text, 10).map_err(|e| anyhow!("Failed to parse decimal: {}", e))
}

pub fn to_decimal_string(a: &BigUint) -> String {
    a.to_str_radix(10)
}

/// Shared nonce of two signatures made with the same `k`:
/// `k = (z1 - z2) / (s1 - s2)`. `None` when `s1 ≡ s2`.
pub fn recover_nonce(
    field: &ScalarField,
    z1: &BigUint,
    z2: &BigUint,
    s1: &BigUint,
    s2: &BigUint,
) -> Option<BigUint> {
    let ds_inv = field.inverse(&field.sub(s1, s2))?;
    let dz = field.sub(z1, z2);
    Some(field.mul(&dz, &ds_inv))
}

/// Private key from one signature and its nonce: `d = (s*k - z) / r`.
/// `None` when `r ≡ 0`.
pub fn recover_private_key(
    field: &ScalarField,
    r: &BigUint,
    s: &BigUint,
    z: &BigUint,
    k: &BigUint,
) -> Option<BigUint> {
    let r_inv = field.inverse(r)?;
    Some(field.mul(&field.sub(&field.mul(s, k), z), &r_inv))
}

/// Miller-Rabin with the first twelve primes as bases.
///
/// Deterministic below 3.3 * 10^24 and overwhelmingly reliable above.
fn is_probable_prime(n: &BigUint) -> bool {
    for &p in &MILLER_RABIN_BASES {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    let one = BigUint::one();
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for &a in &MILLER_RABIN_BASES {
        let mut x = BigUint::from(a).modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
