use crate::error::TypesError;
use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

/// 256-bit unsigned integer for token balances and voting power.
///
/// Stored as 4 x u64 in little-endian limb order.
/// There are no operator impls on purpose: every ledger and ballot update goes
/// through `checked_*` and surfaces overflow as an error.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]); // [low, mid_low, mid_high, high]

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl U256 {
    pub const ZERO: Self = Self([0, 0, 0, 0]);
    pub const ONE: Self = Self([1, 0, 0, 0]);
    pub const MAX: Self = Self([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);

    /// Decimals used by the governance token (ether-style base units).
    pub const TOKEN_DECIMALS: u8 = 18;

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub const fn as_limbs(&self) -> &[u64; 4] {
        &self.0
    }

    pub const fn from_u64(val: u64) -> Self {
        Self([val, 0, 0, 0])
    }

    pub const fn from_u128(val: u128) -> Self {
        Self([val as u64, (val >> 64) as u64, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&l| l == 0)
    }

    /// Checked addition
    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        let mut result = [0u64; 4];
        let mut carry = false;

        for (i, limb) in result.iter_mut().enumerate() {
            let (sum, o1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum, o2) = sum.overflowing_add(carry as u64);
            *limb = sum;
            carry = o1 || o2;
        }

        if carry {
            None
        } else {
            Some(Self(result))
        }
    }

    /// Checked subtraction
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        if self < rhs {
            return None;
        }

        let mut result = [0u64; 4];
        let mut borrow = false;

        for (i, limb) in result.iter_mut().enumerate() {
            let (diff, u1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (diff, u2) = diff.overflowing_sub(borrow as u64);
            *limb = diff;
            borrow = u1 || u2;
        }

        Some(Self(result))
    }

    /// Checked multiplication
    pub fn checked_mul(&self, rhs: &Self) -> Option<Self> {
        if self.is_zero() || rhs.is_zero() {
            return Some(Self::ZERO);
        }
        Self::from_biguint(&(self.to_biguint() * rhs.to_biguint()))
    }

    /// Checked division
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        Self::from_biguint(&(self.to_biguint() / rhs.to_biguint()))
    }

    /// Saturating addition
    pub fn saturating_add(&self, rhs: &Self) -> Self {
        self.checked_add(rhs).unwrap_or(Self::MAX)
    }

    /// Saturating subtraction
    pub fn saturating_sub(&self, rhs: &Self) -> Self {
        self.checked_sub(rhs).unwrap_or(Self::ZERO)
    }

    /// Convert to big-endian bytes
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, chunk) in bytes.chunks_exact_mut(8).enumerate() {
            chunk.copy_from_slice(&self.0[3 - i].to_be_bytes());
        }
        bytes
    }

    /// Convert from big-endian bytes
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut limb = [0u8; 8];
            limb.copy_from_slice(chunk);
            limbs[3 - i] = u64::from_be_bytes(limb);
        }
        Self(limbs)
    }

    fn to_biguint(self) -> BigUint {
        BigUint::from_bytes_be(&self.to_be_bytes())
    }

    fn from_biguint(value: &BigUint) -> Option<Self> {
        if value.bits() > 256 {
            return None;
        }
        let bytes = value.to_bytes_be();
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(&bytes);
        Some(Self::from_be_bytes(padded))
    }

    /// Parse from decimal string
    pub fn from_decimal_str(s: &str) -> Result<Self, TypesError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypesError::InvalidU256String(s.to_string()));
        }
        let value = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| TypesError::InvalidU256String(s.to_string()))?;
        Self::from_biguint(&value).ok_or(TypesError::U256Overflow)
    }

    /// Parse a human amount such as `"25"` or `"0.5"` into base units.
    ///
    /// `U256::parse_units("25", 18)` is 25 * 10^18.
    pub fn parse_units(amount: &str, decimals: u8) -> Result<Self, TypesError> {
        let (whole, frac) = match amount.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (amount, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(TypesError::InvalidU256String(amount.to_string()));
        }
        if frac.len() > decimals as usize {
            return Err(TypesError::TooManyDecimals {
                max: decimals,
                actual: frac.len(),
            });
        }

        let parse = |part: &str| -> BigUint {
            if part.is_empty() {
                BigUint::zero()
            } else {
                BigUint::parse_bytes(part.as_bytes(), 10).unwrap_or_default()
            }
        };

        let scale = BigUint::from(10u32).pow(decimals as u32);
        let frac_scale = BigUint::from(10u32).pow((decimals as usize - frac.len()) as u32);
        let value = parse(whole) * scale + parse(frac) * frac_scale;

        Self::from_biguint(&value).ok_or(TypesError::U256Overflow)
    }

    /// Render base units as a human amount, trimming trailing zeros.
    ///
    /// `U256::from(15u64 * 10u64.pow(17)).format_units(18)` is `"0.15"`.
    pub fn format_units(&self, decimals: u8) -> String {
        let scale = BigUint::from(10u32).pow(decimals as u32);
        let value = self.to_biguint();
        let whole = &value / &scale;
        let frac = &value % &scale;

        if frac.is_zero() {
            return whole.to_string();
        }

        let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl From<u64> for U256 {
    fn from(val: u64) -> Self {
        Self::from_u64(val)
    }
}

impl From<u32> for U256 {
    fn from(val: u32) -> Self {
        Self::from_u64(val as u64)
    }
}

impl From<u128> for U256 {
    fn from(val: u128) -> Self {
        Self::from_u128(val)
    }
}

impl TryFrom<U256> for u128 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value.0[2] != 0 || value.0[3] != 0 {
            Err(TypesError::U256Overflow)
        } else {
            Ok((value.0[1] as u128) << 64 | value.0[0] as u128)
        }
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl fmt::LowerHex for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl FromStr for U256 {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => {
                if digits.is_empty() {
                    return Err(TypesError::InvalidU256String(s.to_string()));
                }
                let bytes = hex::decode(digits)?;
                if bytes.len() > 32 {
                    return Err(TypesError::U256Overflow);
                }
                let mut padded = [0u8; 32];
                padded[32 - bytes.len()..].copy_from_slice(&bytes);
                Ok(Self::from_be_bytes(padded))
            }
            None => Self::from_decimal_str(s),
        }
    }
}
