//! Typed key values and their total ordering.
//!
//! The index is generic over a small set of key types. Beyond a total
//! order and equality the tree treats keys as opaque: the original
//! comparator contract (`smaller`, `equals`) maps onto [`Ord`] and
//! [`PartialEq`] here.
//!
//! Every key type has a fixed encoded width so that node entries pack
//! into a page at a size known up front.

use std::cmp::Ordering;
use std::fmt;

use crate::common::config::TEXT_KEY_LEN;
use crate::common::{Error, Result};

/// The data type of the keys held by one index.
///
/// The numeric codes are what gets persisted in the index header page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// 32-bit signed integer keys.
    Int,
    /// Text keys, at most [`TEXT_KEY_LEN`] bytes.
    Text,
    /// 64-bit floating point keys, ordered by `f64::total_cmp`.
    Real,
    /// Boolean keys.
    Bool,
}

impl KeyType {
    /// Persisted type code.
    pub fn code(self) -> u32 {
        match self {
            KeyType::Int => 0,
            KeyType::Text => 1,
            KeyType::Real => 2,
            KeyType::Bool => 3,
        }
    }

    /// Decode a persisted type code.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(KeyType::Int),
            1 => Ok(KeyType::Text),
            2 => Ok(KeyType::Real),
            3 => Ok(KeyType::Bool),
            _ => Err(Error::Corrupted("unknown key type code")),
        }
    }

    /// Encoded width of a key of this type, in bytes.
    pub fn encoded_len(self) -> usize {
        match self {
            KeyType::Int => 4,
            KeyType::Text => TEXT_KEY_LEN,
            KeyType::Real => 8,
            KeyType::Bool => 1,
        }
    }
}

/// A single key value.
///
/// All keys within one index share a [`KeyType`]; mixing types is
/// rejected at the index boundary, so comparisons only ever see
/// same-variant pairs.
#[derive(Debug, Clone)]
pub enum Key {
    Int(i32),
    Text(String),
    Real(f64),
    Bool(bool),
}

impl Key {
    /// The type of this key value.
    pub fn key_type(&self) -> KeyType {
        match self {
            Key::Int(_) => KeyType::Int,
            Key::Text(_) => KeyType::Text,
            Key::Real(_) => KeyType::Real,
            Key::Bool(_) => KeyType::Bool,
        }
    }

    /// Check this key against the type an index was created with.
    pub fn check_type(&self, expected: KeyType) -> Result<()> {
        if self.key_type() != expected {
            return Err(Error::KeyTypeMismatch { expected });
        }
        if let Key::Text(s) = self {
            if s.len() > TEXT_KEY_LEN {
                return Err(Error::KeyTooLong(TEXT_KEY_LEN));
            }
        }
        Ok(())
    }

    /// Write the fixed-width encoding of this key into `buf`.
    ///
    /// `buf` must be exactly `self.key_type().encoded_len()` bytes.
    /// Text keys are zero-padded to the full width.
    pub fn encode(&self, buf: &mut [u8]) {
        match self {
            Key::Int(v) => buf.copy_from_slice(&v.to_le_bytes()),
            Key::Real(v) => buf.copy_from_slice(&v.to_le_bytes()),
            Key::Bool(v) => buf[0] = *v as u8,
            Key::Text(s) => {
                let bytes = s.as_bytes();
                buf[..bytes.len()].copy_from_slice(bytes);
                buf[bytes.len()..].fill(0);
            }
        }
    }

    /// Read a key of the given type from its fixed-width encoding.
    pub fn decode(key_type: KeyType, buf: &[u8]) -> Result<Self> {
        match key_type {
            KeyType::Int => {
                let raw: [u8; 4] = buf.try_into().map_err(|_| Error::Corrupted("short int key"))?;
                Ok(Key::Int(i32::from_le_bytes(raw)))
            }
            KeyType::Real => {
                let raw: [u8; 8] = buf.try_into().map_err(|_| Error::Corrupted("short real key"))?;
                Ok(Key::Real(f64::from_le_bytes(raw)))
            }
            KeyType::Bool => Ok(Key::Bool(buf[0] != 0)),
            KeyType::Text => {
                let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                let s = std::str::from_utf8(&buf[..end])
                    .map_err(|_| Error::Corrupted("text key is not valid UTF-8"))?;
                Ok(Key::Text(s.to_owned()))
            }
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Text(a), Key::Text(b)) => a.cmp(b),
            // total_cmp gives a total order over all f64 values,
            // including NaN, which plain PartialOrd does not.
            (Key::Real(a), Key::Real(b)) => a.total_cmp(b),
            (Key::Bool(a), Key::Bool(b)) => a.cmp(b),
            // Keys of different types never coexist in one index; fall
            // back to the type code so Ord stays total anyway.
            _ => self.key_type().code().cmp(&other.key_type().code()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Text(s) => write!(f, "{}", s),
            Key::Real(v) => write!(f, "{}", v),
            Key::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_ordering() {
        assert!(Key::Int(-5) < Key::Int(3));
        assert!(Key::Int(3) == Key::Int(3));
        assert!(Key::Int(10) > Key::Int(3));
    }

    #[test]
    fn test_text_ordering() {
        assert!(Key::Text("apple".into()) < Key::Text("banana".into()));
        assert_eq!(Key::Text("kiwi".into()), Key::Text("kiwi".into()));
    }

    #[test]
    fn test_real_total_order_handles_nan() {
        assert!(Key::Real(1.5) < Key::Real(2.0));
        // NaN sorts above all finite values under total_cmp, and equals
        // itself, so the tree invariants hold even for NaN keys.
        assert_eq!(Key::Real(f64::NAN), Key::Real(f64::NAN));
        assert!(Key::Real(f64::NAN) > Key::Real(f64::MAX));
    }

    #[test]
    fn test_encode_decode() {
        let mut buf = [0u8; 4];
        Key::Int(-77).encode(&mut buf);
        assert_eq!(Key::decode(KeyType::Int, &buf).unwrap(), Key::Int(-77));

        let mut buf = [0u8; TEXT_KEY_LEN];
        Key::Text("hi".into()).encode(&mut buf);
        assert_eq!(
            Key::decode(KeyType::Text, &buf).unwrap(),
            Key::Text("hi".into())
        );
    }

    #[test]
    fn test_check_type() {
        assert!(Key::Int(1).check_type(KeyType::Int).is_ok());
        assert!(matches!(
            Key::Int(1).check_type(KeyType::Real),
            Err(Error::KeyTypeMismatch { .. })
        ));
        let long = "x".repeat(TEXT_KEY_LEN + 1);
        assert!(matches!(
            Key::Text(long).check_type(KeyType::Text),
            Err(Error::KeyTooLong(_))
        ));
    }

    #[test]
    fn test_key_type_codes_roundtrip() {
        for kt in [KeyType::Int, KeyType::Text, KeyType::Real, KeyType::Bool] {
            assert_eq!(KeyType::from_code(kt.code()).unwrap(), kt);
        }
        assert!(KeyType::from_code(9).is_err());
    }
}
