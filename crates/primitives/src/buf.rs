use std::fmt;
use std::str;

use arbitrary::Arbitrary;
use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, Txid};
use borsh::{BorshDeserialize, BorshSerialize};

// 20-byte buf, useful for key ids
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Arbitrary,
    BorshDeserialize,
    BorshSerialize,
)]
pub struct Buf20(pub [u8; 20]);

impl Buf20 {
    pub fn zero() -> Self {
        Self([0; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 20]
    }
}

impl From<[u8; 20]> for Buf20 {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Buf20 {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        <[u8; 20]>::try_from(value).map(Self)
    }
}

// 32-byte buf, useful for hashes
#[derive(
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Arbitrary,
    BorshDeserialize,
    BorshSerialize,
)]
pub struct Buf32(pub [u8; 32]);

impl Buf32 {
    pub fn zero() -> Self {
        Self([0; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }
}

impl From<[u8; 32]> for Buf32 {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<BlockHash> for Buf32 {
    fn from(value: BlockHash) -> Self {
        Self(value.to_byte_array())
    }
}

impl From<Txid> for Buf32 {
    fn from(value: Txid) -> Self {
        Self(value.to_byte_array())
    }
}

impl TryFrom<&[u8]> for Buf32 {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        <[u8; 32]>::try_from(value).map(Self)
    }
}

impl fmt::Debug for Buf32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0; 64];
        hex::encode_to_slice(self.0, &mut buf).expect("buf: enc hex");
        f.write_str(unsafe { str::from_utf8_unchecked(&buf) })
    }
}

impl fmt::Display for Buf32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl serde::Serialize for Buf20 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl serde::Serialize for Buf32 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::{Buf20, Buf32};

    #[test]
    fn test_debug_renders_hex() {
        let buf = Buf32::from([0xab; 32]);
        assert_eq!(format!("{buf:?}"), "ab".repeat(32));
    }

    #[test]
    fn test_try_from_slice() {
        assert!(Buf20::try_from([1u8; 20].as_slice()).is_ok());
        assert!(Buf20::try_from([1u8; 19].as_slice()).is_err());
        assert!(Buf32::try_from([1u8; 32].as_slice()).is_ok());
        assert!(Buf32::try_from([1u8; 33].as_slice()).is_err());
    }

    #[test]
    fn test_zero() {
        assert!(Buf20::zero().is_zero());
        assert!(!Buf32::from([1u8; 32]).is_zero());
    }
}
