//! Common wrapper around whatever we choose our native hash function to be.

use borsh::BorshSerialize;
use digest::Digest;
use sha2::Sha256;

use crate::buf::Buf32;

/// Direct untagged hash.
pub fn raw(buf: &[u8]) -> Buf32 {
    Buf32::from(<[u8; 32]>::from(Sha256::digest(buf)))
}

/// Double SHA256, the host chain's hash construction.
pub fn sha256d(buf: &[u8]) -> Buf32 {
    let mut hasher = Sha256::new();
    hasher.update(buf);
    let result = hasher.finalize_reset();
    hasher.update(result);
    let arr: [u8; 32] = hasher.finalize().into();
    Buf32::from(arr)
}

/// Hashes the borsh serialization of the value with the double construction.
pub fn compute_borsh_hash<T: BorshSerialize>(v: &T) -> Buf32 {
    let mut writer = Hash256Writer::new();
    v.serialize(&mut writer).expect("hash: borsh serialization");
    writer.finalize()
}

/// Incremental writer for the double SHA256 construction.
///
/// Accepts serialized input through [`std::io::Write`] so values can stream
/// their canonical byte layout straight into the hasher.
#[derive(Clone, Debug, Default)]
pub struct Hash256Writer {
    inner: Sha256,
}

impl Hash256Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finalize(self) -> Buf32 {
        let first = self.inner.finalize();
        let arr: [u8; 32] = Sha256::digest(first).into();
        Buf32::from(arr)
    }
}

impl std::io::Write for Hash256Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::{sha256d, Hash};
    use rand::{rngs::OsRng, RngCore};

    use super::{sha256d as our_sha256d, Hash256Writer};
    use crate::buf::Buf32;

    #[test]
    fn test_sha256d_equivalence() {
        let mut array = [0u8; 32];
        OsRng.fill_bytes(&mut array);

        let expected = Buf32::from(sha256d::Hash::hash(&array).to_byte_array());
        let output = our_sha256d(&array);

        assert_eq!(expected, output);
    }

    #[test]
    fn test_writer_matches_oneshot() {
        let mut writer = Hash256Writer::new();
        writer.input(b"with");
        writer.input(b"drawal");
        assert_eq!(writer.finalize(), our_sha256d(b"withdrawal"));
    }

    #[test]
    fn test_empty_input() {
        let writer = Hash256Writer::new();
        assert_eq!(writer.finalize(), our_sha256d(&[]));
    }
}
