//! Bounded ring of recent coinbase transactions with a versioned disk format.
//!
//! The format is: required reader version (i32), writer version (i32), then
//! a compact-size count of `(block hash, transaction)` pairs in write order,
//! all in the host chain's consensus encoding. Read failures are non-fatal;
//! callers continue with an empty cache.

use std::io::{Read, Write};

use bitcoin::consensus::encode::{self, Decodable, Encodable, VarInt};
use bitcoin::{BlockHash, Transaction};
use thiserror::Error;
use tracing::warn;

/// Number of recent coinbases kept in the ring.
pub const COINBASES_TO_CACHE: usize = 2600;

/// Oldest client version able to parse the current format.
const VERSION_REQUIRED: i32 = 149_900;

/// Version stamped into files this code writes.
const CLIENT_VERSION: i32 = 150_000;

#[derive(Debug, Error)]
pub enum CoinbaseCacheError {
    #[error("coinbase cache requires client version {required} (ours {ours})")]
    UpVersion { required: i32, ours: i32 },

    #[error("coinbase cache deserialization: {0}")]
    Decode(#[from] encode::Error),

    #[error("coinbase cache serialization: {0}")]
    Serialize(#[from] bitcoin::io::Error),

    #[error("coinbase cache io: {0}")]
    Io(#[from] std::io::Error),
}

/// The most recent coinbases, oldest first.
#[derive(Clone, Debug, Default)]
pub struct CoinbaseCache {
    coinbases: Vec<(BlockHash, Transaction)>,
}

impl CoinbaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.coinbases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coinbases.is_empty()
    }

    /// The cached coinbase of a block, if it is still in the ring.
    pub fn get(&self, hash_block: &BlockHash) -> Option<&Transaction> {
        self.coinbases
            .iter()
            .find(|(hash, _)| hash == hash_block)
            .map(|(_, tx)| tx)
    }

    /// Remember a connected block's coinbase, evicting the oldest entry
    /// once the ring is full.
    pub fn process_new_coinbase(&mut self, hash_block: BlockHash, tx: Transaction) {
        if self.coinbases.len() >= COINBASES_TO_CACHE {
            self.coinbases.remove(0);
        }
        self.coinbases.push((hash_block, tx));
    }

    /// Serialize the ring into a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CoinbaseCacheError> {
        let mut buf: Vec<u8> = Vec::new();
        VERSION_REQUIRED.consensus_encode(&mut buf)?;
        CLIENT_VERSION.consensus_encode(&mut buf)?;
        VarInt(self.coinbases.len() as u64).consensus_encode(&mut buf)?;
        for (hash, tx) in &self.coinbases {
            hash.consensus_encode(&mut buf)?;
            tx.consensus_encode(&mut buf)?;
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Deserialize a ring from a reader, replacing the current contents.
    ///
    /// Nothing is replaced unless the whole file parses.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<(), CoinbaseCacheError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let mut bytes: &[u8] = &buf;

        let version_required = i32::consensus_decode(&mut bytes)?;
        let _version_that_wrote = i32::consensus_decode(&mut bytes)?;
        if version_required > CLIENT_VERSION {
            return Err(CoinbaseCacheError::UpVersion {
                required: version_required,
                ours: CLIENT_VERSION,
            });
        }

        let count = VarInt::consensus_decode(&mut bytes)?.0;
        let mut coinbases = Vec::new();
        for _ in 0..count {
            let hash = BlockHash::consensus_decode(&mut bytes)?;
            let tx = Transaction::consensus_decode(&mut bytes)?;
            coinbases.push((hash, tx));
        }

        self.coinbases = coinbases;
        Ok(())
    }

    /// Load a ring from a reader, falling back to empty on any failure.
    pub fn load<R: Read>(reader: &mut R) -> Self {
        let mut cache = Self::new();
        if let Err(err) = cache.read_from(reader) {
            warn!(%err, "coinbasecache: unable to read coinbase cache (non-fatal)");
            cache.coinbases.clear();
        }
        cache
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::absolute::LockTime;
    use bitcoin::consensus::encode::Encodable;
    use bitcoin::hashes::Hash;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, BlockHash, ScriptBuf, Transaction, TxOut};

    use super::{CoinbaseCache, CoinbaseCacheError, COINBASES_TO_CACHE};

    fn coinbase(tag: u64) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: Vec::new(),
            output: vec![TxOut {
                value: Amount::from_sat(tag),
                script_pubkey: ScriptBuf::new(),
            }],
        }
    }

    fn block_hash(tag: u8) -> BlockHash {
        BlockHash::from_byte_array([tag; 32])
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut cache = CoinbaseCache::new();
        for i in 0..COINBASES_TO_CACHE + 1 {
            cache.process_new_coinbase(block_hash((i % 251) as u8), coinbase(i as u64));
        }

        assert_eq!(cache.len(), COINBASES_TO_CACHE);
        // The first entry was pushed out.
        assert_eq!(
            cache.coinbases[0].1.output[0].value,
            Amount::from_sat(1)
        );
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut cache = CoinbaseCache::new();
        cache.process_new_coinbase(block_hash(1), coinbase(100));
        cache.process_new_coinbase(block_hash(2), coinbase(200));

        let mut buf = Vec::new();
        cache.write_to(&mut buf).unwrap();

        let mut restored = CoinbaseCache::new();
        restored.read_from(&mut buf.as_slice()).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(
            restored.get(&block_hash(2)).unwrap().output[0].value,
            Amount::from_sat(200)
        );
        assert!(restored.get(&block_hash(3)).is_none());
    }

    #[test]
    fn test_read_rejects_up_version() {
        let mut buf: Vec<u8> = Vec::new();
        i32::MAX.consensus_encode(&mut buf).unwrap();
        0i32.consensus_encode(&mut buf).unwrap();

        let mut cache = CoinbaseCache::new();
        let err = cache.read_from(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, CoinbaseCacheError::UpVersion { .. }));
    }

    #[test]
    fn test_read_failure_leaves_cache_untouched() {
        let mut cache = CoinbaseCache::new();
        cache.process_new_coinbase(block_hash(1), coinbase(100));

        let garbage = [0xffu8; 3];
        assert!(cache.read_from(&mut garbage.as_slice()).is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_load_falls_back_to_empty() {
        let garbage = [0xffu8; 7];
        let cache = CoinbaseCache::load(&mut garbage.as_slice());
        assert!(cache.is_empty());
    }
}
