//! The static sidechain registry and the entities tracked per sidechain.
//!
//! Registry order is consensus order: the n-th run of a coinbase state
//! script always refers to the n-th entry of [`VALID_SIDECHAINS`].

use bitcoin::hashes::Hash;
use bitcoin::Txid;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use thiserror::Error;

use crate::buf::Buf20;

/// Index of a sidechain in the registry.
pub type SidechainNumber = u8;

/// Max number of withdrawal bundles cached at once.
pub const SIDECHAIN_MAX_WT: usize = 3;

/// Max number of BMM linking data entries retained.
pub const SIDECHAIN_MAX_LD: usize = 50;

pub const SIDECHAIN_TEST: SidechainNumber = 0;
pub const SIDECHAIN_HIVEMIND: SidechainNumber = 1;
pub const SIDECHAIN_WIMBLE: SidechainNumber = 2;

/// Well-known key id whose P2PKH script holds sidechain funds on the main
/// chain. Every registered sidechain currently shares it.
pub const SIDECHAIN_KEY_ID: [u8; 20] = [
    0x09, 0xc1, 0xfb, 0xf0, 0xad, 0x30, 0x47, 0xfb, 0x82, 0x5e, 0x0b, 0xc5, 0x91, 0x15, 0x28,
    0x59, 0x6b, 0x7d, 0x7f, 0x49,
];

/// Per-sidechain voting parameters.
///
/// These never change for the lifetime of the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sidechain {
    /// Position in the registry.
    pub number: SidechainNumber,

    /// Human-readable name, for logs only.
    pub name: &'static str,

    /// Leading blocks of a tau during which votes are ignored.
    pub wait_period: u16,

    /// Trailing blocks of a tau during which votes count.
    pub verification_period: u16,

    /// Work score at which a withdrawal bundle is considered verified.
    pub min_work_score: u16,
}

impl Sidechain {
    /// Full voting epoch length in blocks.
    pub fn tau(&self) -> u16 {
        self.wait_period + self.verification_period
    }
}

/// Every sidechain this node recognizes, in consensus order.
pub const VALID_SIDECHAINS: [Sidechain; 3] = [
    Sidechain {
        number: SIDECHAIN_TEST,
        name: "test",
        wait_period: 100,
        verification_period: 200,
        min_work_score: 100,
    },
    Sidechain {
        number: SIDECHAIN_HIVEMIND,
        name: "hivemind",
        wait_period: 200,
        verification_period: 400,
        min_work_score: 200,
    },
    Sidechain {
        number: SIDECHAIN_WIMBLE,
        name: "wimble",
        wait_period: 200,
        verification_period: 400,
        min_work_score: 200,
    },
];

/// A sidechain number that is not present in the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown sidechain number {0}")]
pub struct UnknownSidechain(pub SidechainNumber);

pub fn sidechain_number_valid(number: SidechainNumber) -> bool {
    (number as usize) < VALID_SIDECHAINS.len()
}

/// Look up a sidechain's parameters by its registry number.
pub fn sidechain_params(number: SidechainNumber) -> Result<&'static Sidechain, UnknownSidechain> {
    VALID_SIDECHAINS
        .get(number as usize)
        .ok_or(UnknownSidechain(number))
}

/// One verification record for a withdrawal bundle.
///
/// A new record is appended every time a vote is applied; the latest score
/// for a bundle is derived by collapsing the per-sidechain sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalBundleState {
    pub sidechain: SidechainNumber,

    /// Blocks remaining in the bundle's tau. Decrements with every applied
    /// vote, floored at zero.
    pub blocks_left: u16,

    /// Accumulated votes in favor, floored at zero.
    pub work_score: u16,

    /// Hash of the withdrawal bundle transaction.
    pub wtxid: Txid,
}

// Canonical layout fed to the state hash:
// number || blocks_left LE || work_score LE || 32 txid bytes.
impl BorshSerialize for WithdrawalBundleState {
    fn serialize<W: borsh::io::Write>(&self, writer: &mut W) -> borsh::io::Result<()> {
        BorshSerialize::serialize(&self.sidechain, writer)?;
        BorshSerialize::serialize(&self.blocks_left, writer)?;
        BorshSerialize::serialize(&self.work_score, writer)?;
        writer.write_all(&self.wtxid.to_byte_array())
    }
}

impl BorshDeserialize for WithdrawalBundleState {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> borsh::io::Result<Self> {
        let sidechain = SidechainNumber::deserialize_reader(reader)?;
        let blocks_left = u16::deserialize_reader(reader)?;
        let work_score = u16::deserialize_reader(reader)?;
        let mut txid = [0u8; 32];
        reader.read_exact(&mut txid)?;
        Ok(Self {
            sidechain,
            blocks_left,
            work_score,
            wtxid: Txid::from_byte_array(txid),
        })
    }
}

/// A deposit to a sidechain discovered in a block transaction.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Serialize)]
pub struct Deposit {
    pub sidechain: SidechainNumber,

    /// Key id the sidechain should credit.
    pub key_id: Buf20,

    /// Consensus hex serialization of the whole depositing transaction.
    pub tx_hex: String,
}
