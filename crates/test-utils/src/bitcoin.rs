//! Builders for the main-chain transactions the database consumes in tests.

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use rand::Rng;

use drivechain_primitives::buf::Buf32;
use drivechain_primitives::sidechain::SidechainNumber;

use crate::ArbitraryGenerator;

/// Key id credited by the deposit transactions built here.
// mx3PT9t2kzCFgAURR9HeK6B5wN8egReUxY
pub const TEST_KEY_ID: [u8; 20] = [
    0xb5, 0x43, 0x7d, 0xc6, 0xa4, 0xe5, 0xda, 0x55, 0x97, 0x54, 0x8c, 0xf8, 0x7d, 0xb0, 0x09,
    0x23, 0x7d, 0x28, 0x66, 0x36,
];

const CENT: u64 = 1_000_000;

/// A deposit output script: `OP_RETURN <sidechain> <push(key id)>`.
pub fn deposit_script(sidechain: SidechainNumber, key_id: &[u8; 20]) -> ScriptBuf {
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_RETURN.to_u8());
    bytes.push(sidechain);
    bytes.push(key_id.len() as u8);
    bytes.extend_from_slice(key_id);
    ScriptBuf::from_bytes(bytes)
}

/// A linking data announcement script: `OP_RETURN <push(critical hash)>`.
pub fn bmm_script(critical_hash: &Buf32) -> ScriptBuf {
    let mut bytes = Vec::with_capacity(34);
    bytes.push(OP_RETURN.to_u8());
    bytes.push(critical_hash.0.len() as u8);
    bytes.extend_from_slice(&critical_hash.0);
    ScriptBuf::from_bytes(bytes)
}

/// Single-output deposit transactions for a sidechain, distinct from each
/// other within one call.
pub fn create_deposit_transactions(
    sidechain: SidechainNumber,
    count: usize,
) -> Vec<Transaction> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            // Random enough output value; the index term keeps the txids
            // distinct within this batch.
            let value = (i as u64 + 1) * CENT + rng.gen_range(0..50);
            Transaction {
                version: Version::TWO,
                lock_time: LockTime::ZERO,
                input: Vec::new(),
                output: vec![TxOut {
                    value: Amount::from_sat(value),
                    script_pubkey: deposit_script(sidechain, &TEST_KEY_ID),
                }],
            }
        })
        .collect()
}

/// A coinbase carrying the given output scripts, each with zero value.
pub fn create_coinbase(scripts: Vec<ScriptBuf>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: scripts
            .into_iter()
            .map(|script_pubkey| TxOut {
                value: Amount::ZERO,
                script_pubkey,
            })
            .collect(),
    }
}

/// A fresh random transaction id.
pub fn random_wtxid() -> Txid {
    let mut generator = ArbitraryGenerator::new();
    Txid::from_byte_array(generator.generate::<Buf32>().0)
}
