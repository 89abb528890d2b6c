//! Extraction of blind-merged-mining linking data from coinbase outputs.
//!
//! A linking data announcement is an `OP_RETURN` output whose only payload
//! is a single 32-byte push: the critical hash of a sidechain block.

use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::{Script, Transaction};

use drivechain_primitives::buf::Buf32;

use crate::util::{next_bytes, next_op};

const CRITICAL_HASH_LEN: usize = 32;

/// Try to read a critical hash announcement out of one output script.
pub fn parse_critical_hash(script: &Script) -> Option<Buf32> {
    let mut instructions = script.instructions();
    if next_op(&mut instructions) != Some(OP_RETURN) {
        return None;
    }
    let data = next_bytes(&mut instructions)?;
    if data.len() != CRITICAL_HASH_LEN {
        return None;
    }
    // Trailing instructions mean this is some other OP_RETURN payload.
    if instructions.next().is_some() {
        return None;
    }
    Buf32::try_from(data).ok()
}

/// Collect every critical hash announced in a coinbase.
pub fn extract_critical_hashes(coinbase: &Transaction) -> Vec<Buf32> {
    coinbase
        .output
        .iter()
        .filter_map(|out| parse_critical_hash(&out.script_pubkey))
        .collect()
}
