//! Recognizing sidechain deposit outputs.
//!
//! A deposit output's script is `OP_RETURN <sidechain number byte>
//! <push(20-byte key id)>`. Anything after the key id push is ignored.

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::{Script, Transaction};

use drivechain_primitives::buf::Buf20;
use drivechain_primitives::sidechain::{sidechain_number_valid, Deposit, SidechainNumber};

use crate::util::next_bytes;

const KEY_ID_LEN: usize = 20;

/// Try to read a deposit out of a single output script.
///
/// The minimum length gate mirrors the size of the key id itself; anything
/// shorter cannot carry one. A zero key id is treated as unspendable and
/// skipped.
pub fn parse_deposit_output(script: &Script) -> Option<(SidechainNumber, Buf20)> {
    let bytes = script.as_bytes();
    if bytes.len() < KEY_ID_LEN {
        return None;
    }
    if bytes[0] != OP_RETURN.to_u8() {
        return None;
    }

    let sidechain = bytes[1];
    if !sidechain_number_valid(sidechain) {
        return None;
    }

    // The sidechain number byte is raw, so the push iterator starts after it.
    let tail = Script::from_bytes(&bytes[2..]);
    let mut instructions = tail.instructions();
    let data = next_bytes(&mut instructions)?;
    if data.len() != KEY_ID_LEN {
        return None;
    }

    let key_id = Buf20::try_from(data).ok()?;
    if key_id.is_zero() {
        return None;
    }

    Some((sidechain, key_id))
}

/// Collect every deposit carried by the supplied transactions.
///
/// The full transaction is kept alongside each deposit as consensus hex so
/// the sidechain can replay it.
pub fn extract_deposits(txs: &[Transaction]) -> Vec<Deposit> {
    let mut deposits = Vec::new();
    for tx in txs {
        for out in &tx.output {
            if let Some((sidechain, key_id)) = parse_deposit_output(&out.script_pubkey) {
                deposits.push(Deposit {
                    sidechain,
                    key_id,
                    tx_hex: serialize_hex(tx),
                });
            }
        }
    }
    deposits
}

#[cfg(test)]
mod tests {
    use bitcoin::absolute::LockTime;
    use bitcoin::opcodes::all::OP_RETURN;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, ScriptBuf, Transaction, TxOut};

    use super::{extract_deposits, parse_deposit_output};

    const KEY_ID: [u8; 20] = [0x2b; 20];

    fn deposit_script(sidechain: u8, key_id: &[u8; 20]) -> ScriptBuf {
        let mut bytes = Vec::with_capacity(23);
        bytes.push(OP_RETURN.to_u8());
        bytes.push(sidechain);
        bytes.push(key_id.len() as u8);
        bytes.extend_from_slice(key_id);
        ScriptBuf::from_bytes(bytes)
    }

    fn tx_with_outputs(scripts: Vec<ScriptBuf>) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: Vec::new(),
            output: scripts
                .into_iter()
                .map(|script_pubkey| TxOut {
                    value: Amount::from_sat(50_000),
                    script_pubkey,
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_valid_deposit() {
        let script = deposit_script(1, &KEY_ID);
        let (sidechain, key_id) = parse_deposit_output(&script).unwrap();
        assert_eq!(sidechain, 1);
        assert_eq!(key_id.0, KEY_ID);
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let mut script = deposit_script(0, &KEY_ID).into_bytes();
        script.push(0x00);
        assert!(parse_deposit_output(&ScriptBuf::from_bytes(script)).is_some());
    }

    #[test]
    fn test_parse_rejects_unknown_sidechain() {
        assert!(parse_deposit_output(&deposit_script(9, &KEY_ID)).is_none());
    }

    #[test]
    fn test_parse_rejects_zero_key() {
        assert!(parse_deposit_output(&deposit_script(0, &[0; 20])).is_none());
    }

    #[test]
    fn test_parse_rejects_wrong_push_len() {
        let mut bytes = vec![OP_RETURN.to_u8(), 0, 19];
        bytes.extend_from_slice(&[0x2b; 19]);
        // Pad past the minimum length gate.
        bytes.push(0x00);
        assert!(parse_deposit_output(&ScriptBuf::from_bytes(bytes)).is_none());
    }

    #[test]
    fn test_parse_rejects_short_script() {
        assert!(parse_deposit_output(&ScriptBuf::from_bytes(vec![OP_RETURN.to_u8(), 0])).is_none());
    }

    #[test]
    fn test_extract_deposits_from_block() {
        let tx = tx_with_outputs(vec![
            deposit_script(0, &KEY_ID),
            ScriptBuf::new(),
            deposit_script(2, &KEY_ID),
        ]);
        let deposits = extract_deposits(std::slice::from_ref(&tx));

        assert_eq!(deposits.len(), 2);
        assert_eq!(deposits[0].sidechain, 0);
        assert_eq!(deposits[1].sidechain, 2);
        let expected_hex = bitcoin::consensus::encode::serialize_hex(&tx);
        assert!(deposits.iter().all(|d| d.tx_hex == expected_hex));
    }
}
