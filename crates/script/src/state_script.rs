//! Encoder and decoder for the coinbase state script.
//!
//! The payload after the version prefix is one vote byte per withdrawal
//! bundle, bundles separated by [`SCOP_WT_DELIM`], sidechain runs separated
//! by [`SCOP_SC_DELIM`], with no trailing delimiters. Run position is
//! meaningful: the n-th run belongs to the n-th registry entry.

use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::{Script, ScriptBuf};

use crate::error::StateScriptError;
use crate::opcodes::{SCOP_SC_DELIM, SCOP_VERSION, SCOP_VERSION_DELIM, SCOP_WT_DELIM};
use crate::vote::Vote;

/// Offset of the first payload byte, past `OP_RETURN` and the version.
const PAYLOAD_START: usize = 3;

/// One vote slot decoded from a state script payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DecodedVote {
    /// Registry position of the sidechain the vote belongs to.
    pub sidechain_index: usize,
    /// First-seen position of the bundle within that sidechain.
    pub bundle_index: usize,
    pub vote: Vote,
}

/// Whether a script carries the state script version prefix.
pub fn is_state_script(script: &Script) -> bool {
    let bytes = script.as_bytes();
    bytes.len() >= PAYLOAD_START
        && bytes[0] == OP_RETURN.to_u8()
        && bytes[1] == SCOP_VERSION
        && bytes[2] == SCOP_VERSION_DELIM
}

/// Encode one run of votes per sidechain, in registry order.
///
/// A sidechain with no bundles contributes an empty run; its delimiter is
/// still emitted so later runs keep their registry position.
pub fn encode_state_script(votes: &[Vec<Vote>]) -> ScriptBuf {
    let mut bytes = vec![OP_RETURN.to_u8(), SCOP_VERSION, SCOP_VERSION_DELIM];
    for (x, run) in votes.iter().enumerate() {
        for (y, vote) in run.iter().enumerate() {
            bytes.push(vote.to_byte());
            if y != run.len() - 1 {
                bytes.push(SCOP_WT_DELIM);
            }
        }
        if x != votes.len() - 1 {
            bytes.push(SCOP_SC_DELIM);
        }
    }
    ScriptBuf::from_bytes(bytes)
}

/// Decode a state script against the current per-sidechain bundle counts.
///
/// Bytes that are neither votes nor delimiters are skipped. Decoding fails
/// if the walk leaves the registry or a run votes past its bundle count, so
/// a successful decode is always fully applicable.
pub fn decode_state_script(
    script: &Script,
    bundle_counts: &[usize],
) -> Result<Vec<DecodedVote>, StateScriptError> {
    let bytes = script.as_bytes();
    if !is_state_script(script) {
        return Err(StateScriptError::BadPrefix);
    }
    if bytes.len() <= PAYLOAD_START {
        return Err(StateScriptError::TooShort(bytes.len()));
    }

    let mut decoded = Vec::new();
    let mut sidechain_index = 0usize;
    let mut bundle_index = 0usize;
    for &byte in &bytes[PAYLOAD_START..] {
        if sidechain_index >= bundle_counts.len() {
            return Err(StateScriptError::SidechainIndexOutOfRange(sidechain_index));
        }

        if byte == SCOP_WT_DELIM {
            bundle_index += 1;
            continue;
        }
        if byte == SCOP_SC_DELIM {
            bundle_index = 0;
            sidechain_index += 1;
            continue;
        }

        let Some(vote) = Vote::from_byte(byte) else {
            continue;
        };
        if bundle_index >= bundle_counts[sidechain_index] {
            return Err(StateScriptError::BundleIndexOutOfRange(
                sidechain_index,
                bundle_index,
            ));
        }
        decoded.push(DecodedVote {
            sidechain_index,
            bundle_index,
            vote,
        });
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use bitcoin::opcodes::all::OP_RETURN;
    use bitcoin::ScriptBuf;

    use super::{decode_state_script, encode_state_script, is_state_script, DecodedVote};
    use crate::error::StateScriptError;
    use crate::opcodes::*;
    use crate::vote::Vote;

    fn script_of(payload: &[u8]) -> ScriptBuf {
        let mut bytes = vec![OP_RETURN.to_u8(), SCOP_VERSION, SCOP_VERSION_DELIM];
        bytes.extend_from_slice(payload);
        ScriptBuf::from_bytes(bytes)
    }

    #[test]
    fn test_encode_layout() {
        let script = encode_state_script(&[
            vec![Vote::Verify],
            vec![Vote::Reject, Vote::Verify],
            vec![],
        ]);
        assert_eq!(
            script.as_bytes(),
            &[
                OP_RETURN.to_u8(),
                SCOP_VERSION,
                SCOP_VERSION_DELIM,
                SCOP_VERIFY,
                SCOP_SC_DELIM,
                SCOP_REJECT,
                SCOP_WT_DELIM,
                SCOP_VERIFY,
                SCOP_SC_DELIM,
            ]
        );
    }

    #[test]
    fn test_prefix_detection() {
        assert!(is_state_script(&script_of(&[])));
        assert!(!is_state_script(&ScriptBuf::new()));
        assert!(!is_state_script(&ScriptBuf::from_bytes(vec![
            OP_RETURN.to_u8(),
            SCOP_VERSION,
        ])));
        assert!(!is_state_script(&ScriptBuf::from_bytes(vec![
            OP_RETURN.to_u8(),
            0x7f,
            SCOP_VERSION_DELIM,
        ])));
    }

    #[test]
    fn test_decode_positions() {
        let script = script_of(&[
            SCOP_VERIFY,
            SCOP_WT_DELIM,
            SCOP_REJECT,
            SCOP_SC_DELIM,
            SCOP_IGNORE,
        ]);
        let decoded = decode_state_script(&script, &[2, 1]).unwrap();
        assert_eq!(
            decoded,
            vec![
                DecodedVote {
                    sidechain_index: 0,
                    bundle_index: 0,
                    vote: Vote::Verify,
                },
                DecodedVote {
                    sidechain_index: 0,
                    bundle_index: 1,
                    vote: Vote::Reject,
                },
                DecodedVote {
                    sidechain_index: 1,
                    bundle_index: 0,
                    vote: Vote::Ignore,
                },
            ]
        );
    }

    #[test]
    fn test_decode_skips_unknown_bytes() {
        let script = script_of(&[0x42, SCOP_VERIFY, 0x43]);
        let decoded = decode_state_script(&script, &[1]).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].vote, Vote::Verify);
    }

    #[test]
    fn test_decode_rejects_prefix_only_script() {
        let script = script_of(&[]);
        assert_eq!(
            decode_state_script(&script, &[1]),
            Err(StateScriptError::TooShort(3))
        );
    }

    #[test]
    fn test_decode_rejects_bundle_overflow() {
        // Second vote in a run of one.
        let script = script_of(&[SCOP_VERIFY, SCOP_WT_DELIM, SCOP_VERIFY]);
        assert_eq!(
            decode_state_script(&script, &[1, 1]),
            Err(StateScriptError::BundleIndexOutOfRange(0, 1))
        );
    }

    #[test]
    fn test_decode_rejects_vote_in_empty_run() {
        let script = script_of(&[SCOP_SC_DELIM, SCOP_VERIFY]);
        assert_eq!(
            decode_state_script(&script, &[1, 0]),
            Err(StateScriptError::BundleIndexOutOfRange(1, 0))
        );
    }

    #[test]
    fn test_decode_rejects_registry_overflow() {
        let script = script_of(&[SCOP_VERIFY, SCOP_SC_DELIM, SCOP_VERIFY]);
        assert_eq!(
            decode_state_script(&script, &[1]),
            Err(StateScriptError::SidechainIndexOutOfRange(1))
        );
    }

    #[test]
    fn test_round_trip() {
        let votes = vec![
            vec![Vote::Verify, Vote::Reject, Vote::Reject],
            vec![],
            vec![Vote::Ignore, Vote::Verify],
        ];
        let script = encode_state_script(&votes);
        let counts: Vec<usize> = votes.iter().map(Vec::len).collect();
        let decoded = decode_state_script(&script, &counts).unwrap();

        let mut rebuilt: Vec<Vec<Vote>> = counts.iter().map(|n| vec![Vote::Ignore; *n]).collect();
        for d in decoded {
            rebuilt[d.sidechain_index][d.bundle_index] = d.vote;
        }
        assert_eq!(encode_state_script(&rebuilt), script);
    }
}
