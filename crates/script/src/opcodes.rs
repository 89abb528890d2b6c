//! Consensus byte values used inside coinbase state scripts.
//!
//! The state script is position sensitive and reproduced bit for bit by
//! every node, so all seven byte values live here and nowhere else. They
//! must stay pairwise distinct, and distinct from `OP_RETURN` (0x6a).

/// State script version identifier, the byte after `OP_RETURN`.
pub const SCOP_VERSION: u8 = 0x01;

/// Terminates the version prefix.
pub const SCOP_VERSION_DELIM: u8 = 0x00;

/// Upvote: the bundle's work score increments.
pub const SCOP_VERIFY: u8 = 0xd0;

/// Downvote: the bundle's work score decrements, floored at zero.
pub const SCOP_REJECT: u8 = 0xd1;

/// Abstain: the bundle's work score is left alone.
pub const SCOP_IGNORE: u8 = 0xd2;

/// Separates successive bundle votes within one sidechain's run.
pub const SCOP_WT_DELIM: u8 = 0xe0;

/// Separates successive sidechain runs.
pub const SCOP_SC_DELIM: u8 = 0xe1;
