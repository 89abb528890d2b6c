//! The vote cast per withdrawal bundle per block.

use arbitrary::Arbitrary;

use crate::opcodes::{SCOP_IGNORE, SCOP_REJECT, SCOP_VERIFY};

/// A single vote applied to one withdrawal bundle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Arbitrary)]
pub enum Vote {
    /// Count the bundle as more verified.
    Verify,
    /// Count the bundle as less verified.
    Reject,
    /// Leave the bundle's score alone.
    Ignore,
}

impl Vote {
    /// The wire byte emitted into a state script.
    pub fn to_byte(self) -> u8 {
        match self {
            Vote::Verify => SCOP_VERIFY,
            Vote::Reject => SCOP_REJECT,
            Vote::Ignore => SCOP_IGNORE,
        }
    }

    /// Parse a wire byte. Unrecognized bytes are not votes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SCOP_VERIFY => Some(Vote::Verify),
            SCOP_REJECT => Some(Vote::Reject),
            SCOP_IGNORE => Some(Vote::Ignore),
            _ => None,
        }
    }
}
