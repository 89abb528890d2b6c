//! Everything that touches raw script bytes: the coinbase state-script codec,
//! deposit output recognition, and BMM linking data extraction.

pub mod bmm;
pub mod deposit;
pub mod error;
pub mod opcodes;
pub mod state_script;
pub mod util;
pub mod vote;
