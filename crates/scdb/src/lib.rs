//! The sidechain state database: tracks withdrawal bundle proposals per
//! registered sidechain, scores them with the votes found in coinbase state
//! scripts, and emits the state script the next block should embed.

pub mod bmm_cache;
pub mod coinbase_cache;
pub mod errors;
pub mod scdb;
pub mod wallet;

pub use scdb::SidechainDb;
