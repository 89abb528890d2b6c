//! Generic data types shared across the workspace: fixed-size byte buffers,
//! the native hash construction, and the static sidechain registry.

pub mod buf;
pub mod hash;
pub mod sidechain;
