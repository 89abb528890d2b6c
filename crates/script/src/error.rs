use thiserror::Error;

/// Errors raised while decoding a coinbase state script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateScriptError {
    #[error("state script too short ({0} bytes)")]
    TooShort(usize),

    #[error("missing state script version prefix")]
    BadPrefix,

    #[error("sidechain index {0} outside the registry")]
    SidechainIndexOutOfRange(usize),

    #[error("bundle index {1} out of range for sidechain run {0}")]
    BundleIndexOutOfRange(usize, usize),
}
