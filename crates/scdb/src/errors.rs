use drivechain_primitives::sidechain::UnknownSidechain;
use drivechain_script::error::StateScriptError;
use thiserror::Error;

/// Errors from database mutators.
///
/// State is left untouched whenever one of these is returned.
#[derive(Debug, Error)]
pub enum ScdbError {
    #[error(transparent)]
    UnknownSidechain(#[from] UnknownSidechain),

    #[error("withdrawal bundle cache full")]
    WithdrawalCacheFull,

    #[error("withdrawal bundle already cached")]
    DuplicateWithdrawal,

    #[error("withdrawal bundle not tracked")]
    UnknownWithdrawal,

    #[error("state script rejected: {0}")]
    StateScript(#[from] StateScriptError),
}
