//! Wallet surface the database needs when materializing a withdrawal.

use bitcoin::{Amount, OutPoint, Script, ScriptBuf, Transaction, TxOut};

use drivechain_primitives::sidechain::SidechainNumber;

/// A spendable sidechain UTXO supplied by the wallet.
#[derive(Clone, Debug)]
pub struct SidechainCoin {
    pub outpoint: OutPoint,
    pub txout: TxOut,
}

/// Host wallet integration points.
///
/// UTXO selection and signing stay with the wallet; the database only
/// assembles the transaction around them.
pub trait SidechainWallet {
    /// Every coin currently spendable under the sidechain's script.
    fn available_sidechain_coins(&self, sidechain: SidechainNumber) -> Vec<SidechainCoin>;

    /// Produce a signature script for `input_index` of `tx`, spending
    /// `value` locked under `script_pubkey`. `None` if the wallet cannot
    /// sign.
    fn sign_withdrawal_input(
        &self,
        tx: &Transaction,
        input_index: usize,
        script_pubkey: &Script,
        value: Amount,
    ) -> Option<ScriptBuf>;
}
