//! The sidechain state database.
//!
//! Withdrawal bundles are tracked as append-only sequences of verification
//! records, one per sidechain. Every connected block advances the database
//! exactly once through [`SidechainDb::update`]: sequences whose tau ends at
//! this height are cleared, the coinbase's state script (if exactly one well
//! formed candidate is present) is decoded and applied, linking data is
//! ingested, and the block hash is remembered. A coinbase that cannot be
//! interpreted unambiguously falls back to the default update, an abstain
//! vote for every bundle, so taus keep closing regardless.

use std::fmt;

use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160};
use bitcoin::script::Builder;
use bitcoin::{
    Amount, BlockHash, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use borsh::BorshSerialize;
use tracing::{debug, trace, warn};

use drivechain_primitives::buf::{Buf20, Buf32};
use drivechain_primitives::hash::Hash256Writer;
use drivechain_primitives::sidechain::{
    sidechain_number_valid, sidechain_params, Deposit, Sidechain, SidechainNumber,
    WithdrawalBundleState, SIDECHAIN_KEY_ID, SIDECHAIN_MAX_WT, VALID_SIDECHAINS,
};
use drivechain_script::bmm::extract_critical_hashes;
use drivechain_script::deposit::extract_deposits;
use drivechain_script::state_script::{
    decode_state_script, encode_state_script, is_state_script, DecodedVote,
};
use drivechain_script::vote::Vote;

use crate::bmm_cache::LinkingDataCache;
use crate::errors::ScdbError;
use crate::wallet::SidechainWallet;

/// State database for every registered sidechain.
///
/// A plain value owned by whatever drives block connection; queries return
/// copies, so nothing outside can mutate the tracked state.
#[derive(Clone, Debug)]
pub struct SidechainDb {
    /// Per-sidechain verification records, indexed by sidechain number.
    state: Vec<Vec<WithdrawalBundleState>>,

    /// Full transactions of cached withdrawal bundles.
    bundle_cache: Vec<Transaction>,

    /// Deposits discovered during the current tau of each sidechain.
    deposit_cache: Vec<Deposit>,

    /// Linking data found in recent coinbases.
    linking_data: LinkingDataCache,

    /// The most recent block this database has processed.
    last_block_seen: Option<BlockHash>,
}

impl Default for SidechainDb {
    fn default() -> Self {
        Self::new()
    }
}

impl SidechainDb {
    pub fn new() -> Self {
        Self {
            state: vec![Vec::new(); VALID_SIDECHAINS.len()],
            bundle_cache: Vec::new(),
            deposit_cache: Vec::new(),
            linking_data: LinkingDataCache::new(),
            last_block_seen: None,
        }
    }

    /// Advance the database for a newly connected block.
    ///
    /// Returns true when a unique well formed state script was decoded and
    /// applied, false when the default update ran instead.
    pub fn update(&mut self, height: i32, block_hash: BlockHash, coinbase: &Transaction) -> bool {
        // Close any tau ending at this height.
        for sidechain in &VALID_SIDECHAINS {
            if height > 0 && height % i32::from(sidechain.tau()) == 0 {
                self.clear_sidechain(sidechain.number);
            }
        }

        let applied = self.read_state_script(coinbase);

        for critical_hash in extract_critical_hashes(coinbase) {
            self.linking_data.insert(critical_hash, height);
        }

        self.last_block_seen = Some(block_hash);
        applied
    }

    /// Admit a new withdrawal bundle for a sidechain.
    ///
    /// The bundle starts at a zero work score with a full tau on the clock,
    /// and its transaction is kept for later materialization.
    pub fn add_withdrawal(
        &mut self,
        sidechain: SidechainNumber,
        tx: &Transaction,
    ) -> Result<(), ScdbError> {
        let params = sidechain_params(sidechain)?;
        if self.bundle_cache.len() >= SIDECHAIN_MAX_WT {
            return Err(ScdbError::WithdrawalCacheFull);
        }
        let wtxid = tx.compute_txid();
        if self.have_withdrawal_cached(&wtxid) {
            return Err(ScdbError::DuplicateWithdrawal);
        }

        self.push_record(sidechain, params.tau(), 0, wtxid)?;
        self.bundle_cache.push(tx.clone());
        Ok(())
    }

    /// Append a raw verification record for a withdrawal bundle.
    pub fn push_record(
        &mut self,
        sidechain: SidechainNumber,
        blocks_left: u16,
        work_score: u16,
        wtxid: Txid,
    ) -> Result<(), ScdbError> {
        sidechain_params(sidechain)?;
        self.state[sidechain as usize].push(WithdrawalBundleState {
            sidechain,
            blocks_left,
            work_score,
            wtxid,
        });
        Ok(())
    }

    /// Apply one vote to a tracked bundle, appending the derived record.
    ///
    /// The new record is computed from the bundle's most recently appended
    /// record; the work score saturates at `u16::MAX` and floors at zero,
    /// as does the remaining block count. Returns the appended record.
    pub fn apply_vote(
        &mut self,
        sidechain: SidechainNumber,
        wtxid: &Txid,
        vote: Vote,
    ) -> Result<WithdrawalBundleState, ScdbError> {
        sidechain_params(sidechain)?;
        let old = self
            .state[sidechain as usize]
            .iter()
            .rev()
            .find(|r| &r.wtxid == wtxid)
            .copied()
            .ok_or(ScdbError::UnknownWithdrawal)?;

        let record = advance_record(&old, vote);
        self.state[sidechain as usize].push(record);
        Ok(record)
    }

    /// Collect every deposit carried by the supplied block transactions.
    ///
    /// Already-cached deposits are skipped, so replaying a block is
    /// harmless.
    pub fn add_deposits(&mut self, txs: &[Transaction]) {
        for deposit in extract_deposits(txs) {
            if !self.have_deposit_cached(&deposit) {
                self.deposit_cache.push(deposit);
            }
        }
    }

    pub fn have_deposit_cached(&self, deposit: &Deposit) -> bool {
        self.deposit_cache.contains(deposit)
    }

    pub fn have_withdrawal_cached(&self, wtxid: &Txid) -> bool {
        self.bundle_cache.iter().any(|tx| tx.compute_txid() == *wtxid)
    }

    /// Latest verification per bundle for a sidechain, in first-seen order.
    ///
    /// The append-only sequence collapses to one record per bundle: the one
    /// with the highest work score, earlier records winning ties.
    pub fn get_state(&self, sidechain: SidechainNumber) -> Vec<WithdrawalBundleState> {
        if !sidechain_number_valid(sidechain) {
            return Vec::new();
        }

        let mut collapsed: Vec<WithdrawalBundleState> = Vec::new();
        for record in &self.state[sidechain as usize] {
            match collapsed.iter_mut().find(|c| c.wtxid == record.wtxid) {
                Some(best) => {
                    if record.work_score > best.work_score {
                        *best = *record;
                    }
                }
                None => collapsed.push(*record),
            }
        }
        collapsed
    }

    /// Deposits seen this tau for a sidechain.
    pub fn get_deposits(&self, sidechain: SidechainNumber) -> Vec<Deposit> {
        self.deposit_cache
            .iter()
            .filter(|d| d.sidechain == sidechain)
            .cloned()
            .collect()
    }

    /// The best scoring bundle for a sidechain this tau, if any.
    ///
    /// Ties go to the bundle that entered the database first.
    pub fn best_withdrawal(&self, sidechain: SidechainNumber) -> Option<WithdrawalBundleState> {
        let collapsed = self.get_state(sidechain);
        best_index(&collapsed).map(|i| collapsed[i])
    }

    /// Whether a bundle has accumulated enough support to be paid out.
    pub fn check_work_score(&self, sidechain: SidechainNumber, wtxid: &Txid) -> bool {
        let Ok(params) = sidechain_params(sidechain) else {
            return false;
        };
        self.get_state(sidechain)
            .iter()
            .find(|s| &s.wtxid == wtxid)
            .map(|s| s.work_score >= params.min_work_score)
            .unwrap_or(false)
    }

    /// Build the state script the next block's coinbase should embed.
    ///
    /// Upvotes the best scoring bundle of each sidechain during its
    /// verification period, downvotes the rest, and abstains wholesale
    /// during the wait period. An empty database produces an empty script.
    pub fn create_state_script(&self, height: i32) -> ScriptBuf {
        if !self.has_state() {
            return ScriptBuf::new();
        }

        let mut votes: Vec<Vec<Vote>> = Vec::with_capacity(VALID_SIDECHAINS.len());
        for sidechain in &VALID_SIDECHAINS {
            let collapsed = self.get_state(sidechain.number);
            let in_wait_period =
                height - last_tau_height(sidechain, height) < i32::from(sidechain.wait_period);
            let winner = best_index(&collapsed);

            let run = collapsed
                .iter()
                .enumerate()
                .map(|(y, _)| {
                    if in_wait_period {
                        Vote::Ignore
                    } else if winner == Some(y) {
                        Vote::Verify
                    } else {
                        Vote::Reject
                    }
                })
                .collect();
            votes.push(run);
        }
        encode_state_script(&votes)
    }

    /// Assemble the withdrawal transaction paying out a sidechain's
    /// verified best bundle.
    ///
    /// Only possible on a tau boundary, and only when the best bundle has
    /// met the sidechain's work score threshold. The wallet supplies the
    /// sidechain coins spent as inputs and signs the first of them; change
    /// returns to the sidechain script as the last output.
    pub fn get_withdrawal_tx<W: SidechainWallet>(
        &self,
        sidechain: SidechainNumber,
        height: i32,
        wallet: &W,
    ) -> Option<Transaction> {
        if !self.has_state() {
            return None;
        }
        let params = sidechain_params(sidechain).ok()?;
        if height % i32::from(params.tau()) != 0 {
            return None;
        }

        let best = self.best_withdrawal(sidechain)?;
        if best.work_score < params.min_work_score {
            return None;
        }
        let bundle = self
            .bundle_cache
            .iter()
            .find(|tx| tx.compute_txid() == best.wtxid)?;
        if bundle.output.is_empty() {
            return None;
        }

        let sidechain_script = sidechain_script(&Buf20::from(SIDECHAIN_KEY_ID));

        let mut tx = Transaction {
            version: bitcoin::transaction::Version::TWO,
            lock_time: bitcoin::absolute::LockTime::ZERO,
            input: Vec::new(),
            output: bundle.output.clone(),
        };

        // Amount leaving the sidechain: everything not paying back to the
        // sidechain script.
        let withdrawn: u64 = tx
            .output
            .iter()
            .filter(|out| out.script_pubkey != sidechain_script)
            .map(|out| out.value.to_sat())
            .sum();

        let coins = wallet.available_sidechain_coins(sidechain);
        if coins.is_empty() {
            return None;
        }

        let mut available: u64 = 0;
        for coin in &coins {
            tx.input.push(TxIn {
                previous_output: coin.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            });
            available += coin.txout.value.to_sat();
        }

        // Change returns to the sidechain as the last output.
        let change = available.checked_sub(withdrawn)?;
        tx.output.push(TxOut {
            value: Amount::from_sat(change),
            script_pubkey: sidechain_script.clone(),
        });

        let signature = wallet.sign_withdrawal_input(
            &tx,
            0,
            &sidechain_script,
            Amount::from_sat(change),
        )?;
        tx.input[0].script_sig = signature;

        Some(tx)
    }

    /// Hash committing to the last appended record of each tracked
    /// sidechain, in registry order. Sidechains with no records contribute
    /// nothing.
    pub fn scdb_hash(&self) -> Buf32 {
        let mut writer = Hash256Writer::new();
        for records in &self.state {
            if let Some(last) = records.last() {
                last.serialize(&mut writer).expect("scdb: hash serialization");
            }
        }
        writer.finalize()
    }

    /// Copy of the linking data cache as `(critical hash, height)` pairs.
    pub fn linking_data(&self) -> Vec<(Buf32, i32)> {
        self.linking_data.to_vec()
    }

    /// Hash of the last block fed through [`SidechainDb::update`].
    pub fn last_block_seen(&self) -> Option<BlockHash> {
        self.last_block_seen
    }

    fn has_state(&self) -> bool {
        self.state.iter().any(|records| !records.is_empty())
    }

    /// Discard everything a sidechain accumulated during its ending tau.
    fn clear_sidechain(&mut self, sidechain: SidechainNumber) {
        debug!(sidechain = %sidechain, "scdb: clearing state at tau boundary");
        self.state[sidechain as usize].clear();
        self.deposit_cache.retain(|d| d.sidechain != sidechain);

        // Drop cached bundle transactions nothing references anymore.
        let state = &self.state;
        self.bundle_cache.retain(|tx| {
            let wtxid = tx.compute_txid();
            state.iter().flatten().any(|r| r.wtxid == wtxid)
        });
    }

    /// Find and apply the coinbase's state script.
    ///
    /// Anything other than exactly one well formed candidate falls back to
    /// the default update.
    fn read_state_script(&mut self, coinbase: &Transaction) -> bool {
        let mut candidates = coinbase
            .output
            .iter()
            .map(|out| &out.script_pubkey)
            .filter(|script| is_state_script(script));
        let first = candidates.next();
        let extra = candidates.next();

        let script = match (first, extra) {
            (Some(script), None) => script,
            (None, None) => {
                trace!("scdb: no state script in coinbase, applying default update");
                return self.apply_default_update();
            }
            _ => {
                warn!("scdb: multiple state scripts in coinbase, applying default update");
                return self.apply_default_update();
            }
        };

        let snapshot: Vec<Vec<WithdrawalBundleState>> = VALID_SIDECHAINS
            .iter()
            .map(|s| self.get_state(s.number))
            .collect();
        let counts: Vec<usize> = snapshot.iter().map(Vec::len).collect();

        // A successful decode is checked against the snapshot in full, so
        // application cannot fail halfway through.
        match decode_state_script(script, &counts) {
            Ok(votes) => {
                self.apply_votes(&votes, &snapshot);
                true
            }
            Err(err) => {
                warn!(%err, "scdb: rejecting state script, applying default update");
                self.apply_default_update()
            }
        }
    }

    fn apply_votes(&mut self, votes: &[DecodedVote], snapshot: &[Vec<WithdrawalBundleState>]) {
        for vote in votes {
            let old = &snapshot[vote.sidechain_index][vote.bundle_index];
            let record = advance_record(old, vote.vote);
            self.state[old.sidechain as usize].push(record);
        }
    }

    /// Abstain on every bundle so the block still counts against each tau.
    fn apply_default_update(&mut self) -> bool {
        for sidechain in &VALID_SIDECHAINS {
            for record in self.get_state(sidechain.number) {
                let next = advance_record(&record, Vote::Ignore);
                self.state[sidechain.number as usize].push(next);
            }
        }
        false
    }
}

impl fmt::Display for SidechainDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SidechainDb:")?;
        for sidechain in &VALID_SIDECHAINS {
            writeln!(f, "sidechain: {}", sidechain.name)?;
            for record in self.get_state(sidechain.number) {
                writeln!(
                    f,
                    "  bundle: {} work score: {}/{} blocks left: {}",
                    record.wtxid, record.work_score, sidechain.min_work_score, record.blocks_left
                )?;
            }
        }
        Ok(())
    }
}

/// Canonical pay-to-pubkey-hash script holding a sidechain's funds on the
/// main chain.
pub fn sidechain_script(key_id: &Buf20) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(key_id.0)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// Derive the record one vote produces from its predecessor.
fn advance_record(old: &WithdrawalBundleState, vote: Vote) -> WithdrawalBundleState {
    let work_score = match vote {
        Vote::Verify => old.work_score.saturating_add(1),
        Vote::Reject => old.work_score.saturating_sub(1),
        Vote::Ignore => old.work_score,
    };
    WithdrawalBundleState {
        blocks_left: old.blocks_left.saturating_sub(1),
        work_score,
        ..*old
    }
}

/// Position of the best scoring bundle; earlier entries win ties.
fn best_index(collapsed: &[WithdrawalBundleState]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, record) in collapsed.iter().enumerate() {
        match best {
            Some(b) if collapsed[b].work_score >= record.work_score => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Height at which the sidechain's current tau began.
fn last_tau_height(sidechain: &Sidechain, height: i32) -> i32 {
    let tau = i32::from(sidechain.tau());
    height - height.rem_euclid(tau)
}
