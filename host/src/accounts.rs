// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::WithdrawError;
use crypto::{Hash256, Signature};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use types::{AccountId, Currency, WithdrawalMessage};

/// How far past the current height a withdrawal expiry may reach. The
/// window bounds how long fingerprints must be retained for replay
/// protection.
pub const ACCOUNT_EXPIRY_LOOKAHEAD: u64 = 144;

#[derive(Default)]
struct Account {
    balance: Currency,
    /// Spent withdrawal fingerprints, mapped to their expiry height.
    fingerprints: HashMap<Hash256, u64>,
}

/// Prepaid balances keyed by client public key. Withdrawals are atomic
/// against the balance and guarded by a bounded replay window; deposits
/// arrive out of band (contract payments routed to an account).
#[derive(Default)]
pub struct AccountManager {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

impl AccountManager {
    pub fn new() -> Self {
        AccountManager::default()
    }

    pub fn deposit(&self, id: AccountId, amount: Currency) {
        let mut accounts = self.accounts.lock();
        let account = accounts.entry(id).or_default();
        account.balance += amount;
        debug!("deposit to {}: balance now {}", id, account.balance);
    }

    pub fn balance(&self, id: &AccountId) -> Currency {
        self.accounts
            .lock()
            .get(id)
            .map(|a| a.balance.clone())
            .unwrap_or_else(Currency::zero)
    }

    /// Validates and applies a signed withdrawal. The same message can
    /// never debit twice: its fingerprint is retained until expiry.
    pub fn withdraw(
        &self,
        message: &WithdrawalMessage,
        signature: &Signature,
        priority: i64,
        block_height: u64,
    ) -> Result<(), WithdrawError> {
        if message.expiry <= block_height {
            return Err(WithdrawError::Expired);
        }
        if message.expiry > block_height + ACCOUNT_EXPIRY_LOOKAHEAD {
            return Err(WithdrawError::ExtremeFuture);
        }

        let fingerprint = message.sig_hash();
        message
            .account
            .public_key()
            .verify(&fingerprint, signature)
            .map_err(|_| WithdrawError::BadSignature)?;

        let mut accounts = self.accounts.lock();
        let account = accounts.entry(message.account).or_default();
        if account.fingerprints.contains_key(&fingerprint) {
            warn!("replayed withdrawal on account {}", message.account);
            return Err(WithdrawError::Replay);
        }
        let balance = account
            .balance
            .checked_sub(&message.amount)
            .ok_or(WithdrawError::InsufficientBalance)?;
        account.balance = balance;
        account.fingerprints.insert(fingerprint, message.expiry);
        debug!(
            "withdrew {} from {} (priority {}), balance now {}",
            message.amount, message.account, priority, account.balance
        );
        Ok(())
    }

    /// Drops fingerprints whose messages can no longer be replayed.
    pub fn prune(&self, block_height: u64) {
        let mut accounts = self.accounts.lock();
        for account in accounts.values_mut() {
            account
                .fingerprints
                .retain(|_, expiry| *expiry > block_height);
        }
    }
}
