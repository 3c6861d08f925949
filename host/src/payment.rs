// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::rpc::{
    self, PayByContractRequest, PayByContractResponse, PayByEphemeralAccountRequest,
    PayByEphemeralAccountResponse, PaymentRequest, PAY_BY_CONTRACT, PAY_BY_EPHEMERAL_ACCOUNT,
};
use super::{
    create_revision_signature, revision_from_request, signature_from_request, verify_payment_revision,
};
use super::{Error, Host, StorageObligation};
use crypto::{Hash256, Signature};
use db::Store;
use futures::io::{AsyncRead, AsyncWrite};
use log::{info, warn};
use types::{AccountId, Currency};

/// What a processed payment authorized: who paid (for ephemeral
/// accounts), how much value moved to the host, and how much collateral
/// moved into the void output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub account: Option<AccountId>,
    pub amount: Currency,
    pub collateral: Currency,
}

impl<DB> Host<DB>
where
    DB: Store + Send + Sync + 'static,
{
    /// Reads a payment request from the stream and processes it against
    /// either a file contract or an ephemeral account. The reply (or an
    /// error reply) is written before returning.
    pub async fn process_payment<R, W>(&self, r: &mut R, w: &mut W) -> Result<PaymentDetails, Error>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let request: PaymentRequest = rpc::read_message(r).await?;
        match request.kind {
            PAY_BY_EPHEMERAL_ACCOUNT => self.pay_by_ephemeral_account(r, w).await,
            PAY_BY_CONTRACT => {
                let request: PayByContractRequest = rpc::read_message(r).await?;
                let entry = self.obligations().get(&request.contract_id)?;
                let mut so = entry.lock().await;
                let result = self.pay_by_contract(&mut so, &request, None);
                self.respond_contract_payment(w, result).await
            }
            kind => {
                let err = Error::UnknownPaymentMethod(kind);
                rpc::write_error(w, &err).await?;
                Err(err)
            }
        }
    }

    /// Ephemeral-account leg: validate the signed withdrawal and debit
    /// the account. Ephemeral payments never move collateral.
    pub(crate) async fn pay_by_ephemeral_account<R, W>(
        &self,
        r: &mut R,
        w: &mut W,
    ) -> Result<PaymentDetails, Error>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let request: PayByEphemeralAccountRequest = rpc::read_message(r).await?;
        let withdrawal = self.accounts().withdraw(
            &request.message,
            &request.signature,
            request.priority,
            self.block_height(),
        );
        if let Err(err) = withdrawal {
            warn!("rejected withdrawal from {}: {}", request.message.account, err);
            let err = Error::Withdraw(err);
            rpc::write_error(w, &err).await?;
            return Err(err);
        }

        rpc::write_response(
            w,
            &PayByEphemeralAccountResponse {
                amount: request.message.amount.clone(),
            },
        )
        .await?;
        info!(
            "accepted ephemeral payment of {} from {}",
            request.message.amount, request.message.account
        );
        Ok(PaymentDetails {
            account: Some(request.message.account),
            amount: request.message.amount,
            collateral: Currency::zero(),
        })
    }

    /// Builds and fully verifies the co-signed payment transaction for a
    /// contract payment, without persisting anything. The caller holds
    /// the obligation lock. `post_state` carries the committed
    /// (filesize, root) when a program commit rides on this payment.
    pub(crate) fn build_payment_transaction(
        &self,
        so: &StorageObligation,
        request: &PayByContractRequest,
        post_state: Option<(u64, Hash256)>,
    ) -> Result<(PaymentDetails, types::Transaction), Error> {
        let current = so.recent_revision()?.clone();

        let mut payment = revision_from_request(&current, request);
        if let Some((size, root)) = post_state {
            payment.filesize = size;
            payment.file_merkle_root = root;
        }

        let (amount, collateral) = verify_payment_revision(
            &current,
            &payment,
            self.block_height(),
            &Currency::zero(),
            post_state,
        )?;

        let renter_signature = signature_from_request(&current, request);
        let txn = create_revision_signature(payment, renter_signature, self.secret_key())?;
        Ok((
            PaymentDetails {
                account: None,
                amount,
                collateral,
            },
            txn,
        ))
    }

    /// Contract leg: build the payment revision, verify it, co-sign and
    /// persist it. The caller holds the obligation lock.
    pub(crate) fn pay_by_contract(
        &self,
        so: &mut StorageObligation,
        request: &PayByContractRequest,
        post_state: Option<(u64, Hash256)>,
    ) -> Result<(PaymentDetails, Signature), Error> {
        let (details, txn) = self.build_payment_transaction(so, request, post_state)?;
        let host_signature = txn
            .host_signature()
            .map(|s| s.signature)
            .ok_or(Error::NoRevision)?;
        so.apply_revision(txn);

        info!(
            "accepted contract payment on {}: amount {}, collateral {}",
            so.contract_id(),
            details.amount,
            details.collateral
        );
        Ok((details, host_signature))
    }

    /// Writes the contract-payment reply (host signature or error).
    pub(crate) async fn respond_contract_payment<W>(
        &self,
        w: &mut W,
        result: Result<(PaymentDetails, Signature), Error>,
    ) -> Result<PaymentDetails, Error>
    where
        W: AsyncWrite + Unpin,
    {
        match result {
            Ok((details, host_signature)) => {
                rpc::write_response(w, &PayByContractResponse { host_signature }).await?;
                Ok(details)
            }
            Err(err) => {
                warn!("rejected contract payment: {}", err);
                rpc::write_error(w, &err).await?;
                Err(err)
            }
        }
    }
}
