// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;
use types::ContractId;

/// Why a withdrawal from an ephemeral account was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawError {
    #[error("withdrawal message has expired")]
    Expired,
    #[error("withdrawal expiry is too far in the future")]
    ExtremeFuture,
    #[error("withdrawal signature is invalid")]
    BadSignature,
    #[error("withdrawal message was already spent")]
    Replay,
    #[error("account balance is insufficient")]
    InsufficientBalance,
}

/// Why a proposed payment revision was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevisionError {
    #[error("contract has expired")]
    ContractExpired,
    #[error("bad revision number: {new} does not supersede {current}")]
    BadRevisionNumber { current: u64, new: u64 },
    #[error("revision output counts do not match")]
    OutputCountMismatch,
    #[error("revision changed a payout recipient")]
    RecipientChanged,
    #[error("revision changed the contract's data fields")]
    DataFieldsChanged,
    #[error("renter valid payout did not decrease")]
    RenterNotDebited,
    #[error("host valid payout was not credited the renter's debit")]
    HostNotCredited,
    #[error("payment of {actual} is less than the required {expected}")]
    InsufficientPayment { expected: String, actual: String },
    #[error("host missed payout did not decrease by the collateral moved")]
    CollateralMismatch,
    #[error("revision changed the missed renter payout")]
    MissedRenterChanged,
    #[error("revision underflows a payout")]
    PayoutUnderflow,
    #[error("revision is missing an output: {0}")]
    MissingOutput(String),
}

impl From<types::Error> for RevisionError {
    fn from(e: types::Error) -> Self {
        RevisionError::MissingOutput(e.to_string())
    }
}

/// Host error
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] encoding::Error),
    #[error("unknown payment method {0}")]
    UnknownPaymentMethod(u8),
    #[error("withdraw failed: {0}")]
    Withdraw(#[from] WithdrawError),
    #[error("invalid payment revision: {0}")]
    BadRevision(#[from] RevisionError),
    #[error("no storage obligation for contract {0}")]
    UnknownContract(ContractId),
    #[error("obligation has no revision transaction")]
    NoRevision,
    #[error("unknown or expired price table {0}")]
    UnknownPriceTable(types::PriceTableUid),
    #[error("renter signature invalid: {0}")]
    BadRenterSignature(crypto::Error),
    #[error("program error: {0}")]
    Program(#[from] vm::Error),
    #[error("mutating program needs a file contract")]
    ProgramNeedsContract,
    #[error("mutating program carried no commit revision")]
    MissingCommitRevision,
    #[error("program request names contract {request}, payment was for {payment}")]
    ContractMismatch {
        payment: ContractId,
        request: ContractId,
    },
    #[error("sector store failure: {0}")]
    SectorStore(String),
    #[error("peer reported error: {0}")]
    Remote(String),
    #[error("exchange timed out")]
    Timeout,
    #[error("{0}")]
    Types(#[from] types::Error),
}

impl From<db::Error> for Error {
    fn from(e: db::Error) -> Self {
        Error::SectorStore(e.to_string())
    }
}
