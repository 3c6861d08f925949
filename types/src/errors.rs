// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Type-level error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("revision is missing its {0} output")]
    MissingOutput(&'static str),
    #[error("signature index {0} out of bounds")]
    SignatureIndex(usize),
    #[error("covered revision index {0} out of bounds")]
    CoveredFieldIndex(u64),
}
