// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod codec;
mod errors;

pub use self::codec::*;
pub use self::errors::*;
