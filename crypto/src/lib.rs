// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod hash;
mod signature;

pub use self::errors::*;
pub use self::hash::*;
pub use self::signature::*;
