// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod error;
mod proof;
mod tree;

pub use self::error::*;
pub use self::proof::*;
pub use self::tree::*;

/// Size of a tree leaf inside a sector. Sector roots are Merkle roots
/// over segments of this size.
pub const SEGMENT_SIZE: usize = 64;
