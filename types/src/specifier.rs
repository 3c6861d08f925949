// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use encoding::{Decodable, Encodable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

/// A 16-byte, NUL-padded ASCII tag. Instruction kinds and cipher types
/// are identified by specifiers on the wire.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specifier(pub [u8; 16]);

impl Specifier {
    pub const fn new(name: &str) -> Self {
        let bytes = name.as_bytes();
        assert!(bytes.len() <= 16, "specifier name too long");
        let mut buf = [0u8; 16];
        let mut i = 0;
        while i < bytes.len() {
            buf[i] = bytes[i];
            i += 1;
        }
        Specifier(buf)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(16);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..end]))
    }
}

impl fmt::Debug for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Specifier({})", self)
    }
}

impl Encodable for Specifier {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.0.encode(w)
    }
}

impl Decodable for Specifier {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(Specifier(<[u8; 16]>::decode(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_padding() {
        assert_eq!(Specifier::new("Append").to_string(), "Append");
    }

    #[test]
    fn distinct_names_distinct_tags() {
        assert_ne!(Specifier::new("Append"), Specifier::new("HasSector"));
    }
}
