// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use crypto::Hash256;
use encoding::{Decodable, Encodable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use types::SECTOR_SIZE;

/// Raw size of an encoded skylink.
pub const SKYLINK_SIZE: usize = 34;

const VERSION_BITS: u16 = 0b11;
const TIER_SHIFT: u16 = 2;
const TIER_BITS: u16 = 0b1111;
const OFFSET_SHIFT: u16 = 6;
const OFFSET_BITS: u16 = 0b111;
const LENGTH_SHIFT: u16 = 9;
const LENGTH_BITS: u16 = 0b111_1111;

const MAX_TIER: u16 = 16;
const OFFSET_SLOTS: u64 = 8;
const LENGTH_SLOTS: u64 = 128;

/// Smallest addressable length on a tier.
fn length_unit(tier: u16) -> u64 {
    4096 << tier
}

/// Offset alignment on a tier. Coarser as lengths grow, so 34 bytes can
/// address any fetchable span of a sector.
fn offset_align(tier: u16) -> u64 {
    length_unit(tier) * OFFSET_SLOTS
}

/// A compact content identifier: a 2-byte bitfield carrying the version
/// and a coarse (offset, length) pair, followed by the Merkle root of
/// the base sector. Renders as 46 characters of base64url.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Skylink {
    bitfield: u16,
    merkle_root: Hash256,
}

impl Skylink {
    /// Builds a v1 skylink over the given span of the base sector. The
    /// length is rounded up to the tier grid; the offset must already
    /// sit on it.
    pub fn new_v1(merkle_root: Hash256, offset: u64, length: u64) -> Result<Self, Error> {
        if length == 0 || offset + length > SECTOR_SIZE {
            return Err(Error::InvalidOffsetLength { offset, length });
        }
        for tier in 0..MAX_TIER {
            let unit = length_unit(tier);
            let align = offset_align(tier);
            if length > unit * LENGTH_SLOTS {
                continue;
            }
            if offset % align != 0 || offset / align >= OFFSET_SLOTS {
                continue;
            }
            let length_index = (length + unit - 1) / unit - 1;
            if offset + (length_index + 1) * unit > SECTOR_SIZE {
                continue;
            }
            let bitfield = (tier << TIER_SHIFT)
                | (((offset / align) as u16) << OFFSET_SHIFT)
                | ((length_index as u16) << LENGTH_SHIFT);
            return Ok(Skylink {
                bitfield,
                merkle_root,
            });
        }
        Err(Error::InvalidOffsetLength { offset, length })
    }

    pub fn version(&self) -> u8 {
        (self.bitfield & VERSION_BITS) as u8 + 1
    }

    pub fn merkle_root(&self) -> Hash256 {
        self.merkle_root
    }

    fn tier(&self) -> u16 {
        (self.bitfield >> TIER_SHIFT) & TIER_BITS
    }

    /// The span of the base sector this link addresses.
    pub fn offset_and_fetch_size(&self) -> (u64, u64) {
        let tier = self.tier();
        let offset = ((self.bitfield >> OFFSET_SHIFT) & OFFSET_BITS) as u64 * offset_align(tier);
        let length =
            (((self.bitfield >> LENGTH_SHIFT) & LENGTH_BITS) as u64 + 1) * length_unit(tier);
        (offset, length)
    }

    pub fn to_bytes(&self) -> [u8; SKYLINK_SIZE] {
        let mut bytes = [0u8; SKYLINK_SIZE];
        bytes[..2].copy_from_slice(&self.bitfield.to_le_bytes());
        bytes[2..].copy_from_slice(self.merkle_root.as_ref());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SKYLINK_SIZE {
            return Err(Error::InvalidSkylink(format!(
                "expected {} bytes, got {}",
                SKYLINK_SIZE,
                bytes.len()
            )));
        }
        let bitfield = u16::from_le_bytes([bytes[0], bytes[1]]);
        let merkle_root = Hash256::try_from(&bytes[2..])
            .map_err(|e| Error::InvalidSkylink(e.to_string()))?;
        let link = Skylink {
            bitfield,
            merkle_root,
        };
        if link.version() != 1 {
            return Err(Error::BadVersion(link.version()));
        }
        let (offset, length) = link.offset_and_fetch_size();
        if offset + length > SECTOR_SIZE {
            return Err(Error::InvalidOffsetLength { offset, length });
        }
        Ok(link)
    }
}

impl fmt::Display for Skylink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            base64::encode_config(self.to_bytes(), base64::URL_SAFE_NO_PAD)
        )
    }
}

impl FromStr for Skylink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = base64::decode_config(s, base64::URL_SAFE_NO_PAD)
            .map_err(|e| Error::InvalidSkylink(e.to_string()))?;
        Skylink::from_bytes(&bytes)
    }
}

impl Serialize for Skylink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Skylink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Skylink::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Encodable for Skylink {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.to_bytes().encode(w)
    }
}

impl Decodable for Skylink {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        let bytes = <[u8; SKYLINK_SIZE]>::decode(r)?;
        Skylink::from_bytes(&bytes).map_err(|e| encoding::Error::InvalidValue(e.to_string()))
    }
}
