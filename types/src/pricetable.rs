// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Currency;
use encoding::{Decodable, Encodable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

/// Identifier of a negotiated price table.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PriceTableUid(pub [u8; 16]);

impl fmt::Display for PriceTableUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Encodable for PriceTableUid {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.0.encode(w)
    }
}

impl Decodable for PriceTableUid {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PriceTableUid(<[u8; 16]>::decode(r)?))
    }
}

/// The schedule of prices a program is metered against. Hosts hand a
/// table to the renter ahead of time; the program quotes its uid and the
/// host refuses tables it no longer honors.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTable {
    pub uid: PriceTableUid,
    /// Block height after which the table is no longer honored.
    pub expiry: u64,
    pub init_base_cost: Currency,
    pub read_base_cost: Currency,
    pub read_length_cost: Currency,
    pub write_base_cost: Currency,
    pub write_length_cost: Currency,
    /// Ongoing storage cost per newly written byte.
    pub store_length_cost: Currency,
    pub drop_sectors_base_cost: Currency,
    pub drop_sectors_unit_cost: Currency,
    pub swap_sector_base_cost: Currency,
    pub has_sector_base_cost: Currency,
    /// Cost of one byte of memory held for one unit of instruction time.
    pub memory_time_cost: Currency,
    /// Collateral pledged per byte of newly stored data.
    pub collateral_cost: Currency,
}

impl Encodable for PriceTable {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.uid.encode(w)?;
        self.expiry.encode(w)?;
        self.init_base_cost.encode(w)?;
        self.read_base_cost.encode(w)?;
        self.read_length_cost.encode(w)?;
        self.write_base_cost.encode(w)?;
        self.write_length_cost.encode(w)?;
        self.store_length_cost.encode(w)?;
        self.drop_sectors_base_cost.encode(w)?;
        self.drop_sectors_unit_cost.encode(w)?;
        self.swap_sector_base_cost.encode(w)?;
        self.has_sector_base_cost.encode(w)?;
        self.memory_time_cost.encode(w)?;
        self.collateral_cost.encode(w)
    }
}

impl Decodable for PriceTable {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PriceTable {
            uid: PriceTableUid::decode(r)?,
            expiry: u64::decode(r)?,
            init_base_cost: Currency::decode(r)?,
            read_base_cost: Currency::decode(r)?,
            read_length_cost: Currency::decode(r)?,
            write_base_cost: Currency::decode(r)?,
            write_length_cost: Currency::decode(r)?,
            store_length_cost: Currency::decode(r)?,
            drop_sectors_base_cost: Currency::decode(r)?,
            drop_sectors_unit_cost: Currency::decode(r)?,
            swap_sector_base_cost: Currency::decode(r)?,
            has_sector_base_cost: Currency::decode(r)?,
            memory_time_cost: Currency::decode(r)?,
            collateral_cost: Currency::decode(r)?,
        })
    }
}
