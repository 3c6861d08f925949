// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use types::{Currency, PriceTable, SECTOR_SIZE};

/// Dimensionless time weights per instruction kind.
pub const TIME_APPEND: u64 = 10_000;
pub const TIME_DROP_SECTORS: u64 = 1;
pub const TIME_SWAP_SECTOR: u64 = 1;
pub const TIME_READ_SECTOR: u64 = 1_000;
pub const TIME_HAS_SECTOR: u64 = 1;

/// Charged once when a program starts executing.
pub fn init_program_cost(pt: &PriceTable) -> Currency {
    pt.init_base_cost.clone()
}

/// Execution and storage cost of appending one full sector.
pub fn append_cost(pt: &PriceTable) -> (Currency, Currency) {
    let execution = pt.write_base_cost.clone() + &pt.write_length_cost * SECTOR_SIZE;
    let storage = &pt.store_length_cost * SECTOR_SIZE;
    (execution, storage)
}

/// Collateral pledged for one newly stored sector.
pub fn append_collateral(pt: &PriceTable) -> Currency {
    &pt.collateral_cost * SECTOR_SIZE
}

/// Memory held past the append instruction: the staged sector bytes.
pub fn append_memory() -> u64 {
    SECTOR_SIZE
}

pub fn drop_sectors_cost(pt: &PriceTable, num_sectors: u64) -> (Currency, Currency) {
    let execution = pt.drop_sectors_base_cost.clone() + &pt.drop_sectors_unit_cost * num_sectors;
    (execution, Currency::zero())
}

pub fn swap_sector_cost(pt: &PriceTable) -> (Currency, Currency) {
    (pt.swap_sector_base_cost.clone(), Currency::zero())
}

pub fn read_sector_cost(pt: &PriceTable, length: u64) -> (Currency, Currency) {
    let execution = pt.read_base_cost.clone() + &pt.read_length_cost * length;
    (execution, Currency::zero())
}

pub fn has_sector_cost(pt: &PriceTable) -> (Currency, Currency) {
    (pt.has_sector_base_cost.clone(), Currency::zero())
}

/// Cost of holding `memory` bytes for `time` units.
pub fn memory_time_cost(pt: &PriceTable, memory: u64, time: u64) -> Currency {
    &pt.memory_time_cost * memory * time
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PriceTable {
        PriceTable {
            write_base_cost: Currency::from(10u64),
            write_length_cost: Currency::from(1u64),
            store_length_cost: Currency::from(3u64),
            collateral_cost: Currency::from(2u64),
            read_base_cost: Currency::from(5u64),
            read_length_cost: Currency::from(1u64),
            ..Default::default()
        }
    }

    #[test]
    fn append_cost_scales_with_sector_size() {
        let pt = table();
        let (execution, storage) = append_cost(&pt);
        assert_eq!(storage, Currency::from(3 * SECTOR_SIZE));
        assert_eq!(execution, Currency::from(SECTOR_SIZE + 10));
        assert_eq!(append_collateral(&pt), Currency::from(2 * SECTOR_SIZE));
    }

    #[test]
    fn read_cost_scales_with_length() {
        let (execution, storage) = read_sector_cost(&table(), 100);
        assert_eq!(execution, Currency::from(105u64));
        assert!(storage.is_zero());
    }
}
