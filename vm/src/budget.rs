// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use types::Currency;

/// Tracks value remaining for a running program. Withdrawals that would
/// overdraw fail before the requesting instruction executes.
#[derive(Debug, Clone)]
pub struct Budget {
    remaining: Currency,
}

impl Budget {
    pub fn new(amount: Currency) -> Self {
        Budget { remaining: amount }
    }

    /// Safely consumes budget and returns a budget-exceeded error if
    /// there is not enough remaining for the charge.
    pub fn withdraw(&mut self, cost: &Currency) -> Result<(), Error> {
        match self.remaining.checked_sub(cost) {
            Some(remaining) => {
                self.remaining = remaining;
                Ok(())
            }
            None => Err(Error::BudgetExceeded),
        }
    }

    pub fn remaining(&self) -> &Currency {
        &self.remaining
    }
}

/// Tracks how much collateral the host may still pledge for a program,
/// capped by what the renter declared.
#[derive(Debug, Clone)]
pub struct CollateralBudget {
    remaining: Currency,
}

impl CollateralBudget {
    pub fn new(amount: Currency) -> Self {
        CollateralBudget { remaining: amount }
    }

    pub fn withdraw(&mut self, collateral: &Currency) -> Result<(), Error> {
        match self.remaining.checked_sub(collateral) {
            Some(remaining) => {
                self.remaining = remaining;
                Ok(())
            }
            None => Err(Error::CollateralBudgetExceeded),
        }
    }

    pub fn remaining(&self) -> &Currency {
        &self.remaining
    }
}
