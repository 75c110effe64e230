//! Agent cash and inventory accounts.
//!
//! Accounts are mutated only by the market context on trade settlement and
//! fee charges; everything else reads them.

use serde::{Deserialize, Serialize};
use types::{Cash, Price};

/// Cash and inventory for a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentAccount {
    /// Cash balance (may go negative; there is no margin model here).
    pub cash: Cash,
    /// Net position in shares (negative = short).
    pub inventory: i64,
}

impl AgentAccount {
    /// Mark the account to market at the given valuation price.
    pub fn value_at(&self, price: Price) -> Cash {
        self.cash + Cash(price.raw() * self.inventory)
    }
}
