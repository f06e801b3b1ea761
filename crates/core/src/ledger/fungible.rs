use ethers::types::{Address, U256};
use std::collections::HashMap;

/// Balance-and-allowance token
#[derive(Debug, Clone, Default)]
pub struct FungibleToken {
    /// Token symbol
    pub symbol: String,

    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl FungibleToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn mint(&mut self, to: Address, amount: U256) {
        let balance = self.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Sets the amount `spender` may move out of `owner`'s balance
    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`.
    ///
    /// An allowance of `U256::MAX` is never consumed.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), String> {
        if spender != from {
            let allowance = self.allowance(from, spender);
            if allowance < amount {
                return Err("ERC20: insufficient allowance".to_string());
            }
            if allowance != U256::MAX {
                self.allowances.insert((from, spender), allowance - amount);
            }
        }
        if to.is_zero() {
            return Err("ERC20: transfer to the zero address".to_string());
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err("ERC20: transfer amount exceeds balance".to_string());
        }
        self.balances.insert(from, from_balance - amount);
        self.mint(to, amount);
        Ok(())
    }
}
