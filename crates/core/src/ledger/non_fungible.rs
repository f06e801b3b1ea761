use ethers::types::{Address, U256};
use std::collections::{HashMap, HashSet};

/// Token with one owner per id
#[derive(Debug, Clone, Default)]
pub struct NonFungibleToken {
    /// Token symbol
    pub symbol: String,

    owners: HashMap<U256, Address>,
    token_approvals: HashMap<U256, Address>,
    operators: HashSet<(Address, Address)>,
}

impl NonFungibleToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn owner_of(&self, id: U256) -> Option<Address> {
        self.owners.get(&id).copied()
    }

    pub fn get_approved(&self, id: U256) -> Option<Address> {
        self.token_approvals.get(&id).copied()
    }

    pub fn balance_of(&self, account: Address) -> usize {
        self.owners.values().filter(|owner| **owner == account).count()
    }

    /// Mints `id` to `to`; fails if it already exists
    pub fn mint(&mut self, to: Address, id: U256) -> Result<(), String> {
        if self.owners.contains_key(&id) {
            return Err("ERC721: token already minted".to_string());
        }
        self.owners.insert(id, to);
        Ok(())
    }

    /// Approves `spender` for a single token; `caller` must own it
    pub fn approve(&mut self, caller: Address, spender: Address, id: U256) -> Result<(), String> {
        match self.owner_of(id) {
            Some(owner) if owner == caller || self.operators.contains(&(owner, caller)) => {
                self.token_approvals.insert(id, spender);
                Ok(())
            }
            Some(_) => Err("ERC721: approve caller is not token owner or approved for all".to_string()),
            None => Err("ERC721: invalid token ID".to_string()),
        }
    }

    /// Grants or revokes `operator` over every token of `owner`
    pub fn set_approval_for_all(&mut self, owner: Address, operator: Address, approved: bool) {
        if approved {
            self.operators.insert((owner, operator));
        } else {
            self.operators.remove(&(owner, operator));
        }
    }

    /// Moves `id` from `from` to `to` on behalf of `spender`
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        id: U256,
    ) -> Result<(), String> {
        let owner = self
            .owner_of(id)
            .ok_or_else(|| "ERC721: invalid token ID".to_string())?;

        let authorized = spender == owner
            || self.get_approved(id) == Some(spender)
            || self.operators.contains(&(owner, spender));
        if !authorized {
            return Err("ERC721: caller is not token owner or approved".to_string());
        }
        if owner != from {
            return Err("ERC721: transfer from incorrect owner".to_string());
        }
        if to.is_zero() {
            return Err("ERC721: transfer to the zero address".to_string());
        }

        self.token_approvals.remove(&id);
        self.owners.insert(id, to);
        Ok(())
    }
}
