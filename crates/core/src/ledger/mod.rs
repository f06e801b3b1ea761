//! In-memory asset contracts: the external collaborators the protocol
//! transfers through. The protocol only sees them as [`TransferOnBehalf`].

pub mod fungible;
pub mod non_fungible;

pub use fungible::FungibleToken;
pub use non_fungible::NonFungibleToken;

use crate::settlement::{TransferError, TransferOnBehalf};
use ethers::types::{Address, U256};
use std::collections::HashMap;
use tracing::debug;

/// Asset contract deployed at an address
#[derive(Debug, Clone)]
pub enum TokenContract {
    Fungible(FungibleToken),
    NonFungible(NonFungibleToken),
}

impl TokenContract {
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount_or_id: U256,
    ) -> Result<(), String> {
        match self {
            TokenContract::Fungible(token) => token.transfer_from(spender, from, to, amount_or_id),
            TokenContract::NonFungible(token) => {
                token.transfer_from(spender, from, to, amount_or_id)
            }
        }
    }
}

/// Directory of asset contracts, called by a fixed spender (the protocol)
#[derive(Debug, Clone)]
pub struct AssetLedger {
    spender: Address,
    contracts: HashMap<Address, TokenContract>,
}

impl AssetLedger {
    /// Creates an empty ledger whose transfers are made by `spender`
    pub fn new(spender: Address) -> Self {
        Self {
            spender,
            contracts: HashMap::new(),
        }
    }

    /// Account the ledger transfers on behalf of
    pub fn spender(&self) -> Address {
        self.spender
    }

    pub fn deploy_fungible(&mut self, address: Address, symbol: impl Into<String>) {
        self.contracts
            .insert(address, TokenContract::Fungible(FungibleToken::new(symbol)));
    }

    pub fn deploy_non_fungible(&mut self, address: Address, symbol: impl Into<String>) {
        self.contracts.insert(
            address,
            TokenContract::NonFungible(NonFungibleToken::new(symbol)),
        );
    }

    pub fn contract(&self, address: Address) -> Option<&TokenContract> {
        self.contracts.get(&address)
    }

    pub fn fungible(&self, address: Address) -> Option<&FungibleToken> {
        match self.contracts.get(&address) {
            Some(TokenContract::Fungible(token)) => Some(token),
            _ => None,
        }
    }

    pub fn fungible_mut(&mut self, address: Address) -> Option<&mut FungibleToken> {
        match self.contracts.get_mut(&address) {
            Some(TokenContract::Fungible(token)) => Some(token),
            _ => None,
        }
    }

    pub fn non_fungible(&self, address: Address) -> Option<&NonFungibleToken> {
        match self.contracts.get(&address) {
            Some(TokenContract::NonFungible(token)) => Some(token),
            _ => None,
        }
    }

    pub fn non_fungible_mut(&mut self, address: Address) -> Option<&mut NonFungibleToken> {
        match self.contracts.get_mut(&address) {
            Some(TokenContract::NonFungible(token)) => Some(token),
            _ => None,
        }
    }

    /// Balance of a fungible token, or the number of ids held of a non-fungible one
    pub fn balance_of(&self, contract: Address, account: Address) -> U256 {
        match self.contracts.get(&contract) {
            Some(TokenContract::Fungible(token)) => token.balance_of(account),
            Some(TokenContract::NonFungible(token)) => U256::from(token.balance_of(account)),
            None => U256::zero(),
        }
    }

    /// Owner of a non-fungible token id
    pub fn owner_of(&self, contract: Address, id: U256) -> Option<Address> {
        self.non_fungible(contract)?.owner_of(id)
    }
}

impl TransferOnBehalf for AssetLedger {
    fn transfer_from(
        &mut self,
        contract: Address,
        from: Address,
        to: Address,
        amount_or_id: U256,
    ) -> Result<(), TransferError> {
        let spender = self.spender;
        let token = self
            .contracts
            .get_mut(&contract)
            .ok_or(TransferError::UnknownContract(contract))?;

        token
            .transfer_from(spender, from, to, amount_or_id)
            .map_err(|reason| {
                debug!("Transfer rejected by {:?}: {}", contract, reason);
                TransferError::Rejected { contract, reason }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn test_routes_by_contract() {
        let protocol = addr(0x5a9);
        let (erc20, erc721) = (addr(20), addr(721));
        let mut ledger = AssetLedger::new(protocol);
        ledger.deploy_fungible(erc20, "MOCK20");
        ledger.deploy_non_fungible(erc721, "MOCK721");

        ledger.fungible_mut(erc20).unwrap().mint(addr(1), U256::from(100));
        ledger
            .fungible_mut(erc20)
            .unwrap()
            .approve(addr(1), protocol, U256::from(100));
        ledger.non_fungible_mut(erc721).unwrap().mint(addr(2), U256::from(7)).unwrap();
        ledger
            .non_fungible_mut(erc721)
            .unwrap()
            .approve(addr(2), protocol, U256::from(7))
            .unwrap();

        ledger.transfer_from(erc20, addr(1), addr(2), U256::from(100)).unwrap();
        ledger.transfer_from(erc721, addr(2), addr(1), U256::from(7)).unwrap();

        assert_eq!(ledger.balance_of(erc20, addr(2)), U256::from(100));
        assert_eq!(ledger.owner_of(erc721, U256::from(7)), Some(addr(1)));
        assert_eq!(ledger.balance_of(erc721, addr(1)), U256::one());
    }

    #[test]
    fn test_rejections_carry_contract_reason() {
        let mut ledger = AssetLedger::new(addr(0x5a9));
        ledger.deploy_fungible(addr(20), "MOCK20");
        ledger.fungible_mut(addr(20)).unwrap().mint(addr(1), U256::from(5));

        let err = ledger
            .transfer_from(addr(20), addr(1), addr(2), U256::from(5))
            .unwrap_err();
        assert_eq!(err.to_string(), "ERC20: insufficient allowance");

        let err = ledger
            .transfer_from(addr(99), addr(1), addr(2), U256::one())
            .unwrap_err();
        assert_eq!(err, TransferError::UnknownContract(addr(99)));
    }
}
