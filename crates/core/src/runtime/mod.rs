//! Transactional execution environment.
//!
//! Every state-changing call runs against a copy of the protocol and ledger
//! state; the copy replaces the live state only if the call succeeds.

use crate::codec;
use crate::config::SwaplaceConfig;
use crate::domain::{IndexedSwap, LightSwap, SwapEvent, SwapId};
use crate::ledger::AssetLedger;
use crate::lifecycle::{CallContext, Swaplace};
use crate::Result;
use ethers::types::{Address, U256};
use tracing::{debug, warn};

/// Protocol, asset contracts and clock
#[derive(Debug, Clone)]
pub struct Chain {
    swaplace: Swaplace,
    ledger: AssetLedger,
    timestamp: u64,
}

impl Chain {
    /// Creates an environment starting at `genesis_timestamp`
    pub fn new(config: SwaplaceConfig, genesis_timestamp: u64) -> Self {
        let ledger = AssetLedger::new(config.address);
        Self {
            swaplace: Swaplace::new(config),
            ledger,
            timestamp: genesis_timestamp,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Moves the clock forward
    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
        debug!("Clock advanced to {}", self.timestamp);
    }

    /// Sets the clock; it never moves backwards
    pub fn set_time(&mut self, timestamp: u64) {
        self.timestamp = self.timestamp.max(timestamp);
    }

    pub fn swaplace(&self) -> &Swaplace {
        &self.swaplace
    }

    pub fn ledger(&self) -> &AssetLedger {
        &self.ledger
    }

    /// Direct access to the asset contracts, for minting and approvals
    pub fn ledger_mut(&mut self) -> &mut AssetLedger {
        &mut self.ledger
    }

    /// Protocol account, the spender asset owners must approve
    pub fn protocol_address(&self) -> Address {
        self.swaplace.address()
    }

    /// Runs `call` all-or-nothing.
    ///
    /// Each call clones the full protocol and ledger state, so its cost grows
    /// with the number of swaps and token holdings recorded so far.
    pub fn transact<T>(
        &mut self,
        caller: Address,
        call: impl FnOnce(&mut Swaplace, &mut AssetLedger, &CallContext) -> Result<T>,
    ) -> Result<T> {
        let ctx = CallContext::new(caller, self.timestamp);
        let mut swaplace = self.swaplace.clone();
        let mut ledger = self.ledger.clone();

        match call(&mut swaplace, &mut ledger, &ctx) {
            Ok(value) => {
                self.swaplace = swaplace;
                self.ledger = ledger;
                Ok(value)
            }
            Err(err) => {
                warn!("Call from {:?} reverted: {}", caller, err);
                Err(err)
            }
        }
    }

    pub fn create_light_swap(&mut self, caller: Address, swap: LightSwap) -> Result<SwapId> {
        self.transact(caller, |swaplace, _, ctx| swaplace.create_light_swap(ctx, swap))
    }

    pub fn create_indexed_swap(&mut self, caller: Address, swap: IndexedSwap) -> Result<SwapId> {
        self.transact(caller, |swaplace, _, ctx| swaplace.create_indexed_swap(ctx, swap))
    }

    pub fn accept(&mut self, caller: Address, id: SwapId) -> Result<()> {
        self.transact(caller, |swaplace, ledger, ctx| swaplace.accept(ctx, id, ledger))
    }

    pub fn accept_to(&mut self, caller: Address, id: SwapId, receiver: Address) -> Result<()> {
        self.transact(caller, |swaplace, ledger, ctx| {
            swaplace.accept_to(ctx, id, receiver, ledger)
        })
    }

    pub fn cancel(&mut self, caller: Address, id: SwapId) -> Result<()> {
        self.transact(caller, |swaplace, _, ctx| swaplace.cancel(ctx, id))
    }

    /// Encodes a config word against the current clock
    pub fn encode_config(&self, allowed: Address, expiry: u64, aux_a: u8, aux_b: u64) -> Result<U256> {
        codec::encode_config(allowed, expiry, aux_a, aux_b, self.timestamp)
    }

    pub fn events(&self) -> &[SwapEvent] {
        self.swaplace.events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Asset, SwapStatus};
    use crate::{Error, ErrorKind};

    const DAY: u64 = 86_400;
    const GENESIS: u64 = 1_700_000_000;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    struct Fixture {
        chain: Chain,
        owner: Address,
        acceptee: Address,
        erc20: Address,
        erc721: Address,
    }

    fn fixture() -> Fixture {
        let mut chain = Chain::new(SwaplaceConfig::default(), GENESIS);
        let (erc20, erc721) = (addr(0x20), addr(0x721));
        chain.ledger_mut().deploy_fungible(erc20, "MOCK20");
        chain.ledger_mut().deploy_non_fungible(erc721, "MOCK721");

        Fixture {
            chain,
            owner: addr(0xa1),
            acceptee: addr(0xb2),
            erc20,
            erc721,
        }
    }

    impl Fixture {
        fn mint_nft(&mut self, to: Address, id: u64, approve: bool) {
            let protocol = self.chain.protocol_address();
            let token = self.chain.ledger_mut().non_fungible_mut(self.erc721).unwrap();
            token.mint(to, U256::from(id)).unwrap();
            if approve {
                token.approve(to, protocol, U256::from(id)).unwrap();
            }
        }

        fn fund(&mut self, to: Address, amount: u64, allowance: u64) {
            let protocol = self.chain.protocol_address();
            let token = self.chain.ledger_mut().fungible_mut(self.erc20).unwrap();
            token.mint(to, U256::from(amount));
            token.approve(to, protocol, U256::from(allowance));
        }

        fn nft_owner(&self, id: u64) -> Option<Address> {
            self.chain.ledger().owner_of(self.erc721, U256::from(id))
        }

        fn light_swap(&self, allowed: Address, biding: &[u64], asking: &[u64]) -> LightSwap {
            let expiry = self.chain.timestamp() + DAY;
            let config = self.chain.encode_config(allowed, expiry, 0, 0).unwrap();
            let ids = |ids: &[u64]| ids.iter().map(|id| U256::from(*id)).collect::<Vec<_>>();

            LightSwap::compose(
                config,
                &vec![self.erc721; biding.len()],
                &ids(biding),
                &vec![self.erc721; asking.len()],
                &ids(asking),
                self.chain.timestamp(),
            )
            .unwrap()
        }
    }

    #[test]
    fn test_one_for_one_nft_swap() {
        let mut f = fixture();
        let (owner, acceptee) = (f.owner, f.acceptee);
        f.mint_nft(owner, 1, true);
        f.mint_nft(acceptee, 11, true);

        let swap = f.light_swap(acceptee, &[1], &[11]);
        let predicted = f.chain.swaplace().next_swap_id(owner).unwrap();
        let id = f.chain.create_light_swap(owner, swap).unwrap();
        assert_eq!(id, predicted);
        assert_eq!(
            f.chain.events().last(),
            Some(&SwapEvent::SwapCreated {
                id,
                owner,
                allowed: acceptee
            })
        );

        f.chain.accept(acceptee, id).unwrap();

        assert_eq!(f.nft_owner(1), Some(acceptee));
        assert_eq!(f.nft_owner(11), Some(owner));
        let accepted: Vec<&SwapEvent> = f
            .chain
            .events()
            .iter()
            .filter(|e| matches!(e, SwapEvent::SwapAccepted { .. }))
            .collect();
        assert_eq!(
            accepted,
            vec![&SwapEvent::SwapAccepted {
                id,
                owner,
                acceptor: acceptee
            }]
        );
    }

    #[test]
    fn test_ten_for_ten_swap_is_atomic() {
        let mut f = fixture();
        let (owner, acceptee) = (f.owner, f.acceptee);
        for id in 1..=10 {
            f.mint_nft(owner, id, true);
        }
        // id 17 is never approved by the acceptee
        for id in 11..=20 {
            f.mint_nft(acceptee, id, id != 17);
        }

        let biding: Vec<u64> = (1..=10).collect();
        let asking: Vec<u64> = (11..=20).collect();
        let swap = f.light_swap(acceptee, &biding, &asking);
        let id = f.chain.create_light_swap(owner, swap).unwrap();

        let err = f.chain.accept(acceptee, id).unwrap_err();
        assert_eq!(err.to_string(), "ERC721: caller is not token owner or approved");
        assert_eq!(err.kind(), ErrorKind::DelegatedTransferFailure);

        for id in 1..=10 {
            assert_eq!(f.nft_owner(id), Some(owner));
        }
        for id in 11..=20 {
            assert_eq!(f.nft_owner(id), Some(acceptee));
        }
        assert_eq!(f.chain.swaplace().status(id, f.chain.timestamp()).unwrap(), SwapStatus::Active);

        // Fixing the approval makes the same swap acceptable.
        let protocol = f.chain.protocol_address();
        let erc721 = f.erc721;
        f.chain
            .ledger_mut()
            .non_fungible_mut(erc721)
            .unwrap()
            .approve(acceptee, protocol, U256::from(17))
            .unwrap();
        f.chain.accept(acceptee, id).unwrap();

        for id in 1..=10 {
            assert_eq!(f.nft_owner(id), Some(acceptee));
        }
        for id in 11..=20 {
            assert_eq!(f.nft_owner(id), Some(owner));
        }
    }

    #[test]
    fn test_fungible_for_nft_with_split_index() {
        let mut f = fixture();
        let (owner, acceptee) = (f.owner, f.acceptee);
        f.fund(owner, 1000, 1000);
        f.mint_nft(acceptee, 1, true);

        let swap = IndexedSwap::timed(
            Address::zero(),
            2 * DAY,
            vec![
                Asset::new(f.erc20, U256::from(1000)).unwrap(),
                Asset::new(f.erc721, U256::from(1)).unwrap(),
            ],
            1,
            f.chain.timestamp(),
        );
        let id = f.chain.create_indexed_swap(owner, swap).unwrap();
        assert_eq!(
            f.chain.swaplace().get_swap(id).unwrap().config.expiry,
            GENESIS + 2 * DAY
        );

        f.chain.accept(acceptee, id).unwrap();

        assert_eq!(f.chain.ledger().balance_of(f.erc20, acceptee), U256::from(1000));
        assert_eq!(f.chain.ledger().balance_of(f.erc20, owner), U256::zero());
        assert_eq!(f.nft_owner(1), Some(owner));
    }

    #[test]
    fn test_missing_fungible_allowance_reverts() {
        let mut f = fixture();
        let (owner, acceptee) = (f.owner, f.acceptee);
        f.fund(owner, 10_000, 0);
        f.mint_nft(acceptee, 1, true);

        let swap = IndexedSwap::timed(
            Address::zero(),
            2 * DAY,
            vec![
                Asset::new(f.erc20, U256::from(10_000)).unwrap(),
                Asset::new(f.erc721, U256::from(1)).unwrap(),
            ],
            1,
            f.chain.timestamp(),
        );
        let id = f.chain.create_indexed_swap(owner, swap).unwrap();

        let err = f.chain.accept(acceptee, id).unwrap_err();
        assert_eq!(err.to_string(), "ERC20: insufficient allowance");
        assert!(!f.chain.swaplace().is_finalized(id).unwrap());
    }

    #[test]
    fn test_failed_asking_leg_rolls_back_biding_legs() {
        let mut f = fixture();
        let (owner, acceptee) = (f.owner, f.acceptee);
        f.fund(owner, 1000, 1000);
        f.mint_nft(acceptee, 1, false);

        let swap = IndexedSwap::new(
            Address::zero(),
            GENESIS + DAY,
            vec![
                Asset::new(f.erc20, U256::from(1000)).unwrap(),
                Asset::new(f.erc721, U256::from(1)).unwrap(),
            ],
            1,
        );
        let id = f.chain.create_indexed_swap(owner, swap).unwrap();
        let events_before = f.chain.events().len();

        assert!(f.chain.accept(acceptee, id).is_err());

        // The biding leg ran before the asking leg failed; its effect is discarded.
        assert_eq!(f.chain.ledger().balance_of(f.erc20, owner), U256::from(1000));
        assert_eq!(
            f.chain.ledger().fungible(f.erc20).unwrap().allowance(owner, f.chain.protocol_address()),
            U256::from(1000)
        );
        assert_eq!(f.chain.events().len(), events_before);
    }

    #[test]
    fn test_swap_id_prediction_across_owners() {
        let mut f = fixture();
        let (owner, acceptee) = (f.owner, f.acceptee);

        let first = f.light_swap(Address::zero(), &[1], &[2]);
        let expected_first = codec::derive_swap_id(owner, f.chain.swaplace().total_swaps() + 1).unwrap();
        assert_eq!(f.chain.create_light_swap(owner, first).unwrap(), expected_first);

        let second = f.light_swap(Address::zero(), &[3], &[4]);
        let expected_second = codec::derive_swap_id(acceptee, 2).unwrap();
        assert_eq!(f.chain.create_light_swap(acceptee, second).unwrap(), expected_second);
        assert_eq!(f.chain.swaplace().total_swaps(), 2);
    }

    #[test]
    fn test_failed_create_consumes_no_sequence() {
        let mut f = fixture();
        let owner = f.owner;
        let swap = IndexedSwap::new(Address::zero(), GENESIS, vec![], 0);

        let err = f.chain.create_indexed_swap(owner, swap).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodingInvariantViolation);
        assert_eq!(f.chain.swaplace().total_swaps(), 0);
    }

    #[test]
    fn test_expired_swap_cannot_be_accepted_or_canceled() {
        let mut f = fixture();
        let (owner, acceptee) = (f.owner, f.acceptee);
        f.mint_nft(owner, 1, true);
        f.mint_nft(acceptee, 2, true);

        let swap = f.light_swap(Address::zero(), &[1], &[2]);
        let id = f.chain.create_light_swap(owner, swap).unwrap();
        f.chain.advance_time(DAY + 1);

        assert!(matches!(
            f.chain.accept(acceptee, id),
            Err(Error::InvalidExpiryPeriod { .. })
        ));
        let err = f.chain.cancel(owner, id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyFinalized);
        assert_eq!(
            f.chain.swaplace().status(id, f.chain.timestamp()).unwrap(),
            SwapStatus::Expired
        );
    }

    #[test]
    fn test_accept_to_receiver() {
        let mut f = fixture();
        let (owner, acceptee, receiver) = (f.owner, f.acceptee, addr(0xc3));
        f.mint_nft(owner, 1, true);
        f.mint_nft(acceptee, 2, true);

        let swap = f.light_swap(Address::zero(), &[1], &[2]);
        let id = f.chain.create_light_swap(owner, swap).unwrap();
        f.chain.accept_to(acceptee, id, receiver).unwrap();

        assert_eq!(f.nft_owner(1), Some(receiver));
        assert_eq!(f.nft_owner(2), Some(owner));
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut chain = Chain::new(SwaplaceConfig::default(), 100);
        chain.set_time(50);
        assert_eq!(chain.timestamp(), 100);
        chain.advance_time(10);
        chain.set_time(200);
        assert_eq!(chain.timestamp(), 200);
    }
}
