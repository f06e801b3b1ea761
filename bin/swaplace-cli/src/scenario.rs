//! JSON scenarios: token setup plus a sequence of protocol calls, replayed
//! against an in-memory [`Chain`].

use anyhow::{bail, Context, Result};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use swaplace_core::{
    codec, Asset, Chain, ErrorKind, IndexedSwap, LightAsset, LightSwap, SwapEvent, SwapId, SwapStatus,
    SwaplaceConfig,
};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Overrides the configured clock start
    #[serde(default)]
    pub genesis_timestamp: Option<u64>,

    #[serde(default)]
    pub tokens: Vec<TokenSpec>,

    #[serde(default)]
    pub mints: Vec<MintSpec>,

    #[serde(default)]
    pub approvals: Vec<ApprovalSpec>,

    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Fungible,
    NonFungible,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSpec {
    pub address: Address,
    pub kind: TokenKind,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MintSpec {
    pub token: Address,
    pub to: Address,
    #[serde(alias = "amount", alias = "id")]
    pub amount_or_id: Quantity,
}

/// Approval granted by `owner`; the spender defaults to the protocol
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalSpec {
    pub token: Address,
    pub owner: Address,
    #[serde(default)]
    pub spender: Option<Address>,
    /// Allowance, or the token id to approve
    #[serde(default, alias = "amount", alias = "id")]
    pub amount_or_id: Option<Quantity>,
    /// Operator approval over every token of `owner`
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetSpec {
    pub contract: Address,
    #[serde(alias = "amount", alias = "id")]
    pub amount_or_id: Quantity,
}

/// Number given either as a JSON number or as a decimal / hex string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(u64),
    Text(String),
}

impl Quantity {
    fn to_u256(&self) -> swaplace_core::Result<U256> {
        match self {
            Quantity::Number(value) => Ok(U256::from(*value)),
            Quantity::Text(text) => codec::parse_amount(text),
        }
    }
}

/// One protocol call; `swap` refers to the n-th swap created by the scenario
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    CreateLight {
        caller: Address,
        #[serde(default)]
        allowed: Address,
        #[serde(default)]
        expiry: Option<u64>,
        #[serde(default)]
        ttl: Option<u64>,
        #[serde(default)]
        aux_a: u8,
        #[serde(default)]
        aux_b: u64,
        biding: Vec<AssetSpec>,
        asking: Vec<AssetSpec>,
    },
    CreateIndexed {
        caller: Address,
        #[serde(default)]
        allowed: Address,
        #[serde(default)]
        expiry: Option<u64>,
        #[serde(default)]
        ttl: Option<u64>,
        assets: Vec<AssetSpec>,
        split_index: usize,
    },
    Accept {
        caller: Address,
        swap: usize,
        #[serde(default)]
        receiver: Option<Address>,
    },
    Cancel {
        caller: Address,
        swap: usize,
    },
    AdvanceTime {
        seconds: u64,
    },
    SetTime {
        timestamp: u64,
    },
}

impl Step {
    fn action(&self) -> &'static str {
        match self {
            Step::CreateLight { .. } => "create_light",
            Step::CreateIndexed { .. } => "create_indexed",
            Step::Accept { .. } => "accept",
            Step::Cancel { .. } => "cancel",
            Step::AdvanceTime { .. } => "advance_time",
            Step::SetTime { .. } => "set_time",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub action: &'static str,
    pub timestamp: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_id: Option<SwapId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapSummary {
    pub id: SwapId,
    pub owner: Address,
    pub status: SwapStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub swaps: Vec<SwapSummary>,
    pub events: Vec<SwapEvent>,
    pub total_swaps: u128,
    pub timestamp: u64,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Deploys tokens, applies mints and approvals, then replays every step.
    ///
    /// Protocol failures are recorded per step; malformed setup aborts the run.
    pub fn run(&self, config: SwaplaceConfig, genesis_timestamp: u64) -> Result<Report> {
        let mut chain = Chain::new(config, self.genesis_timestamp.unwrap_or(genesis_timestamp));
        self.setup(&mut chain)?;

        let mut created: Vec<SwapId> = Vec::new();
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let result = match step {
                Step::CreateLight {
                    caller,
                    allowed,
                    expiry,
                    ttl,
                    aux_a,
                    aux_b,
                    biding,
                    asking,
                } => {
                    let expiry = resolve_expiry(*expiry, *ttl, chain.timestamp());
                    create_light(&mut chain, *caller, *allowed, expiry, *aux_a, *aux_b, biding, asking)
                        .map(Some)
                }
                Step::CreateIndexed {
                    caller,
                    allowed,
                    expiry,
                    ttl,
                    assets,
                    split_index,
                } => {
                    let expiry = resolve_expiry(*expiry, *ttl, chain.timestamp());
                    create_indexed(&mut chain, *caller, *allowed, expiry, assets, *split_index)
                        .map(Some)
                }
                Step::Accept {
                    caller,
                    swap,
                    receiver,
                } => {
                    let id = swap_ref(&created, index, *swap)?;
                    let receiver = receiver.unwrap_or(*caller);
                    chain.accept_to(*caller, id, receiver).map(|_| Some(id))
                }
                Step::Cancel { caller, swap } => {
                    let id = swap_ref(&created, index, *swap)?;
                    chain.cancel(*caller, id).map(|_| Some(id))
                }
                Step::AdvanceTime { seconds } => {
                    chain.advance_time(*seconds);
                    Ok(None)
                }
                Step::SetTime { timestamp } => {
                    chain.set_time(*timestamp);
                    Ok(None)
                }
            };

            let outcome = match result {
                Ok(swap_id) => {
                    if let (Step::CreateLight { .. } | Step::CreateIndexed { .. }, Some(id)) =
                        (step, swap_id)
                    {
                        created.push(id);
                    }
                    StepOutcome {
                        step: index,
                        action: step.action(),
                        timestamp: chain.timestamp(),
                        ok: true,
                        swap_id,
                        error: None,
                        kind: None,
                    }
                }
                Err(err) => StepOutcome {
                    step: index,
                    action: step.action(),
                    timestamp: chain.timestamp(),
                    ok: false,
                    swap_id: None,
                    error: Some(err.to_string()),
                    kind: Some(err.kind()),
                },
            };
            outcomes.push(outcome);
        }

        let now = chain.timestamp();
        let swaps = created
            .iter()
            .map(|id| {
                let record = chain.swaplace().get_swap(*id)?;
                Ok(SwapSummary {
                    id: *id,
                    owner: record.owner,
                    status: record.status(now),
                })
            })
            .collect::<swaplace_core::Result<Vec<_>>>()?;

        info!(
            "Scenario finished: {} steps, {} swaps created",
            outcomes.len(),
            swaps.len()
        );

        Ok(Report {
            steps: outcomes,
            swaps,
            events: chain.events().to_vec(),
            total_swaps: chain.swaplace().total_swaps(),
            timestamp: now,
        })
    }

    fn setup(&self, chain: &mut Chain) -> Result<()> {
        let protocol = chain.protocol_address();
        let ledger = chain.ledger_mut();

        for token in &self.tokens {
            match token.kind {
                TokenKind::Fungible => ledger.deploy_fungible(token.address, token.symbol.clone()),
                TokenKind::NonFungible => {
                    ledger.deploy_non_fungible(token.address, token.symbol.clone())
                }
            }
        }

        for mint in &self.mints {
            let amount_or_id = mint.amount_or_id.to_u256()?;
            if let Some(token) = ledger.fungible_mut(mint.token) {
                token.mint(mint.to, amount_or_id);
            } else if let Some(token) = ledger.non_fungible_mut(mint.token) {
                token
                    .mint(mint.to, amount_or_id)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("mint of {} on {:?}", amount_or_id, mint.token))?;
            } else {
                bail!("mint on undeployed token {:?}", mint.token);
            }
        }

        for approval in &self.approvals {
            let spender = approval.spender.unwrap_or(protocol);
            if let Some(token) = ledger.fungible_mut(approval.token) {
                let amount = match &approval.amount_or_id {
                    Some(quantity) => quantity.to_u256()?,
                    None => U256::MAX,
                };
                token.approve(approval.owner, spender, amount);
            } else if let Some(token) = ledger.non_fungible_mut(approval.token) {
                if approval.all {
                    token.set_approval_for_all(approval.owner, spender, true);
                } else {
                    let id = approval
                        .amount_or_id
                        .as_ref()
                        .context("non-fungible approval needs a token id or `all`")?
                        .to_u256()?;
                    token
                        .approve(approval.owner, spender, id)
                        .map_err(anyhow::Error::msg)
                        .with_context(|| format!("approval of {} on {:?}", id, approval.token))?;
                }
            } else {
                bail!("approval on undeployed token {:?}", approval.token);
            }
        }

        Ok(())
    }
}

/// Absolute expiry wins; otherwise `now + ttl`. Neither yields `now`, which creation rejects.
fn resolve_expiry(expiry: Option<u64>, ttl: Option<u64>, now: u64) -> u64 {
    expiry.unwrap_or_else(|| now.saturating_add(ttl.unwrap_or(0)))
}

fn swap_ref(created: &[SwapId], step: usize, swap: usize) -> Result<SwapId> {
    created.get(swap).copied().with_context(|| {
        format!(
            "step {} refers to swap #{}, but only {} swaps were created before it",
            step,
            swap,
            created.len()
        )
    })
}

fn to_assets(specs: &[AssetSpec]) -> swaplace_core::Result<Vec<Asset>> {
    specs
        .iter()
        .map(|spec| Asset::new(spec.contract, spec.amount_or_id.to_u256()?))
        .collect()
}

fn to_light_assets(specs: &[AssetSpec]) -> swaplace_core::Result<Vec<LightAsset>> {
    specs
        .iter()
        .map(|spec| LightAsset::new(spec.contract, spec.amount_or_id.to_u256()?))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn create_light(
    chain: &mut Chain,
    caller: Address,
    allowed: Address,
    expiry: u64,
    aux_a: u8,
    aux_b: u64,
    biding: &[AssetSpec],
    asking: &[AssetSpec],
) -> swaplace_core::Result<SwapId> {
    let config = chain.encode_config(allowed, expiry, aux_a, aux_b)?;
    let swap = LightSwap::new(
        config,
        to_light_assets(biding)?,
        to_light_assets(asking)?,
        chain.timestamp(),
    )?;
    chain.create_light_swap(caller, swap)
}

fn create_indexed(
    chain: &mut Chain,
    caller: Address,
    allowed: Address,
    expiry: u64,
    assets: &[AssetSpec],
    split_index: usize,
) -> swaplace_core::Result<SwapId> {
    let swap = IndexedSwap::new(allowed, expiry, to_assets(assets)?, split_index);
    chain.create_indexed_swap(caller, swap)
}
