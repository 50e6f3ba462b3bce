//! Integration tests for routed operations
//!
//! Tests cover:
//! - Multi-hop swap ETH -> WETH -> USDT -> BEAN (order, amounts, native value)
//! - Reverse estimation along the same route
//! - Silo deposit routing
//! - Self-edge and unreachable routes
//! - execute / call_static / estimate_gas against a mocked provider

use async_trait::async_trait;
use ethers::abi::Token as AbiToken;
use ethers::providers::Provider;
use ethers::types::{Address, Bytes, H256, U256};
use std::sync::Arc;

use farm_workflow_sdk::actions::Quoter;
use farm_workflow_sdk::farm::{decode_farm_call, FarmFromMode, FarmToMode};
use farm_workflow_sdk::router::{build_swap_graph, transfer_self_edge, PoolEdge};
use farm_workflow_sdk::{Operation, Router, SdkContext, Settings, Token, WorkflowError};

const CONFIG: &str = r#"
[chain]
id = 1

[contracts]
beanstalk = "0xC1E088fC1323b20BCBee9bd1B9fC9546db5624C5"

[workflow]
default_slippage_pct = 1.0

[[tokens]]
symbol = "ETH"
address = "0x0000000000000000000000000000000000000000"

[[tokens]]
symbol = "WETH"
address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

[[tokens]]
symbol = "USDT"
address = "0xdAC17F958D2ee523a2206206994597C13D831ec7"
decimals = 6

[[tokens]]
symbol = "BEAN"
address = "0xBEA0000029AD1c77D3d5D23Ba2D8893dB9d1Efab"
decimals = 6

[[tokens]]
symbol = "DAI"
address = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
"#;

/// Fixed exchange rate `num / den`.
struct Rate {
    num: U256,
    den: U256,
}

impl Rate {
    fn new(num: U256, den: U256) -> Arc<dyn Quoter> {
        Arc::new(Self { num, den })
    }
}

#[async_trait]
impl Quoter for Rate {
    fn name(&self) -> &'static str {
        "rate"
    }

    async fn quote(&self, amount: U256, forward: bool) -> anyhow::Result<U256> {
        Ok(if forward {
            amount * self.num / self.den
        } else {
            amount * self.den / self.num
        })
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (Router, Arc<SdkContext>) {
    init_logger();
    let sdk = Settings::from_toml_str(CONFIG)
        .expect("config parses")
        .sdk_context()
        .expect("addresses are valid");

    // 1 WETH (1e18) = 3000 USDT (3000e6); 1 USDT = 1 BEAN
    let pools = vec![
        PoolEdge::new(
            Address::repeat_byte(0x01),
            "WETH",
            "USDT",
            Rate::new(U256::from(3_000u64), U256::exp10(12)),
            Rate::new(U256::exp10(12), U256::from(3_000u64)),
        ),
        PoolEdge::new(
            Address::repeat_byte(0x02),
            "USDT",
            "BEAN",
            Rate::new(U256::one(), U256::one()),
            Rate::new(U256::one(), U256::one()),
        ),
    ];
    let graph = build_swap_graph(&sdk.tokens, &pools, &["BEAN"]);
    let router = Router::new(graph, transfer_self_edge(sdk.tokens.clone()));
    (router, sdk)
}

fn token(sdk: &SdkContext, symbol: &str) -> Token {
    sdk.tokens.get(symbol).cloned().expect("whitelisted token")
}

fn account() -> Address {
    Address::repeat_byte(0xaa)
}

fn eth_to_bean(router: &Router, sdk: &Arc<SdkContext>) -> Operation {
    Operation::swap(
        router,
        Arc::clone(sdk),
        token(sdk, "ETH"),
        token(sdk, "BEAN"),
        account(),
        FarmFromMode::External,
        FarmToMode::External,
    )
    .expect("route binds")
}

#[tokio::test]
async fn test_eth_to_bean_runs_three_steps_in_order() {
    let (router, sdk) = setup();
    let mut op = eth_to_bean(&router, &sdk);

    assert!(op.is_valid());
    assert_eq!(op.path(), vec!["ETH", "WETH", "USDT", "BEAN"]);
    assert_eq!(op.workflow().len(), 3);

    let one_eth = token(&sdk, "ETH").amount("1").unwrap();
    let out = op.estimate(one_eth).await.unwrap();

    assert_eq!(out.decimals(), 6);
    assert_eq!(out.raw(), U256::from(3_000_000_000u64));
    assert_eq!(out.to_string(), "3000");

    let names: Vec<String> = op
        .workflow()
        .summarize_steps()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["wrapEth", "exchange WETH->USDT", "exchange USDT->BEAN"]);

    // Only the wrap carries native value.
    assert_eq!(op.workflow().value(), U256::exp10(18));
}

#[tokio::test]
async fn test_reverse_estimate_returns_required_eth() {
    let (router, sdk) = setup();
    let mut op = eth_to_bean(&router, &sdk);

    let wanted = token(&sdk, "BEAN").amount("3000").unwrap();
    let needed = op.estimate_reversed(wanted).await.unwrap();

    assert_eq!(needed.decimals(), 18);
    assert_eq!(needed.raw(), U256::exp10(18));

    let names: Vec<String> = op.workflow().steps().iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["wrapEth", "exchange WETH->USDT", "exchange USDT->BEAN"]);
}

#[tokio::test]
async fn test_deposit_routes_to_silo() {
    let (router, sdk) = setup();
    let mut op = Operation::deposit(
        &router,
        Arc::clone(&sdk),
        token(&sdk, "USDT"),
        token(&sdk, "BEAN"),
        account(),
        FarmFromMode::Internal,
    )
    .unwrap();

    assert_eq!(op.path(), vec!["USDT", "BEAN", "BEAN:SILO"]);

    let out = op.estimate(token(&sdk, "USDT").amount("25").unwrap()).await.unwrap();
    assert_eq!(out.raw(), U256::from(25_000_000u64));

    let deposit = op.workflow().steps().last().unwrap();
    assert_eq!(deposit.name, "deposit BEAN");
    let args = deposit.decode(&deposit.encode()).unwrap();
    assert_eq!(args[2], AbiToken::Uint(U256::from(FarmFromMode::InternalTolerant.as_u8())));
}

#[tokio::test]
async fn test_self_route_is_a_single_transfer() {
    let (router, sdk) = setup();
    let mut op = Operation::swap(
        &router,
        Arc::clone(&sdk),
        token(&sdk, "BEAN"),
        token(&sdk, "BEAN"),
        account(),
        FarmFromMode::Internal,
        FarmToMode::External,
    )
    .unwrap();

    assert_eq!(op.route().len(), 1);
    let amount = token(&sdk, "BEAN").amount("10").unwrap();
    assert_eq!(op.estimate(amount).await.unwrap(), amount);
    assert_eq!(op.workflow().steps()[0].name, "transferToken");
}

#[tokio::test]
async fn test_native_self_route_is_rejected_at_bind() {
    let (router, sdk) = setup();
    let err = Operation::swap(
        &router,
        Arc::clone(&sdk),
        token(&sdk, "ETH"),
        token(&sdk, "ETH"),
        account(),
        FarmFromMode::External,
        FarmToMode::External,
    )
    .unwrap_err();

    assert!(matches!(err, WorkflowError::UnsupportedInputType { .. }));
}

#[tokio::test]
async fn test_unreachable_route_is_invalid() {
    let (router, sdk) = setup();
    assert!(router.find_path("ETH", "DAI").is_empty());

    let mut op = Operation::swap(
        &router,
        Arc::clone(&sdk),
        token(&sdk, "ETH"),
        token(&sdk, "DAI"),
        account(),
        FarmFromMode::External,
        FarmToMode::External,
    )
    .unwrap();

    assert!(!op.is_valid());
    let err = op
        .estimate(token(&sdk, "ETH").amount("1").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::UnreachableRoute { .. }));
}

#[tokio::test]
async fn test_call_static_decodes_farm_results() {
    let (router, sdk) = setup();
    let mut op = eth_to_bean(&router, &sdk);
    let (provider, mock) = Provider::mocked();

    let results = vec![
        AbiToken::Bytes(vec![]),
        AbiToken::Bytes(ethers::abi::encode(&[AbiToken::Uint(U256::from(2_990_000_000u64))])),
        AbiToken::Bytes(ethers::abi::encode(&[AbiToken::Uint(U256::from(2_985_000_000u64))])),
    ];
    mock.push::<Bytes, _>(Bytes::from(ethers::abi::encode(&[AbiToken::Array(results)])))
        .unwrap();

    let raw = op
        .call_static(&provider, token(&sdk, "ETH").amount("1").unwrap(), 1.0)
        .await
        .unwrap();
    assert_eq!(raw.len(), 3);

    let decoded = op.workflow().decode_result(&raw);
    assert!(decoded[0].is_empty());
    assert_eq!(decoded[2], vec![AbiToken::Uint(U256::from(2_985_000_000u64))]);

    // Static passes encode minimum outputs lowered by slippage.
    let calls = decode_farm_call(&op.workflow().encode().unwrap()).unwrap();
    assert_eq!(calls.len(), 3);
    let last = &op.workflow().steps()[2];
    let args = last.decode(&calls[2]).unwrap();
    assert_eq!(args[4], AbiToken::Uint(U256::from(2_970_000_000u64)));
    assert_eq!(op.workflow().value(), U256::exp10(18));
}

#[tokio::test]
async fn test_execute_submits_farm_transaction() {
    let (router, sdk) = setup();
    let mut op = eth_to_bean(&router, &sdk);
    let (provider, mock) = Provider::mocked();

    // Sending fills gas price and gas limit before eth_sendTransaction; the same
    // 32-byte word answers all three.
    let hash = H256::repeat_byte(0x42);
    for _ in 0..3 {
        mock.push::<H256, _>(hash).unwrap();
    }

    let tx = op
        .execute(&provider, token(&sdk, "ETH").amount("1").unwrap(), 1.0)
        .await
        .unwrap();
    assert_eq!(tx, hash);

    // The submitted transaction carries the wrapped ETH as value and the
    // execute-mode calldata.
    assert_eq!(op.workflow().value(), U256::exp10(18));
    let calls = decode_farm_call(&op.workflow().encode().unwrap()).unwrap();
    assert_eq!(calls.len(), 3);
    let last = &op.workflow().steps()[2];
    let args = last.decode(&calls[2]).unwrap();
    assert_eq!(args[4], AbiToken::Uint(U256::from(2_970_000_000u64)));
}

#[tokio::test]
async fn test_estimate_gas_uses_provider() {
    let (router, sdk) = setup();
    let mut op = eth_to_bean(&router, &sdk);
    let (provider, mock) = Provider::mocked();
    mock.push::<U256, _>(U256::from(250_000u64)).unwrap();

    let gas = op
        .estimate_gas(&provider, token(&sdk, "ETH").amount("1").unwrap(), 0.5)
        .await
        .unwrap();
    assert_eq!(gas, U256::from(250_000u64));
}
