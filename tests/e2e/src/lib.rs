//! Fixtures shared by the end-to-end tests
//!
//! Builds node configurations the same way an operator would write them, so the tests
//! exercise TOML parsing, validation, origin construction and graph building together.

use ethabi::{Token, Uint};
use node_config::NodeConfig;
use origins::chain::parse_address;
use origins::contracts::ContractKind;
use origins::testing::ScriptedChainClient;
use origins::OriginError;
use std::fmt::Write;

pub const RETH: &str = "0xae78736Cd615f374D3085123A210448E74Fc6393";
pub const WSTETH: &str = "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0";

/// Static feeds `feed0..feedN` and an `ETH/BTC` median model over all of them
///
/// A feed given `None` has no `ETH/BTC` price and answers with an error point.
pub fn median_feeds(prices: &[Option<&str>], min_values: usize) -> Result<NodeConfig, toml::de::Error> {
    let mut toml = String::new();
    for (index, price) in prices.iter().enumerate() {
        let pair = if price.is_some() { "ETH/BTC" } else { "ETH/USD" };
        let _ = writeln!(
            toml,
            "[origins.feed{index}]\ntype = \"static\"\nprices = [{{ pair = \"{pair}\", price = \"{}\" }}]\n",
            price.unwrap_or("1")
        );
    }

    let sources: Vec<String> = (0..prices.len())
        .map(|index| format!("{{ type = \"origin\", origin = \"feed{index}\", pair = \"ETH/BTC\" }}"))
        .collect();
    let _ = writeln!(
        toml,
        "[[models]]\nname = \"ETH/BTC\"\n[models.node]\ntype = \"median\"\npair = \"ETH/BTC\"\nmin_values = {min_values}\nsources = [{}]",
        sources.join(", ")
    );
    toml::from_str(&toml)
}

/// Liquid staking tokens priced in USD through on-chain exchange rates and an ETH peg
pub const LST_NODE: &str = r#"
[ethereum]
rpc_url = "http://127.0.0.1:8545"

[retry]
attempts = 1

[origins.rocket_pool]
type = "rocket_pool"
block_offsets = [0, 10]
contracts = [{ pair = "RETH/ETH", address = "0xae78736Cd615f374D3085123A210448E74Fc6393" }]

[origins.lido]
type = "wsteth"
contracts = [{ pair = "WSTETH/STETH", address = "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0" }]

[origins.pegs]
type = "static"
prices = [{ pair = "ETH/USD", price = "3000" }, { pair = "STETH/ETH", price = "1" }]

[[models]]
name = "ETH/USD"
node = { type = "origin", origin = "pegs", pair = "ETH/USD" }

[[models]]
name = "RETH/USD"
[models.node]
type = "indirect"
sources = [
    { type = "origin", origin = "rocket_pool", pair = "RETH/ETH" },
    { type = "reference", model = "ETH/USD" },
]

[[models]]
name = "WSTETH/USD"
[models.node]
type = "indirect"
sources = [
    { type = "origin", origin = "lido", pair = "WSTETH/STETH" },
    { type = "origin", origin = "pegs", pair = "STETH/ETH" },
    { type = "reference", model = "ETH/USD" },
]
"#;

/// Chain at block 20,000,000 answering the rETH and wstETH rate getters
///
/// rETH reads 1.10 at the latest block and 1.08 ten blocks earlier; wstETH reads 1.15.
pub fn lst_chain() -> Result<ScriptedChainClient, OriginError> {
    let client = ScriptedChainClient::new(20_000_000);
    let rate = |value: &str| -> Result<Vec<Token>, OriginError> {
        let value = Uint::from_dec_str(value).map_err(|e| OriginError::Abi(e.to_string()))?;
        Ok(vec![Token::Uint(value)])
    };
    let reth = parse_address(RETH)?;
    client.respond_at(20_000_000, reth, ContractKind::RocketTokenReth, "getExchangeRate", &[], &rate("1100000000000000000")?)?;
    client.respond_at(19_999_990, reth, ContractKind::RocketTokenReth, "getExchangeRate", &[], &rate("1080000000000000000")?)?;
    client.respond(parse_address(WSTETH)?, ContractKind::WstEth, "stEthPerToken", &[], &rate("1150000000000000000")?)?;
    Ok(client)
}
