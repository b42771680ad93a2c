//! Interactive wallet panel for flipit
//!
//! Run with: cargo run --bin flipit
//!
//! Requires FLIP_CONTRACT and FLIP_TOKENS; PRIVATE_KEY acts as the wallet.

use std::io::{self, Write};

use alloy::primitives::{Address, U256};
use flipit::constants::format_token_amount;
use flipit::{
    ChainInfo, DepositParams, Face, FallbackReader, FlipClient, FlipError, KeyWallet,
    LocalSigner, NetworkConfig, RpcReader, WalletPanel,
};
use tracing_subscriber::EnvFilter;

type Client = FlipClient<FallbackReader<RpcReader>, LocalSigner>;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = NetworkConfig::from_env()?;
    let wallet = KeyWallet::from_env()?.map(|wallet| wallet.with_authorizer(confirm_connect));
    if wallet.is_none() {
        println!("No wallet found (PRIVATE_KEY is not set). You can browse but not play.");
    }
    let mut panel = WalletPanel::new(wallet, config.networks.clone())?;

    println!("\n========================================");
    println!("            flipit wallet panel");
    println!("========================================");
    println!("Game contract: {}", config.coinflip);

    // Main loop
    loop {
        println!("\n----------------------------------------");
        println!("{}", panel.status());
        println!("Select an option:");
        println!("  1. Open wallet");
        println!("  2. Disconnect");
        println!("  3. Switch network");
        println!("  4. Flip heads");
        println!("  5. Flip tails");
        println!("  6. Deposit to treasury");
        println!("  7. Bet status");
        println!("  8. View info");
        println!("  q. Quit");
        println!("----------------------------------------");

        let choice = prompt("Enter choice", "")?;

        let result = match choice.as_str() {
            "1" => panel.connect().await.map(|_| ()),
            "2" => {
                panel.disconnect();
                Ok(())
            }
            "3" => switch_network_flow(&mut panel),
            "4" => flip_flow(&panel, &config, Face::Heads).await,
            "5" => flip_flow(&panel, &config, Face::Tails).await,
            "6" => deposit_flow(&panel, &config).await,
            "7" => bet_status_flow(&panel, &config).await,
            "8" => view_info(&panel, &config).await,
            "q" | "Q" => {
                println!("\nGoodbye!");
                break;
            }
            _ => {
                println!("\nInvalid choice. Please try again.");
                Ok(())
            }
        };

        if let Err(err) = result {
            print_error(&err);
        }
    }

    Ok(())
}

/// Wallet connect prompt
fn confirm_connect(address: Address) -> bool {
    print!("Allow flipit to use account {}? [y/N]: ", address);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    io::stdin().read_line(&mut input).is_ok() && matches!(input.trim(), "y" | "Y" | "yes")
}

fn prompt(label: &str, default: &str) -> io::Result<String> {
    if default.is_empty() {
        print!("{}: ", label);
    } else {
        print!("{} [{}]: ", label, default);
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    Ok(if input.is_empty() { default } else { input }.to_string())
}

fn print_error(err: &eyre::Report) {
    match FlipError::of(err) {
        Some(flip) => println!("\n{} ({})", flip.user_message(), flip),
        None => println!("\nError: {:#}", err),
    }
}

/// Client for the connected session, or `None` with a hint printed
fn client(panel: &WalletPanel<KeyWallet>, config: &NetworkConfig) -> eyre::Result<Option<Client>> {
    let Some(session) = panel.session() else {
        println!("\nOpen the wallet first.");
        return Ok(None);
    };

    let reader = reader_for(config, panel.active_network())?;
    let client = FlipClient::new(reader, session.signer().clone(), config.clone());
    Ok(Some(client))
}

fn reader_for(config: &NetworkConfig, network: &ChainInfo) -> eyre::Result<FallbackReader<RpcReader>> {
    if network.chain_id == config.chain_id {
        FallbackReader::from_config(config)
    } else {
        Ok(FallbackReader::new(RpcReader::new(&network.rpc_url)?, None))
    }
}

fn default_token(config: &NetworkConfig) -> String {
    config
        .tokens
        .iter()
        .next()
        .map(|token| token.symbol.clone())
        .unwrap_or_default()
}

fn switch_network_flow(panel: &mut WalletPanel<KeyWallet>) -> eyre::Result<()> {
    println!("\n=== Switch Network ===");
    for (i, network) in panel.networks().iter().enumerate() {
        let marker = if network == panel.active_network() { "*" } else { " " };
        println!("  {} {}. {}", marker, i + 1, network);
    }

    let choice = prompt("Network", "1")?;
    let index = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| eyre::eyre!("Invalid network choice {:?}", choice))?;

    let network = panel.switch_network(index)?;
    println!("Active network: {}", network);
    Ok(())
}

async fn flip_flow(panel: &WalletPanel<KeyWallet>, config: &NetworkConfig, face: Face) -> eyre::Result<()> {
    let Some(client) = client(panel, config)? else {
        return Ok(());
    };
    println!("\n=== Flip {} ===", face);

    let symbol = prompt("Token", &default_token(config))?;
    let amount = prompt("Amount", "1")?;

    println!("\nFlipping {} {} on {}...", amount, symbol.to_uppercase(), face);
    let receipt = client.flip(&symbol, &amount, face).await?;

    println!("Result: {}", receipt.outcome);
    println!("Transaction: {}", receipt.tx_hash);
    if let Some(request_id) = receipt.request_id {
        println!("Request id: {}", request_id);
    }
    Ok(())
}

async fn deposit_flow(panel: &WalletPanel<KeyWallet>, config: &NetworkConfig) -> eyre::Result<()> {
    let Some(client) = client(panel, config)? else {
        return Ok(());
    };
    println!("\n=== Deposit to Treasury ===");

    let symbol = prompt("Token", &default_token(config))?;
    let token = client.token(&symbol)?.clone();
    let balance = client.token_balance(&token.symbol).await?;
    println!("Available {}: {}", token.symbol, format_token_amount(balance));

    let amount = prompt("Amount to deposit", "1")?;
    let params = DepositParams::new(token.address, &amount)?;

    println!("\nDepositing {} {}...", amount, token.symbol);
    let receipt = client.deposit_to_treasury(params).await?;
    println!("Approval: {}", receipt.approval_tx);
    println!("Deposit: {}", receipt.tx_hash);
    println!("Deposit successful!");
    Ok(())
}

async fn bet_status_flow(panel: &WalletPanel<KeyWallet>, config: &NetworkConfig) -> eyre::Result<()> {
    let Some(client) = client(panel, config)? else {
        return Ok(());
    };
    println!("\n=== Bet Status ===");

    let input = prompt("Request id", "")?;
    let request_id: U256 = input
        .parse()
        .map_err(|_| eyre::eyre!("Invalid request id {:?}", input))?;

    let status = client.bet_status(request_id).await?;
    if !status.exists {
        println!("No bet with request id {}", request_id);
        return Ok(());
    }
    if !status.fulfilled {
        println!("Bet {} is waiting for randomness", request_id);
        return Ok(());
    }

    let outcome = client.game_outcome(request_id).await?;
    println!("Landed on: {}", outcome.face);
    println!("Won: {}", if outcome.won { "yes" } else { "no" });
    println!("Payout: {}", format_token_amount(outcome.payout));
    Ok(())
}

async fn view_info(panel: &WalletPanel<KeyWallet>, config: &NetworkConfig) -> eyre::Result<()> {
    println!("\n=== Account Info ===");
    println!("Network: {}", panel.active_network());
    println!("Wallet: {}", panel.status());

    let Some(client) = client(panel, config)? else {
        return Ok(());
    };

    let eth_balance = client.get_eth_balance().await?;
    println!("ETH: {}", format_token_amount(eth_balance));

    if config.tokens.is_empty() {
        println!("No tokens configured (set FLIP_TOKENS).");
    }
    for token in config.tokens.iter() {
        match client.token_balance(&token.symbol).await {
            Ok(balance) => println!("{}: {}", token.symbol, format_token_amount(balance)),
            Err(err) => println!("{}: unavailable ({:#})", token.symbol, err),
        }
    }
    Ok(())
}
