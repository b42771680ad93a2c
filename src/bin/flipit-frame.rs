//! Farcaster frame server
//!
//! Run with: cargo run --bin flipit-frame
//!
//! Requires FLIP_CONTRACT, FLIP_TOKENS and FRAME_SIGNER (plus PRIVATE_KEY or
//! the FORDEFI_* variables for the chosen signer).

use std::sync::Arc;

use eyre::Context;
use flipit::{
    router, FallbackReader, FlipClient, FordefiConfig, FordefiSigner, FrameConfig,
    FrameResponder, FrameSignerMode, LocalSigner, NetworkConfig, RpcReader, TransactionSigner,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let network = NetworkConfig::from_env()?;
    let frame = FrameConfig::from_env()?;
    // Fail at start-up, not on the first click
    network.token(&frame.token).context("Invalid FRAME_TOKEN")?;

    let reader = FallbackReader::from_config(&network)?;

    match frame.require_signer()? {
        FrameSignerMode::Local => {
            let private_key =
                std::env::var("PRIVATE_KEY").context("PRIVATE_KEY must be set for FRAME_SIGNER=local")?;
            let signer = LocalSigner::from_private_key(&private_key, &network.rpc_url)?
                .with_confirmation_policy(frame.confirmation_policy());
            serve(reader, signer, network, frame).await
        }
        FrameSignerMode::Fordefi => {
            let fordefi = FordefiConfig::from_env()?;
            let signer = FordefiSigner::connect(&fordefi, &network.rpc_url)
                .await?
                .with_confirmation_policy(frame.confirmation_policy());
            serve(reader, signer, network, frame).await
        }
    }
}

async fn serve<S: TransactionSigner + 'static>(
    reader: FallbackReader<RpcReader>,
    signer: S,
    network: NetworkConfig,
    frame: FrameConfig,
) -> eyre::Result<()> {
    let bind_addr = frame.bind_addr.clone();
    let client = FlipClient::new(reader, signer, network).with_lock_wait(frame.lock_wait);
    tracing::info!(
        signer = %client.address(),
        contract = %client.config().coinflip,
        token = %frame.token,
        amount = %frame.amount,
        confirmation_polls = frame.confirmation_polls,
        lock_wait = ?frame.lock_wait,
        "Frame flips configured"
    );

    let app = router(Arc::new(FrameResponder::new(client, frame)));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Frame server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .await
        .context("Frame server failed")?;
    Ok(())
}
