use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use solana_sdk::commitment_config::CommitmentConfig;
use tracing::{error, info, warn};

use poolsniper::application::listener::{LogStreamListener, NewTokenHandler};
use poolsniper::domain::pool::manager::PoolManager;
use poolsniper::domain::token::enricher::TokenEnricher;
use poolsniper::domain::trade::executor::{TradeExecutor, TradeOutcome};
use poolsniper::infrastructure::metadata::ChainMetadataSource;
use poolsniper::infrastructure::notify::{ChannelNotifier, Notifier};
use poolsniper::infrastructure::price::JupiterPriceOracle;
use poolsniper::infrastructure::rpc::{ChainRpc, SolanaRpc};
use poolsniper::infrastructure::store::{
    InMemoryTokenStore, InMemoryTradeStore, TokenStore, TradeStore,
};
use poolsniper::infrastructure::wallet::WalletManager;
use poolsniper::shared::config::ConfigLoader;
use poolsniper::shared::constants::RAYDIUM_POOL_V4_PROGRAM_ID;
use poolsniper::shared::types::BotConfig;

#[derive(Parser, Debug)]
#[command(version, about = "Raydium V4 pool watcher with risk checks and swap execution")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// RPC endpoint URL (overrides config)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Websocket endpoint URL (overrides config)
    #[arg(long)]
    ws_url: Option<String>,

    /// Slippage tolerance in percent (overrides config)
    #[arg(long)]
    slippage_pct: Option<f64>,

    /// Priority fee in microlamports (overrides config)
    #[arg(long)]
    priority_fee: Option<u64>,

    /// Give up waiting for confirmation after this many seconds
    #[arg(long)]
    confirm_timeout_secs: Option<u64>,

    /// Buy every token that passes the risk checks, amount in SOL
    #[arg(long)]
    buy_amount_sol: Option<f64>,

    /// Submit swaps for real instead of simulating them
    #[arg(long)]
    execute: bool,

    /// Delay between consecutive RPC calls in milliseconds (overrides config)
    #[arg(long)]
    pacing_ms: Option<u64>,
}

fn build_config(args: &Args) -> Result<BotConfig> {
    // Priority: CLI args > config file > defaults
    let mut cfg = match &args.config {
        Some(path) => ConfigLoader::load_config(path)?,
        None => BotConfig::default(),
    };
    if let Some(rpc_url) = &args.rpc_url {
        cfg.network.rpc_url = rpc_url.clone();
    }
    if let Some(ws_url) = &args.ws_url {
        cfg.network.ws_url = ws_url.clone();
    }
    if let Some(slippage) = args.slippage_pct {
        cfg.trade.slippage_pct = slippage;
    }
    if let Some(fee) = args.priority_fee {
        cfg.trade.priority_fee_microlamports = fee;
    }
    if args.confirm_timeout_secs.is_some() {
        cfg.trade.confirm_timeout_secs = args.confirm_timeout_secs;
    }
    if let Some(pacing) = args.pacing_ms {
        cfg.rpc_pacing_ms = pacing;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let args = Args::parse();
    let cfg = build_config(&args)?;

    let commitment = match cfg.network.commitment.as_str() {
        "processed" => CommitmentConfig::processed(),
        "confirmed" => CommitmentConfig::confirmed(),
        _ => CommitmentConfig::finalized(),
    };

    let rpc: Arc<dyn ChainRpc> = Arc::new(SolanaRpc::new(cfg.network.rpc_url.clone(), commitment));
    let tokens: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
    let pools = Arc::new(PoolManager::new(rpc.clone()));
    let notifier = Arc::new(ChannelNotifier::new(256));

    let enricher = Arc::new(TokenEnricher::new(
        rpc.clone(),
        tokens.clone(),
        pools.clone(),
        Arc::new(ChainMetadataSource::new(rpc.clone())?),
        Arc::new(JupiterPriceOracle::new(cfg.price_api_url.clone())?),
        notifier.clone() as Arc<dyn Notifier>,
        cfg.rpc_pacing_ms,
    ));

    if let Some(amount_sol) = args.buy_amount_sol {
        let wallet = Arc::new(WalletManager::from_env(&cfg.wallet_secret_env)?);
        info!(wallet = %wallet.pubkey(), amount_sol, execute = args.execute, "auto-buy enabled");
        let trades: Arc<dyn TradeStore> = Arc::new(InMemoryTradeStore::new());
        let executor = Arc::new(TradeExecutor::new(
            rpc.clone(),
            tokens.clone(),
            trades,
            pools.clone(),
            wallet,
            cfg.trade.clone(),
        ));

        let mut updates = notifier.subscribe();
        let execute = args.execute;
        tokio::spawn(async move {
            while let Ok(address) = updates.recv().await {
                match executor.trade(&address, true, amount_sol, true, execute).await {
                    Ok(TradeOutcome::Completed {
                        tx_id,
                        status,
                        time_taken_secs,
                    }) => {
                        info!(token = %address, tx_id, ?status, time_taken_secs, "buy finished")
                    }
                    Ok(TradeOutcome::RiskRejected(flags)) => {
                        info!(token = %address, ?flags, "buy rejected by risk checks")
                    }
                    Ok(TradeOutcome::Skipped(reason)) => {
                        info!(token = %address, reason, "buy skipped")
                    }
                    Err(err) => error!(token = %address, error = %err, "buy failed"),
                }
            }
            warn!("trade channel closed");
        });
    }

    let handler = Arc::new(NewTokenHandler::new(tokens, pools, enricher));
    let listener = LogStreamListener::new(
        cfg.network.ws_url.clone(),
        RAYDIUM_POOL_V4_PROGRAM_ID,
        handler,
    );
    listener.run().await?;
    Ok(())
}
