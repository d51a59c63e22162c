//! Vault Prober - probe one deployed vault for exploitable behaviors.
//!
//! Seeds an in-memory EVM from a fork endpoint, runs the probing pipeline
//! against the configured target and prints machine-readable result lines.

use vault_prober::{
    config, pipeline, report, EvmHarness, ForkLoader, ProbeError, ProberConfig,
};

use eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cfg = ProberConfig::default();
    let target = cfg.target.ok_or_else(|| {
        ProbeError::config_invalid("TARGET_ADDRESS not set or not a valid address")
    })?;

    info!(target = %target, fork = %cfg.fork_url, "seeding simulation from fork");

    let mut harness = EvmHarness::new(cfg.chain_id);
    let loader = ForkLoader::new(cfg.fork_url.clone())?;
    loader.seed(&mut harness, target).await?;

    // Best-effort seeding of the chain infrastructure the probes lean on.
    for addr in [
        *config::WETH_ADDRESS,
        *config::UNISWAP_V3_ROUTER,
        *config::AAVE_V3_POOL,
    ] {
        match loader.get_code(addr).await {
            Ok(code) if !code.is_empty() => {
                let balance = loader.get_balance(addr).await.unwrap_or_default();
                harness.insert_contract(addr, code, balance);
            }
            Ok(_) => warn!(address = %addr, "no bytecode on fork, skipping"),
            Err(e) => warn!(address = %addr, "infrastructure seed failed: {}", e),
        }
    }

    let prober = vault_prober::random_identity();
    harness.insert_funded_account(prober, cfg.prober_funding);
    info!(prober = %prober, "probing identity funded");

    let probe_report = pipeline::probe_target(&mut harness, &cfg, prober, target)?;
    report::emit(&probe_report);

    if let Ok(path) = std::env::var("REPORT_JSON_PATH") {
        let json = serde_json::to_string_pretty(&report::to_json(&probe_report))?;
        std::fs::write(&path, json)?;
        info!(path = %path, "JSON report written");
    }

    Ok(())
}
