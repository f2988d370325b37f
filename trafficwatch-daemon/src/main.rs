use anyhow::{Context, Result};
use clap::Parser;

use trafficwatch_core::TrafficwatchConfig;
use trafficwatch_daemon::cli::{Command, DaemonCli, InitNginxArgs};
use trafficwatch_daemon::logging;
use trafficwatch_daemon::nginx_setup::{self, NginxSetup, SystemNginx};
use trafficwatch_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = TrafficwatchConfig::from_file(&cli.config)
        .await
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config.general);
    config.validate().context("config validation failed")?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        println!(
            "  monitors: {}, proxy log: {}, output: {} ({})",
            config.monitors.len(),
            config.middleware.is_some(),
            config.writer.path,
            config.writer.format
        );
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    if let Some(Command::InitNginx(args)) = &cli.command {
        return init_nginx(&config, args).await;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "trafficwatch-daemon starting"
    );

    let stats = Orchestrator::build_from_config(config)?.run().await?;
    tracing::info!(
        ticks = stats.ticks,
        records_written = stats.records_written,
        failed_batches = stats.failed_batches,
        "trafficwatch-daemon exited"
    );
    Ok(())
}

async fn init_nginx(config: &TrafficwatchConfig, args: &InitNginxArgs) -> Result<()> {
    let middleware = config
        .middleware
        .as_ref()
        .context("init-nginx requires a [middleware] section")?;
    let setup = NginxSetup::from_config(middleware);
    let nginx = SystemNginx::new(&args.nginx_bin);

    let report = tokio::task::spawn_blocking(move || nginx_setup::init_nginx(&setup, &nginx))
        .await
        .context("init-nginx task failed")??;
    println!("{report}");
    Ok(())
}
