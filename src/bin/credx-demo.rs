use anyhow::{bail, Result};
use clap::Parser;
use credx_harness::prelude::*;
use credx_harness::workflow;
use std::path::PathBuf;

/// Issue a credential, prove one attribute and verify the proof
#[derive(Debug, Parser)]
#[command(name = "credx-demo", version)]
struct Cli {
    /// Issue against a revocation registry
    #[arg(long)]
    revocation: bool,

    /// Registry capacity
    #[arg(long, default_value_t = 100)]
    max_cred_num: u32,

    /// ISSUANCE_BY_DEFAULT or ISSUANCE_ON_DEMAND
    #[arg(long, default_value = "ISSUANCE_BY_DEFAULT")]
    issuance_type: IssuanceType,

    /// Where to write the tails file
    #[arg(long, value_name = "DIR")]
    tails_dir: Option<PathBuf>,

    /// Issue this many credentials through the worker pool instead
    #[arg(long, value_name = "N")]
    bulk: Option<usize>,

    /// Pool size for --bulk
    #[arg(long, value_name = "W", default_value_t = 4)]
    workers: usize,

    /// Log filter, overrides RUST_LOG
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_config = match &cli.log {
        Some(filter) => LogConfig::from_env().with_filter(filter.as_str()),
        None => LogConfig::from_env(),
    };
    init_logging(&log_config);

    let mut config = WorkflowConfig::default();
    if cli.revocation {
        config.revocation = Some(RevocationOptions {
            max_cred_num: cli.max_cred_num,
            issuance_type: cli.issuance_type,
            tails_dir: cli.tails_dir.clone(),
            ..RevocationOptions::default()
        });
    }

    if let Some(target) = cli.bulk {
        let fixture = IssuanceFixture::new(&config)?;
        println!("credential definition: {}", fixture.cred_def.id);
        let report = issue_many(
            PoolConfig {
                target,
                workers: cli.workers,
            },
            move |_| fixture.issue(),
        )
        .await?;
        println!(
            "issued {} credentials in {:?} ({:?} each, peak {} in flight)",
            report.results.len(),
            report.elapsed,
            report.average,
            report.peak_in_flight
        );
        return Ok(());
    }

    let outcome = tokio::task::spawn_blocking(move || workflow::run(&config)).await??;
    println!("schema: {}", outcome.schema.id);
    println!("credential definition: {}", outcome.cred_def.id);
    if let Some(def) = &outcome.rev_reg_def {
        println!("revocation registry: {}", def.id);
    }
    println!("verified: {}", outcome.verified);
    if !outcome.verified {
        bail!("proof did not verify");
    }
    Ok(())
}
