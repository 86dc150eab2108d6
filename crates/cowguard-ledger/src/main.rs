//! cowguard-quote: price a coverage request from a risk factor file
//!
//! ```bash
//! cowguard-quote factors.json --coverage-type rug_pull --coverage 1000
//! cowguard-quote - --stage launch_phase --launch-phase < factors.json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cowguard_actuary::{ActuarialResult, PremiumCalculator};
use cowguard_common::money::{format_units, to_units};
use cowguard_common::{Amount, CoverageType, LifecycleStage, RiskFactors, VERSION};
use cowguard_ledger::EngineConfig;

#[derive(Parser, Debug)]
#[command(name = "cowguard-quote", version, about = "Price CowGuard coverage from a risk factor file")]
struct Cli {
    /// RiskFactors JSON file, `-` for stdin
    factors: PathBuf,

    #[arg(long, default_value_t = CoverageType::RugPull)]
    coverage_type: CoverageType,

    #[arg(long, default_value_t = LifecycleStage::Standard)]
    stage: LifecycleStage,

    /// Token is still on its bonding curve
    #[arg(long, action = ArgAction::SetTrue)]
    launch_phase: bool,

    /// Coverage in whole USDC; prints the premium when set
    #[arg(long)]
    coverage: Option<u64>,

    /// Engine config file (json, toml or yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Serialize)]
struct QuoteOutput {
    coverage_type: CoverageType,
    stage: LifecycleStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premium: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premium_display: Option<String>,
    result: ActuarialResult,
}

fn read_factors(path: &Path) -> Result<RiskFactors> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read factors from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("invalid RiskFactors JSON in {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_from(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .init();

    info!("cowguard-quote v{}", VERSION);

    let factors = read_factors(&cli.factors)?;
    let calculator = PremiumCalculator::new(config.tariff)?;
    let result = calculator.calculate(cli.coverage_type, &factors, cli.stage, cli.launch_phase)?;

    let coverage_amount = cli
        .coverage
        .map(|whole| to_units(whole).context("coverage amount overflows"))
        .transpose()?;
    let premium = coverage_amount.map(|c| result.premium_for(c)).transpose()?;

    let output = QuoteOutput {
        coverage_type: cli.coverage_type,
        stage: cli.stage,
        coverage_amount,
        premium,
        premium_display: premium.map(format_units),
        result,
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);
    Ok(())
}
