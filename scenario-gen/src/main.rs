//! Corpus emitter
//!
//! Generates a scenario batch and prints it as JSON. Usage:
//!
//! ```text
//! scenario-gen [seed] [scenarios_per_employer] [adversarial_fraction]
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use scenario_gen::{ScenarioConfig, ScenarioGenerator};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = ScenarioConfig::default();
    if let Some(seed) = args.get(1) {
        config.seed = seed.parse().context("seed must be an integer")?;
    }
    if let Some(count) = args.get(2) {
        config.scenarios_per_employer = count
            .parse()
            .context("scenarios_per_employer must be an integer")?;
    }
    if let Some(fraction) = args.get(3) {
        config.adversarial_fraction = fraction
            .parse()
            .context("adversarial_fraction must be a float")?;
    }

    let batch = ScenarioGenerator::new(config).generate()?;
    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}
