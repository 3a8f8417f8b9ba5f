//! Tiers command - prints the policy table the server would enforce

use crate::api::types::TiersResponse;
use crate::config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    println!("{}", render(&config)?);

    Ok(())
}

fn render(config: &AppConfig) -> anyhow::Result<String> {
    let table = config.quota.policy_table()?;
    // Validates the offset before publishing it
    config.quota.reference_zone()?;

    let response = TiersResponse::from_table(&table, config.quota.utc_offset_minutes);
    Ok(serde_json::to_string_pretty(&response)?)
}
