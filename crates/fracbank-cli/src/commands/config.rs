//! Config command - print the resolved configuration

use crate::config::AppConfig;

pub fn show(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("{:#?}", config);
    }
    Ok(())
}
