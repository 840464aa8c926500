use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;

use crate::services::explore::{DistributionSettings, NullPolicy};

pub const DEFAULT_WORKBOOK_PATH: &str = "Revue_systematique_resultats.xlsx";
pub const DEFAULT_ADVANCED_SHEET: &str = "Final_articles_and_variables";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub workbook_path: PathBuf,
    pub advanced_sheet: String,
    pub bind_addr: SocketAddr,
    pub distribution: DistributionSettings,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let workbook_path = lookup("WORKBOOK_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKBOOK_PATH));

        let advanced_sheet = lookup("ADVANCED_SHEET")
            .unwrap_or_else(|| DEFAULT_ADVANCED_SHEET.to_string());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("Invalid BIND_ADDR: {}", e))?;

        let nulls = match lookup("DISTRIBUTION_NULLS").as_deref() {
            None | Some("include") => NullPolicy::Include,
            Some("exclude") => NullPolicy::Exclude,
            Some(other) => anyhow::bail!(
                "Invalid DISTRIBUTION_NULLS '{}', expected 'include' or 'exclude'",
                other
            ),
        };

        let min_modalities = match lookup("DISTRIBUTION_MIN_MODALITIES") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| anyhow::anyhow!(
                    "Invalid DISTRIBUTION_MIN_MODALITIES '{}', expected a positive integer",
                    raw
                ))?,
            None => DistributionSettings::default().min_modalities,
        };

        Ok(Config {
            workbook_path,
            advanced_sheet,
            bind_addr,
            distribution: DistributionSettings {
                nulls,
                min_modalities,
                ..DistributionSettings::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.workbook_path, PathBuf::from(DEFAULT_WORKBOOK_PATH));
        assert_eq!(config.advanced_sheet, DEFAULT_ADVANCED_SHEET);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.distribution, DistributionSettings::default());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("WORKBOOK_PATH", "/data/review.xlsx"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("DISTRIBUTION_NULLS", "exclude"),
            ("DISTRIBUTION_MIN_MODALITIES", "5"),
        ])
        .unwrap();

        assert_eq!(config.workbook_path, PathBuf::from("/data/review.xlsx"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.distribution.nulls, NullPolicy::Exclude);
        assert_eq!(config.distribution.min_modalities, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("DISTRIBUTION_NULLS", "sometimes")]).is_err());
        assert!(config_from(&[("DISTRIBUTION_MIN_MODALITIES", "0")]).is_err());
        assert!(config_from(&[("BIND_ADDR", "nowhere")]).is_err());
    }
}
