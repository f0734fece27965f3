use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use taskrank_core::SortKey;

use crate::state::ensure_taskrank_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSection,
    #[serde(default)]
    pub list: ListSection,
    #[serde(default)]
    pub alerts: AlertsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSection {
    /// IANA zone used to read naive due dates ("2026-03-01 17:00").
    pub timezone: String,
    /// Whose tasks this CLI reads and writes.
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSection {
    /// score | due | importance | created
    pub default_sort: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsSection {
    pub enabled: bool,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            owner: "me".to_string(),
        }
    }
}

impl Default for ListSection {
    fn default() -> Self {
        Self {
            default_sort: SortKey::default().to_string(),
        }
    }
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    pub fn default_sort(&self) -> Result<SortKey> {
        self.list
            .default_sort
            .parse()
            .context("config.toml: list.default_sort")
    }

    pub fn timezone(&self) -> Result<Tz> {
        let name = &self.general.timezone;
        name.parse()
            .map_err(|_| anyhow!("config.toml: general.timezone: invalid timezone: {name}"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_taskrank_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
