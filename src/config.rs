// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;

const DEFAULT_HOSTNAME: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

/// Runtime mode; decides log format and whether 500 bodies carry diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Development,
    #[default]
    Production,
    Test,
}

impl Mode {
    pub fn exposes_diagnostics(self) -> bool {
        !matches!(self, Mode::Production)
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            "test" => Ok(Mode::Test),
            other => Err(anyhow!(
                "unknown mode '{other}', expected development, production or test"
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Development => "development",
            Mode::Production => "production",
            Mode::Test => "test",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub hostname: String,
    pub port: u16,
    pub mode: Mode,
    pub cache_ttl: Duration,
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = first_set(&lookup, &["BENEFITS_API_URL", "SPORT_CLUB_API"])
            .context("BENEFITS_API_URL is required")?;
        let base_url = parse_base_url(&raw_url)?;

        let hostname = lookup("SERVER_HOSTNAME")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());

        let port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid SERVER_PORT '{raw}'"))?,
            None => DEFAULT_PORT,
        };

        let mode = match first_set(&lookup, &["APP_ENV", "NODE_ENV"]) {
            Some(raw) => raw.parse().context("invalid APP_ENV")?,
            None => Mode::default(),
        };

        let cache_ttl = parse_duration(&lookup, "CACHE_TTL_SECONDS", 300)?;
        let timeout = parse_duration(&lookup, "UPSTREAM_TIMEOUT_SECONDS", 10)?;

        Ok(Self {
            hostname,
            port,
            mode,
            cache_ttl,
            upstream: UpstreamConfig { base_url, timeout },
        })
    }

    pub fn listen_addr(&self) -> (&str, u16) {
        (self.hostname.as_str(), self.port)
    }
}

/// First non-blank value among `keys`; later keys are legacy names.
fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(*key))
        .find(|value| !value.trim().is_empty())
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid BENEFITS_API_URL '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("BENEFITS_API_URL must use http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

fn parse_duration<F>(lookup: &F, env_key: &str, default_secs: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(env_key).unwrap_or_else(|| default_secs.to_string());
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{env_key} must be an integer number of seconds"))?;

    if secs == 0 {
        bail!("{env_key} must be greater than zero");
    }

    Ok(Duration::from_secs(secs))
}
