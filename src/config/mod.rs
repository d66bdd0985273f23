use rust_decimal::Decimal;
use std::env;

use crate::market::lifecycle::MAX_LOCK_SECS;
use crate::market::MarketRules;
use crate::settlement::amount::{UnitScale, DEFAULT_UNIT_SCALE, MAX_UNIT_SCALE};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL URL; the in-memory store is used when unset.
    pub database_url: Option<String>,

    // Settlement / market rules
    pub unit_scale: UnitScale,
    pub min_stake: Decimal,
    pub min_lock_secs: i64,

    // Startup data
    pub seed_demo_markets: bool,
    pub legacy_snapshot_path: Option<String>,

    // Background services
    pub unlock_watch_interval_secs: u64,

    pub log_json: bool,
    /// Bearer token for `/api/*` and `/ws`; auth is off when unset.
    pub api_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            database_url: None,
            unit_scale: UnitScale::default(),
            min_stake: Decimal::from(100),
            min_lock_secs: 3600,
            seed_demo_markets: false,
            legacy_snapshot_path: None,
            unlock_watch_interval_secs: 30,
            log_json: false,
            api_token: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let scale_raw: u32 = env::var("SETTLEMENT_UNIT_SCALE")
            .unwrap_or_else(|_| DEFAULT_UNIT_SCALE.to_string())
            .parse()?;
        let unit_scale = UnitScale::new(scale_raw).ok_or_else(|| {
            anyhow::anyhow!("SETTLEMENT_UNIT_SCALE must be at most {MAX_UNIT_SCALE}, got {scale_raw}")
        })?;

        let min_stake: Decimal = env::var("MIN_STAKE")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("MIN_STAKE is not a decimal: {e}"))?;
        if min_stake < Decimal::ZERO {
            anyhow::bail!("MIN_STAKE must not be negative");
        }

        let min_lock_secs: i64 = env::var("MIN_LOCK_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("MIN_LOCK_SECS is not an integer: {e}"))?;
        if !(0..=MAX_LOCK_SECS).contains(&min_lock_secs) {
            anyhow::bail!("MIN_LOCK_SECS must be between 0 and {MAX_LOCK_SECS}, got {min_lock_secs}");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),

            unit_scale,
            min_stake,
            min_lock_secs,

            seed_demo_markets: env::var("SEED_DEMO_MARKETS")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            legacy_snapshot_path: env::var("LEGACY_SNAPSHOT_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            unlock_watch_interval_secs: env::var("UNLOCK_WATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),

            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            api_token: env::var("API_TOKEN").ok().filter(|s| !s.is_empty()),
        })
    }

    pub fn market_rules(&self) -> MarketRules {
        MarketRules {
            min_stake: self.min_stake,
            min_lock_secs: self.min_lock_secs,
            unit_scale: self.unit_scale,
        }
    }
}
