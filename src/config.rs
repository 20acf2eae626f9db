use std::net::SocketAddr;

use anyhow::Context;
use jiff::{Timestamp, civil::Date, tz::TimeZone};

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub backend_url: String,
    pub backend_anon_key: String,
    pub database_url: String,
    pub catalog_ttl_secs: i64,
    pub draft_ttl_minutes: i64,
    pub backend_rps: u32,
    pub payment_delay_ms: u64,
    pub realtime_poll_secs: u64,
    pub cookie_secure: bool,
    pub theater_tz: TimeZone,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let backend_url = std::env::var("BACKEND_URL").unwrap_or_else(|_| "".to_string());
        let backend_anon_key = std::env::var("BACKEND_ANON_KEY").unwrap_or_else(|_| "".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinebook.db?mode=rwc".to_string());

        let catalog_ttl_secs: i64 =
            std::env::var("CATALOG_TTL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(300);

        let draft_ttl_minutes: i64 =
            std::env::var("DRAFT_TTL_MINUTES").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let backend_rps: u32 =
            std::env::var("BACKEND_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let payment_delay_ms: u64 =
            std::env::var("PAYMENT_DELAY_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(2000);

        let realtime_poll_secs: u64 =
            std::env::var("REALTIME_POLL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(15);

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let tz_name = std::env::var("THEATER_TZ").unwrap_or_else(|_| "Asia/Kolkata".to_string());
        let theater_tz = TimeZone::get(&tz_name).with_context(|| format!("THEATER_TZ {tz_name}"))?;

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            backend_url,
            backend_anon_key,
            database_url,
            catalog_ttl_secs,
            draft_ttl_minutes,
            backend_rps,
            payment_delay_ms,
            realtime_poll_secs,
            cookie_secure,
            theater_tz,
        })
    }

    /// Calendar date at the theaters right now.
    pub fn today(&self) -> Date {
        Timestamp::now().to_zoned(self.theater_tz.clone()).date()
    }

    /// Configuration for router tests: mock backend, in-memory SQLite, no payment delay.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 0).into(),
            backend_url: String::new(),
            backend_anon_key: String::new(),
            database_url: "sqlite::memory:".to_string(),
            catalog_ttl_secs: 300,
            draft_ttl_minutes: 30,
            backend_rps: 1000,
            payment_delay_ms: 0,
            realtime_poll_secs: 1,
            cookie_secure: false,
            theater_tz: TimeZone::get("Asia/Kolkata").unwrap(),
        }
    }
}
