use std::{env, fmt::Display, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use paymatch_engine::{helpers::DEFAULT_CREDIT_MARKER, OrderFlowConfig, DEFAULT_ORDER_EXPIRY_SECONDS};
use pmg_common::helpers::{parse_boolean_flag, parse_numeric_setting};

const DEFAULT_PMG_HOST: &str = "127.0.0.1";
const DEFAULT_PMG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/paymatch.db";
const DEFAULT_EXPIRY_SWEEP_SECONDS: u64 = 60;
const DEFAULT_WEBHOOK_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_WEBHOOK_INITIAL_BACKOFF_MS: u64 = 500;
const DEFAULT_WEBHOOK_MAX_BACKOFF_MS: u64 = 30_000;
const DEFAULT_WEBHOOK_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_WEBHOOK_CONCURRENCY: usize = 16;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Orders older than this are no longer payable.
    pub order_expiry: Duration,
    /// How often the expiry worker sweeps stale pending orders.
    pub expiry_sweep_interval: StdDuration,
    /// Notifications must contain this marker to be considered at all.
    pub credit_marker: String,
    pub routes: RouteOptions,
    pub webhook: WebhookConfig,
}

/// Settings the request handlers need at runtime.
#[derive(Clone, Debug, Default)]
pub struct RouteOptions {
    /// `{order_number}` is replaced with the order number to build the `pay_url` of new orders. If unset, `pay_url`
    /// is empty.
    pub pay_url_template: Option<String>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
}

impl RouteOptions {
    pub fn pay_url(&self, order_number: &str) -> String {
        self.pay_url_template.as_ref().map(|t| t.replace("{order_number}", order_number)).unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Delivery attempts per notification, including the first.
    pub max_attempts: u32,
    pub initial_backoff: StdDuration,
    pub max_backoff: StdDuration,
    /// Per-request timeout.
    pub timeout: StdDuration,
    /// Deliveries in flight at the same time.
    pub concurrency: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_WEBHOOK_MAX_ATTEMPTS,
            initial_backoff: StdDuration::from_millis(DEFAULT_WEBHOOK_INITIAL_BACKOFF_MS),
            max_backoff: StdDuration::from_millis(DEFAULT_WEBHOOK_MAX_BACKOFF_MS),
            timeout: StdDuration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECONDS),
            concurrency: DEFAULT_WEBHOOK_CONCURRENCY,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PMG_HOST.to_string(),
            port: DEFAULT_PMG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            order_expiry: Duration::seconds(DEFAULT_ORDER_EXPIRY_SECONDS),
            expiry_sweep_interval: StdDuration::from_secs(DEFAULT_EXPIRY_SWEEP_SECONDS),
            credit_marker: DEFAULT_CREDIT_MARKER.to_string(),
            routes: RouteOptions::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PMG_HOST").ok().unwrap_or_else(|| DEFAULT_PMG_HOST.into());
        let port = numeric_setting("PMG_PORT", DEFAULT_PMG_PORT, 1);
        let database_url = env::var("PMG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ PMG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let expiry = numeric_setting("PMG_ORDER_EXPIRY_SECONDS", DEFAULT_ORDER_EXPIRY_SECONDS, 1);
        let sweep = numeric_setting("PMG_EXPIRY_SWEEP_SECONDS", DEFAULT_EXPIRY_SWEEP_SECONDS, 1);
        let credit_marker = env::var("PMG_CREDIT_MARKER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CREDIT_MARKER.to_string());
        let pay_url_template = env::var("PMG_PAY_URL_TEMPLATE").ok().filter(|s| !s.trim().is_empty());
        if let Some(template) = pay_url_template.as_ref().filter(|t| !t.contains("{order_number}")) {
            warn!(
                "🪛️ PMG_PAY_URL_TEMPLATE ({template}) does not contain {{order_number}}. Every order gets the same URL."
            );
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("PMG_USE_X_FORWARDED_FOR").ok(), false);
        Self {
            host,
            port,
            database_url,
            order_expiry: Duration::seconds(expiry),
            expiry_sweep_interval: StdDuration::from_secs(sweep),
            credit_marker,
            routes: RouteOptions { pay_url_template, use_x_forwarded_for },
            webhook: WebhookConfig::from_env_or_default(),
        }
    }

    pub fn order_flow_config(&self) -> OrderFlowConfig {
        OrderFlowConfig::new(self.order_expiry)
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let max_attempts = numeric_setting("PMG_WEBHOOK_MAX_ATTEMPTS", DEFAULT_WEBHOOK_MAX_ATTEMPTS, 1);
        let initial = numeric_setting("PMG_WEBHOOK_INITIAL_BACKOFF_MS", DEFAULT_WEBHOOK_INITIAL_BACKOFF_MS, 1);
        let mut max = numeric_setting("PMG_WEBHOOK_MAX_BACKOFF_MS", DEFAULT_WEBHOOK_MAX_BACKOFF_MS, 1);
        if max < initial {
            warn!("🪛️ PMG_WEBHOOK_MAX_BACKOFF_MS ({max}) is less than the initial backoff. Using {initial} instead.");
            max = initial;
        }
        let timeout = numeric_setting("PMG_WEBHOOK_TIMEOUT_SECONDS", DEFAULT_WEBHOOK_TIMEOUT_SECONDS, 1);
        let concurrency = numeric_setting("PMG_WEBHOOK_CONCURRENCY", DEFAULT_WEBHOOK_CONCURRENCY, 1);
        Self {
            max_attempts,
            initial_backoff: StdDuration::from_millis(initial),
            max_backoff: StdDuration::from_millis(max),
            timeout: StdDuration::from_secs(timeout),
            concurrency,
        }
    }
}

/// Reads a numeric environment variable, logging and falling back to `default` if the value is invalid or below
/// `min`.
fn numeric_setting<T>(name: &str, default: T, min: T) -> T
where T: FromStr + PartialOrd + Copy + Display {
    let raw = env::var(name).ok();
    let value = parse_numeric_setting(raw.clone(), default, min);
    if let Some(raw) = raw {
        if raw.trim().parse::<T>().ok().filter(|v| *v >= min).is_none() {
            error!("🪛️ {raw} is not a valid value for {name}. Using the default, {default}, instead.");
        }
    }
    value
}
