//! Run configuration.
//!
//! A [`RiskConfig`] is built once, validated once, and then passed by
//! reference to every rule. There is no fallback-on-failure branching
//! inside the rules themselves.

use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Default request count above which a client IP is flagged.
pub const DEFAULT_SUSPICIOUS_IP_THRESHOLD: u64 = 100;

/// Default percentile used to derive the oversized-request cutoff.
pub const DEFAULT_OVERSIZED_PERCENTILE: f64 = 0.95;

/// Environment variable overriding the volume threshold.
pub const ENV_SUSPICIOUS_IP_THRESHOLD: &str = "SUSPICIOUS_IP_THRESHOLD";
/// Environment variable overriding the oversized percentile.
pub const ENV_OVERSIZED_PERCENTILE: &str = "OVERSIZED_PERCENTILE";
/// Environment variable overriding business hours, formatted `start-end`.
pub const ENV_BUSINESS_HOURS: &str = "BUSINESS_HOURS";

/// The hour-of-day window considered normal activity.
///
/// Both boundary hours are inside the window: with the default `(8, 18)`,
/// 08:00 and 18:59 are normal while 07:59 and 19:00 are after hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// First hour of the window (0-23)
    pub start_hour: u32,
    /// Last hour of the window (0-23), inclusive
    pub end_hour: u32,
}

impl BusinessHours {
    /// Creates a window without validating it.
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// True when `hour` falls outside the window.
    pub fn is_after_hours(&self, hour: u32) -> bool {
        hour < self.start_hour || hour > self.end_hour
    }

    /// The bound `hour` violates, or `None` when it is inside the window.
    pub fn violated_bound(&self, hour: u32) -> Option<u32> {
        if hour < self.start_hour {
            Some(self.start_hour)
        } else if hour > self.end_hour {
            Some(self.end_hour)
        } else {
            None
        }
    }

    fn validate(&self) -> Result<()> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(GuardError::config_invalid(format!(
                "business hours must be within 0-23, got {self}"
            )));
        }
        if self.start_hour > self.end_hour {
            return Err(GuardError::config_invalid(format!(
                "business hours start must not be after end, got {self}"
            )));
        }
        Ok(())
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self::new(8, 18)
    }
}

impl fmt::Display for BusinessHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_hour, self.end_hour)
    }
}

impl std::str::FromStr for BusinessHours {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s.split_once('-').ok_or_else(|| {
            GuardError::config_invalid(format!("business hours must look like '8-18', got '{s}'"))
        })?;
        let parse = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| {
                GuardError::config_invalid(format!("invalid business hour '{part}' in '{s}'"))
            })
        };
        Ok(Self::new(parse(start)?, parse(end)?))
    }
}

/// Thresholds used by the risk rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Requests per IP above which the IP is flagged (strictly greater)
    pub suspicious_ip_threshold: u64,
    /// Percentile in (0, 1) of request sizes used as the oversized cutoff
    pub oversized_percentile: f64,
    /// Window of normal activity
    pub business_hours: BusinessHours,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            suspicious_ip_threshold: DEFAULT_SUSPICIOUS_IP_THRESHOLD,
            oversized_percentile: DEFAULT_OVERSIZED_PERCENTILE,
            business_hours: BusinessHours::default(),
        }
    }
}

impl RiskConfig {
    /// Sets the volume threshold.
    pub fn with_suspicious_ip_threshold(mut self, threshold: u64) -> Self {
        self.suspicious_ip_threshold = threshold;
        self
    }

    /// Sets the oversized percentile.
    pub fn with_oversized_percentile(mut self, percentile: f64) -> Self {
        self.oversized_percentile = percentile;
        self
    }

    /// Sets the business-hours window.
    pub fn with_business_hours(mut self, start_hour: u32, end_hour: u32) -> Self {
        self.business_hours = BusinessHours::new(start_hour, end_hour);
        self
    }

    /// Rejects configurations no rule can run with.
    pub fn validate(&self) -> Result<()> {
        if self.suspicious_ip_threshold == 0 {
            return Err(GuardError::config_invalid(
                "suspicious_ip_threshold must be greater than 0",
            ));
        }
        let p = self.oversized_percentile;
        if !p.is_finite() || p <= 0.0 || p >= 1.0 {
            return Err(GuardError::config_invalid(format!(
                "oversized_percentile must be strictly between 0 and 1, got {p}"
            )));
        }
        self.business_hours.validate()
    }

    /// Reads overrides from the process environment.
    ///
    /// Unset variables keep their defaults. A variable that is set but cannot
    /// be parsed is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SUSPICIOUS_IP_THRESHOLD) {
            config.suspicious_ip_threshold = raw.trim().parse().map_err(|_| {
                GuardError::config_invalid(format!(
                    "{ENV_SUSPICIOUS_IP_THRESHOLD} must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_OVERSIZED_PERCENTILE) {
            config.oversized_percentile = raw.trim().parse().map_err(|_| {
                GuardError::config_invalid(format!(
                    "{ENV_OVERSIZED_PERCENTILE} must be a number, got '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_BUSINESS_HOURS) {
            config.business_hours = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Options for the descriptive summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Number of equal-width buckets for the request-size histogram
    pub histogram_bins: usize,
    /// Number of countries listed in the country distribution
    pub top_countries: usize,
    /// Largest hourly series that is zero-filled between first and last hour
    pub max_hourly_buckets: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 50,
            top_countries: 10,
            max_hourly_buckets: 100_000,
        }
    }
}

impl SummaryConfig {
    /// Rejects degenerate summary options.
    pub fn validate(&self) -> Result<()> {
        if self.histogram_bins == 0 {
            return Err(GuardError::config_invalid("histogram_bins must be at least 1"));
        }
        if self.top_countries == 0 {
            return Err(GuardError::config_invalid("top_countries must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RiskConfig::default();
        assert_eq!(config.suspicious_ip_threshold, 100);
        assert_eq!(config.oversized_percentile, 0.95);
        assert_eq!(config.business_hours, BusinessHours::new(8, 18));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_percentile() {
        for p in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let err = RiskConfig::default()
                .with_oversized_percentile(p)
                .validate()
                .unwrap_err();
            assert!(err.is_config_invalid(), "{p} should be rejected");
        }
    }

    #[test]
    fn test_rejects_zero_threshold_and_bad_hours() {
        assert!(RiskConfig::default()
            .with_suspicious_ip_threshold(0)
            .validate()
            .is_err());
        assert!(RiskConfig::default()
            .with_business_hours(8, 24)
            .validate()
            .is_err());
        assert!(RiskConfig::default()
            .with_business_hours(19, 7)
            .validate()
            .is_err());
    }

    #[test]
    fn test_business_hours_boundaries() {
        let hours = BusinessHours::default();
        assert!(hours.is_after_hours(7));
        assert!(!hours.is_after_hours(8));
        assert!(!hours.is_after_hours(18));
        assert!(hours.is_after_hours(19));
        assert_eq!(hours.violated_bound(3), Some(8));
        assert_eq!(hours.violated_bound(22), Some(18));
        assert_eq!(hours.violated_bound(12), None);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = RiskConfig::from_lookup(lookup(&[
            (ENV_SUSPICIOUS_IP_THRESHOLD, "250"),
            (ENV_OVERSIZED_PERCENTILE, "0.99"),
            (ENV_BUSINESS_HOURS, "9-17"),
        ]))
        .unwrap();

        assert_eq!(config.suspicious_ip_threshold, 250);
        assert_eq!(config.oversized_percentile, 0.99);
        assert_eq!(config.business_hours, BusinessHours::new(9, 17));
    }

    #[test]
    fn test_from_lookup_has_no_silent_fallback() {
        let err = RiskConfig::from_lookup(lookup(&[(ENV_SUSPICIOUS_IP_THRESHOLD, "lots")]))
            .unwrap_err();
        assert!(err.is_config_invalid());

        let err =
            RiskConfig::from_lookup(lookup(&[(ENV_BUSINESS_HOURS, "eight")])).unwrap_err();
        assert!(err.is_config_invalid());
    }

    #[test]
    fn test_from_lookup_unset_uses_defaults() {
        let config = RiskConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RiskConfig::default());
    }
}
