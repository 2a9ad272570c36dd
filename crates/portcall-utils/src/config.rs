use std::path::Path;

use chrono::Duration;
use eyre::WrapErr;
use serde::Deserialize;

/// Tunable parameters shared by the pipelines, loaded from a JSON file
///
/// Every key is optional in the file; missing keys take the defaults below, which are the
/// production settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Vessels with fewer records than this after dedup are dropped entirely
    pub min_required_positions: usize,
    pub stationary_period_min_duration_hours: f64,
    pub stationary_period_max_distance_km: f64,
    pub min_unique_vessels_for_anchorage: usize,
    pub anchorage_entry_distance_km: f64,
    pub anchorage_exit_distance_km: f64,
    pub stopped_begin_speed_knots: f64,
    pub stopped_end_speed_knots: f64,
    pub minimum_port_gap_duration_minutes: i64,
    pub blacklisted_vessel_ids: Vec<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_required_positions: 200,
            stationary_period_min_duration_hours: 12.0,
            stationary_period_max_distance_km: 0.5,
            min_unique_vessels_for_anchorage: 20,
            anchorage_entry_distance_km: 3.0,
            anchorage_exit_distance_km: 4.0,
            stopped_begin_speed_knots: 0.2,
            stopped_end_speed_knots: 0.5,
            minimum_port_gap_duration_minutes: 360,
            blacklisted_vessel_ids: Vec::new(),
        }
    }
}

impl Config {
    /// Load the config from the given path, or the defaults if no path was given
    pub fn load(path: Option<&Path>) -> eyre::Result<Self> {
        let Some(path) = path else {
            tracing::debug!("No config given, using defaults");
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config: {path:?}"))?;
        let config: Self = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config: {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that make the pipelines meaningless
    pub fn validate(&self) -> eyre::Result<()> {
        if self.anchorage_entry_distance_km > self.anchorage_exit_distance_km {
            eyre::bail!(
                "Entry distance {} km exceeds exit distance {} km; the hysteresis would invert",
                self.anchorage_entry_distance_km,
                self.anchorage_exit_distance_km
            );
        }
        if self.stopped_begin_speed_knots > self.stopped_end_speed_knots {
            eyre::bail!(
                "Stop-begin speed {} kn exceeds stop-end speed {} kn; the hysteresis would invert",
                self.stopped_begin_speed_knots,
                self.stopped_end_speed_knots
            );
        }
        if self.stationary_period_max_distance_km <= 0.0 {
            eyre::bail!("Stationary period max distance must be positive");
        }
        if self.minimum_port_gap_duration_minutes <= 0 {
            eyre::bail!("Minimum port gap duration must be positive");
        }
        Ok(())
    }

    pub fn stationary_period_min_duration(&self) -> Duration {
        Duration::seconds((self.stationary_period_min_duration_hours * 3600.0) as i64)
    }

    pub fn minimum_port_gap_duration(&self) -> Duration {
        Duration::minutes(self.minimum_port_gap_duration_minutes)
    }
}
