use std::path::PathBuf;

use crate::data::normalize::DEFAULT_MIN_PRESENT;

pub const DATA_ENV: &str = "SCORECARD_DATA";
pub const GEOGRAPHY_ENV: &str = "SCORECARD_GEOGRAPHY";
pub const MIN_PRESENT_ENV: &str = "SCORECARD_MIN_PRESENT";

/// Where the dashboard reads its inputs from.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Institution table (CSV, JSON or Parquet).
    pub data_path: PathBuf,
    /// GeoJSON state outlines keyed by FIPS.
    pub geography_path: PathBuf,
    /// Share of core metrics a record needs to be kept.
    pub min_present: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/Most-Recent-Cohorts-Institution.csv"),
            geography_path: PathBuf::from("data/us-states.geojson"),
            min_present: DEFAULT_MIN_PRESENT,
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `SCORECARD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(DATA_ENV).filter(|s| !s.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(GEOGRAPHY_ENV).filter(|s| !s.trim().is_empty()) {
            config.geography_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(MIN_PRESENT_ENV) {
            match raw.trim().parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => config.min_present = v,
                _ => {
                    log::warn!("ignoring {MIN_PRESENT_ENV}={raw:?}: expected a fraction in [0, 1]")
                }
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        assert_eq!(DashboardConfig::from_lookup(lookup(&[])), DashboardConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let c = DashboardConfig::from_lookup(lookup(&[
            (DATA_ENV, "/tmp/rows.parquet"),
            (GEOGRAPHY_ENV, "/tmp/states.json"),
            (MIN_PRESENT_ENV, "0.75"),
        ]));
        assert_eq!(c.data_path, PathBuf::from("/tmp/rows.parquet"));
        assert_eq!(c.geography_path, PathBuf::from("/tmp/states.json"));
        assert_eq!(c.min_present, 0.75);
    }

    #[test]
    fn bad_fraction_is_ignored() {
        for bad in ["1.5", "-0.1", "half"] {
            let c = DashboardConfig::from_lookup(lookup(&[(MIN_PRESENT_ENV, bad)]));
            assert_eq!(c.min_present, DEFAULT_MIN_PRESENT);
        }
    }
}
