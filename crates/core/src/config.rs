//! Forecast submission configuration.
//!
//! Mirrors the forecast service's config payload.  The wire format keeps
//! the service's snake_case field names (including the historical
//! `dayfirst` spelling) and its `DD/MM/YYYY` start-date encoding.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

/// Rounding applied to forecast quantities server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    HalfUp,
    Round,
    Ceil,
    Floor,
}

/// Configuration sent with every forecast submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ForecastConfig {
    /// Number of days to forecast.
    #[validate(range(min = 1, max = 90))]
    pub forecast_horizon: u32,

    /// Site codes to forecast.  `None` means "no filter"; an empty list
    /// is normalized to `None` before transmission rather than being sent
    /// as an empty-list filter.
    pub forecast_site_codes: Option<Vec<String>>,

    /// First forecast date.  `None` means "use the server default".
    #[serde(with = "day_first_date")]
    pub forecast_start_date: Option<NaiveDate>,

    /// Forecasts below this threshold are zeroed server-side.
    #[validate(range(min = 0.0, max = 10.0))]
    pub zero_threshold: f64,

    pub rounding_mode: RoundingMode,

    /// Seed forwarded to the model for reproducibility.
    pub random_state: i64,

    /// Parse input dates day-first (`DD/MM/YYYY`).
    pub dayfirst: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            forecast_horizon: 7,
            forecast_site_codes: None,
            forecast_start_date: None,
            zero_threshold: 0.5,
            rounding_mode: RoundingMode::HalfUp,
            random_state: 42,
            dayfirst: true,
        }
    }
}

impl ForecastConfig {
    /// Whether a non-empty site-code filter is set.
    pub fn has_site_filter(&self) -> bool {
        self.forecast_site_codes
            .as_ref()
            .is_some_and(|codes| !codes.is_empty())
    }

    /// Normalize before transmission: an empty site list becomes "no
    /// filter" and blank site codes are dropped.
    pub fn normalized(mut self) -> Self {
        if let Some(codes) = self.forecast_site_codes.take() {
            let codes: Vec<String> = codes
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            self.forecast_site_codes = if codes.is_empty() { None } else { Some(codes) };
        }
        self
    }

    /// Run field validation and flatten failures into a [`CoreError`].
    pub fn check(&self) -> Result<(), CoreError> {
        Validate::validate(self).map_err(|errors| CoreError::Validation(errors.to_string()))
    }
}

/// Serde helper for the service's `DD/MM/YYYY` optional start date.
/// Empty strings deserialize as `None`, matching the service.
mod day_first_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service() {
        let config = ForecastConfig::default();
        assert_eq!(config.forecast_horizon, 7);
        assert_eq!(config.zero_threshold, 0.5);
        assert_eq!(config.rounding_mode, RoundingMode::HalfUp);
        assert!(config.dayfirst);
        assert!(config.forecast_site_codes.is_none());
        assert!(config.check().is_ok());
    }

    #[test]
    fn horizon_out_of_range_rejected() {
        let config = ForecastConfig {
            forecast_horizon: 91,
            ..Default::default()
        };
        assert!(config.check().is_err());

        let config = ForecastConfig {
            forecast_horizon: 0,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn zero_threshold_out_of_range_rejected() {
        let config = ForecastConfig {
            zero_threshold: 10.5,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn empty_site_list_normalizes_to_no_filter() {
        let config = ForecastConfig {
            forecast_site_codes: Some(vec![]),
            ..Default::default()
        }
        .normalized();
        assert!(config.forecast_site_codes.is_none());
        assert!(!config.has_site_filter());
    }

    #[test]
    fn blank_site_codes_are_dropped() {
        let config = ForecastConfig {
            forecast_site_codes: Some(vec!["  ".into(), "S01".into(), "".into()]),
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.forecast_site_codes, Some(vec!["S01".to_string()]));
    }

    #[test]
    fn start_date_serializes_day_first() {
        let config = ForecastConfig {
            forecast_start_date: NaiveDate::from_ymd_opt(2025, 3, 9),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["forecast_start_date"], "09/03/2025");
        assert_eq!(json["rounding_mode"], "half_up");
    }

    #[test]
    fn absent_start_date_serializes_as_null() {
        let json = serde_json::to_value(ForecastConfig::default()).unwrap();
        assert!(json["forecast_start_date"].is_null());
    }

    #[test]
    fn empty_string_start_date_deserializes_as_none() {
        let json = r#"{
            "forecast_horizon": 7,
            "forecast_site_codes": null,
            "forecast_start_date": "",
            "zero_threshold": 0.5,
            "rounding_mode": "half_up",
            "random_state": 42,
            "dayfirst": true
        }"#;
        let config: ForecastConfig = serde_json::from_str(json).unwrap();
        assert!(config.forecast_start_date.is_none());
    }
}
