use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Unit system requested from the weather endpoint.
///
/// The endpoint answers in Kelvin unless asked otherwise, so `Standard`
/// sends no `units` parameter at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Standard,
    Metric,
    Imperial,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Standard => "standard",
            TemperatureUnit::Metric => "metric",
            TemperatureUnit::Imperial => "imperial",
        }
    }

    /// Value of the `units` query parameter, if one has to be sent.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            TemperatureUnit::Standard => None,
            other => Some(other.as_str()),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Standard => "K",
            TemperatureUnit::Metric => "°C",
            TemperatureUnit::Imperial => "°F",
        }
    }

    pub const fn all() -> &'static [TemperatureUnit] {
        &[TemperatureUnit::Standard, TemperatureUnit::Metric, TemperatureUnit::Imperial]
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "standard" | "kelvin" => Ok(TemperatureUnit::Standard),
            "metric" | "celsius" => Ok(TemperatureUnit::Metric),
            "imperial" | "fahrenheit" => Ok(TemperatureUnit::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: standard, metric, imperial."
            )),
        }
    }
}

/// Everything needed to issue one weather request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub endpoint: Url,
    pub location: String,
    pub api_key: String,
    pub units: TemperatureUnit,
}

impl WeatherQuery {
    pub fn new(endpoint: Url, location: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            location: location.into(),
            api_key: api_key.into(),
            units: TemperatureUnit::default(),
        }
    }

    pub fn with_units(mut self, units: TemperatureUnit) -> Self {
        self.units = units;
        self
    }

    /// Same endpoint, key and units, different location.
    pub fn at(&self, location: impl Into<String>) -> Self {
        Self { location: location.into(), ..self.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city_name: String,
    pub temperature: f64,
    pub unit: TemperatureUnit,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?} {}", self.city_name, self.temperature, self.unit.symbol())
    }
}

/// Outcome of a fetch that reached the endpoint.
///
/// A body that cannot be decoded is not a transport failure; it is carried
/// here so the listener can show the decoder's message.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherResult {
    Report(WeatherReport),
    Unparseable(ParseError),
}

impl WeatherResult {
    pub fn report(&self) -> Option<&WeatherReport> {
        match self {
            WeatherResult::Report(report) => Some(report),
            WeatherResult::Unparseable(_) => None,
        }
    }

    pub fn is_report(&self) -> bool {
        matches!(self, WeatherResult::Report(_))
    }

    /// Text appended to a display surface for this result.
    pub fn line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for WeatherResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherResult::Report(report) => report.fmt(f),
            WeatherResult::Unparseable(err) => err.fmt(f),
        }
    }
}

impl From<Result<WeatherReport, ParseError>> for WeatherResult {
    fn from(value: Result<WeatherReport, ParseError>) -> Self {
        match value {
            Ok(report) => WeatherResult::Report(report),
            Err(err) => WeatherResult::Unparseable(err),
        }
    }
}
