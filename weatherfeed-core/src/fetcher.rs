use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    error::{ParseError, TransportError},
    model::{TemperatureUnit, WeatherQuery, WeatherReport, WeatherResult},
};

/// Anything that can answer a weather query.
///
/// Operations only see this trait, so tests can swap the HTTP fetcher for
/// canned or delayed answers.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherResult, TransportError>;
}

/// Fetches current weather over HTTP.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct WeatherFetcher {
    http: Client,
}

impl WeatherFetcher {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    /// Fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl WeatherSource for WeatherFetcher {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherResult, TransportError> {
        let url = request_url(query);
        tracing::debug!(location = %query.location, "requesting current weather");

        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status { status, body: truncate_body(&body) });
        }

        let result = WeatherResult::from(parse_report(&body, query.units));
        if let WeatherResult::Unparseable(err) = &result {
            tracing::warn!(location = %query.location, "unparseable weather response: {err}");
        }

        Ok(result)
    }
}

/// Endpoint plus `q`, `appid` and, for non-default units, `units`.
///
/// Parameters already present on the endpoint are kept.
pub fn request_url(query: &WeatherQuery) -> Url {
    let mut url = query.endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", &query.location);
        pairs.append_pair("appid", &query.api_key);
        if let Some(units) = query.units.query_value() {
            pairs.append_pair("units", units);
        }
    }
    url
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
}

/// Decode a current-weather body. Extra fields are ignored; missing or
/// mistyped `name` / `main.temp` fail.
pub fn parse_report(body: &str, unit: TemperatureUnit) -> Result<WeatherReport, ParseError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;

    Ok(WeatherReport { city_name: parsed.name, temperature: parsed.main.temp, unit })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
