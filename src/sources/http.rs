use super::{CurrentConditions, QuoteSource, RateSource, RateTable, RemoteQuote, Sources, WeatherSource};
use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = "deskboard widget fetcher";

fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

fn get_text(client: &Client, url: Url) -> Result<String> {
    let resp = client
        .get(url.as_str())
        .send()
        .with_context(|| format!("request {url}"))?;
    if !resp.status().is_success() {
        bail!("http status {} from {url}", resp.status());
    }
    resp.text().context("read response body")
}

/// Quote provider returning `{content, author}` objects.
pub struct QuotableClient {
    client: Client,
    url: String,
}

impl QuotableClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

impl QuoteSource for QuotableClient {
    fn random_quote(&self) -> Result<RemoteQuote> {
        let url = Url::parse(&self.url).context("invalid quote url")?;
        let body = get_text(&self.client, url)?;
        parse_quote(&body)
    }
}

pub fn parse_quote(body: &str) -> Result<RemoteQuote> {
    let quote: RemoteQuote = serde_json::from_str(body).context("parse quote")?;
    if quote.content.trim().is_empty() {
        bail!("quote response has no content");
    }
    Ok(quote)
}

/// Open-Meteo: resolves a city through the geocoding endpoint, then asks the
/// forecast endpoint for current conditions at those coordinates.
pub struct OpenMeteoClient {
    client: Client,
    forecast_url: String,
    geocoding_url: String,
}

impl OpenMeteoClient {
    pub fn new(
        forecast_url: impl Into<String>,
        geocoding_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            forecast_url: forecast_url.into(),
            geocoding_url: geocoding_url.into(),
        })
    }

    fn locate(&self, city: &str) -> Result<(f64, f64)> {
        let url = Url::parse_with_params(
            &self.geocoding_url,
            &[("name", city), ("count", "1"), ("format", "json")],
        )
        .context("invalid geocoding url")?;
        let body = get_text(&self.client, url)?;
        parse_geocoding(&body).with_context(|| format!("locate {city}"))
    }
}

impl WeatherSource for OpenMeteoClient {
    fn current(&self, city: &str) -> Result<CurrentConditions> {
        let (lat, lon) = self.locate(city)?;
        let url = Url::parse_with_params(
            &self.forecast_url,
            &[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,apparent_temperature,wind_speed_10m,weather_code"
                        .to_string(),
                ),
                ("timezone", "auto".to_string()),
            ],
        )
        .context("invalid forecast url")?;
        let body = get_text(&self.client, url)?;
        parse_forecast(&body)
    }
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

pub fn parse_geocoding(body: &str) -> Result<(f64, f64)> {
    let resp: GeocodingResponse = serde_json::from_str(body).context("parse geocoding")?;
    match resp.results.first() {
        Some(r) => Ok((r.latitude, r.longitude)),
        None => bail!("city not found"),
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: ForecastCurrent,
}

#[derive(Deserialize)]
struct ForecastCurrent {
    temperature_2m: f64,
    apparent_temperature: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    weather_code: u16,
}

pub fn parse_forecast(body: &str) -> Result<CurrentConditions> {
    let resp: ForecastResponse = serde_json::from_str(body).context("parse forecast")?;
    let c = resp.current;
    Ok(CurrentConditions {
        temperature: c.temperature_2m,
        apparent_temperature: c.apparent_temperature,
        humidity: c.relative_humidity_2m,
        wind_speed: c.wind_speed_10m,
        weather_code: c.weather_code,
    })
}

/// Rate provider returning `{rates: {CODE: rate}}` for `<url>/<base>`.
pub struct ExchangeRateClient {
    client: Client,
    url: String,
}

impl ExchangeRateClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

impl RateSource for ExchangeRateClient {
    fn latest(&self, base: &str) -> Result<RateTable> {
        let url = Url::parse(&format!("{}/{}", self.url.trim_end_matches('/'), base))
            .context("invalid rates url")?;
        let body = get_text(&self.client, url)?;
        parse_rates(&body)
    }
}

#[derive(Deserialize)]
struct RatesResponse {
    rates: RateTable,
}

pub fn parse_rates(body: &str) -> Result<RateTable> {
    let resp: RatesResponse = serde_json::from_str(body).context("parse rates")?;
    Ok(resp.rates)
}

/// Providers configured from the settings file.
pub fn sources_from_settings(settings: &Settings) -> Result<Sources> {
    let timeout = settings.http_timeout();
    Ok(Sources {
        quotes: Some(Arc::new(QuotableClient::new(&settings.quote_url, timeout)?)),
        weather: Some(Arc::new(OpenMeteoClient::new(
            &settings.forecast_url,
            &settings.geocoding_url,
            timeout,
        )?)),
        rates: Some(Arc::new(ExchangeRateClient::new(&settings.rates_url, timeout)?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forecast_current_block() {
        let body = r#"{
            "latitude": 55.75,
            "current": {
                "time": "2024-01-01T12:00",
                "temperature_2m": -3.4,
                "relative_humidity_2m": 81,
                "apparent_temperature": -8.1,
                "wind_speed_10m": 12.5,
                "weather_code": 71
            }
        }"#;
        let c = parse_forecast(body).unwrap();
        assert_eq!(c.temperature, -3.4);
        assert_eq!(c.apparent_temperature, -8.1);
        assert_eq!(c.humidity, 81.0);
        assert_eq!(c.wind_speed, 12.5);
        assert_eq!(c.weather_code, 71);
    }

    #[test]
    fn geocoding_without_results_is_an_error() {
        assert!(parse_geocoding(r#"{"generationtime_ms": 0.5}"#).is_err());
        let (lat, lon) =
            parse_geocoding(r#"{"results": [{"name": "Berlin", "latitude": 52.52, "longitude": 13.41}]}"#)
                .unwrap();
        assert_eq!((lat, lon), (52.52, 13.41));
    }

    #[test]
    fn parses_rates_and_quotes() {
        let rates = parse_rates(r#"{"base": "RUB", "rates": {"RUB": 1, "USD": 0.0105}}"#).unwrap();
        assert_eq!(rates.get("USD"), Some(&0.0105));

        let quote = parse_quote(r#"{"_id": "x", "content": "Stay hungry.", "author": "Someone"}"#)
            .unwrap();
        assert_eq!(quote.author, "Someone");
        assert!(parse_quote(r#"{"content": "  ", "author": "Nobody"}"#).is_err());
        assert!(parse_quote("<html>").is_err());
    }
}
