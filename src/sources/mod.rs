//! External data collaborators used by the remote widget designs.
//!
//! The widgets only depend on the shapes defined here; the concrete HTTP
//! providers live in [`http`] and can be swapped for stubs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub mod http;

/// One quote as returned by a quote provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteQuote {
    pub content: String,
    pub author: String,
}

/// Current conditions as reported by a forecast provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    /// Provider specific condition code (WMO code for Open-Meteo).
    pub weather_code: u16,
}

/// Currency code to rate, relative to the requested base currency.
pub type RateTable = HashMap<String, f64>;

pub trait QuoteSource: Send + Sync {
    fn random_quote(&self) -> anyhow::Result<RemoteQuote>;
}

pub trait WeatherSource: Send + Sync {
    fn current(&self, city: &str) -> anyhow::Result<CurrentConditions>;
}

pub trait RateSource: Send + Sync {
    fn latest(&self, base: &str) -> anyhow::Result<RateTable>;
}

impl<F> QuoteSource for F
where
    F: Fn() -> anyhow::Result<RemoteQuote> + Send + Sync,
{
    fn random_quote(&self) -> anyhow::Result<RemoteQuote> {
        self()
    }
}

impl<F> WeatherSource for F
where
    F: Fn(&str) -> anyhow::Result<CurrentConditions> + Send + Sync,
{
    fn current(&self, city: &str) -> anyhow::Result<CurrentConditions> {
        self(city)
    }
}

impl<F> RateSource for F
where
    F: Fn(&str) -> anyhow::Result<RateTable> + Send + Sync,
{
    fn latest(&self, base: &str) -> anyhow::Result<RateTable> {
        self(base)
    }
}

/// The set of providers handed to widgets. A missing provider behaves like
/// one that always fails.
#[derive(Clone, Default)]
pub struct Sources {
    pub quotes: Option<Arc<dyn QuoteSource>>,
    pub weather: Option<Arc<dyn WeatherSource>>,
    pub rates: Option<Arc<dyn RateSource>>,
}

impl Sources {
    /// No providers at all; every remote fetch fails and widgets fall back.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_quotes(mut self, source: impl QuoteSource + 'static) -> Self {
        self.quotes = Some(Arc::new(source));
        self
    }

    pub fn with_weather(mut self, source: impl WeatherSource + 'static) -> Self {
        self.weather = Some(Arc::new(source));
        self
    }

    pub fn with_rates(mut self, source: impl RateSource + 'static) -> Self {
        self.rates = Some(Arc::new(source));
        self
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("quotes", &self.quotes.is_some())
            .field("weather", &self.weather.is_some())
            .field("rates", &self.rates.is_some())
            .finish()
    }
}
