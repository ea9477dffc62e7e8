use super::{PendingFetch, RefreshTimer, Widget, WidgetBase, WidgetContext};
use crate::dashboard::node::{Element, Region, Submit, WidgetEvent};
use crate::sources::{CurrentConditions, WeatherSource};
use anyhow::anyhow;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const SYNTHETIC_TEMPERATURES: [i32; 12] = [-5, -2, 0, 2, 5, 8, 12, 15, 10, 7, 3, -1];
const SYNTHETIC_CONDITIONS: [&str; 5] = ["Clear", "Partly cloudy", "Overcast", "Light rain", "Snow"];

static WEATHER_CODES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (0, "Clear sky"),
        (1, "Mainly clear"),
        (2, "Partly cloudy"),
        (3, "Overcast"),
        (45, "Fog"),
        (48, "Depositing rime fog"),
        (51, "Light drizzle"),
        (53, "Moderate drizzle"),
        (55, "Dense drizzle"),
        (61, "Slight rain"),
        (63, "Moderate rain"),
        (65, "Heavy rain"),
        (80, "Slight rain showers"),
        (81, "Moderate rain showers"),
        (82, "Violent rain showers"),
    ])
});

/// Display text for a WMO weather code. Unknown codes are not an error.
pub fn describe_weather_code(code: u16) -> &'static str {
    WEATHER_CODES.get(&code).copied().unwrap_or("Unknown")
}

/// One complete reading. A refresh replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f64,
    pub condition: String,
    pub wind: f64,
    pub humidity: f64,
    #[serde(rename = "feelsLike")]
    pub feels_like: f64,
}

impl Reading {
    pub fn from_conditions(c: &CurrentConditions) -> Self {
        Self {
            temperature: c.temperature,
            condition: describe_weather_code(c.weather_code).to_string(),
            wind: c.wind_speed,
            humidity: c.humidity,
            feels_like: c.apparent_temperature,
        }
    }

    /// Random reading drawn from the fixed tables.
    pub fn synthetic(rng: &mut impl Rng) -> Self {
        let temperature = *SYNTHETIC_TEMPERATURES.choose(rng).unwrap_or(&0);
        let condition = SYNTHETIC_CONDITIONS.choose(rng).copied().unwrap_or("Clear");
        Self {
            temperature: f64::from(temperature),
            condition: condition.to_string(),
            wind: f64::from(rng.gen_range(2..=7_i32)),
            humidity: f64::from(rng.gen_range(50..90_i32)),
            feels_like: f64::from(temperature - rng.gen_range(0..=2)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherMode {
    Remote,
    Synthetic,
}

impl Default for WeatherMode {
    fn default() -> Self {
        WeatherMode::Remote
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    #[serde(default)]
    pub mode: WeatherMode,
    #[serde(default)]
    pub city: String,
    #[serde(default, rename = "weatherData")]
    pub weather_data: Option<Reading>,
}

pub struct WeatherWidget {
    base: WidgetBase,
    mode: WeatherMode,
    city: String,
    reading: Option<Reading>,
    failed: bool,
    source: Option<Arc<dyn WeatherSource>>,
    pending: Option<PendingFetch<CurrentConditions>>,
    timer: Option<RefreshTimer>,
}

impl WeatherWidget {
    pub fn new(base: WidgetBase, data: WeatherData, ctx: &WidgetContext) -> Self {
        let city = match data.city.trim() {
            "" => ctx.default_city.clone(),
            city => city.to_string(),
        };
        Self {
            base,
            mode: data.mode,
            city,
            reading: data.weather_data,
            failed: false,
            source: ctx.sources.weather.clone(),
            pending: None,
            timer: ctx.auto_refresh.map(RefreshTimer::new),
        }
    }

    pub fn mode(&self) -> WeatherMode {
        self.mode
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.reading.as_ref()
    }

    /// True after the last remote fetch failed.
    pub fn has_error(&self) -> bool {
        self.failed
    }

    /// Replace the reading. Synthetic mode does so at once, remote mode
    /// starts a background fetch. Ignored while a fetch is in flight.
    pub fn refresh(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.touch();
        }
        match self.mode {
            WeatherMode::Synthetic => {
                self.apply(Ok(Reading::synthetic(&mut rand::thread_rng())));
            }
            WeatherMode::Remote => {
                let source = self.source.clone();
                let city = self.city.clone();
                self.pending = Some(PendingFetch::spawn(move || {
                    request(source.as_deref(), &city)
                }));
                self.update_ui();
            }
        }
        true
    }

    /// Same as [`WeatherWidget::refresh`] but waits for the result.
    pub fn refresh_now(&mut self) {
        match self.mode {
            WeatherMode::Synthetic => {
                self.refresh();
            }
            WeatherMode::Remote => {
                self.pending = None;
                let res = request(self.source.as_deref(), &self.city);
                self.apply(res.map(|c| Reading::from_conditions(&c)));
            }
        }
    }

    /// Switch to another city and refresh. Blank input is ignored.
    pub fn search_city(&mut self, city: &str) -> bool {
        let city = city.trim();
        if city.is_empty() {
            return false;
        }
        tracing::info!(id = %self.base.id(), city, "weather city changed");
        self.city = city.to_string();
        self.pending = None;
        self.refresh()
    }

    fn apply(&mut self, res: anyhow::Result<Reading>) {
        match res {
            Ok(reading) => {
                self.reading = Some(reading);
                self.failed = false;
            }
            Err(err) => {
                tracing::warn!(id = %self.base.id(), city = %self.city, "weather fetch failed: {err:#}");
                self.reading = None;
                self.failed = true;
            }
        }
        self.update_ui();
        self.base.notify_state_changed();
    }

    fn info_region(&self) -> Region {
        let mut info = vec![Element::Heading(self.city.clone())];
        match &self.reading {
            Some(r) => {
                info.push(Element::text(format!("{:.0}°C", r.temperature)));
                info.push(Element::text(r.condition.clone()));
                info.push(detail("Wind:", format!("{:.0} m/s", r.wind)));
                info.push(detail("Humidity:", format!("{:.0}%", r.humidity)));
                info.push(detail("Feels like:", format!("{:.0}°C", r.feels_like)));
            }
            None if self.failed => info.push(Element::Error(format!(
                "Could not load weather for {}",
                self.city
            ))),
            None => info.push(Element::text("Loading weather...")),
        }
        Region::new("info", info)
    }

    fn actions_region(&self) -> Region {
        Region::new(
            "actions",
            vec![Element::busy_button("Refresh", WidgetEvent::Refresh, self.is_busy())],
        )
    }
}

fn detail(label: &str, value: String) -> Element {
    Element::Detail {
        label: label.to_string(),
        value,
    }
}

fn request(source: Option<&dyn WeatherSource>, city: &str) -> anyhow::Result<CurrentConditions> {
    source
        .ok_or_else(|| anyhow!("no weather source configured"))?
        .current(city)
}

impl Widget for WeatherWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn render_content(&self) -> Vec<Region> {
        let mut regions = Vec::with_capacity(3);
        if self.mode == WeatherMode::Remote {
            regions.push(Region::new(
                "search",
                vec![Element::Input {
                    name: "city",
                    value: String::new(),
                    placeholder: "City...".into(),
                    submit: Submit::SearchCity,
                    submit_label: "Search".into(),
                }],
            ));
        }
        regions.push(self.info_region());
        regions.push(self.actions_region());
        regions
    }

    // Keeps the search input (and whatever the user typed) in place.
    fn update_ui(&mut self) {
        let info = self.info_region();
        let actions = self.actions_region();
        if let Some(node) = self.base.node_mut() {
            node.replace_region(info);
            node.replace_region(actions);
        }
    }

    fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Refresh => {
                self.refresh();
            }
            WidgetEvent::SearchCity(city) => {
                self.search_city(&city);
            }
            other => tracing::debug!(?other, "weather widget ignores event"),
        }
    }

    fn data(&self) -> Value {
        json!({
            "mode": self.mode,
            "city": self.city,
            "weatherData": self.reading,
        })
    }

    fn mounted(&mut self) {
        if self.mode == WeatherMode::Remote || self.reading.is_none() {
            self.refresh();
        }
    }

    fn poll(&mut self) -> bool {
        let due = !self.is_busy() && self.timer.as_ref().is_some_and(RefreshTimer::should_refresh);
        let mut changed = false;
        if due {
            tracing::debug!(id = %self.base.id(), "weather auto refresh");
            changed = self.refresh() && self.mode == WeatherMode::Synthetic;
        }
        if let Some(res) = self.pending.as_ref().and_then(PendingFetch::try_take) {
            self.pending = None;
            self.apply(res.map(|c| Reading::from_conditions(&c)));
            changed = true;
        }
        changed
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}
