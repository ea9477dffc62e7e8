use super::{PendingFetch, RefreshTimer, Widget, WidgetBase, WidgetContext};
use crate::dashboard::node::{Element, Region, WidgetEvent};
use crate::sources::{RateSource, RateTable};
use anyhow::{anyhow, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CURRENCY_CODES: [&str; 3] = ["USD", "EUR", "GBP"];

/// Shown whenever live rates cannot be obtained.
pub const FALLBACK_RATES: [(&str, &str); 3] = [("USD", "95.45"), ("EUR", "102.30"), ("GBP", "118.20")];

const MISSING_RATE: &str = "—";

fn fallback_rates() -> BTreeMap<String, String> {
    FALLBACK_RATES
        .iter()
        .map(|(code, rate)| (code.to_string(), rate.to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyMode {
    Remote,
    /// Offline: every refresh nudges all rates by one shared random delta.
    Demo,
}

impl Default for CurrencyMode {
    fn default() -> Self {
        CurrencyMode::Remote
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyData {
    #[serde(default)]
    pub mode: CurrencyMode,
    /// Code to rate against the base currency, as a two decimal string.
    #[serde(default)]
    pub rates: BTreeMap<String, String>,
}

pub struct CurrencyWidget {
    base: WidgetBase,
    mode: CurrencyMode,
    base_currency: String,
    rates: BTreeMap<String, String>,
    source: Option<Arc<dyn RateSource>>,
    pending: Option<PendingFetch<RateTable>>,
    timer: Option<RefreshTimer>,
}

impl CurrencyWidget {
    pub fn new(base: WidgetBase, data: CurrencyData, ctx: &WidgetContext) -> Self {
        let mut rates = data.rates;
        rates.retain(|code, _| CURRENCY_CODES.contains(&code.as_str()));
        if data.mode == CurrencyMode::Demo && rates.is_empty() {
            rates = fallback_rates();
        }
        Self {
            base,
            mode: data.mode,
            base_currency: ctx.base_currency.clone(),
            rates,
            source: ctx.sources.rates.clone(),
            pending: None,
            timer: ctx.auto_refresh.map(RefreshTimer::new),
        }
    }

    pub fn mode(&self) -> CurrencyMode {
        self.mode
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn rates(&self) -> &BTreeMap<String, String> {
        &self.rates
    }

    pub fn rate(&self, code: &str) -> Option<&str> {
        self.rates.get(code).map(String::as_str)
    }

    /// Replace the rates. Remote mode fetches in the background and is
    /// ignored while a fetch is in flight; demo mode applies at once.
    pub fn refresh(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.touch();
        }
        match self.mode {
            CurrencyMode::Demo => {
                let delta = rand::thread_rng().gen_range(-1.0..1.0);
                self.rates = perturb(&self.rates, delta);
                self.changed();
            }
            CurrencyMode::Remote => {
                let source = self.source.clone();
                let base = self.base_currency.clone();
                self.pending = Some(PendingFetch::spawn(move || {
                    request(source.as_deref(), &base)
                }));
                self.update_ui();
            }
        }
        true
    }

    /// Same as [`CurrencyWidget::refresh`] but waits for the result.
    pub fn refresh_now(&mut self) {
        match self.mode {
            CurrencyMode::Demo => {
                self.refresh();
            }
            CurrencyMode::Remote => {
                self.pending = None;
                let res = request(self.source.as_deref(), &self.base_currency);
                self.apply(res);
            }
        }
    }

    fn apply(&mut self, res: anyhow::Result<RateTable>) {
        self.rates = match res.and_then(|table| invert_rates(&table)) {
            Ok(rates) => rates,
            Err(err) => {
                tracing::warn!(id = %self.base.id(), "rate fetch failed, using fallback rates: {err:#}");
                fallback_rates()
            }
        };
        self.changed();
    }

    fn changed(&mut self) {
        self.update_ui();
        self.base.notify_state_changed();
    }
}

fn request(source: Option<&dyn RateSource>, base: &str) -> anyhow::Result<RateTable> {
    source
        .ok_or_else(|| anyhow!("no rate source configured"))?
        .latest(base)
}

/// Turns "one base buys N units" into "one unit costs N base", two decimals.
/// Every tracked code has to be present and positive.
pub(crate) fn invert_rates(table: &RateTable) -> anyhow::Result<BTreeMap<String, String>> {
    let mut rates = BTreeMap::new();
    for code in CURRENCY_CODES {
        let Some(rate) = table.get(code).copied() else {
            bail!("rate table has no {code}");
        };
        if !rate.is_finite() || rate <= 0.0 {
            bail!("invalid {code} rate {rate}");
        }
        rates.insert(code.to_string(), format!("{:.2}", 1.0 / rate));
    }
    Ok(rates)
}

fn perturb(rates: &BTreeMap<String, String>, delta: f64) -> BTreeMap<String, String> {
    FALLBACK_RATES
        .iter()
        .map(|(code, fallback)| {
            let current = rates
                .get(*code)
                .and_then(|r| r.parse::<f64>().ok())
                .or_else(|| fallback.parse().ok())
                .unwrap_or_default();
            (code.to_string(), format!("{:.2}", current + delta))
        })
        .collect()
}

impl Widget for CurrencyWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn render_content(&self) -> Vec<Region> {
        let rates = if self.rates.is_empty() {
            vec![Element::text("Loading rates...")]
        } else {
            CURRENCY_CODES
                .iter()
                .map(|code| Element::Detail {
                    label: format!("{code}/{}:", self.base_currency),
                    value: self.rate(code).unwrap_or(MISSING_RATE).to_string(),
                })
                .collect()
        };
        vec![
            Region::new("rates", rates),
            Region::new(
                "actions",
                vec![Element::busy_button("Refresh", WidgetEvent::Refresh, self.is_busy())],
            ),
        ]
    }

    fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Refresh => {
                self.refresh();
            }
            other => tracing::debug!(?other, "currency widget ignores event"),
        }
    }

    fn data(&self) -> Value {
        json!({ "mode": self.mode, "rates": self.rates })
    }

    /// Remote rates are re-fetched on every mount; restored values stay
    /// on screen until the answer arrives.
    fn mounted(&mut self) {
        if self.mode == CurrencyMode::Remote || self.rates.is_empty() {
            self.refresh();
        }
    }

    fn poll(&mut self) -> bool {
        let due = !self.is_busy() && self.timer.as_ref().is_some_and(RefreshTimer::should_refresh);
        let mut changed = false;
        if due {
            tracing::debug!(id = %self.base.id(), "currency auto refresh");
            changed = self.refresh() && self.mode == CurrencyMode::Demo;
        }
        if let Some(res) = self.pending.as_ref().and_then(PendingFetch::try_take) {
            self.pending = None;
            self.apply(res);
            changed = true;
        }
        changed
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::config::WidgetConfig;
    use crate::dashboard::widgets::WidgetKind;
    use crate::sources::Sources;

    fn widget(data: CurrencyData, ctx: &WidgetContext) -> CurrencyWidget {
        let base = WidgetBase::new(WidgetKind::Currency, &WidgetConfig::default());
        CurrencyWidget::new(base, data, ctx)
    }

    fn table(pairs: &[(&str, f64)]) -> RateTable {
        pairs.iter().map(|(c, r)| (c.to_string(), *r)).collect()
    }

    #[test]
    fn rates_are_inverted_to_two_decimals() {
        let rates = invert_rates(&table(&[("USD", 0.0105), ("EUR", 0.0098), ("GBP", 0.0084), ("JPY", 1.6)]))
            .unwrap();
        assert_eq!(rates["USD"], "95.24");
        assert_eq!(rates["EUR"], "102.04");
        assert_eq!(rates["GBP"], "119.05");
        assert_eq!(rates.len(), 3);
    }

    #[test]
    fn incomplete_table_is_rejected() {
        assert!(invert_rates(&table(&[("USD", 0.01), ("EUR", 0.01)])).is_err());
        assert!(invert_rates(&table(&[("USD", 0.0), ("EUR", 0.01), ("GBP", 0.01)])).is_err());
    }

    #[test]
    fn missing_source_yields_fallback() {
        let mut w = widget(CurrencyData::default(), &WidgetContext::offline());
        w.refresh_now();
        assert_eq!(w.rates(), &fallback_rates());
    }

    #[test]
    fn partial_response_yields_fallback() {
        let source = |_base: &str| -> anyhow::Result<RateTable> { Ok(table(&[("USD", 0.01)])) };
        let ctx = WidgetContext::offline().with_sources(Sources::offline().with_rates(source));
        let mut w = widget(CurrencyData::default(), &ctx);
        w.refresh_now();
        assert_eq!(w.rate("EUR"), Some("102.30"));
    }

    #[test]
    fn demo_moves_every_rate_by_the_same_delta() {
        let before = fallback_rates();
        let after = perturb(&before, 0.5);
        assert_eq!(after["USD"], "95.95");
        assert_eq!(after["EUR"], "102.80");
        assert_eq!(after["GBP"], "118.70");
    }

    #[test]
    fn demo_mode_starts_from_fallback() {
        let data = CurrencyData {
            mode: CurrencyMode::Demo,
            rates: BTreeMap::new(),
        };
        let mut w = widget(data, &WidgetContext::offline());
        assert_eq!(w.rates().len(), 3);
        w.refresh_now();
        assert_eq!(w.rates().len(), 3);
        assert!(!w.is_busy());
    }

    #[test]
    fn missing_code_renders_dash() {
        let data = CurrencyData {
            mode: CurrencyMode::Remote,
            rates: BTreeMap::from([("USD".to_string(), "90.00".to_string())]),
        };
        let mut w = widget(data, &WidgetContext::offline());
        let rates = &w.render().region("rates").unwrap().elements;
        assert_eq!(
            rates[1],
            Element::Detail {
                label: "EUR/RUB:".into(),
                value: "—".into(),
            }
        );
    }

    #[test]
    fn empty_rates_show_loading_text() {
        let mut w = widget(CurrencyData::default(), &WidgetContext::offline());
        assert_eq!(w.render().body_text(), "Loading rates...\nRefresh");
    }
}
