use crate::dashboard::config::{WidgetConfig, WidgetSnapshot};
use crate::dashboard::error::DashboardError;
use crate::dashboard::node::{Region, WidgetEvent, WidgetNode};
use crate::settings::Settings;
use crate::sources::Sources;
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod currency;
mod notes;
mod quote;
mod todo;
mod weather;

pub use currency::{CurrencyData, CurrencyMode, CurrencyWidget, CURRENCY_CODES, FALLBACK_RATES};
pub use notes::{NotesData, NotesWidget};
pub use quote::{LocalQuote, QuoteData, QuoteMode, QuoteWidget, LOCAL_QUOTES, QUOTE_FALLBACK};
pub use todo::{Task, TodoData, TodoWidget};
pub use weather::{describe_weather_code, Reading, WeatherData, WeatherMode, WeatherWidget};

/// Closed set of widget variants. The lowercase name is the persisted tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Todo,
    Quote,
    Weather,
    Notes,
    Currency,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 5] = [
        WidgetKind::Todo,
        WidgetKind::Quote,
        WidgetKind::Weather,
        WidgetKind::Notes,
        WidgetKind::Currency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Todo => "todo",
            WidgetKind::Quote => "quote",
            WidgetKind::Weather => "weather",
            WidgetKind::Notes => "notes",
            WidgetKind::Currency => "currency",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            WidgetKind::Todo => "To-do list",
            WidgetKind::Quote => "Random quote",
            WidgetKind::Weather => "Weather",
            WidgetKind::Notes => "Notes",
            WidgetKind::Currency => "Exchange rates",
        }
    }
}

impl FromStr for WidgetKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DashboardError::UnknownKind(s.to_string()))
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `widget-<millis>-<9 base36 chars>`.
pub fn generate_widget_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("widget-{}-{suffix}", chrono::Utc::now().timestamp_millis())
}

pub type DestroyedHook = Arc<dyn Fn(&str) + Send + Sync>;
pub type StateChangedHook = Arc<dyn Fn() + Send + Sync>;

/// Notifications an owner can register on a widget.
#[derive(Clone, Default)]
pub struct WidgetHooks {
    pub on_destroyed: Option<DestroyedHook>,
    pub on_state_changed: Option<StateChangedHook>,
}

/// State shared by every variant: identity, title, minimized flag and the
/// single node the widget currently owns.
pub struct WidgetBase {
    id: String,
    title: String,
    kind: WidgetKind,
    minimized: bool,
    element: Option<WidgetNode>,
    hooks: WidgetHooks,
}

impl WidgetBase {
    /// Reuses the configured id and title when present and non-empty.
    pub fn new(kind: WidgetKind, config: &WidgetConfig) -> Self {
        let id = config
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_widget_id);
        let title = config
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(kind.default_title())
            .to_string();
        Self {
            id,
            title,
            kind,
            minimized: false,
            element: None,
            hooks: WidgetHooks::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn node(&self) -> Option<&WidgetNode> {
        self.element.as_ref()
    }

    pub fn node_mut(&mut self) -> Option<&mut WidgetNode> {
        self.element.as_mut()
    }

    pub fn set_hooks(&mut self, hooks: WidgetHooks) {
        self.hooks = hooks;
    }

    pub fn notify_state_changed(&self) {
        if let Some(cb) = &self.hooks.on_state_changed {
            cb();
        }
    }

    fn mount(&mut self, regions: Vec<Region>) -> &WidgetNode {
        if self.element.is_some() {
            tracing::debug!(id = %self.id, "widget rendered twice; replacing its node");
        }
        let node = WidgetNode::new(&self.id, self.kind, &self.title, !self.minimized, regions);
        self.element.insert(node)
    }

    fn replace_body(&mut self, regions: Vec<Region>) {
        if let Some(node) = self.element.as_mut() {
            node.body.regions = regions;
        }
    }

    fn toggle_minimized(&mut self) {
        self.minimized = !self.minimized;
        if let Some(node) = self.element.as_mut() {
            node.body.visible = !self.minimized;
        }
    }

    fn release(&mut self) {
        let Some(node) = self.element.take() else {
            return;
        };
        drop(node);
        tracing::debug!(id = %self.id, "widget destroyed");
        if let Some(cb) = &self.hooks.on_destroyed {
            cb(&self.id);
        }
    }
}

/// Widget contract implemented by all dashboard variants.
pub trait Widget: Send {
    fn base(&self) -> &WidgetBase;

    fn base_mut(&mut self) -> &mut WidgetBase;

    /// Body regions reflecting the current state.
    fn render_content(&self) -> Vec<Region>;

    /// Variant specific input. Window controls are handled by [`Widget::handle`].
    fn handle_event(&mut self, event: WidgetEvent);

    /// Variant state in its persisted shape.
    fn data(&self) -> Value;

    /// Called once the dashboard has attached the widget.
    fn mounted(&mut self) {}

    /// Apply finished background work. Returns true when state changed.
    fn poll(&mut self) -> bool {
        false
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn id(&self) -> &str {
        self.base().id()
    }

    fn title(&self) -> &str {
        self.base().title()
    }

    fn kind(&self) -> WidgetKind {
        self.base().kind()
    }

    fn node(&self) -> Option<&WidgetNode> {
        self.base().node()
    }

    /// Build the widget's node (header plus body) and keep it as the live one.
    fn render(&mut self) -> &WidgetNode {
        let regions = self.render_content();
        self.base_mut().mount(regions)
    }

    /// Regenerate the body. The header and its controls are left alone.
    fn update_ui(&mut self) {
        if self.base().node().is_none() {
            return;
        }
        let regions = self.render_content();
        self.base_mut().replace_body(regions);
    }

    fn toggle_minimize(&mut self) {
        self.base_mut().toggle_minimized();
    }

    /// Release the node, then tell the owner. No-op without a node.
    fn destroy(&mut self) {
        self.base_mut().release();
    }

    fn set_hooks(&mut self, hooks: WidgetHooks) {
        self.base_mut().set_hooks(hooks);
    }

    fn handle(&mut self, event: WidgetEvent) {
        tracing::debug!(id = %self.id(), ?event, "widget event");
        match event {
            WidgetEvent::Minimize => self.toggle_minimize(),
            WidgetEvent::Close => self.destroy(),
            other => self.handle_event(other),
        }
    }

    fn snapshot(&self) -> WidgetSnapshot {
        WidgetSnapshot {
            kind: self.kind().as_str().to_string(),
            id: self.id().to_string(),
            title: self.title().to_string(),
            data: self.data(),
        }
    }
}

/// Environment handed to widget constructors.
#[derive(Clone, Debug)]
pub struct WidgetContext {
    pub sources: Sources,
    pub default_city: String,
    pub base_currency: String,
    pub auto_refresh: Option<Duration>,
}

impl Default for WidgetContext {
    fn default() -> Self {
        Self::offline()
    }
}

impl WidgetContext {
    pub fn offline() -> Self {
        let defaults = Settings::default();
        Self {
            sources: Sources::offline(),
            default_city: defaults.default_city,
            base_currency: defaults.base_currency,
            auto_refresh: None,
        }
    }

    pub fn from_settings(settings: &Settings, sources: Sources) -> Self {
        Self {
            sources,
            default_city: settings.default_city.clone(),
            base_currency: settings.base_currency.clone(),
            auto_refresh: settings.auto_refresh(),
        }
    }

    pub fn with_sources(mut self, sources: Sources) -> Self {
        self.sources = sources;
        self
    }
}

type Ctor = Arc<dyn Fn(WidgetBase, &Value, &WidgetContext) -> Box<dyn Widget> + Send + Sync>;

/// Descriptor for building one variant from its persisted data.
#[derive(Clone)]
pub struct WidgetDescriptor {
    ctor: Ctor,
    default_data: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl WidgetDescriptor {
    pub fn new<T, D>(build: fn(WidgetBase, D, &WidgetContext) -> T) -> Self
    where
        T: Widget + 'static,
        D: DeserializeOwned + Serialize + Default + 'static,
    {
        let ctor = move |base: WidgetBase, v: &Value, ctx: &WidgetContext| -> Box<dyn Widget> {
            let data = if v.is_null() {
                D::default()
            } else {
                serde_json::from_value::<D>(v.clone()).unwrap_or_else(|err| {
                    tracing::warn!(id = %base.id(), "invalid widget data, using defaults: {err}");
                    D::default()
                })
            };
            Box::new(build(base, data, ctx))
        };
        Self {
            ctor: Arc::new(ctor),
            default_data: Arc::new(|| {
                serde_json::to_value(D::default()).unwrap_or_else(|_| json!({}))
            }),
        }
    }

    pub fn default_data(&self) -> Value {
        (self.default_data)()
    }

    pub fn create(&self, base: WidgetBase, data: &Value, ctx: &WidgetContext) -> Box<dyn Widget> {
        (self.ctor)(base, data, ctx)
    }
}

/// Lookup table from kind to constructor; the single place a variant is
/// registered.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    map: HashMap<WidgetKind, WidgetDescriptor>,
}

impl WidgetRegistry {
    pub fn with_defaults() -> Self {
        let mut reg = Self::default();
        reg.register(WidgetKind::Todo, WidgetDescriptor::new(TodoWidget::new));
        reg.register(WidgetKind::Quote, WidgetDescriptor::new(QuoteWidget::new));
        reg.register(WidgetKind::Weather, WidgetDescriptor::new(WeatherWidget::new));
        reg.register(WidgetKind::Notes, WidgetDescriptor::new(NotesWidget::new));
        reg.register(WidgetKind::Currency, WidgetDescriptor::new(CurrencyWidget::new));
        reg
    }

    pub fn register(&mut self, kind: WidgetKind, descriptor: WidgetDescriptor) {
        self.map.insert(kind, descriptor);
    }

    pub fn contains(&self, kind: WidgetKind) -> bool {
        self.map.contains_key(&kind)
    }

    /// Registered kinds in toolbar order.
    pub fn kinds(&self) -> Vec<WidgetKind> {
        WidgetKind::ALL
            .into_iter()
            .filter(|k| self.map.contains_key(k))
            .collect()
    }

    pub fn default_data(&self, kind: WidgetKind) -> Option<Value> {
        self.map.get(&kind).map(|d| d.default_data())
    }

    pub fn create(
        &self,
        kind: WidgetKind,
        config: &WidgetConfig,
        ctx: &WidgetContext,
    ) -> Option<Box<dyn Widget>> {
        let descriptor = self.map.get(&kind)?;
        let base = WidgetBase::new(kind, config);
        Some(descriptor.create(base, &config.data, ctx))
    }
}

/// Periodic refresh bookkeeping.
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    pub last_refresh: Instant,
    pub interval: Duration,
}

impl RefreshTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_refresh: Instant::now(),
            interval,
        }
    }

    pub fn should_refresh(&self) -> bool {
        self.last_refresh.elapsed() >= self.interval
    }

    pub fn touch(&mut self) {
        self.last_refresh = Instant::now();
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn invalidate(&mut self) {
        self.last_refresh = Instant::now()
            .checked_sub(self.interval)
            .unwrap_or_else(Instant::now);
    }
}

/// A fetch running on a worker thread.
pub struct PendingFetch<T> {
    rx: Receiver<anyhow::Result<T>>,
}

impl<T: Send + 'static> PendingFetch<T> {
    pub fn spawn(job: impl FnOnce() -> anyhow::Result<T> + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(job());
        });
        Self { rx }
    }

    /// The result once the worker finished. A worker that died without
    /// answering counts as a failed fetch.
    pub fn try_take(&self) -> Option<anyhow::Result<T>> {
        match self.rx.try_recv() {
            Ok(res) => Some(res),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(anyhow::anyhow!("fetch worker exited without a result")))
            }
        }
    }
}
