use crate::dashboard::config::{parse_snapshots, snapshots_to_json, WidgetConfig, WidgetSnapshot};
use crate::dashboard::error::DashboardError;
use crate::dashboard::node::{WidgetEvent, WidgetNode};
use crate::dashboard::widgets::{Widget, WidgetContext, WidgetHooks, WidgetKind, WidgetRegistry};
use crate::storage::{StateStore, STATE_KEY};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Something a widget reported through its hooks, handled after the event
/// that caused it has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    Destroyed(String),
    StateChanged,
}

type NoticeQueue = Arc<Mutex<Vec<Notice>>>;

fn push_notice(queue: &NoticeQueue, notice: Notice) {
    match queue.lock() {
        Ok(mut q) => q.push(notice),
        Err(poisoned) => poisoned.into_inner().push(notice),
    }
}

/// Ordered collection of live widgets plus their persistence.
pub struct Dashboard {
    widgets: Vec<Box<dyn Widget>>,
    registry: WidgetRegistry,
    store: Box<dyn StateStore>,
    ctx: WidgetContext,
    notices: NoticeQueue,
    initialized: bool,
    pub warnings: Vec<String>,
}

impl Dashboard {
    /// An empty dashboard. Automatic saves stay off until
    /// [`Dashboard::load_state`] has run once.
    pub fn new(store: Box<dyn StateStore>, registry: WidgetRegistry, ctx: WidgetContext) -> Self {
        Self {
            widgets: Vec::new(),
            registry,
            store,
            ctx,
            notices: Arc::new(Mutex::new(Vec::new())),
            initialized: false,
            warnings: Vec::new(),
        }
    }

    /// Construct and restore the saved layout.
    pub fn open(store: Box<dyn StateStore>, registry: WidgetRegistry, ctx: WidgetContext) -> Self {
        let mut dashboard = Self::new(store, registry, ctx);
        dashboard.load_state();
        dashboard
    }

    /// Hand the collected warnings to the caller, leaving none behind.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn widgets(&self) -> &[Box<dyn Widget>] {
        &self.widgets
    }

    pub fn widget(&self, id: &str) -> Option<&dyn Widget> {
        self.widgets.iter().find(|w| w.id() == id).map(|w| w.as_ref())
    }

    pub fn ids(&self) -> Vec<String> {
        self.widgets.iter().map(|w| w.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Nodes of every mounted widget in dashboard order.
    pub fn nodes(&self) -> Vec<&WidgetNode> {
        self.widgets.iter().filter_map(|w| w.node()).collect()
    }

    pub fn is_busy(&self) -> bool {
        self.widgets.iter().any(|w| w.is_busy())
    }

    pub fn snapshot(&self) -> Vec<WidgetSnapshot> {
        self.widgets.iter().map(|w| w.snapshot()).collect()
    }

    /// Create a widget of `kind`, mount it at the end and save.
    pub fn add_widget(&mut self, kind: &str, config: WidgetConfig) -> Result<String, DashboardError> {
        let kind: WidgetKind = kind.parse().map_err(|err: DashboardError| {
            tracing::error!("cannot add widget: {err}");
            err
        })?;
        let widget = self.build(kind, &config)?;
        let id = widget.id().to_string();
        self.attach(widget);
        tracing::info!(%id, %kind, "widget added");
        self.drain_notices();
        self.persist();
        Ok(id)
    }

    /// Destroy and drop the widget with `id`. Returns false if it is unknown.
    pub fn remove_widget(&mut self, id: &str) -> bool {
        let Some(pos) = self.widgets.iter().position(|w| w.id() == id) else {
            tracing::debug!(%id, "remove_widget: no such widget");
            return false;
        };
        let mut widget = self.widgets.remove(pos);
        widget.destroy();
        tracing::info!(%id, "widget removed");
        self.drain_notices();
        self.persist();
        true
    }

    /// Route host input to one widget and apply whatever it reported.
    pub fn dispatch(&mut self, id: &str, event: WidgetEvent) -> bool {
        let Some(widget) = self.widgets.iter_mut().find(|w| w.id() == id) else {
            tracing::debug!(%id, ?event, "event for unknown widget");
            return false;
        };
        widget.handle(event);
        self.process_notices();
        true
    }

    /// Apply finished background fetches and due auto refreshes. Hosts call
    /// this once per frame.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for widget in &mut self.widgets {
            changed |= widget.poll();
        }
        self.process_notices() || changed
    }

    /// Write the whole collection to the store. Failures are logged and
    /// recorded in [`Dashboard::warnings`], never returned.
    pub fn save_state(&mut self) -> bool {
        let result = snapshots_to_json(&self.snapshot())
            .and_then(|json| self.store.set(STATE_KEY, &json));
        match result {
            Ok(()) => {
                tracing::debug!(widgets = self.widgets.len(), "dashboard state saved");
                true
            }
            Err(err) => {
                tracing::error!("failed to save dashboard state: {err:#}");
                self.warnings.push(format!("failed to save dashboard state: {err:#}"));
                false
            }
        }
    }

    /// Replace the live widgets with the stored snapshot. A corrupt entry is
    /// dropped from the store and the dashboard carries on as it was.
    /// Returns the number of widgets restored.
    pub fn load_state(&mut self) -> usize {
        let restored = self.restore();
        self.initialized = true;
        restored
    }

    fn restore(&mut self) -> usize {
        let content = match self.store.get(STATE_KEY) {
            Ok(Some(content)) => content,
            Ok(None) => {
                tracing::debug!("no saved dashboard state");
                return 0;
            }
            Err(err) => {
                tracing::warn!("failed to read dashboard state: {err:#}");
                self.warnings.push(format!("failed to read dashboard state: {err:#}"));
                return 0;
            }
        };
        let snapshots = match parse_snapshots(&content) {
            Ok(snapshots) => snapshots,
            Err(err) => {
                tracing::warn!("discarding corrupt dashboard state: {err:#}");
                self.warnings.push(format!("discarding corrupt dashboard state: {err:#}"));
                if let Err(err) = self.store.remove(STATE_KEY) {
                    tracing::warn!("failed to remove corrupt dashboard state: {err:#}");
                }
                return 0;
            }
        };

        self.detach_all();
        let mut seen = HashSet::new();
        for snap in snapshots {
            if !seen.insert(snap.id.clone()) {
                self.skip_snapshot(&snap, DashboardError::DuplicateId(snap.id.clone()));
                continue;
            }
            let widget = snap
                .kind
                .parse::<WidgetKind>()
                .and_then(|kind| self.build(kind, &snap.to_config()));
            match widget {
                Ok(widget) => self.attach(widget),
                Err(err) => self.skip_snapshot(&snap, err),
            }
        }
        self.drain_notices();
        tracing::info!(widgets = self.widgets.len(), "dashboard state restored");
        self.widgets.len()
    }

    fn skip_snapshot(&mut self, snap: &WidgetSnapshot, err: DashboardError) {
        tracing::warn!(id = %snap.id, "skipping saved widget: {err}");
        self.warnings.push(format!("skipped saved widget '{}': {err}", snap.id));
    }

    /// Destroy every widget and erase the stored state.
    pub fn clear_all(&mut self) {
        self.detach_all();
        self.drain_notices();
        if let Err(err) = self.store.remove(STATE_KEY) {
            tracing::error!("failed to erase dashboard state: {err:#}");
            self.warnings.push(format!("failed to erase dashboard state: {err:#}"));
        }
        tracing::info!("dashboard cleared");
    }

    fn build(&self, kind: WidgetKind, config: &WidgetConfig) -> Result<Box<dyn Widget>, DashboardError> {
        if let Some(id) = config.id.as_deref() {
            if self.widgets.iter().any(|w| w.id() == id) {
                return Err(DashboardError::DuplicateId(id.to_string()));
            }
        }
        self.registry
            .create(kind, config, &self.ctx)
            .ok_or_else(|| DashboardError::UnknownKind(kind.to_string()))
    }

    fn attach(&mut self, mut widget: Box<dyn Widget>) {
        let destroyed = Arc::clone(&self.notices);
        let changed = Arc::clone(&self.notices);
        widget.set_hooks(WidgetHooks {
            on_destroyed: Some(Arc::new(move |id: &str| {
                push_notice(&destroyed, Notice::Destroyed(id.to_string()));
            })),
            on_state_changed: Some(Arc::new(move || {
                push_notice(&changed, Notice::StateChanged);
            })),
        });
        widget.render();
        widget.mounted();
        self.widgets.push(widget);
    }

    fn detach_all(&mut self) {
        for mut widget in self.widgets.drain(..) {
            widget.destroy();
        }
    }

    fn drain_notices(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut q) => std::mem::take(&mut *q),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Apply queued notices; saves once if anything changed.
    fn process_notices(&mut self) -> bool {
        let notices = self.drain_notices();
        if notices.is_empty() {
            return false;
        }
        for notice in &notices {
            if let Notice::Destroyed(id) = notice {
                self.widgets.retain(|w| w.id() != id);
                tracing::info!(%id, "widget closed");
            }
        }
        self.persist();
        true
    }

    /// Save unless the initial restore has not happened yet.
    fn persist(&mut self) {
        if self.initialized {
            self.save_state();
        } else {
            tracing::debug!("save skipped until state is loaded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn dashboard(store: &MemoryStore) -> Dashboard {
        Dashboard::open(
            Box::new(store.clone()),
            WidgetRegistry::with_defaults(),
            WidgetContext::offline(),
        )
    }

    fn saved(store: &MemoryStore) -> Vec<WidgetSnapshot> {
        let text = store.get(STATE_KEY).unwrap().unwrap_or_else(|| "[]".into());
        parse_snapshots(&text).unwrap()
    }

    #[test]
    fn unknown_kind_adds_nothing() {
        let store = MemoryStore::default();
        let mut dash = dashboard(&store);
        let err = dash.add_widget("clock", WidgetConfig::default()).unwrap_err();
        assert_eq!(err, DashboardError::UnknownKind("clock".into()));
        assert!(dash.is_empty());
        assert!(store.get(STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = MemoryStore::default();
        let mut dash = dashboard(&store);
        dash.add_widget("notes", WidgetConfig::default().with_id("n")).unwrap();
        let err = dash
            .add_widget("todo", WidgetConfig::default().with_id("n"))
            .unwrap_err();
        assert_eq!(err, DashboardError::DuplicateId("n".into()));
        assert_eq!(dash.len(), 1);
    }

    #[test]
    fn close_control_removes_and_saves() {
        let store = MemoryStore::default();
        let mut dash = dashboard(&store);
        let a = dash.add_widget("notes", WidgetConfig::default()).unwrap();
        let b = dash.add_widget("todo", WidgetConfig::default()).unwrap();
        assert!(dash.dispatch(&a, WidgetEvent::Close));
        assert_eq!(dash.ids(), vec![b.clone()]);
        let ids: Vec<_> = saved(&store).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn widget_mutation_is_persisted() {
        let store = MemoryStore::default();
        let mut dash = dashboard(&store);
        let id = dash.add_widget("todo", WidgetConfig::default()).unwrap();
        dash.dispatch(&id, WidgetEvent::AddTask("write tests".into()));
        let snap = &saved(&store)[0];
        assert_eq!(snap.data["tasks"][0]["text"], json!("write tests"));
    }

    #[test]
    fn adds_before_load_are_not_saved() {
        let store = MemoryStore::default();
        let mut dash = Dashboard::new(
            Box::new(store.clone()),
            WidgetRegistry::with_defaults(),
            WidgetContext::offline(),
        );
        dash.add_widget("notes", WidgetConfig::default()).unwrap();
        assert!(!dash.is_initialized());
        assert!(store.get(STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn minimize_is_not_a_state_change() {
        let store = MemoryStore::default();
        let mut dash = dashboard(&store);
        let id = dash.add_widget("notes", WidgetConfig::default()).unwrap();
        store.clone().remove(STATE_KEY).unwrap();
        dash.dispatch(&id, WidgetEvent::Minimize);
        assert!(!dash.widget(&id).unwrap().node().unwrap().body.visible);
        assert!(store.get(STATE_KEY).unwrap().is_none());
    }
}
