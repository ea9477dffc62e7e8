use super::{Widget, WidgetBase, WidgetContext};
use crate::dashboard::node::{Element, Region, Submit, WidgetEvent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoData {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

pub struct TodoWidget {
    base: WidgetBase,
    tasks: Vec<Task>,
}

impl TodoWidget {
    pub fn new(base: WidgetBase, data: TodoData, _ctx: &WidgetContext) -> Self {
        let mut tasks: Vec<Task> = Vec::with_capacity(data.tasks.len());
        for mut task in data.tasks {
            if tasks.iter().any(|t| t.id == task.id) {
                task.id = fresh_task_id(&tasks);
            }
            tasks.push(task);
        }
        Self { base, tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// `(total, completed)`.
    pub fn stats(&self) -> (usize, usize) {
        let done = self.tasks.iter().filter(|t| t.completed).count();
        (self.tasks.len(), done)
    }

    /// Appends a task. Blank text is ignored.
    pub fn add_task(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let id = fresh_task_id(&self.tasks);
        self.tasks.push(Task {
            id,
            text: text.to_string(),
            completed: false,
        });
        self.changed();
        true
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return false;
        }
        self.changed();
        true
    }

    pub fn toggle_task(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.completed = !task.completed;
        self.changed();
        true
    }

    fn changed(&mut self) {
        self.update_ui();
        self.base.notify_state_changed();
    }

    fn list_region(&self) -> Region {
        Region::new(
            "list",
            self.tasks
                .iter()
                .map(|t| Element::Task {
                    id: t.id.clone(),
                    text: t.text.clone(),
                    completed: t.completed,
                })
                .collect(),
        )
    }

    fn stats_region(&self) -> Region {
        let (total, done) = self.stats();
        Region::new(
            "stats",
            vec![Element::text(format!("Total: {total} | Completed: {done}"))],
        )
    }
}

/// Time based id, bumped until it is unique within the list.
fn fresh_task_id(tasks: &[Task]) -> String {
    let mut stamp = chrono::Utc::now().timestamp_millis();
    loop {
        let id = stamp.to_string();
        if !tasks.iter().any(|t| t.id == id) {
            return id;
        }
        stamp += 1;
    }
}

impl Widget for TodoWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn render_content(&self) -> Vec<Region> {
        vec![
            Region::new(
                "input",
                vec![Element::Input {
                    name: "task",
                    value: String::new(),
                    placeholder: "New task...".into(),
                    submit: Submit::AddTask,
                    submit_label: "Add".into(),
                }],
            ),
            self.list_region(),
            self.stats_region(),
        ]
    }

    // Only the list and the counters change; the input row is kept.
    fn update_ui(&mut self) {
        let list = self.list_region();
        let stats = self.stats_region();
        if let Some(node) = self.base.node_mut() {
            node.replace_region(list);
            node.replace_region(stats);
        }
    }

    fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::AddTask(text) => {
                self.add_task(&text);
            }
            WidgetEvent::ToggleTask(id) => {
                self.toggle_task(&id);
            }
            WidgetEvent::DeleteTask(id) => {
                self.delete_task(&id);
            }
            other => tracing::debug!(?other, "todo widget ignores event"),
        }
    }

    fn data(&self) -> Value {
        json!({ "tasks": self.tasks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::config::WidgetConfig;
    use crate::dashboard::widgets::{WidgetHooks, WidgetKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn widget(tasks: Vec<Task>) -> TodoWidget {
        let base = WidgetBase::new(WidgetKind::Todo, &WidgetConfig::default());
        TodoWidget::new(base, TodoData { tasks }, &WidgetContext::offline())
    }

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.into(),
            text: format!("task {id}"),
            completed,
        }
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut w = widget(vec![]);
        assert!(!w.add_task("   "));
        assert!(w.tasks().is_empty());
    }

    #[test]
    fn added_task_is_trimmed_and_open() {
        let mut w = widget(vec![]);
        assert!(w.add_task("  buy milk "));
        assert_eq!(w.tasks()[0].text, "buy milk");
        assert!(!w.tasks()[0].completed);
    }

    #[test]
    fn rapid_adds_get_unique_ids() {
        let mut w = widget(vec![]);
        for i in 0..20 {
            w.add_task(&format!("t{i}"));
        }
        let mut ids: Vec<_> = w.tasks().iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn duplicate_ids_in_seed_data_are_reassigned() {
        let w = widget(vec![task("1", false), task("1", true)]);
        assert_ne!(w.tasks()[0].id, w.tasks()[1].id);
    }

    #[test]
    fn toggle_and_delete_unknown_ids_are_noops() {
        let changes = Arc::new(AtomicUsize::new(0));
        let mut w = widget(vec![task("1", false)]);
        let counter = Arc::clone(&changes);
        w.set_hooks(WidgetHooks {
            on_state_changed: Some(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        });
        assert!(!w.toggle_task("nope"));
        assert!(!w.delete_task("nope"));
        assert_eq!(changes.load(Ordering::SeqCst), 0);
        assert!(w.toggle_task("1"));
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stats_line_tracks_list() {
        let mut w = widget(vec![task("1", true), task("2", false)]);
        w.render();
        w.handle(WidgetEvent::ToggleTask("2".into()));
        w.handle(WidgetEvent::AddTask("three".into()));
        let node = w.node().unwrap();
        assert_eq!(
            node.region("stats").unwrap().elements,
            vec![Element::text("Total: 3 | Completed: 2")]
        );
        assert_eq!(node.region("list").unwrap().elements.len(), 3);
        assert!(node.region("input").is_some());
    }
}
