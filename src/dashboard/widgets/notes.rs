use super::{Widget, WidgetBase, WidgetContext};
use crate::dashboard::node::{Element, Region, WidgetEvent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn default_notes() -> Vec<String> {
    vec![String::new()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesData {
    #[serde(default = "default_notes")]
    pub notes: Vec<String>,
}

impl Default for NotesData {
    fn default() -> Self {
        Self {
            notes: default_notes(),
        }
    }
}

/// Free-text notes. The list never becomes empty.
pub struct NotesWidget {
    base: WidgetBase,
    notes: Vec<String>,
}

impl NotesWidget {
    pub fn new(base: WidgetBase, data: NotesData, _ctx: &WidgetContext) -> Self {
        let notes = if data.notes.is_empty() {
            default_notes()
        } else {
            data.notes
        };
        Self { base, notes }
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn add_note(&mut self) {
        self.notes.push(String::new());
        self.changed();
    }

    /// Removes the note at `index` unless it is the only one left.
    pub fn delete_note(&mut self, index: usize) -> bool {
        if self.notes.len() <= 1 || index >= self.notes.len() {
            return false;
        }
        self.notes.remove(index);
        self.changed();
        true
    }

    /// Replace every note with the current contents of the edit fields.
    ///
    /// The body is not regenerated so an editor keeps its cursor; the host
    /// already shows the new text.
    pub fn set_notes(&mut self, texts: Vec<String>) -> bool {
        if texts.is_empty() || texts == self.notes {
            return false;
        }
        self.notes = texts;
        if let Some(node) = self.base.node_mut() {
            node.replace_region(notes_region(&self.notes));
        }
        self.base.notify_state_changed();
        true
    }

    fn changed(&mut self) {
        self.update_ui();
        self.base.notify_state_changed();
    }
}

fn notes_region(notes: &[String]) -> Region {
    let deletable = notes.len() > 1;
    Region::new(
        "notes",
        notes
            .iter()
            .enumerate()
            .map(|(index, text)| Element::Note {
                index,
                text: text.clone(),
                deletable,
            })
            .collect(),
    )
}

impl Widget for NotesWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn render_content(&self) -> Vec<Region> {
        vec![
            notes_region(&self.notes),
            Region::new(
                "actions",
                vec![Element::button("+ Add note", WidgetEvent::AddNote)],
            ),
        ]
    }

    fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::AddNote => self.add_note(),
            WidgetEvent::DeleteNote(index) => {
                self.delete_note(index);
            }
            WidgetEvent::EditNotes(texts) => {
                self.set_notes(texts);
            }
            other => tracing::debug!(?other, "notes widget ignores event"),
        }
    }

    fn data(&self) -> Value {
        json!({ "notes": self.notes })
    }
}
