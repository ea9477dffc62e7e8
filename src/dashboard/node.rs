//! Retained view tree produced by widgets.
//!
//! A [`WidgetNode`] is what a widget hands to the host: a header with the
//! title and the two window controls, and a body made of named regions. Hosts
//! draw it however they like and report user input back as [`WidgetEvent`]s.

use crate::dashboard::widgets::WidgetKind;

/// User input routed from the host back to a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Minimize,
    Close,
    AddTask(String),
    ToggleTask(String),
    DeleteTask(String),
    /// Next quote, new weather reading or new rates depending on the widget.
    Refresh,
    SearchCity(String),
    AddNote,
    DeleteNote(usize),
    /// Full contents of every note field, in order.
    EditNotes(Vec<String>),
}

/// What a single-line input does when submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    AddTask,
    SearchCity,
}

impl Submit {
    pub fn event(self, text: String) -> WidgetEvent {
        match self {
            Submit::AddTask => WidgetEvent::AddTask(text),
            Submit::SearchCity => WidgetEvent::SearchCity(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Minimize,
    Close,
}

impl Control {
    pub fn label(self) -> &'static str {
        match self {
            Control::Minimize => "−",
            Control::Close => "×",
        }
    }

    pub fn event(self) -> WidgetEvent {
        match self {
            Control::Minimize => WidgetEvent::Minimize,
            Control::Close => WidgetEvent::Close,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(String),
    Heading(String),
    Error(String),
    Detail {
        label: String,
        value: String,
    },
    /// Single-line input with a button next to it; Enter or the button
    /// submits the text.
    Input {
        name: &'static str,
        value: String,
        placeholder: String,
        submit: Submit,
        submit_label: String,
    },
    Button {
        label: String,
        event: WidgetEvent,
        enabled: bool,
    },
    Task {
        id: String,
        text: String,
        completed: bool,
    },
    Note {
        index: usize,
        text: String,
        deletable: bool,
    },
}

impl Element {
    pub fn text(s: impl Into<String>) -> Self {
        Element::Text(s.into())
    }

    pub fn button(label: impl Into<String>, event: WidgetEvent) -> Self {
        Element::Button {
            label: label.into(),
            event,
            enabled: true,
        }
    }

    /// Refresh style button that turns into a disabled "Loading..." while a
    /// fetch is in flight.
    pub fn busy_button(label: impl Into<String>, event: WidgetEvent, busy: bool) -> Self {
        Element::Button {
            label: if busy { "Loading...".into() } else { label.into() },
            event,
            enabled: !busy,
        }
    }

    /// Plain text rendering, used for previews and tests.
    pub fn plain(&self) -> String {
        match self {
            Element::Text(s) | Element::Heading(s) | Element::Error(s) => s.clone(),
            Element::Detail { label, value } => format!("{label} {value}"),
            Element::Input { value, .. } => value.clone(),
            Element::Button { label, .. } => label.clone(),
            Element::Task {
                text, completed, ..
            } => format!("[{}] {text}", if *completed { "x" } else { " " }),
            Element::Note { text, .. } => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: &'static str,
    pub elements: Vec<Element>,
}

impl Region {
    pub fn new(name: &'static str, elements: Vec<Element>) -> Self {
        Self { name, elements }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub title: String,
    pub controls: [Control; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub visible: bool,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetNode {
    pub widget_id: String,
    pub kind: WidgetKind,
    pub header: Header,
    pub body: Body,
}

impl WidgetNode {
    pub fn new(
        widget_id: &str,
        kind: WidgetKind,
        title: &str,
        visible: bool,
        regions: Vec<Region>,
    ) -> Self {
        Self {
            widget_id: widget_id.to_string(),
            kind,
            header: Header {
                title: title.to_string(),
                controls: [Control::Minimize, Control::Close],
            },
            body: Body { visible, regions },
        }
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.body.regions.iter().find(|r| r.name == name)
    }

    /// Replace one named region of the body, appending it if absent.
    pub fn replace_region(&mut self, region: Region) {
        match self.body.regions.iter_mut().find(|r| r.name == region.name) {
            Some(slot) => *slot = region,
            None => self.body.regions.push(region),
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Element> {
        self.body
            .regions
            .iter()
            .flat_map(|r| r.elements.iter())
            .filter(|e| matches!(e, Element::Button { .. }))
    }

    /// All body text joined by newlines.
    pub fn body_text(&self) -> String {
        self.body
            .regions
            .iter()
            .flat_map(|r| r.elements.iter())
            .map(Element::plain)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
