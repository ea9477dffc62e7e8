use super::{PendingFetch, Widget, WidgetBase, WidgetContext};
use crate::dashboard::node::{Element, Region, WidgetEvent};
use crate::sources::{QuoteSource, RemoteQuote};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalQuote {
    pub text: &'static str,
    pub author: &'static str,
}

pub const LOCAL_QUOTES: [LocalQuote; 10] = [
    LocalQuote {
        text: "The way to get started is to quit talking and begin doing.",
        author: "Walt Disney",
    },
    LocalQuote {
        text: "Success is stumbling from failure to failure with no loss of enthusiasm.",
        author: "Winston Churchill",
    },
    LocalQuote {
        text: "The only way to do great work is to love what you do.",
        author: "Steve Jobs",
    },
    LocalQuote {
        text: "Don't wait. The time will never be just right.",
        author: "Napoleon Hill",
    },
    LocalQuote {
        text: "The most difficult thing is the decision to act, the rest is merely tenacity.",
        author: "Amelia Earhart",
    },
    LocalQuote {
        text: "Our lives begin to end the day we become silent about things that matter.",
        author: "Martin Luther King Jr.",
    },
    LocalQuote {
        text: "If you think you are too small to make a difference, try sleeping with a mosquito.",
        author: "Dalai Lama",
    },
    LocalQuote {
        text: "The biggest risk is not taking any risk.",
        author: "Mark Zuckerberg",
    },
    LocalQuote {
        text: "The future belongs to those who believe in the beauty of their dreams.",
        author: "Eleanor Roosevelt",
    },
    LocalQuote {
        text: "Don't look back, you're not going that way.",
        author: "Mark Twain",
    },
];

pub const QUOTE_FALLBACK: &str = "Could not load a quote. Check your internet connection.";
const QUOTE_PLACEHOLDER: &str = "Press \"Refresh\" to load a quote";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteMode {
    /// Rotate through [`LOCAL_QUOTES`]; never touches the network.
    Local,
    /// Ask the configured quote source.
    Remote,
}

impl Default for QuoteMode {
    fn default() -> Self {
        QuoteMode::Local
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteData {
    #[serde(default)]
    pub mode: QuoteMode,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default, alias = "initialQuote")]
    pub text: Option<String>,
    #[serde(default)]
    pub author: String,
}

pub struct QuoteWidget {
    base: WidgetBase,
    mode: QuoteMode,
    index: Option<usize>,
    text: String,
    author: String,
    source: Option<Arc<dyn QuoteSource>>,
    pending: Option<PendingFetch<RemoteQuote>>,
}

impl QuoteWidget {
    pub fn new(base: WidgetBase, data: QuoteData, ctx: &WidgetContext) -> Self {
        let mut widget = Self {
            base,
            mode: data.mode,
            index: None,
            text: data.text.unwrap_or_default(),
            author: data.author,
            source: ctx.sources.quotes.clone(),
            pending: None,
        };
        if widget.mode == QuoteMode::Local {
            let index = data.index.filter(|i| *i < LOCAL_QUOTES.len()).unwrap_or(0);
            widget.show_local(index);
        }
        widget
    }

    pub fn mode(&self) -> QuoteMode {
        self.mode
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    fn show_local(&mut self, index: usize) {
        let quote = LOCAL_QUOTES[index];
        self.index = Some(index);
        self.text = quote.text.to_string();
        self.author = quote.author.to_string();
    }

    /// Advance to the next local quote, wrapping at the end. In remote mode
    /// this starts a fetch instead.
    pub fn next(&mut self) {
        match self.mode {
            QuoteMode::Local => {
                let next = self.index.map_or(0, |i| (i + 1) % LOCAL_QUOTES.len());
                self.show_local(next);
                self.changed();
            }
            QuoteMode::Remote => {
                self.fetch();
            }
        }
    }

    /// Start fetching a quote on a worker thread. Ignored while one is
    /// already in flight.
    pub fn fetch(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let source = self.source.clone();
        self.pending = Some(PendingFetch::spawn(move || request(source.as_deref())));
        self.update_ui();
        true
    }

    /// Fetch inline and apply the result.
    pub fn refresh_now(&mut self) {
        let res = request(self.source.as_deref());
        self.pending = None;
        self.apply(res);
    }

    fn apply(&mut self, res: anyhow::Result<RemoteQuote>) {
        match res {
            Ok(quote) => {
                self.text = quote.content;
                self.author = quote.author;
            }
            Err(err) => {
                tracing::warn!(id = %self.base.id(), "quote fetch failed: {err:#}");
                self.text = QUOTE_FALLBACK.to_string();
                self.author.clear();
            }
        }
        self.changed();
    }

    fn changed(&mut self) {
        self.update_ui();
        self.base.notify_state_changed();
    }
}

fn request(source: Option<&dyn QuoteSource>) -> anyhow::Result<RemoteQuote> {
    source
        .ok_or_else(|| anyhow!("no quote source configured"))?
        .random_quote()
}

impl Widget for QuoteWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn render_content(&self) -> Vec<Region> {
        let mut quote = Vec::new();
        if self.text.is_empty() {
            quote.push(Element::text(QUOTE_PLACEHOLDER));
        } else {
            quote.push(Element::text(format!("\"{}\"", self.text)));
        }
        if !self.author.is_empty() {
            quote.push(Element::text(format!("— {}", self.author)));
        }
        let label = match self.mode {
            QuoteMode::Local => "Next quote",
            QuoteMode::Remote => "Refresh",
        };
        vec![
            Region::new("quote", quote),
            Region::new(
                "actions",
                vec![Element::busy_button(label, WidgetEvent::Refresh, self.is_busy())],
            ),
        ]
    }

    fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Refresh => self.next(),
            other => tracing::debug!(?other, "quote widget ignores event"),
        }
    }

    fn data(&self) -> Value {
        json!({
            "mode": self.mode,
            "index": self.index,
            "text": self.text,
            "author": self.author,
        })
    }

    fn mounted(&mut self) {
        if self.mode == QuoteMode::Remote {
            self.fetch();
        }
    }

    fn poll(&mut self) -> bool {
        let Some(res) = self.pending.as_ref().and_then(PendingFetch::try_take) else {
            return false;
        };
        self.pending = None;
        self.apply(res);
        true
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}
