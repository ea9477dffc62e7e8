pub mod config;
pub mod dashboard;
pub mod error;
pub mod node;
pub mod widgets;

pub use config::{WidgetConfig, WidgetSnapshot};
pub use dashboard::Dashboard;
pub use error::DashboardError;
pub use node::{Element, Region, WidgetEvent, WidgetNode};
pub use widgets::{Widget, WidgetContext, WidgetKind, WidgetRegistry};
