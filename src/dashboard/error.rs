use thiserror::Error;

/// Errors surfaced to callers of the dashboard API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// The kind tag does not name a registered widget variant.
    #[error("unknown widget kind '{0}'")]
    UnknownKind(String),

    /// A widget with this id already lives on the dashboard.
    #[error("widget id '{0}' is already in use")]
    DuplicateId(String),
}
