pub mod anchors;
pub mod app_config;
pub mod combination;
pub mod config;
pub mod dom;
pub mod events;
pub mod html;
pub mod morph;
pub mod picker;
pub mod selection;
pub mod url_state;
pub mod variant;

pub use app_config::{AppConfig, Environment};
pub use combination::{Combination, CombinationSet, ENTRY_SEPARATOR, FIELD_SEPARATOR};
pub use config::{load_app_config, load_app_config_from_env};
pub use dom::{Element, Node};
pub use events::{Envelope, EventBus, EventKind, InstanceId, PickerEvent, Scope};
pub use morph::{Morph, MorphStats, ReconcilingMorph};
pub use picker::{PickOutcome, PickerKind, PickerState, SelectionEngine};
pub use selection::{Dimension, SelectionPhase, SelectionState};
pub use url_state::{History, HistoryMode, MemoryHistory, UrlState};
pub use variant::SelectedVariant;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DomError {
    #[error("document has no <html> root element")]
    MissingRoot,

    #[error("expected anchor {anchor} not found in {context}")]
    MissingAnchor {
        anchor: String,
        context: &'static str,
    },
}
