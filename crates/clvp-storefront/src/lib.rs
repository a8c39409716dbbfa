pub mod client;
pub mod context;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub(crate) mod retry;
pub mod session;
pub mod widgets;

pub use client::{resolve_product_url, StorefrontClient};
pub use context::{Inventory, InventoryPolicy, StoreContext};
pub use error::StorefrontError;
pub use extract::ProductDocument;
pub use orchestrator::{
    FetchOutcome, MorphOrchestrator, MorphTarget, NavigationTarget, PostMorphStep,
    POST_MORPH_STEPS,
};
pub use session::{ApplyResult, PageSession, ResyncOutcome, SessionOptions};
pub use widgets::{Widget, WidgetKind};
