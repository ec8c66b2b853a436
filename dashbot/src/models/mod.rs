//! Data models shared across the Tableau, catalog and chat layers.

mod selection;
mod session;
mod view;

pub use selection::{FulfillmentState, SelectionRequest};
pub use session::Session;
pub use view::CatalogEntry;
