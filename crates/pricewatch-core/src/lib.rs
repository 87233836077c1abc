//! Shared types for pricewatch: the item/quote data model, the session
//! protocol, error taxonomy, configuration and the upstream source traits.

pub mod config;
pub mod errors;
pub mod ids;
pub mod items;
pub mod protocol;
pub mod source;

pub use config::Settings;
pub use errors::{ConfigError, DispatchError, ProtocolError, UpstreamError};
pub use ids::SessionId;
pub use items::{EnrichedItem, ItemRecord, PageRequest, PriceQuote};
pub use protocol::{Action, ErrorPayload, SessionMessage};
pub use source::{CatalogSource, PriceSource};
