//! Kurs Widget
//!
//! Hand-off of rate data from the converter to a home-screen widget.
//!
//! The converter publishes ruble prices of a few currencies into a shared
//! key-value region after each successful refresh. The widget reads that
//! snapshot while it is fresh and otherwise fetches on its own, falling
//! back to fixed placeholder prices.

pub mod config;
pub mod publisher;
pub mod reader;
pub mod snapshot;
pub mod store;

pub use config::WidgetConfig;
pub use publisher::SnapshotPublisher;
pub use reader::{EntryOrigin, WidgetEntry, WidgetReader, WidgetTimeline};
pub use snapshot::{SnapshotRate, WidgetSnapshot, LAST_UPDATED_KEY, RATES_KEY};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
