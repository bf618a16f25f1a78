//! The track catalog and everything that keeps it in sync with disk.

mod aggregate;
mod catalog;
mod display;
mod media_index;
mod model;
mod reconcile;
mod scan;
mod scanner;
mod types;

pub use aggregate::{Aggregates, rebuild as rebuild_aggregates};
pub use catalog::{CatalogError, CatalogStore, JsonCatalog, MemoryCatalog};
pub use display::display_track;
pub use media_index::{MediaIndex, MediaIndexError, MediaRow, NoMediaIndex, StaticMediaIndex};
pub use model::{Track, TrackKey, TrackSource, normalize_text};
pub use reconcile::{Reconciler, ScanError};
pub use scanner::LibraryScanner;
pub use types::{ProgressHandle, ScanPhase, ScanProgress, ScanReport};
