//! lflplot crate root: re-exports and module wiring.
//!
//! Watches a logical frame layout (LFL) definition file, reprocesses a raw
//! flight-data recording whenever the definition changes, and displays the
//! decoded parameters as a column of time-linked plots:
//! - `definition`: LFL parsing and parameter-group discovery
//! - `backend`: decode-plan and series-store seams plus the `Series` type
//! - `raw`: the built-in little-endian word decoder and JSON series store
//! - `align`: variable-rate series alignment onto a shared timeline
//! - `detect`: definition change tracking between passes
//! - `reprocess`: one full definition-to-store pass
//! - `loops`: file-watch loop and per-frame render tick plumbing
//! - `plot` / `app`: trace layout and the egui window

pub mod align;
pub mod app;
pub mod backend;
pub mod definition;
pub mod detect;
pub mod error;
pub mod loops;
pub mod plot;
pub mod raw;
pub mod reprocess;

// Public re-exports for a compact external API
pub use align::{align_series, Alignment, Truncation};
pub use backend::{DecodeEntry, DecodePlan, FrameCompiler, FrameDescriptor, Series, SeriesStore};
pub use definition::{FrameDefinition, ParameterRecord};
pub use detect::ChangeTracker;
pub use error::{ErrorKind, ProcessError, Result};
pub use loops::{render_tick, watch_loop, LoopState, PendingError, POLL_INTERVAL};
pub use raw::RawBackend;
pub use reprocess::{AxisAssignment, ReprocessOptions, Reprocessor, REFERENCE_PARAMETER};
