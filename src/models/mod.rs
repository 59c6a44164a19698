pub mod dedup_state;
pub mod item;
pub mod run;
pub mod snapshot;

pub use dedup_state::DeduplicationState;
pub use item::{ConfidenceSignal, ExtractionAttempt, HeuristicKind, Item, SourceMethod, MAX_OPTIONS};
pub use run::{RunSummary, StopReason};
pub use snapshot::{ClickableNode, LabelNode, PageMetrics, PageSnapshot};
