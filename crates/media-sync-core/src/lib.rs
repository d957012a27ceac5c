pub mod context;
pub mod diff;
pub mod error;
pub mod handlers;
pub mod id_matching;
pub mod pending;
pub mod queue;
pub mod resolution;
pub mod snapshot;
pub mod sync;
pub mod watermark;

pub use context::{HandlerFailure, RunContext, StopHandle, SyncStats};
pub use diff::{diff, diff_with, DiffResult};
pub use error::SyncError;
pub use handlers::state::properties;
pub use handlers::{
    evaluate_table, ChangeTable, FastPullHandler, Handler, HandlerConfig, HandlerMode, HandlerRegistry, Scope, StateHandler,
};
pub use id_matching::{Alignment, IdIndex};
pub use pending::{Pending, PendingSet};
pub use queue::ActionQueue;
pub use resolution::{ConflictResolver, Resolution};
pub use snapshot::Snapshot;
pub use sync::{RunState, SyncMode, SyncOrchestrator, SyncRequest, SyncResult, Trigger};
pub use watermark::WatermarkStore;
