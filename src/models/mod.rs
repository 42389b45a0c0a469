pub mod app_state;
pub mod context;
pub mod snapshot;
pub mod trash;

pub use app_state::{AppState, ShortcutAction, ShortcutBindings};
pub use context::{default_context_title, Context};
pub use snapshot::{
    CaptureMethod, NewSnapshot, Snapshot, SnapshotStatus, SOURCE_FRONTMOST_WINDOW,
};
pub use trash::{TrashedContext, TrashedSnapshot};
