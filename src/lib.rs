//! Offline-first mood diary core.
//!
//! Entries are classified on-device by [`mood::infer`], written to a local
//! [`store::EntryStore`] first, and pushed to the remote API in the
//! background by the [`worker::SyncWorker`].

pub mod connectivity;
pub mod entry;
pub mod insights;
pub mod lifecycle;
pub mod locks;
pub mod mood;
pub mod remote;
pub mod settings;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod worker;

pub use entry::{DiaryEntry, EntryPatch, ValidationError};
pub use lifecycle::{EntryController, EntryError};
pub use mood::{infer, MoodInference, MoodLabel};
pub use sync::{SyncCoordinator, SyncError, SyncReport};
