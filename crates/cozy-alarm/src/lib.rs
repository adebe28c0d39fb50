//! Alarm scheduling and firing core.
//!
//! The coordinator orchestrates three injected collaborators: an alarm
//! store (source of truth), a background scheduler (one cancelable timer
//! per alarm id), and a sound resolver (never fails, degrades to a
//! fallback tone). State changes surface as broadcast domain events; the
//! UI subscribes instead of being called inline.

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod importer;
pub mod library;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod system;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::AlarmCoordinator;
pub use error::{AlarmError, ImportItemError, ImportReport, SkippedItem};
pub use importer::{ScheduleItem, ScheduleItemKind, ScheduleProposal};
pub use library::SoundLibrary;
pub use resolver::SoundResolver;
pub use scheduler::{
    due_channel, DueReceiver, DueSender, RuntimeScheduler, Scheduler, WallClockScheduler,
};
pub use store::AlarmStore;
pub use system::AlarmSystem;
