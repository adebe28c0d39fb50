//! SQLite persistence for Cozy.
//!
//! A single rusqlite connection behind a mutex (WAL mode), versioned
//! migrations, and repositories for the `alarms` and `user_sounds` tables.
//! Repositories are pure persistence: they never touch the scheduler.

pub mod alarms;
pub mod db;
pub mod migrations;
pub mod sounds;

pub use alarms::AlarmRepository;
pub use db::Database;
pub use sounds::SoundRepository;
