//! SpeedStore - durable playback-speed record with change notifications
//!
//! Holds the one durable scalar shared by every page in the system: the
//! committed playback speed. Commits are last-writer-wins whole-record
//! replaces with no compare-and-swap; racing writers are tolerated by
//! design. In-process consumers subscribe to a broadcast channel and hear
//! about every commit; other processes poll the record's version counter
//! (`ss watch`).
//!
//! # Layout
//!
//! ```text
//! speedstore/
//! ├── speed.json    # {"speed": 1.5, "version": 7, "updated_at": "..."}
//! ├── speed.lock    # commit serialization
//! └── speed.tmp     # staged record, renamed into place
//! ```
//!
//! # Example
//!
//! ```ignore
//! use speedstore::{SpeedStore, SpeedValue};
//!
//! let store = SpeedStore::open("speedstore")?;
//! let mut changes = store.subscribe();
//! store.write(SpeedValue::from_f64(1.5))?;
//! assert_eq!(changes.try_recv()?.new, SpeedValue::from_f64(1.5));
//! ```

pub mod cli;
pub mod config;
mod store;
mod value;

pub use store::{SPEED_KEY, SpeedChange, SpeedRecord, SpeedStore, StoreError};
pub use value::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, SPEED_STEP, SpeedValue};
