//! Session storage for labshell.
//!
//! Provides:
//! - `MemoryStorage` - volatile, single-process session store
//! - `MonotonicClock` - timestamp source that never repeats
//! - Demo seed data

pub mod clock;
pub mod seed;
pub mod storage;

pub use clock::MonotonicClock;
pub use seed::demo_sessions;
#[cfg(feature = "memory")]
pub use storage::MemoryStorage;
