//! # habitsync Testkit
//!
//! Test utilities for habitsync.
//!
//! This crate provides:
//! - Store fixtures with a controllable clock, in memory or on disk
//! - Wire entity builders
//! - Property-based generators for change sets using proptest
//! - [`FlakyBackend`], a journal whose appends can be made to fail
//!
//! ## Usage
//!
//! ```rust,ignore
//! use habitsync_testkit::prelude::*;
//!
//! let fixture = TestStore::memory();
//! let habit = habit("Jog");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod flaky;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::flaky::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use flaky::*;
pub use generators::*;
