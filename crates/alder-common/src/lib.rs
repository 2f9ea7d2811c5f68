//! # alder-common
//!
//! Shared types and constants for AlderDB.
//!
//! This crate provides the foundational types used across AlderDB
//! components:
//!
//! - **Types**: the host-supplied [`Key`] alias, typed identifiers
//!   ([`PageId`], [`RecordId`]), and the opaque [`RecordPointer`]
//! - **Constants**: system-wide constants such as the default index fanout
//!
//! ## Example
//!
//! ```rust
//! use alder_common::types::{PageId, RecordId, RecordPointer};
//!
//! let pointer = RecordPointer::new(PageId::new(42), RecordId::new(7));
//! assert_eq!(pointer.page_id.as_u64(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Key, PageId, RecordId, RecordPointer};
