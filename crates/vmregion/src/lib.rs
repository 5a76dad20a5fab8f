// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Virtual memory regions with tracked protection state.
//!
//! This crate reserves address ranges from the host, moves them between
//! read-write and read-only, optionally exports them as shared-memory
//! handles, and releases them deterministically.
//!
//! # Components
//!
//! - [`Backend`]: raw reserve/release/reprotect. Two variants,
//!   [`AnonymousMapping`] and [`KernelRegion`], behave identically except
//!   for export support.
//! - [`RegionAllocator`]: owns every [`Region`], assigns identities, and is
//!   the only caller of backend reserve/release.
//! - [`ProtectionController`]: `ReadWrite ↔ ReadOnly` transitions.
//! - [`SharedMemoryExporter`]: turns a region into a [`SharedHandle`] that
//!   another process can import.
//! - [`EquivalenceVerifier`]: runs the same lifecycle on both backends and
//!   compares the results.
//!
//! # Fatal writes
//!
//! Writing through a read-only mapping is not an error this crate can
//! report: the host raises SIGSEGV (or SIGBUS) and the process dies. Safe
//! access through [`Region::open_mut`] checks the state first; raw access
//! through [`Region::as_mut_ptr`] does not.
//!
//! # Example
//!
//! ```rust
//! use vmregion::{BackendKind, Protection, RegionAllocator, RegionError};
//!
//! fn example() -> Result<(), RegionError> {
//!     let allocator = RegionAllocator::new();
//!     let region = allocator.allocate(4096, BackendKind::AnonymousMapping)?;
//!
//!     region.open_mut(|bytes| bytes[..3].copy_from_slice(b"Hi\0"))?;
//!
//!     allocator.protection().set_protection(&region, Protection::ReadOnly)?;
//!     region.open(|bytes| assert_eq!(&bytes[..3], b"Hi\0"))?;
//!
//!     allocator.release(&region)?;
//!     assert!(allocator.release(&region).is_err());
//!
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

#[cfg(not(unix))]
compile_error!("vmregion requires a Unix host");

#[cfg(test)]
mod tests;

mod allocator;
mod backend;
mod controller;
mod error;
mod export;
mod page;
mod protection;
mod region;
mod verify;

pub use allocator::RegionAllocator;
pub use backend::{AnonymousMapping, Backend, BackendKind, KernelRegion, Reservation};
pub use controller::ProtectionController;
pub use error::{RegionError, RegionErrorKind};
pub use export::{SharedHandle, SharedMapping, SharedMemoryExporter};
pub use page::{page_size, round_to_page};
pub use protection::{Protection, ProtectionState};
pub use region::{Region, RegionId};
pub use verify::{
    BackendReport, ComparisonResult, EquivalenceVerifier, PATTERN_PREFIX, Step, StepRecord,
    fill_with_pattern,
};
