// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Backend - raw reserve/release/reprotect of address ranges.
//!
//! Two variants share one contract:
//!
//! - [`AnonymousMapping`]: process-private `MAP_ANONYMOUS` pages. Cannot export.
//! - [`KernelRegion`]: pages backed by a task-owned kernel memory object
//!   (`memfd_create` on Linux, an unlinked `shm_open` object elsewhere).
//!   Can export, and exported handles keep the object alive after the
//!   exporting region is released.
//!
//! Backends keep their own table of live reservations. Release and
//! reprotect of a range that is not in the table fail with
//! [`RegionError::InvalidRegion`] without reaching the host.

mod anonymous;
mod kernel;
mod reservations;
pub(crate) mod sys;

pub use anonymous::AnonymousMapping;
pub use kernel::KernelRegion;

use crate::error::RegionError;
use crate::export::SharedHandle;
use crate::protection::Protection;

/// Identifies a backend variant.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum BackendKind {
    /// See [`AnonymousMapping`].
    AnonymousMapping,
    /// See [`KernelRegion`].
    KernelRegion,
}

impl BackendKind {
    /// Every variant, in a stable order.
    pub const ALL: [BackendKind; 2] = [BackendKind::AnonymousMapping, BackendKind::KernelRegion];

    /// Short, stable name used in reports and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::AnonymousMapping => "anonymous",
            Self::KernelRegion => "kernel",
        }
    }
}

impl core::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A live address range handed out by a backend.
///
/// `len` is the page-rounded size. All bounds checks use it, never the
/// size originally requested.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Reservation {
    base: usize,
    len: usize,
}

impl Reservation {
    /// Describes the range `[base, base + len)`.
    pub fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    /// Base address assigned by the host.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Page-rounded length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the range is empty. Live reservations never are.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.base as *mut u8
    }
}

/// Strategy for reserving address ranges from the host.
pub trait Backend: Send + Sync + core::fmt::Debug {
    /// Which variant this is.
    fn kind(&self) -> BackendKind;

    /// Reserves at least `size` bytes, rounded up to page granularity.
    ///
    /// The returned range is zero-filled, readable and writable.
    fn reserve(&self, size: usize) -> Result<Reservation, RegionError>;

    /// Returns the range to the host.
    ///
    /// # Safety
    ///
    /// No reference into the range may be alive, and none may be derived
    /// from its addresses afterwards.
    unsafe fn release(&self, reservation: Reservation) -> Result<(), RegionError>;

    /// Changes page protection of the whole range in place.
    fn reprotect(&self, reservation: Reservation, mode: Protection) -> Result<(), RegionError>;

    /// Whether [`Backend::export`] can succeed.
    fn supports_export(&self) -> bool;

    /// Produces a transferable handle to the range's backing object.
    fn export(
        &self,
        reservation: Reservation,
        mode: Protection,
    ) -> Result<SharedHandle, RegionError> {
        let _ = (reservation, mode);
        Err(RegionError::ExportUnsupported(self.kind()))
    }
}
