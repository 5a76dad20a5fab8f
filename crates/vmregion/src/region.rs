// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Region - handle to a reserved address range with tracked protection.
//!
//! A [`Region`] is a cheap, clonable handle. All clones share one metadata
//! cell (reservation + state) guarded by a mutex. Base address and length
//! never change; only the state does, and once it reaches
//! [`ProtectionState::Unmapped`] the reservation is dropped from the cell so
//! no freed address survives in the bookkeeping.
//!
//! # Write guard
//!
//! [`Region::open_mut`] refuses read-only regions before handing out a
//! slice. Raw writes through [`Region::as_mut_ptr`] are not intercepted:
//! writing while the region is read-only faults (SIGSEGV/SIGBUS) and
//! terminates the process.

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{BackendKind, Reservation};
use crate::error::RegionError;
use crate::protection::ProtectionState;

/// Process-unique region identity.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RegionId(u64);

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

impl RegionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identity value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for RegionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct Slot {
    reservation: Option<Reservation>,
    state: ProtectionState,
}

impl Slot {
    /// Live reservation, or `InvalidTransition` once unmapped.
    pub(crate) fn reservation(&self) -> Result<Reservation, RegionError> {
        self.reservation.ok_or(RegionError::InvalidTransition)
    }

    pub(crate) fn state(&self) -> ProtectionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProtectionState) {
        self.state = state;
    }

    /// Forgets the reservation and moves to the terminal state.
    pub(crate) fn unmap(&mut self) {
        self.reservation = None;
        self.state = ProtectionState::Unmapped;
    }
}

/// Handle to a region owned by a [`RegionAllocator`](crate::RegionAllocator).
#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    backend: BackendKind,
    len: usize,
    slot: Arc<Mutex<Slot>>,
}

impl Region {
    pub(crate) fn new(backend: BackendKind, reservation: Reservation) -> Self {
        Self {
            id: RegionId::next(),
            backend,
            len: reservation.len(),
            slot: Arc::new(Mutex::new(Slot {
                reservation: Some(reservation),
                state: ProtectionState::ReadWrite,
            })),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Slot>, RegionError> {
        Ok(self.slot.lock()?)
    }

    /// Returns true if both handles refer to the same region.
    pub(crate) fn same_as(&self, other: &Region) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Identity of the region.
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Backend that produced the region.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Length in bytes, rounded up to page granularity at allocation.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: regions are never empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current protection state.
    pub fn state(&self) -> Result<ProtectionState, RegionError> {
        Ok(self.lock()?.state())
    }

    /// Runs `f` over the region's bytes.
    ///
    /// Holds the region's metadata lock while `f` runs, so protection
    /// changes and release of this region wait for `f` to return. Calling
    /// either from inside `f` deadlocks.
    pub fn open<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, RegionError> {
        let slot = self.lock()?;
        let reservation = slot.reservation()?;

        let bytes = unsafe { core::slice::from_raw_parts(reservation.as_ptr(), reservation.len()) };

        Ok(f(bytes))
    }

    /// Runs `f` over the region's bytes, mutably.
    ///
    /// Fails with [`RegionError::NotWritable`] while the region is read-only.
    /// Same locking rules as [`Region::open`].
    pub fn open_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R, RegionError> {
        let slot = self.lock()?;
        let reservation = slot.reservation()?;

        if !slot.state().is_writable() {
            return Err(RegionError::NotWritable);
        }

        let bytes =
            unsafe { core::slice::from_raw_parts_mut(reservation.as_ptr(), reservation.len()) };

        Ok(f(bytes))
    }

    /// Returns the base pointer of a mapped region.
    ///
    /// # Safety
    ///
    /// The pointer is only valid until the region is released, and accesses
    /// through it are not synchronized with [`Region::open`] or protection
    /// changes. Writing through it while the region is read-only faults and
    /// terminates the process.
    pub unsafe fn as_mut_ptr(&self) -> Result<*mut u8, RegionError> {
        Ok(self.lock()?.reservation()?.as_ptr())
    }
}
