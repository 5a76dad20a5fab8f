// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! ProtectionController - ReadWrite ↔ ReadOnly transitions.

use log::trace;

use crate::allocator::RegionAllocator;
use crate::error::RegionError;
use crate::protection::{Protection, ProtectionState};
use crate::region::Region;

/// Changes the protection of regions it borrows from a [`RegionAllocator`].
#[derive(Debug, Clone, Copy)]
pub struct ProtectionController<'a> {
    allocator: &'a RegionAllocator,
}

impl<'a> ProtectionController<'a> {
    /// Creates a controller for `allocator`'s regions.
    pub fn new(allocator: &'a RegionAllocator) -> Self {
        Self { allocator }
    }

    /// Moves `region` to `mode`.
    ///
    /// Fails with [`RegionError::InvalidTransition`] once the region is
    /// unmapped. Requesting the current mode succeeds without a syscall.
    ///
    /// Serialized against other transitions, `open` calls and release of
    /// the same region through its metadata lock.
    pub fn set_protection(&self, region: &Region, mode: Protection) -> Result<(), RegionError> {
        let mut slot = region.lock()?;
        let reservation = slot.reservation()?;
        let target = ProtectionState::from(mode);

        if slot.state() == target {
            trace!("region {} already {mode}", region.id());
            return Ok(());
        }

        self.allocator
            .backend(region.backend())
            .reprotect(reservation, mode)?;

        slot.set_state(target);

        trace!("region {} now {mode}", region.id());

        Ok(())
    }
}
