// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! RegionAllocator - the only owner of regions and the only caller of
//! backend reserve/release.
//!
//! # Locking
//!
//! The owned set is guarded by one mutex, held across the backend call in
//! both `allocate` and `release`. Release additionally takes the region's
//! own metadata lock, always after the owned-set lock, so it waits for
//! in-flight `open`/`set_protection` calls on that region.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use crate::backend::{AnonymousMapping, Backend, BackendKind, KernelRegion};
use crate::controller::ProtectionController;
use crate::error::RegionError;
use crate::export::SharedMemoryExporter;
use crate::region::{Region, RegionId};

/// Owns live regions and routes them to their backends.
#[derive(Debug, Default)]
pub struct RegionAllocator {
    pub(crate) anonymous: AnonymousMapping,
    pub(crate) kernel: KernelRegion,
    owned: Mutex<HashMap<RegionId, Region>>,
}

impl RegionAllocator {
    /// Creates an allocator with one instance of each backend and no regions.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn backend(&self, kind: BackendKind) -> &dyn Backend {
        match kind {
            BackendKind::AnonymousMapping => &self.anonymous,
            BackendKind::KernelRegion => &self.kernel,
        }
    }

    fn lock_owned(&self) -> Result<MutexGuard<'_, HashMap<RegionId, Region>>, RegionError> {
        Ok(self.owned.lock()?)
    }

    /// Whether regions from `kind` can be exported.
    pub fn supports_export(&self, kind: BackendKind) -> bool {
        self.backend(kind).supports_export()
    }

    /// Reserves a region of at least `size` bytes from `kind`.
    ///
    /// The region starts [`ReadWrite`](crate::ProtectionState::ReadWrite)
    /// and zero-filled. Its length is `size` rounded up to page granularity.
    pub fn allocate(&self, size: usize, kind: BackendKind) -> Result<Region, RegionError> {
        if size == 0 {
            return Err(RegionError::InvalidArgument { size });
        }

        let mut owned = self.lock_owned()?;
        let reservation = self.backend(kind).reserve(size)?;
        let region = Region::new(kind, reservation);

        owned.insert(region.id(), region.clone());

        debug!(
            "allocated region {} ({} bytes, {kind})",
            region.id(),
            region.len()
        );

        Ok(region)
    }

    /// Releases `region`, returning its memory to the host.
    ///
    /// Fails with [`RegionError::NotOwned`] if this allocator does not hold
    /// the region, including when it was already released. A second release
    /// is never a silent no-op.
    pub fn release(&self, region: &Region) -> Result<(), RegionError> {
        let mut owned = self.lock_owned()?;

        let held = match owned.get(&region.id()) {
            Some(held) if held.same_as(region) => held,
            _ => return Err(RegionError::NotOwned(region.id())),
        };

        {
            let mut slot = held.lock()?;
            let reservation = slot.reservation()?;

            // Slices only exist while the slot lock is held, and it is held here.
            unsafe { self.backend(held.backend()).release(reservation)? };

            slot.unmap();
        }

        owned.remove(&region.id());

        debug!("released region {}", region.id());

        Ok(())
    }

    /// Looks up a live region by identity.
    pub fn get(&self, id: RegionId) -> Result<Region, RegionError> {
        self.lock_owned()?
            .get(&id)
            .cloned()
            .ok_or(RegionError::NotFound(id))
    }

    /// Number of live regions.
    pub fn len(&self) -> Result<usize, RegionError> {
        Ok(self.lock_owned()?.len())
    }

    /// Returns true if no region is live.
    pub fn is_empty(&self) -> Result<bool, RegionError> {
        Ok(self.len()? == 0)
    }

    /// Protection controller operating on this allocator's regions.
    pub fn protection(&self) -> ProtectionController<'_> {
        ProtectionController::new(self)
    }

    /// Exporter operating on this allocator's regions.
    pub fn exporter(&self) -> SharedMemoryExporter<'_> {
        SharedMemoryExporter::new(self)
    }
}

impl Drop for RegionAllocator {
    fn drop(&mut self) {
        let owned = match self.owned.get_mut() {
            Ok(owned) => core::mem::take(owned),
            Err(poisoned) => core::mem::take(poisoned.into_inner()),
        };

        for (id, region) in owned {
            let Ok(mut slot) = region.lock() else {
                warn!("region {id} leaked: metadata lock poisoned");
                continue;
            };

            let Ok(reservation) = slot.reservation() else {
                continue;
            };

            match unsafe { self.backend(region.backend()).release(reservation) } {
                Ok(()) => slot.unmap(),
                Err(e) => warn!("region {id} leaked: {e}"),
            }
        }
    }
}
