// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! SharedMemoryExporter - transferable handles to a region's backing object.
//!
//! # Handle lifetime
//!
//! A [`SharedHandle`] holds its own descriptor of the kernel memory object.
//! The exporting region still follows the allocator's release path, and
//! releasing it does not invalidate handles or imported mappings: the host
//! reference-counts the object. This holds for [`KernelRegion`], the only
//! exporting backend; [`AnonymousMapping`] never produces handles.
//!
//! Handles do not track protection changes made after export, on either
//! side.
//!
//! [`KernelRegion`]: crate::KernelRegion
//! [`AnonymousMapping`]: crate::AnonymousMapping

use core::ptr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use log::debug;

use crate::allocator::RegionAllocator;
use crate::backend::{Reservation, sys};
use crate::error::RegionError;
use crate::protection::Protection;
use crate::region::Region;

/// Opaque, transferable reference to a region's backing memory object.
#[derive(Debug)]
pub struct SharedHandle {
    object: OwnedFd,
    len: usize,
    protection: Protection,
}

impl SharedHandle {
    pub(crate) fn new(object: OwnedFd, len: usize, protection: Protection) -> Self {
        Self {
            object,
            len,
            protection,
        }
    }

    /// Rebuilds a handle from parts received from another process.
    ///
    /// # Safety
    ///
    /// `fd` must be an open descriptor of a memory object at least `len`
    /// bytes long, owned by the caller. Accessing an imported mapping past
    /// the object's end raises SIGBUS.
    pub unsafe fn from_raw_parts(fd: RawFd, len: usize, protection: Protection) -> Self {
        Self {
            object: unsafe { OwnedFd::from_raw_fd(fd) },
            len,
            protection,
        }
    }

    /// Splits the handle into parts for transfer. The caller owns the descriptor.
    pub fn into_raw_parts(self) -> (RawFd, usize, Protection) {
        (self.object.into_raw_fd(), self.len, self.protection)
    }

    /// Size of the shared memory in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the handle covers no memory.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Protection suggested at export time.
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Duplicates the handle.
    pub fn try_clone(&self) -> Result<Self, RegionError> {
        let object = self.object.try_clone().map_err(|e| RegionError::Handle {
            errno: e.raw_os_error().unwrap_or(0),
        })?;

        Ok(Self::new(object, self.len, self.protection))
    }

    /// Maps the object into this address space with the suggested protection.
    ///
    /// # Safety
    ///
    /// Same contract as [`SharedHandle::import_as`].
    ///
    /// ```compile_fail,E0133
    /// fn map(handle: &vmregion::SharedHandle) {
    ///     let _ = handle.import();
    /// }
    /// ```
    pub unsafe fn import(&self) -> Result<SharedMapping, RegionError> {
        unsafe { self.import_as(self.protection) }
    }

    /// Maps the object into this address space with `mode`.
    ///
    /// # Safety
    ///
    /// The memory object is shared. The exporting region, other imports and
    /// other processes can write to it at any time. While a slice returned
    /// by [`SharedMapping::as_slice`] or passed to
    /// [`SharedMapping::open_mut`] is alive, the caller must ensure nothing
    /// else writes to the object.
    pub unsafe fn import_as(&self, mode: Protection) -> Result<SharedMapping, RegionError> {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                self.len,
                mode.as_prot(),
                libc::MAP_SHARED,
                self.object.as_raw_fd(),
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(RegionError::Handle {
                errno: sys::errno(),
            });
        }

        debug!("imported {} bytes as {mode}", self.len);

        Ok(SharedMapping {
            mapping: Reservation::new(ptr as usize, self.len),
            protection: mode,
        })
    }
}

impl AsFd for SharedHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.object.as_fd()
    }
}

/// A shared handle mapped into the current address space. Unmapped on drop.
#[derive(Debug)]
pub struct SharedMapping {
    mapping: Reservation,
    protection: Protection,
}

impl SharedMapping {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Returns true if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Protection the mapping was imported with.
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// The mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.mapping.as_ptr(), self.mapping.len()) }
    }

    /// Runs `f` over the mapped bytes, mutably.
    ///
    /// Fails with [`RegionError::NotWritable`] on read-only imports.
    pub fn open_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R, RegionError> {
        if self.protection != Protection::ReadWrite {
            return Err(RegionError::NotWritable);
        }

        let bytes =
            unsafe { core::slice::from_raw_parts_mut(self.mapping.as_ptr(), self.mapping.len()) };

        Ok(f(bytes))
    }
}

impl Drop for SharedMapping {
    fn drop(&mut self) {
        let _ = unsafe { sys::unmap(self.mapping) };
    }
}

/// Produces [`SharedHandle`]s for regions of a [`RegionAllocator`].
#[derive(Debug, Clone, Copy)]
pub struct SharedMemoryExporter<'a> {
    allocator: &'a RegionAllocator,
}

impl<'a> SharedMemoryExporter<'a> {
    /// Creates an exporter for `allocator`'s regions.
    pub fn new(allocator: &'a RegionAllocator) -> Self {
        Self { allocator }
    }

    /// Exports `region`, suggesting its current protection.
    ///
    /// Fails with [`RegionError::ExportUnsupported`] for backends that cannot
    /// export, whatever the region, and with
    /// [`RegionError::InvalidTransition`] once the region is unmapped. The
    /// region's own state and release path are unaffected.
    pub fn export(&self, region: &Region) -> Result<SharedHandle, RegionError> {
        let backend = self.allocator.backend(region.backend());

        if !backend.supports_export() {
            return Err(RegionError::ExportUnsupported(region.backend()));
        }

        let slot = region.lock()?;
        let reservation = slot.reservation()?;
        let mode = slot
            .state()
            .protection()
            .ok_or(RegionError::InvalidTransition)?;

        backend.export(reservation, mode)
    }
}
