// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! KernelRegion - pages backed by a task-owned kernel memory object.
//!
//! Each reservation creates its own memory object, sizes it with
//! `ftruncate` and maps it `MAP_SHARED`. The backend keeps the object's
//! descriptor for as long as the reservation is live. Exported handles hold
//! duplicates of that descriptor, so the object outlives the release of the
//! exporting region for as long as any handle or imported mapping exists.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use log::{debug, trace};

use crate::error::RegionError;
use crate::export::SharedHandle;
use crate::page::round_to_page;
use crate::protection::Protection;

use super::reservations::Reservations;
use super::{Backend, BackendKind, Reservation, sys};

/// Backend over kernel memory objects mapped `MAP_SHARED`.
#[derive(Debug, Default)]
pub struct KernelRegion {
    live: Reservations<OwnedFd>,
}

impl KernelRegion {
    /// Creates a backend with no live reservations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ranges reserved and not yet released.
    pub fn live_reservations(&self) -> Result<usize, RegionError> {
        self.live.len()
    }
}

#[cfg(target_os = "linux")]
fn open_memory_object() -> Result<OwnedFd, i32> {
    let fd = unsafe { libc::memfd_create(c"vmregion".as_ptr(), libc::MFD_CLOEXEC) };

    if fd < 0 {
        return Err(sys::errno());
    }

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

#[cfg(not(target_os = "linux"))]
fn open_memory_object() -> Result<OwnedFd, i32> {
    use core::sync::atomic::{AtomicU64, Ordering};
    use std::ffi::CString;

    static NEXT_OBJECT: AtomicU64 = AtomicU64::new(0);

    let name = format!(
        "/vmregion.{}.{}",
        std::process::id(),
        NEXT_OBJECT.fetch_add(1, Ordering::Relaxed)
    );
    let name = CString::new(name).map_err(|_| libc::EINVAL)?;

    let flags = libc::O_RDWR | libc::O_CREAT | libc::O_EXCL;
    let fd = unsafe { libc::shm_open(name.as_ptr(), flags, 0o600) };

    if fd < 0 {
        return Err(sys::errno());
    }

    // The name is only needed to obtain the descriptor.
    unsafe { libc::shm_unlink(name.as_ptr()) };

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn create_memory_object(len: usize) -> Result<OwnedFd, RegionError> {
    let exhausted = |errno| RegionError::ResourceExhausted { size: len, errno };

    let object = open_memory_object().map_err(exhausted)?;
    let object_len = libc::off_t::try_from(len).map_err(|_| exhausted(libc::EFBIG))?;

    let failed = unsafe { libc::ftruncate(object.as_raw_fd(), object_len) } != 0;

    if failed {
        return Err(exhausted(sys::errno()));
    }

    Ok(object)
}

impl Backend for KernelRegion {
    fn kind(&self) -> BackendKind {
        BackendKind::KernelRegion
    }

    fn reserve(&self, size: usize) -> Result<Reservation, RegionError> {
        let len = round_to_page(size).ok_or(RegionError::InvalidArgument { size })?;
        let object = create_memory_object(len)?;
        let reservation = sys::map(len, libc::MAP_SHARED, object.as_raw_fd())?;

        if let Err(e) = self.live.insert(reservation, object) {
            let _ = unsafe { sys::unmap(reservation) };
            return Err(e);
        }

        debug!("kernel: reserved {len} bytes (requested {size})");

        Ok(reservation)
    }

    unsafe fn release(&self, reservation: Reservation) -> Result<(), RegionError> {
        // Dropping the descriptor closes the task's reference to the object.
        let object = self
            .live
            .take_with(reservation, |_| unsafe { sys::unmap(reservation) })?;
        drop(object);

        debug!("kernel: released {} bytes", reservation.len());

        Ok(())
    }

    fn reprotect(&self, reservation: Reservation, mode: Protection) -> Result<(), RegionError> {
        self.live.with(reservation, |_| sys::protect(reservation, mode))?;

        trace!("kernel: {} bytes now {mode}", reservation.len());

        Ok(())
    }

    fn supports_export(&self) -> bool {
        true
    }

    fn export(
        &self,
        reservation: Reservation,
        mode: Protection,
    ) -> Result<SharedHandle, RegionError> {
        let object = self.live.with(reservation, |object| {
            object.try_clone().map_err(|e| RegionError::Handle {
                errno: e.raw_os_error().unwrap_or(0),
            })
        })?;

        debug!("kernel: exported {} bytes as {mode}", reservation.len());

        Ok(SharedHandle::new(object, reservation.len(), mode))
    }
}
