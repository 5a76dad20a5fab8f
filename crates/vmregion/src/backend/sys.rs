// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Thin wrappers over mmap/munmap/mprotect with errno mapping.

use core::ptr;
use std::os::fd::RawFd;

use crate::error::RegionError;
use crate::protection::Protection;

use super::Reservation;

pub(crate) fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Maps `len` bytes read-write. `len` must already be page-rounded.
pub(crate) fn map(len: usize, flags: libc::c_int, fd: RawFd) -> Result<Reservation, RegionError> {
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            Protection::ReadWrite.as_prot(),
            flags,
            fd,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return Err(RegionError::ResourceExhausted {
            size: len,
            errno: errno(),
        });
    }

    Ok(Reservation::new(ptr as usize, len))
}

/// # Safety
///
/// No reference into the range may be alive.
pub(crate) unsafe fn unmap(reservation: Reservation) -> Result<(), RegionError> {
    let failed =
        unsafe { libc::munmap(reservation.as_ptr() as *mut libc::c_void, reservation.len()) } != 0;

    if failed {
        return Err(RegionError::InvalidRegion);
    }

    Ok(())
}

pub(crate) fn protect(reservation: Reservation, mode: Protection) -> Result<(), RegionError> {
    let failed = unsafe {
        libc::mprotect(
            reservation.as_ptr() as *mut libc::c_void,
            reservation.len(),
            mode.as_prot(),
        )
    } != 0;

    if failed {
        return Err(match errno() {
            libc::EACCES | libc::ENOTSUP | libc::EPERM => RegionError::UnsupportedProtection(mode),
            _ => RegionError::InvalidRegion,
        });
    }

    Ok(())
}
