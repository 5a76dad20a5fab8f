// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! AnonymousMapping - process-private pages from `MAP_ANONYMOUS`.

use log::{debug, trace};

use crate::error::RegionError;
use crate::page::round_to_page;
use crate::protection::Protection;

use super::reservations::Reservations;
use super::{Backend, BackendKind, Reservation, sys};

/// Backend over `mmap(MAP_PRIVATE | MAP_ANONYMOUS)`.
///
/// Pages are private to the process, so there is nothing another process
/// could import: [`Backend::supports_export`] is false.
#[derive(Debug, Default)]
pub struct AnonymousMapping {
    live: Reservations<()>,
}

impl AnonymousMapping {
    /// Creates a backend with no live reservations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ranges reserved and not yet released.
    pub fn live_reservations(&self) -> Result<usize, RegionError> {
        self.live.len()
    }
}

impl Backend for AnonymousMapping {
    fn kind(&self) -> BackendKind {
        BackendKind::AnonymousMapping
    }

    fn reserve(&self, size: usize) -> Result<Reservation, RegionError> {
        let len = round_to_page(size).ok_or(RegionError::InvalidArgument { size })?;
        let reservation = sys::map(len, libc::MAP_PRIVATE | libc::MAP_ANONYMOUS, -1)?;

        if let Err(e) = self.live.insert(reservation, ()) {
            let _ = unsafe { sys::unmap(reservation) };
            return Err(e);
        }

        debug!("anonymous: reserved {len} bytes (requested {size})");

        Ok(reservation)
    }

    unsafe fn release(&self, reservation: Reservation) -> Result<(), RegionError> {
        self.live.take_with(reservation, |_| unsafe { sys::unmap(reservation) })?;

        debug!("anonymous: released {} bytes", reservation.len());

        Ok(())
    }

    fn reprotect(&self, reservation: Reservation, mode: Protection) -> Result<(), RegionError> {
        self.live.with(reservation, |_| sys::protect(reservation, mode))?;

        trace!("anonymous: {} bytes now {mode}", reservation.len());

        Ok(())
    }

    fn supports_export(&self) -> bool {
        false
    }
}
