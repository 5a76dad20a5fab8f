// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Per-backend table of live reservations.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::RegionError;

use super::Reservation;

/// Live ranges keyed by base address, each with the resource that backs it.
#[derive(Debug)]
pub(crate) struct Reservations<T> {
    live: Mutex<HashMap<usize, (usize, T)>>,
}

impl<T> Default for Reservations<T> {
    fn default() -> Self {
        Self {
            live: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Reservations<T> {
    pub(crate) fn insert(&self, reservation: Reservation, resource: T) -> Result<(), RegionError> {
        let mut live = self.live.lock()?;
        live.insert(reservation.base(), (reservation.len(), resource));

        Ok(())
    }

    /// Runs `f` on the resource of a live reservation, holding the table lock.
    pub(crate) fn with<R>(
        &self,
        reservation: Reservation,
        f: impl FnOnce(&T) -> Result<R, RegionError>,
    ) -> Result<R, RegionError> {
        let live = self.live.lock()?;

        match live.get(&reservation.base()) {
            Some((len, resource)) if *len == reservation.len() => f(resource),
            _ => Err(RegionError::InvalidRegion),
        }
    }

    /// Runs `f` on a live reservation and removes it if `f` succeeds.
    pub(crate) fn take_with(
        &self,
        reservation: Reservation,
        f: impl FnOnce(&T) -> Result<(), RegionError>,
    ) -> Result<T, RegionError> {
        let mut live = self.live.lock()?;

        match live.get(&reservation.base()) {
            Some((len, resource)) if *len == reservation.len() => f(resource)?,
            _ => return Err(RegionError::InvalidRegion),
        }

        live.remove(&reservation.base())
            .map(|(_, resource)| resource)
            .ok_or(RegionError::InvalidRegion)
    }

    pub(crate) fn len(&self) -> Result<usize, RegionError> {
        Ok(self.live.lock()?.len())
    }
}
