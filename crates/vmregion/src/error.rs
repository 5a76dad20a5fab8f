// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for vmregion.
use thiserror::Error;

use crate::backend::BackendKind;
use crate::protection::Protection;
use crate::region::RegionId;

/// Errors that can occur while managing regions.
///
/// Every variant is recoverable at the call site. Writing through a
/// read-only mapping is not represented here: it is a fault raised by the
/// host, not an error.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum RegionError {
    /// The requested size is zero or cannot be rounded to page granularity.
    #[error("invalid size: {size} bytes")]
    InvalidArgument {
        /// Size supplied by the caller.
        size: usize,
    },

    /// The host refused to reserve the range.
    #[error("host refused to reserve {size} bytes (errno {errno})")]
    ResourceExhausted {
        /// Page-rounded size that was requested from the host.
        size: usize,
        /// `errno` reported by the failing syscall.
        errno: i32,
    },

    /// Address and size do not match a live reservation of the backend.
    #[error("address range does not match a live reservation")]
    InvalidRegion,

    /// The allocator does not hold the region (never did, or already released it).
    #[error("region {0} is not owned by this allocator")]
    NotOwned(RegionId),

    /// No live region carries the identity.
    #[error("region {0} not found")]
    NotFound(RegionId),

    /// The region is unmapped; no further transitions are possible.
    #[error("region is unmapped")]
    InvalidTransition,

    /// The backend cannot apply the requested protection.
    #[error("backend cannot apply {0} protection")]
    UnsupportedProtection(Protection),

    /// The backend cannot produce shared handles.
    #[error("{0} backend cannot export regions")]
    ExportUnsupported(BackendKind),

    /// Mutable access was requested while the region is read-only.
    #[error("region is read-only")]
    NotWritable,

    /// A shared handle could not be duplicated or mapped.
    #[error("shared handle operation failed (errno {errno})")]
    Handle {
        /// `errno` reported by the failing syscall.
        errno: i32,
    },

    /// A mutex was poisoned.
    #[error("mutex poisoned")]
    MutexPoisoned,
}

/// Field-less classification of [`RegionError`].
///
/// Two failures of the same kind compare equal even when they carry
/// different identities or `errno` values.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RegionErrorKind {
    InvalidArgument,
    ResourceExhausted,
    InvalidRegion,
    NotOwned,
    NotFound,
    InvalidTransition,
    UnsupportedProtection,
    ExportUnsupported,
    NotWritable,
    Handle,
    MutexPoisoned,
}

impl RegionError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> RegionErrorKind {
        match self {
            Self::InvalidArgument { .. } => RegionErrorKind::InvalidArgument,
            Self::ResourceExhausted { .. } => RegionErrorKind::ResourceExhausted,
            Self::InvalidRegion => RegionErrorKind::InvalidRegion,
            Self::NotOwned(_) => RegionErrorKind::NotOwned,
            Self::NotFound(_) => RegionErrorKind::NotFound,
            Self::InvalidTransition => RegionErrorKind::InvalidTransition,
            Self::UnsupportedProtection(_) => RegionErrorKind::UnsupportedProtection,
            Self::ExportUnsupported(_) => RegionErrorKind::ExportUnsupported,
            Self::NotWritable => RegionErrorKind::NotWritable,
            Self::Handle { .. } => RegionErrorKind::Handle,
            Self::MutexPoisoned => RegionErrorKind::MutexPoisoned,
        }
    }
}

impl core::fmt::Display for RegionErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

impl<T> From<std::sync::PoisonError<T>> for RegionError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::MutexPoisoned
    }
}
