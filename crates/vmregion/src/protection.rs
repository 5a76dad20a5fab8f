// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Protection modes and the region state machine.
//!
//! ```text
//! allocate ──► ReadWrite ◄──► ReadOnly
//!                  │              │
//!                  └──► Unmapped ◄┘   (release, terminal)
//! ```

/// Protection mode a caller may request for a mapped region.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Protection {
    /// Pages may be read and written.
    ReadWrite,
    /// Pages may only be read. Writes fault.
    ReadOnly,
}

impl Protection {
    /// Host `PROT_*` flags for this mode.
    pub(crate) fn as_prot(self) -> libc::c_int {
        match self {
            Self::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
            Self::ReadOnly => libc::PROT_READ,
        }
    }
}

impl core::fmt::Display for Protection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ReadWrite => f.write_str("read-write"),
            Self::ReadOnly => f.write_str("read-only"),
        }
    }
}

/// Current protection state of a region.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ProtectionState {
    /// Released. Terminal.
    Unmapped,
    /// Mapped read-write.
    ReadWrite,
    /// Mapped read-only.
    ReadOnly,
}

impl ProtectionState {
    /// Returns true unless the region has been released.
    pub fn is_mapped(self) -> bool {
        self != Self::Unmapped
    }

    /// Returns true if writes through the mapping are permitted.
    pub fn is_writable(self) -> bool {
        self == Self::ReadWrite
    }

    /// Protection mode of a mapped region, `None` once unmapped.
    pub fn protection(self) -> Option<Protection> {
        match self {
            Self::Unmapped => None,
            Self::ReadWrite => Some(Protection::ReadWrite),
            Self::ReadOnly => Some(Protection::ReadOnly),
        }
    }
}

impl From<Protection> for ProtectionState {
    fn from(mode: Protection) -> Self {
        match mode {
            Protection::ReadWrite => Self::ReadWrite,
            Protection::ReadOnly => Self::ReadOnly,
        }
    }
}

impl core::fmt::Display for ProtectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.protection() {
            Some(mode) => core::fmt::Display::fmt(&mode, f),
            None => f.write_str("unmapped"),
        }
    }
}
