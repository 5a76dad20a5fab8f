// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Page granularity helpers.

use std::sync::OnceLock;

use log::warn;

/// Page size assumed when the host does not report a usable one.
pub(crate) const FALLBACK_PAGE_SIZE: usize = 4096;

/// Returns the host page size in bytes.
///
/// Queried once with `sysconf(_SC_PAGESIZE)`. If the host reports an error
/// or a value that is not a power of two, 4096 bytes are used instead.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

    *PAGE_SIZE.get_or_init(|| page_size_from(unsafe { libc::sysconf(libc::_SC_PAGESIZE) }))
}

pub(crate) fn page_size_from(reported: libc::c_long) -> usize {
    match usize::try_from(reported) {
        Ok(size) if size.is_power_of_two() => size,
        _ => {
            warn!("unusable page size {reported} from sysconf, assuming {FALLBACK_PAGE_SIZE}");
            FALLBACK_PAGE_SIZE
        }
    }
}

/// Rounds `size` up to the next multiple of the host page size.
///
/// Returns `None` when `size` is zero or the rounded value overflows.
pub fn round_to_page(size: usize) -> Option<usize> {
    if size == 0 {
        return None;
    }

    size.checked_next_multiple_of(page_size())
}
