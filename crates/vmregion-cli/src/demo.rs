// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Single-region walkthrough, printed step by step.

use anyhow::{Context, Result, bail};

use vmregion::{BackendKind, Protection, Region, RegionAllocator, RegionError, page_size};

const FIRST_MESSAGE: &[u8] = b"Hi\0";
const SECOND_MESSAGE: &[u8] = b"Hello again\0";

pub fn run(backend: BackendKind) -> Result<()> {
    let allocator = RegionAllocator::new();
    let controller = allocator.protection();

    let region = allocator
        .allocate(page_size(), backend)
        .with_context(|| format!("failed to allocate a page from the {backend} backend"))?;
    println!(
        "allocated region {} ({} bytes, {backend})",
        region.id(),
        region.len()
    );

    region
        .open_mut(|bytes| bytes[..FIRST_MESSAGE.len()].copy_from_slice(FIRST_MESSAGE))
        .context("failed to write first message")?;
    println!("wrote {:?}", message(&region)?);

    controller
        .set_protection(&region, Protection::ReadOnly)
        .context("failed to switch to read-only")?;
    println!("state: {}", region.state()?);
    println!("read {:?}", message(&region)?);

    match region.open_mut(|_| ()) {
        Err(RegionError::NotWritable) => println!("write refused while read-only"),
        other => bail!("read-only region accepted a write: {other:?}"),
    }

    controller
        .set_protection(&region, Protection::ReadWrite)
        .context("failed to switch back to read-write")?;
    println!("state: {}", region.state()?);

    region
        .open_mut(|bytes| bytes[..SECOND_MESSAGE.len()].copy_from_slice(SECOND_MESSAGE))
        .context("failed to write second message")?;
    println!("wrote {:?}", message(&region)?);

    if allocator.supports_export(backend) {
        let handle = allocator
            .exporter()
            .export(&region)
            .context("failed to export region")?;
        println!(
            "exported handle ({} bytes, {})",
            handle.len(),
            handle.protection()
        );
    } else {
        println!("export unsupported by {backend}");
    }

    allocator
        .release(&region)
        .context("failed to release region")?;
    println!("released, state: {}", region.state()?);

    match allocator.release(&region) {
        Err(e @ RegionError::NotOwned(_)) => println!("second release refused: {e}"),
        other => bail!("second release was not refused: {other:?}"),
    }

    Ok(())
}

fn message(region: &Region) -> Result<String> {
    let text = region.open(|bytes| {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    })?;

    Ok(text)
}
