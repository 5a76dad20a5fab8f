// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

mod cli;
mod demo;

use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Parser;
use log::{debug, error};

use vmregion::{EquivalenceVerifier, RegionAllocator, page_size};

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    debug!("{cli:?}");

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Verify { size } => {
            let allocator = RegionAllocator::new();
            let result = EquivalenceVerifier::new(&allocator).compare(size);

            println!("{result}");

            if let Some((backend, step, kind)) = result.lifecycle_error() {
                bail!("{backend} backend failed at '{step}' with {kind} ({size} bytes requested)");
            }

            if result.behaviorally_equivalent {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
        Command::Demo { backend } => {
            demo::run(backend.into())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::PageSize => {
            println!("{}", page_size());
            Ok(ExitCode::SUCCESS)
        }
    }
}
