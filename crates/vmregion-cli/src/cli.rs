// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use clap::{Parser, Subcommand, ValueEnum};

use vmregion::BackendKind;

/// Virtual memory regions: backend equivalence check and protection walkthrough.
#[derive(Parser, Debug)]
#[command(name = "vmregion", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the same region lifecycle on every backend and compare the results.
    Verify {
        /// Region size in bytes.
        #[arg(long, default_value_t = 1_048_576)]
        size: usize,
    },

    /// Walk one region through read-write, read-only and release.
    Demo {
        /// Backend to allocate from.
        #[arg(long, value_enum, default_value_t = BackendArg::Anonymous)]
        backend: BackendArg,
    },

    /// Print the host page size.
    PageSize,
}

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackendArg {
    /// Process-private anonymous mapping.
    Anonymous,
    /// Kernel memory object, exportable.
    Kernel,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Anonymous => BackendKind::AnonymousMapping,
            BackendArg::Kernel => BackendKind::KernelRegion,
        }
    }
}
