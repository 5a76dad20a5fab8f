// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! EquivalenceVerifier - drives every backend through the same region
//! lifecycle and compares what each one observed.
//!
//! Sequence per backend:
//!
//! ```text
//! allocate → write → read → read-only → read → read-write → read → release
//!          → release again (expects NotOwned)
//!          → set protection (expects InvalidTransition)
//! ```
//!
//! A failing step ends the sequence for that backend. Backends are
//! equivalent when they recorded the same outcomes in the same order, and
//! every read-back returned the written pattern.
//!
//! A failing step up to and including release means the lifecycle never
//! completed. [`ComparisonResult::lifecycle_error`] reports the first one.

use std::time::{Duration, Instant};

use crate::allocator::RegionAllocator;
use crate::backend::BackendKind;
use crate::error::{RegionError, RegionErrorKind};
use crate::protection::Protection;
use crate::region::Region;

/// Bytes every pattern starts with.
pub const PATTERN_PREFIX: &[u8] = b"Hi\0";

/// Writes the verification pattern for `seed` into `bytes`.
///
/// `"Hi\0"` followed by a position-derived sequence.
pub fn fill_with_pattern(bytes: &mut [u8], seed: u8) {
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = match PATTERN_PREFIX.get(i) {
            Some(prefix) => *prefix,
            None => (i as u8).wrapping_mul(31).wrapping_add(seed),
        };
    }
}

/// One operation of the verification sequence.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Step {
    /// Reserve the region.
    Allocate,
    /// Fill the region with the pattern.
    Write,
    /// Copy the region's bytes out.
    ReadBack,
    /// Change protection to the given mode.
    SetProtection(Protection),
    /// Release the region.
    Release,
    /// Release the same region a second time.
    ReleaseAgain,
    /// Change protection of the released region.
    SetProtectionAfterRelease,
}

impl core::fmt::Display for Step {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Allocate => f.write_str("allocate"),
            Self::Write => f.write_str("write pattern"),
            Self::ReadBack => f.write_str("read back"),
            Self::SetProtection(mode) => write!(f, "set {mode}"),
            Self::Release => f.write_str("release"),
            Self::ReleaseAgain => f.write_str("release again"),
            Self::SetProtectionAfterRelease => f.write_str("set protection after release"),
        }
    }
}

impl Step {
    /// Returns true for the steps that run after release and are expected to fail.
    pub fn is_after_release(self) -> bool {
        matches!(self, Self::ReleaseAgain | Self::SetProtectionAfterRelease)
    }
}

/// What happened when a step ran.
#[derive(Clone, Eq, PartialEq)]
pub struct StepRecord {
    /// The step.
    pub step: Step,
    /// `Ok` or the kind of error the step failed with.
    pub outcome: Result<(), RegionErrorKind>,
    /// Bytes observed by a successful read-back.
    pub bytes: Option<Vec<u8>>,
}

impl core::fmt::Debug for StepRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StepRecord")
            .field("step", &self.step)
            .field("outcome", &self.outcome)
            .field("bytes", &self.bytes.as_ref().map(Vec::len))
            .finish()
    }
}

/// Everything one backend did during a comparison.
#[derive(Debug, Clone)]
pub struct BackendReport {
    /// The backend.
    pub backend: BackendKind,
    /// Whether the backend can export. Informational, not compared.
    pub supports_export: bool,
    /// Wall-clock time spent in the sequence.
    pub elapsed: Duration,
    /// Page-rounded length of the region, 0 if allocation failed.
    pub region_len: usize,
    /// Steps in the order they ran.
    pub steps: Vec<StepRecord>,
}

impl BackendReport {
    /// Returns true if every read-back matched the written pattern.
    pub fn read_backs_match(&self, expected: &[u8]) -> bool {
        self.steps
            .iter()
            .filter_map(|record| record.bytes.as_deref())
            .all(|bytes| bytes == expected)
    }

    /// Returns true if every read-back equals the pattern for `seed` over
    /// the whole region.
    pub fn pattern_intact(&self, seed: u8) -> bool {
        let mut expected = vec![0u8; self.region_len];
        fill_with_pattern(&mut expected, seed);

        self.read_backs_match(&expected)
    }

    /// First failed step of the lifecycle, ignoring the steps that run after release.
    pub fn lifecycle_error(&self) -> Option<(Step, RegionErrorKind)> {
        self.steps
            .iter()
            .filter(|record| !record.step.is_after_release())
            .find_map(|record| record.outcome.err().map(|kind| (record.step, kind)))
    }

    fn observed_same_as(&self, other: &BackendReport) -> bool {
        self.steps == other.steps
    }
}

/// Outcome of [`EquivalenceVerifier::compare`].
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    /// Size requested for every region.
    pub size_bytes: usize,
    /// Seed the pattern was derived from.
    pub seed: u8,
    /// One report per backend, in [`BackendKind::ALL`] order.
    pub reports: Vec<BackendReport>,
    /// True iff every read-back of every backend matched the pattern.
    pub patterns_intact: bool,
    /// True iff all backends recorded identical outcomes and read-backs,
    /// and those read-backs matched the pattern.
    pub behaviorally_equivalent: bool,
}

impl ComparisonResult {
    /// Evaluates the reports of one run.
    pub fn from_reports(size_bytes: usize, seed: u8, reports: Vec<BackendReport>) -> Self {
        let patterns_intact = reports.iter().all(|report| report.pattern_intact(seed));
        let same_observations = reports
            .split_first()
            .is_some_and(|(first, rest)| rest.iter().all(|r| r.observed_same_as(first)));

        Self {
            size_bytes,
            seed,
            reports,
            patterns_intact,
            behaviorally_equivalent: same_observations && patterns_intact,
        }
    }

    /// First backend whose lifecycle failed, with the failing step.
    ///
    /// `None` means every backend completed allocate through release.
    pub fn lifecycle_error(&self) -> Option<(BackendKind, Step, RegionErrorKind)> {
        self.reports.iter().find_map(|report| {
            report
                .lifecycle_error()
                .map(|(step, kind)| (report.backend, step, kind))
        })
    }
}

/// Runs the same region lifecycle on every backend.
#[derive(Debug)]
pub struct EquivalenceVerifier<'a> {
    allocator: &'a RegionAllocator,
    seed: u8,
}

impl<'a> EquivalenceVerifier<'a> {
    /// Creates a verifier over `allocator` with the default pattern seed.
    pub fn new(allocator: &'a RegionAllocator) -> Self {
        Self::with_seed(allocator, 0x5A)
    }

    /// Creates a verifier whose pattern is derived from `seed`.
    pub fn with_seed(allocator: &'a RegionAllocator, seed: u8) -> Self {
        Self { allocator, seed }
    }

    /// Drives every backend through the sequence with `size_bytes` regions.
    pub fn compare(&self, size_bytes: usize) -> ComparisonResult {
        let reports: Vec<BackendReport> = BackendKind::ALL
            .iter()
            .map(|&backend| self.run(backend, size_bytes))
            .collect();

        ComparisonResult::from_reports(size_bytes, self.seed, reports)
    }

    fn run(&self, backend: BackendKind, size_bytes: usize) -> BackendReport {
        let mut steps = Vec::new();
        let mut region_len = 0;
        let started = Instant::now();

        let _ = self.sequence(backend, size_bytes, &mut region_len, &mut steps);

        BackendReport {
            backend,
            supports_export: self.allocator.supports_export(backend),
            elapsed: started.elapsed(),
            region_len,
            steps,
        }
    }

    fn sequence(
        &self,
        backend: BackendKind,
        size_bytes: usize,
        region_len: &mut usize,
        steps: &mut Vec<StepRecord>,
    ) -> Result<(), RegionError> {
        let controller = self.allocator.protection();

        let region = record(steps, Step::Allocate, || {
            self.allocator.allocate(size_bytes, backend)
        })?;
        *region_len = region.len();

        let sequence = (|| {
            record(steps, Step::Write, || {
                region.open_mut(|bytes| fill_with_pattern(bytes, self.seed))
            })?;
            read_back(steps, &region)?;

            record(steps, Step::SetProtection(Protection::ReadOnly), || {
                controller.set_protection(&region, Protection::ReadOnly)
            })?;
            read_back(steps, &region)?;

            record(steps, Step::SetProtection(Protection::ReadWrite), || {
                controller.set_protection(&region, Protection::ReadWrite)
            })?;
            read_back(steps, &region)
        })();

        let released = record(steps, Step::Release, || self.allocator.release(&region));

        sequence?;
        released?;

        let _ = record(steps, Step::ReleaseAgain, || self.allocator.release(&region));
        let _ = record(steps, Step::SetProtectionAfterRelease, || {
            controller.set_protection(&region, Protection::ReadWrite)
        });

        Ok(())
    }
}

fn record<T>(
    steps: &mut Vec<StepRecord>,
    step: Step,
    f: impl FnOnce() -> Result<T, RegionError>,
) -> Result<T, RegionError> {
    let result = f();

    steps.push(StepRecord {
        step,
        outcome: result.as_ref().map(|_| ()).map_err(RegionError::kind),
        bytes: None,
    });

    result
}

fn read_back(steps: &mut Vec<StepRecord>, region: &Region) -> Result<(), RegionError> {
    let result = region.open(|bytes| bytes.to_vec());

    steps.push(StepRecord {
        step: Step::ReadBack,
        outcome: result.as_ref().map(|_| ()).map_err(RegionError::kind),
        bytes: result.as_ref().ok().cloned(),
    });

    result.map(|_| ())
}

impl core::fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "equivalence check: {} bytes", self.size_bytes)?;

        for report in &self.reports {
            writeln!(
                f,
                "  {:<10} {:>12}  export: {}",
                report.backend.name(),
                format!("{:.3?}", report.elapsed),
                if report.supports_export { "yes" } else { "no" }
            )?;

            for record in &report.steps {
                match record.outcome {
                    Ok(()) => writeln!(f, "    {:<30} ok", record.step.to_string())?,
                    Err(kind) => writeln!(f, "    {:<30} {kind}", record.step.to_string())?,
                }
            }
        }

        writeln!(
            f,
            "read-backs match pattern: {}",
            if self.patterns_intact { "yes" } else { "no" }
        )?;

        write!(
            f,
            "behaviorally equivalent: {}",
            if self.behaviorally_equivalent { "yes" } else { "no" }
        )
    }
}
