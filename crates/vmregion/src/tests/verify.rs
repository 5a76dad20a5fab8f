// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use crate::allocator::RegionAllocator;
use crate::backend::BackendKind;
use crate::error::RegionErrorKind;
use crate::page::page_size;
use crate::protection::Protection;
use crate::verify::{
    BackendReport, ComparisonResult, EquivalenceVerifier, PATTERN_PREFIX, Step, StepRecord,
    fill_with_pattern,
};

fn expected_pattern(len: usize, seed: u8) -> Vec<u8> {
    let mut expected = vec![0u8; len];
    fill_with_pattern(&mut expected, seed);
    expected
}

// =============================================================================
// fill_with_pattern()
// =============================================================================

#[test]
fn test_pattern_starts_with_prefix() {
    let pattern = expected_pattern(64, 0x00);

    assert_eq!(&pattern[..3], PATTERN_PREFIX);
    assert_eq!(&pattern[..3], &[0x48, 0x69, 0x00]);
}

#[test]
fn test_pattern_shorter_than_prefix() {
    let pattern = expected_pattern(2, 0x00);

    assert_eq!(pattern, b"Hi");
}

#[test]
fn test_pattern_depends_on_seed() {
    assert_ne!(expected_pattern(64, 0x01), expected_pattern(64, 0x02));
}

// =============================================================================
// compare()
// =============================================================================

#[test]
fn test_compare_one_mebibyte_is_equivalent() {
    let allocator = RegionAllocator::new();
    let verifier = EquivalenceVerifier::new(&allocator);

    let result = verifier.compare(1_048_576);

    assert!(result.behaviorally_equivalent);
    assert_eq!(result.size_bytes, 1_048_576);
    assert_eq!(result.reports.len(), BackendKind::ALL.len());
    assert_eq!(allocator.len(), Ok(0));
}

#[test]
fn test_compare_records_full_sequence() {
    let allocator = RegionAllocator::new();
    let result = EquivalenceVerifier::with_seed(&allocator, 0x11).compare(4096);
    let expected = expected_pattern(page_size(), 0x11);

    for report in &result.reports {
        let steps: Vec<Step> = report.steps.iter().map(|record| record.step).collect();

        assert_eq!(
            steps,
            [
                Step::Allocate,
                Step::Write,
                Step::ReadBack,
                Step::SetProtection(Protection::ReadOnly),
                Step::ReadBack,
                Step::SetProtection(Protection::ReadWrite),
                Step::ReadBack,
                Step::Release,
                Step::ReleaseAgain,
                Step::SetProtectionAfterRelease,
            ]
        );

        assert!(report.read_backs_match(&expected));
        assert!(report.pattern_intact(0x11));
        assert_eq!(report.steps[8].outcome, Err(RegionErrorKind::NotOwned));
        assert_eq!(
            report.steps[9].outcome,
            Err(RegionErrorKind::InvalidTransition)
        );
    }

    assert!(result.patterns_intact);
    assert_eq!(result.lifecycle_error(), None);
}

#[test]
fn test_compare_rounds_read_backs_to_page() {
    let allocator = RegionAllocator::new();
    let result = EquivalenceVerifier::new(&allocator).compare(10);

    for report in &result.reports {
        for record in &report.steps {
            if let Some(bytes) = &record.bytes {
                assert_eq!(bytes.len(), page_size());
            }
        }
    }
}

#[test]
fn test_compare_reports_export_capability() {
    let allocator = RegionAllocator::new();
    let result = EquivalenceVerifier::new(&allocator).compare(4096);

    let capability: Vec<(BackendKind, bool)> = result
        .reports
        .iter()
        .map(|report| (report.backend, report.supports_export))
        .collect();

    assert_eq!(
        capability,
        [
            (BackendKind::AnonymousMapping, false),
            (BackendKind::KernelRegion, true)
        ]
    );
}

#[test]
fn test_compare_zero_fails_identically() {
    let allocator = RegionAllocator::new();
    let result = EquivalenceVerifier::new(&allocator).compare(0);

    assert!(result.behaviorally_equivalent);
    assert_eq!(
        result.lifecycle_error(),
        Some((
            BackendKind::AnonymousMapping,
            Step::Allocate,
            RegionErrorKind::InvalidArgument
        ))
    );

    for report in &result.reports {
        assert_eq!(report.region_len, 0);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(
            report.steps[0].outcome,
            Err(RegionErrorKind::InvalidArgument)
        );
    }
}

#[test]
fn test_compare_unroundable_size_is_lifecycle_error() {
    let allocator = RegionAllocator::new();
    let result = EquivalenceVerifier::new(&allocator).compare(usize::MAX);

    let (backend, step, kind) = result
        .lifecycle_error()
        .expect("Failed to report lifecycle_error()");

    assert_eq!(backend, BackendKind::AnonymousMapping);
    assert_eq!(step, Step::Allocate);
    assert_eq!(kind, RegionErrorKind::InvalidArgument);
}

// =============================================================================
// ComparisonResult::from_reports()
// =============================================================================

fn read_back(bytes: Vec<u8>) -> StepRecord {
    StepRecord {
        step: Step::ReadBack,
        outcome: Ok(()),
        bytes: Some(bytes),
    }
}

fn ok(step: Step) -> StepRecord {
    StepRecord {
        step,
        outcome: Ok(()),
        bytes: None,
    }
}

fn report(backend: BackendKind, region_len: usize, steps: Vec<StepRecord>) -> BackendReport {
    BackendReport {
        backend,
        supports_export: false,
        elapsed: Default::default(),
        region_len,
        steps,
    }
}

#[test]
fn test_read_backs_match_detects_mismatch() {
    let report = report(
        BackendKind::AnonymousMapping,
        3,
        vec![read_back(vec![1, 2, 3])],
    );

    assert!(report.read_backs_match(&[1, 2, 3]));
    assert!(!report.read_backs_match(&[1, 2, 4]));
}

#[test]
fn test_identical_lost_writes_are_not_equivalent() {
    let zeroed = || {
        vec![
            ok(Step::Allocate),
            ok(Step::Write),
            read_back(vec![0u8; 64]),
            ok(Step::Release),
        ]
    };

    let result = ComparisonResult::from_reports(
        64,
        0x5A,
        vec![
            report(BackendKind::AnonymousMapping, 64, zeroed()),
            report(BackendKind::KernelRegion, 64, zeroed()),
        ],
    );

    assert!(!result.patterns_intact);
    assert!(!result.behaviorally_equivalent);
    assert_eq!(result.lifecycle_error(), None);
}

#[test]
fn test_intact_identical_reports_are_equivalent() {
    let intact = || {
        vec![
            ok(Step::Allocate),
            ok(Step::Write),
            read_back(expected_pattern(64, 0x5A)),
            ok(Step::Release),
        ]
    };

    let result = ComparisonResult::from_reports(
        64,
        0x5A,
        vec![
            report(BackendKind::AnonymousMapping, 64, intact()),
            report(BackendKind::KernelRegion, 64, intact()),
        ],
    );

    assert!(result.patterns_intact);
    assert!(result.behaviorally_equivalent);
}

#[test]
fn test_diverging_outcomes_are_not_equivalent() {
    let failed_release = StepRecord {
        step: Step::Release,
        outcome: Err(RegionErrorKind::InvalidRegion),
        bytes: None,
    };

    let result = ComparisonResult::from_reports(
        64,
        0x5A,
        vec![
            report(
                BackendKind::AnonymousMapping,
                64,
                vec![ok(Step::Allocate), ok(Step::Release)],
            ),
            report(
                BackendKind::KernelRegion,
                64,
                vec![ok(Step::Allocate), failed_release],
            ),
        ],
    );

    assert!(!result.behaviorally_equivalent);
    assert_eq!(
        result.lifecycle_error(),
        Some((
            BackendKind::KernelRegion,
            Step::Release,
            RegionErrorKind::InvalidRegion
        ))
    );
}

#[test]
fn test_failures_after_release_are_not_lifecycle_errors() {
    let release_again = StepRecord {
        step: Step::ReleaseAgain,
        outcome: Err(RegionErrorKind::NotOwned),
        bytes: None,
    };
    let report = report(
        BackendKind::KernelRegion,
        64,
        vec![ok(Step::Release), release_again],
    );

    assert_eq!(report.lifecycle_error(), None);
    assert!(Step::ReleaseAgain.is_after_release());
    assert!(Step::SetProtectionAfterRelease.is_after_release());
    assert!(!Step::Release.is_after_release());
}

#[test]
fn test_display_report() {
    let allocator = RegionAllocator::new();
    let result = EquivalenceVerifier::new(&allocator).compare(4096);
    let text = result.to_string();

    assert!(text.starts_with("equivalence check: 4096 bytes"));
    assert!(text.contains("anonymous"));
    assert!(text.contains("kernel"));
    assert!(text.contains("release again"));
    assert!(text.contains("NotOwned"));
    assert!(text.contains("read-backs match pattern: yes"));
    assert!(text.ends_with("behaviorally equivalent: yes"));
}
