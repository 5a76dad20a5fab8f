// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

#[cfg(test)]
mod cli_tests {
    use std::process::{Command, Output};

    fn vmregion(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_vmregion"))
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run vmregion")
    }

    fn stdout(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn stderr(output: &Output) -> String {
        String::from_utf8_lossy(&output.stderr).into_owned()
    }

    // =========================================================================
    // verify
    // =========================================================================

    #[test]
    fn test_verify_default_size_is_equivalent() {
        let output = vmregion(&["verify"]);

        assert_eq!(output.status.code(), Some(0));
        assert!(stdout(&output).starts_with("equivalence check: 1048576 bytes"));
        assert!(stdout(&output).contains("behaviorally equivalent: yes"));
    }

    #[test]
    fn test_verify_small_size_is_equivalent() {
        let output = vmregion(&["verify", "--size", "10"]);

        assert_eq!(output.status.code(), Some(0));
        assert!(stdout(&output).contains("read-backs match pattern: yes"));
    }

    #[test]
    fn test_verify_zero_size_is_error() {
        let output = vmregion(&["verify", "--size", "0"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("InvalidArgument"));
        assert!(stderr(&output).contains("allocate"));
    }

    #[test]
    fn test_verify_unroundable_size_is_error() {
        let output = vmregion(&["verify", "--size", &usize::MAX.to_string()]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("InvalidArgument"));
    }

    #[test]
    fn test_verify_rejects_non_numeric_size() {
        let output = vmregion(&["verify", "--size", "lots"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(!stderr(&output).is_empty());
    }

    // =========================================================================
    // demo
    // =========================================================================

    #[test]
    fn test_demo_kernel_backend() {
        let output = vmregion(&["demo", "--backend", "kernel"]);
        let text = stdout(&output);

        assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
        assert!(text.contains("bytes, kernel)"));
        assert!(text.contains("wrote \"Hi\""));
        assert!(text.contains("state: read-only"));
        assert!(text.contains("write refused while read-only"));
        assert!(text.contains("wrote \"Hello again\""));
        assert!(text.contains("exported handle"));
        assert!(text.contains("released, state: unmapped"));
        assert!(text.contains("second release refused"));
    }

    #[test]
    fn test_demo_anonymous_backend() {
        let output = vmregion(&["demo"]);
        let text = stdout(&output);

        assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
        assert!(text.contains("export unsupported by anonymous"));
        assert!(text.contains("second release refused"));
    }

    #[test]
    fn test_demo_rejects_unknown_backend() {
        let output = vmregion(&["demo", "--backend", "mach"]);

        assert_eq!(output.status.code(), Some(2));
    }

    // =========================================================================
    // page-size
    // =========================================================================

    #[test]
    fn test_page_size_is_power_of_two() {
        let output = vmregion(&["page-size"]);

        assert_eq!(output.status.code(), Some(0));

        let size: usize = stdout(&output)
            .trim()
            .parse()
            .expect("Failed to parse page size");

        assert!(size.is_power_of_two());
        assert!(size >= 4096);
    }
}
