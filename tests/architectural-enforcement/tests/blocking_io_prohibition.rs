//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code in the chat crates MUST NOT use blocking I/O
//! inside async code. The session runs on the tokio runtime; a blocking call
//! in an exchange task or the input loop stalls every stream.
//!
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::io::stdin()/stdout()`,
//! async `reqwest`.

use architectural_enforcement::{
    code_part, enclosing_fn, is_in_test_code, production_sources, FnKind,
};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        eprintln!("  - std::fs::read_to_string(), std::fs::File");
        eprintln!("  - std::net::TcpStream");
        eprintln!("  - std::process::Command");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("  - std::io::stdin() / std::io::stdout() in async fns");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read_to_string().await");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt::lines()");
        eprintln!("  - tokio::io::stdout() with AsyncWriteExt");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in production code
fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.line_refs();

        for (idx, line) in lines.iter().enumerate() {
            let code = code_part(line);

            if is_in_test_code(&lines, idx) {
                continue;
            }

            if code.contains("std::fs::") || code.contains("use std::fs") {
                violations.push(file.violation(idx, "Blocking file I/O"));
            }

            if code.contains("std::net::") || code.contains("use std::net") {
                violations.push(file.violation(idx, "Blocking network I/O"));
            }

            if code.contains("std::process::Command") {
                violations.push(file.violation(idx, "Blocking process I/O"));
            }

            if code.contains("reqwest::blocking") {
                violations.push(file.violation(idx, "Blocking HTTP client"));
            }

            if (code.contains("std::io::stdin()") || code.contains("std::io::stdout()"))
                && enclosing_fn(&lines, idx) == Some(FnKind::Async)
            {
                violations.push(file.violation(idx, "Blocking stdin/stdout in async"));
            }
        }
    }

    violations
}

#[test]
fn test_detector_flags_stdout_in_async_fn() {
    let code = vec![
        "async fn run() {",
        "    let out = std::io::stdout();",
        "}",
    ];
    assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Async));
    assert!(!is_in_test_code(&code, 1));
}

#[test]
fn test_detector_allows_stderr_writer_in_sync_fn() {
    let code = vec![
        "fn init_logging(level: &str) {",
        "    tracing_subscriber::fmt().with_writer(std::io::stderr).init();",
        "}",
    ];
    assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Sync));
}
