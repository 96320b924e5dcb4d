//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the chat crates MUST NOT call sleep
//! methods. Waiting is done on I/O, channels, and `watch` state: the
//! exchange task waits on the body and the cancellation handle, and callers
//! wait on `wait_idle()`.
//!
//! **Exceptions**: none in production code. Unit tests inside `src/` are held
//! to the same rule; use `tokio::time::timeout` around a real wait instead.

use architectural_enforcement::{code_part, is_in_test_code, production_sources};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations(&SleepPolicy { allow_tests: false });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ACCEPTABLE waiting:");
        eprintln!("  - ChatSession::wait_idle() / watch_state()");
        eprintln!("  - Awaiting session events from subscribe()");
        eprintln!("  - tokio::time::timeout() around a real wait");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("  - Sleep to 'wait' for a stream to finish");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

struct SleepPolicy {
    allow_tests: bool,
}

/// Find all sleep() calls in production code
fn find_sleep_violations(policy: &SleepPolicy) -> Vec<String> {
    let mut violations = Vec::new();

    for file in production_sources() {
        let lines = file.line_refs();

        for (idx, line) in lines.iter().enumerate() {
            if !is_sleep_call(code_part(line)) {
                continue;
            }
            if policy.allow_tests && is_in_test_code(&lines, idx) {
                continue;
            }
            violations.push(file.violation(idx, "sleep"));
        }
    }

    violations
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
}

#[test]
fn test_sleep_call_detection() {
    assert!(is_sleep_call(
        "    tokio::time::sleep(Duration::from_millis(10)).await;"
    ));
    assert!(is_sleep_call("    std::thread::sleep(d);"));
    assert!(!is_sleep_call(
        "    tokio::time::timeout(TEST_TIMEOUT, session.wait_idle()).await"
    ));
    assert!(!is_sleep_call(code_part("    // never sleep(here)")));
}

#[test]
fn test_policy_allowing_tests_still_scans() {
    // Production sources are clean under either policy
    assert!(find_sleep_violations(&SleepPolicy { allow_tests: true }).is_empty());
}
