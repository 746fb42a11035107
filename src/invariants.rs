//! # Invariant Log
//!
//! Runtime assertions for the properties the generated artifacts must satisfy
//! (value counts, balanced braces). Every assertion that holds is recorded, so
//! tests can later prove that a code path really enforced the rule.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use lazy_static::lazy_static;
use log::{error, trace};

lazy_static! {
    /// Descriptions of every invariant that has been asserted and held.
    static ref CHECKED_INVARIANTS: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

/// Asserts that an invariant of the generated output holds.
///
/// A violation panics in debug and test builds. Release builds log it as an
/// error and carry on, since the artifacts are checked again by the consuming
/// compiler.
///
/// # Arguments
/// * `condition` - Result of the check.
/// * `description` - Human-readable rule, e.g. "ICON_DATA holds width * height * 4 values".
/// * `component` - Optional tag of the module doing the check (e.g. "Emitter").
pub fn assert_invariant(condition: bool, description: &str, component: Option<&str>) {
    if !condition {
        let msg = format!(
            "INVARIANT VIOLATION [{}]: {}",
            component.unwrap_or("General"),
            description
        );
        error!("{}", msg);

        if cfg!(debug_assertions) || cfg!(test) {
            panic!("{}", msg);
        }
        return;
    }

    trace!("Invariant held: {}", description);
    checked_invariants().insert(description.to_string());
}

/// The log, recovered from poisoning if a holder panicked.
fn checked_invariants() -> MutexGuard<'static, HashSet<String>> {
    CHECKED_INVARIANTS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fails if any of `required_invariants` was never asserted.
///
/// # Arguments
/// * `context` - Name of the calling test, used in the failure message.
/// * `required_invariants` - Descriptions that MUST have been asserted.
#[cfg(test)]
pub fn contract_test(context: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = {
        let checked = checked_invariants();
        required_invariants
            .iter()
            .copied()
            .filter(|req| !checked.contains(*req))
            .collect()
    };

    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed. These invariants were never checked:\n{:#?}",
            context, missing
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_invariant_is_recorded() {
        assert_invariant(true, "invariants: recorded after holding", Some("Test"));
        contract_test("held_invariant_is_recorded", &["invariants: recorded after holding"]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [Test]")]
    fn violated_invariant_panics_in_tests() {
        assert_invariant(false, "invariants: always violated", Some("Test"));
    }

    #[test]
    #[should_panic(expected = "never checked")]
    fn contract_test_reports_unchecked_rules() {
        contract_test("unchecked", &["invariants: nobody asserts this one"]);
    }

    #[test]
    fn failed_contract_test_leaves_the_log_usable() {
        let failed = std::panic::catch_unwind(|| {
            contract_test("unchecked", &["invariants: still nobody asserts this one"]);
        });
        assert!(failed.is_err());

        assert_invariant(true, "invariants: recorded after a failed contract", Some("Test"));
        contract_test("after_failure", &["invariants: recorded after a failed contract"]);
    }

    #[test]
    fn poisoned_log_still_records_and_reports() {
        let _ = std::thread::spawn(|| {
            let _guard = CHECKED_INVARIANTS.lock();
            panic!("poison the invariant log");
        })
        .join();

        assert_invariant(true, "invariants: recorded despite poisoning", Some("Test"));
        contract_test("poisoned", &["invariants: recorded despite poisoning"]);
    }
}
