//! Integration tests for the synchronization rules engine.
//!
//! Tests cover:
//! 1. Prefix invariant under arbitrary name-edit sequences (property-based)
//! 2. Identification round trips preserve the entered number
//! 3. Employed holders always report income as their first source of wealth
//! 4. Idempotence — a second settle with no new input writes nothing

use proptest::prelude::*;

use onboardd::model::{Application, CustomerType, EmploymentType, IdentificationType, SOW_INCOME};
use onboardd::wizard::rules::{derive_prefix, settle};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn app_with_name(first: &str, last: &str) -> Application {
    let mut app = Application::fresh("app-t", CustomerType::Individual);
    app.holders[0].first_name = first.to_string();
    app.holders[0].last_name = last.to_string();
    app
}

fn expected_prefix(first: &str, last: &str) -> String {
    let mut p = String::new();
    p.extend(first.chars().take(1));
    p.extend(last.chars().take(5));
    p.to_lowercase()
}

// ─── Test 1: prefix invariant (property-based) ───────────────────────────────

proptest! {
    #[test]
    fn prefix_invariant_holds_after_any_edit_sequence(
        names in proptest::collection::vec(("[A-Za-z]{1,12}", "[A-Za-z]{1,12}"), 1..6)
    ) {
        let mut app = Application::fresh("app-t", CustomerType::Individual);
        for (first, last) in &names {
            app.holders[0].first_name = first.clone();
            app.holders[0].last_name = last.clone();
            settle(&mut app);
        }
        let (first, last) = names.last().expect("at least one edit");
        let expected = expected_prefix(first, last);
        prop_assert_eq!(
            app.customer.prefix.as_deref(),
            Some(expected.as_str())
        );
        prop_assert_eq!(app.customer.prefix.as_deref(), app.users[0].prefix.as_deref());
    }

    #[test]
    fn prefix_invariant_holds_for_joint_first_holder(
        first in "[A-Za-z]{1,12}",
        last in "[A-Za-z]{1,12}",
    ) {
        let mut app = Application::fresh("app-t", CustomerType::Joint);
        settle(&mut app);
        app.holders[0].first_name = first.clone();
        app.holders[0].last_name = last.clone();
        settle(&mut app);
        let expected = expected_prefix(&first, &last);
        prop_assert_eq!(
            app.customer.prefix.as_deref(),
            Some(expected.as_str())
        );
    }
}

#[test]
fn derive_prefix_matches_spec_shape() {
    assert_eq!(derive_prefix("Jane", "Doe"), Some("jdoe".to_string()));
    assert_eq!(derive_prefix("Ada", "Lovelace"), Some("alovel".to_string()));
}

// ─── Test 2: identification round trip ───────────────────────────────────────

#[test]
fn identification_switch_and_back_preserves_number() {
    let mut app = app_with_name("Jane", "Doe");
    app.holders[0].identification.passport = Some("X99-1234".to_string());
    settle(&mut app);

    for kind in [
        IdentificationType::DriversLicense,
        IdentificationType::NationalCard,
        IdentificationType::Passport,
    ] {
        app.holders[0].identification.kind = kind;
        settle(&mut app);
        assert_eq!(
            app.holders[0].identification.current_value(),
            Some("X99-1234"),
            "value lost after switching to {kind:?}"
        );
    }
    // Back on Passport: the other slots are clear.
    assert_eq!(app.holders[0].identification.drivers_license, None);
    assert_eq!(app.holders[0].identification.national_card, None);
}

// ─── Test 3: employed source of wealth ───────────────────────────────────────

#[test]
fn employed_always_reports_income_first() {
    let mut app = app_with_name("Jane", "Doe");
    app.holders[0].employment_type = Some(EmploymentType::Retired);
    settle(&mut app);

    // Prior state deliberately inconsistent.
    app.holders[0].sources_of_wealth.clear();
    app.holders[0].employment_type = Some(EmploymentType::Employed);
    settle(&mut app);

    assert_eq!(app.holders[0].sources_of_wealth[0].source_type, SOW_INCOME);
}

// ─── Test 4: idempotence ─────────────────────────────────────────────────────

#[test]
fn second_settle_produces_zero_writes() {
    let mut app = Application::fresh("app-t", CustomerType::Joint);
    app.holders[0].first_name = "Jane".to_string();
    app.holders[0].last_name = "Doe".to_string();
    app.holders[0].email = Some("jane@example.com".to_string());
    app.holders[0].legal_residence_country = Some("PT".to_string());
    app.holders[0].identification.passport = Some("X99".to_string());
    app.holders[0].employment_type = Some(EmploymentType::Employed);
    app.account.investment_objectives = vec!["Growth".to_string()];

    let first = settle(&mut app);
    assert!(!first.is_empty());
    let second = settle(&mut app);
    assert!(
        second.is_empty(),
        "expected a settled tree, got writes: {second:?}"
    );
}
