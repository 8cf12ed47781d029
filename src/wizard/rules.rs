//! Synchronization rules engine.
//!
//! On every edit of the application form tree, an ordered list of pure rules
//! derives dependent fields: external-ID fan-out, login prefixes, email
//! propagation, identification migration, tax residency, W8-BEN,
//! source-of-wealth defaults, investment-objective mirroring, and document
//! signer lists.
//!
//! Every rule carries a no-op guard — it writes only when the target value
//! actually differs — and skips silently when its inputs are missing. The
//! engine runs the list to fixpoint; steady state must be reached within two
//! passes, and a hard cap guarantees termination either way. No errors
//! propagate from here.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{
    AccountHolderDetails, Application, CustomerType, Document, EmploymentDetails, EmploymentType,
    IdentificationType, Organization, TaxResidency, TinType, User, W8Ben, FORM_W8BEN, SOW_INCOME,
};

/// One field write applied by a rule. Echoed to the API caller and logged at
/// debug level — useful when a form "changes by itself" in front of a user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RuleWrite {
    pub rule: &'static str,
    pub field: String,
}

/// Steady state must be reached in 2 passes; anything more is a rule bug.
const MAX_PASSES: usize = 4;

/// Apply the full rule list until no rule writes anything.
///
/// Returns every write applied, in order. Idempotent: calling `settle` again
/// on the returned state produces an empty write list.
pub fn settle(app: &mut Application) -> Vec<RuleWrite> {
    let mut all = Vec::new();
    for pass in 0..MAX_PASSES {
        let writes = apply_once(app);
        if writes.is_empty() {
            break;
        }
        for w in &writes {
            debug!(rule = w.rule, field = %w.field, pass, "rule write");
        }
        all.extend(writes);
        if pass == MAX_PASSES - 1 {
            // A rule pair is fighting over a field. Stop rather than loop.
            warn!(passes = MAX_PASSES, "rules engine did not converge");
        }
    }
    all
}

/// One pass over the ordered rule list.
fn apply_once(app: &mut Application) -> Vec<RuleWrite> {
    let mut writes = Vec::new();
    sync_holder_cardinality(app, &mut writes);
    fan_out_external_ids(app, &mut writes);
    derive_prefixes(app, &mut writes);
    propagate_primary_email(app, &mut writes);
    migrate_identification(app, &mut writes);
    sync_tax_residency(app, &mut writes);
    sync_w8ben(app, &mut writes);
    default_sources_of_wealth(app, &mut writes);
    mirror_investment_objectives(app, &mut writes);
    sync_document_signers(app, &mut writes);
    writes
}

fn push(writes: &mut Vec<RuleWrite>, rule: &'static str, field: impl Into<String>) {
    writes.push(RuleWrite {
        rule,
        field: field.into(),
    });
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, |s| s.is_empty())
}

// ─── Rule 1: holder/user cardinality ─────────────────────────────────────────

/// Joint carries exactly two holders and two users; Individual and Org carry
/// one of each. Switching Joint → Individual truncates the second entries —
/// their external IDs are discarded, never merged into the first.
fn sync_holder_cardinality(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "holder-cardinality";
    let target = app.customer.kind.holder_count();

    while app.holders.len() < target {
        app.holders.push(AccountHolderDetails::default());
        push(writes, RULE, format!("holders[{}]", app.holders.len() - 1));
    }
    if app.holders.len() > target {
        app.holders.truncate(target);
        push(writes, RULE, "holders");
    }
    while app.users.len() < target {
        app.users.push(User::default());
        push(writes, RULE, format!("users[{}]", app.users.len() - 1));
    }
    if app.users.len() > target {
        app.users.truncate(target);
        push(writes, RULE, "users");
    }

    match app.customer.kind {
        CustomerType::Org => {
            if app.customer.organization.is_none() {
                app.customer.organization = Some(Organization::default());
                push(writes, RULE, "customer.organization");
            }
        }
        CustomerType::Individual | CustomerType::Joint => {
            if app.customer.organization.is_some() {
                app.customer.organization = None;
                push(writes, RULE, "customer.organization");
            }
        }
    }
}

// ─── Rule 2: external-ID fan-out ─────────────────────────────────────────────

/// Records that must share identity in the clearing-broker system get the
/// same freshly minted identifier: customer, account, first user, first
/// holder. A Joint application mints a second identifier for the second
/// holder and mirrors it to the second user. IDs are write-once — a
/// populated field is never touched, so holder identities can never
/// collapse into one.
fn fan_out_external_ids(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    fn seed(slot: &mut Option<String>, field: &str, id: &str, writes: &mut Vec<RuleWrite>) {
        const RULE: &str = "external-id-fanout";
        if is_blank(slot) {
            *slot = Some(id.to_string());
            push(writes, RULE, field);
        }
    }

    let primary = app
        .customer
        .external_id
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(mint_external_id);

    seed(&mut app.customer.external_id, "customer.externalId", &primary, writes);
    seed(&mut app.account.external_id, "account.externalId", &primary, writes);
    if let Some(holder) = app.holders.first_mut() {
        seed(&mut holder.external_id, "holders[0].externalId", &primary, writes);
    }
    if let Some(user) = app.users.first_mut() {
        seed(&mut user.external_user_id, "users[0].externalUserId", &primary, writes);
        seed(
            &mut user.external_individual_id,
            "users[0].externalIndividualId",
            &primary,
            writes,
        );
    }

    if app.customer.kind == CustomerType::Joint && app.holders.len() > 1 {
        let second = app.holders[1]
            .external_id
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(mint_external_id);
        seed(
            &mut app.holders[1].external_id,
            "holders[1].externalId",
            &second,
            writes,
        );
        if let Some(user) = app.users.get_mut(1) {
            seed(&mut user.external_user_id, "users[1].externalUserId", &second, writes);
            seed(
                &mut user.external_individual_id,
                "users[1].externalIndividualId",
                &second,
                writes,
            );
        }
    }
}

fn mint_external_id() -> String {
    Uuid::new_v4().to_string()
}

// ─── Rule 3: prefix derivation ───────────────────────────────────────────────

/// `prefix = lowercase(first char of first name + first 5 chars of last)`.
/// Skipped while either name part is empty.
pub fn derive_prefix(first: &str, last: &str) -> Option<String> {
    let first = first.trim();
    let last = last.trim();
    if first.is_empty() || last.is_empty() {
        return None;
    }
    let mut prefix = String::new();
    prefix.extend(first.chars().take(1));
    prefix.extend(last.chars().take(5));
    Some(prefix.to_lowercase())
}

fn derive_prefixes(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "prefix-derivation";

    if let Some(prefix) = app
        .holders
        .first()
        .and_then(|h| derive_prefix(&h.first_name, &h.last_name))
    {
        if app.customer.prefix.as_deref() != Some(&prefix) {
            app.customer.prefix = Some(prefix.clone());
            push(writes, RULE, "customer.prefix");
        }
        if let Some(user) = app.users.first_mut() {
            if user.prefix.as_deref() != Some(&prefix) {
                user.prefix = Some(prefix.clone());
                push(writes, RULE, "users[0].prefix");
            }
        }
    }

    if let Some(prefix) = app
        .holders
        .get(1)
        .and_then(|h| derive_prefix(&h.first_name, &h.last_name))
    {
        if let Some(user) = app.users.get_mut(1) {
            if user.prefix.as_deref() != Some(&prefix) {
                user.prefix = Some(prefix);
                push(writes, RULE, "users[1].prefix");
            }
        }
    }
}

// ─── Rule 4: email propagation ───────────────────────────────────────────────

/// Primary holder's email mirrors up to the customer record. Only the first
/// holder propagates; a second joint holder's email stays on the holder.
fn propagate_primary_email(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "email-propagation";
    let Some(email) = app
        .holders
        .first()
        .and_then(|h| h.email.clone())
        .filter(|e| !e.is_empty())
    else {
        return;
    };
    if app.customer.email.as_deref() != Some(&email) {
        app.customer.email = Some(email);
        push(writes, RULE, "customer.email");
    }
}

// ─── Rule 5: identification-type migration ───────────────────────────────────

/// The entered ID number lives in exactly one of the passport / license /
/// national-card slots — the one named by the discriminator. When the
/// discriminator changes, the value moves with it, so a Passport → License →
/// Passport round trip loses nothing.
fn migrate_identification(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "identification-migration";
    const ALL: [IdentificationType; 3] = [
        IdentificationType::Passport,
        IdentificationType::DriversLicense,
        IdentificationType::NationalCard,
    ];

    for (i, holder) in app.holders.iter_mut().enumerate() {
        let kind = holder.identification.kind;
        let Some(value) = holder.identification.any_value().map(String::from) else {
            continue;
        };
        for slot_kind in ALL {
            let expected = (slot_kind == kind).then(|| value.clone());
            let slot = holder.identification.slot_mut(slot_kind);
            if *slot != expected && !(expected.is_none() && is_blank(slot)) {
                *slot = expected;
                push(
                    writes,
                    RULE,
                    format!("holders[{i}].identification.{slot_kind:?}"),
                );
            }
        }
    }
}

// ─── Rule 6: tax residency sync ──────────────────────────────────────────────

/// `taxResidencies[0]` mirrors the legal-residence country and the entered
/// identification number, with a fixed non-US TIN type. A holder whose
/// residency was explicitly overridden is left alone.
fn sync_tax_residency(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "tax-residency-sync";

    for (i, holder) in app.holders.iter_mut().enumerate() {
        if holder.tax_residency_overridden {
            continue;
        }
        let Some(country) = holder.residence_country().map(String::from) else {
            continue;
        };
        let tin = holder
            .identification
            .current_value()
            .map(String::from)
            .unwrap_or_default();

        if holder.tax_residencies.is_empty() {
            holder.tax_residencies.push(TaxResidency::default());
            push(writes, RULE, format!("holders[{i}].taxResidencies[0]"));
        }
        let residency = &mut holder.tax_residencies[0];
        if residency.country != country {
            residency.country = country;
            push(writes, RULE, format!("holders[{i}].taxResidencies[0].country"));
        }
        if !tin.is_empty() && residency.tin != tin {
            residency.tin = tin;
            push(writes, RULE, format!("holders[{i}].taxResidencies[0].tin"));
        }
        if residency.tin_type != TinType::NonUsNationalId {
            residency.tin_type = TinType::NonUsNationalId;
            push(writes, RULE, format!("holders[{i}].taxResidencies[0].tinType"));
        }
    }
}

// ─── Rule 7: W8-BEN sync ─────────────────────────────────────────────────────

/// W8-BEN mirrors holder identity: `name` is "first last", `foreignTaxId`
/// the holder's TIN (falling back to the identification number).
fn sync_w8ben(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "w8ben-sync";

    for (i, holder) in app.holders.iter_mut().enumerate() {
        let Some(name) = holder.full_name() else {
            continue;
        };
        let tax_id = holder
            .tax_residencies
            .first()
            .map(|r| r.tin.clone())
            .filter(|t| !t.is_empty())
            .or_else(|| holder.identification.current_value().map(String::from))
            .unwrap_or_default();

        let w8 = holder.w8ben.get_or_insert_with(W8Ben::default);
        if w8.name != name {
            w8.name = name;
            push(writes, RULE, format!("holders[{i}].w8ben.name"));
        }
        if !tax_id.is_empty() && w8.foreign_tax_id != tax_id {
            w8.foreign_tax_id = tax_id;
            push(writes, RULE, format!("holders[{i}].w8ben.foreignTaxId"));
        }
    }
}

// ─── Rule 8: source-of-wealth default ────────────────────────────────────────

/// Employed holders always report income as their first source of wealth.
/// Employed and self-employed holders carry an employer-address block;
/// everyone else carries no employment details at all.
fn default_sources_of_wealth(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "source-of-wealth";

    for (i, holder) in app.holders.iter_mut().enumerate() {
        let Some(employment) = holder.employment_type else {
            continue;
        };

        if employment == EmploymentType::Employed {
            if holder.sources_of_wealth.is_empty() {
                holder.sources_of_wealth.push(Default::default());
                push(writes, RULE, format!("holders[{i}].sourcesOfWealth[0]"));
            }
            let first = &mut holder.sources_of_wealth[0];
            if first.source_type != SOW_INCOME {
                first.source_type = SOW_INCOME.to_string();
                push(
                    writes,
                    RULE,
                    format!("holders[{i}].sourcesOfWealth[0].sourceType"),
                );
            }
        }

        if employment.has_employer() {
            let details = holder
                .employment_details
                .get_or_insert_with(EmploymentDetails::default);
            if details.employer_address.is_none() {
                details.employer_address = Some(Default::default());
                push(
                    writes,
                    RULE,
                    format!("holders[{i}].employmentDetails.employerAddress"),
                );
            }
        } else if holder.employment_details.is_some() {
            holder.employment_details = None;
            push(writes, RULE, format!("holders[{i}].employmentDetails"));
        }
    }
}

// ─── Rule 9: investment-objectives mirror ────────────────────────────────────

/// Account-level investment objectives are copied into the
/// financial-information block, which is tagged with the customer type it
/// currently applies to.
fn mirror_investment_objectives(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "objectives-mirror";

    if app.financial_information.applies_to != app.customer.kind {
        app.financial_information.applies_to = app.customer.kind;
        push(writes, RULE, "financialInformation.appliesTo");
    }
    if app.financial_information.investment_objectives != app.account.investment_objectives {
        app.financial_information.investment_objectives = app.account.investment_objectives.clone();
        push(writes, RULE, "financialInformation.investmentObjectives");
    }
}

// ─── Rule 10: document signer sync ───────────────────────────────────────────

/// The W-8 form's signer list equals the current set of holder full names.
/// The entry is created once a name exists and rewritten only when the
/// computed list actually differs.
fn sync_document_signers(app: &mut Application, writes: &mut Vec<RuleWrite>) {
    const RULE: &str = "document-signer-sync";

    let names = app.holder_full_names();
    if names.is_empty() {
        return;
    }

    match app.documents.iter_mut().find(|d| d.form_number == FORM_W8BEN) {
        Some(doc) => {
            if doc.signed_by != names {
                doc.signed_by = names;
                push(writes, RULE, "documents[w8ben].signedBy");
            }
        }
        None => {
            let mut doc = Document::form(FORM_W8BEN);
            doc.signed_by = names;
            app.documents.push(doc);
            push(writes, RULE, "documents[w8ben]");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identification, SourceOfWealth};

    fn individual() -> Application {
        let mut app = Application::fresh("app-1", CustomerType::Individual);
        app.holders[0].first_name = "Jane".to_string();
        app.holders[0].last_name = "Doe".to_string();
        app
    }

    #[test]
    fn test_settle_is_idempotent() {
        let mut app = individual();
        app.holders[0].email = Some("jane@example.com".to_string());
        app.holders[0].legal_residence_country = Some("PT".to_string());
        app.holders[0].identification.passport = Some("P-1".to_string());
        app.holders[0].employment_type = Some(EmploymentType::Employed);

        let first = settle(&mut app);
        assert!(!first.is_empty());

        let second = settle(&mut app);
        assert_eq!(second, Vec::new(), "second settle must write nothing");
    }

    #[test]
    fn test_converges_within_two_passes() {
        let mut app = individual();
        app.holders[0].identification.passport = Some("P-1".to_string());
        app.holders[0].legal_residence_country = Some("PT".to_string());

        settle(&mut app);
        // One more pass by hand: must be a no-op.
        assert!(apply_once(&mut app).is_empty());
    }

    #[test]
    fn test_external_id_fanout_individual() {
        let mut app = individual();
        settle(&mut app);

        let id = app.customer.external_id.clone().unwrap();
        assert!(!id.is_empty());
        assert_eq!(app.account.external_id.as_ref(), Some(&id));
        assert_eq!(app.holders[0].external_id.as_ref(), Some(&id));
        assert_eq!(app.users[0].external_user_id.as_ref(), Some(&id));
        assert_eq!(app.users[0].external_individual_id.as_ref(), Some(&id));
    }

    #[test]
    fn test_external_ids_are_stable_across_settles() {
        let mut app = individual();
        settle(&mut app);
        let before = app.customer.external_id.clone();
        app.holders[0].first_name = "Janet".to_string();
        settle(&mut app);
        assert_eq!(app.customer.external_id, before);
    }

    #[test]
    fn test_joint_mints_distinct_second_id() {
        let mut app = Application::fresh("app-1", CustomerType::Joint);
        settle(&mut app);

        assert_eq!(app.holders.len(), 2);
        assert_eq!(app.users.len(), 2);
        let first = app.holders[0].external_id.clone().unwrap();
        let second = app.holders[1].external_id.clone().unwrap();
        assert_ne!(first, second, "holder identities must never collapse");
        assert_eq!(app.users[1].external_user_id.as_ref(), Some(&second));
        assert_eq!(app.users[1].external_individual_id.as_ref(), Some(&second));
    }

    #[test]
    fn test_revert_to_individual_truncates_users() {
        let mut app = Application::fresh("app-1", CustomerType::Joint);
        settle(&mut app);
        assert_eq!(app.users.len(), 2);

        app.customer.kind = CustomerType::Individual;
        settle(&mut app);
        assert_eq!(app.holders.len(), 1);
        assert_eq!(app.users.len(), 1);
    }

    #[test]
    fn test_prefix_derivation() {
        let mut app = individual();
        settle(&mut app);
        assert_eq!(app.customer.prefix.as_deref(), Some("jdoe"));
        assert_eq!(app.users[0].prefix.as_deref(), Some("jdoe"));
    }

    #[test]
    fn test_prefix_truncates_long_last_name() {
        assert_eq!(
            derive_prefix("Maximilian", "Featherstonehaugh"),
            Some("mfeath".to_string())
        );
        assert_eq!(derive_prefix("Jane", ""), None);
        assert_eq!(derive_prefix("", "Doe"), None);
    }

    #[test]
    fn test_second_joint_holder_prefix() {
        let mut app = Application::fresh("app-1", CustomerType::Joint);
        app.holders[0].first_name = "Jane".to_string();
        app.holders[0].last_name = "Doe".to_string();
        settle(&mut app);
        app.holders[1].first_name = "John".to_string();
        app.holders[1].last_name = "Smith".to_string();
        settle(&mut app);
        assert_eq!(app.users[1].prefix.as_deref(), Some("jsmith"));
        // Primary prefix untouched by the second holder's name.
        assert_eq!(app.customer.prefix.as_deref(), Some("jdoe"));
    }

    #[test]
    fn test_email_propagates_from_first_holder_only() {
        let mut app = Application::fresh("app-1", CustomerType::Joint);
        settle(&mut app);
        app.holders[0].email = Some("jane@example.com".to_string());
        app.holders[1].email = Some("john@example.com".to_string());
        settle(&mut app);
        assert_eq!(app.customer.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_identification_round_trip_preserves_value() {
        let mut app = individual();
        app.holders[0].identification.passport = Some("AB1234".to_string());
        settle(&mut app);

        // Passport → DriversLicense
        app.holders[0].identification.kind = IdentificationType::DriversLicense;
        settle(&mut app);
        let id = &app.holders[0].identification;
        assert_eq!(id.drivers_license.as_deref(), Some("AB1234"));
        assert_eq!(id.passport, None);

        // DriversLicense → Passport
        app.holders[0].identification.kind = IdentificationType::Passport;
        settle(&mut app);
        let id = &app.holders[0].identification;
        assert_eq!(id.passport.as_deref(), Some("AB1234"));
        assert_eq!(id.drivers_license, None);
        assert_eq!(id.national_card, None);
    }

    #[test]
    fn test_tax_residency_mirrors_country_and_tin() {
        let mut app = individual();
        app.holders[0].legal_residence_country = Some("PT".to_string());
        app.holders[0].identification.passport = Some("AB1234".to_string());
        settle(&mut app);

        let residency = &app.holders[0].tax_residencies[0];
        assert_eq!(residency.country, "PT");
        assert_eq!(residency.tin, "AB1234");
        assert_eq!(residency.tin_type, TinType::NonUsNationalId);
    }

    #[test]
    fn test_tax_residency_override_stops_mirroring() {
        let mut app = individual();
        app.holders[0].legal_residence_country = Some("PT".to_string());
        settle(&mut app);

        app.holders[0].tax_residency_overridden = true;
        app.holders[0].tax_residencies[0].country = "ES".to_string();
        app.holders[0].legal_residence_country = Some("FR".to_string());
        settle(&mut app);
        assert_eq!(app.holders[0].tax_residencies[0].country, "ES");
    }

    #[test]
    fn test_w8ben_recomputed_on_name_change() {
        let mut app = individual();
        app.holders[0].identification.passport = Some("AB1234".to_string());
        app.holders[0].legal_residence_country = Some("PT".to_string());
        settle(&mut app);
        assert_eq!(app.holders[0].w8ben.as_ref().unwrap().name, "Jane Doe");
        assert_eq!(
            app.holders[0].w8ben.as_ref().unwrap().foreign_tax_id,
            "AB1234"
        );

        app.holders[0].last_name = "Doe-Smith".to_string();
        settle(&mut app);
        assert_eq!(app.holders[0].w8ben.as_ref().unwrap().name, "Jane Doe-Smith");
    }

    #[test]
    fn test_employed_forces_income_source() {
        let mut app = individual();
        app.holders[0].employment_type = Some(EmploymentType::Employed);
        app.holders[0].sources_of_wealth = vec![SourceOfWealth {
            source_type: "SOW-IND-Inheritance".to_string(),
            percentage: Some(100),
        }];
        settle(&mut app);
        assert_eq!(app.holders[0].sources_of_wealth[0].source_type, SOW_INCOME);
        // Employer address block exists for employed holders.
        assert!(app.holders[0]
            .employment_details
            .as_ref()
            .unwrap()
            .employer_address
            .is_some());
    }

    #[test]
    fn test_retired_clears_employment_details() {
        let mut app = individual();
        app.holders[0].employment_type = Some(EmploymentType::Employed);
        settle(&mut app);
        assert!(app.holders[0].employment_details.is_some());

        app.holders[0].employment_type = Some(EmploymentType::Retired);
        settle(&mut app);
        assert!(app.holders[0].employment_details.is_none());
    }

    #[test]
    fn test_objectives_mirror_follows_account_type() {
        let mut app = individual();
        app.account.investment_objectives =
            vec!["Growth".to_string(), "Speculation".to_string()];
        settle(&mut app);
        assert_eq!(
            app.financial_information.investment_objectives,
            app.account.investment_objectives
        );
        assert_eq!(app.financial_information.applies_to, CustomerType::Individual);

        app.customer.kind = CustomerType::Joint;
        settle(&mut app);
        assert_eq!(app.financial_information.applies_to, CustomerType::Joint);
    }

    #[test]
    fn test_signer_list_tracks_holder_names() {
        let mut app = Application::fresh("app-1", CustomerType::Joint);
        app.holders[0].first_name = "Jane".to_string();
        app.holders[0].last_name = "Doe".to_string();
        settle(&mut app);

        let doc = app
            .documents
            .iter()
            .find(|d| d.form_number == FORM_W8BEN)
            .unwrap();
        assert_eq!(doc.signed_by, vec!["Jane Doe".to_string()]);

        app.holders[1].first_name = "John".to_string();
        app.holders[1].last_name = "Smith".to_string();
        settle(&mut app);
        let doc = app
            .documents
            .iter()
            .find(|d| d.form_number == FORM_W8BEN)
            .unwrap();
        assert_eq!(
            doc.signed_by,
            vec!["Jane Doe".to_string(), "John Smith".to_string()]
        );
    }

    #[test]
    fn test_rules_skip_on_missing_inputs() {
        // A blank application settles without errors and without inventing
        // prefixes, emails, or W8 blocks.
        let mut app = Application::fresh("app-1", CustomerType::Individual);
        settle(&mut app);
        assert_eq!(app.customer.prefix, None);
        assert_eq!(app.customer.email, None);
        assert!(app.holders[0].w8ben.is_none());
        assert!(app.documents.is_empty());
    }

    #[test]
    fn test_identification_only_holder_still_gets_ids() {
        // Identification entered before any name: fan-out still seeds IDs.
        let mut app = Application::fresh("app-1", CustomerType::Individual);
        app.holders[0].identification = Identification {
            kind: IdentificationType::NationalCard,
            national_card: Some("N-77".to_string()),
            ..Identification::default()
        };
        settle(&mut app);
        assert!(app.customer.external_id.is_some());
        assert_eq!(
            app.holders[0].identification.national_card.as_deref(),
            Some("N-77")
        );
    }
}
