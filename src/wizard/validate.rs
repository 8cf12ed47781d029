//! Step-scoped validation: a fixed list of required fields per step,
//! extended by the customer type, plus the Agreements signature check.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FieldError;
use crate::model::{Application, CustomerType, FORM_W8BEN};

use super::steps::WizardStep;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

static TIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9.\-]{4,20}$").expect("tin regex"));

/// Validate the fields the given step requires. Empty result = the step is
/// complete and the wizard may advance.
pub fn validate_step(app: &Application, step: WizardStep) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match step {
        WizardStep::AccountType => validate_account_type(app, &mut errors),
        WizardStep::PersonalInfo => validate_personal_info(app, &mut errors),
        WizardStep::FinancialInfo => validate_financial_info(app, &mut errors),
        WizardStep::RegulatoryInfo => validate_regulatory_info(app, &mut errors),
        WizardStep::Documents => validate_documents(app, &mut errors),
        // The signature gate is checked by the controller, which holds the
        // typed signature; there are no form fields on these steps.
        WizardStep::Agreements | WizardStep::Success => {}
    }
    errors
}

fn require(errors: &mut Vec<FieldError>, ok: bool, field: &str, message: &str) {
    if !ok {
        errors.push(FieldError::new(field, message));
    }
}

fn validate_account_type(app: &Application, errors: &mut Vec<FieldError>) {
    require(
        errors,
        !app.account.base_currency.is_empty(),
        "account.baseCurrency",
        "base currency is required",
    );
}

fn validate_personal_info(app: &Application, errors: &mut Vec<FieldError>) {
    if app.customer.kind == CustomerType::Org {
        let name_ok = app
            .customer
            .organization
            .as_ref()
            .map(|o| !o.name.trim().is_empty())
            .unwrap_or(false);
        require(
            errors,
            name_ok,
            "customer.organization.name",
            "organization name is required",
        );
    }

    for (i, holder) in app.holders.iter().enumerate() {
        let path = |f: &str| format!("holders[{i}].{f}");

        require(
            errors,
            !holder.first_name.trim().is_empty(),
            &path("firstName"),
            "first name is required",
        );
        require(
            errors,
            !holder.last_name.trim().is_empty(),
            &path("lastName"),
            "last name is required",
        );
        require(
            errors,
            holder.date_of_birth.is_some(),
            &path("dateOfBirth"),
            "date of birth is required",
        );
        match holder.email.as_deref() {
            None | Some("") => errors.push(FieldError::new(path("email"), "email is required")),
            Some(email) if !EMAIL_RE.is_match(email) => {
                errors.push(FieldError::new(path("email"), "email is not valid"))
            }
            _ => {}
        }
        require(
            errors,
            holder.residence_country().is_some(),
            &path("legalResidenceCountry"),
            "country of legal residence is required",
        );
        require(
            errors,
            holder.identification.current_value().is_some(),
            &path("identification"),
            "identification number is required",
        );
        require(
            errors,
            holder
                .identification
                .issuing_country
                .as_deref()
                .map(|c| !c.is_empty())
                .unwrap_or(false),
            &path("identification.issuingCountry"),
            "issuing country is required",
        );
    }
}

fn validate_financial_info(app: &Application, errors: &mut Vec<FieldError>) {
    let fin = &app.financial_information;
    require(
        errors,
        fin.net_worth.is_some(),
        "financialInformation.netWorth",
        "net worth is required",
    );
    require(
        errors,
        fin.annual_net_income.is_some(),
        "financialInformation.annualNetIncome",
        "annual net income is required",
    );
    require(
        errors,
        !app.account.investment_objectives.is_empty(),
        "account.investmentObjectives",
        "at least one investment objective is required",
    );
    for (i, holder) in app.holders.iter().enumerate() {
        require(
            errors,
            holder.employment_type.is_some(),
            &format!("holders[{i}].employmentType"),
            "employment type is required",
        );
    }
}

fn validate_regulatory_info(app: &Application, errors: &mut Vec<FieldError>) {
    for (i, holder) in app.holders.iter().enumerate() {
        let path = |f: &str| format!("holders[{i}].{f}");
        match holder.tax_residencies.first() {
            None => errors.push(FieldError::new(
                path("taxResidencies"),
                "a tax residency is required",
            )),
            Some(residency) => {
                require(
                    errors,
                    !residency.country.is_empty(),
                    &path("taxResidencies[0].country"),
                    "tax residency country is required",
                );
                if residency.tin.is_empty() {
                    errors.push(FieldError::new(
                        path("taxResidencies[0].tin"),
                        "tax identification number is required",
                    ));
                } else if !TIN_RE.is_match(&residency.tin) {
                    errors.push(FieldError::new(
                        path("taxResidencies[0].tin"),
                        "tax identification number is not valid",
                    ));
                }
            }
        }
        require(
            errors,
            holder.w8ben.is_some(),
            &path("w8ben"),
            "W8-BEN certification is required",
        );
    }
}

fn validate_documents(app: &Application, errors: &mut Vec<FieldError>) {
    let w8 = app.documents.iter().find(|d| d.form_number == FORM_W8BEN);
    match w8 {
        None => errors.push(FieldError::new("documents", "the W8 form entry is missing")),
        Some(doc) => require(
            errors,
            doc.attached_file.is_some(),
            "documents[w8ben].attachedFile",
            "a signed W8 form must be attached",
        ),
    }
}

// ─── Signature check ──────────────────────────────────────────────────────────

/// Case- and whitespace-insensitive name normalisation: trim, collapse inner
/// runs of whitespace to one space, lowercase.
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether the typed free-text signature matches one of the holders' full
/// names. Gates the final Agreements submission.
pub fn signature_matches(signature: &str, app: &Application) -> bool {
    let entered = normalize_name(signature);
    if entered.is_empty() {
        return false;
    }
    app.holder_full_names()
        .iter()
        .any(|name| normalize_name(name) == entered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomerType;

    fn named_app() -> Application {
        let mut app = Application::fresh("app-1", CustomerType::Individual);
        app.holders[0].first_name = "Jane".to_string();
        app.holders[0].last_name = "Doe".to_string();
        app
    }

    #[test]
    fn test_signature_matches_with_case_and_whitespace_noise() {
        let app = named_app();
        assert!(signature_matches("Jane Doe", &app));
        assert!(signature_matches(" jane DOE ", &app));
        assert!(signature_matches("jane\t doe", &app));
    }

    #[test]
    fn test_signature_rejects_other_names() {
        let app = named_app();
        assert!(!signature_matches("John Doe", &app));
        assert!(!signature_matches("Jane", &app));
        assert!(!signature_matches("", &app));
        assert!(!signature_matches("   ", &app));
    }

    #[test]
    fn test_personal_info_reports_missing_fields() {
        let app = Application::fresh("app-1", CustomerType::Individual);
        let errors = validate_step(&app, WizardStep::PersonalInfo);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"holders[0].firstName"));
        assert!(fields.contains(&"holders[0].email"));
        assert!(fields.contains(&"holders[0].identification"));
    }

    #[test]
    fn test_personal_info_rejects_malformed_email() {
        let mut app = named_app();
        app.holders[0].email = Some("not-an-email".to_string());
        let errors = validate_step(&app, WizardStep::PersonalInfo);
        assert!(errors
            .iter()
            .any(|e| e.field == "holders[0].email" && e.message.contains("not valid")));
    }

    #[test]
    fn test_org_requires_organization_name() {
        let app = Application::fresh("app-1", CustomerType::Org);
        let errors = validate_step(&app, WizardStep::PersonalInfo);
        assert!(errors
            .iter()
            .any(|e| e.field == "customer.organization.name"));
    }

    #[test]
    fn test_joint_validates_both_holders() {
        let mut app = Application::fresh("app-1", CustomerType::Joint);
        crate::wizard::rules::settle(&mut app);
        app.holders[0].first_name = "Jane".to_string();
        let errors = validate_step(&app, WizardStep::PersonalInfo);
        assert!(errors.iter().any(|e| e.field == "holders[1].firstName"));
    }

    #[test]
    fn test_regulatory_info_checks_tin_format() {
        let mut app = named_app();
        app.holders[0].tax_residencies = vec![crate::model::TaxResidency {
            country: "PT".to_string(),
            tin: "!!".to_string(),
            tin_type: Default::default(),
        }];
        app.holders[0].w8ben = Some(Default::default());
        let errors = validate_step(&app, WizardStep::RegulatoryInfo);
        assert!(errors
            .iter()
            .any(|e| e.field == "holders[0].taxResidencies[0].tin"));
    }

    #[test]
    fn test_agreements_step_has_no_field_checks() {
        let app = Application::fresh("app-1", CustomerType::Individual);
        assert!(validate_step(&app, WizardStep::Agreements).is_empty());
    }
}
