use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Source-of-wealth code forced for employed holders.
pub const SOW_INCOME: &str = "SOW-IND-Income";

// ─── Address ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

// ─── Identification ───────────────────────────────────────────────────────────

/// Which identification document the holder presented.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum IdentificationType {
    #[default]
    Passport,
    DriversLicense,
    NationalCard,
}

/// Identification block. Invariant: at most one of the three value slots is
/// populated, and it is the slot named by `kind`. The rules engine migrates
/// the value when the discriminator changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Identification {
    #[serde(rename = "type")]
    pub kind: IdentificationType,
    pub passport: Option<String>,
    pub drivers_license: Option<String>,
    pub national_card: Option<String>,
    pub issuing_country: Option<String>,
}

impl Identification {
    /// The value in the slot named by the discriminator, if non-empty.
    pub fn current_value(&self) -> Option<&str> {
        self.slot(self.kind)
            .as_deref()
            .filter(|v| !v.is_empty())
    }

    /// Any non-empty value across the three slots, preferring the
    /// discriminator's slot.
    pub fn any_value(&self) -> Option<&str> {
        self.current_value().or_else(|| {
            [
                IdentificationType::Passport,
                IdentificationType::DriversLicense,
                IdentificationType::NationalCard,
            ]
            .iter()
            .find_map(|k| self.slot(*k).as_deref().filter(|v| !v.is_empty()))
        })
    }

    pub fn slot(&self, kind: IdentificationType) -> &Option<String> {
        match kind {
            IdentificationType::Passport => &self.passport,
            IdentificationType::DriversLicense => &self.drivers_license,
            IdentificationType::NationalCard => &self.national_card,
        }
    }

    pub fn slot_mut(&mut self, kind: IdentificationType) -> &mut Option<String> {
        match kind {
            IdentificationType::Passport => &mut self.passport,
            IdentificationType::DriversLicense => &mut self.drivers_license,
            IdentificationType::NationalCard => &mut self.national_card,
        }
    }
}

// ─── Tax residency ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TinType {
    #[serde(rename = "NonUS_NationalId")]
    #[default]
    NonUsNationalId,
    #[serde(rename = "SSN")]
    Ssn,
    #[serde(rename = "EIN")]
    Ein,
}

/// Derived tax-residency record. `country` mirrors the legal-residence
/// country and `tin` the identification number unless the holder's residency
/// was explicitly overridden by a later edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxResidency {
    pub country: String,
    pub tin: String,
    pub tin_type: TinType,
}

// ─── W8-BEN ───────────────────────────────────────────────────────────────────

/// Auto-populated W8-BEN block: `name` is "first last" of the holder,
/// `foreign_tax_id` the holder's TIN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct W8Ben {
    pub name: String,
    pub foreign_tax_id: String,
}

// ─── Employment ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmploymentType {
    Employed,
    SelfEmployed,
    Retired,
    Student,
    Homemaker,
    Unemployed,
}

impl EmploymentType {
    /// Whether this employment type carries employer details at all.
    pub fn has_employer(self) -> bool {
        matches!(self, EmploymentType::Employed | EmploymentType::SelfEmployed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EmploymentDetails {
    pub employer: Option<String>,
    pub occupation: Option<String>,
    pub employer_business: Option<String>,
    pub employer_address: Option<Address>,
}

// ─── Source of wealth ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceOfWealth {
    pub source_type: String,
    pub percentage: Option<u8>,
}

// ─── Account holder ───────────────────────────────────────────────────────────

/// A natural person on the account: the primary holder, the second joint
/// holder, or an organization's authorized individual.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountHolderDetails {
    pub external_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub residence_address: Address,
    pub legal_residence_country: Option<String>,
    pub identification: Identification,
    pub employment_type: Option<EmploymentType>,
    pub employment_details: Option<EmploymentDetails>,
    pub tax_residencies: Vec<TaxResidency>,
    /// Set when a direct edit changed `tax_residencies[0]` away from the
    /// mirrored value; stops the rules engine from re-deriving it.
    pub tax_residency_overridden: bool,
    pub w8ben: Option<W8Ben>,
    pub sources_of_wealth: Vec<SourceOfWealth>,
}

impl AccountHolderDetails {
    /// "first last", or `None` until both parts are present.
    pub fn full_name(&self) -> Option<String> {
        let first = self.first_name.trim();
        let last = self.last_name.trim();
        if first.is_empty() || last.is_empty() {
            return None;
        }
        Some(format!("{first} {last}"))
    }

    /// The country the holder legally resides in: the explicit field, or the
    /// residence-address country as a fallback.
    pub fn residence_country(&self) -> Option<&str> {
        self.legal_residence_country
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| {
                self.residence_address
                    .country
                    .as_deref()
                    .filter(|c| !c.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_requires_both_parts() {
        let mut h = AccountHolderDetails::default();
        assert_eq!(h.full_name(), None);
        h.first_name = "Jane".to_string();
        assert_eq!(h.full_name(), None);
        h.last_name = "Doe".to_string();
        assert_eq!(h.full_name(), Some("Jane Doe".to_string()));
    }

    #[test]
    fn test_identification_any_value_prefers_discriminator_slot() {
        let mut id = Identification {
            kind: IdentificationType::DriversLicense,
            ..Identification::default()
        };
        id.passport = Some("P123".to_string());
        id.drivers_license = Some("D456".to_string());
        assert_eq!(id.any_value(), Some("D456"));
        assert_eq!(id.current_value(), Some("D456"));
    }

    #[test]
    fn test_identification_any_value_falls_back_to_other_slot() {
        let mut id = Identification::default();
        id.kind = IdentificationType::NationalCard;
        id.passport = Some("P123".to_string());
        assert_eq!(id.current_value(), None);
        assert_eq!(id.any_value(), Some("P123"));
    }

    #[test]
    fn test_tin_type_wire_name() {
        assert_eq!(
            serde_json::to_string(&TinType::NonUsNationalId).unwrap(),
            "\"NonUS_NationalId\""
        );
    }

    #[test]
    fn test_employment_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&EmploymentType::SelfEmployed).unwrap(),
            "\"SELFEMPLOYED\""
        );
        assert_eq!(
            serde_json::to_string(&EmploymentType::Employed).unwrap(),
            "\"EMPLOYED\""
        );
    }

    #[test]
    fn test_residence_country_falls_back_to_address() {
        let mut h = AccountHolderDetails::default();
        assert_eq!(h.residence_country(), None);
        h.residence_address.country = Some("PT".to_string());
        assert_eq!(h.residence_country(), Some("PT"));
        h.legal_residence_country = Some("ES".to_string());
        assert_eq!(h.residence_country(), Some("ES"));
    }
}
