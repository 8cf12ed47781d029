use serde::{Deserialize, Serialize};

use super::document::Document;
use super::holder::AccountHolderDetails;

/// The account category being opened. Drives holder/user cardinality,
/// step-validation field lists, and the financial-information block tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomerType {
    #[default]
    Individual,
    Joint,
    Org,
}

impl CustomerType {
    /// How many account holders (and user records) this type carries.
    pub fn holder_count(self) -> usize {
        match self {
            CustomerType::Individual => 1,
            CustomerType::Joint => 2,
            CustomerType::Org => 1,
        }
    }
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

/// Wizard lifecycle status. `Completed` is terminal — set on the final
/// Agreements → Success transition, never reverted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ApplicationStatus {
    #[default]
    Draft,
    Completed,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Draft => write!(f, "Draft"),
            ApplicationStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Master-account selector carried by apply links (`?ma=br` / `?ma=ad`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MasterAccount {
    Br,
    Ad,
}

impl std::str::FromStr for MasterAccount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "br" => Ok(MasterAccount::Br),
            "ad" => Ok(MasterAccount::Ad),
            other => Err(format!("unknown master account selector: {other}")),
        }
    }
}

impl std::fmt::Display for MasterAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterAccount::Br => write!(f, "br"),
            MasterAccount::Ad => write!(f, "ad"),
        }
    }
}

// ─── Customer ─────────────────────────────────────────────────────────────────

/// Organization details — only populated for [`CustomerType::Org`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    pub name: String,
    pub formation_country: Option<String>,
    pub email: Option<String>,
}

/// Top-level customer record. `external_id`, `prefix`, and `email` are
/// derived by the rules engine, never entered directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(rename = "type")]
    pub kind: CustomerType,
    pub external_id: Option<String>,
    pub prefix: Option<String>,
    pub email: Option<String>,
    pub organization: Option<Organization>,
}

// ─── Account ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum MarginType {
    #[default]
    Cash,
    Margin,
}

/// The brokerage account being opened (one per application).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    pub external_id: Option<String>,
    pub base_currency: String,
    pub margin: MarginType,
    pub trading_permissions: Vec<String>,
    pub investment_objectives: Vec<String>,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            external_id: None,
            base_currency: "USD".to_string(),
            margin: MarginType::Cash,
            trading_permissions: Vec::new(),
            investment_objectives: Vec::new(),
        }
    }
}

// ─── User ─────────────────────────────────────────────────────────────────────

/// Login credential record mirrored to the clearing broker. One per holder;
/// all fields are derived by the rules engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub external_user_id: Option<String>,
    pub external_individual_id: Option<String>,
    pub prefix: Option<String>,
}

// ─── Financial information ────────────────────────────────────────────────────

/// Financial-information block. `applies_to` tags which customer type the
/// block was filled in for; the rules engine keeps it in sync with the
/// current `customer.type` and mirrors the account-level objectives into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialInformation {
    pub applies_to: CustomerType,
    pub net_worth: Option<f64>,
    pub liquid_net_worth: Option<f64>,
    pub annual_net_income: Option<f64>,
    pub investment_objectives: Vec<String>,
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The nested account-opening form document built across the wizard steps.
///
/// Created empty at the first step, mutated field-by-field, persisted after
/// every step transition, finalized `Completed` at the last step. Never
/// deleted by the wizard itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Application {
    pub id: String,
    pub status: ApplicationStatus,
    pub customer: Customer,
    pub account: Account,
    pub holders: Vec<AccountHolderDetails>,
    pub users: Vec<User>,
    pub documents: Vec<Document>,
    pub financial_information: FinancialInformation,
}

impl Default for Application {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: ApplicationStatus::Draft,
            customer: Customer::default(),
            account: Account::default(),
            holders: vec![AccountHolderDetails::default()],
            users: vec![User::default()],
            documents: Vec::new(),
            financial_information: FinancialInformation::default(),
        }
    }
}

impl Application {
    /// Fresh draft of the given customer type, keeping an existing row id.
    pub fn fresh(id: impl Into<String>, kind: CustomerType) -> Self {
        let mut app = Self {
            id: id.into(),
            ..Self::default()
        };
        app.customer.kind = kind;
        if kind == CustomerType::Org {
            app.customer.organization = Some(Organization::default());
        }
        app
    }

    /// Full names of every holder that has both name parts filled in.
    pub fn holder_full_names(&self) -> Vec<String> {
        self.holders.iter().filter_map(|h| h.full_name()).collect()
    }
}
