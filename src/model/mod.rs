//! The application form tree — pure value types, no DB dependency.
//!
//! Everything the account-opening wizard edits lives in one nested
//! [`Application`] document. External-facing field names are `camelCase` to
//! match the clearing-broker wire format.

pub mod application;
pub mod document;
pub mod holder;

pub use application::{
    Account, Application, ApplicationStatus, Customer, CustomerType, FinancialInformation,
    MarginType, MasterAccount, Organization, User,
};
pub use document::{AttachedFile, Document, DocumentPayload, FORM_W8BEN};
pub use holder::{
    AccountHolderDetails, Address, EmploymentDetails, EmploymentType, Identification,
    IdentificationType, SourceOfWealth, TaxResidency, TinType, W8Ben, SOW_INCOME,
};
