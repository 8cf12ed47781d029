use serde::{Deserialize, Serialize};

/// The finite set of wizard steps, in order. `Success` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    AccountType,
    PersonalInfo,
    FinancialInfo,
    RegulatoryInfo,
    Documents,
    Agreements,
    Success,
}

impl WizardStep {
    pub const ALL: [WizardStep; 7] = [
        WizardStep::AccountType,
        WizardStep::PersonalInfo,
        WizardStep::FinancialInfo,
        WizardStep::RegulatoryInfo,
        WizardStep::Documents,
        WizardStep::Agreements,
        WizardStep::Success,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// The step after this one; `None` past the end.
    pub fn next(self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The step before this one; `None` at the start.
    pub fn prev(self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn is_first(self) -> bool {
        self == WizardStep::AccountType
    }

    pub fn is_terminal(self) -> bool {
        self == WizardStep::Success
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for WizardStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown wizard step: {s}"))
    }
}
