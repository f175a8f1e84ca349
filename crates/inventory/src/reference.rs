//! Count period labels (`MM/YYYY`).

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockaudit_core::DomainError;

/// Validated period label of a count snapshot, e.g. `"04/2025"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceLabel(String);

impl ReferenceLabel {
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[2] != b'/' || s.matches('/').count() != 1 {
            return Err(DomainError::validation(format!(
                "invalid reference '{s}': expected MM/YYYY"
            )));
        }

        let (month, year) = (&s[..2], &s[3..]);
        if !month.bytes().all(|b| b.is_ascii_digit()) || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!(
                "invalid reference '{s}': month and year must be numeric"
            )));
        }

        let month_num: u32 = month
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid reference month in '{s}'")))?;
        if !(1..=12).contains(&month_num) {
            return Err(DomainError::validation(format!(
                "invalid reference '{s}': month must be between 01 and 12"
            )));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(year, month)` of the period.
    pub fn period(&self) -> (u32, u32) {
        // Both halves were checked to be ASCII digits in `parse`.
        let month = self.0[..2].parse().unwrap_or(0);
        let year = self.0[3..].parse().unwrap_or(0);
        (year, month)
    }
}

impl FromStr for ReferenceLabel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReferenceLabel {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferenceLabel> for String {
    fn from(value: ReferenceLabel) -> Self {
        value.0
    }
}

impl core::fmt::Display for ReferenceLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ReferenceLabel {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
