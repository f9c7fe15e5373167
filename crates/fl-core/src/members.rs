//! Member directory rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaritalStatus {
    Single,
    Married,
}

impl MaritalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Married => "Married",
        }
    }
}

/// Personal details captured when registering or editing a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDetails {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub whatsapp_number: String,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub date_of_birth: NaiveDate,
    pub occupation: Option<String>,
    pub picture_url: String,
}

impl MemberDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// Validate and normalise the details in place.
    pub fn normalize(mut self, today: NaiveDate) -> Result<Self> {
        self.first_name = title_case(&self.first_name);
        self.last_name = title_case(&self.last_name);
        self.middle_name = self
            .middle_name
            .map(|m| title_case(&m))
            .filter(|m| !m.is_empty());
        if self.first_name.is_empty() || self.last_name.is_empty() {
            return Err(FlError::Validation(
                "First name and last name are required".into(),
            ));
        }

        self.email = normalize_email(&self.email)?;
        self.phone_number = normalize_phone(&self.phone_number)?;
        self.whatsapp_number = normalize_phone(&self.whatsapp_number)?;

        if self.date_of_birth >= today {
            return Err(FlError::Validation(
                "Date of birth must be in the past".into(),
            ));
        }
        Ok(self)
    }
}

pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        return Err(FlError::Validation(format!("Invalid email address: {email}")));
    }
    Ok(email)
}

/// Normalise a Ghanaian phone number to `+233XXXXXXXXX`.
pub fn normalize_phone(phone: &str) -> Result<String> {
    let digits: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let national = if let Some(rest) = digits.strip_prefix("+233") {
        rest.to_string()
    } else if let Some(rest) = digits.strip_prefix("233") {
        rest.to_string()
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest.to_string()
    } else {
        digits.clone()
    };

    if national.len() != 9 || !national.chars().all(|c| c.is_ascii_digit()) {
        return Err(FlError::Validation(format!("Invalid phone number: {phone}")));
    }
    Ok(format!("+233{national}"))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
