//! Council account rules.
//!
//! Campus admins deposit money into a council's weekday account; council
//! leaders request expenses against it, which campus admins approve or decline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FlError, Result};
use crate::types::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionCategory {
    Deposit,
    Expense,
}

impl TransactionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Expense => "Expense",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    PendingApproval,
    Success,
    Declined,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending approval",
            Self::Success => "success",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = FlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending approval" => Ok(Self::PendingApproval),
            "success" => Ok(Self::Success),
            "declined" => Ok(Self::Declined),
            other => Err(FlError::Validation(format!("Unknown account status: {other}"))),
        }
    }
}

pub fn validate_amount(amount: Amount) -> Result<()> {
    if amount.pesewas() <= 0 {
        return Err(FlError::Validation("Amount must be greater than zero".into()));
    }
    Ok(())
}

pub fn validate_expense(amount: Amount, description: &str) -> Result<()> {
    validate_amount(amount)?;
    if description.trim().is_empty() {
        return Err(FlError::Validation(
            "Please describe what the expense is for".into(),
        ));
    }
    Ok(())
}

/// Check that a pending expense may be approved against the current balance.
pub fn ensure_can_approve(status: AccountStatus, amount: Amount, balance: Amount) -> Result<()> {
    ensure_pending(status)?;
    if balance < amount {
        return Err(FlError::Validation(format!(
            "Insufficient balance: the council has {balance} but the expense is {amount}"
        )));
    }
    Ok(())
}

pub fn ensure_pending(status: AccountStatus) -> Result<()> {
    match status {
        AccountStatus::PendingApproval => Ok(()),
        other => Err(FlError::Conflict(format!(
            "This transaction has already been processed ({other})"
        ))),
    }
}
