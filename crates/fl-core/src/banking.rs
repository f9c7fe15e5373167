//! Offering banking rules.
//!
//! A service's offering is banked exactly once, by one of three methods:
//! uploading a bank slip, a stream teller confirming cash receipt, or
//! self-banking through the mobile money gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FlError, Result};
use crate::types::Amount;

/// Status of a gateway transaction (self-banking or vehicle support).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = FlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" | "send_otp" | "ongoing" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" | "abandoned" | "reversed" => Ok(Self::Failed),
            other => Err(FlError::Validation(format!(
                "Unknown transaction status: {other}"
            ))),
        }
    }
}

/// The banking fields of a service record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankingState {
    pub cancelled: bool,
    pub banking_slip: Option<String>,
    pub confirmed_by: Option<String>,
    pub transaction_status: Option<TransactionStatus>,
}

impl BankingState {
    pub fn is_banked(&self) -> bool {
        self.banking_slip.is_some()
            || self.confirmed_by.is_some()
            || self.transaction_status == Some(TransactionStatus::Success)
    }
}

/// Check that a new banking attempt may start.
pub fn ensure_can_bank(state: &BankingState) -> Result<()> {
    if state.cancelled {
        return Err(FlError::Validation(
            "There was no service, so there is nothing to bank".into(),
        ));
    }
    if state.is_banked() {
        return Err(FlError::Conflict(
            "Banking has already been done for this service".into(),
        ));
    }
    if state.transaction_status == Some(TransactionStatus::Pending) {
        return Err(FlError::Conflict(
            "There is a self banking payment in progress for this service".into(),
        ));
    }
    Ok(())
}

/// Check that a teller may confirm this service's banking.
pub fn ensure_can_confirm(state: &BankingState) -> Result<()> {
    if let Some(teller) = &state.confirmed_by {
        return Err(FlError::Conflict(format!(
            "This service has already been confirmed as banked by {teller}"
        )));
    }
    ensure_can_bank(state)
}

/// Amount to charge so that the church receives `income` after the gateway fee.
pub fn self_banking_charge(income: Amount, fee_percent: f64) -> Amount {
    let fee = (income.pesewas() as f64 * fee_percent / 100.0).ceil() as i64;
    income + Amount(fee)
}

/// Mobile money networks supported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobileNetwork {
    Mtn,
    Vodafone,
    AirtelTigo,
}

impl MobileNetwork {
    pub fn provider_code(self) -> &'static str {
        match self {
            Self::Mtn => "mtn",
            Self::Vodafone => "vod",
            Self::AirtelTigo => "atl",
        }
    }
}

impl FromStr for MobileNetwork {
    type Err = FlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mtn" => Ok(Self::Mtn),
            "vod" | "vodafone" | "telecel" => Ok(Self::Vodafone),
            "atl" | "airteltigo" | "airtel-tigo" => Ok(Self::AirtelTigo),
            other => Err(FlError::Validation(format!("Unknown mobile network: {other}"))),
        }
    }
}
