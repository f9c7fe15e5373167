//! Service form rules.

use chrono::{Datelike, NaiveDate};

use crate::config::PolicyConfig;
use crate::error::{FlError, Result};
use crate::types::{Amount, MemberId};

/// A filled service form for one church unit.
#[derive(Debug, Clone)]
pub struct ServiceForm {
    pub service_date: NaiveDate,
    pub attendance: i64,
    pub income: Amount,
    pub foreign_currency: Option<String>,
    pub number_of_tithers: i64,
    pub treasurers: Vec<MemberId>,
    pub treasurer_selfie: String,
    pub family_picture: String,
}

pub fn validate_service(form: &ServiceForm, today: NaiveDate, policy: &PolicyConfig) -> Result<()> {
    ensure_not_future(form.service_date, today)?;

    if form.attendance < 0 {
        return Err(FlError::Validation("Attendance cannot be negative".into()));
    }
    if form.income.is_negative() {
        return Err(FlError::Validation("Income cannot be negative".into()));
    }
    if form.number_of_tithers < 0 || form.number_of_tithers > form.attendance {
        return Err(FlError::Validation(
            "Number of tithers must be between zero and the attendance".into(),
        ));
    }

    let mut treasurers = form.treasurers.clone();
    treasurers.sort_by_key(|t| t.0);
    treasurers.dedup();
    if treasurers.len() != form.treasurers.len() {
        return Err(FlError::Validation(
            "Each treasurer can only be listed once".into(),
        ));
    }
    if treasurers.len() < policy.min_treasurers {
        return Err(FlError::Validation(format!(
            "At least {} treasurers must sign off the service",
            policy.min_treasurers
        )));
    }

    if form.treasurer_selfie.trim().is_empty() {
        return Err(FlError::Validation("Please upload a treasurer selfie".into()));
    }
    Ok(())
}

pub fn validate_cancellation(service_date: NaiveDate, reason: &str, today: NaiveDate) -> Result<()> {
    ensure_not_future(service_date, today)?;
    if reason.trim().is_empty() {
        return Err(FlError::Validation(
            "Please give a reason why there was no service".into(),
        ));
    }
    Ok(())
}

fn ensure_not_future(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date > today {
        return Err(FlError::Validation(
            "You cannot fill a service form for a future date".into(),
        ));
    }
    Ok(())
}

/// ISO (year, week) a service belongs to. One form per unit per week.
pub fn service_week(date: NaiveDate) -> (i32, u32) {
    let w = date.iso_week();
    (w.year(), w.week())
}
