//! Typed records reshaped from Neo4j rows.
//!
//! Queries return flat, aliased columns; the helpers here read them into
//! owned structs so the API never touches `neo4rs::Row` directly.

use std::str::FromStr;

use fl_core::accounts::{AccountStatus, TransactionCategory};
use fl_core::arrivals::{TopUpRates, VehicleType};
use fl_core::banking::{BankingState, TransactionStatus};
use fl_core::{Amount, ChurchId, ChurchLevel, MemberId, RecordId};
use neo4rs::Row;
use serde::de::DeserializeOwned;

use crate::client::GraphError;

// ── Column helpers ───────────────────────────────────────────────

pub(crate) fn col<T: DeserializeOwned>(row: &Row, key: &str) -> Result<T, GraphError> {
    row.get::<T>(key)
        .map_err(|e| GraphError::Serialization(format!("Failed to read column `{key}`: {e}")))
}

pub(crate) fn opt_col<T: DeserializeOwned>(row: &Row, key: &str) -> Option<T> {
    row.get::<Option<T>>(key).ok().flatten()
}

pub(crate) fn parsed<T>(row: &Row, key: &str) -> Result<T, GraphError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = col(row, key)?;
    raw.parse::<T>()
        .map_err(|e| GraphError::Serialization(format!("Bad value in `{key}`: {e}")))
}

pub(crate) fn opt_parsed<T: FromStr>(row: &Row, key: &str) -> Option<T> {
    opt_col::<String>(row, key).and_then(|s| s.parse::<T>().ok())
}

pub(crate) fn amount(row: &Row, key: &str) -> Amount {
    Amount(opt_col::<i64>(row, key).unwrap_or(0))
}

/// Label shared by every church unit, active or closed.
pub const CHURCH_LABEL: &str = "Church";

/// First label of a node that names a church level.
pub(crate) fn level_from_labels(labels: &[String]) -> Option<ChurchLevel> {
    labels.iter().find_map(|l| l.parse::<ChurchLevel>().ok())
}

// ── Directory ────────────────────────────────────────────────────

/// A reference to a church unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChurchRef {
    pub id: ChurchId,
    pub name: String,
    pub level: ChurchLevel,
}

/// A member as stored in the directory.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub id: MemberId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub whatsapp_number: String,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub date_of_birth: Option<String>,
    pub occupation: Option<String>,
    pub picture_url: Option<String>,
    pub auth_id: Option<String>,
    pub fellowship: Option<ChurchRef>,
}

impl MemberRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Cypher projection matching [`member_from_row`]; expects the member bound to `m`.
pub(crate) const MEMBER_COLUMNS: &str = "m.id AS id, m.firstName AS firstName, \
     m.middleName AS middleName, m.lastName AS lastName, m.email AS email, \
     m.phoneNumber AS phoneNumber, m.whatsappNumber AS whatsappNumber, \
     m.gender AS gender, m.maritalStatus AS maritalStatus, m.dob AS dob, \
     m.occupation AS occupation, m.pictureUrl AS pictureUrl, m.auth_id AS authId";

pub(crate) fn member_from_row(row: &Row) -> Result<MemberRecord, GraphError> {
    let fellowship = match (
        opt_parsed::<ChurchId>(row, "fellowshipId"),
        opt_col::<String>(row, "fellowshipName"),
    ) {
        (Some(id), Some(name)) => Some(ChurchRef {
            id,
            name,
            level: ChurchLevel::Fellowship,
        }),
        _ => None,
    };

    Ok(MemberRecord {
        id: parsed(row, "id")?,
        first_name: col(row, "firstName")?,
        middle_name: opt_col(row, "middleName").filter(|s: &String| !s.is_empty()),
        last_name: col(row, "lastName")?,
        email: opt_col(row, "email").unwrap_or_default(),
        phone_number: opt_col(row, "phoneNumber").unwrap_or_default(),
        whatsapp_number: opt_col(row, "whatsappNumber").unwrap_or_default(),
        gender: opt_col(row, "gender"),
        marital_status: opt_col(row, "maritalStatus"),
        date_of_birth: opt_col(row, "dob"),
        occupation: opt_col(row, "occupation").filter(|s: &String| !s.is_empty()),
        picture_url: opt_col(row, "pictureUrl"),
        auth_id: opt_col(row, "authId").filter(|s: &String| !s.is_empty()),
        fellowship,
    })
}

/// A church unit with its leader and sizes.
#[derive(Debug, Clone)]
pub struct ChurchRecord {
    pub church: ChurchRef,
    pub parent: Option<ChurchRef>,
    pub leader: Option<MemberRecord>,
    pub member_count: i64,
    pub active_children: i64,
}

// ── History ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: RecordId,
    pub time_stamp: String,
    pub history_record: String,
    pub logged_by: Option<String>,
}

pub(crate) fn history_from_row(row: &Row) -> Result<HistoryRecord, GraphError> {
    Ok(HistoryRecord {
        id: parsed(row, "id")?,
        time_stamp: col(row, "timeStamp")?,
        history_record: col(row, "historyRecord")?,
        logged_by: opt_col(row, "loggedBy"),
    })
}

// ── Services & Banking ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServiceRecordRow {
    pub id: RecordId,
    pub church: ChurchRef,
    pub service_date: String,
    pub attendance: i64,
    pub income: Amount,
    pub number_of_tithers: i64,
    pub no_service_reason: Option<String>,
    pub banking_slip: Option<String>,
    pub banking_confirmed_by: Option<String>,
    pub transaction_status: Option<TransactionStatus>,
    pub transaction_reference: Option<String>,
}

impl ServiceRecordRow {
    pub fn banking_state(&self) -> BankingState {
        BankingState {
            cancelled: self.no_service_reason.is_some(),
            banking_slip: self.banking_slip.clone(),
            confirmed_by: self.banking_confirmed_by.clone(),
            transaction_status: self.transaction_status,
        }
    }
}

pub(crate) fn service_from_row(row: &Row) -> Result<ServiceRecordRow, GraphError> {
    let labels: Vec<String> = col(row, "churchLabels")?;
    let level = level_from_labels(&labels)
        .ok_or_else(|| GraphError::Serialization("Service record without a church".into()))?;

    Ok(ServiceRecordRow {
        id: parsed(row, "id")?,
        church: ChurchRef {
            id: parsed(row, "churchId")?,
            name: col(row, "churchName")?,
            level,
        },
        service_date: col(row, "serviceDate")?,
        attendance: opt_col(row, "attendance").unwrap_or(0),
        income: amount(row, "income"),
        number_of_tithers: opt_col(row, "numberOfTithers").unwrap_or(0),
        no_service_reason: opt_col(row, "noServiceReason"),
        banking_slip: opt_col(row, "bankingSlip"),
        banking_confirmed_by: opt_col(row, "bankingConfirmedBy"),
        transaction_status: opt_parsed(row, "transactionStatus"),
        transaction_reference: opt_col(row, "transactionReference"),
    })
}

// ── Arrivals ─────────────────────────────────────────────────────

/// A bacenta's bussing for one day.
#[derive(Debug, Clone)]
pub struct BussingRow {
    pub id: RecordId,
    pub bacenta: ChurchRef,
    pub bussing_date: String,
    pub mobilisation_picture: String,
    pub vehicle_ids: Vec<RecordId>,
}

pub(crate) fn bussing_from_row(row: &Row) -> Result<BussingRow, GraphError> {
    let vehicle_ids: Vec<String> = opt_col(row, "vehicleIds").unwrap_or_default();
    Ok(BussingRow {
        id: parsed(row, "id")?,
        bacenta: ChurchRef {
            id: parsed(row, "bacentaId")?,
            name: col(row, "bacentaName")?,
            level: ChurchLevel::Bacenta,
        },
        bussing_date: col(row, "bussingDate")?,
        mobilisation_picture: opt_col(row, "mobilisationPicture").unwrap_or_default(),
        vehicle_ids: vehicle_ids
            .iter()
            .filter_map(|v| v.parse::<RecordId>().ok())
            .collect(),
    })
}

/// A vehicle record with the bacenta details needed to confirm and pay it.
#[derive(Debug, Clone)]
pub struct VehicleRow {
    pub id: RecordId,
    pub bacenta: ChurchRef,
    pub vehicle: VehicleType,
    pub leader_declaration: u32,
    pub attendance: Option<u32>,
    pub vehicle_cost: Amount,
    pub outbound: bool,
    pub arrival_time: Option<String>,
    pub top_up: Amount,
    pub transaction_status: Option<TransactionStatus>,
    pub rates: TopUpRates,
    pub momo_number: Option<String>,
    pub mobile_network: Option<String>,
    pub leader_name: Option<String>,
}

pub(crate) fn vehicle_from_row(row: &Row) -> Result<VehicleRow, GraphError> {
    Ok(VehicleRow {
        id: parsed(row, "id")?,
        bacenta: ChurchRef {
            id: parsed(row, "bacentaId")?,
            name: col(row, "bacentaName")?,
            level: ChurchLevel::Bacenta,
        },
        vehicle: parsed(row, "vehicle")?,
        leader_declaration: opt_col::<i64>(row, "leaderDeclaration").unwrap_or(0) as u32,
        attendance: opt_col::<i64>(row, "attendance").map(|a| a as u32),
        vehicle_cost: amount(row, "vehicleCost"),
        outbound: opt_col(row, "outbound").unwrap_or(false),
        arrival_time: opt_col(row, "arrivalTime"),
        top_up: amount(row, "vehicleTopUp"),
        transaction_status: opt_parsed(row, "transactionStatus"),
        rates: TopUpRates {
            sprinter: amount(row, "sprinterTopUp"),
            urvan: amount(row, "urvanTopUp"),
            car: amount(row, "carTopUp"),
        },
        momo_number: opt_col(row, "momoNumber"),
        mobile_network: opt_col(row, "mobileNetwork"),
        leader_name: opt_col(row, "leaderName"),
    })
}

// ── Accounts ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub id: RecordId,
    pub council: ChurchRef,
    pub category: TransactionCategory,
    pub amount: Amount,
    pub description: String,
    pub status: AccountStatus,
    pub created_at: String,
    pub council_balance: Amount,
}

pub(crate) fn transaction_from_row(row: &Row) -> Result<TransactionRecord, GraphError> {
    let category = match col::<String>(row, "category")?.as_str() {
        "Deposit" => TransactionCategory::Deposit,
        _ => TransactionCategory::Expense,
    };

    Ok(TransactionRecord {
        id: parsed(row, "id")?,
        council: ChurchRef {
            id: parsed(row, "councilId")?,
            name: col(row, "councilName")?,
            level: ChurchLevel::Council,
        },
        category,
        amount: amount(row, "amount"),
        description: opt_col(row, "description").unwrap_or_default(),
        status: parsed(row, "status")?,
        created_at: col(row, "createdAt")?,
        council_balance: amount(row, "balance"),
    })
}

/// Cypher projection matching [`transaction_from_row`]; expects `t` and `c`.
pub(crate) const TRANSACTION_COLUMNS: &str = "t.id AS id, c.id AS councilId, \
     c.name AS councilName, t.category AS category, t.amount AS amount, \
     t.description AS description, t.status AS status, t.createdAt AS createdAt, \
     c.weekdayBalance AS balance";

// ── Maps ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NearbyFellowship {
    pub fellowship: ChurchRef,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: f64,
    pub leader_name: Option<String>,
}
