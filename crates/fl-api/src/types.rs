//! GraphQL object and enum types.
//!
//! Enums mirror the domain enums through `remote`; objects are built from the
//! graph records. Money crosses the API in cedis.

use async_graphql::{Enum, SimpleObject, ID};

use fl_graph::{
    BussingRow, ChurchRecord, ChurchRef, HistoryRecord, MemberRecord, NearbyFellowship,
    ServiceRecordRow, TransactionRecord, VehicleRow,
};

// ── Enums ────────────────────────────────────────────────────────

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "ChurchLevel", remote = "fl_core::types::ChurchLevel")]
pub enum ChurchLevelGql {
    Fellowship,
    Bacenta,
    Governorship,
    Council,
    Stream,
    Campus,
    Oversight,
    Denomination,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "ServantKind", remote = "fl_core::types::ServantKind")]
pub enum ServantKindGql {
    Leader,
    Admin,
    ArrivalsAdmin,
    ArrivalsCounter,
    ArrivalsPayer,
    Teller,
    SheepSeeker,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "Gender", remote = "fl_core::members::Gender")]
pub enum GenderGql {
    Male,
    Female,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "MaritalStatus", remote = "fl_core::members::MaritalStatus")]
pub enum MaritalStatusGql {
    Single,
    Married,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "TransactionStatus", remote = "fl_core::banking::TransactionStatus")]
pub enum TransactionStatusGql {
    Pending,
    Success,
    Failed,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "MobileNetwork", remote = "fl_core::banking::MobileNetwork")]
pub enum MobileNetworkGql {
    Mtn,
    Vodafone,
    AirtelTigo,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "VehicleType", remote = "fl_core::arrivals::VehicleType")]
pub enum VehicleTypeGql {
    Car,
    Sprinter,
    Urvan,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "TransactionCategory", remote = "fl_core::accounts::TransactionCategory")]
pub enum TransactionCategoryGql {
    Deposit,
    Expense,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(name = "AccountStatus", remote = "fl_core::accounts::AccountStatus")]
pub enum AccountStatusGql {
    PendingApproval,
    Success,
    Declined,
}

// ── Objects ──────────────────────────────────────────────────────

#[derive(SimpleObject, Clone, Debug)]
pub struct Church {
    pub id: ID,
    pub name: String,
    pub level: ChurchLevelGql,
}

impl From<ChurchRef> for Church {
    fn from(c: ChurchRef) -> Self {
        Self {
            id: ID(c.id.to_string()),
            name: c.name,
            level: c.level.into(),
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct Member {
    pub id: ID,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub whatsapp_number: String,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub date_of_birth: Option<String>,
    pub occupation: Option<String>,
    pub picture_url: Option<String>,
    pub fellowship: Option<Church>,
}

impl From<MemberRecord> for Member {
    fn from(m: MemberRecord) -> Self {
        Self {
            id: ID(m.id.to_string()),
            full_name: m.full_name(),
            first_name: m.first_name,
            middle_name: m.middle_name,
            last_name: m.last_name,
            email: m.email,
            phone_number: m.phone_number,
            whatsapp_number: m.whatsapp_number,
            gender: m.gender,
            marital_status: m.marital_status,
            date_of_birth: m.date_of_birth,
            occupation: m.occupation,
            picture_url: m.picture_url,
            fellowship: m.fellowship.map(Church::from),
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct ChurchDetails {
    pub id: ID,
    pub name: String,
    pub level: ChurchLevelGql,
    pub parent: Option<Church>,
    pub leader: Option<Member>,
    pub member_count: i64,
    pub active_children: i64,
}

impl From<ChurchRecord> for ChurchDetails {
    fn from(r: ChurchRecord) -> Self {
        Self {
            id: ID(r.church.id.to_string()),
            name: r.church.name,
            level: r.church.level.into(),
            parent: r.parent.map(Church::from),
            leader: r.leader.map(Member::from),
            member_count: r.member_count,
            active_children: r.active_children,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct HistoryEntry {
    pub id: ID,
    pub time_stamp: String,
    pub history_record: String,
    pub logged_by: Option<String>,
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(h: HistoryRecord) -> Self {
        Self {
            id: ID(h.id.to_string()),
            time_stamp: h.time_stamp,
            history_record: h.history_record,
            logged_by: h.logged_by,
        }
    }
}

/// Result of appointing or removing a servant.
#[derive(SimpleObject, Clone, Debug)]
pub struct ServantChange {
    pub servant: Member,
    pub church: Church,
    /// Role claim, e.g. `leaderBacenta`.
    pub role: String,
    pub history_record: String,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct ServiceRecord {
    pub id: ID,
    pub church: Church,
    pub service_date: String,
    pub attendance: i64,
    pub income: f64,
    pub number_of_tithers: i64,
    pub no_service_reason: Option<String>,
    pub banking_slip: Option<String>,
    pub banking_confirmed_by: Option<String>,
    pub transaction_status: Option<TransactionStatusGql>,
    pub transaction_reference: Option<String>,
    pub banked: bool,
}

impl From<ServiceRecordRow> for ServiceRecord {
    fn from(r: ServiceRecordRow) -> Self {
        let banked = r.banking_state().is_banked();
        Self {
            id: ID(r.id.to_string()),
            church: r.church.into(),
            service_date: r.service_date,
            attendance: r.attendance,
            income: r.income.cedis(),
            number_of_tithers: r.number_of_tithers,
            no_service_reason: r.no_service_reason,
            banking_slip: r.banking_slip,
            banking_confirmed_by: r.banking_confirmed_by,
            transaction_status: r.transaction_status.map(Into::into),
            transaction_reference: r.transaction_reference,
            banked,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct BussingRecord {
    pub id: ID,
    pub bacenta: Church,
    pub bussing_date: String,
    pub mobilisation_picture: String,
    pub vehicle_ids: Vec<ID>,
}

impl From<BussingRow> for BussingRecord {
    fn from(b: BussingRow) -> Self {
        Self {
            id: ID(b.id.to_string()),
            bacenta: b.bacenta.into(),
            bussing_date: b.bussing_date,
            mobilisation_picture: b.mobilisation_picture,
            vehicle_ids: b.vehicle_ids.iter().map(|v| ID(v.to_string())).collect(),
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct VehicleRecord {
    pub id: ID,
    pub bacenta: Church,
    pub vehicle: VehicleTypeGql,
    pub leader_declaration: u32,
    pub attendance: Option<u32>,
    pub vehicle_cost: f64,
    pub outbound: bool,
    pub arrival_time: Option<String>,
    pub vehicle_top_up: f64,
    pub transaction_status: Option<TransactionStatusGql>,
    pub leader_name: Option<String>,
}

impl From<VehicleRow> for VehicleRecord {
    fn from(v: VehicleRow) -> Self {
        Self {
            id: ID(v.id.to_string()),
            bacenta: v.bacenta.into(),
            vehicle: v.vehicle.into(),
            leader_declaration: v.leader_declaration,
            attendance: v.attendance,
            vehicle_cost: v.vehicle_cost.cedis(),
            outbound: v.outbound,
            arrival_time: v.arrival_time,
            vehicle_top_up: v.top_up.cedis(),
            transaction_status: v.transaction_status.map(Into::into),
            leader_name: v.leader_name,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct AccountTransaction {
    pub id: ID,
    pub council: Church,
    pub category: TransactionCategoryGql,
    pub amount: f64,
    pub description: String,
    pub status: AccountStatusGql,
    pub created_at: String,
    pub council_balance: f64,
}

impl From<TransactionRecord> for AccountTransaction {
    fn from(t: TransactionRecord) -> Self {
        Self {
            id: ID(t.id.to_string()),
            council: t.council.into(),
            category: t.category.into(),
            amount: t.amount.cedis(),
            description: t.description,
            status: t.status.into(),
            created_at: t.created_at,
            council_balance: t.council_balance.cedis(),
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "NearbyFellowship")]
pub struct NearbyFellowshipGql {
    pub fellowship: Church,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: f64,
    pub leader_name: Option<String>,
}

impl From<NearbyFellowship> for NearbyFellowshipGql {
    fn from(n: NearbyFellowship) -> Self {
        Self {
            fellowship: n.fellowship.into(),
            latitude: n.latitude,
            longitude: n.longitude,
            distance_km: n.distance_km,
            leader_name: n.leader_name,
        }
    }
}
