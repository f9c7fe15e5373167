//! Bussing records, vehicle confirmation and vehicle support payments.

use async_graphql::{Context, InputObject, Object, Result, ResultExt, ID};
use chrono::Utc;
use uuid::Uuid;

use fl_core::arrivals::{ensure_can_pay, validate_vehicles, vehicle_top_up, TopUpRates, VehicleEntry};
use fl_core::banking::MobileNetwork;
use fl_core::permissions::{
    permit_admin_arrivals, permit_arrivals, permit_arrivals_counter, permit_arrivals_payer,
    permit_leader,
};
use fl_core::{Amount, ChurchId, ChurchLevel, RecordId, Role};

use crate::auth::require_roles;
use crate::context::{parse_id, ApiContext};
use crate::error::{ApiError, ApiResult};
use crate::external::{settled_status, TransferRequest};
use crate::types::{BussingRecord, MobileNetworkGql, VehicleRecord, VehicleTypeGql};

#[derive(InputObject, Clone, Debug)]
pub struct VehicleInput {
    pub vehicle: VehicleTypeGql,
    /// Number of people the leader declares were on board.
    pub attendance: u32,
    /// Cost of the vehicle in cedis.
    pub vehicle_cost: f64,
    pub outbound: bool,
    pub picture: String,
}

impl TryFrom<VehicleInput> for VehicleEntry {
    type Error = ApiError;

    fn try_from(v: VehicleInput) -> ApiResult<Self> {
        Ok(Self {
            vehicle: v.vehicle.into(),
            attendance: v.attendance,
            cost: Amount::try_from_cedis(v.vehicle_cost)?,
            outbound: v.outbound,
            picture: v.picture,
        })
    }
}

fn top_up_rates(sprinter: f64, urvan: f64, car: f64) -> ApiResult<TopUpRates> {
    Ok(TopUpRates {
        sprinter: Amount::try_from_cedis(sprinter)?,
        urvan: Amount::try_from_cedis(urvan)?,
        car: Amount::try_from_cedis(car)?,
    })
}

/// Bacenta leaders and the arrivals admins above them.
fn bussing_permission() -> Vec<Role> {
    let mut roles = permit_leader(ChurchLevel::Bacenta);
    roles.extend(permit_arrivals(ChurchLevel::Governorship));
    roles
}

#[derive(Default)]
pub struct ArrivalsMutation;

#[Object]
impl ArrivalsMutation {
    /// Open today's bussing record for a bacenta.
    async fn upload_mobilisation_picture(
        &self,
        ctx: &Context<'_>,
        bacenta_id: ID,
        mobilisation_picture: String,
    ) -> Result<BussingRecord> {
        upload_mobilisation_picture(ctx, bacenta_id, mobilisation_picture)
            .await
            .extend()
    }

    async fn record_bussing(
        &self,
        ctx: &Context<'_>,
        bussing_record_id: ID,
        vehicles: Vec<VehicleInput>,
    ) -> Result<BussingRecord> {
        record_bussing(ctx, bussing_record_id, vehicles).await.extend()
    }

    /// Counter's confirmation of a vehicle at the venue. Fixes the top-up.
    async fn confirm_vehicle_by_admin(
        &self,
        ctx: &Context<'_>,
        vehicle_record_id: ID,
        attendance: u32,
    ) -> Result<VehicleRecord> {
        confirm_vehicle_by_admin(ctx, vehicle_record_id, attendance)
            .await
            .extend()
    }

    /// Transfer the vehicle top-up to the bacenta's mobile money account.
    async fn send_vehicle_support(&self, ctx: &Context<'_>, vehicle_record_id: ID) -> Result<VehicleRecord> {
        send_vehicle_support(ctx, vehicle_record_id).await.extend()
    }

    #[allow(clippy::too_many_arguments)]
    async fn set_bacenta_bussing_details(
        &self,
        ctx: &Context<'_>,
        bacenta_id: ID,
        sprinter_top_up: f64,
        urvan_top_up: f64,
        car_top_up: f64,
        momo_number: String,
        mobile_network: MobileNetworkGql,
    ) -> Result<bool> {
        let rates = top_up_rates(sprinter_top_up, urvan_top_up, car_top_up).extend()?;
        set_bacenta_bussing_details(ctx, bacenta_id, rates, momo_number, mobile_network.into())
            .await
            .extend()
    }
}

async fn upload_mobilisation_picture(
    ctx: &Context<'_>,
    bacenta_id: ID,
    picture: String,
) -> ApiResult<BussingRecord> {
    require_roles(ctx, &bussing_permission())?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let bacenta_id: ChurchId = parse_id(&bacenta_id)?;

    if picture.trim().is_empty() {
        return Err(ApiError::BadInput("Please upload a mobilisation picture".into()));
    }
    let today = Utc::now().date_naive();
    let record = api
        .graph
        .create_bussing_record(&bacenta_id, today, picture.trim(), &acting.id)
        .await?;
    Ok(record.into())
}

async fn record_bussing(
    ctx: &Context<'_>,
    bussing_record_id: ID,
    vehicles: Vec<VehicleInput>,
) -> ApiResult<BussingRecord> {
    require_roles(ctx, &bussing_permission())?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let bussing_id: RecordId = parse_id(&bussing_record_id)?;

    let entries = vehicles
        .into_iter()
        .map(VehicleEntry::try_from)
        .collect::<ApiResult<Vec<_>>>()?;
    validate_vehicles(&entries)?;

    let existing = api.graph.get_bussing_record(&bussing_id).await?;
    if !existing.vehicle_ids.is_empty() {
        return Err(ApiError::Conflict(
            "Vehicles have already been recorded for this bussing".into(),
        ));
    }

    let record = api
        .graph
        .record_vehicles(&bussing_id, &entries, &acting.id)
        .await?;
    Ok(record.into())
}

async fn confirm_vehicle_by_admin(
    ctx: &Context<'_>,
    vehicle_record_id: ID,
    attendance: u32,
) -> ApiResult<VehicleRecord> {
    require_roles(ctx, &permit_arrivals_counter(ChurchLevel::Stream))?;
    let api = ApiContext::from_ctx(ctx)?;
    let counter = api.acting_member(ctx).await?;
    let vehicle_id: RecordId = parse_id(&vehicle_record_id)?;

    let vehicle = api.graph.get_vehicle(&vehicle_id).await?;
    if vehicle.arrival_time.is_some() {
        return Err(ApiError::Conflict("This vehicle has already been confirmed".into()));
    }

    let top_up = vehicle_top_up(
        attendance,
        vehicle.vehicle,
        vehicle.outbound,
        vehicle.vehicle_cost,
        &vehicle.rates,
        &api.policy,
    );
    let confirmed = api
        .graph
        .confirm_vehicle(&vehicle_id, attendance, top_up, &counter.id)
        .await?;
    Ok(confirmed.into())
}

async fn send_vehicle_support(ctx: &Context<'_>, vehicle_record_id: ID) -> ApiResult<VehicleRecord> {
    require_roles(ctx, &permit_arrivals_payer(ChurchLevel::Council))?;
    let api = ApiContext::from_ctx(ctx)?;
    let payer = api.acting_member(ctx).await?;
    let vehicle_id: RecordId = parse_id(&vehicle_record_id)?;

    let vehicle = api.graph.get_vehicle(&vehicle_id).await?;
    ensure_can_pay(
        vehicle.arrival_time.is_some(),
        vehicle.top_up,
        vehicle.transaction_status,
    )?;

    let (Some(momo_number), Some(network)) = (&vehicle.momo_number, &vehicle.mobile_network) else {
        return Err(ApiError::BadInput(format!(
            "{} Bacenta has no mobile money details for bussing support",
            vehicle.bacenta.name
        )));
    };
    let network: MobileNetwork = network.parse()?;

    // Claim the vehicle before any money moves.
    let reference = Uuid::new_v4().to_string();
    api.graph
        .set_vehicle_payment_pending(&vehicle_id, &reference, &payer.id)
        .await?;

    let answer = api
        .payments
        .transfer(&TransferRequest {
            amount: vehicle.top_up,
            momo_number: momo_number.clone(),
            network,
            recipient_name: vehicle.leader_name.clone().unwrap_or_default(),
            description: format!("{} Bacenta bussing support {reference}", vehicle.bacenta.name),
        })
        .await;
    let updated = api
        .graph
        .set_vehicle_payment_status(&vehicle_id, settled_status(&answer))
        .await?;

    let receipt = answer?;
    tracing::info!(
        vehicle = %vehicle_id,
        reference = %reference,
        gateway_reference = %receipt.reference,
        amount = %vehicle.top_up,
        "Vehicle support sent"
    );
    Ok(updated.into())
}

async fn set_bacenta_bussing_details(
    ctx: &Context<'_>,
    bacenta_id: ID,
    rates: TopUpRates,
    momo_number: String,
    network: MobileNetwork,
) -> ApiResult<bool> {
    require_roles(ctx, &permit_admin_arrivals(ChurchLevel::Governorship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let bacenta_id: ChurchId = parse_id(&bacenta_id)?;

    if [rates.sprinter, rates.urvan, rates.car].iter().any(|a| a.is_negative()) {
        return Err(ApiError::BadInput("Top-up rates cannot be negative".into()));
    }
    let momo_number = fl_core::members::normalize_phone(&momo_number)?;
    api.graph
        .set_bacenta_bussing_details(&bacenta_id, &rates, &momo_number, network)
        .await?;
    Ok(true)
}
