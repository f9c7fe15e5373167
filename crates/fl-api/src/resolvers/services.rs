//! Service forms and offering banking.

use async_graphql::{Context, InputObject, Object, Result, ResultExt, ID};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use fl_core::banking::{ensure_can_bank, ensure_can_confirm, self_banking_charge, MobileNetwork};
use fl_core::history::HistoryEvent;
use fl_core::permissions::{permit_leader_admin, permit_teller};
use fl_core::services::{validate_cancellation, validate_service, ServiceForm};
use fl_core::{Amount, ChurchId, ChurchLevel, MemberId, RecordId};
use fl_graph::history::HistoryLinks;
use fl_graph::ServiceRecordRow;

use crate::auth::{current_user, require_roles};
use crate::context::{parse_id, ApiContext};
use crate::error::{ApiError, ApiResult};
use crate::external::{settled_status, ChargeRequest};
use crate::types::{ChurchLevelGql, MobileNetworkGql, ServiceRecord};

#[derive(InputObject, Clone, Debug)]
pub struct ServiceInput {
    pub service_date: NaiveDate,
    pub attendance: i64,
    /// Income in cedis.
    pub income: f64,
    pub foreign_currency: Option<String>,
    pub number_of_tithers: i64,
    pub treasurers: Vec<ID>,
    pub treasurer_selfie: String,
    pub family_picture: String,
}

impl ServiceInput {
    fn into_form(self) -> ApiResult<ServiceForm> {
        let treasurers = self
            .treasurers
            .iter()
            .map(parse_id::<MemberId>)
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(ServiceForm {
            service_date: self.service_date,
            attendance: self.attendance,
            income: Amount::try_from_cedis(self.income)?,
            foreign_currency: self.foreign_currency,
            number_of_tithers: self.number_of_tithers,
            treasurers,
            treasurer_selfie: self.treasurer_selfie,
            family_picture: self.family_picture,
        })
    }
}

#[derive(Default)]
pub struct ServiceQuery;

#[Object]
impl ServiceQuery {
    async fn service_record(&self, ctx: &Context<'_>, id: ID) -> Result<ServiceRecord> {
        service_record(ctx, id).await.extend()
    }
}

async fn service_record(ctx: &Context<'_>, id: ID) -> ApiResult<ServiceRecord> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let id: RecordId = parse_id(&id)?;
    Ok(api.graph.get_service_record(&id).await?.into())
}

#[derive(Default)]
pub struct ServiceMutation;

#[Object]
impl ServiceMutation {
    /// File the weekly service form for a unit.
    async fn record_service(
        &self,
        ctx: &Context<'_>,
        level: ChurchLevelGql,
        church_id: ID,
        input: ServiceInput,
    ) -> Result<ServiceRecord> {
        record_service(ctx, level.into(), church_id, input).await.extend()
    }

    async fn record_cancelled_service(
        &self,
        ctx: &Context<'_>,
        level: ChurchLevelGql,
        church_id: ID,
        service_date: NaiveDate,
        no_service_reason: String,
    ) -> Result<ServiceRecord> {
        record_cancelled_service(ctx, level.into(), church_id, service_date, no_service_reason)
            .await
            .extend()
    }

    async fn submit_banking_slip(
        &self,
        ctx: &Context<'_>,
        service_record_id: ID,
        banking_slip: String,
    ) -> Result<ServiceRecord> {
        submit_banking_slip(ctx, service_record_id, banking_slip)
            .await
            .extend()
    }

    /// Teller confirmation that the offering reached the bank.
    async fn confirm_banking(&self, ctx: &Context<'_>, service_record_id: ID) -> Result<ServiceRecord> {
        confirm_banking(ctx, service_record_id).await.extend()
    }

    /// Pay the offering by mobile money. The charge includes the gateway fee.
    async fn self_bank_offering(
        &self,
        ctx: &Context<'_>,
        service_record_id: ID,
        mobile_network: MobileNetworkGql,
        momo_number: String,
    ) -> Result<ServiceRecord> {
        self_bank_offering(ctx, service_record_id, mobile_network, momo_number)
            .await
            .extend()
    }

    /// Ask the gateway how a pending self banking payment went.
    async fn confirm_offering_payment(
        &self,
        ctx: &Context<'_>,
        service_record_id: ID,
    ) -> Result<ServiceRecord> {
        confirm_offering_payment(ctx, service_record_id).await.extend()
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn ensure_week_is_free(
    api: &ApiContext,
    level: ChurchLevel,
    church_id: &ChurchId,
    date: NaiveDate,
) -> ApiResult<()> {
    if api.graph.service_in_week(level, church_id, date).await?.is_some() {
        return Err(ApiError::Conflict(
            "You have already filled your service form for this week".into(),
        ));
    }
    Ok(())
}

async fn record_service(
    ctx: &Context<'_>,
    level: ChurchLevel,
    church_id: ID,
    input: ServiceInput,
) -> ApiResult<ServiceRecord> {
    require_roles(ctx, &permit_leader_admin(level))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let church_id: ChurchId = parse_id(&church_id)?;

    let form = input.into_form()?;
    validate_service(&form, today(), &api.policy)?;
    ensure_week_is_free(api, level, &church_id, form.service_date).await?;

    let record = api
        .graph
        .record_service(level, &church_id, &form, &acting.id)
        .await?;
    Ok(record.into())
}

async fn record_cancelled_service(
    ctx: &Context<'_>,
    level: ChurchLevel,
    church_id: ID,
    service_date: NaiveDate,
    reason: String,
) -> ApiResult<ServiceRecord> {
    require_roles(ctx, &permit_leader_admin(level))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let church_id: ChurchId = parse_id(&church_id)?;

    validate_cancellation(service_date, &reason, today())?;
    ensure_week_is_free(api, level, &church_id, service_date).await?;

    let record = api
        .graph
        .record_cancelled_service(level, &church_id, service_date, reason.trim(), &acting.id)
        .await?;
    Ok(record.into())
}

async fn load_record(api: &ApiContext, id: &ID) -> ApiResult<ServiceRecordRow> {
    let id: RecordId = parse_id(id)?;
    Ok(api.graph.get_service_record(&id).await?)
}

async fn submit_banking_slip(ctx: &Context<'_>, service_record_id: ID, slip: String) -> ApiResult<ServiceRecord> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Fellowship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let record = load_record(api, &service_record_id).await?;

    if slip.trim().is_empty() {
        return Err(ApiError::BadInput("Please upload a picture of the banking slip".into()));
    }
    ensure_can_bank(&record.banking_state())?;

    let updated = api
        .graph
        .submit_banking_slip(&record.id, slip.trim(), &acting.id)
        .await?;
    Ok(updated.into())
}

async fn confirm_banking(ctx: &Context<'_>, service_record_id: ID) -> ApiResult<ServiceRecord> {
    require_roles(ctx, &permit_teller(ChurchLevel::Stream))?;
    let api = ApiContext::from_ctx(ctx)?;
    let teller = api.acting_member(ctx).await?;
    let record = load_record(api, &service_record_id).await?;

    ensure_can_confirm(&record.banking_state())?;
    let updated = api.graph.confirm_banking(&record.id, &teller.id).await?;

    api.graph
        .record_history(
            &HistoryEvent::BankingConfirmed {
                church: updated.church.name.clone(),
                level: updated.church.level,
                teller: teller.full_name(),
                amount: updated.income,
            },
            &HistoryLinks {
                member: None,
                church: Some(updated.church.id),
                logged_by: Some(teller.id),
            },
        )
        .await?;
    Ok(updated.into())
}

async fn self_bank_offering(
    ctx: &Context<'_>,
    service_record_id: ID,
    network: MobileNetworkGql,
    momo_number: String,
) -> ApiResult<ServiceRecord> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Fellowship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let payer = api.acting_member(ctx).await?;
    let record = load_record(api, &service_record_id).await?;

    ensure_can_bank(&record.banking_state())?;
    if record.income.is_zero() {
        return Err(ApiError::BadInput("There is no offering to bank".into()));
    }

    let charge = self_banking_charge(record.income, api.policy.self_banking_fee_percent);
    let network: MobileNetwork = network.into();

    // Claim the record before any money moves.
    let reference = Uuid::new_v4().to_string();
    api.graph
        .set_offering_payment_pending(&record.id, &reference, charge, network, &momo_number, &payer.id)
        .await?;

    let answer = api
        .payments
        .charge(&ChargeRequest {
            reference: reference.clone(),
            amount: charge,
            momo_number,
            network,
            email: payer.email.clone(),
            description: format!(
                "{} {} offering for {}",
                record.church.name, record.church.level, record.service_date
            ),
        })
        .await;
    let updated = api
        .graph
        .set_offering_payment_status(&reference, settled_status(&answer))
        .await?;

    let receipt = answer?;
    tracing::info!(
        record = %record.id,
        reference = %reference,
        gateway_reference = %receipt.reference,
        amount = %charge,
        "Self banking charge started"
    );
    Ok(updated.into())
}

async fn confirm_offering_payment(ctx: &Context<'_>, service_record_id: ID) -> ApiResult<ServiceRecord> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Fellowship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let record = load_record(api, &service_record_id).await?;

    let reference = record.transaction_reference.as_deref().ok_or_else(|| {
        ApiError::BadInput("No self banking payment has been started for this service".into())
    })?;
    let status = api.payments.verify(reference).await?;
    let updated = api
        .graph
        .set_offering_payment_status(reference, status)
        .await?;
    Ok(updated.into())
}
