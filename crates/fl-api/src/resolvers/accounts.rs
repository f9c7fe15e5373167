//! Council weekday accounts: deposits and expense requests.

use async_graphql::{Context, Object, Result, ResultExt, ID};

use fl_core::accounts::{ensure_can_approve, ensure_pending, validate_amount, validate_expense};
use fl_core::permissions::{permit_admin, permit_leader_admin};
use fl_core::{Amount, ChurchId, ChurchLevel, RecordId};

use crate::auth::{current_user, require_roles};
use crate::context::{parse_id, ApiContext};
use crate::error::ApiResult;
use crate::types::AccountTransaction;

#[derive(Default)]
pub struct AccountsQuery;

#[Object]
impl AccountsQuery {
    async fn transaction(&self, ctx: &Context<'_>, id: ID) -> Result<AccountTransaction> {
        transaction(ctx, id).await.extend()
    }
}

async fn transaction(ctx: &Context<'_>, id: ID) -> ApiResult<AccountTransaction> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    let id: RecordId = parse_id(&id)?;
    Ok(api.graph.get_transaction(&id).await?.into())
}

#[derive(Default)]
pub struct AccountsMutation;

#[Object]
impl AccountsMutation {
    async fn deposit_into_council(
        &self,
        ctx: &Context<'_>,
        council_id: ID,
        amount: f64,
        description: String,
    ) -> Result<AccountTransaction> {
        deposit_into_council(ctx, council_id, amount, description)
            .await
            .extend()
    }

    async fn request_expense(
        &self,
        ctx: &Context<'_>,
        council_id: ID,
        amount: f64,
        description: String,
    ) -> Result<AccountTransaction> {
        request_expense(ctx, council_id, amount, description)
            .await
            .extend()
    }

    async fn approve_expense(&self, ctx: &Context<'_>, transaction_id: ID) -> Result<AccountTransaction> {
        approve_expense(ctx, transaction_id).await.extend()
    }

    async fn decline_expense(&self, ctx: &Context<'_>, transaction_id: ID) -> Result<AccountTransaction> {
        decline_expense(ctx, transaction_id).await.extend()
    }
}

async fn deposit_into_council(
    ctx: &Context<'_>,
    council_id: ID,
    amount: f64,
    description: String,
) -> ApiResult<AccountTransaction> {
    require_roles(ctx, &permit_admin(ChurchLevel::Stream))?;
    let amount = Amount::try_from_cedis(amount)?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let council_id: ChurchId = parse_id(&council_id)?;

    validate_amount(amount)?;
    let record = api
        .graph
        .deposit_into_council(&council_id, amount, description.trim(), &acting.id)
        .await?;
    Ok(record.into())
}

async fn request_expense(
    ctx: &Context<'_>,
    council_id: ID,
    amount: f64,
    description: String,
) -> ApiResult<AccountTransaction> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Council))?;
    let amount = Amount::try_from_cedis(amount)?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let council_id: ChurchId = parse_id(&council_id)?;

    validate_expense(amount, &description)?;
    let record = api
        .graph
        .request_expense(&council_id, amount, description.trim(), &acting.id)
        .await?;
    Ok(record.into())
}

async fn approve_expense(ctx: &Context<'_>, transaction_id: ID) -> ApiResult<AccountTransaction> {
    require_roles(ctx, &permit_admin(ChurchLevel::Stream))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let id: RecordId = parse_id(&transaction_id)?;

    let current = api.graph.get_transaction(&id).await?;
    ensure_can_approve(current.status, current.amount, current.council_balance)?;
    Ok(api.graph.approve_expense(&id, &acting.id).await?.into())
}

async fn decline_expense(ctx: &Context<'_>, transaction_id: ID) -> ApiResult<AccountTransaction> {
    require_roles(ctx, &permit_admin(ChurchLevel::Stream))?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;
    let id: RecordId = parse_id(&transaction_id)?;

    let current = api.graph.get_transaction(&id).await?;
    ensure_pending(current.status)?;
    Ok(api.graph.decline_expense(&id, &acting.id).await?.into())
}
