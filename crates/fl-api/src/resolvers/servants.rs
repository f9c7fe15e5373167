//! `makeServant` / `removeServant`, one pair of mutations for every role.

use async_graphql::{Context, Object, Result, ResultExt, ID};

use fl_core::servants::servant_config;
use fl_core::{ChurchLevel, ServantKind};

use crate::auth::require_roles;
use crate::context::{parse_id, ApiContext};
use crate::error::ApiResult;
use crate::types::{ChurchLevelGql, ServantChange, ServantKindGql};
use crate::workflow::{ServantOutcome, ServantRequest, ServantWorkflow};

#[derive(Default)]
pub struct ServantMutation;

#[Object]
impl ServantMutation {
    /// Appoint `servant_id` as `kind` of the unit. Leaders and admins replace
    /// the current holder.
    async fn make_servant(
        &self,
        ctx: &Context<'_>,
        kind: ServantKindGql,
        level: ChurchLevelGql,
        servant_id: ID,
        church_id: ID,
    ) -> Result<ServantChange> {
        change_servant(ctx, Change::Make, kind.into(), level.into(), servant_id, church_id)
            .await
            .extend()
    }

    async fn remove_servant(
        &self,
        ctx: &Context<'_>,
        kind: ServantKindGql,
        level: ChurchLevelGql,
        servant_id: ID,
        church_id: ID,
    ) -> Result<ServantChange> {
        change_servant(ctx, Change::Remove, kind.into(), level.into(), servant_id, church_id)
            .await
            .extend()
    }
}

#[derive(Clone, Copy)]
enum Change {
    Make,
    Remove,
}

async fn change_servant(
    ctx: &Context<'_>,
    change: Change,
    kind: ServantKind,
    level: ChurchLevel,
    servant_id: ID,
    church_id: ID,
) -> ApiResult<ServantChange> {
    let cfg = servant_config(kind, level)?;
    let user = require_roles(ctx, &cfg.permitted)?;
    let api = ApiContext::from_ctx(ctx)?;
    let acting = api.acting_member(ctx).await?;

    let request = ServantRequest {
        kind,
        level,
        servant_id: parse_id(&servant_id)?,
        church_id: parse_id(&church_id)?,
    };
    let workflow = ServantWorkflow::new(&api.graph, api.identity.as_ref(), api.notifier.as_ref());
    let outcome = match change {
        Change::Make => workflow.make(&user.roles, &acting.id, request).await?,
        Change::Remove => workflow.remove(&user.roles, &acting.id, request).await?,
    };
    Ok(outcome.into())
}

impl From<ServantOutcome> for ServantChange {
    fn from(o: ServantOutcome) -> Self {
        Self {
            servant: o.servant.into(),
            church: o.church.into(),
            role: o.role.to_string(),
            history_record: o.event.record(),
        }
    }
}
