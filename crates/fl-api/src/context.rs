//! Shared state available to every resolver.

use std::str::FromStr;
use std::sync::Arc;

use async_graphql::{Context, ID};

use fl_core::config::PolicyConfig;
use fl_core::FlError;
use fl_graph::{GraphClient, MemberRecord};

use crate::auth::current_user;
use crate::error::{ApiError, ApiResult};
use crate::external::{IdentityProvider, Notifier, PaymentGateway};

/// Process-wide services, cloned into the schema data once at startup.
#[derive(Clone)]
pub struct ApiContext {
    pub graph: GraphClient,
    pub policy: PolicyConfig,
    pub identity: Arc<dyn IdentityProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl ApiContext {
    pub fn from_ctx<'a>(ctx: &'a Context<'_>) -> ApiResult<&'a ApiContext> {
        ctx.data_opt::<ApiContext>()
            .ok_or_else(|| ApiError::Internal("ApiContext missing from schema data".into()))
    }

    /// The directory entry of the logged-in caller.
    pub async fn acting_member(&self, ctx: &Context<'_>) -> ApiResult<MemberRecord> {
        let user = current_user(ctx)?;
        if let Some(member) = self.graph.find_member_by_auth_id(&user.auth_id).await? {
            return Ok(member);
        }
        if !user.email.is_empty() {
            if let Some(member) = self.graph.find_member_by_email(&user.email).await? {
                return Ok(member);
            }
        }
        tracing::warn!(auth_id = %user.auth_id, "Authenticated user has no member record");
        Err(ApiError::NotFound(
            "Your login is not linked to a member in the directory".into(),
        ))
    }
}

/// Parse a GraphQL `ID` into one of the typed ids.
pub fn parse_id<T>(id: &ID) -> ApiResult<T>
where
    T: FromStr<Err = FlError>,
{
    id.as_str().parse::<T>().map_err(ApiError::from)
}
