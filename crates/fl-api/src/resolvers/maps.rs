use async_graphql::{Context, Object, Result, ResultExt, ID};

use fl_core::permissions::permit_leader_admin;
use fl_core::{ChurchId, ChurchLevel};
use fl_graph::maps::check_coordinates;

use crate::auth::{current_user, require_roles};
use crate::context::{parse_id, ApiContext};
use crate::error::{ApiError, ApiResult};
use crate::types::NearbyFellowshipGql;

const DEFAULT_RADIUS_KM: f64 = 5.0;
const DEFAULT_LIMIT: u32 = 10;
const MAX_RADIUS_KM: f64 = 100.0;

#[derive(Default)]
pub struct MapsQuery;

#[Object]
impl MapsQuery {
    /// Fellowships meeting within `radius_km` of a point, nearest first.
    async fn nearby_fellowships(
        &self,
        ctx: &Context<'_>,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
        limit: Option<u32>,
    ) -> Result<Vec<NearbyFellowshipGql>> {
        nearby_fellowships(ctx, latitude, longitude, radius_km, limit)
            .await
            .extend()
    }
}

async fn nearby_fellowships(
    ctx: &Context<'_>,
    latitude: f64,
    longitude: f64,
    radius_km: Option<f64>,
    limit: Option<u32>,
) -> ApiResult<Vec<NearbyFellowshipGql>> {
    current_user(ctx)?;
    let api = ApiContext::from_ctx(ctx)?;
    check_coordinates(latitude, longitude)?;

    let radius = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !(radius > 0.0 && radius <= MAX_RADIUS_KM) {
        return Err(ApiError::BadInput(format!(
            "Search radius must be between 0 and {MAX_RADIUS_KM} km"
        )));
    }
    let found = api
        .graph
        .nearby_fellowships(latitude, longitude, radius, limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(found.into_iter().map(NearbyFellowshipGql::from).collect())
}

#[derive(Default)]
pub struct MapsMutation;

#[Object]
impl MapsMutation {
    async fn set_fellowship_location(
        &self,
        ctx: &Context<'_>,
        fellowship_id: ID,
        latitude: f64,
        longitude: f64,
    ) -> Result<bool> {
        set_fellowship_location(ctx, fellowship_id, latitude, longitude)
            .await
            .extend()
    }
}

async fn set_fellowship_location(
    ctx: &Context<'_>,
    fellowship_id: ID,
    latitude: f64,
    longitude: f64,
) -> ApiResult<bool> {
    require_roles(ctx, &permit_leader_admin(ChurchLevel::Fellowship))?;
    let api = ApiContext::from_ctx(ctx)?;
    let fellowship_id: ChurchId = parse_id(&fellowship_id)?;

    check_coordinates(latitude, longitude)?;
    api.graph
        .set_fellowship_location(&fellowship_id, latitude, longitude)
        .await?;
    Ok(true)
}
