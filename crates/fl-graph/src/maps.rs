//! Fellowship locations.

use neo4rs::query;

use fl_core::{ChurchId, ChurchLevel, FlError};

use crate::client::{GraphClient, GraphError};
use crate::records::{col, opt_col, parsed, ChurchRef, NearbyFellowship};

/// Validate a WGS84 coordinate pair.
pub fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), FlError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(FlError::Validation(format!(
            "Invalid location: ({latitude}, {longitude})"
        )));
    }
    Ok(())
}

impl GraphClient {
    /// Active fellowships within `radius_km` of a point, nearest first.
    pub async fn nearby_fellowships(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: u32,
    ) -> Result<Vec<NearbyFellowship>, GraphError> {
        let q = query(
            "WITH point({latitude: $lat, longitude: $lng}) AS here
             MATCH (f:Fellowship)
             WHERE f.location IS NOT NULL
             WITH f, point.distance(f.location, here) / 1000.0 AS km
             WHERE km <= $radius
             OPTIONAL MATCH (leader:Member)-[:LEADS]->(f)
             RETURN f.id AS id, f.name AS name,
                    f.location.latitude AS latitude, f.location.longitude AS longitude,
                    km AS distanceKm,
                    leader.firstName + ' ' + leader.lastName AS leaderName
             ORDER BY km ASC
             LIMIT $limit",
        )
        .param("lat", latitude)
        .param("lng", longitude)
        .param("radius", radius_km)
        .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(NearbyFellowship {
                    fellowship: ChurchRef {
                        id: parsed(row, "id")?,
                        name: col(row, "name")?,
                        level: ChurchLevel::Fellowship,
                    },
                    latitude: col(row, "latitude")?,
                    longitude: col(row, "longitude")?,
                    distance_km: col(row, "distanceKm")?,
                    leader_name: opt_col(row, "leaderName"),
                })
            })
            .collect()
    }

    /// Pin a fellowship to where it meets.
    pub async fn set_fellowship_location(
        &self,
        fellowship_id: &ChurchId,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH (f:Fellowship {id: $id})
             SET f.location = point({latitude: $lat, longitude: $lng})
             RETURN f.id AS id",
        )
        .param("id", fellowship_id.to_string())
        .param("lat", latitude)
        .param("lng", longitude);

        match self.query_one(q).await? {
            Some(_) => Ok(()),
            None => Err(GraphError::not_found("Fellowship", fellowship_id)),
        }
    }
}
