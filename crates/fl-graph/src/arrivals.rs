//! Bussing records and vehicle arrivals.
//!
//! `(bacenta)-[:CURRENT_HISTORY]->(:ServiceLog)-[:HAS_BUSSING]->(:BussingRecord)
//!  -[:INCLUDES_RECORD]->(:VehicleRecord)`

use chrono::{NaiveDate, Utc};
use neo4rs::query;

use fl_core::arrivals::{TopUpRates, VehicleEntry};
use fl_core::banking::{MobileNetwork, TransactionStatus};
use fl_core::{Amount, ChurchId, MemberId, RecordId};

use crate::client::{GraphClient, GraphError};
use crate::records::{bussing_from_row, col, vehicle_from_row, BussingRow, VehicleRow};

const BUSSING_PROJECTION: &str = "
    MATCH (b:Bacenta)-[:HAS_HISTORY]->(:ServiceLog)-[:HAS_BUSSING]->(bussing)
    WITH bussing, b LIMIT 1
    OPTIONAL MATCH (bussing)-[:INCLUDES_RECORD]->(v:VehicleRecord)
    RETURN bussing.id AS id, b.id AS bacentaId, b.name AS bacentaName,
           bussing.bussingDate AS bussingDate,
           bussing.mobilisationPicture AS mobilisationPicture,
           collect(v.id) AS vehicleIds";

const VEHICLE_PROJECTION: &str = "
    MATCH (b:Bacenta)-[:HAS_HISTORY]->(:ServiceLog)-[:HAS_BUSSING]->(:BussingRecord)
          -[:INCLUDES_RECORD]->(v)
    WITH v, b LIMIT 1
    OPTIONAL MATCH (leader:Member)-[:LEADS]->(b)
    RETURN v.id AS id, b.id AS bacentaId, b.name AS bacentaName,
           v.vehicle AS vehicle, v.leaderDeclaration AS leaderDeclaration,
           v.attendance AS attendance, v.vehicleCost AS vehicleCost,
           v.outbound AS outbound, v.arrivalTime AS arrivalTime,
           v.vehicleTopUp AS vehicleTopUp, v.transactionStatus AS transactionStatus,
           b.sprinterTopUp AS sprinterTopUp, b.urvanTopUp AS urvanTopUp,
           b.carTopUp AS carTopUp, b.momoNumber AS momoNumber,
           b.mobileNetwork AS mobileNetwork,
           leader.firstName + ' ' + leader.lastName AS leaderName";

impl GraphClient {
    /// The bussing record a bacenta has already opened for `date`.
    pub async fn bussing_record_for_day(
        &self,
        bacenta_id: &ChurchId,
        date: NaiveDate,
    ) -> Result<Option<BussingRow>, GraphError> {
        let cypher = format!(
            "MATCH (:Bacenta {{id: $id}})-[:HAS_HISTORY]->(:ServiceLog)
                  -[:HAS_BUSSING]->(bussing:BussingRecord {{bussingDate: $date}})
             WITH bussing {BUSSING_PROJECTION}"
        );
        let q = query(&cypher)
            .param("id", bacenta_id.to_string())
            .param("date", date.to_string());

        self.query_one(q)
            .await?
            .map(|row| bussing_from_row(&row))
            .transpose()
    }

    /// Open the day's bussing record with the mobilisation picture.
    ///
    /// The bacenta is locked before the day's record is looked for, so two
    /// uploads for the same day cannot both open one.
    pub async fn create_bussing_record(
        &self,
        bacenta_id: &ChurchId,
        date: NaiveDate,
        mobilisation_picture: &str,
        created_by: &MemberId,
    ) -> Result<BussingRow, GraphError> {
        let bussing_id = RecordId::new();
        let q = query(
            "MATCH (b:Bacenta {id: $bacenta_id})-[:CURRENT_HISTORY]->(log:ServiceLog)
             MATCH (by:Member {id: $created_by})
             SET b._lock = true REMOVE b._lock
             WITH b, log, by
             WHERE NOT EXISTS {
               MATCH (b)-[:HAS_HISTORY]->(:ServiceLog)
                     -[:HAS_BUSSING]->(:BussingRecord {bussingDate: $date})
             }
             CREATE (bussing:BussingRecord {
               id: $id, createdAt: $now, bussingDate: $date,
               mobilisationPicture: $picture
             })
             MERGE (log)-[:HAS_BUSSING]->(bussing)
             MERGE (date:TimeGraph {date: $date})
             MERGE (bussing)-[:BUSSED_ON]->(date)
             MERGE (bussing)-[:CREATED_BY]->(by)
             RETURN bussing.id AS id",
        )
        .param("bacenta_id", bacenta_id.to_string())
        .param("created_by", created_by.to_string())
        .param("id", bussing_id.to_string())
        .param("now", Utc::now().to_rfc3339())
        .param("date", date.to_string())
        .param("picture", mobilisation_picture.to_string());

        if self.query_one(q).await?.is_none() {
            if self.bussing_record_for_day(bacenta_id, date).await?.is_some() {
                return Err(GraphError::Conflict(
                    "You have already uploaded a mobilisation picture for today".into(),
                ));
            }
            return Err(GraphError::Conflict(
                "This bacenta has no leader yet, so it cannot record bussing".into(),
            ));
        }
        tracing::info!(bacenta = %bacenta_id, bussing = %bussing_id, "Bussing record created");
        self.get_bussing_record(&bussing_id).await
    }

    pub async fn get_bussing_record(&self, bussing_id: &RecordId) -> Result<BussingRow, GraphError> {
        let cypher =
            format!("MATCH (bussing:BussingRecord {{id: $id}}) WITH bussing {BUSSING_PROJECTION}");
        let q = query(&cypher).param("id", bussing_id.to_string());

        match self.query_one(q).await? {
            Some(row) => bussing_from_row(&row),
            None => Err(GraphError::not_found("BussingRecord", bussing_id)),
        }
    }

    /// Add the leader's declared vehicles to a bussing record.
    ///
    /// Vehicles can only be declared once per record. The first statement
    /// locks the record and stamps it with this batch; the vehicle writes only
    /// match a record carrying the same stamp, so a losing concurrent batch
    /// writes nothing.
    pub async fn record_vehicles(
        &self,
        bussing_id: &RecordId,
        vehicles: &[VehicleEntry],
        recorded_by: &MemberId,
    ) -> Result<BussingRow, GraphError> {
        let now = Utc::now().to_rfc3339();
        let batch = RecordId::new().to_string();

        let mut queries = vec![query(
            "MATCH (bussing:BussingRecord {id: $bussing_id})
             SET bussing._lock = true REMOVE bussing._lock
             WITH bussing
             WHERE bussing.vehicleBatch IS NULL
               AND NOT (bussing)-[:INCLUDES_RECORD]->()
             SET bussing.vehicleBatch = $batch",
        )
        .param("bussing_id", bussing_id.to_string())
        .param("batch", batch.clone())];

        queries.extend(vehicles.iter().map(|v| {
            query(
                "MATCH (bussing:BussingRecord {id: $bussing_id, vehicleBatch: $batch})
                 MATCH (by:Member {id: $recorded_by})
                 CREATE (v:VehicleRecord {
                   id: $id, createdAt: $now, vehicle: $vehicle,
                   leaderDeclaration: $declaration, vehicleCost: $cost,
                   outbound: $outbound, picture: $picture
                 })
                 MERGE (bussing)-[:INCLUDES_RECORD]->(v)
                 MERGE (v)-[:RECORDED_BY]->(by)",
            )
            .param("bussing_id", bussing_id.to_string())
            .param("batch", batch.clone())
            .param("recorded_by", recorded_by.to_string())
            .param("id", RecordId::new().to_string())
            .param("now", now.clone())
            .param("vehicle", v.vehicle.as_str())
            .param("declaration", v.attendance as i64)
            .param("cost", v.cost.pesewas())
            .param("outbound", v.outbound)
            .param("picture", v.picture.clone())
        }));

        self.run_in_txn(queries).await?;

        let q = query(
            "MATCH (bussing:BussingRecord {id: $id})
             RETURN coalesce(bussing.vehicleBatch = $batch, false) AS claimed",
        )
        .param("id", bussing_id.to_string())
        .param("batch", batch);
        let claimed: bool = match self.query_one(q).await? {
            Some(row) => col(&row, "claimed")?,
            None => return Err(GraphError::not_found("BussingRecord", bussing_id)),
        };
        if !claimed {
            return Err(GraphError::Conflict(
                "Vehicles have already been recorded for this bussing".into(),
            ));
        }

        tracing::info!(bussing = %bussing_id, vehicles = vehicles.len(), "Vehicles recorded");
        self.get_bussing_record(bussing_id).await
    }

    pub async fn get_vehicle(&self, vehicle_id: &RecordId) -> Result<VehicleRow, GraphError> {
        let cypher = format!("MATCH (v:VehicleRecord {{id: $id}}) WITH v {VEHICLE_PROJECTION}");
        let q = query(&cypher).param("id", vehicle_id.to_string());

        match self.query_one(q).await? {
            Some(row) => vehicle_from_row(&row),
            None => Err(GraphError::not_found("VehicleRecord", vehicle_id)),
        }
    }

    /// An arrivals counter confirms the vehicle arrived with `attendance` people.
    pub async fn confirm_vehicle(
        &self,
        vehicle_id: &RecordId,
        attendance: u32,
        top_up: Amount,
        counter_id: &MemberId,
    ) -> Result<VehicleRow, GraphError> {
        let q = query(
            "MATCH (v:VehicleRecord {id: $id})
             MATCH (counter:Member {id: $counter_id})
             SET v._lock = true REMOVE v._lock
             WITH v, counter
             WHERE v.arrivalTime IS NULL
             SET v.attendance = $attendance, v.vehicleTopUp = $top_up,
                 v.arrivalTime = $now
             MERGE (v)-[:COUNTED_BY]->(counter)
             RETURN v.id AS id",
        )
        .param("id", vehicle_id.to_string())
        .param("counter_id", counter_id.to_string())
        .param("attendance", attendance as i64)
        .param("top_up", top_up.pesewas())
        .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(GraphError::Conflict(
                "This vehicle has already been confirmed".into(),
            ));
        }
        tracing::info!(vehicle = %vehicle_id, attendance, top_up = %top_up, "Vehicle confirmed");
        self.get_vehicle(vehicle_id).await
    }

    /// Record the start of a vehicle support transfer.
    pub async fn set_vehicle_payment_pending(
        &self,
        vehicle_id: &RecordId,
        reference: &str,
        paid_by: &MemberId,
    ) -> Result<VehicleRow, GraphError> {
        let q = query(
            "MATCH (v:VehicleRecord {id: $id})
             MATCH (payer:Member {id: $paid_by})
             SET v._lock = true REMOVE v._lock
             WITH v, payer
             WHERE v.arrivalTime IS NOT NULL
               AND NOT coalesce(v.transactionStatus, '') IN ['pending', 'success']
             SET v.transactionReference = $reference, v.transactionStatus = 'pending',
                 v.transactionTime = $now
             MERGE (v)-[:PAID_BY]->(payer)
             RETURN v.id AS id",
        )
        .param("id", vehicle_id.to_string())
        .param("paid_by", paid_by.to_string())
        .param("reference", reference.to_string())
        .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(GraphError::Conflict(
                "Money has already been sent to this bacenta".into(),
            ));
        }
        self.get_vehicle(vehicle_id).await
    }

    pub async fn set_vehicle_payment_status(
        &self,
        vehicle_id: &RecordId,
        status: TransactionStatus,
    ) -> Result<VehicleRow, GraphError> {
        let q = query(
            "MATCH (v:VehicleRecord {id: $id})
             SET v._lock = true REMOVE v._lock
             WITH v
             WHERE v.transactionStatus = $pending
             SET v.transactionStatus = $status
             RETURN v.id AS id",
        )
        .param("id", vehicle_id.to_string())
        .param("pending", TransactionStatus::Pending.as_str())
        .param("status", status.as_str());

        if self.query_one(q).await?.is_none() {
            let vehicle = self.get_vehicle(vehicle_id).await?;
            return Err(GraphError::Conflict(format!(
                "This transfer has already been settled as {}",
                vehicle.transaction_status.map_or("unpaid", |s| s.as_str())
            )));
        }
        tracing::info!(vehicle = %vehicle_id, status = %status, "Vehicle payment status updated");
        self.get_vehicle(vehicle_id).await
    }

    /// Set a bacenta's top-up rates and the mobile money account support is sent to.
    pub async fn set_bacenta_bussing_details(
        &self,
        bacenta_id: &ChurchId,
        rates: &TopUpRates,
        momo_number: &str,
        network: MobileNetwork,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH (b:Bacenta {id: $id})
             SET b.sprinterTopUp = $sprinter, b.urvanTopUp = $urvan, b.carTopUp = $car,
                 b.momoNumber = $momo_number, b.mobileNetwork = $network
             RETURN b.id AS id",
        )
        .param("id", bacenta_id.to_string())
        .param("sprinter", rates.sprinter.pesewas())
        .param("urvan", rates.urvan.pesewas())
        .param("car", rates.car.pesewas())
        .param("momo_number", momo_number.to_string())
        .param("network", network.provider_code());

        match self.query_one(q).await? {
            Some(_) => Ok(()),
            None => Err(GraphError::not_found("Bacenta", bacenta_id)),
        }
    }
}
