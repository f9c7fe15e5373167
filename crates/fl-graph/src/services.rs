//! Service records.
//!
//! A service record hangs off the unit's current service log:
//! `(unit)-[:CURRENT_HISTORY]->(:ServiceLog)-[:HAS_SERVICE]->(:ServiceRecord)`.

use chrono::{NaiveDate, Utc};
use neo4rs::query;

use fl_core::services::{service_week, ServiceForm};
use fl_core::{ChurchId, ChurchLevel, MemberId, RecordId};

use crate::client::{GraphClient, GraphError};
use crate::records::{opt_parsed, service_from_row, ServiceRecordRow};

/// Match clause and projection matching [`service_from_row`]. Expects the
/// record bound to `r`.
pub(crate) const SERVICE_PROJECTION: &str = "
    MATCH (c)-[:HAS_HISTORY]->(:ServiceLog)-[:HAS_SERVICE]->(r)
    WHERE NOT c:Member
    WITH r, c LIMIT 1
    OPTIONAL MATCH (teller:Member)-[:CONFIRMED_BANKING_FOR]->(r)
    RETURN r.id AS id, labels(c) AS churchLabels, c.id AS churchId,
           c.name AS churchName, r.serviceDate AS serviceDate,
           r.attendance AS attendance, r.income AS income,
           r.numberOfTithers AS numberOfTithers,
           r.noServiceReason AS noServiceReason, r.bankingSlip AS bankingSlip,
           teller.firstName + ' ' + teller.lastName AS bankingConfirmedBy,
           r.transactionStatus AS transactionStatus,
           r.transactionReference AS transactionReference";

impl GraphClient {
    /// The record already filed for the unit in the ISO week of `date`.
    pub async fn service_in_week(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
        date: NaiveDate,
    ) -> Result<Option<RecordId>, GraphError> {
        let (year, week) = service_week(date);
        let cypher = format!(
            "MATCH (:{level} {{id: $id}})-[:HAS_HISTORY]->(:ServiceLog)-[:HAS_SERVICE]->(r:ServiceRecord)
             WHERE r.year = $year AND r.week = $week
             RETURN r.id AS id
             LIMIT 1"
        );
        let q = query(&cypher)
            .param("id", church_id.to_string())
            .param("year", year as i64)
            .param("week", week as i64);

        Ok(self
            .query_one(q)
            .await?
            .and_then(|row| opt_parsed::<RecordId>(&row, "id")))
    }

    /// File a service form against the unit's current service log.
    pub async fn record_service(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
        form: &ServiceForm,
        recorded_by: &MemberId,
    ) -> Result<ServiceRecordRow, GraphError> {
        self.require_service_log(church_id).await?;

        let record_id = RecordId::new();
        let (year, week) = service_week(form.service_date);
        let cypher = format!(
            "MATCH (c:{level} {{id: $church_id}})-[:CURRENT_HISTORY]->(log:ServiceLog)
             MATCH (by:Member {{id: $recorded_by}})
             CREATE (r:ServiceRecord {{
               id: $id, createdAt: $now, serviceDate: $service_date,
               year: $year, week: $week, attendance: $attendance, income: $income,
               foreignCurrency: $foreign_currency, numberOfTithers: $tithers,
               treasurerSelfie: $selfie, familyPicture: $family_picture
             }})
             MERGE (log)-[:HAS_SERVICE]->(r)
             MERGE (date:TimeGraph {{date: $service_date}})
             MERGE (r)-[:SERVICE_HELD_ON]->(date)
             MERGE (r)-[:RECORDED_BY]->(by)"
        );
        let create = query(&cypher)
            .param("church_id", church_id.to_string())
            .param("recorded_by", recorded_by.to_string())
            .param("id", record_id.to_string())
            .param("now", Utc::now().to_rfc3339())
            .param("service_date", form.service_date.to_string())
            .param("year", year as i64)
            .param("week", week as i64)
            .param("attendance", form.attendance)
            .param("income", form.income.pesewas())
            .param(
                "foreign_currency",
                form.foreign_currency.clone().unwrap_or_default(),
            )
            .param("tithers", form.number_of_tithers)
            .param("selfie", form.treasurer_selfie.clone())
            .param("family_picture", form.family_picture.clone());

        let treasurers = query(
            "MATCH (r:ServiceRecord {id: $id})
             UNWIND $treasurers AS tid
             MATCH (t:Member {id: tid})
             MERGE (t)-[:WAS_TREASURER_FOR]->(r)",
        )
        .param("id", record_id.to_string())
        .param(
            "treasurers",
            form.treasurers.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        );

        self.run_in_txn(vec![create, treasurers]).await?;
        tracing::info!(church = %church_id, record = %record_id, "Service recorded");
        self.get_service_record(&record_id).await
    }

    /// File a "no service" record with the reason it was cancelled.
    pub async fn record_cancelled_service(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
        service_date: NaiveDate,
        reason: &str,
        recorded_by: &MemberId,
    ) -> Result<ServiceRecordRow, GraphError> {
        self.require_service_log(church_id).await?;

        let record_id = RecordId::new();
        let (year, week) = service_week(service_date);
        let cypher = format!(
            "MATCH (c:{level} {{id: $church_id}})-[:CURRENT_HISTORY]->(log:ServiceLog)
             MATCH (by:Member {{id: $recorded_by}})
             CREATE (r:ServiceRecord:NoService {{
               id: $id, createdAt: $now, serviceDate: $service_date,
               year: $year, week: $week, noServiceReason: $reason
             }})
             MERGE (log)-[:HAS_SERVICE]->(r)
             MERGE (date:TimeGraph {{date: $service_date}})
             MERGE (r)-[:SERVICE_HELD_ON]->(date)
             MERGE (r)-[:RECORDED_BY]->(by)"
        );
        let q = query(&cypher)
            .param("church_id", church_id.to_string())
            .param("recorded_by", recorded_by.to_string())
            .param("id", record_id.to_string())
            .param("now", Utc::now().to_rfc3339())
            .param("service_date", service_date.to_string())
            .param("year", year as i64)
            .param("week", week as i64)
            .param("reason", reason.trim().to_string());

        self.run(q).await?;
        tracing::info!(church = %church_id, record = %record_id, "Cancelled service recorded");
        self.get_service_record(&record_id).await
    }

    pub async fn get_service_record(
        &self,
        record_id: &RecordId,
    ) -> Result<ServiceRecordRow, GraphError> {
        let cypher = format!("MATCH (r:ServiceRecord {{id: $id}}) WITH r {SERVICE_PROJECTION}");
        let q = query(&cypher).param("id", record_id.to_string());

        match self.query_one(q).await? {
            Some(row) => service_from_row(&row),
            None => Err(GraphError::not_found("ServiceRecord", record_id)),
        }
    }

    async fn require_service_log(&self, church_id: &ChurchId) -> Result<RecordId, GraphError> {
        self.current_service_log(church_id).await?.ok_or_else(|| {
            GraphError::Conflict(
                "This church has no leader yet, so it has no service history to record against"
                    .into(),
            )
        })
    }
}
