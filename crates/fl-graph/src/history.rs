//! History logs and leader service logs.
//!
//! Every servant or structural change writes a `HistoryLog` linked to the
//! member, the church unit, the acting member and the day. Leaders also get
//! a `ServiceLog` which service records hang off; a unit has exactly one
//! `CURRENT_HISTORY` edge, pointing at its latest service log.

use chrono::Utc;
use neo4rs::{query, Query};

use fl_core::history::HistoryEvent;
use fl_core::{ChurchId, ChurchLevel, MemberId, RecordId};

use crate::client::{GraphClient, GraphError};
use crate::records::{history_from_row, opt_parsed, HistoryRecord, CHURCH_LABEL};

/// Nodes a history log is attached to.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryLinks {
    pub member: Option<MemberId>,
    pub church: Option<ChurchId>,
    pub logged_by: Option<MemberId>,
}

/// Build the statement that writes one history log.
pub(crate) fn history_query(log_id: &RecordId, event: &HistoryEvent, links: &HistoryLinks) -> Query {
    let now = Utc::now();
    let cypher = format!(
        "CREATE (log:HistoryLog {{id: $id, timeStamp: $now, historyRecord: $record}})
         MERGE (date:TimeGraph {{date: $today}})
         MERGE (log)-[:RECORDED_ON]->(date)
         WITH log
         OPTIONAL MATCH (m:Member {{id: $member_id}})
         FOREACH (x IN CASE WHEN m IS NULL THEN [] ELSE [m] END |
           MERGE (x)-[:HAS_HISTORY]->(log))
         WITH log
         OPTIONAL MATCH (c:{CHURCH_LABEL} {{id: $church_id}})
         FOREACH (x IN CASE WHEN c IS NULL THEN [] ELSE [c] END |
           MERGE (x)-[:HAS_HISTORY]->(log))
         WITH log
         OPTIONAL MATCH (a:Member {{id: $logged_by}})
         FOREACH (x IN CASE WHEN a IS NULL THEN [] ELSE [a] END |
           MERGE (log)-[:LOGGED_BY]->(x))"
    );
    query(&cypher)
        .param("id", log_id.to_string())
        .param("now", now.to_rfc3339())
        .param("today", now.date_naive().to_string())
        .param("record", event.record())
        .param("member_id", opt_id(links.member))
        .param("church_id", opt_id(links.church))
        .param("logged_by", opt_id(links.logged_by))
}

/// Build the statement that opens a leader's service log and moves the
/// unit's `CURRENT_HISTORY` edge onto it.
pub(crate) fn start_service_log_query(
    log_id: &RecordId,
    level: ChurchLevel,
    church_id: &ChurchId,
    leader_id: &MemberId,
    record: &str,
) -> Query {
    let now = Utc::now();
    let cypher = format!(
        "MATCH (c:{level} {{id: $church_id}})
         MATCH (l:Member {{id: $leader_id}})
         OPTIONAL MATCH (c)-[old:CURRENT_HISTORY]->(:ServiceLog)
         DELETE old
         WITH DISTINCT c, l
         CREATE (log:ServiceLog:HistoryLog {{
           id: $id, timeStamp: $now, startDate: $today, historyRecord: $record
         }})
         MERGE (c)-[:CURRENT_HISTORY]->(log)
         MERGE (c)-[:HAS_HISTORY]->(log)
         MERGE (l)-[:HAS_HISTORY]->(log)"
    );
    query(&cypher)
        .param("id", log_id.to_string())
        .param("church_id", church_id.to_string())
        .param("leader_id", leader_id.to_string())
        .param("now", now.to_rfc3339())
        .param("today", now.date_naive().to_string())
        .param("record", record.to_string())
}

/// Build the statement that closes the unit's current service log.
pub(crate) fn end_service_log_query(level: ChurchLevel, church_id: &ChurchId) -> Query {
    let cypher = format!(
        "MATCH (c:{level} {{id: $church_id}})-[:CURRENT_HISTORY]->(log:ServiceLog)
         SET log.endDate = $today"
    );
    query(&cypher)
        .param("church_id", church_id.to_string())
        .param("today", Utc::now().date_naive().to_string())
}

impl GraphClient {
    /// Write a standalone history log.
    pub async fn record_history(
        &self,
        event: &HistoryEvent,
        links: &HistoryLinks,
    ) -> Result<RecordId, GraphError> {
        let log_id = RecordId::new();
        self.run(history_query(&log_id, event, links)).await?;
        tracing::debug!(log_id = %log_id, record = %event.record(), "Recorded history");
        Ok(log_id)
    }

    /// The service log a unit's `CURRENT_HISTORY` edge points to.
    pub async fn current_service_log(
        &self,
        church_id: &ChurchId,
    ) -> Result<Option<RecordId>, GraphError> {
        let cypher = format!(
            "MATCH (:{CHURCH_LABEL} {{id: $id}})-[:CURRENT_HISTORY]->(log:ServiceLog)
             RETURN log.id AS id"
        );
        let q = query(&cypher).param("id", church_id.to_string());

        Ok(self
            .query_one(q)
            .await?
            .and_then(|row| opt_parsed::<RecordId>(&row, "id")))
    }

    /// History of a member or church unit, newest first.
    pub async fn list_history(
        &self,
        entity_id: &str,
        limit: u32,
    ) -> Result<Vec<HistoryRecord>, GraphError> {
        let cypher = format!(
            "CALL {{
               MATCH (e:Member {{id: $id}}) RETURN e
               UNION
               MATCH (e:{CHURCH_LABEL} {{id: $id}}) RETURN e
             }}
             MATCH (e)-[:HAS_HISTORY]->(log:HistoryLog)
             OPTIONAL MATCH (log)-[:LOGGED_BY]->(a:Member)
             RETURN log.id AS id, log.timeStamp AS timeStamp,
                    log.historyRecord AS historyRecord,
                    a.firstName + ' ' + a.lastName AS loggedBy
             ORDER BY log.timeStamp DESC
             LIMIT $limit"
        );
        let q = query(&cypher)
            .param("id", entity_id.to_string())
            .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        rows.iter().map(history_from_row).collect()
    }
}

fn opt_id<T: ToString>(id: Option<T>) -> String {
    id.map(|i| i.to_string()).unwrap_or_default()
}
