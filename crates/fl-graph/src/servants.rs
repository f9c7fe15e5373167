//! Servant relationships between members and church units.

use neo4rs::{query, Query};

use fl_core::history::HistoryEvent;
use fl_core::{ChurchId, ChurchLevel, MemberId, RecordId, Role, ServantKind};

use crate::client::{GraphClient, GraphError};
use crate::history::{end_service_log_query, history_query, start_service_log_query, HistoryLinks};
use crate::records::{col, level_from_labels, member_from_row, MemberRecord, MEMBER_COLUMNS};

impl GraphClient {
    /// Members currently holding `role` over a unit.
    pub async fn current_servants(
        &self,
        role: Role,
        church_id: &ChurchId,
    ) -> Result<Vec<MemberRecord>, GraphError> {
        let rel = role.kind.relationship();
        let level = role.level;
        let cypher = format!(
            "MATCH (m:Member)-[:{rel}]->(:{level} {{id: $church_id}})
             RETURN {MEMBER_COLUMNS}"
        );
        let q = query(&cypher).param("church_id", church_id.to_string());

        let rows = self.query_rows(q).await?;
        rows.iter().map(member_from_row).collect()
    }

    /// Does the member hold `role` over the unit?
    pub async fn holds_role(
        &self,
        role: Role,
        member_id: &MemberId,
        church_id: &ChurchId,
    ) -> Result<bool, GraphError> {
        let rel = role.kind.relationship();
        let level = role.level;
        let cypher = format!(
            "MATCH (:Member {{id: $member_id}})-[r:{rel}]->(:{level} {{id: $church_id}})
             RETURN count(r) AS cnt"
        );
        let q = query(&cypher)
            .param("member_id", member_id.to_string())
            .param("church_id", church_id.to_string());

        Ok(self.query_count(q).await? > 0)
    }

    /// Every servant role a member holds, derived from their relationships.
    pub async fn servant_roles(&self, member_id: &MemberId) -> Result<Vec<Role>, GraphError> {
        let q = query(
            "MATCH (:Member {id: $id})-[r]->(c)
             WHERE type(r) IN $rels
             RETURN DISTINCT type(r) AS rel, labels(c) AS labels",
        )
        .param("id", member_id.to_string())
        .param("rels", servant_relationships());

        let rows = self.query_rows(q).await?;
        let mut roles = Vec::with_capacity(rows.len());
        for row in rows {
            let rel: String = col(&row, "rel")?;
            let labels: Vec<String> = col(&row, "labels")?;
            let kind = ServantKind::ALL
                .into_iter()
                .find(|k| k.relationship() == rel);
            if let (Some(kind), Some(level)) = (kind, level_from_labels(&labels)) {
                if let Ok(role) = Role::new(kind, level) {
                    if !roles.contains(&role) {
                        roles.push(role);
                    }
                }
            }
        }
        Ok(roles)
    }

    /// Number of servant relationships a member has over active units.
    pub async fn servant_role_count(&self, member_id: &MemberId) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (:Member {id: $id})-[r]->(c)
             WHERE type(r) IN $rels AND any(l IN labels(c) WHERE l IN $levels)
             RETURN count(r) AS cnt",
        )
        .param("id", member_id.to_string())
        .param("rels", servant_relationships())
        .param("levels", active_levels());

        self.query_count(q).await
    }

    /// Store the identity provider account id on a member.
    pub async fn set_auth_id(&self, member_id: &MemberId, auth_id: &str) -> Result<(), GraphError> {
        let q = query("MATCH (m:Member {id: $id}) SET m.auth_id = $auth_id")
            .param("id", member_id.to_string())
            .param("auth_id", auth_id.to_string());
        self.run(q).await
    }

    pub async fn clear_auth_id(&self, member_id: &MemberId) -> Result<(), GraphError> {
        let q = query("MATCH (m:Member {id: $id}) REMOVE m.auth_id")
            .param("id", member_id.to_string());
        self.run(q).await
    }

    /// Connect a servant, log the appointment and, for leaders, open a
    /// service log. Runs in one transaction.
    pub async fn appoint_servant(
        &self,
        role: Role,
        member_id: &MemberId,
        church_id: &ChurchId,
        event: &HistoryEvent,
        logged_by: &MemberId,
    ) -> Result<RecordId, GraphError> {
        let log_id = RecordId::new();
        let links = HistoryLinks {
            member: Some(*member_id),
            church: Some(*church_id),
            logged_by: Some(*logged_by),
        };

        let mut queries = vec![
            connect_query(role, member_id, church_id),
            history_query(&log_id, event, &links),
        ];
        if role.kind == ServantKind::Leader {
            queries.push(start_service_log_query(
                &RecordId::new(),
                role.level,
                church_id,
                member_id,
                &event.record(),
            ));
        }

        self.run_in_txn(queries).await?;
        tracing::info!(role = %role, member = %member_id, church = %church_id, "Servant appointed");
        Ok(log_id)
    }

    /// Disconnect a servant, log the removal and, for leaders, close the
    /// service log. Runs in one transaction.
    pub async fn dismiss_servant(
        &self,
        role: Role,
        member_id: &MemberId,
        church_id: &ChurchId,
        event: &HistoryEvent,
        logged_by: &MemberId,
    ) -> Result<RecordId, GraphError> {
        let log_id = RecordId::new();
        let links = HistoryLinks {
            member: Some(*member_id),
            church: Some(*church_id),
            logged_by: Some(*logged_by),
        };

        let mut queries = vec![
            disconnect_query(role, member_id, church_id),
            history_query(&log_id, event, &links),
        ];
        if role.kind == ServantKind::Leader {
            queries.push(end_service_log_query(role.level, church_id));
        }

        self.run_in_txn(queries).await?;
        tracing::info!(role = %role, member = %member_id, church = %church_id, "Servant removed");
        Ok(log_id)
    }
}

fn connect_query(role: Role, member_id: &MemberId, church_id: &ChurchId) -> Query {
    let rel = role.kind.relationship();
    let level: ChurchLevel = role.level;
    let cypher = format!(
        "MATCH (m:Member {{id: $member_id}})
         MATCH (c:{level} {{id: $church_id}})
         MERGE (m)-[:{rel}]->(c)"
    );
    query(&cypher)
        .param("member_id", member_id.to_string())
        .param("church_id", church_id.to_string())
}

fn disconnect_query(role: Role, member_id: &MemberId, church_id: &ChurchId) -> Query {
    let rel = role.kind.relationship();
    let level = role.level;
    let cypher = format!(
        "MATCH (:Member {{id: $member_id}})-[r:{rel}]->(:{level} {{id: $church_id}})
         DELETE r"
    );
    query(&cypher)
        .param("member_id", member_id.to_string())
        .param("church_id", church_id.to_string())
}

fn active_levels() -> Vec<String> {
    ChurchLevel::ALL
        .into_iter()
        .map(|l| l.label().to_string())
        .collect()
}

pub(crate) fn servant_relationships() -> Vec<String> {
    ServantKind::ALL
        .into_iter()
        .map(|k| k.relationship().to_string())
        .collect()
}
