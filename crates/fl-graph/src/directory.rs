//! Member directory and church unit structure.

use chrono::Utc;
use neo4rs::query;

use fl_core::churches::ensure_can_close;
use fl_core::members::MemberDetails;
use fl_core::{ChurchId, ChurchLevel, MemberId};

use crate::client::{GraphClient, GraphError};
use crate::records::{
    col, level_from_labels, member_from_row, opt_col, parsed, ChurchRecord, ChurchRef,
    MemberRecord, CHURCH_LABEL, MEMBER_COLUMNS,
};
use crate::servants::servant_relationships;

impl GraphClient {
    // ── Members ──────────────────────────────────────────────────

    /// Register a member in a fellowship.
    pub async fn create_member(
        &self,
        details: &MemberDetails,
        fellowship_id: &ChurchId,
    ) -> Result<MemberRecord, GraphError> {
        let member_id = MemberId::new();
        let q = query(
            "MATCH (f:Fellowship {id: $fellowship_id})
             WHERE NOT EXISTS { MATCH (:Member {email: $email}) }
             CREATE (m:Member {
               id: $id, firstName: $first_name, middleName: $middle_name,
               lastName: $last_name, email: $email, phoneNumber: $phone_number,
               whatsappNumber: $whatsapp_number, gender: $gender,
               maritalStatus: $marital_status, dob: $dob, occupation: $occupation,
               pictureUrl: $picture_url, createdAt: $now
             })
             MERGE (m)-[:BELONGS_TO]->(f)
             RETURN m.id AS id",
        )
        .param("fellowship_id", fellowship_id.to_string())
        .param("id", member_id.to_string());
        let q = member_params(q, details).param("now", Utc::now().to_rfc3339());

        let created = self
            .query_one(q)
            .await
            .map_err(|e| e.on_constraint(&email_taken(&details.email)))?;
        match created {
            Some(_) => self.get_member(&member_id).await,
            None if self.email_in_use(&details.email, None).await? => {
                Err(GraphError::Conflict(email_taken(&details.email)))
            }
            None => Err(GraphError::not_found("Fellowship", fellowship_id)),
        }
    }

    /// Overwrite a member's personal details.
    pub async fn update_member(
        &self,
        member_id: &MemberId,
        details: &MemberDetails,
    ) -> Result<MemberRecord, GraphError> {
        let q = query(
            "MATCH (m:Member {id: $id})
             WHERE NOT EXISTS { MATCH (other:Member {email: $email}) WHERE other.id <> $id }
             SET m.firstName = $first_name, m.middleName = $middle_name,
                 m.lastName = $last_name, m.email = $email,
                 m.phoneNumber = $phone_number, m.whatsappNumber = $whatsapp_number,
                 m.gender = $gender, m.maritalStatus = $marital_status,
                 m.dob = $dob, m.occupation = $occupation,
                 m.pictureUrl = $picture_url, m.updatedAt = $now
             RETURN m.id AS id",
        )
        .param("id", member_id.to_string());
        let q = member_params(q, details).param("now", Utc::now().to_rfc3339());

        let updated = self
            .query_one(q)
            .await
            .map_err(|e| e.on_constraint(&email_taken(&details.email)))?;
        match updated {
            Some(_) => self.get_member(member_id).await,
            None if self.email_in_use(&details.email, Some(member_id)).await? => {
                Err(GraphError::Conflict(email_taken(&details.email)))
            }
            None => Err(GraphError::not_found("Member", member_id)),
        }
    }

    /// Is `email` held by a member other than `except`?
    pub async fn email_in_use(
        &self,
        email: &str,
        except: Option<&MemberId>,
    ) -> Result<bool, GraphError> {
        let q = query(
            "MATCH (m:Member {email: $email})
             WHERE m.id <> $except
             RETURN count(m) AS cnt",
        )
        .param("email", email.to_lowercase())
        .param("except", except.map(ToString::to_string).unwrap_or_default());

        Ok(self.query_count(q).await? > 0)
    }

    /// Move a member to another fellowship. Returns the old and new fellowship names.
    pub async fn move_member(
        &self,
        member_id: &MemberId,
        fellowship_id: &ChurchId,
    ) -> Result<(String, String), GraphError> {
        let q = query(
            "MATCH (m:Member {id: $member_id})
             MATCH (new:Fellowship {id: $fellowship_id})
             OPTIONAL MATCH (m)-[r:BELONGS_TO]->(old)
             DELETE r
             MERGE (m)-[:BELONGS_TO]->(new)
             RETURN coalesce(old.name, '') AS fromName, new.name AS toName",
        )
        .param("member_id", member_id.to_string())
        .param("fellowship_id", fellowship_id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok((col(&row, "fromName")?, col(&row, "toName")?)),
            None => Err(GraphError::not_found("Member or Fellowship", member_id)),
        }
    }

    pub async fn get_member(&self, member_id: &MemberId) -> Result<MemberRecord, GraphError> {
        let cypher = format!(
            "MATCH (m:Member {{id: $id}})
             OPTIONAL MATCH (m)-[:BELONGS_TO]->(f:Fellowship)
             RETURN {MEMBER_COLUMNS}, f.id AS fellowshipId, f.name AS fellowshipName
             LIMIT 1"
        );
        let q = query(&cypher).param("id", member_id.to_string());

        match self.query_one(q).await? {
            Some(row) => member_from_row(&row),
            None => Err(GraphError::not_found("Member", member_id)),
        }
    }

    pub async fn find_member_by_email(
        &self,
        email: &str,
    ) -> Result<Option<MemberRecord>, GraphError> {
        let cypher = format!(
            "MATCH (m:Member {{email: $email}})
             RETURN {MEMBER_COLUMNS}
             LIMIT 1"
        );
        let q = query(&cypher).param("email", email.to_lowercase());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(member_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_member_by_auth_id(
        &self,
        auth_id: &str,
    ) -> Result<Option<MemberRecord>, GraphError> {
        let cypher = format!(
            "MATCH (m:Member {{auth_id: $auth_id}})
             OPTIONAL MATCH (m)-[:BELONGS_TO]->(f:Fellowship)
             RETURN {MEMBER_COLUMNS}, f.id AS fellowshipId, f.name AS fellowshipName
             LIMIT 1"
        );
        let q = query(&cypher).param("auth_id", auth_id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(member_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive search on name and email.
    pub async fn search_members(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<MemberRecord>, GraphError> {
        let cypher = format!(
            "MATCH (m:Member)
             WHERE toLower(m.firstName + ' ' + m.lastName) CONTAINS $term
                OR m.email CONTAINS $term
             OPTIONAL MATCH (m)-[:BELONGS_TO]->(f:Fellowship)
             RETURN {MEMBER_COLUMNS}, f.id AS fellowshipId, f.name AS fellowshipName
             ORDER BY m.firstName, m.lastName
             LIMIT $limit"
        );
        let q = query(&cypher)
            .param("term", term.trim().to_lowercase())
            .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        rows.iter().map(member_from_row).collect()
    }

    // ── Church Units ─────────────────────────────────────────────

    /// Create a unit under its parent. Returns the new unit and the parent's name.
    pub async fn create_church(
        &self,
        level: ChurchLevel,
        name: &str,
        parent_id: &ChurchId,
    ) -> Result<(ChurchRef, String), GraphError> {
        let parent = level.parent().ok_or_else(|| {
            GraphError::Conflict(format!("A {level} cannot be created under another unit"))
        })?;
        let church_id = ChurchId::new();
        let cypher = format!(
            "MATCH (p:{parent} {{id: $parent_id}})
             CREATE (c:{level}:{CHURCH_LABEL} {{id: $id, name: $name, createdAt: $now}})
             MERGE (p)-[:HAS]->(c)
             RETURN p.name AS parentName"
        );
        let q = query(&cypher)
            .param("parent_id", parent_id.to_string())
            .param("id", church_id.to_string())
            .param("name", name.trim().to_string())
            .param("now", Utc::now().to_rfc3339());

        match self.query_one(q).await? {
            Some(row) => Ok((
                ChurchRef {
                    id: church_id,
                    name: name.trim().to_string(),
                    level,
                },
                col(&row, "parentName")?,
            )),
            None => Err(GraphError::not_found(parent.label(), parent_id)),
        }
    }

    /// Resolve any church unit by id, whatever its level.
    pub async fn church_ref(&self, church_id: &ChurchId) -> Result<ChurchRef, GraphError> {
        let cypher = format!(
            "MATCH (c:{CHURCH_LABEL} {{id: $id}})
             RETURN c.name AS name, labels(c) AS labels
             LIMIT 1"
        );
        let q = query(&cypher).param("id", church_id.to_string());

        let row = self
            .query_one(q)
            .await?
            .ok_or_else(|| GraphError::not_found("Church", church_id))?;
        let name: String = col(&row, "name")?;
        let labels: Vec<String> = col(&row, "labels")?;
        let level = level_from_labels(&labels)
            .ok_or_else(|| GraphError::Conflict(format!("{name} has been closed down")))?;

        Ok(ChurchRef {
            id: *church_id,
            name,
            level,
        })
    }

    /// Load a unit with its parent, leader, total membership and active children.
    pub async fn get_church(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
    ) -> Result<ChurchRecord, GraphError> {
        let children = match level.child() {
            Some(child) => format!("COUNT {{ (c)-[:HAS]->(:{child}) }}"),
            None => "0".to_string(),
        };
        let cypher = format!(
            "MATCH (c:{level} {{id: $id}})
             OPTIONAL MATCH (p)-[:HAS]->(c)
             OPTIONAL MATCH (m:Member)-[:LEADS]->(c)
             RETURN c.name AS name, p.id AS parentId, p.name AS parentName,
                    labels(p) AS parentLabels,
                    {MEMBER_COLUMNS},
                    COUNT {{ (c)-[:HAS*0..7]->(:Fellowship)<-[:BELONGS_TO]-(:Member) }} AS memberCount,
                    {children} AS activeChildren
             LIMIT 1"
        );
        let q = query(&cypher).param("id", church_id.to_string());

        let row = self
            .query_one(q)
            .await?
            .ok_or_else(|| GraphError::not_found(level.label(), church_id))?;

        let parent = match (
            opt_col::<String>(&row, "parentId").and_then(|s| s.parse::<ChurchId>().ok()),
            opt_col::<String>(&row, "parentName"),
            opt_col::<Vec<String>>(&row, "parentLabels")
                .and_then(|labels| level_from_labels(&labels)),
        ) {
            (Some(id), Some(name), Some(level)) => Some(ChurchRef { id, name, level }),
            _ => None,
        };
        let leader = match opt_col::<String>(&row, "id") {
            Some(_) => Some(member_from_row(&row)?),
            None => None,
        };

        Ok(ChurchRecord {
            church: ChurchRef {
                id: *church_id,
                name: col(&row, "name")?,
                level,
            },
            parent,
            leader,
            member_count: opt_col(&row, "memberCount").unwrap_or(0),
            active_children: opt_col(&row, "activeChildren").unwrap_or(0),
        })
    }

    /// Active units directly under a unit.
    pub async fn list_children(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
    ) -> Result<Vec<ChurchRef>, GraphError> {
        let Some(child) = level.child() else {
            return Ok(Vec::new());
        };
        let cypher = format!(
            "MATCH (:{level} {{id: $id}})-[:HAS]->(c:{child})
             RETURN c.id AS id, c.name AS name
             ORDER BY c.name"
        );
        let q = query(&cypher).param("id", church_id.to_string());

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(ChurchRef {
                    id: parsed(row, "id")?,
                    name: col(row, "name")?,
                    level: child,
                })
            })
            .collect()
    }

    /// Check a unit may be closed: no members, no active children.
    pub async fn ensure_church_can_close(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
    ) -> Result<ChurchRecord, GraphError> {
        let record = self.get_church(level, church_id).await?;
        ensure_can_close(level, record.member_count, record.active_children)
            .map_err(|e| GraphError::Conflict(e.to_string()))?;
        Ok(record)
    }

    /// Relabel a unit as closed. Refused while any servant is still attached.
    pub async fn close_down_church(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
    ) -> Result<(), GraphError> {
        self.ensure_church_can_close(level, church_id).await?;

        let closed = level.closed_label();
        let cypher = format!(
            "MATCH (c:{level} {{id: $id}})
             WHERE NOT EXISTS {{ MATCH (:Member)-[r]->(c) WHERE type(r) IN $rels }}
             REMOVE c:{level}
             SET c:{closed}, c.closedAt = $now
             RETURN c.id AS id"
        );
        let q = query(&cypher)
            .param("id", church_id.to_string())
            .param("rels", servant_relationships())
            .param("now", Utc::now().to_rfc3339());

        match self.query_one(q).await? {
            Some(_) => Ok(()),
            None => Err(GraphError::Conflict(format!(
                "Remove the servants of this {level} before closing it down"
            ))),
        }
    }

    /// Move a unit under a new parent. Returns the old and new parent names.
    pub async fn move_church(
        &self,
        level: ChurchLevel,
        church_id: &ChurchId,
        new_parent_id: &ChurchId,
    ) -> Result<(String, String), GraphError> {
        let parent = level.parent().ok_or_else(|| {
            GraphError::Conflict(format!("A {level} has no parent to move to"))
        })?;
        let cypher = format!(
            "MATCH (c:{level} {{id: $id}})
             MATCH (np:{parent} {{id: $parent_id}})
             OPTIONAL MATCH (op:{parent})-[r:HAS]->(c)
             DELETE r
             MERGE (np)-[:HAS]->(c)
             RETURN coalesce(op.name, '') AS fromName, np.name AS toName"
        );
        let q = query(&cypher)
            .param("id", church_id.to_string())
            .param("parent_id", new_parent_id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok((col(&row, "fromName")?, col(&row, "toName")?)),
            None => Err(GraphError::not_found(level.label(), church_id)),
        }
    }
}

fn email_taken(email: &str) -> String {
    format!("A member with the email {email} already exists")
}

fn member_params(q: neo4rs::Query, d: &MemberDetails) -> neo4rs::Query {
    q.param("first_name", d.first_name.clone())
        .param("middle_name", d.middle_name.clone().unwrap_or_default())
        .param("last_name", d.last_name.clone())
        .param("email", d.email.clone())
        .param("phone_number", d.phone_number.clone())
        .param("whatsapp_number", d.whatsapp_number.clone())
        .param("gender", d.gender.as_str())
        .param("marital_status", d.marital_status.as_str())
        .param("dob", d.date_of_birth.to_string())
        .param("occupation", d.occupation.clone().unwrap_or_default())
        .param("picture_url", d.picture_url.clone())
}
