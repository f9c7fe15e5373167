//! Offering banking on service records.
//!
//! Each write locks the record, then repeats the "not yet banked" rule in its
//! `WHERE` clause so two concurrent attempts cannot both succeed.

use chrono::Utc;
use neo4rs::query;

use fl_core::banking::{MobileNetwork, TransactionStatus};
use fl_core::{Amount, MemberId, RecordId};

use crate::client::{GraphClient, GraphError};
use crate::records::{opt_col, service_from_row, ServiceRecordRow};
use crate::services::SERVICE_PROJECTION;

const NOT_BANKED: &str = "NOT r:NoService
    AND r.bankingSlip IS NULL
    AND NOT EXISTS { (:Member)-[:CONFIRMED_BANKING_FOR]->(r) }
    AND coalesce(r.transactionStatus, '') <> 'success'";

impl GraphClient {
    /// Attach an uploaded bank slip to a service record.
    pub async fn submit_banking_slip(
        &self,
        record_id: &RecordId,
        slip_url: &str,
        uploaded_by: &MemberId,
    ) -> Result<ServiceRecordRow, GraphError> {
        let cypher = format!(
            "MATCH (r:ServiceRecord {{id: $id}})
             MATCH (m:Member {{id: $member_id}})
             SET r._lock = true REMOVE r._lock
             WITH r, m
             WHERE {NOT_BANKED}
               AND coalesce(r.transactionStatus, '') <> 'pending'
             SET r.bankingSlip = $slip, r.bankingSlipUploadedAt = $now
             MERGE (r)-[:BANKING_SLIP_UPLOADED_BY]->(m)
             RETURN r.id AS id"
        );
        let q = query(&cypher)
            .param("id", record_id.to_string())
            .param("member_id", uploaded_by.to_string())
            .param("slip", slip_url.to_string())
            .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(self.banking_refused(record_id, uploaded_by).await);
        }
        tracing::info!(record = %record_id, "Banking slip submitted");
        self.get_service_record(record_id).await
    }

    /// A stream teller confirms receiving the offering in cash.
    pub async fn confirm_banking(
        &self,
        record_id: &RecordId,
        teller_id: &MemberId,
    ) -> Result<ServiceRecordRow, GraphError> {
        let cypher = format!(
            "MATCH (r:ServiceRecord {{id: $id}})
             MATCH (teller:Member {{id: $teller_id}})
             SET r._lock = true REMOVE r._lock
             WITH r, teller
             WHERE {NOT_BANKED}
             MERGE (teller)-[:CONFIRMED_BANKING_FOR]->(r)
             SET r.bankingConfirmedAt = $now
             RETURN r.id AS id"
        );
        let q = query(&cypher)
            .param("id", record_id.to_string())
            .param("teller_id", teller_id.to_string())
            .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(self.banking_refused(record_id, teller_id).await);
        }
        tracing::info!(record = %record_id, teller = %teller_id, "Banking confirmed");
        self.get_service_record(record_id).await
    }

    /// Mark a self-banking charge as started with the gateway.
    pub async fn set_offering_payment_pending(
        &self,
        record_id: &RecordId,
        reference: &str,
        charge: Amount,
        network: MobileNetwork,
        momo_number: &str,
        paid_by: &MemberId,
    ) -> Result<ServiceRecordRow, GraphError> {
        let cypher = format!(
            "MATCH (r:ServiceRecord {{id: $id}})
             MATCH (m:Member {{id: $member_id}})
             SET r._lock = true REMOVE r._lock
             WITH r, m
             WHERE {NOT_BANKED}
               AND coalesce(r.transactionStatus, '') <> 'pending'
             SET r.transactionReference = $reference,
                 r.transactionStatus = 'pending',
                 r.transactionCharge = $charge,
                 r.mobileNetwork = $network,
                 r.momoNumber = $momo_number,
                 r.transactionTime = $now
             MERGE (r)-[:OFFERING_BANKED_BY]->(m)
             RETURN r.id AS id"
        );
        let q = query(&cypher)
            .param("id", record_id.to_string())
            .param("member_id", paid_by.to_string())
            .param("reference", reference.to_string())
            .param("charge", charge.pesewas())
            .param("network", network.provider_code())
            .param("momo_number", momo_number.to_string())
            .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(self.banking_refused(record_id, paid_by).await);
        }
        tracing::info!(record = %record_id, reference, "Self banking started");
        self.get_service_record(record_id).await
    }

    /// Store the gateway's verdict on a self-banking charge. Only a pending
    /// charge can be settled.
    pub async fn set_offering_payment_status(
        &self,
        reference: &str,
        status: TransactionStatus,
    ) -> Result<ServiceRecordRow, GraphError> {
        let q = query(
            "MATCH (r:ServiceRecord {transactionReference: $reference})
             SET r._lock = true REMOVE r._lock
             WITH r
             WHERE r.transactionStatus = $pending
             SET r.transactionStatus = $status
             RETURN r.id AS id",
        )
        .param("reference", reference.to_string())
        .param("pending", TransactionStatus::Pending.as_str())
        .param("status", status.as_str());

        let Some(row) = self.query_one(q).await? else {
            // Distinguish an unknown reference from a settled one.
            let existing = self.service_by_reference(reference).await?;
            return Err(GraphError::Conflict(format!(
                "This payment has already been settled as {}",
                existing
                    .transaction_status
                    .map(|s| s.as_str())
                    .unwrap_or("unknown")
            )));
        };
        let record_id: RecordId = crate::records::parsed(&row, "id")?;
        tracing::info!(record = %record_id, reference, status = %status, "Self banking status updated");
        self.get_service_record(&record_id).await
    }

    /// Look a service record up by its gateway reference.
    pub async fn service_by_reference(
        &self,
        reference: &str,
    ) -> Result<ServiceRecordRow, GraphError> {
        let cypher = format!(
            "MATCH (r:ServiceRecord {{transactionReference: $reference}}) WITH r {SERVICE_PROJECTION}"
        );
        let q = query(&cypher).param("reference", reference.to_string());

        match self.query_one(q).await? {
            Some(row) => service_from_row(&row),
            None => Err(GraphError::not_found("ServiceRecord", reference)),
        }
    }
}

impl GraphClient {
    /// Explain why a guarded banking write matched nothing.
    async fn banking_refused(&self, record_id: &RecordId, member_id: &MemberId) -> GraphError {
        let q = query(
            "OPTIONAL MATCH (r:ServiceRecord {id: $id})
             OPTIONAL MATCH (m:Member {id: $member_id})
             RETURN r IS NOT NULL AS hasRecord, m IS NOT NULL AS hasMember",
        )
        .param("id", record_id.to_string())
        .param("member_id", member_id.to_string());

        match self.query_one(q).await {
            Ok(Some(row)) => banking_refusal(
                opt_col(&row, "hasRecord").unwrap_or(false),
                opt_col(&row, "hasMember").unwrap_or(false),
                record_id,
                member_id,
            ),
            Ok(None) => banking_refusal(false, false, record_id, member_id),
            Err(e) => e,
        }
    }
}

fn banking_refusal(
    has_record: bool,
    has_member: bool,
    record_id: &RecordId,
    member_id: &MemberId,
) -> GraphError {
    match (has_record, has_member) {
        (false, _) => GraphError::not_found("ServiceRecord", record_id),
        (true, false) => GraphError::not_found("Member", member_id),
        (true, true) => GraphError::Conflict("Banking has already been done for this service".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banking_refusal_reasons() {
        let record = RecordId::new();
        let member = MemberId::new();

        assert!(matches!(
            banking_refusal(false, true, &record, &member),
            GraphError::NotFound { ref label, .. } if label == "ServiceRecord"
        ));
        assert!(matches!(
            banking_refusal(true, false, &record, &member),
            GraphError::NotFound { ref label, .. } if label == "Member"
        ));
        assert!(matches!(
            banking_refusal(true, true, &record, &member),
            GraphError::Conflict(_)
        ));
    }
}
