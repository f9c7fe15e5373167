//! Council weekday accounts.

use chrono::Utc;
use neo4rs::query;

use fl_core::accounts::{AccountStatus, TransactionCategory};
use fl_core::{Amount, ChurchId, MemberId, RecordId};

use crate::client::{GraphClient, GraphError};
use crate::records::{transaction_from_row, TransactionRecord, TRANSACTION_COLUMNS};

impl GraphClient {
    /// Credit a council's weekday balance and log the deposit.
    pub async fn deposit_into_council(
        &self,
        council_id: &ChurchId,
        amount: Amount,
        description: &str,
        deposited_by: &MemberId,
    ) -> Result<TransactionRecord, GraphError> {
        let transaction_id = RecordId::new();
        let q = query(
            "MATCH (c:Council {id: $council_id})
             MATCH (by:Member {id: $by})
             SET c._lock = true REMOVE c._lock
             WITH c, by
             SET c.weekdayBalance = coalesce(c.weekdayBalance, 0) + $amount
             CREATE (t:AccountTransaction {
               id: $id, category: $category, amount: $amount,
               description: $description, status: $status, createdAt: $now
             })
             MERGE (c)-[:HAS_TRANSACTION]->(t)
             MERGE (t)-[:LOGGED_BY]->(by)
             RETURN t.id AS id",
        )
        .param("council_id", council_id.to_string())
        .param("by", deposited_by.to_string())
        .param("id", transaction_id.to_string())
        .param("category", TransactionCategory::Deposit.as_str())
        .param("amount", amount.pesewas())
        .param("description", description.trim().to_string())
        .param("status", AccountStatus::Success.as_str())
        .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(GraphError::not_found("Council", council_id));
        }
        tracing::info!(council = %council_id, amount = %amount, "Deposit recorded");
        self.get_transaction(&transaction_id).await
    }

    /// Log an expense request awaiting approval. The balance is untouched.
    pub async fn request_expense(
        &self,
        council_id: &ChurchId,
        amount: Amount,
        description: &str,
        requested_by: &MemberId,
    ) -> Result<TransactionRecord, GraphError> {
        let transaction_id = RecordId::new();
        let q = query(
            "MATCH (c:Council {id: $council_id})
             MATCH (by:Member {id: $by})
             CREATE (t:AccountTransaction {
               id: $id, category: $category, amount: $amount,
               description: $description, status: $status, createdAt: $now
             })
             MERGE (c)-[:HAS_TRANSACTION]->(t)
             MERGE (t)-[:LOGGED_BY]->(by)
             RETURN t.id AS id",
        )
        .param("council_id", council_id.to_string())
        .param("by", requested_by.to_string())
        .param("id", transaction_id.to_string())
        .param("category", TransactionCategory::Expense.as_str())
        .param("amount", amount.pesewas())
        .param("description", description.trim().to_string())
        .param("status", AccountStatus::PendingApproval.as_str())
        .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(GraphError::not_found("Council", council_id));
        }
        tracing::info!(council = %council_id, amount = %amount, "Expense requested");
        self.get_transaction(&transaction_id).await
    }

    pub async fn get_transaction(
        &self,
        transaction_id: &RecordId,
    ) -> Result<TransactionRecord, GraphError> {
        let cypher = format!(
            "MATCH (c:Council)-[:HAS_TRANSACTION]->(t:AccountTransaction {{id: $id}})
             RETURN {TRANSACTION_COLUMNS}"
        );
        let q = query(&cypher).param("id", transaction_id.to_string());

        match self.query_one(q).await? {
            Some(row) => transaction_from_row(&row),
            None => Err(GraphError::not_found("AccountTransaction", transaction_id)),
        }
    }

    /// Approve a pending expense and debit the council.
    ///
    /// The council and the expense are write-locked before the balance is
    /// read, so concurrent approvals are checked one after the other.
    pub async fn approve_expense(
        &self,
        transaction_id: &RecordId,
        approved_by: &MemberId,
    ) -> Result<TransactionRecord, GraphError> {
        let q = query(
            "MATCH (c:Council)-[:HAS_TRANSACTION]->(t:AccountTransaction {id: $id})
             MATCH (by:Member {id: $by})
             SET c._lock = true, t._lock = true REMOVE c._lock, t._lock
             WITH c, t, by
             WHERE t.status = $pending AND coalesce(c.weekdayBalance, 0) >= t.amount
             SET c.weekdayBalance = coalesce(c.weekdayBalance, 0) - t.amount,
                 t.status = $success, t.approvedAt = $now
             MERGE (t)-[:APPROVED_BY]->(by)
             RETURN t.id AS id",
        )
        .param("id", transaction_id.to_string())
        .param("by", approved_by.to_string())
        .param("pending", AccountStatus::PendingApproval.as_str())
        .param("success", AccountStatus::Success.as_str())
        .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(GraphError::Conflict(
                "The expense is no longer pending or the council balance is too low".into(),
            ));
        }
        tracing::info!(transaction = %transaction_id, "Expense approved");
        self.get_transaction(transaction_id).await
    }

    pub async fn decline_expense(
        &self,
        transaction_id: &RecordId,
        declined_by: &MemberId,
    ) -> Result<TransactionRecord, GraphError> {
        let q = query(
            "MATCH (:Council)-[:HAS_TRANSACTION]->(t:AccountTransaction {id: $id})
             MATCH (by:Member {id: $by})
             WHERE t.status = $pending
             SET t.status = $declined, t.declinedAt = $now
             MERGE (t)-[:DECLINED_BY]->(by)
             RETURN t.id AS id",
        )
        .param("id", transaction_id.to_string())
        .param("by", declined_by.to_string())
        .param("pending", AccountStatus::PendingApproval.as_str())
        .param("declined", AccountStatus::Declined.as_str())
        .param("now", Utc::now().to_rfc3339());

        if self.query_one(q).await?.is_none() {
            return Err(GraphError::Conflict(
                "This transaction has already been processed".into(),
            ));
        }
        tracing::info!(transaction = %transaction_id, "Expense declined");
        self.get_transaction(transaction_id).await
    }
}
