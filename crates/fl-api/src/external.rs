//! External collaborators: identity provider, notifications and the mobile
//! money gateway.
//!
//! The server talks to them only through these traits. The implementations
//! here log what would be sent and are what `fl-admin serve` wires in until a
//! concrete provider is configured.

use async_trait::async_trait;
use uuid::Uuid;

use fl_core::banking::{MobileNetwork, TransactionStatus};
use fl_core::servants::ServantMessage;
use fl_core::{Amount, MemberId, Role};

/// An account to create with the identity provider.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub member_id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The account id registered for `email`, if any.
    async fn find_account(&self, email: &str) -> anyhow::Result<Option<String>>;
    /// Create an account and return its id.
    async fn create_account(&self, account: &NewAccount) -> anyhow::Result<String>;
    async fn send_password_reset(&self, email: &str) -> anyhow::Result<()>;
    async fn assign_role(&self, auth_id: &str, role: Role) -> anyhow::Result<()>;
    async fn remove_role(&self, auth_id: &str, role: Role) -> anyhow::Result<()>;
    async fn delete_account(&self, auth_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, message: &ServantMessage) -> anyhow::Result<()>;
    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Our reference for the charge, already stored on the claimed record.
    pub reference: String,
    pub amount: Amount,
    pub momo_number: String,
    pub network: MobileNetwork,
    pub email: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub amount: Amount,
    pub momo_number: String,
    pub network: MobileNetwork,
    pub recipient_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReceipt {
    pub reference: String,
    pub status: TransactionStatus,
}

/// Status to store on a claimed payment once the gateway has answered.
/// A gateway error settles the claim as failed so it can be retried.
pub fn settled_status(answer: &anyhow::Result<GatewayReceipt>) -> TransactionStatus {
    match answer {
        Ok(receipt) => receipt.status,
        Err(_) => TransactionStatus::Failed,
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a mobile money debit from the payer.
    async fn charge(&self, request: &ChargeRequest) -> anyhow::Result<GatewayReceipt>;
    /// Ask the gateway for the current status of a charge.
    async fn verify(&self, reference: &str) -> anyhow::Result<TransactionStatus>;
    /// Send money to a mobile money account.
    async fn transfer(&self, request: &TransferRequest) -> anyhow::Result<GatewayReceipt>;
}

// ── Logging implementations ──────────────────────────────────────

/// Derives account ids from the email address and records calls in the log.
#[derive(Debug, Default, Clone)]
pub struct LogIdentityProvider;

impl LogIdentityProvider {
    fn account_id(email: &str) -> String {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, email.to_lowercase().as_bytes());
        format!("fl|{}", id.simple())
    }
}

#[async_trait]
impl IdentityProvider for LogIdentityProvider {
    async fn find_account(&self, email: &str) -> anyhow::Result<Option<String>> {
        tracing::debug!(email, "Identity lookup");
        Ok(None)
    }

    async fn create_account(&self, account: &NewAccount) -> anyhow::Result<String> {
        let auth_id = Self::account_id(&account.email);
        tracing::info!(
            member = %account.member_id,
            email = %account.email,
            auth_id = %auth_id,
            "Identity account created"
        );
        Ok(auth_id)
    }

    async fn send_password_reset(&self, email: &str) -> anyhow::Result<()> {
        tracing::info!(email, "Password reset requested");
        Ok(())
    }

    async fn assign_role(&self, auth_id: &str, role: Role) -> anyhow::Result<()> {
        tracing::info!(auth_id, role = %role, "Identity role assigned");
        Ok(())
    }

    async fn remove_role(&self, auth_id: &str, role: Role) -> anyhow::Result<()> {
        tracing::info!(auth_id, role = %role, "Identity role removed");
        Ok(())
    }

    async fn delete_account(&self, auth_id: &str) -> anyhow::Result<()> {
        tracing::info!(auth_id, "Identity account deleted");
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(&self, to: &str, message: &ServantMessage) -> anyhow::Result<()> {
        tracing::info!(to, subject = %message.subject, "Email sent");
        Ok(())
    }

    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(to, chars = body.len(), "SMS sent");
        Ok(())
    }
}

/// Accepts every charge and transfer. Charges verify as successful.
#[derive(Debug, Default, Clone)]
pub struct SandboxGateway;

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn charge(&self, request: &ChargeRequest) -> anyhow::Result<GatewayReceipt> {
        tracing::info!(
            reference = %request.reference,
            amount = %request.amount,
            network = request.network.provider_code(),
            "Sandbox charge started"
        );
        Ok(GatewayReceipt {
            reference: request.reference.clone(),
            status: TransactionStatus::Pending,
        })
    }

    async fn verify(&self, reference: &str) -> anyhow::Result<TransactionStatus> {
        tracing::info!(reference, "Sandbox charge verified");
        Ok(TransactionStatus::Success)
    }

    async fn transfer(&self, request: &TransferRequest) -> anyhow::Result<GatewayReceipt> {
        let reference = Uuid::new_v4().to_string();
        tracing::info!(
            reference = %reference,
            amount = %request.amount,
            recipient = %request.recipient_name,
            "Sandbox transfer sent"
        );
        Ok(GatewayReceipt {
            reference,
            status: TransactionStatus::Success,
        })
    }
}
