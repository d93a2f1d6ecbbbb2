use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Authorized,
    Declined,
    Failed,
}

/// A completed authorization attempt against the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub id: String, // Provider's ID (e.g., pi_123)
    pub match_id: Uuid,
    pub amount: i32,
    pub currency: String,
    pub status: PaymentStatus,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentAuthorization {
    pub fn is_authorized(&self) -> bool {
        self.status == PaymentStatus::Authorized
    }
}

/// The only contract consumed from the payment provider: authorize amount X
/// against method Y, returning success or a typed decline. Capture and payout
/// happen elsewhere and are not modeled here.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    async fn authorize(
        &self,
        match_id: Uuid,
        payment_method_id: &str,
        amount: i32,
        currency: &str,
    ) -> Result<PaymentAuthorization, Box<dyn std::error::Error + Send + Sync>>;
}

/// Payment method ids that trigger deterministic outcomes in the mock,
/// mirroring the provider's published test cards.
pub const MOCK_DECLINED_METHOD: &str = "pm_card_declined";
pub const MOCK_GATEWAY_FAILURE_METHOD: &str = "pm_gateway_failure";

pub struct MockPaymentAdapter;

#[async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn authorize(
        &self,
        match_id: Uuid,
        payment_method_id: &str,
        amount: i32,
        currency: &str,
    ) -> Result<PaymentAuthorization, Box<dyn std::error::Error + Send + Sync>> {
        if payment_method_id == MOCK_GATEWAY_FAILURE_METHOD {
            return Err("Simulated payment gateway failure".into());
        }

        let declined = payment_method_id == MOCK_DECLINED_METHOD;
        tracing::info!(
            %match_id,
            amount,
            declined,
            "Mock payment authorization processed"
        );

        Ok(PaymentAuthorization {
            // Encode match_id in the authorization id so the mock "remembers" it
            id: format!("mock_pi_{}", match_id.simple()),
            match_id,
            amount,
            currency: currency.to_string(),
            status: if declined {
                PaymentStatus::Declined
            } else {
                PaymentStatus::Authorized
            },
            decline_reason: declined.then(|| "card_declined".to_string()),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_authorize_success() {
        let adapter = MockPaymentAdapter;
        let match_id = Uuid::new_v4();
        let auth = adapter
            .authorize(match_id, "pm_card_visa", 227_00, "USD")
            .await
            .unwrap();

        assert!(auth.is_authorized());
        assert_eq!(auth.match_id, match_id);
        assert!(auth.decline_reason.is_none());
    }

    #[tokio::test]
    async fn test_mock_authorize_decline() {
        let adapter = MockPaymentAdapter;
        let auth = adapter
            .authorize(Uuid::new_v4(), MOCK_DECLINED_METHOD, 227_00, "USD")
            .await
            .unwrap();

        assert_eq!(auth.status, PaymentStatus::Declined);
        assert_eq!(auth.decline_reason.as_deref(), Some("card_declined"));
    }
}
