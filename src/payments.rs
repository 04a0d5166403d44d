//! Recording and listing a user's payments.

use std::sync::Arc;

use validator::Validate;

use crate::error::AppError;
use crate::models::{NewPayment, Payment, PaymentInput};
use crate::store::PaymentRepository;

/// Owner-scoped payment ledger.
#[derive(Clone)]
pub struct PaymentLedger {
    payments: Arc<dyn PaymentRepository>,
}

impl PaymentLedger {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    /// Every payment of `owner_id`, oldest first.
    pub async fn list(&self, owner_id: i32) -> Result<Vec<Payment>, AppError> {
        Ok(self.payments.list_payments(owner_id).await?)
    }

    pub async fn record(&self, owner_id: i32, input: PaymentInput) -> Result<Payment, AppError> {
        let input = PaymentInput {
            description: input
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            ..input
        };
        input.validate()?;
        let amount = input
            .amount
            .ok_or_else(|| AppError::invalid_input(vec!["Amount is required".to_string()]))?;

        let payment = self
            .payments
            .insert_payment(
                owner_id,
                &NewPayment {
                    amount,
                    description: input.description,
                },
            )
            .await?;
        log::info!("user {} recorded payment {}", owner_id, payment.id);
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Amount;
    use crate::store::MemoryStore;

    fn ledger() -> PaymentLedger {
        PaymentLedger::new(Arc::new(MemoryStore::new()))
    }

    fn input(cents: Option<i64>, description: Option<&str>) -> PaymentInput {
        PaymentInput {
            amount: cents.and_then(Amount::from_cents),
            description: description.map(str::to_string),
        }
    }

    #[actix_rt::test]
    async fn test_record_and_list() {
        let ledger = ledger();
        let rent = ledger.record(1, input(Some(120_000), Some("  Rent "))).await.unwrap();
        ledger.record(1, input(Some(-1_500), Some("   "))).await.unwrap();
        ledger.record(2, input(Some(999), None)).await.unwrap();

        assert_eq!(rent.description.as_deref(), Some("Rent"));
        assert_eq!(rent.owner_id, 1);

        let listed = ledger.list(1).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], rent);
        assert_eq!(listed[1].description, None);
    }

    #[actix_rt::test]
    async fn test_missing_amount_is_rejected() {
        let ledger = ledger();
        match ledger.record(1, input(None, Some("Rent"))).await {
            Err(AppError::ValidationFailed { errors, .. }) => {
                assert!(errors.iter().any(|e| e.contains("Amount is required")));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert!(ledger.list(1).await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_long_description_is_rejected() {
        let ledger = ledger();
        let long = "x".repeat(501);
        let result = ledger.record(1, input(Some(100), Some(&long))).await;
        assert!(matches!(result, Err(AppError::ValidationFailed { .. })));
    }
}
