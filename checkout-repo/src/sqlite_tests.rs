//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use exchange_rates::Currency;

    use checkout_types::{
        ClientId, CurrencyAmounts, IntentId, Order, OrderId, OrderRepository, OrderStatus,
        PackageTier, PaymentAttempt, PaymentConfirmation, Receipt, RepoError, ServiceId,
        SettleOutcome,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn amounts() -> CurrencyAmounts {
        CurrencyAmounts::new(1000, 920, 83_125).unwrap()
    }

    fn pending_order() -> Order {
        Order::new(
            ClientId::new(),
            ServiceId::new(),
            PackageTier::Standard,
            1,
            amounts(),
            Currency::USD,
        )
        .unwrap()
    }

    fn confirmation(order: &Order) -> PaymentConfirmation {
        PaymentConfirmation {
            client_name: "Alice".into(),
            client_email: "alice@example.com".into(),
            service_name: "SSL Certificate Setup".into(),
            package: order.package,
            order_id: order.id,
            amount: order.total(),
            currency: order.currency,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_order() {
        let repo = setup_repo().await;
        let order = pending_order();

        repo.create_order(&order).await.unwrap();
        let fetched = repo.get_order(order.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, order.id);
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert_eq!(fetched.amounts, order.amounts);
        assert_eq!(fetched.total(), 1000);
        assert!(fetched.external_invoice_id.is_none());
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let repo = setup_repo().await;
        assert!(repo.get_order(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_constraint_rejects_zero_quantity() {
        let repo = setup_repo().await;
        let mut order = pending_order();
        // Bypass domain validation to exercise the persistence boundary.
        order.quantity = 0;

        let result = repo.create_order(&order).await;
        assert!(matches!(result, Err(RepoError::Validation(_))));
        assert!(repo.get_order(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_constraint_rejects_non_positive_amount() {
        let repo = setup_repo().await;
        let mut order = pending_order();
        order.amounts = CurrencyAmounts {
            usd: 1000,
            eur: 0,
            inr: 83_125,
        };

        let result = repo.create_order(&order).await;
        assert!(matches!(result, Err(RepoError::Validation(_))));
    }

    #[tokio::test]
    async fn test_link_and_find_by_external_invoice() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();

        repo.link_external_refs(order.id, "inv_42", "cust_7")
            .await
            .unwrap();

        let linked = repo.find_by_external_invoice("inv_42").await.unwrap().unwrap();
        assert_eq!(linked.id, order.id);
        assert_eq!(linked.external_customer_id.as_deref(), Some("cust_7"));
    }

    #[tokio::test]
    async fn test_link_unknown_order_is_not_found() {
        let repo = setup_repo().await;
        let result = repo
            .link_external_refs(OrderId::new(), "inv_1", "cust_1")
            .await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_settle_transitions_once() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();
        repo.link_external_refs(order.id, "inv_42", "cust_7")
            .await
            .unwrap();

        let first = repo.settle("inv_42", OrderStatus::Paid).await.unwrap();
        assert_eq!(first, SettleOutcome::Updated);

        // Repeat delivery of the same event is a no-op.
        let second = repo.settle("inv_42", OrderStatus::Paid).await.unwrap();
        assert_eq!(second, SettleOutcome::Unchanged);

        let settled = repo.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(settled.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_settle_unknown_invoice() {
        let repo = setup_repo().await;
        let outcome = repo.settle("inv_missing", OrderStatus::Paid).await.unwrap();
        assert_eq!(outcome, SettleOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_settle_never_leaves_terminal_state() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();
        repo.link_external_refs(order.id, "inv_42", "cust_7")
            .await
            .unwrap();

        repo.settle("inv_42", OrderStatus::Paid).await.unwrap();

        let cancel = repo.settle("inv_42", OrderStatus::Cancelled).await.unwrap();
        assert_eq!(cancel, SettleOutcome::Unchanged);

        let order = repo.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_settle_pending_status_is_noop() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();
        repo.link_external_refs(order.id, "inv_42", "cust_7")
            .await
            .unwrap();

        // "sent"/"overdue" map to pending and leave the order actionable.
        let outcome = repo.settle("inv_42", OrderStatus::Pending).await.unwrap();
        assert_eq!(outcome, SettleOutcome::Unchanged);

        let order = repo.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_receipt_is_created_at_most_once() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();

        let receipt = Receipt::new(order.id, "inv_42", 1000, Currency::USD, Utc::now());
        assert!(repo.create_receipt(&receipt).await.unwrap());

        let duplicate = Receipt::new(order.id, "inv_42", 1000, Currency::USD, Utc::now());
        assert!(!repo.create_receipt(&duplicate).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirmation_enqueued_at_most_once() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();

        let payload = confirmation(&order);
        assert!(repo.enqueue_confirmation(order.id, &payload).await.unwrap());
        assert!(!repo.enqueue_confirmation(order.id, &payload).await.unwrap());

        let pending = repo.pending_confirmations(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, payload);
    }

    #[tokio::test]
    async fn test_mark_confirmation_removes_from_pending() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();
        repo.enqueue_confirmation(order.id, &confirmation(&order))
            .await
            .unwrap();

        let job = repo.pending_confirmations(10).await.unwrap().remove(0);
        repo.mark_confirmation(job.id, true, None).await.unwrap();

        assert!(repo.pending_confirmations(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_confirmation_keeps_error_detail() {
        let repo = setup_repo().await;
        let order = pending_order();
        repo.create_order(&order).await.unwrap();
        repo.enqueue_confirmation(order.id, &confirmation(&order))
            .await
            .unwrap();

        let job = repo.pending_confirmations(10).await.unwrap().remove(0);
        repo.mark_confirmation(job.id, false, Some("HTTP 502".into()))
            .await
            .unwrap();

        // Failed rows leave the pending queue; the row keeps its error.
        assert!(repo.pending_confirmations(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_attempt_appends() {
        let repo = setup_repo().await;
        let intent = IntentId::new();

        repo.record_attempt(&PaymentAttempt::failed(
            intent,
            None,
            "Service not found: nonexistent-slug".into(),
        ))
        .await
        .unwrap();
        repo.record_attempt(&PaymentAttempt::succeeded(intent, ClientId::new()))
            .await
            .unwrap();

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM payment_attempts WHERE intent_id = ?")
                .bind(intent.to_string())
                .fetch_one(repo.pool())
                .await
                .unwrap();
        assert_eq!(count.0, 2);
    }
}
