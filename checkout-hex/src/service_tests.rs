//! Orchestrator and reconciler unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use exchange_rates::{Converter, Currency, FixedRates};
    use uuid::Uuid;

    use checkout_types::{
        AuthUser, CatalogError, CatalogProvider, CheckoutError, ClientId, ClientProfile,
        ConfirmationJob, CreateInvoiceRequest, CreatePaymentIntentRequest, CustomerData,
        ExternalCustomer, ExternalInvoice, IdentityError, IdentityProvider, InvoiceStatusSnapshot,
        InvoicingGateway, Order, OrderId, OrderRepository, OrderStatus, PackageTier,
        PaymentAttempt, PaymentConfirmation, ProviderError, Receipt, RepoError,
        ServiceCatalogEntry, ServiceId, SettleOutcome, WebhookEnvelope, WebhookEventData,
    };

    use crate::resolver::ServiceResolver;
    use crate::service::PaymentIntentService;
    use crate::reconcile::{EVENT_PAYMENT_RECEIVED, EVENT_STATUS_CHANGED, WebhookReconciler};

    // ─────────────────────────────────────────────────────────────────────────
    // Mock ports
    // ─────────────────────────────────────────────────────────────────────────

    /// In-memory repository mirroring the adapters' settlement semantics.
    pub struct MockRepo {
        orders: Mutex<HashMap<OrderId, Order>>,
        receipts: Mutex<Vec<Receipt>>,
        confirmations: Mutex<Vec<(OrderId, PaymentConfirmation)>>,
        attempts: Mutex<Vec<PaymentAttempt>>,
        fail_link: AtomicBool,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                orders: Mutex::new(HashMap::new()),
                receipts: Mutex::new(Vec::new()),
                confirmations: Mutex::new(Vec::new()),
                attempts: Mutex::new(Vec::new()),
                fail_link: AtomicBool::new(false),
            }
        }

        fn order_count(&self) -> usize {
            self.orders.lock().unwrap().len()
        }

        fn receipt_count(&self) -> usize {
            self.receipts.lock().unwrap().len()
        }

        fn confirmation_count(&self) -> usize {
            self.confirmations.lock().unwrap().len()
        }

        fn attempts(&self) -> Vec<PaymentAttempt> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderRepository for MockRepo {
        async fn create_order(&self, order: &Order) -> Result<(), RepoError> {
            if order.quantity < 1 {
                return Err(RepoError::Validation("quantity below 1".into()));
            }
            self.orders.lock().unwrap().insert(order.id, order.clone());
            Ok(())
        }

        async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
            Ok(self.orders.lock().unwrap().get(&id).cloned())
        }

        async fn link_external_refs(
            &self,
            id: OrderId,
            invoice_id: &str,
            customer_id: &str,
        ) -> Result<(), RepoError> {
            if self.fail_link.load(Ordering::SeqCst) {
                return Err(RepoError::Database("link update lost".into()));
            }
            let mut orders = self.orders.lock().unwrap();
            let order = orders.get_mut(&id).ok_or(RepoError::NotFound)?;
            order.external_invoice_id = Some(invoice_id.to_string());
            order.external_customer_id = Some(customer_id.to_string());
            Ok(())
        }

        async fn find_by_external_invoice(
            &self,
            invoice_id: &str,
        ) -> Result<Option<Order>, RepoError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .values()
                .find(|o| o.external_invoice_id.as_deref() == Some(invoice_id))
                .cloned())
        }

        async fn settle(
            &self,
            invoice_id: &str,
            next: OrderStatus,
        ) -> Result<SettleOutcome, RepoError> {
            let mut orders = self.orders.lock().unwrap();
            let Some(order) = orders
                .values_mut()
                .find(|o| o.external_invoice_id.as_deref() == Some(invoice_id))
            else {
                return Ok(SettleOutcome::NotFound);
            };

            if order.status == next || next == OrderStatus::Pending {
                return Ok(SettleOutcome::Unchanged);
            }
            if order.status != OrderStatus::Pending {
                return Ok(SettleOutcome::Unchanged);
            }
            order.status = next;
            Ok(SettleOutcome::Updated)
        }

        async fn create_receipt(&self, receipt: &Receipt) -> Result<bool, RepoError> {
            let mut receipts = self.receipts.lock().unwrap();
            if receipts.iter().any(|r| r.order_id == receipt.order_id) {
                return Ok(false);
            }
            receipts.push(receipt.clone());
            Ok(true)
        }

        async fn enqueue_confirmation(
            &self,
            order_id: OrderId,
            payload: &PaymentConfirmation,
        ) -> Result<bool, RepoError> {
            let mut confirmations = self.confirmations.lock().unwrap();
            if confirmations.iter().any(|(id, _)| *id == order_id) {
                return Ok(false);
            }
            confirmations.push((order_id, payload.clone()));
            Ok(true)
        }

        async fn record_attempt(&self, attempt: &PaymentAttempt) -> Result<(), RepoError> {
            self.attempts.lock().unwrap().push(attempt.clone());
            Ok(())
        }

        async fn pending_confirmations(
            &self,
            _limit: i64,
        ) -> Result<Vec<ConfirmationJob>, RepoError> {
            Ok(Vec::new())
        }

        async fn mark_confirmation(
            &self,
            _id: Uuid,
            _delivered: bool,
            _last_error: Option<String>,
        ) -> Result<(), RepoError> {
            Ok(())
        }
    }

    /// Scriptable invoicing gateway: queued errors are emitted before the
    /// call finally succeeds.
    pub struct MockGateway {
        customer_errors: Mutex<Vec<ProviderError>>,
        invoice_errors: Mutex<Vec<ProviderError>>,
        customer_calls: AtomicU32,
        invoice_calls: AtomicU32,
        status: Mutex<Option<InvoiceStatusSnapshot>>,
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self {
                customer_errors: Mutex::new(Vec::new()),
                invoice_errors: Mutex::new(Vec::new()),
                customer_calls: AtomicU32::new(0),
                invoice_calls: AtomicU32::new(0),
                status: Mutex::new(None),
            }
        }

        fn fail_customer_with(&self, errors: Vec<ProviderError>) {
            *self.customer_errors.lock().unwrap() = errors;
        }

        fn report_status(&self, snapshot: InvoiceStatusSnapshot) {
            *self.status.lock().unwrap() = Some(snapshot);
        }
    }

    #[async_trait]
    impl InvoicingGateway for MockGateway {
        async fn find_or_create_customer(
            &self,
            data: &CustomerData,
        ) -> Result<ExternalCustomer, ProviderError> {
            self.customer_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.customer_errors.lock().unwrap().pop() {
                return Err(err);
            }
            Ok(ExternalCustomer {
                id: "cust_1".to_string(),
                name: data.name.clone(),
                email: data.email.clone(),
            })
        }

        async fn create_invoice(
            &self,
            request: &CreateInvoiceRequest,
        ) -> Result<ExternalInvoice, ProviderError> {
            let call = self.invoice_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(err) = self.invoice_errors.lock().unwrap().pop() {
                return Err(err);
            }
            let total = request.items.iter().map(|i| i.total()).sum();
            Ok(ExternalInvoice {
                id: format!("inv_{call}"),
                number: format!("INV-20260101-TST{call:03}"),
                total,
                currency: request.currency,
                due_date: Utc::now() + chrono::Duration::days(30),
                payment_url: format!("https://billing.example.com/pay/inv_{call}"),
            })
        }

        async fn invoice_status(
            &self,
            _invoice_id: &str,
        ) -> Result<InvoiceStatusSnapshot, ProviderError> {
            self.status
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ProviderError::Permanent("no status scripted".into()))
        }

        async fn ping(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    pub struct MockIdentity {
        profiles: Mutex<HashMap<ClientId, ClientProfile>>,
    }

    #[async_trait]
    impl IdentityProvider for MockIdentity {
        async fn current_user(&self, _bearer: &str) -> Result<Option<AuthUser>, IdentityError> {
            Ok(None)
        }

        async fn client_profile(
            &self,
            id: ClientId,
        ) -> Result<Option<ClientProfile>, IdentityError> {
            Ok(self.profiles.lock().unwrap().get(&id).cloned())
        }
    }

    struct StubCatalog {
        entries: Vec<ServiceCatalogEntry>,
    }

    #[async_trait]
    impl CatalogProvider for StubCatalog {
        async fn list_services(&self) -> Result<Vec<ServiceCatalogEntry>, CatalogError> {
            Ok(self.entries.clone())
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test environment
    // ─────────────────────────────────────────────────────────────────────────

    struct TestEnv {
        repo: Arc<MockRepo>,
        gateway: Arc<MockGateway>,
        rates: Arc<FixedRates>,
        service: PaymentIntentService<MockRepo, MockGateway>,
        reconciler: WebhookReconciler<MockRepo, MockGateway>,
        ssl_id: ServiceId,
        user: AuthUser,
    }

    fn catalog_entry(name: &str, pricing: &[(PackageTier, i64)]) -> ServiceCatalogEntry {
        ServiceCatalogEntry {
            id: ServiceId::new(),
            name: name.to_string(),
            category: "services".to_string(),
            pricing: pricing.iter().copied().collect(),
            features: BTreeMap::new(),
        }
    }

    fn env() -> TestEnv {
        let ssl = catalog_entry(
            "SSL Certificate Setup",
            &[(PackageTier::Basic, 500), (PackageTier::Standard, 1000)],
        );
        let ssl_id = ssl.id;
        let catalog = Arc::new(StubCatalog {
            entries: vec![ssl, catalog_entry("Email Migration", &[(PackageTier::Basic, 500)])],
        });
        let resolver = Arc::new(ServiceResolver::new(catalog));

        let user = AuthUser {
            id: ClientId::new(),
            email: "alice@example.com".to_string(),
            email_verified_at: Some(Utc::now()),
        };
        let identity = Arc::new(MockIdentity {
            profiles: Mutex::new(
                [(
                    user.id,
                    ClientProfile {
                        name: "Alice Example".to_string(),
                        email: "alice@example.com".to_string(),
                        phone: None,
                        company: Some("Example LLC".to_string()),
                    },
                )]
                .into_iter()
                .collect(),
            ),
        });

        let repo = Arc::new(MockRepo::new());
        let gateway = Arc::new(MockGateway::new());
        let rates = Arc::new(FixedRates::new());
        let converter = Converter::new(rates.clone());

        let service = PaymentIntentService::new(
            repo.clone(),
            gateway.clone(),
            resolver.clone(),
            identity.clone(),
            converter,
        );
        let reconciler =
            WebhookReconciler::new(repo.clone(), gateway.clone(), identity, resolver);

        TestEnv {
            repo,
            gateway,
            rates,
            service,
            reconciler,
            ssl_id,
            user,
        }
    }

    fn purchase_request() -> CreatePaymentIntentRequest {
        CreatePaymentIntentRequest {
            service_identifier: "ssl-setup".to_string(),
            package_type: PackageTier::Standard,
            total_price: 1000,
            currency: Currency::USD,
            quantity: 1,
        }
    }

    fn payment_received(invoice_id: &str, total: Option<i64>) -> WebhookEnvelope {
        WebhookEnvelope {
            event_type: EVENT_PAYMENT_RECEIVED.to_string(),
            data: WebhookEventData {
                invoice_id: invoice_id.to_string(),
                invoice_number: None,
                total,
                status: None,
                payment_date: Some(Utc::now()),
            },
        }
    }

    fn status_changed(invoice_id: &str, status: &str) -> WebhookEnvelope {
        WebhookEnvelope {
            event_type: EVENT_STATUS_CHANGED.to_string(),
            data: WebhookEventData {
                invoice_id: invoice_id.to_string(),
                invoice_number: None,
                total: None,
                status: Some(status.to_string()),
                payment_date: None,
            },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Orchestrator
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_purchase_happy_path() {
        let env = env();

        let response = env
            .service
            .create_payment_intent(Some(env.user.clone()), purchase_request())
            .await
            .unwrap();

        assert_eq!(response.status, OrderStatus::Pending);
        assert_eq!(response.total, 1000);
        assert_eq!(response.customer_id, "cust_1");
        assert!(!response.invoice_id.is_empty());
        assert!(response.payment_url.contains(&response.invoice_id));

        // One pending, linked order with the chosen currency held verbatim.
        assert_eq!(env.repo.order_count(), 1);
        let order = env
            .repo
            .find_by_external_invoice(&response.invoice_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.service_id, env.ssl_id);
        assert_eq!(order.amounts.usd, 1000);
        assert!(order.amounts.inr > order.amounts.usd);
        assert_eq!(order.status, OrderStatus::Pending);

        let attempts = env.repo.attempts();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].error.is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated_purchase_is_rejected() {
        let env = env();

        let err = env
            .service
            .create_payment_intent(None, purchase_request())
            .await
            .unwrap_err();

        assert!(matches!(err.error, CheckoutError::AuthenticationRequired));
        assert_eq!(env.repo.order_count(), 0);
    }

    #[tokio::test]
    async fn test_unverified_email_is_rejected() {
        let env = env();
        let mut user = env.user.clone();
        user.email_verified_at = None;

        let err = env
            .service
            .create_payment_intent(Some(user), purchase_request())
            .await
            .unwrap_err();

        assert!(matches!(err.error, CheckoutError::EmailNotVerified));
        assert_eq!(env.repo.order_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_slug_is_service_not_found() {
        let env = env();
        let mut request = purchase_request();
        request.service_identifier = "nonexistent-slug".to_string();

        let err = env
            .service
            .create_payment_intent(Some(env.user.clone()), request)
            .await
            .unwrap_err();

        assert!(matches!(err.error, CheckoutError::ServiceNotFound(_)));
        assert_eq!(env.repo.order_count(), 0);

        // The failed attempt lands in the audit log with its correlation id.
        let attempts = env.repo.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].intent_id, err.intent_id);
        assert!(attempts[0].error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_unpriced_tier_is_invalid_package_without_order() {
        let env = env();
        let mut request = purchase_request();
        request.package_type = PackageTier::Enterprise;

        let err = env
            .service
            .create_payment_intent(Some(env.user.clone()), request)
            .await
            .unwrap_err();

        assert!(matches!(err.error, CheckoutError::InvalidPackage { .. }));
        assert_eq!(env.repo.order_count(), 0);
        assert_eq!(env.gateway.customer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_profile_is_profile_not_found() {
        let env = env();
        let stranger = AuthUser {
            id: ClientId::new(),
            email: "stranger@example.com".to_string(),
            email_verified_at: Some(Utc::now()),
        };

        let err = env
            .service
            .create_payment_intent(Some(stranger), purchase_request())
            .await
            .unwrap_err();

        assert!(matches!(err.error, CheckoutError::ProfileNotFound(_)));
        assert_eq!(env.repo.order_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_outage_degrades_to_unconverted_amounts() {
        let env = env();
        env.rates.set_available(false);

        let response = env
            .service
            .create_payment_intent(Some(env.user.clone()), purchase_request())
            .await
            .unwrap();

        let order = env
            .repo
            .find_by_external_invoice(&response.invoice_id)
            .await
            .unwrap()
            .unwrap();
        // Fallback policy: non-chosen currencies carry the original amount.
        assert_eq!(order.amounts.usd, 1000);
        assert_eq!(order.amounts.eur, 1000);
        assert_eq!(order.amounts.inr, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_provider_failure_is_retried() {
        let env = env();
        env.gateway
            .fail_customer_with(vec![ProviderError::Transient("gateway timeout".into())]);

        let response = env
            .service
            .create_payment_intent(Some(env.user.clone()), purchase_request())
            .await
            .unwrap();

        assert_eq!(env.gateway.customer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(response.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_configuration_error_is_not_retried() {
        let env = env();
        env.gateway.fail_customer_with(vec![
            ProviderError::Configuration("expired refresh token".into()),
            ProviderError::Configuration("expired refresh token".into()),
        ]);

        let err = env
            .service
            .create_payment_intent(Some(env.user.clone()), purchase_request())
            .await
            .unwrap_err();

        assert!(matches!(err.error, CheckoutError::Configuration(_)));
        assert_eq!(env.gateway.customer_calls.load(Ordering::SeqCst), 1);
        assert_eq!(env.gateway.invoice_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_link_failure_does_not_roll_back_the_intent() {
        let env = env();
        env.repo.fail_link.store(true, Ordering::SeqCst);

        let response = env
            .service
            .create_payment_intent(Some(env.user.clone()), purchase_request())
            .await
            .unwrap();

        // The order stays pending and unlinked; reconciliation repairs it.
        assert_eq!(response.status, OrderStatus::Pending);
        assert_eq!(env.repo.order_count(), 1);
        let attempts = env.repo.attempts();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].error.is_none());
    }

    #[tokio::test]
    async fn test_order_status_requires_ownership() {
        let env = env();
        let response = env
            .service
            .create_payment_intent(Some(env.user.clone()), purchase_request())
            .await
            .unwrap();
        let order = env
            .repo
            .find_by_external_invoice(&response.invoice_id)
            .await
            .unwrap()
            .unwrap();

        let own = env
            .service
            .order_status(Some(env.user.clone()), order.id)
            .await
            .unwrap();
        assert_eq!(own.order_id, order.id);

        let stranger = AuthUser {
            id: ClientId::new(),
            email: "stranger@example.com".to_string(),
            email_verified_at: Some(Utc::now()),
        };
        let denied = env.service.order_status(Some(stranger), order.id).await;
        assert!(matches!(denied, Err(CheckoutError::OrderNotFound(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Webhook reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    async fn purchased(env: &TestEnv) -> (OrderId, String) {
        let response = env
            .service
            .create_payment_intent(Some(env.user.clone()), purchase_request())
            .await
            .unwrap();
        let order = env
            .repo
            .find_by_external_invoice(&response.invoice_id)
            .await
            .unwrap()
            .unwrap();
        (order.id, response.invoice_id)
    }

    #[tokio::test]
    async fn test_payment_webhook_settles_and_is_idempotent() {
        let env = env();
        let (order_id, invoice_id) = purchased(&env).await;

        let ack = env
            .reconciler
            .handle(payment_received(&invoice_id, Some(1000)))
            .await
            .unwrap();
        assert!(ack.success);

        // Second delivery of the same event changes nothing.
        env.reconciler
            .handle(payment_received(&invoice_id, Some(1000)))
            .await
            .unwrap();

        let order = env.repo.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(env.repo.receipt_count(), 1);
        assert_eq!(env.repo.confirmation_count(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_invoice_is_acknowledged_and_ignored() {
        let env = env();

        let ack = env
            .reconciler
            .handle(payment_received("inv_unknown", Some(1000)))
            .await
            .unwrap();

        assert!(ack.success);
        assert_eq!(env.repo.receipt_count(), 0);
        assert_eq!(env.repo.confirmation_count(), 0);
    }

    #[tokio::test]
    async fn test_sent_and_overdue_keep_order_pending() {
        let env = env();
        let (order_id, invoice_id) = purchased(&env).await;

        for status in ["sent", "overdue", "something-new"] {
            env.reconciler
                .handle(status_changed(&invoice_id, status))
                .await
                .unwrap();
            let order = env.repo.get_order(order_id).await.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::Pending, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_terminal() {
        let env = env();
        let (order_id, invoice_id) = purchased(&env).await;

        env.reconciler
            .handle(status_changed(&invoice_id, "cancelled"))
            .await
            .unwrap();

        // A late payment event must not resurrect a cancelled order.
        env.reconciler
            .handle(payment_received(&invoice_id, Some(1000)))
            .await
            .unwrap();

        let order = env.repo.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_paid_never_regresses() {
        let env = env();
        let (order_id, invoice_id) = purchased(&env).await;

        env.reconciler
            .handle(payment_received(&invoice_id, Some(1000)))
            .await
            .unwrap();
        env.reconciler
            .handle(status_changed(&invoice_id, "overdue"))
            .await
            .unwrap();
        env.reconciler
            .handle(status_changed(&invoice_id, "cancelled"))
            .await
            .unwrap();

        let order = env.repo.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_manual_reconciliation_applies_provider_status() {
        let env = env();
        let (order_id, _invoice_id) = purchased(&env).await;
        env.gateway.report_status(InvoiceStatusSnapshot {
            status: "paid".to_string(),
            total: 1000,
            payment_date: Some(Utc::now()),
        });

        let status = env.reconciler.reconcile_order(order_id).await.unwrap();

        assert_eq!(status, OrderStatus::Paid);
        assert_eq!(env.repo.receipt_count(), 1);
        assert_eq!(env.repo.confirmation_count(), 1);
    }
}
