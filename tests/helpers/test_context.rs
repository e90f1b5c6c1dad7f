//! Test context for unified test setup
//!
//! Owns a registry and every collaborator the handlers need, and drives
//! messages through `process_message` the same way the bot binary does.

use std::sync::{Arc, Once};

use tokio::sync::mpsc::UnboundedReceiver;

use OrderBuddy::handlers::{KeywordClassifier, StoreProfile};
use OrderBuddy::services::{NotificationQueue, OutboundMessage, StaticCatalog};
use OrderBuddy::state::{ConversationGuard, ConversationSnapshot};
use OrderBuddy::{notify_payment_result, process_message, ConversationRegistry, ExecutionContext, Reply};

use super::test_data::{test_catalog, test_store, FakeOrderService, TEST_TENANT};

static INIT: Once = Once::new();

/// Initialize logging for tests (called once)
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Everything needed to run conversations end to end
pub struct TestContext {
    pub registry: Arc<ConversationRegistry>,
    pub catalog: StaticCatalog,
    pub orders: FakeOrderService,
    pub classifier: KeywordClassifier,
    pub store: StoreProfile,
    pub queue: NotificationQueue,
    pub outbound: UnboundedReceiver<OutboundMessage>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_registry(ConversationRegistry::default())
    }

    pub fn with_registry(registry: ConversationRegistry) -> Self {
        init_test_logging();
        let (queue, outbound) = NotificationQueue::channel();

        Self {
            registry: Arc::new(registry),
            catalog: test_catalog(),
            orders: FakeOrderService::new(),
            classifier: KeywordClassifier::spanish().expect("built-in keyword rules"),
            store: test_store(),
            queue,
            outbound,
        }
    }

    pub fn ctx(&self) -> ExecutionContext<'_> {
        ExecutionContext::new(&self.catalog, &self.orders, &self.classifier, &self.store)
    }

    /// Send a message from `user_id` of the default tenant
    pub async fn send(&self, user_id: &str, text: &str) -> Reply {
        self.send_to(TEST_TENANT, user_id, text).await
    }

    pub async fn send_to(&self, tenant_id: &str, user_id: &str, text: &str) -> Reply {
        process_message(&self.registry, tenant_id, user_id, text, &self.ctx()).await
    }

    /// Send several messages in order, returning the last reply
    pub async fn send_all(&self, user_id: &str, texts: &[&str]) -> Reply {
        let mut last = Reply::default();
        for text in texts {
            last = self.send(user_id, text).await;
        }
        last
    }

    pub async fn conversation(&self, user_id: &str) -> ConversationGuard {
        self.registry
            .get(TEST_TENANT, user_id)
            .await
            .expect("conversation should exist")
    }

    pub async fn load(&self, snapshot: ConversationSnapshot) {
        assert!(self.registry.import(snapshot).await.expect("valid snapshot"));
    }

    pub async fn notify_payment(&self, user_id: &str, order_id: &str, approved: bool) -> bool {
        notify_payment_result(
            &self.registry,
            &self.queue,
            TEST_TENANT,
            user_id,
            order_id,
            approved,
            self.store.estimated_delivery_minutes,
        )
        .await
    }
}
