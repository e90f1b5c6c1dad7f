//! OrderBuddy Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;

use anyhow::Context;
use teloxide::dispatching::UpdateHandler;
use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup, Update};
use teloxide::utils::command::BotCommands as TeloxideBotCommands;
use teloxide::{prelude::*, RequestError};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use OrderBuddy::{
    config::Settings,
    handlers::{notify_payment_result, process_message, ExecutionContext, KeywordClassifier, Reply, StoreProfile},
    services::{InMemoryOrderBook, NotificationQueue, OutboundMessage, StaticCatalog},
    state::{ConversationRegistry, RegistryManager, SnapshotStore},
    utils::logging,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Shared dependencies of every update handler
struct App {
    registry: Arc<ConversationRegistry>,
    catalog: StaticCatalog,
    orders: InMemoryOrderBook,
    classifier: KeywordClassifier,
    store: StoreProfile,
    queue: NotificationQueue,
    tenant_id: String,
    admin_ids: Vec<i64>,
}

impl App {
    fn ctx(&self, sender_is_admin: bool) -> ExecutionContext<'_> {
        ExecutionContext::new(&self.catalog, &self.orders, &self.classifier, &self.store).as_admin(sender_is_admin)
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", OrderBuddy::info());

    // Conversation registry and its sweeper
    let timeout = settings.sessions.timeout().context("session timeout out of range")?;
    let registry = Arc::new(ConversationRegistry::new(timeout));
    let mut registry_manager = RegistryManager::new(registry.clone(), settings.sessions.sweep_interval());

    let snapshot_store = if settings.redis.enabled {
        info!("Connecting to Redis...");
        let store = SnapshotStore::new(settings.redis.clone()).await?;
        let restored = store.restore_registry(&registry).await?;
        info!(restored = restored, "Conversations restored from Redis");
        Some(store)
    } else {
        None
    };
    registry_manager.start_sweep();

    info!(path = %settings.store.catalog_path, "Loading catalog...");
    let catalog = StaticCatalog::from_file(&settings.store.catalog_path).await?;

    let (queue, outbound) = NotificationQueue::channel();
    let bot = Bot::new(&settings.bot.token);
    let delivery = tokio::spawn(deliver_notifications(bot.clone(), outbound));

    let app = Arc::new(App {
        registry: registry.clone(),
        catalog,
        orders: InMemoryOrderBook::new(settings.store.delivery_fee),
        classifier: KeywordClassifier::spanish()?,
        store: StoreProfile::from_settings(&settings),
        queue,
        tenant_id: settings.store.tenant_id.clone(),
        admin_ids: settings.bot.admin_ids.clone(),
    });

    let mut dispatcher = Dispatcher::builder(bot, create_handler())
        .dependencies(dptree::deps![app.clone()])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("OrderBuddy bot is ready, starting polling...");
    dispatcher.dispatch().await;

    info!("Shutting down...");
    registry_manager.stop_sweep();

    if let Some(store) = snapshot_store {
        match store.persist_registry(&registry).await {
            Ok(saved) => info!(saved = saved, "Conversations persisted to Redis"),
            Err(e) => error!(error = %e, "Failed to persist conversations"),
        }
    }

    // Dropping the last queue sender lets the delivery task finish
    drop(dispatcher);
    drop(app);
    if let Err(e) = delivery.await {
        warn!(error = %e, "Notification delivery task failed");
    }

    info!("OrderBuddy bot has been shut down.");
    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .branch(
            dptree::entry()
                .filter_command::<AdminCommands>()
                .endpoint(handle_admin_command),
        )
        .branch(dptree::endpoint(handle_text))
}

#[derive(TeloxideBotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Comandos de administración")]
enum AdminCommands {
    #[command(description = "Confirmar el pago de un pedido")]
    PagoOk(String),
    #[command(description = "Rechazar el pago de un pedido")]
    PagoRechazado(String),
    #[command(description = "Ver sesiones activas")]
    Sesiones,
}

/// Feed a private text message through the conversation engine
async fn handle_text(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let user_id = user.id.0 as i64;
    let ctx = app.ctx(app.is_admin(user_id));
    let reply = process_message(&app.registry, &app.tenant_id, &user_id.to_string(), text, &ctx).await;

    send_reply(&bot, msg.chat.id, reply).await?;
    Ok(())
}

/// Payment confirmation and session overview for admins
async fn handle_admin_command(bot: Bot, msg: Message, cmd: AdminCommands, app: Arc<App>) -> HandlerResult {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or_default();
    if !app.is_admin(user_id) {
        warn!(user_id = user_id, "Admin command from non-admin user");
        bot.send_message(msg.chat.id, "Comando no disponible.").await?;
        return Ok(());
    }

    let text = match cmd {
        AdminCommands::PagoOk(order_id) => resolve_payment(&app, order_id.trim(), true).await,
        AdminCommands::PagoRechazado(order_id) => resolve_payment(&app, order_id.trim(), false).await,
        AdminCommands::Sesiones => {
            let stats = app.registry.stats();
            serde_json::to_string_pretty(&stats)?
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn resolve_payment(app: &App, order_id: &str, approved: bool) -> String {
    let Some(order) = app.orders.get(order_id) else {
        return format!("Pedido {} no encontrado.", order_id);
    };

    if let Err(e) = app.orders.record_payment(order_id, approved) {
        error!(order_id = order_id, error = %e, "Failed to record payment");
        return format!("No se pudo registrar el pago: {}", e);
    }

    let applied = notify_payment_result(
        &app.registry,
        &app.queue,
        &order.tenant_id,
        &order.user_id,
        order_id,
        approved,
        app.store.estimated_delivery_minutes,
    )
    .await;

    if applied {
        format!("Pago del pedido {} registrado.", order.receipt.order_number)
    } else {
        format!(
            "Pago del pedido {} registrado, pero la conversación ya no esperaba ese pago.",
            order.receipt.order_number
        )
    }
}

/// Send queued notifications until every queue sender is gone
async fn deliver_notifications(bot: Bot, mut outbound: UnboundedReceiver<OutboundMessage>) {
    while let Some(message) = outbound.recv().await {
        let chat_id = match message.user_id.parse::<i64>() {
            Ok(id) => ChatId(id),
            Err(_) => {
                warn!(user_id = %message.user_id, "Cannot deliver to non-numeric user id");
                continue;
            }
        };

        if let Err(e) = send_reply(&bot, chat_id, message.reply).await {
            error!(user_id = %message.user_id, error = %e, "Failed to deliver notification");
        }
    }
    debug!("Notification queue closed");
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> Result<(), RequestError> {
    bot.send_message(chat_id, reply.text)
        .reply_markup(reply_markup(&reply.quick_replies))
        .await?;
    Ok(())
}

/// Quick replies become a one-row reply keyboard
fn reply_markup(quick_replies: &[String]) -> ReplyMarkup {
    if quick_replies.is_empty() {
        return ReplyMarkup::KeyboardRemove(KeyboardRemove::new());
    }

    let row: Vec<KeyboardButton> = quick_replies.iter().map(KeyboardButton::new).collect();
    ReplyMarkup::Keyboard(KeyboardMarkup::new(vec![row]).resize_keyboard())
}
