//! Informational states
//!
//! `OrderPlaced`, `TrackingOrder`, `Support` and `AdminCommand` only show
//! information. The next message returns the conversation to `Idle` and is
//! then handled from there, so "menú" after an order goes straight to the
//! menu.

use tracing::warn;

use crate::handlers::{render, ExecutionContext, Intent, Reply};
use crate::state::{Conversation, ConversationState, TransitionData};
use crate::utils::errors::Result;

use super::greeting;

pub async fn handle(intent: Intent, conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    conversation.transition(ConversationState::Idle, TransitionData::none())?;
    greeting::handle(intent, conversation, ctx).await
}

/// Report the status of the last order and move to `TrackingOrder`
pub async fn enter_tracking(conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    let status = match conversation.last_order() {
        Some(receipt) => match ctx.orders.order_status(&receipt.order_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(order_id = %receipt.order_id, error = %e, "Order status lookup failed");
                None
            }
        },
        None => None,
    };

    conversation.transition(ConversationState::TrackingOrder, TransitionData::none())?;
    let text = render::tracking(conversation.last_order(), status.as_ref().map(|s| s.label()));
    Ok(Reply::text(text).with_quick_replies(greeting::main_quick_replies()))
}

pub fn enter_support(conversation: &mut Conversation) -> Result<Reply> {
    conversation.transition(ConversationState::Support, TransitionData::none())?;
    Ok(Reply::text(render::support()).with_quick_replies([render::QUICK_MENU]))
}

/// Admin panel: a catalog overview for the tenant
pub async fn enter_admin(conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    let categories = ctx.catalog.categories(conversation.tenant_id()).await?;
    let mut lines = vec![format!("Tienda: {}", conversation.tenant_id())];
    for category in &categories {
        let products = ctx.catalog.products(conversation.tenant_id(), &category.id).await?;
        lines.push(format!("{}: {} productos", category.name, products.len()));
    }

    conversation.transition(ConversationState::AdminCommand, TransitionData::none())?;
    Ok(Reply::text(render::admin_panel(&lines.join("\n"))))
}
