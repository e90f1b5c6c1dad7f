//! Message entry points
//!
//! [`process_message`] is what a transport calls for every inbound text.
//! [`notify_payment_result`] is what the payment backend calls when a bank
//! transfer is confirmed or rejected.

use tracing::{debug, warn};

use crate::handlers::{dispatch_intent, render, ExecutionContext, Intent, Reply};
use crate::services::NotificationQueue;
use crate::state::{ConversationRegistry, ConversationState, TransitionData};
use crate::utils::logging;

/// Handle one inbound message for (tenant, user).
///
/// The conversation stays locked for the whole handling, so messages from
/// the same user are processed one at a time while other users proceed in
/// parallel.
pub async fn process_message(
    registry: &ConversationRegistry,
    tenant_id: &str,
    user_id: &str,
    text: &str,
    ctx: &ExecutionContext<'_>,
) -> Reply {
    let mut conversation = registry.get_or_create(tenant_id, user_id).await;
    let intent = ctx.classifier.classify(text);

    if intent == Intent::EndSession && conversation.state() != ConversationState::WaitingExternalPayment {
        debug!(tenant_id = tenant_id, user_id = user_id, "Session ended by user");
        registry.end_session(conversation);
        return Reply::text(render::goodbye());
    }

    dispatch_intent(text, intent, &mut conversation, ctx).await
}

/// Apply the outcome of an external payment.
///
/// Only a conversation that is still waiting for exactly `order_id` is
/// affected; anything else is ignored. Returns whether the result was
/// applied. The user is told about it through `queue`.
pub async fn notify_payment_result(
    registry: &ConversationRegistry,
    queue: &NotificationQueue,
    tenant_id: &str,
    user_id: &str,
    order_id: &str,
    approved: bool,
    estimated_delivery_minutes: u32,
) -> bool {
    let Some(mut conversation) = registry.get(tenant_id, user_id).await else {
        debug!(tenant_id = tenant_id, user_id = user_id, order_id = order_id, "Payment result for unknown conversation ignored");
        return false;
    };

    if conversation.state() != ConversationState::WaitingExternalPayment
        || conversation.pending_order_id() != Some(order_id)
    {
        debug!(
            tenant_id = tenant_id,
            user_id = user_id,
            order_id = order_id,
            state = %conversation.state(),
            "Payment result does not match a pending order, ignored"
        );
        return false;
    }

    let reply = if approved {
        if let Err(e) = conversation.transition(ConversationState::OrderPlaced, TransitionData::none()) {
            warn!(error = %e, "Could not apply approved payment");
            return false;
        }
        conversation.settle_order();
        Reply::text(render::payment_approved(conversation.last_order(), estimated_delivery_minutes))
            .with_quick_replies([render::QUICK_TRACK, render::QUICK_MENU])
    } else {
        if let Err(e) = conversation.transition(ConversationState::Idle, TransitionData::none()) {
            warn!(error = %e, "Could not apply rejected payment");
            return false;
        }
        conversation.abandon_pending_order();
        Reply::text(render::payment_rejected()).with_quick_replies([render::QUICK_CART])
    };

    logging::log_payment_result(tenant_id, user_id, order_id, approved);
    drop(conversation);

    queue.enqueue(tenant_id, user_id, reply);
    true
}
