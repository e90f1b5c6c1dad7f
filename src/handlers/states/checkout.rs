//! Checkout handlers
//!
//! Address, payment method and confirmation, plus the wait for an external
//! payment. The order backend is called exactly once per confirmation; a
//! failed call leaves the conversation at `CheckoutConfirm` so the user can
//! retry.

use tracing::{info, warn};

use crate::handlers::{render, ExecutionContext, Intent, Reply};
use crate::models::{OrderSummary, PaymentMethod};
use crate::state::{Conversation, ConversationState, TransitionData};
use crate::utils::errors::Result;
use crate::utils::logging;

use super::cart;

/// `CheckoutAddress`
pub async fn handle_address(
    text: &str,
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Result<Reply> {
    if matches!(intent, Intent::Back | Intent::Decline) {
        return cart::enter_cart(conversation, ctx);
    }

    let address = text.trim();
    if address.is_empty() || address.chars().count() < ctx.store.min_address_length {
        return Ok(Reply::text(render::address_too_short(ctx.store.min_address_length.max(1)))
            .with_quick_replies([render::QUICK_BACK]));
    }

    conversation.transition(ConversationState::CheckoutPayment, TransitionData::none().with_address(address))?;
    Ok(payment_reply())
}

/// `CheckoutPayment`
pub async fn handle_payment(
    text: &str,
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Result<Reply> {
    if matches!(intent, Intent::Back | Intent::Decline) {
        conversation.transition(ConversationState::CheckoutAddress, TransitionData::none())?;
        return Ok(Reply::text(render::address_prompt()).with_quick_replies([render::QUICK_BACK]));
    }

    let Some(method) = PaymentMethod::parse(text) else {
        return Ok(payment_reply());
    };

    conversation.transition(ConversationState::CheckoutConfirm, TransitionData::none().with_payment_method(method))?;
    Ok(summary_reply(conversation, ctx))
}

/// `CheckoutConfirm`
pub async fn handle_confirm(
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Result<Reply> {
    match intent {
        Intent::Affirm => place_order(conversation, ctx).await,
        Intent::Decline => cart::enter_cart(conversation, ctx),
        _ => Ok(summary_reply(conversation, ctx)),
    }
}

async fn place_order(conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    let Some(method) = conversation.payment_method() else {
        // Unreachable for conversations that entered CheckoutConfirm normally
        return cart::enter_cart(conversation, ctx);
    };

    let receipt = match ctx.orders.create_order(conversation).await {
        Ok(receipt) => receipt,
        Err(e) => {
            warn!(
                tenant_id = conversation.tenant_id(),
                user_id = conversation.user_id(),
                error = %e,
                "Order creation failed"
            );
            return Ok(Reply::text(render::order_failed()).with_quick_replies([render::QUICK_YES, render::QUICK_NO]));
        }
    };

    logging::log_order_created(
        conversation.tenant_id(),
        conversation.user_id(),
        &receipt.order_id,
        &receipt.order_number,
    );

    if method.requires_external_confirmation() {
        conversation.transition(
            ConversationState::WaitingExternalPayment,
            TransitionData::none().with_pending_order(receipt.order_id.clone()),
        )?;
        let text = render::transfer_instructions(&receipt, &ctx.store.payment_destination, ctx.currency());
        conversation.record_order(receipt);
        return Ok(Reply::text(text));
    }

    conversation.transition(ConversationState::OrderPlaced, TransitionData::none())?;
    let text = render::order_placed(&receipt, ctx.store.estimated_delivery_minutes, ctx.currency());
    conversation.record_order(receipt);
    conversation.settle_order();

    info!(
        tenant_id = conversation.tenant_id(),
        user_id = conversation.user_id(),
        payment_method = %method,
        "Order placed"
    );
    Ok(Reply::text(text).with_quick_replies([render::QUICK_TRACK, render::QUICK_MENU]))
}

/// `WaitingExternalPayment`: only the payment notification moves on from here
pub fn handle_waiting(conversation: &Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    Ok(Reply::text(render::waiting_for_payment(conversation.last_order(), ctx.currency())))
}

fn payment_reply() -> Reply {
    Reply::text(render::payment_prompt())
        .with_quick_replies(PaymentMethod::ALL.iter().map(|m| m.label()).chain([render::QUICK_BACK]))
}

fn summary_reply(conversation: &Conversation, ctx: &ExecutionContext<'_>) -> Reply {
    let summary = OrderSummary::compute(conversation.cart(), ctx.store.delivery_fee);
    let text = match conversation.payment_method() {
        Some(method) => render::order_summary(
            conversation.cart(),
            &summary,
            conversation.address().unwrap_or_default(),
            method,
            ctx.currency(),
        ),
        None => render::payment_prompt(),
    };
    Reply::text(text).with_quick_replies([render::QUICK_YES, render::QUICK_NO])
}
