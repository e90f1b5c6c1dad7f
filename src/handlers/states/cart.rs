//! ViewingCart handler

use crate::handlers::{render, ExecutionContext, Intent, Reply};
use crate::state::{Conversation, ConversationState, TransitionData};
use crate::utils::errors::Result;

use super::{greeting, menu};

/// Show the cart and move to `ViewingCart`
pub fn enter_cart(conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    if conversation.state() != ConversationState::ViewingCart {
        conversation.transition(ConversationState::ViewingCart, TransitionData::none())?;
    }
    Ok(cart_reply(conversation, ctx))
}

pub async fn handle(intent: Intent, conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    match intent {
        Intent::Finalize => {
            if conversation.cart().is_empty() {
                return Ok(cart_reply(conversation, ctx));
            }
            conversation.transition(ConversationState::CheckoutAddress, TransitionData::none())?;
            Ok(Reply::text(render::address_prompt()).with_quick_replies([render::QUICK_BACK]))
        }
        Intent::ClearCart => {
            conversation.clear_cart();
            Ok(cart_reply(conversation, ctx))
        }
        Intent::ContinueShopping | Intent::ShowMenu => menu::enter_menu(conversation, ctx).await,
        Intent::Back | Intent::Decline => {
            conversation.transition(ConversationState::Idle, TransitionData::none())?;
            Ok(Reply::text(render::welcome()).with_quick_replies(greeting::main_quick_replies()))
        }
        _ => Ok(cart_reply(conversation, ctx)),
    }
}

fn cart_reply(conversation: &Conversation, ctx: &ExecutionContext<'_>) -> Reply {
    let reply = Reply::text(render::cart_view(conversation.cart(), ctx.currency()));
    if conversation.cart().is_empty() {
        reply.with_quick_replies([render::QUICK_MENU])
    } else {
        reply.with_quick_replies([render::QUICK_FINALIZE, render::QUICK_CONTINUE, render::QUICK_CLEAR])
    }
}
