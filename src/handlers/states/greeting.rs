//! Idle and Greeting handler
//!
//! Entry point of every session: recognizes what the user wants to do and
//! hands over to the menu, cart, tracking, support or admin flows.

use crate::handlers::{render, ExecutionContext, Intent, Reply};
use crate::state::{Conversation, ConversationState, TransitionData};
use crate::utils::errors::Result;

use super::{cart, info, menu};

/// Suggested answers offered from the start of a session
pub fn main_quick_replies() -> [&'static str; 3] {
    [render::QUICK_MENU, render::QUICK_CART, render::QUICK_TRACK]
}

pub async fn handle(intent: Intent, conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    match intent {
        Intent::Greeting => greet(conversation),
        Intent::ShowMenu | Intent::ContinueShopping => menu::enter_menu(conversation, ctx).await,
        Intent::ShowCart => cart::enter_cart(conversation, ctx),
        Intent::TrackOrder => info::enter_tracking(conversation, ctx).await,
        Intent::Support => info::enter_support(conversation),
        Intent::Admin if ctx.sender_is_admin && conversation.state() == ConversationState::Idle => {
            info::enter_admin(conversation, ctx).await
        }
        _ => Ok(help()),
    }
}

fn greet(conversation: &mut Conversation) -> Result<Reply> {
    if conversation.state() == ConversationState::Idle {
        conversation.transition(ConversationState::Greeting, TransitionData::none())?;
    }
    Ok(Reply::text(render::welcome()).with_quick_replies(main_quick_replies()))
}

fn help() -> Reply {
    Reply::text(render::help()).with_quick_replies(main_quick_replies())
}
