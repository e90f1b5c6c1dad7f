//! Menu browsing and cart additions
//!
//! Covers `BrowsingMenu`, `SelectingCategory`, `SelectingProduct` and
//! `AddingToCart`. Catalog data is fetched before any state change, so a
//! failing catalog leaves the conversation untouched.

use crate::handlers::{render, ExecutionContext, Intent, Reply};
use crate::models::{CartLine, Category, Product, SelectedOption};
use crate::state::{Conversation, ConversationState, TransitionData};
use crate::utils::errors::Result;
use crate::utils::helpers::normalize_text;

use super::{cart, greeting};

/// Largest quantity accepted in one addition
pub const MAX_QUANTITY: u32 = 10;

const CONFIRM_WORDS: &[&str] = &["si", "s", "sip", "ok", "dale", "claro", "agregar", "yes", "add"];

/// Show the category list and move to `BrowsingMenu`
pub async fn enter_menu(conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Result<Reply> {
    let categories = ctx.catalog.categories(conversation.tenant_id()).await?;
    if categories.is_empty() {
        return Ok(Reply::text(render::empty_catalog()).with_quick_replies([render::QUICK_CART]));
    }

    conversation.clear_selection();
    if conversation.state() != ConversationState::BrowsingMenu {
        conversation.transition(ConversationState::BrowsingMenu, TransitionData::none())?;
    }
    Ok(category_reply(render::category_list(&categories)))
}

/// `BrowsingMenu` and `SelectingCategory`: a number picks a category
pub async fn handle_category_choice(
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Result<Reply> {
    match intent {
        Intent::Number(n) => {
            let categories = ctx.catalog.categories(conversation.tenant_id()).await?;
            match pick(n, &categories) {
                Some(category) => {
                    let category = category.clone();
                    select_category(conversation, ctx, category, &categories).await
                }
                None => Ok(category_reply(render::category_list(&categories))),
            }
        }
        Intent::ShowCart => cart::enter_cart(conversation, ctx),
        Intent::Back | Intent::Decline => {
            if conversation.state() == ConversationState::SelectingCategory {
                enter_menu(conversation, ctx).await
            } else {
                conversation.transition(ConversationState::Idle, TransitionData::none())?;
                Ok(Reply::text(render::welcome()).with_quick_replies(greeting::main_quick_replies()))
            }
        }
        _ => {
            let categories = ctx.catalog.categories(conversation.tenant_id()).await?;
            Ok(category_reply(render::category_list(&categories)))
        }
    }
}

async fn select_category(
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
    category: Category,
    categories: &[Category],
) -> Result<Reply> {
    let products = ctx.catalog.products(conversation.tenant_id(), &category.id).await?;

    if conversation.state() == ConversationState::SelectingCategory {
        conversation.transition(ConversationState::BrowsingMenu, TransitionData::none())?;
    }
    conversation.transition(
        ConversationState::SelectingCategory,
        TransitionData::none().with_category(category.clone()),
    )?;

    if products.is_empty() {
        return Ok(category_reply(render::empty_category(&category, categories)));
    }

    conversation.transition(ConversationState::SelectingProduct, TransitionData::none())?;
    Ok(product_reply(&category, &products, ctx))
}

/// `SelectingProduct`: a number picks a product of the selected category
pub async fn handle_product_choice(
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Result<Reply> {
    let Some(category) = conversation.selected_category().cloned() else {
        return enter_menu(conversation, ctx).await;
    };

    match intent {
        Intent::Number(n) => {
            let products = ctx.catalog.products(conversation.tenant_id(), &category.id).await?;
            match pick(n, &products) {
                Some(product) => {
                    let reply = quantity_reply(product, ctx);
                    conversation.transition(
                        ConversationState::AddingToCart,
                        TransitionData::none().with_product(product.clone()),
                    )?;
                    Ok(reply)
                }
                None => Ok(product_reply(&category, &products, ctx)),
            }
        }
        Intent::ShowCart => cart::enter_cart(conversation, ctx),
        Intent::Back | Intent::Decline | Intent::ShowMenu => enter_menu(conversation, ctx).await,
        _ => {
            let products = ctx.catalog.products(conversation.tenant_id(), &category.id).await?;
            Ok(product_reply(&category, &products, ctx))
        }
    }
}

/// `AddingToCart`: quantity and option letters, e.g. "2 a c"
pub async fn handle_add_to_cart(
    text: &str,
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Result<Reply> {
    let Some(product) = conversation.selected_product().cloned() else {
        return enter_menu(conversation, ctx).await;
    };

    match intent {
        Intent::Back | Intent::Decline | Intent::ShowMenu => return enter_menu(conversation, ctx).await,
        Intent::ShowCart => {
            conversation.clear_selection();
            return cart::enter_cart(conversation, ctx);
        }
        _ => {}
    }

    let Some((quantity, options)) = parse_add_request(text, &product) else {
        return Ok(Reply::text(render::invalid_quantity()).with_quick_replies(["1", "2", "3", render::QUICK_BACK]));
    };

    let description = describe_addition(&product, quantity, &options);
    conversation.cart.add(&product, quantity, options);
    conversation.clear_selection();
    conversation.transition(ConversationState::ViewingCart, TransitionData::none())?;

    Ok(Reply::text(render::added_to_cart(&description, conversation.cart(), ctx.currency())).with_quick_replies([
        render::QUICK_FINALIZE,
        render::QUICK_CONTINUE,
        render::QUICK_CLEAR,
    ]))
}

/// Parse "<quantity> <option letters>" where both parts are optional but
/// at least one of them, or a confirmation word, must be present.
pub fn parse_add_request(text: &str, product: &Product) -> Option<(u32, Vec<SelectedOption>)> {
    let normalized = normalize_text(text);
    let mut quantity = None;
    let mut options: Vec<SelectedOption> = Vec::new();
    let mut confirmed = false;

    for token in normalized.split_whitespace() {
        if let Ok(n) = token.parse::<u32>() {
            if quantity.is_some() || !(1..=MAX_QUANTITY).contains(&n) {
                return None;
            }
            quantity = Some(n);
            continue;
        }

        let mut chars = token.chars();
        if let (Some(label), None) = (chars.next(), chars.next()) {
            if let Some(option) = product.option_by_label(label) {
                if !options.iter().any(|o| o.id == option.id) {
                    options.push(option.into());
                }
                continue;
            }
        }

        if CONFIRM_WORDS.contains(&token) {
            confirmed = true;
            continue;
        }

        return None;
    }

    if quantity.is_none() && options.is_empty() && !confirmed {
        return None;
    }
    Some((quantity.unwrap_or(1), options))
}

fn describe_addition(product: &Product, quantity: u32, options: &[SelectedOption]) -> String {
    CartLine {
        product_id: product.id.clone(),
        name: product.name.clone(),
        unit_price: product.price,
        quantity,
        options: options.to_vec(),
    }
    .describe()
}

/// Resolve a 1-based number typed by the user
fn pick<T>(n: u32, items: &[T]) -> Option<&T> {
    (n as usize).checked_sub(1).and_then(|i| items.get(i))
}

fn category_reply(text: String) -> Reply {
    Reply::text(text).with_quick_replies([render::QUICK_CART])
}

fn product_reply(category: &Category, products: &[Product], ctx: &ExecutionContext<'_>) -> Reply {
    Reply::text(render::product_list(category, products, ctx.currency()))
        .with_quick_replies([render::QUICK_CART, render::QUICK_BACK])
}

fn quantity_reply(product: &Product, ctx: &ExecutionContext<'_>) -> Reply {
    Reply::text(render::quantity_prompt(product, ctx.currency()))
        .with_quick_replies(["1", "2", "3", render::QUICK_BACK])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::dispatch;
    use crate::handlers::states::test_support::{pizza, BrokenCatalog, Fixture, TENANT};
    use crate::handlers::ExecutionContext;
    use rust_decimal::Decimal;

    async fn at_menu(fixture: &Fixture) -> Conversation {
        let mut conversation = Conversation::new(TENANT, "1");
        dispatch("menu", &mut conversation, &fixture.ctx()).await;
        assert_eq!(conversation.state(), ConversationState::BrowsingMenu);
        conversation
    }

    #[test]
    fn test_parse_add_request() {
        let product = pizza();

        assert_eq!(parse_add_request("2", &product).map(|(q, o)| (q, o.len())), Some((2, 0)));
        assert_eq!(parse_add_request("si", &product).map(|(q, o)| (q, o.len())), Some((1, 0)));

        let (quantity, options) = parse_add_request("3 a b", &product).unwrap();
        assert_eq!(quantity, 3);
        assert_eq!(options.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), vec!["big", "cheese"]);

        let (_, options) = parse_add_request("a a", &product).unwrap();
        assert_eq!(options.len(), 1);

        assert!(parse_add_request("0", &product).is_none());
        assert!(parse_add_request("11", &product).is_none());
        assert!(parse_add_request("2 3", &product).is_none());
        assert!(parse_add_request("2 z", &product).is_none());
        assert!(parse_add_request("quiero pizza", &product).is_none());
        assert!(parse_add_request("", &product).is_none());
    }

    #[tokio::test]
    async fn test_full_browse_and_add_flow() {
        let fixture = Fixture::new();
        let mut conversation = at_menu(&fixture).await;

        dispatch("1", &mut conversation, &fixture.ctx()).await;
        assert_eq!(conversation.state(), ConversationState::SelectingProduct);
        assert_eq!(conversation.selected_category().map(|c| c.id.as_str()), Some("pizzas"));

        let reply = dispatch("1", &mut conversation, &fixture.ctx()).await;
        assert_eq!(conversation.state(), ConversationState::AddingToCart);
        assert!(reply.text.contains("a) Grande"));

        let reply = dispatch("2 a", &mut conversation, &fixture.ctx()).await;
        assert_eq!(conversation.state(), ConversationState::ViewingCart);
        assert!(conversation.selected_product().is_none());
        assert_eq!(conversation.cart().len(), 1);
        assert_eq!(conversation.cart().subtotal(), Decimal::new(240, 0));
        assert!(reply.text.starts_with("Agregado: 2 x Margherita (Grande)"));
    }

    #[tokio::test]
    async fn test_out_of_range_category_reprompts() {
        let fixture = Fixture::new();
        let mut conversation = at_menu(&fixture).await;
        let log_len = conversation.transition_log().len();

        let reply = dispatch("9", &mut conversation, &fixture.ctx()).await;

        assert_eq!(conversation.state(), ConversationState::BrowsingMenu);
        assert_eq!(conversation.transition_log().len(), log_len);
        assert!(reply.text.contains("1. Pizzas"));
    }

    #[tokio::test]
    async fn test_empty_category_stays_in_selecting_category() {
        let fixture = Fixture::new();
        let mut conversation = at_menu(&fixture).await;

        dispatch("3", &mut conversation, &fixture.ctx()).await;
        assert_eq!(conversation.state(), ConversationState::SelectingCategory);

        dispatch("2", &mut conversation, &fixture.ctx()).await;
        assert_eq!(conversation.state(), ConversationState::SelectingProduct);
        assert_eq!(conversation.selected_category().map(|c| c.id.as_str()), Some("drinks"));
    }

    #[tokio::test]
    async fn test_invalid_quantity_keeps_adding_to_cart() {
        let fixture = Fixture::new();
        let mut conversation = at_menu(&fixture).await;
        dispatch("1", &mut conversation, &fixture.ctx()).await;
        dispatch("1", &mut conversation, &fixture.ctx()).await;

        let reply = dispatch("50", &mut conversation, &fixture.ctx()).await;

        assert_eq!(conversation.state(), ConversationState::AddingToCart);
        assert!(conversation.cart().is_empty());
        assert_eq!(reply.text, render::invalid_quantity());
    }

    #[tokio::test]
    async fn test_decline_in_adding_to_cart_returns_to_menu() {
        let fixture = Fixture::new();
        let mut conversation = at_menu(&fixture).await;
        dispatch("1", &mut conversation, &fixture.ctx()).await;
        dispatch("1", &mut conversation, &fixture.ctx()).await;

        dispatch("no", &mut conversation, &fixture.ctx()).await;

        assert_eq!(conversation.state(), ConversationState::BrowsingMenu);
        assert!(conversation.selected_product().is_none());
        assert!(conversation.cart().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_leaves_conversation_untouched() {
        let fixture = Fixture::new();
        let broken = BrokenCatalog;
        let ctx = ExecutionContext::new(&broken, &fixture.orders, &fixture.classifier, &fixture.store);
        let mut conversation = Conversation::new(TENANT, "1");
        let before = conversation.clone();

        let reply = dispatch("menu", &mut conversation, &ctx).await;

        assert_eq!(reply.text, render::apology());
        assert_eq!(conversation.state(), before.state());
        assert!(conversation.transition_log().is_empty());
    }
}
