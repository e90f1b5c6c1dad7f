//! Customer-facing text
//!
//! Every message body the bot sends is built here so the handlers stay
//! about state and not wording.

use crate::models::{Cart, Category, OrderReceipt, OrderSummary, PaymentDestination, PaymentMethod, Product};
use crate::utils::helpers::format_money;

pub const QUICK_MENU: &str = "Ver menú";
pub const QUICK_CART: &str = "Ver carrito";
pub const QUICK_TRACK: &str = "Rastrear pedido";
pub const QUICK_FINALIZE: &str = "Finalizar";
pub const QUICK_CONTINUE: &str = "Seguir comprando";
pub const QUICK_CLEAR: &str = "Vaciar carrito";
pub const QUICK_BACK: &str = "Volver";
pub const QUICK_YES: &str = "Sí";
pub const QUICK_NO: &str = "No";

pub fn welcome() -> String {
    "¡Hola! Bienvenido. ¿Qué te gustaría hacer?".to_string()
}

pub fn help() -> String {
    "No entendí tu mensaje. Puedes escribir \"menú\" para ver los productos, \
     \"carrito\" para revisar tu pedido o \"rastrear\" para ver el estado de tu último pedido."
        .to_string()
}

pub fn apology() -> String {
    "Lo sentimos, tuvimos un problema procesando tu mensaje. Por favor intenta de nuevo.".to_string()
}

pub fn goodbye() -> String {
    "¡Gracias por visitarnos! Escribe cuando quieras para empezar de nuevo.".to_string()
}

pub fn cancelled() -> String {
    "Listo, volvimos al inicio. Tu carrito sigue guardado.".to_string()
}

pub fn category_list(categories: &[Category]) -> String {
    let mut text = String::from("Estas son nuestras categorías. Escribe el número de la que quieras ver:\n");
    for (i, category) in categories.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, category.name));
    }
    text
}

pub fn empty_catalog() -> String {
    "Por ahora no tenemos productos disponibles. Vuelve a intentarlo más tarde.".to_string()
}

pub fn empty_category(category: &Category, categories: &[Category]) -> String {
    format!(
        "La categoría {} no tiene productos disponibles en este momento.\n\n{}",
        category.name,
        category_list(categories)
    )
}

pub fn product_list(category: &Category, products: &[Product], currency: &str) -> String {
    let mut text = format!("{}. Escribe el número del producto que quieras agregar:\n", category.name);
    for (i, product) in products.iter().enumerate() {
        text.push_str(&format!("\n{}. {} - {}", i + 1, product.name, format_money(product.price, currency)));
        if let Some(description) = &product.description {
            text.push_str(&format!("\n   {}", description));
        }
    }
    text
}

pub fn quantity_prompt(product: &Product, currency: &str) -> String {
    let mut text = format!(
        "{} ({}). ¿Cuántas unidades quieres? Escribe un número del 1 al 10.",
        product.name,
        format_money(product.price, currency)
    );
    if !product.options.is_empty() {
        text.push_str("\n\nOpciones disponibles (agrega las letras después de la cantidad, por ejemplo \"2 a\"):");
        for (i, option) in product.options.iter().enumerate() {
            text.push_str(&format!(
                "\n{}) {} +{}",
                Product::option_label(i),
                option.name,
                format_money(option.price_modifier, currency)
            ));
        }
    }
    text
}

pub fn invalid_quantity() -> String {
    "No pude entender la cantidad. Escribe un número del 1 al 10, opcionalmente seguido de las letras de las opciones."
        .to_string()
}

pub fn cart_view(cart: &Cart, currency: &str) -> String {
    if cart.is_empty() {
        return "Tu carrito está vacío. Escribe \"menú\" para ver los productos.".to_string();
    }

    let mut text = String::from("Tu carrito:\n");
    for line in cart.lines() {
        text.push_str(&format!("\n• {} - {}", line.describe(), format_money(line.line_total(), currency)));
    }
    text.push_str(&format!("\n\nSubtotal: {}", format_money(cart.subtotal(), currency)));
    text
}

pub fn added_to_cart(description: &str, cart: &Cart, currency: &str) -> String {
    format!("Agregado: {}\n\n{}", description, cart_view(cart, currency))
}

pub fn address_prompt() -> String {
    "Escribe la dirección de entrega completa (calle, número y referencia).".to_string()
}

pub fn address_too_short(min_len: usize) -> String {
    format!(
        "La dirección parece incompleta. Escribe al menos {} caracteres con calle y número.",
        min_len
    )
}

pub fn payment_prompt() -> String {
    let mut text = String::from("¿Cómo quieres pagar?\n");
    for (i, method) in PaymentMethod::ALL.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, method.label()));
    }
    text
}

pub fn order_summary(
    cart: &Cart,
    summary: &OrderSummary,
    address: &str,
    method: PaymentMethod,
    currency: &str,
) -> String {
    let mut text = String::from("Resumen de tu pedido:\n");
    for line in cart.lines() {
        text.push_str(&format!("\n• {} - {}", line.describe(), format_money(line.line_total(), currency)));
    }
    text.push_str(&format!(
        "\n\nSubtotal: {}\nEnvío: {}\nTotal: {}\n\nDirección: {}\nPago: {}\n\n¿Confirmas el pedido?",
        format_money(summary.subtotal, currency),
        format_money(summary.delivery_fee, currency),
        format_money(summary.total, currency),
        address,
        method.label()
    ));
    text
}

pub fn transfer_instructions(receipt: &OrderReceipt, destination: &PaymentDestination, currency: &str) -> String {
    let mut text = format!(
        "Pedido {} registrado. Para completarlo transfiere exactamente {} a:\n\nBanco: {}\nTitular: {}\nCuenta: {}",
        receipt.order_number,
        format_money(receipt.total, currency),
        destination.bank_name,
        destination.account_holder,
        destination.account_number
    );
    if let Some(alias) = &destination.alias {
        text.push_str(&format!("\nAlias: {}", alias));
    }
    text.push_str("\n\nTe avisaremos apenas confirmemos el pago.");
    text
}

pub fn order_placed(receipt: &OrderReceipt, eta_minutes: u32, currency: &str) -> String {
    format!(
        "¡Pedido {} confirmado! Total: {}. Tiempo estimado de entrega: {} minutos.",
        receipt.order_number,
        format_money(receipt.total, currency),
        eta_minutes
    )
}

pub fn order_failed() -> String {
    "No pudimos registrar tu pedido en este momento. ¿Quieres intentarlo de nuevo?".to_string()
}

pub fn waiting_for_payment(receipt: Option<&OrderReceipt>, currency: &str) -> String {
    match receipt {
        Some(receipt) => format!(
            "Seguimos esperando la confirmación de tu pago de {} para el pedido {}. Te avisaremos apenas llegue.",
            format_money(receipt.total, currency),
            receipt.order_number
        ),
        None => "Seguimos esperando la confirmación de tu pago. Te avisaremos apenas llegue.".to_string(),
    }
}

pub fn payment_approved(receipt: Option<&OrderReceipt>, eta_minutes: u32) -> String {
    let order = match receipt {
        Some(receipt) => format!("Tu pedido {}", receipt.order_number),
        None => "Tu pedido".to_string(),
    };
    format!(
        "¡Pago confirmado! {} está en preparación. Tiempo estimado de entrega: {} minutos.",
        order, eta_minutes
    )
}

pub fn payment_rejected() -> String {
    "No pudimos confirmar tu pago. Tu carrito sigue guardado: escribe \"carrito\" para intentarlo de nuevo.".to_string()
}

pub fn tracking(receipt: Option<&OrderReceipt>, status_label: Option<&str>) -> String {
    match (receipt, status_label) {
        (Some(receipt), Some(status)) => format!("Tu pedido {} está: {}.", receipt.order_number, status),
        (Some(receipt), None) => format!("Tu último pedido es el {}. Aún no tenemos novedades.", receipt.order_number),
        (None, _) => "Todavía no tienes pedidos registrados.".to_string(),
    }
}

pub fn support() -> String {
    "Un asesor revisará tu mensaje. También puedes escribir \"menú\" para seguir comprando.".to_string()
}

pub fn admin_panel(summary: &str) -> String {
    format!("Panel de administración\n\n{}", summary)
}
