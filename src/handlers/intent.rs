//! Intent classification
//!
//! Handlers never look at keywords directly; they ask an [`IntentClassifier`]
//! what the user meant. [`KeywordClassifier`] is the stock implementation:
//! ordered keyword rules compiled into regexes over normalized text.

use regex::Regex;

use crate::utils::errors::{OrderBuddyError, Result};
use crate::utils::helpers::normalize_text;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    ShowMenu,
    ShowCart,
    TrackOrder,
    Support,
    Admin,
    Affirm,
    Decline,
    Back,
    Finalize,
    ClearCart,
    ContinueShopping,
    Cancel,
    EndSession,
    Number(u32),
    Unknown,
}

/// Maps raw message text to an [`Intent`]
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

/// How a rule's phrases are matched against the normalized message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The whole message must be one of the phrases
    Exact,
    /// One of the phrases must appear as whole words
    Contains,
}

/// One keyword rule
#[derive(Debug, Clone)]
pub struct KeywordRule {
    intent: Intent,
    pattern: Regex,
}

impl KeywordRule {
    /// Compile a rule. Phrases are normalized the same way messages are.
    pub fn new(intent: Intent, mode: MatchMode, phrases: &[&str]) -> Result<Self> {
        let alternatives: Vec<String> = phrases
            .iter()
            .map(|p| normalize_text(p))
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(&p))
            .collect();

        if alternatives.is_empty() {
            return Err(OrderBuddyError::Config(format!("keyword rule for {:?} has no phrases", intent)));
        }

        let body = alternatives.join("|");
        let source = match mode {
            MatchMode::Exact => format!("^(?:{})$", body),
            MatchMode::Contains => format!(r"(?:^|\s)(?:{})(?:\s|$)", body),
        };

        let pattern = Regex::new(&source)
            .map_err(|e| OrderBuddyError::Config(format!("invalid keyword rule for {:?}: {}", intent, e)))?;

        Ok(Self { intent, pattern })
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    fn matches(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

/// Ordered keyword rules; the first matching rule wins
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    /// Add a rule that takes precedence over every existing rule
    pub fn with_priority_rule(mut self, rule: KeywordRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    /// Spanish keyword set with common English fallbacks
    pub fn spanish() -> Result<Self> {
        use Intent::*;
        use MatchMode::*;

        let rules = vec![
            KeywordRule::new(EndSession, Exact, &["adios", "chau", "chao", "terminar", "fin", "/fin", "bye"])?,
            KeywordRule::new(Cancel, Exact, &["cancelar", "salir", "cancel", "menu principal", "/cancelar"])?,
            KeywordRule::new(Admin, Contains, &["/admin"])?,
            KeywordRule::new(
                Affirm,
                Exact,
                &["si", "s", "sip", "claro", "dale", "ok", "okay", "yes", "y", "confirmar", "confirmo", "si confirmo", "agregar", "add", "de acuerdo"],
            )?,
            KeywordRule::new(Decline, Exact, &["no", "n", "nop", "no gracias", "nope"])?,
            KeywordRule::new(Back, Exact, &["volver", "atras", "regresar", "back"])?,
            KeywordRule::new(Finalize, Contains, &["finalizar", "pagar", "checkout", "confirmar pedido", "terminar compra"])?,
            KeywordRule::new(ClearCart, Contains, &["vaciar", "limpiar carrito", "borrar carrito", "clear cart"])?,
            KeywordRule::new(ContinueShopping, Contains, &["seguir comprando", "continuar", "seguir", "agregar mas", "keep shopping"])?,
            KeywordRule::new(ShowCart, Contains, &["carrito", "cart"])?,
            KeywordRule::new(
                TrackOrder,
                Contains,
                &["rastrear", "seguimiento", "estado de mi pedido", "estado del pedido", "donde esta mi pedido", "track"],
            )?,
            KeywordRule::new(ShowMenu, Contains, &["menu", "carta", "catalogo", "productos", "pedir", "ordenar"])?,
            KeywordRule::new(Support, Contains, &["ayuda", "soporte", "help", "asesor", "humano"])?,
            KeywordRule::new(
                Greeting,
                Contains,
                &["hola", "buenas", "buenos dias", "buenas tardes", "buenas noches", "saludos", "hey", "hi", "hello", "/start"],
            )?,
        ];

        Ok(Self::new(rules))
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Intent::Unknown;
        }

        if normalized.chars().all(|c| c.is_ascii_digit()) {
            return normalized.parse().map(Intent::Number).unwrap_or(Intent::Unknown);
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(KeywordRule::intent)
            .unwrap_or(Intent::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::spanish().unwrap()
    }

    #[test]
    fn test_greetings() {
        let c = classifier();
        assert_eq!(c.classify("hola"), Intent::Greeting);
        assert_eq!(c.classify("¡Buenas tardes!"), Intent::Greeting);
        assert_eq!(c.classify("/start"), Intent::Greeting);
    }

    #[test]
    fn test_quick_reply_labels() {
        let c = classifier();
        assert_eq!(c.classify("Ver menú"), Intent::ShowMenu);
        assert_eq!(c.classify("Ver carrito"), Intent::ShowCart);
        assert_eq!(c.classify("Rastrear pedido"), Intent::TrackOrder);
        assert_eq!(c.classify("Seguir comprando"), Intent::ContinueShopping);
        assert_eq!(c.classify("Vaciar carrito"), Intent::ClearCart);
        assert_eq!(c.classify("Finalizar"), Intent::Finalize);
        assert_eq!(c.classify("Sí"), Intent::Affirm);
        assert_eq!(c.classify("No"), Intent::Decline);
    }

    #[test]
    fn test_more_specific_rules_win() {
        let c = classifier();
        assert_eq!(c.classify("hola, quiero ver el menu"), Intent::ShowMenu);
        assert_eq!(c.classify("quiero vaciar mi carrito"), Intent::ClearCart);
    }

    #[test]
    fn test_exact_rules_do_not_match_inside_sentences() {
        let c = classifier();
        assert_eq!(c.classify("Jr. Los Olivos no 123, Lima"), Intent::Unknown);
        assert_eq!(c.classify("nombre"), Intent::Unknown);
        assert_eq!(c.classify("salir"), Intent::Cancel);
    }

    #[test]
    fn test_numbers() {
        let c = classifier();
        assert_eq!(c.classify(" 2 "), Intent::Number(2));
        assert_eq!(c.classify("99999999999999999999"), Intent::Unknown);
        assert_eq!(c.classify(""), Intent::Unknown);
        assert_eq!(c.classify("???"), Intent::Unknown);
    }

    #[test]
    fn test_admin_command() {
        let c = classifier();
        assert_eq!(c.classify("/admin"), Intent::Admin);
        assert_eq!(c.classify("admin"), Intent::Unknown);
    }

    #[test]
    fn test_priority_rule_overrides() {
        let c = classifier().with_priority_rule(
            KeywordRule::new(Intent::ShowMenu, MatchMode::Contains, &["hola"]).unwrap(),
        );
        assert_eq!(c.classify("hola"), Intent::ShowMenu);
    }

    #[test]
    fn test_empty_rule_rejected() {
        assert!(KeywordRule::new(Intent::Support, MatchMode::Exact, &["  ", "!"]).is_err());
    }
}
