//! Locators for the tour page and its payment form
//!
//! Elements are found by the text a user sees. Inputs and notification bodies
//! are reached through the parent of their label, the way the page nests them.

use checkout_common::{FormField, Marker, PurchaseMode};
use serde::Serialize;

/// How the bridge finds an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// `tag` element whose whole text is `text`
    ExactText { tag: String, text: String },

    /// Innermost element showing exactly `text`
    Text { text: String },

    /// `selector` under the parent of the element showing `anchor`
    Sibling { anchor: String, selector: String },
}

impl Locator {
    fn exact(tag: &str, text: &str) -> Self {
        Locator::ExactText { tag: tag.to_string(), text: text.to_string() }
    }

    fn sibling(anchor: &str, selector: &str) -> Self {
        Locator::Sibling { anchor: anchor.to_string(), selector: selector.to_string() }
    }
}

const MAIN_HEADING: &str = "Путешествие дня";
const CONTINUE_BUTTON: &str = "Продолжить";
const INPUT_CONTROL: &str = ".input__control";
const NOTIFICATION_CONTENT: &str = ".notification__content";

/// Page object for the tour page
pub struct PaymentPage;

impl PaymentPage {
    /// Heading that proves the tour page rendered
    pub fn main_heading() -> Locator {
        Locator::exact("h2", MAIN_HEADING)
    }

    pub fn mode_button(mode: PurchaseMode) -> Locator {
        Locator::exact("button", mode.button_text())
    }

    pub fn mode_heading(mode: PurchaseMode) -> Locator {
        Locator::exact("h3", mode.heading_text())
    }

    pub fn field(field: FormField) -> Locator {
        Locator::sibling(field.label(), INPUT_CONTROL)
    }

    pub fn continue_button() -> Locator {
        Locator::exact("button", CONTINUE_BUTTON)
    }

    pub fn marker(marker: Marker) -> Locator {
        if marker.is_banner() {
            Locator::sibling(marker.text(), NOTIFICATION_CONTENT)
        } else {
            Locator::Text { text: marker.text().to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_locator_serializes_for_bridge() {
        let json = serde_json::to_value(PaymentPage::field(FormField::Cvc)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "sibling", "anchor": "CVC/CVV", "selector": ".input__control" })
        );
    }

    #[test]
    fn test_banners_resolve_through_notification_content() {
        assert_eq!(
            PaymentPage::marker(Marker::DeclineBanner),
            Locator::sibling("Ошибка! Банк отказал в проведении операции.", ".notification__content")
        );
        assert_eq!(
            PaymentPage::marker(Marker::CardExpired),
            Locator::Text { text: "Истёк срок действия карты".to_string() }
        );
    }

    #[test]
    fn test_mode_locators() {
        assert_eq!(
            PaymentPage::mode_button(PurchaseMode::Credit),
            Locator::exact("button", "Купить в кредит")
        );
        assert_eq!(
            PaymentPage::mode_heading(PurchaseMode::Debit),
            Locator::exact("h3", "Оплата по карте")
        );
    }
}
