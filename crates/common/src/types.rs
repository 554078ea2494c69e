//! Core types for the checkout form model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Purchase flow offered on the tour page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseMode {
    Debit,
    Credit,
}

impl PurchaseMode {
    pub const ALL: [PurchaseMode; 2] = [PurchaseMode::Debit, PurchaseMode::Credit];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseMode::Debit => "debit",
            PurchaseMode::Credit => "credit",
        }
    }

    /// Caption of the button that opens this form
    pub fn button_text(&self) -> &'static str {
        match self {
            PurchaseMode::Debit => "Купить",
            PurchaseMode::Credit => "Купить в кредит",
        }
    }

    /// Heading rendered once the form is open
    pub fn heading_text(&self) -> &'static str {
        match self {
            PurchaseMode::Debit => "Оплата по карте",
            PurchaseMode::Credit => "Кредит по данным карты",
        }
    }

    /// Table the bank verdict for this mode is written to
    pub fn status_table(&self) -> &'static str {
        match self {
            PurchaseMode::Debit => "payment_entity",
            PurchaseMode::Credit => "credit_request_entity",
        }
    }
}

impl fmt::Display for PurchaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input on the payment form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Number,
    Month,
    Year,
    Holder,
    Cvc,
}

impl FormField {
    /// Fields in the order they appear on the page
    pub const ALL: [FormField; 5] = [
        FormField::Number,
        FormField::Month,
        FormField::Year,
        FormField::Holder,
        FormField::Cvc,
    ];

    /// Visible label next to the input
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Number => "Номер карты",
            FormField::Month => "Месяц",
            FormField::Year => "Год",
            FormField::Holder => "Владелец",
            FormField::Cvc => "CVC/CVV",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Number => "number",
            FormField::Month => "month",
            FormField::Year => "year",
            FormField::Holder => "holder",
            FormField::Cvc => "cvc",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submission worth of card data. A blank string means the field is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInput {
    pub number: String,
    pub month: String,
    pub year: String,
    pub holder: String,
    pub cvc: String,
}

impl CardInput {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Number => &self.number,
            FormField::Month => &self.month,
            FormField::Year => &self.year,
            FormField::Holder => &self.holder,
            FormField::Cvc => &self.cvc,
        }
    }

    pub fn with(mut self, field: FormField, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            FormField::Number => self.number = value,
            FormField::Month => self.month = value,
            FormField::Year => self.year = value,
            FormField::Holder => self.holder = value,
            FormField::Cvc => self.cvc = value,
        }
        self
    }

    /// Fields that carry a value, in page order
    pub fn filled(&self) -> impl Iterator<Item = (FormField, &str)> + '_ {
        FormField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
            .filter(|(_, value)| !value.trim().is_empty())
    }
}

/// Bank verdict as stored by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Approved,
    Declined,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Declined => "DECLINED",
        }
    }

    /// Parse the status column; unknown values yield None
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "APPROVED" => Some(TransactionStatus::Approved),
            "DECLINED" => Some(TransactionStatus::Declined),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback the page is expected to render after submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiOutcome {
    Success,
    Declined,
    FieldRequired,
    InvalidFormat,
    ExpirationInvalid,
    CardExpired,
}

/// Element whose visibility encodes the page feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    SuccessBanner,
    DeclineBanner,
    IncorrectFormat,
    FieldRequired,
    ExpirationInvalid,
    CardExpired,
}

impl Marker {
    pub const ALL: [Marker; 6] = [
        Marker::SuccessBanner,
        Marker::DeclineBanner,
        Marker::IncorrectFormat,
        Marker::FieldRequired,
        Marker::ExpirationInvalid,
        Marker::CardExpired,
    ];

    /// Exact text the page renders for this marker
    pub fn text(&self) -> &'static str {
        match self {
            Marker::SuccessBanner => "Операция одобрена Банком.",
            Marker::DeclineBanner => "Ошибка! Банк отказал в проведении операции.",
            Marker::IncorrectFormat => "Неверный формат",
            Marker::FieldRequired => "Поле обязательно для заполнения",
            Marker::ExpirationInvalid => "Неверно указан срок действия карты",
            Marker::CardExpired => "Истёк срок действия карты",
        }
    }

    /// Banners come back from the bank stub, markers are rendered client-side
    pub fn is_banner(&self) -> bool {
        matches!(self, Marker::SuccessBanner | Marker::DeclineBanner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// A single visibility assertion against the rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerCheck {
    pub marker: Marker,
    pub visibility: Visibility,
}

impl MarkerCheck {
    pub fn visible(marker: Marker) -> Self {
        Self { marker, visibility: Visibility::Visible }
    }

    pub fn hidden(marker: Marker) -> Self {
        Self { marker, visibility: Visibility::Hidden }
    }
}

/// What the database should hold once the submission settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedExpectation {
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub count: u64,
}

impl PersistedExpectation {
    pub fn none() -> Self {
        Self { status: None, count: 0 }
    }

    pub fn recorded(status: TransactionStatus) -> Self {
        Self { status: Some(status), count: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    pub ui: UiOutcome,
    #[serde(default = "PersistedExpectation::none")]
    pub persisted: PersistedExpectation,
}

impl ExpectedOutcome {
    pub fn approved() -> Self {
        Self {
            ui: UiOutcome::Success,
            persisted: PersistedExpectation::recorded(TransactionStatus::Approved),
        }
    }

    pub fn declined() -> Self {
        Self {
            ui: UiOutcome::Declined,
            persisted: PersistedExpectation::recorded(TransactionStatus::Declined),
        }
    }

    /// A client-side rejection: nothing reaches the backend
    pub fn rejected(ui: UiOutcome) -> Self {
        Self { ui, persisted: PersistedExpectation::none() }
    }

    /// Visibility checks implied by the UI outcome, in the order they are asserted
    pub fn checks(&self) -> Vec<MarkerCheck> {
        match self.ui {
            UiOutcome::Success => vec![MarkerCheck::visible(Marker::SuccessBanner)],
            UiOutcome::Declined => vec![MarkerCheck::visible(Marker::DeclineBanner)],
            UiOutcome::FieldRequired => vec![
                MarkerCheck::hidden(Marker::IncorrectFormat),
                MarkerCheck::visible(Marker::FieldRequired),
            ],
            UiOutcome::InvalidFormat => vec![
                MarkerCheck::hidden(Marker::FieldRequired),
                MarkerCheck::visible(Marker::IncorrectFormat),
            ],
            UiOutcome::ExpirationInvalid => vec![
                MarkerCheck::hidden(Marker::FieldRequired),
                MarkerCheck::hidden(Marker::IncorrectFormat),
                MarkerCheck::visible(Marker::ExpirationInvalid),
            ],
            UiOutcome::CardExpired => vec![
                MarkerCheck::hidden(Marker::FieldRequired),
                MarkerCheck::hidden(Marker::IncorrectFormat),
                MarkerCheck::visible(Marker::CardExpired),
            ],
        }
    }
}
