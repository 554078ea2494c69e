//! Client-side validation rules of the payment form
//!
//! [`predict`] maps a [`CardInput`] to the outcome the page renders for it.
//! The scenario matrix uses it to derive date-dependent expectations and to
//! cross-check every hand-written one.
//!
//! Expiry boundary: a year before the current one is "card expired"; a month
//! outside 01..=12, a year past the validity window, or an earlier month of
//! the current year is "expiration invalid". Syntactic problems always win
//! over both and render "incorrect format".

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

use crate::data::{APPROVED_CARD, DECLINED_CARD};
use crate::types::{CardInput, ExpectedOutcome, FormField, PersistedExpectation, UiOutcome};

/// Years after the current one a card may still be valid
pub const VALIDITY_YEARS: i32 = 5;

/// Holder name length bounds, inclusive
pub const HOLDER_MIN_LEN: usize = 4;
pub const HOLDER_MAX_LEN: usize = 66;

const CARD_DIGITS: usize = 16;

fn holder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]+(?:[ \-][A-Za-z]+)*$").expect("holder pattern compiles")
    })
}

/// A field the page flags, with the feedback it renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFault {
    pub field: FormField,
    pub outcome: UiOutcome,
}

impl FieldFault {
    fn new(field: FormField, outcome: UiOutcome) -> Self {
        Self { field, outcome }
    }
}

/// Every field fault, in page order
pub fn validate(input: &CardInput, today: NaiveDate) -> Vec<FieldFault> {
    let mut faults = Vec::new();

    if !is_card_number(&input.number) {
        faults.push(FieldFault::new(FormField::Number, UiOutcome::InvalidFormat));
    }

    let month = two_digits(&input.month);
    match month {
        None => faults.push(FieldFault::new(FormField::Month, UiOutcome::InvalidFormat)),
        Some(m) if m == 0 || m > 12 => {
            faults.push(FieldFault::new(FormField::Month, UiOutcome::ExpirationInvalid))
        }
        Some(_) => {}
    }

    match two_digits(&input.year) {
        None => faults.push(FieldFault::new(FormField::Year, UiOutcome::InvalidFormat)),
        Some(yy) => {
            let year = expand_year(yy, today);
            if year < today.year() {
                faults.push(FieldFault::new(FormField::Year, UiOutcome::CardExpired));
            } else if year > today.year() + VALIDITY_YEARS {
                faults.push(FieldFault::new(FormField::Year, UiOutcome::ExpirationInvalid));
            } else if year == today.year() {
                if let Some(m) = month.filter(|m| (1..=12).contains(m)) {
                    if m < today.month() {
                        faults.push(FieldFault::new(FormField::Month, UiOutcome::ExpirationInvalid));
                    }
                }
            }
        }
    }

    let holder = input.holder.trim();
    if holder.is_empty() {
        faults.push(FieldFault::new(FormField::Holder, UiOutcome::FieldRequired));
    } else if !is_holder_name(holder) {
        faults.push(FieldFault::new(FormField::Holder, UiOutcome::InvalidFormat));
    }

    match digits_of_len(&input.cvc, 3) {
        Some(cvc) if cvc != "000" => {}
        _ => faults.push(FieldFault::new(FormField::Cvc, UiOutcome::InvalidFormat)),
    }

    faults
}

/// Outcome the page renders for this submission
pub fn predict(input: &CardInput, today: NaiveDate) -> ExpectedOutcome {
    let faults = validate(input, today);
    let shown = faults
        .iter()
        .find(|f| matches!(f.outcome, UiOutcome::InvalidFormat | UiOutcome::FieldRequired))
        .or_else(|| faults.first());
    if let Some(fault) = shown {
        return ExpectedOutcome::rejected(fault.outcome);
    }

    let number = compact(&input.number);
    if number == compact(APPROVED_CARD) {
        ExpectedOutcome::approved()
    } else if number == compact(DECLINED_CARD) {
        ExpectedOutcome::declined()
    } else {
        // Unknown cards are refused by the gateway before a row is written.
        ExpectedOutcome {
            ui: UiOutcome::Declined,
            persisted: PersistedExpectation::none(),
        }
    }
}

fn is_card_number(raw: &str) -> bool {
    let digits = compact(raw);
    digits.len() == CARD_DIGITS && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_holder_name(holder: &str) -> bool {
    let len = holder.chars().count();
    (HOLDER_MIN_LEN..=HOLDER_MAX_LEN).contains(&len) && holder_pattern().is_match(holder)
}

fn two_digits(raw: &str) -> Option<u32> {
    digits_of_len(raw, 2).and_then(|d| d.parse().ok())
}

fn digits_of_len(raw: &str, len: usize) -> Option<&str> {
    let trimmed = raw.trim();
    (trimmed.len() == len && trimmed.chars().all(|c| c.is_ascii_digit())).then_some(trimmed)
}

fn compact(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Full year nearest to `today` ending in `yy`, so windows that cross a century still resolve
fn expand_year(yy: u32, today: NaiveDate) -> i32 {
    let century = today.year() - today.year().rem_euclid(100);
    [century - 100, century, century + 100]
        .into_iter()
        .map(|c| c + yy as i32)
        .min_by_key(|year| (year - today.year()).abs())
        .unwrap_or(century + yy as i32)
}
