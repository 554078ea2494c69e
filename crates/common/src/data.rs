//! Test data generation for the payment form
//!
//! Every value belongs to a named constraint class ([`DataClass`]). Valid and
//! approved/declined values are fixed; the rest are randomized within their
//! class so repeated runs keep probing the boundaries. The clock and the seed
//! are injected, which keeps a matrix built from the same generator state
//! reproducible.

use chrono::{Datelike, Local, Months, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::rules::{HOLDER_MAX_LEN, HOLDER_MIN_LEN, VALIDITY_YEARS};

/// Card the bank stub always approves
pub const APPROVED_CARD: &str = "4444 4444 4444 4441";

/// Card the bank stub always declines
pub const DECLINED_CARD: &str = "4444 4444 4444 4442";

const FIRST_NAMES: &[&str] = &[
    "IVAN", "MARIA", "ALEXEY", "OLGA", "DMITRY", "ELENA", "SERGEY", "ANNA",
];

const LAST_NAMES: &[&str] = &[
    "PETROV", "IVANOVA", "SMIRNOV", "KUZNETSOVA", "POPOV", "SOKOLOVA", "LEBEDEV",
];

const CYRILLIC_NAMES: &[&str] = &[
    "ИВАН ПЕТРОВ",
    "МАРИЯ ИВАНОВА",
    "АЛЕКСЕЙ СМИРНОВ",
    "ОЛЬГА КУЗНЕЦОВА",
];

/// Constraint class a generated value satisfies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataClass {
    /// Field left blank
    Empty,

    ApprovedCard,
    DeclinedCard,
    /// Sixteen-digit field filled with fifteen digits
    CardNumber15Digits,

    CurrentMonth,
    /// Month one calendar month before today (pair with `PreviousMonthYear`)
    PreviousMonth,
    /// Two digits but outside 01..=12
    MonthFrom13To99,
    ZeroMonth,

    CurrentYear,
    /// Year of the month before today
    PreviousMonthYear,
    /// Inside the validity window
    ValidYear,
    PastYear,
    YearAfterValidity,

    HolderName,
    HolderCyrillic,
    HolderTooShort,
    HolderTooLong,
    HolderMinLength,
    HolderMaxLength,

    Cvc,
    ZeroCvc,

    SingleDigit,
    TwoDigits,
}

/// Deterministic-or-randomized literal generator
pub struct DataGenerator {
    today: NaiveDate,
    rng: StdRng,
}

impl DataGenerator {
    /// Generator bound to the local date and an entropy seed
    pub fn new() -> Self {
        Self {
            today: Local::now().date_naive(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Generator with a fixed clock and an entropy seed
    pub fn on(today: NaiveDate) -> Self {
        Self {
            today,
            rng: StdRng::from_entropy(),
        }
    }

    /// Generator with a fixed clock and seed
    pub fn with_seed(today: NaiveDate, seed: u64) -> Self {
        Self {
            today,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Produce a literal of the given class
    pub fn generate(&mut self, class: DataClass) -> String {
        match class {
            DataClass::Empty => String::new(),
            DataClass::ApprovedCard => self.approved_card(),
            DataClass::DeclinedCard => self.declined_card(),
            DataClass::CardNumber15Digits => self.card_number_15_digits(),
            DataClass::CurrentMonth => self.current_month(),
            DataClass::PreviousMonth => self.previous_month(),
            DataClass::MonthFrom13To99 => self.month_from_13_to_99(),
            DataClass::ZeroMonth => self.zero_month(),
            DataClass::CurrentYear => self.current_year(),
            DataClass::PreviousMonthYear => self.previous_month_year(),
            DataClass::ValidYear => self.valid_year(),
            DataClass::PastYear => self.past_year(),
            DataClass::YearAfterValidity => self.year_after_validity(),
            DataClass::HolderName => self.holder_name(),
            DataClass::HolderCyrillic => self.holder_cyrillic(),
            DataClass::HolderTooShort => self.holder_too_short(),
            DataClass::HolderTooLong => self.holder_too_long(),
            DataClass::HolderMinLength => self.latin_letters(HOLDER_MIN_LEN),
            DataClass::HolderMaxLength => self.latin_letters(HOLDER_MAX_LEN),
            DataClass::Cvc => self.cvc(),
            DataClass::ZeroCvc => self.zero_cvc(),
            DataClass::SingleDigit => self.digits(1),
            DataClass::TwoDigits => self.digits(2),
        }
    }

    pub fn approved_card(&self) -> String {
        APPROVED_CARD.to_string()
    }

    pub fn declined_card(&self) -> String {
        DECLINED_CARD.to_string()
    }

    pub fn card_number_15_digits(&mut self) -> String {
        self.digits(15)
    }

    pub fn current_month(&self) -> String {
        format!("{:02}", self.today.month())
    }

    pub fn previous_month(&self) -> String {
        format!("{:02}", self.month_before_today().month())
    }

    pub fn month_from_13_to_99(&mut self) -> String {
        self.rng.gen_range(13..=99u32).to_string()
    }

    pub fn zero_month(&self) -> String {
        "00".to_string()
    }

    pub fn current_year(&self) -> String {
        two_digit_year(self.today.year())
    }

    pub fn previous_month_year(&self) -> String {
        two_digit_year(self.month_before_today().year())
    }

    pub fn valid_year(&mut self) -> String {
        let offset = self.rng.gen_range(1..=VALIDITY_YEARS);
        two_digit_year(self.today.year() + offset)
    }

    pub fn past_year(&mut self) -> String {
        let offset = self.rng.gen_range(1..=3);
        two_digit_year(self.today.year() - offset)
    }

    pub fn year_after_validity(&mut self) -> String {
        let offset = VALIDITY_YEARS + self.rng.gen_range(1..=3);
        two_digit_year(self.today.year() + offset)
    }

    pub fn holder_name(&mut self) -> String {
        let first = FIRST_NAMES.choose(&mut self.rng).copied().unwrap_or("IVAN");
        let last = LAST_NAMES.choose(&mut self.rng).copied().unwrap_or("PETROV");
        format!("{first} {last}")
    }

    pub fn holder_cyrillic(&mut self) -> String {
        CYRILLIC_NAMES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("ИВАН ПЕТРОВ")
            .to_string()
    }

    pub fn holder_too_short(&mut self) -> String {
        let len = self.rng.gen_range(1..HOLDER_MIN_LEN);
        self.latin_letters(len)
    }

    pub fn holder_too_long(&mut self) -> String {
        self.latin_letters(HOLDER_MAX_LEN + 1)
    }

    pub fn cvc(&mut self) -> String {
        format!("{:03}", self.rng.gen_range(1..=999u32))
    }

    pub fn zero_cvc(&self) -> String {
        "000".to_string()
    }

    fn digits(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    fn latin_letters(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(self.rng.gen_range(b'A'..=b'Z')))
            .collect()
    }

    fn month_before_today(&self) -> NaiveDate {
        self.today
            .checked_sub_months(Months::new(1))
            .unwrap_or(self.today)
    }
}

impl Default for DataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn two_digit_year(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn generator() -> DataGenerator {
        DataGenerator::with_seed(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), 7)
    }

    #[test]
    fn test_same_seed_same_values() {
        let mut a = generator();
        let mut b = generator();
        for class in [DataClass::HolderName, DataClass::Cvc, DataClass::CardNumber15Digits] {
            assert_eq!(a.generate(class), b.generate(class));
        }
    }

    #[test]
    fn test_dates_follow_clock() {
        let mut gen = generator();
        assert_eq!(gen.generate(DataClass::CurrentMonth), "10");
        assert_eq!(gen.generate(DataClass::CurrentYear), "26");
        assert_eq!(gen.generate(DataClass::PreviousMonth), "09");
        assert_eq!(gen.generate(DataClass::PreviousMonthYear), "26");
    }

    #[test]
    fn test_previous_month_wraps_year_in_january() {
        let gen = DataGenerator::with_seed(NaiveDate::from_ymd_opt(2027, 1, 5).unwrap(), 1);
        assert_eq!(gen.previous_month(), "12");
        assert_eq!(gen.previous_month_year(), "26");
    }

    #[test]
    fn test_year_windows() {
        let mut gen = generator();
        for _ in 0..50 {
            let valid: i32 = gen.valid_year().parse().unwrap();
            assert!((27..=31).contains(&valid), "valid year {valid}");
            let past: i32 = gen.past_year().parse().unwrap();
            assert!((23..=25).contains(&past), "past year {past}");
            let after: i32 = gen.year_after_validity().parse().unwrap();
            assert!((32..=34).contains(&after), "year after window {after}");
        }
    }

    #[test]
    fn test_month_out_of_range() {
        let mut gen = generator();
        for _ in 0..50 {
            let month: u32 = gen.month_from_13_to_99().parse().unwrap();
            assert!((13..=99).contains(&month));
        }
    }

    #[test_case(DataClass::CardNumber15Digits, 15 ; "fifteen digit number")]
    #[test_case(DataClass::SingleDigit, 1 ; "single digit")]
    #[test_case(DataClass::TwoDigits, 2 ; "two digits")]
    #[test_case(DataClass::Cvc, 3 ; "cvc")]
    fn test_digit_lengths(class: DataClass, len: usize) {
        let mut gen = generator();
        let value = gen.generate(class);
        assert_eq!(value.len(), len);
        assert!(value.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_cvc_is_never_zero() {
        let mut gen = generator();
        for _ in 0..200 {
            assert_ne!(gen.cvc(), "000");
        }
    }

    #[test]
    fn test_holder_lengths() {
        let mut gen = generator();
        assert_eq!(gen.generate(DataClass::HolderMinLength).len(), HOLDER_MIN_LEN);
        assert_eq!(gen.generate(DataClass::HolderMaxLength).len(), HOLDER_MAX_LEN);
        assert_eq!(gen.generate(DataClass::HolderTooLong).len(), HOLDER_MAX_LEN + 1);
        let short = gen.generate(DataClass::HolderTooShort);
        assert!(!short.is_empty() && short.len() < HOLDER_MIN_LEN);
    }

    #[test]
    fn test_cyrillic_holder_is_not_ascii() {
        let mut gen = generator();
        assert!(!gen.holder_cyrillic().is_ascii());
    }
}
