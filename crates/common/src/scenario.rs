//! Scenario matrix and declarative YAML scenarios

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::data::{DataClass, DataGenerator};
use crate::error::{Error, Result};
use crate::rules;
use crate::types::{CardInput, ExpectedOutcome, FormField, PurchaseMode, UiOutcome};

/// One submission of the payment form and what it must produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub mode: PurchaseMode,
    pub input: CardInput,
    pub expected: ExpectedOutcome,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Scenario {
    /// Check the expectation against the form rules
    pub fn verify(&self, gen: &DataGenerator) -> Result<()> {
        let predicted = rules::predict(&self.input, gen.today());
        if predicted != self.expected {
            return Err(Error::InvalidScenario {
                name: self.name.clone(),
                reason: format!(
                    "expects {:?} but the form rules give {:?}",
                    self.expected, predicted
                ),
            });
        }
        Ok(())
    }

    /// Whether the scenario carries `tag`; every scenario is tagged with its mode
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Row of the standard matrix: field classes plus the expected UI feedback.
/// `None` means the expectation depends on the clock and comes from the rules.
struct Case {
    id: u8,
    name: &'static str,
    fields: [DataClass; 5],
    expected: Option<ExpectedOutcome>,
}

const fn fields(
    number: DataClass,
    month: DataClass,
    year: DataClass,
    holder: DataClass,
    cvc: DataClass,
) -> [DataClass; 5] {
    [number, month, year, holder, cvc]
}

const VALID: [DataClass; 5] = fields(
    DataClass::ApprovedCard,
    DataClass::CurrentMonth,
    DataClass::ValidYear,
    DataClass::HolderName,
    DataClass::Cvc,
);

const fn replace(field: FormField, class: DataClass) -> [DataClass; 5] {
    let mut row = VALID;
    row[field as usize] = class;
    row
}

fn rejected(ui: UiOutcome) -> Option<ExpectedOutcome> {
    Some(ExpectedOutcome::rejected(ui))
}

fn standard_cases() -> Vec<Case> {
    use DataClass::*;
    use UiOutcome::*;

    vec![
        Case { id: 1, name: "approved card", fields: VALID, expected: Some(ExpectedOutcome::approved()) },
        Case { id: 2, name: "declined card", fields: replace(FormField::Number, DeclinedCard), expected: Some(ExpectedOutcome::declined()) },
        Case { id: 3, name: "empty card number", fields: replace(FormField::Number, Empty), expected: rejected(InvalidFormat) },
        Case { id: 4, name: "empty month", fields: replace(FormField::Month, Empty), expected: rejected(InvalidFormat) },
        Case { id: 5, name: "empty year", fields: replace(FormField::Year, Empty), expected: rejected(InvalidFormat) },
        Case { id: 6, name: "empty holder", fields: replace(FormField::Holder, Empty), expected: rejected(FieldRequired) },
        Case { id: 7, name: "empty cvc", fields: replace(FormField::Cvc, Empty), expected: rejected(InvalidFormat) },
        Case { id: 8, name: "15-digit card number", fields: replace(FormField::Number, CardNumber15Digits), expected: rejected(InvalidFormat) },
        Case {
            id: 9,
            name: "month before current",
            fields: fields(ApprovedCard, PreviousMonth, PreviousMonthYear, HolderName, Cvc),
            expected: None,
        },
        Case {
            id: 10,
            name: "month 13-99",
            fields: fields(ApprovedCard, MonthFrom13To99, CurrentYear, HolderName, Cvc),
            expected: rejected(ExpirationInvalid),
        },
        Case {
            id: 11,
            name: "month 00",
            fields: fields(ApprovedCard, ZeroMonth, CurrentYear, HolderName, Cvc),
            expected: rejected(ExpirationInvalid),
        },
        Case { id: 12, name: "single-digit month", fields: replace(FormField::Month, SingleDigit), expected: rejected(InvalidFormat) },
        Case { id: 13, name: "single-digit year", fields: replace(FormField::Year, SingleDigit), expected: rejected(InvalidFormat) },
        Case { id: 14, name: "year before current", fields: replace(FormField::Year, PastYear), expected: rejected(CardExpired) },
        Case { id: 15, name: "year past validity", fields: replace(FormField::Year, YearAfterValidity), expected: rejected(ExpirationInvalid) },
        Case { id: 16, name: "cyrillic holder", fields: replace(FormField::Holder, HolderCyrillic), expected: rejected(InvalidFormat) },
        Case { id: 17, name: "short holder", fields: replace(FormField::Holder, HolderTooShort), expected: rejected(InvalidFormat) },
        Case { id: 18, name: "long holder", fields: replace(FormField::Holder, HolderTooLong), expected: rejected(InvalidFormat) },
        Case { id: 19, name: "holder of 4 letters", fields: replace(FormField::Holder, HolderMinLength), expected: Some(ExpectedOutcome::approved()) },
        Case { id: 20, name: "holder of 66 letters", fields: replace(FormField::Holder, HolderMaxLength), expected: Some(ExpectedOutcome::approved()) },
        Case { id: 21, name: "cvc 000", fields: replace(FormField::Cvc, ZeroCvc), expected: rejected(InvalidFormat) },
        Case { id: 22, name: "cvc one digit", fields: replace(FormField::Cvc, SingleDigit), expected: rejected(InvalidFormat) },
        Case { id: 23, name: "cvc two digits", fields: replace(FormField::Cvc, TwoDigits), expected: rejected(InvalidFormat) },
    ]
}

fn build_input(gen: &mut DataGenerator, classes: &[DataClass; 5]) -> CardInput {
    FormField::ALL
        .into_iter()
        .zip(classes.iter())
        .fold(CardInput::default(), |input, (field, class)| {
            input.with(field, gen.generate(*class))
        })
}

/// The enumerated scenario set
pub struct ScenarioMatrix;

impl ScenarioMatrix {
    /// Standard matrix for every purchase mode; inputs are drawn fresh per scenario
    pub fn standard(gen: &mut DataGenerator) -> Vec<Scenario> {
        PurchaseMode::ALL
            .into_iter()
            .flat_map(|mode| Self::for_mode(gen, mode))
            .collect()
    }

    /// Standard matrix for one purchase mode
    pub fn for_mode(gen: &mut DataGenerator, mode: PurchaseMode) -> Vec<Scenario> {
        standard_cases()
            .into_iter()
            .map(|case| {
                let input = build_input(gen, &case.fields);
                let expected = case
                    .expected
                    .unwrap_or_else(|| rules::predict(&input, gen.today()));
                Scenario {
                    name: format!("{} {:02} {}", mode, case.id, case.name),
                    mode,
                    input,
                    expected,
                    tags: vec![mode.to_string()],
                }
            })
            .collect()
    }
}

/// Value source for one field of a YAML scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSource {
    Literal { literal: String },
    Class(DataClass),
}

impl FieldSource {
    fn resolve(&self, gen: &mut DataGenerator) -> String {
        match self {
            FieldSource::Literal { literal } => literal.clone(),
            FieldSource::Class(class) => gen.generate(*class),
        }
    }
}

/// A scenario declared in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Modes to run in; both when omitted
    #[serde(default = "default_modes")]
    pub modes: Vec<PurchaseMode>,

    /// Field values; omitted fields take the valid default for their position
    #[serde(default)]
    pub fields: BTreeMap<FormField, FieldSource>,

    /// Expected outcome; derived from the form rules when omitted
    #[serde(default)]
    pub expect: Option<ExpectedOutcome>,
}

fn default_modes() -> Vec<PurchaseMode> {
    PurchaseMode::ALL.to_vec()
}

impl ScenarioSpec {
    /// Parse a scenario spec from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.modes.is_empty() {
            return Err(Error::InvalidScenario {
                name: spec.name,
                reason: "modes must not be empty".to_string(),
            });
        }
        Ok(spec)
    }

    /// Parse a scenario spec from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all scenario specs from a directory
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            debug!("Loading scenario spec {}", entry.path().display());
            specs.push(Self::from_file(entry.path())?);
        }

        Ok(specs)
    }

    /// Materialize one scenario per requested mode
    pub fn scenarios(&self, gen: &mut DataGenerator) -> Vec<Scenario> {
        self.modes
            .iter()
            .map(|&mode| {
                let input = FormField::ALL
                    .into_iter()
                    .zip(VALID.iter())
                    .fold(CardInput::default(), |input, (field, default)| {
                        let value = match self.fields.get(&field) {
                            Some(source) => source.resolve(gen),
                            None => gen.generate(*default),
                        };
                        input.with(field, value)
                    });
                let expected = self
                    .expect
                    .unwrap_or_else(|| rules::predict(&input, gen.today()));
                let mut tags = self.tags.clone();
                tags.push(mode.to_string());
                Scenario {
                    name: format!("{} {}", mode, self.name),
                    mode,
                    input,
                    expected,
                    tags,
                }
            })
            .collect()
    }
}
