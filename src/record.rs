// 📋 Health Record - form input + derived metrics
// Wire names stay in Portuguese so existing data.json files and
// spreadsheets keep loading.

use crate::metrics::{bmi_category, compute_bmi, risk_score};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

// ============================================================================
// ENUMERATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "Masculino")]
    Male,
    #[serde(rename = "Feminino")]
    Female,
    #[serde(rename = "Outro")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YesNo {
    #[serde(rename = "Sim")]
    Yes,
    #[serde(rename = "Não")]
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Habits {
    #[serde(rename = "Saudável")]
    Healthy,
    #[serde(rename = "Moderado")]
    Moderate,
    #[serde(rename = "Ruim")]
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BmiCategory {
    #[serde(rename = "Abaixo do peso")]
    Underweight,
    Normal,
    #[serde(rename = "Sobrepeso")]
    Overweight,
    #[serde(rename = "Obesidade")]
    Obese,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Alto")]
    High,
    #[serde(rename = "Moderado")]
    Moderate,
    #[serde(rename = "Baixo")]
    Low,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Masculino",
            Sex::Female => "Feminino",
            Sex::Other => "Outro",
        }
    }
}

impl YesNo {
    pub const ALL: [YesNo; 2] = [YesNo::No, YesNo::Yes];

    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Sim",
            YesNo::No => "Não",
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

impl Habits {
    pub const ALL: [Habits; 3] = [Habits::Healthy, Habits::Moderate, Habits::Poor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Habits::Healthy => "Saudável",
            Habits::Moderate => "Moderado",
            Habits::Poor => "Ruim",
        }
    }
}

impl BmiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Abaixo do peso",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Sobrepeso",
            BmiCategory::Obese => "Obesidade",
        }
    }
}

impl RiskLevel {
    /// Display order used by the risk distribution.
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Moderate, RiskLevel::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "Alto",
            RiskLevel::Moderate => "Moderado",
            RiskLevel::Low => "Baixo",
        }
    }
}

macro_rules! impl_label_traits {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

impl_label_traits!(Sex, YesNo, Habits, BmiCategory, RiskLevel);

/// Parse a label case-insensitively, also accepting the unaccented spelling
/// ("Nao", "Saudavel") since those are what people type on a terminal.
fn parse_label<T: Copy>(input: &str, options: &[(T, &[&str])], what: &str) -> Result<T, String> {
    let wanted = input.trim().to_lowercase();
    options
        .iter()
        .find(|(_, names)| names.iter().any(|n| n.to_lowercase() == wanted))
        .map(|(value, _)| *value)
        .ok_or_else(|| format!("invalid {}: '{}'", what, input))
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label(
            s,
            &[
                (Sex::Male, &["Masculino", "M"]),
                (Sex::Female, &["Feminino", "F"]),
                (Sex::Other, &["Outro", "O"]),
            ],
            "sexo",
        )
    }
}

impl FromStr for YesNo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label(
            s,
            &[(YesNo::Yes, &["Sim", "S"]), (YesNo::No, &["Não", "Nao", "N"])],
            "sim/não",
        )
    }
}

impl FromStr for Habits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label(
            s,
            &[
                (Habits::Healthy, &["Saudável", "Saudavel"]),
                (Habits::Moderate, &["Moderado"]),
                (Habits::Poor, &["Ruim"]),
            ],
            "habitos",
        )
    }
}

// ============================================================================
// FORM INPUT
// ============================================================================

/// What the user types into the form. Unknown keys (including any
/// client-computed imc/categoria/risco) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthInput {
    #[serde(rename = "sexo")]
    pub sex: Sex,

    #[serde(rename = "idade", deserialize_with = "lenient::u32")]
    pub age: u32,

    #[serde(rename = "peso", deserialize_with = "lenient::f64")]
    pub weight: f64,

    #[serde(rename = "altura", deserialize_with = "lenient::f64")]
    pub height: f64,

    pub diabetes: YesNo,

    #[serde(rename = "hipertensao")]
    pub hypertension: YesNo,

    #[serde(rename = "habitos")]
    pub habits: Habits,
}

impl Default for HealthInput {
    fn default() -> Self {
        HealthInput {
            sex: Sex::Male,
            age: 25,
            weight: 70.0,
            height: 1.75,
            diabetes: YesNo::No,
            hypertension: YesNo::No,
            habits: Habits::Moderate,
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// One submitted health entry. Immutable once built: `bmi`, `category`
/// and `risk` are only ever produced by [`Record::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "lenient::i64")]
    pub id: i64,

    #[serde(rename = "sexo")]
    pub sex: Sex,

    #[serde(rename = "idade", deserialize_with = "lenient::u32")]
    pub age: u32,

    #[serde(rename = "peso", deserialize_with = "lenient::f64")]
    pub weight: f64,

    #[serde(rename = "altura", deserialize_with = "lenient::f64")]
    pub height: f64,

    pub diabetes: YesNo,

    #[serde(rename = "hipertensao")]
    pub hypertension: YesNo,

    #[serde(rename = "habitos")]
    pub habits: Habits,

    #[serde(rename = "imc", deserialize_with = "lenient::f64")]
    pub bmi: f64,

    #[serde(rename = "categoria")]
    pub category: BmiCategory,

    #[serde(rename = "risco")]
    pub risk: RiskLevel,
}

/// Derived values, as computed from the input fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub bmi: f64,
    pub category: BmiCategory,
    pub risk: RiskLevel,
}

impl Derived {
    pub fn from_input(input: &HealthInput) -> Self {
        let bmi = compute_bmi(input.weight, input.height);
        Derived {
            bmi,
            category: bmi_category(bmi),
            risk: risk_score(
                input.age,
                bmi,
                input.diabetes,
                input.hypertension,
                input.habits,
            ),
        }
    }
}

impl Record {
    /// Build a record from validated input. Derived fields are computed here
    /// and nowhere else.
    pub fn new(id: i64, input: &HealthInput) -> Self {
        let derived = Derived::from_input(input);

        Record {
            id,
            sex: input.sex,
            age: input.age,
            weight: input.weight,
            height: input.height,
            diabetes: input.diabetes,
            hypertension: input.hypertension,
            habits: input.habits,
            bmi: derived.bmi,
            category: derived.category,
            risk: derived.risk,
        }
    }

    pub fn input(&self) -> HealthInput {
        HealthInput {
            sex: self.sex,
            age: self.age,
            weight: self.weight,
            height: self.height,
            diabetes: self.diabetes,
            hypertension: self.hypertension,
            habits: self.habits,
        }
    }

    pub fn recompute_derived(&self) -> Derived {
        Derived::from_input(&self.input())
    }

    /// True when the stored derived values match a fresh computation.
    /// Rows edited by hand in a spreadsheet are the usual reason this fails.
    pub fn has_consistent_derived(&self) -> bool {
        let derived = self.recompute_derived();
        derived.bmi == self.bmi && derived.category == self.category && derived.risk == self.risk
    }
}

/// Sort newest first (id descending) and cap the collection.
pub fn newest_first(mut records: Vec<Record>, limit: usize) -> Vec<Record> {
    records.sort_by(|a, b| b.id.cmp(&a.id));
    records.truncate(limit);
    records
}

// ============================================================================
// ID GENERATION
// ============================================================================

/// Timestamp ids (epoch millis) that never repeat or go backwards within
/// the process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

// ============================================================================
// LENIENT NUMBERS
// ============================================================================

/// Spreadsheet backends hand cell values back as strings ("70", "1.75").
/// These accept either a JSON number or a numeric string.
mod lenient {
    use super::*;
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(serde_json::Number),
        Text(String),
    }

    fn as_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("number out of range: {}", n))),
            NumberOrString::Text(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("not a number: '{}'", s))),
        }
    }

    pub fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        as_f64(deserializer)
    }

    pub fn i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = as_f64(deserializer)?;
        if value.fract() != 0.0 {
            return Err(D::Error::custom(format!("expected an integer, got {}", value)));
        }
        Ok(value as i64)
    }

    pub fn u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = as_f64(deserializer)?;
        if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
            return Err(D::Error::custom(format!("expected a whole number, got {}", value)));
        }
        Ok(value as u32)
    }
}
