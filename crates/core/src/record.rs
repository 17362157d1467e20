//! Patient record model, validation, and derived fields.
//!
//! A record enters the system as a [`RecordDraft`] (the caller-supplied
//! fields) and leaves validation as a [`PatientRecord`] carrying the derived
//! `bmi` and `verdict` values. Derivation happens in explicit pure functions
//! at construction time, so every write path recomputes the derived fields
//! from the current height/weight.

use crate::error::{PatientError, PatientResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Gender of a patient.
///
/// The same enumeration is accepted by both the create payload and the
/// partial patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Others,
}

impl Gender {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Others => "others",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weight-category verdict derived from BMI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Verdict {
    Underweight,
    Normal,
    Obese,
}

impl Verdict {
    /// Classifies a BMI value: below 18.5 is underweight, below 30 is
    /// normal, 30 and above is obese.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Verdict::Underweight
        } else if bmi < 30.0 {
            Verdict::Normal
        } else {
            Verdict::Obese
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Verdict::Underweight => "Underweight",
            Verdict::Normal => "Normal",
            Verdict::Obese => "Obese",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computes body-mass-index from height (metres) and weight (kilograms),
/// rounded to two decimal places.
pub fn bmi(height: f64, weight: f64) -> f64 {
    round2(weight / (height * height))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Caller-supplied record fields, prior to validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDraft {
    pub name: String,
    pub city: String,
    pub age: u32,
    pub gender: Gender,
    pub height: f64,
    pub weight: f64,
}

impl RecordDraft {
    /// Validates the field invariants and returns the record with freshly
    /// computed derived fields.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::Validation` naming the offending field if
    /// `age`, `height`, or `weight` is not greater than zero.
    pub fn validate(self) -> PatientResult<PatientRecord> {
        if self.age == 0 {
            return Err(PatientError::Validation {
                field: "age",
                message: "must be greater than 0".into(),
            });
        }
        if self.height <= 0.0 {
            return Err(PatientError::Validation {
                field: "height",
                message: "must be greater than 0".into(),
            });
        }
        if self.weight <= 0.0 {
            return Err(PatientError::Validation {
                field: "weight",
                message: "must be greater than 0".into(),
            });
        }

        let bmi = bmi(self.height, self.weight);
        Ok(PatientRecord {
            name: self.name,
            city: self.city,
            age: self.age,
            gender: self.gender,
            height: self.height,
            weight: self.weight,
            bmi,
            verdict: Verdict::from_bmi(bmi),
        })
    }
}

/// Payload for creating a patient: the collection key plus the record fields.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPatient {
    /// Unique identifier of the patient, e.g. "P001".
    pub id: String,
    pub name: String,
    /// City where the patient is living.
    pub city: String,
    pub age: u32,
    pub gender: Gender,
    /// Height of the patient in metres.
    pub height: f64,
    /// Weight of the patient in kilograms.
    pub weight: f64,
}

impl NewPatient {
    /// Splits the payload into the collection key and the record fields.
    pub fn into_parts(self) -> (String, RecordDraft) {
        (
            self.id,
            RecordDraft {
                name: self.name,
                city: self.city,
                age: self.age,
                gender: self.gender,
                height: self.height,
                weight: self.weight,
            },
        )
    }
}

/// Partial patch for an existing patient: any subset of the non-id fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl RecordPatch {
    /// Overlays the fields present in the patch onto a stored record object.
    /// Fields absent from the patch are left untouched.
    pub fn apply_to(self, fields: &mut Map<String, Value>) {
        if let Some(name) = self.name {
            fields.insert("name".into(), Value::String(name));
        }
        if let Some(city) = self.city {
            fields.insert("city".into(), Value::String(city));
        }
        if let Some(age) = self.age {
            fields.insert("age".into(), Value::from(age));
        }
        if let Some(gender) = self.gender {
            fields.insert("gender".into(), Value::String(gender.as_str().to_owned()));
        }
        if let Some(height) = self.height {
            fields.insert("height".into(), Value::from(height));
        }
        if let Some(weight) = self.weight {
            fields.insert("weight".into(), Value::from(weight));
        }
    }
}

/// A validated patient record including derived fields.
///
/// Serializes to the stored representation: the `id` is carried only as the
/// collection key and never appears inside the value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientRecord {
    pub name: String,
    pub city: String,
    pub age: u32,
    pub gender: Gender,
    pub height: f64,
    pub weight: f64,
    /// Body-mass-index, recomputed from height/weight on every write.
    pub bmi: f64,
    /// Weight-category verdict derived from the BMI.
    pub verdict: Verdict,
}

impl PatientRecord {
    /// Converts the record into its stored JSON representation.
    pub fn to_stored(&self) -> PatientResult<Value> {
        serde_json::to_value(self).map_err(PatientError::Serialization)
    }
}
