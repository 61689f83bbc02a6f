use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{FieldValue, FormState},
    error::{RequestError, ValidationError, Violation},
};

/// Body of `POST /predict`. Only obtainable from a [`FormState`] that passed
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct PredictionRequest {
    pub age: i64,
    pub gender: String,
    pub cgpa: f64,
    pub academic_year: String,
    pub hours_of_sleep: f64,
    pub sleep_quality: String,
    pub study_hours_per_day: f64,
    pub social_activity_hours: f64,
    pub screen_time: f64,
    pub physical_activity: String,
    pub academic_pressure: String,
    pub family_income: i64,
    pub part_time_job: bool,
    pub relationship_status: String,
    pub mental_health_support: bool,
}

struct CheckedFields(Vec<(&'static str, FieldValue)>);

impl CheckedFields {
    fn find(&self, name: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    fn mismatch(name: &'static str, expected: &'static str) -> ValidationError {
        ValidationError::single(name, Violation::WrongType { expected })
    }

    fn integer(&self, name: &'static str) -> Result<i64, ValidationError> {
        match self.find(name) {
            Some(FieldValue::Integer(value)) => Ok(*value),
            _ => Err(Self::mismatch(name, "a whole number")),
        }
    }

    fn float(&self, name: &'static str) -> Result<f64, ValidationError> {
        match self.find(name) {
            Some(FieldValue::Float(value)) => Ok(*value),
            _ => Err(Self::mismatch(name, "a number")),
        }
    }

    fn flag(&self, name: &'static str) -> Result<bool, ValidationError> {
        match self.find(name) {
            Some(FieldValue::Boolean(value)) => Ok(*value),
            _ => Err(Self::mismatch(name, "true or false")),
        }
    }

    fn choice(&self, name: &'static str) -> Result<String, ValidationError> {
        match self.find(name) {
            Some(FieldValue::Choice(value)) => Ok(value.to_string()),
            _ => Err(Self::mismatch(name, "one of the listed options")),
        }
    }
}

impl TryFrom<&FormState> for PredictionRequest {
    type Error = ValidationError;

    fn try_from(state: &FormState) -> Result<Self, Self::Error> {
        let fields = CheckedFields(state.validate()?);
        Ok(Self {
            age: fields.integer("age")?,
            gender: fields.choice("gender")?,
            cgpa: fields.float("cgpa")?,
            academic_year: fields.choice("academic_year")?,
            hours_of_sleep: fields.float("hours_of_sleep")?,
            sleep_quality: fields.choice("sleep_quality")?,
            study_hours_per_day: fields.float("study_hours_per_day")?,
            social_activity_hours: fields.float("social_activity_hours")?,
            screen_time: fields.float("screen_time")?,
            physical_activity: fields.choice("physical_activity")?,
            academic_pressure: fields.choice("academic_pressure")?,
            family_income: fields.integer("family_income")?,
            part_time_job: fields.flag("part_time_job")?,
            relationship_status: fields.choice("relationship_status")?,
            mental_health_support: fields.flag("mental_health_support")?,
        })
    }
}

/// Success body of `POST /predict` as sent by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    pub stress_level: String,
    pub confidence: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    pub confidence: f64,
    pub recommendations: Vec<String>,
}

impl PredictionResult {
    pub fn decode(body: &[u8]) -> Result<Self, RequestError> {
        let response: PredictionResponse = serde_json::from_slice(body)
            .map_err(|e| RequestError::decode(format!("malformed prediction body: {e}")))?;
        Self::try_from(response)
    }

    pub fn level(&self) -> StressLevel {
        StressLevel::from_label(&self.label)
    }

    /// Confidence rendered with one decimal, e.g. `82.0%`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

impl TryFrom<PredictionResponse> for PredictionResult {
    type Error = RequestError;

    fn try_from(response: PredictionResponse) -> Result<Self, Self::Error> {
        if response.stress_level.trim().is_empty() {
            return Err(RequestError::decode("stress_level is empty"));
        }
        if !(0.0..=1.0).contains(&response.confidence) {
            return Err(RequestError::decode(format!(
                "confidence {} is outside 0..=1",
                response.confidence
            )));
        }

        Ok(Self {
            label: response.stress_level,
            confidence: response.confidence,
            recommendations: response.recommendations,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressLevel {
    Low,
    Moderate,
    High,
    Unrecognized,
}

impl StressLevel {
    /// The service answers `Moderate`; `Medium` names the same level.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "moderate" | "medium" => Self::Moderate,
            "high" => Self::High,
            _ => Self::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body produced by the service on failure, e.g. `{"detail": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorBody {
    pub detail: serde_json::Value,
}

impl ServiceErrorBody {
    pub fn detail_text(body: &[u8]) -> Option<String> {
        let parsed: ServiceErrorBody = serde_json::from_slice(body).ok()?;
        match parsed.detail {
            serde_json::Value::String(text) => Some(text),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}
