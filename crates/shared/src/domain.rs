use std::borrow::Cow;

use crate::error::{FieldViolation, UnknownField, ValidationError, Violation};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Integer { min: i64, max: Option<i64> },
    Float { min: f64, max: f64 },
    Boolean,
    Choice { allowed: &'static [&'static str] },
}

impl FieldKind {
    pub fn expected(&self) -> &'static str {
        match self {
            Self::Integer { .. } => "a whole number",
            Self::Float { .. } => "a number",
            Self::Boolean => "true or false",
            Self::Choice { .. } => "one of the listed options",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Choice(Cow<'static, str>),
}

impl FieldValue {
    pub const fn choice(value: &'static str) -> Self {
        Self::Choice(Cow::Borrowed(value))
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Choice(v) => write!(f, "{v}"),
        }
    }
}

/// What an input widget reports: typed text or a checkbox toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Checked(bool),
}

impl From<&str> for RawInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for RawInput {
    fn from(value: bool) -> Self {
        Self::Checked(value)
    }
}

/// Current content of one form slot. Input that failed coercion is kept
/// verbatim so the front end can show it back to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    Value(FieldValue),
    Invalid { raw: String, expected: &'static str },
}

impl FieldEntry {
    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Invalid { .. } => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormFieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: FieldValue,
}

pub const GENDERS: &[&str] = &[
    "Male",
    "Female",
    "Non-binary",
    "Genderfluid",
    "Genderqueer",
    "Bigender",
    "Polygender",
];
pub const ACADEMIC_YEARS: &[&str] = &["2023-2024", "2024-2025", "2025-2026"];
pub const SLEEP_QUALITIES: &[&str] = &["poor", "good"];
pub const PHYSICAL_ACTIVITY_LEVELS: &[&str] = &["sedentary", "moderate"];
pub const ACADEMIC_PRESSURE_LEVELS: &[&str] = &["low", "medium"];
pub const RELATIONSHIP_STATUSES: &[&str] = &["single", "in a relationship"];

const HOURS_PER_DAY: FieldKind = FieldKind::Float { min: 0.0, max: 24.0 };

pub static STUDENT_STRESS_FIELDS: [FormFieldSpec; 15] = [
    FormFieldSpec {
        name: "age",
        label: "Age",
        kind: FieldKind::Integer {
            min: 15,
            max: Some(100),
        },
        default: FieldValue::Integer(20),
    },
    FormFieldSpec {
        name: "gender",
        label: "Gender",
        kind: FieldKind::Choice { allowed: GENDERS },
        default: FieldValue::choice("Male"),
    },
    FormFieldSpec {
        name: "cgpa",
        label: "CGPA (0-10)",
        kind: FieldKind::Float {
            min: 0.0,
            max: 10.0,
        },
        default: FieldValue::Float(7.5),
    },
    FormFieldSpec {
        name: "academic_year",
        label: "Academic Year",
        kind: FieldKind::Choice {
            allowed: ACADEMIC_YEARS,
        },
        default: FieldValue::choice("2024-2025"),
    },
    FormFieldSpec {
        name: "hours_of_sleep",
        label: "Hours of Sleep",
        kind: HOURS_PER_DAY,
        default: FieldValue::Float(7.0),
    },
    FormFieldSpec {
        name: "sleep_quality",
        label: "Sleep Quality",
        kind: FieldKind::Choice {
            allowed: SLEEP_QUALITIES,
        },
        default: FieldValue::choice("good"),
    },
    FormFieldSpec {
        name: "study_hours_per_day",
        label: "Study Hours Per Day",
        kind: HOURS_PER_DAY,
        default: FieldValue::Float(5.0),
    },
    FormFieldSpec {
        name: "social_activity_hours",
        label: "Social Activity Hours",
        kind: HOURS_PER_DAY,
        default: FieldValue::Float(2.0),
    },
    FormFieldSpec {
        name: "screen_time",
        label: "Screen Time (hours)",
        kind: HOURS_PER_DAY,
        default: FieldValue::Float(4.0),
    },
    FormFieldSpec {
        name: "physical_activity",
        label: "Physical Activity",
        kind: FieldKind::Choice {
            allowed: PHYSICAL_ACTIVITY_LEVELS,
        },
        default: FieldValue::choice("moderate"),
    },
    FormFieldSpec {
        name: "academic_pressure",
        label: "Academic Pressure",
        kind: FieldKind::Choice {
            allowed: ACADEMIC_PRESSURE_LEVELS,
        },
        default: FieldValue::choice("medium"),
    },
    FormFieldSpec {
        name: "family_income",
        label: "Family Income",
        kind: FieldKind::Integer { min: 0, max: None },
        default: FieldValue::Integer(50_000),
    },
    FormFieldSpec {
        name: "part_time_job",
        label: "Part-time Job",
        kind: FieldKind::Boolean,
        default: FieldValue::Boolean(false),
    },
    FormFieldSpec {
        name: "relationship_status",
        label: "Relationship Status",
        kind: FieldKind::Choice {
            allowed: RELATIONSHIP_STATUSES,
        },
        default: FieldValue::choice("single"),
    },
    FormFieldSpec {
        name: "mental_health_support",
        label: "Receiving Mental Health Support",
        kind: FieldKind::Boolean,
        default: FieldValue::Boolean(false),
    },
];

pub fn field_spec(name: &str) -> Option<&'static FormFieldSpec> {
    STUDENT_STRESS_FIELDS.iter().find(|spec| spec.name == name)
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "checked" => Some(true),
        "false" | "no" | "off" | "0" | "unchecked" | "" => Some(false),
        _ => None,
    }
}

impl FormFieldSpec {
    pub fn coerce(&self, raw: RawInput) -> FieldEntry {
        let expected = self.kind.expected();
        let invalid = |raw: String| FieldEntry::Invalid { raw, expected };

        match (self.kind, raw) {
            (FieldKind::Boolean, RawInput::Checked(checked)) => {
                FieldEntry::Value(FieldValue::Boolean(checked))
            }
            (FieldKind::Boolean, RawInput::Text(text)) => match parse_flag(&text) {
                Some(flag) => FieldEntry::Value(FieldValue::Boolean(flag)),
                None => invalid(text),
            },
            (_, RawInput::Checked(checked)) => invalid(checked.to_string()),
            (FieldKind::Integer { .. }, RawInput::Text(text)) => match text.trim().parse::<i64>() {
                Ok(parsed) => FieldEntry::Value(FieldValue::Integer(parsed)),
                Err(_) => invalid(text),
            },
            (FieldKind::Float { .. }, RawInput::Text(text)) => match text.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => FieldEntry::Value(FieldValue::Float(parsed)),
                _ => invalid(text),
            },
            (FieldKind::Choice { .. }, RawInput::Text(text)) => {
                FieldEntry::Value(FieldValue::Choice(Cow::Owned(text)))
            }
        }
    }

    /// Checks one entry against this field's type and bounds, returning the
    /// value that would be sent.
    pub fn check(&self, entry: &FieldEntry) -> Result<FieldValue, Violation> {
        let value = match entry {
            FieldEntry::Value(value) => value,
            FieldEntry::Invalid { raw, expected } => {
                return Err(Violation::Unparseable {
                    raw: raw.clone(),
                    expected: *expected,
                })
            }
        };
        let wrong_type = || Violation::WrongType {
            expected: self.kind.expected(),
        };

        match (self.kind, value) {
            (FieldKind::Integer { min, max }, FieldValue::Integer(actual)) => {
                if *actual < min {
                    return Err(Violation::BelowMinimum {
                        min: min.to_string(),
                        actual: actual.to_string(),
                    });
                }
                if let Some(max) = max.filter(|max| actual > max) {
                    return Err(Violation::AboveMaximum {
                        max: max.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
            (FieldKind::Float { min, max }, FieldValue::Float(actual)) => {
                if !actual.is_finite() {
                    return Err(wrong_type());
                }
                if *actual < min {
                    return Err(Violation::BelowMinimum {
                        min: min.to_string(),
                        actual: actual.to_string(),
                    });
                }
                if *actual > max {
                    return Err(Violation::AboveMaximum {
                        max: max.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
            (FieldKind::Boolean, FieldValue::Boolean(_)) => {}
            (FieldKind::Choice { allowed }, FieldValue::Choice(actual)) => {
                if !allowed.iter().any(|option| *option == &**actual) {
                    return Err(Violation::NotAllowed {
                        actual: actual.to_string(),
                        allowed,
                    });
                }
            }
            _ => return Err(wrong_type()),
        }

        Ok(value.clone())
    }

    /// Human readable constraint, e.g. `15..=100` or `one of: poor, good`.
    pub fn describe_constraint(&self) -> String {
        match self.kind {
            FieldKind::Integer { min, max: Some(max) } => format!("whole number {min}..={max}"),
            FieldKind::Integer { min, max: None } => format!("whole number >= {min}"),
            FieldKind::Float { min, max } => format!("number {min}..={max}"),
            FieldKind::Boolean => "true/false".to_string(),
            FieldKind::Choice { allowed } => format!("one of: {}", allowed.join(", ")),
        }
    }
}

/// Values of every schema field, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    entries: Vec<FieldEntry>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            entries: STUDENT_STRESS_FIELDS
                .iter()
                .map(|spec| FieldEntry::Value(spec.default.clone()))
                .collect(),
        }
    }
}

impl FormState {
    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        let idx = STUDENT_STRESS_FIELDS
            .iter()
            .position(|spec| spec.name == name)?;
        self.entries.get(idx)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name).and_then(FieldEntry::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static FormFieldSpec, &FieldEntry)> {
        STUDENT_STRESS_FIELDS.iter().zip(self.entries.iter())
    }

    pub fn invalid_fields(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, entry)| entry.is_invalid())
            .map(|(spec, _)| spec.name)
            .collect()
    }

    pub fn apply(&mut self, name: &str, raw: RawInput) -> Result<&FieldEntry, UnknownField> {
        let idx = STUDENT_STRESS_FIELDS
            .iter()
            .position(|spec| spec.name == name)
            .ok_or_else(|| UnknownField::new(name))?;
        let entry = STUDENT_STRESS_FIELDS[idx].coerce(raw);
        self.entries[idx] = entry;
        Ok(&self.entries[idx])
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validates every entry and returns the checked values keyed by field
    /// name. All violations are reported, not only the first.
    pub fn validate(&self) -> Result<Vec<(&'static str, FieldValue)>, ValidationError> {
        let mut values = Vec::with_capacity(self.entries.len());
        let mut violations = Vec::new();
        for (spec, entry) in self.iter() {
            match spec.check(entry) {
                Ok(value) => values.push((spec.name, value)),
                Err(violation) => violations.push(FieldViolation {
                    field: spec.name,
                    violation,
                }),
            }
        }

        if violations.is_empty() {
            Ok(values)
        } else {
            Err(ValidationError::new(violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> &'static FormFieldSpec {
        field_spec(name).expect("known field")
    }

    #[test]
    fn field_names_are_unique() {
        let mut names: Vec<_> = STUDENT_STRESS_FIELDS.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), STUDENT_STRESS_FIELDS.len());
    }

    #[test]
    fn defaults_satisfy_their_own_constraints() {
        let state = FormState::default();
        let values = state.validate().expect("defaults are valid");
        assert_eq!(values.len(), STUDENT_STRESS_FIELDS.len());
        assert_eq!(state.value("age"), Some(&FieldValue::Integer(20)));
        assert_eq!(state.value("gender"), Some(&FieldValue::choice("Male")));
    }

    #[test]
    fn coerces_by_declared_kind() {
        assert_eq!(
            spec("age").coerce(" 21 ".into()),
            FieldEntry::Value(FieldValue::Integer(21))
        );
        assert_eq!(
            spec("cgpa").coerce("8.25".into()),
            FieldEntry::Value(FieldValue::Float(8.25))
        );
        assert_eq!(
            spec("part_time_job").coerce(true.into()),
            FieldEntry::Value(FieldValue::Boolean(true))
        );
        assert_eq!(
            spec("part_time_job").coerce("off".into()),
            FieldEntry::Value(FieldValue::Boolean(false))
        );
        assert_eq!(
            spec("sleep_quality").coerce("poor".into()),
            FieldEntry::Value(FieldValue::choice("poor"))
        );
    }

    #[test]
    fn unparseable_text_becomes_invalid_marker() {
        assert_eq!(
            spec("age").coerce("twenty".into()),
            FieldEntry::Invalid {
                raw: "twenty".into(),
                expected: "a whole number"
            }
        );
        assert!(spec("age").coerce("20.5".into()).is_invalid());
        assert!(spec("cgpa").coerce("NaN".into()).is_invalid());
        assert!(spec("cgpa").coerce(true.into()).is_invalid());
        assert!(spec("mental_health_support").coerce("maybe".into()).is_invalid());
    }

    #[test]
    fn check_reports_bounds() {
        let age = spec("age");
        assert_eq!(
            age.check(&FieldEntry::Value(FieldValue::Integer(14))),
            Err(Violation::BelowMinimum {
                min: "15".into(),
                actual: "14".into()
            })
        );
        assert_eq!(
            age.check(&FieldEntry::Value(FieldValue::Integer(101))),
            Err(Violation::AboveMaximum {
                max: "100".into(),
                actual: "101".into()
            })
        );
        assert!(spec("family_income")
            .check(&FieldEntry::Value(FieldValue::Integer(9_000_000)))
            .is_ok());
        assert!(spec("screen_time")
            .check(&FieldEntry::Value(FieldValue::Float(24.5)))
            .is_err());
        assert!(matches!(
            spec("gender").check(&FieldEntry::Value(FieldValue::choice("Robot"))),
            Err(Violation::NotAllowed { .. })
        ));
    }

    #[test]
    fn apply_rejects_unknown_field() {
        let mut state = FormState::default();
        let err = state.apply("shoe_size", "42".into()).expect_err("unknown");
        assert_eq!(err, UnknownField::new("shoe_size"));
        assert_eq!(state, FormState::default());
    }

    #[test]
    fn validate_collects_all_violations() {
        let mut state = FormState::default();
        state.apply("age", "14".into()).expect("age");
        state.apply("cgpa", "abc".into()).expect("cgpa");
        state.apply("academic_year", "1999-2000".into()).expect("year");

        let err = state.validate().expect_err("invalid");
        assert_eq!(err.fields(), vec!["age", "cgpa", "academic_year"]);
        assert_eq!(state.invalid_fields(), vec!["cgpa"]);
    }

    #[test]
    fn describes_constraints() {
        assert_eq!(spec("age").describe_constraint(), "whole number 15..=100");
        assert_eq!(spec("family_income").describe_constraint(), "whole number >= 0");
        assert_eq!(spec("cgpa").describe_constraint(), "number 0..=10");
        assert_eq!(
            spec("sleep_quality").describe_constraint(),
            "one of: poor, good"
        );
    }
}
