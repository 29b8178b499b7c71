//! Constraint evaluation.
//!
//! Every operator is a pure predicate over one context field. Misconfiguration (missing context
//! value, unparseable number/date/version, unrecognized operator) evaluates to `false`; nothing
//! here returns an error.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::DateTime;
use semver::Version;
use serde::Serialize;

use crate::{Constraint, Context, Operator, Timestamp};

/// A constraint together with its resolved boolean, preserved for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedConstraint {
    #[serde(flatten)]
    pub constraint: Constraint,
    pub result: bool,
}

/// Outcome of evaluating a constraint list: the AND over all entries plus per-constraint detail.
///
/// An empty list evaluates to `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintsResult {
    pub result: bool,
    pub constraints: Vec<EvaluatedConstraint>,
}

pub fn evaluate_constraints(
    context: &Context,
    constraints: &[Constraint],
    now: Timestamp,
) -> ConstraintsResult {
    let constraints: Vec<EvaluatedConstraint> = constraints
        .iter()
        .map(|constraint| EvaluatedConstraint {
            result: eval_constraint(constraint, context, now),
            constraint: constraint.clone(),
        })
        .collect();
    let result = constraints.iter().all(|it| it.result);
    ConstraintsResult {
        result,
        constraints,
    }
}

/// Evaluate a single constraint against the context.
///
/// For known operators, `inverted` negates the result after evaluation, so an inverted constraint
/// on a missing context field is `true`. An unrecognized operator is `false` outright, inverted or
/// not.
pub fn eval_constraint(constraint: &Constraint, context: &Context, now: Timestamp) -> bool {
    if constraint.operator == Operator::Unknown {
        return false;
    }
    let result = constraint.operator.eval(constraint, context, now);
    if constraint.inverted {
        !result
    } else {
        result
    }
}

impl Operator {
    /// Applying the operator to the context. Returns `false` if the operator cannot be applied or
    /// there's a misconfiguration.
    fn eval(self, constraint: &Constraint, context: &Context, now: Timestamp) -> bool {
        self.try_eval(constraint, context, now).unwrap_or(false)
    }

    /// Try applying the operator to the context, returning `None` if the operator cannot be
    /// applied.
    fn try_eval(self, constraint: &Constraint, context: &Context, now: Timestamp) -> Option<bool> {
        match self {
            Self::In | Self::NotIn => {
                let context_value = context.get(&constraint.context_name)?;
                let is_in = clean_values(&constraint.values).any(|v| v == context_value.as_ref());
                let has_to_be_in = self == Self::In;
                Some(is_in == has_to_be_in)
            }

            Self::StrContains | Self::StrStartsWith | Self::StrEndsWith => {
                let context_value = context.get(&constraint.context_name)?;
                let case_insensitive = constraint.case_insensitive;
                let context_value = if case_insensitive {
                    context_value.to_lowercase()
                } else {
                    context_value.into_owned()
                };
                let matches = clean_values(&constraint.values).any(|value| {
                    let value = if case_insensitive {
                        Cow::Owned(value.to_lowercase())
                    } else {
                        Cow::Borrowed(value)
                    };
                    match self {
                        Self::StrContains => context_value.contains(value.as_ref()),
                        Self::StrStartsWith => context_value.starts_with(value.as_ref()),
                        Self::StrEndsWith => context_value.ends_with(value.as_ref()),
                        // unreachable
                        _ => false,
                    }
                });
                Some(matches)
            }

            Self::NumEq | Self::NumGt | Self::NumGte | Self::NumLt | Self::NumLte => {
                let context_value: f64 = context.get(&constraint.context_name)?.trim().parse().ok()?;
                let value: f64 = constraint.value.as_deref()?.trim().parse().ok()?;
                // partial_cmp is None for NaN, which then evaluates to false.
                let ordering = context_value.partial_cmp(&value)?;
                Some(match self {
                    Self::NumEq => ordering == Ordering::Equal,
                    Self::NumGt => ordering == Ordering::Greater,
                    Self::NumGte => ordering != Ordering::Less,
                    Self::NumLt => ordering == Ordering::Less,
                    Self::NumLte => ordering != Ordering::Greater,
                    // unreachable
                    _ => return None,
                })
            }

            Self::DateAfter | Self::DateBefore => {
                // Date constraints always compare the context clock, not the named field.
                let current_time = context.current_time.unwrap_or(now);
                let value = DateTime::parse_from_rfc3339(constraint.value.as_deref()?.trim()).ok()?;
                Some(match self {
                    Self::DateAfter => current_time > value,
                    Self::DateBefore => current_time < value,
                    // unreachable
                    _ => return None,
                })
            }

            Self::SemverEq | Self::SemverGt | Self::SemverLt => {
                let context_version =
                    Version::parse(context.get(&constraint.context_name)?.trim()).ok()?;
                let value = Version::parse(constraint.value.as_deref()?.trim()).ok()?;
                Some(match self {
                    Self::SemverEq => context_version == value,
                    Self::SemverGt => context_version > value,
                    Self::SemverLt => context_version < value,
                    // unreachable
                    _ => return None,
                })
            }

            Self::Unknown => None,
        }
    }
}

/// Comparison lists are cleaned before use: entries trimmed, empty entries dropped.
fn clean_values(values: &[String]) -> impl Iterator<Item = &str> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
}
