//! Evaluation result shapes.

use serde::de::{Deserializer, Error as _, Unexpected};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::{Context, EvaluatedConstraint, EvaluatedSegment, Parameters, Str, Variant, VariantDef};

/// Tri-state enablement.
///
/// `Unknown` means "not provably true, but not safely false either": some strategy could not be
/// evaluated from the context snapshot, so the feature may be enabled in a live evaluation.
/// Collapsing `Unknown` into `Disabled` would silently change what preview tooling reports, so
/// the three states are kept distinct all the way to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Enabled,
    Disabled,
    Unknown,
}

impl Decision {
    /// Definite `true`, as opposed to `Disabled` or `Unknown`.
    pub fn is_enabled(self) -> bool {
        self == Decision::Enabled
    }
}

impl From<bool> for Decision {
    fn from(value: bool) -> Decision {
        if value {
            Decision::Enabled
        } else {
            Decision::Disabled
        }
    }
}

// On the wire the tri-state is `true`, `false`, or the string "unknown".
impl Serialize for Decision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Decision::Enabled => serializer.serialize_bool(true),
            Decision::Disabled => serializer.serialize_bool(false),
            Decision::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Decision, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Bool(bool),
            Text(String),
        }
        match Wire::deserialize(deserializer)? {
            Wire::Bool(value) => Ok(value.into()),
            Wire::Text(text) if text == "unknown" => Ok(Decision::Unknown),
            Wire::Text(text) => Err(D::Error::invalid_value(
                Unexpected::Str(&text),
                &"a boolean or \"unknown\"",
            )),
        }
    }
}

impl log::kv::ToValue for Decision {
    fn to_value(&self) -> log::kv::Value {
        match self {
            Decision::Enabled => log::kv::Value::from(true),
            Decision::Disabled => log::kv::Value::from(false),
            Decision::Unknown => log::kv::Value::from("unknown"),
        }
    }
}

/// Whether a strategy could actually be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    /// The strategy was evaluated successfully; its result is definite.
    Complete,
    /// The strategy cannot be resolved from a context snapshot (unregistered name or
    /// host-identity strategy), so the result is a bound, not an answer.
    Incomplete,
    /// The strategy is disabled in its configuration and was not evaluated.
    Unevaluated,
}

/// Per-strategy outcome.
///
/// `variant` and `variants` are only attached to complete, enabled results of strategies that
/// own variant definitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    pub evaluation_status: EvaluationStatus,
    pub enabled: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantDef>,
}

impl StrategyResult {
    pub(crate) fn complete(
        enabled: bool,
        variant: Option<Variant>,
        variants: Vec<VariantDef>,
    ) -> StrategyResult {
        StrategyResult {
            evaluation_status: EvaluationStatus::Complete,
            enabled: enabled.into(),
            variant,
            variants,
        }
    }

    pub(crate) fn incomplete(enabled: Decision) -> StrategyResult {
        StrategyResult {
            evaluation_status: EvaluationStatus::Incomplete,
            enabled,
            variant: None,
            variants: Vec::new(),
        }
    }

    pub(crate) fn unevaluated() -> StrategyResult {
        StrategyResult {
            evaluation_status: EvaluationStatus::Unevaluated,
            enabled: Decision::Unknown,
            variant: None,
            variants: Vec::new(),
        }
    }
}

/// One configured strategy with its full evaluation detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedStrategy {
    pub name: Str,
    /// Passed through from the configuration; never fabricated, so identical inputs produce
    /// identical results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub disabled: bool,
    pub parameters: Parameters,
    pub result: StrategyResult,
    pub constraints: Vec<EvaluatedConstraint>,
    pub segments: Vec<EvaluatedSegment>,
}

/// Everything produced by evaluating one feature against one context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub enabled: Decision,
    pub strategies: Vec<EvaluatedStrategy>,
    /// The winning strategy's variant, when the winning strategy owns variant definitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantDef>,
    /// Attached for the caller to react to; an unsatisfied dependency does not by itself stop
    /// strategy evaluation.
    pub has_unsatisfied_dependency: bool,
}

/// One feature's outcome in a bulk evaluation over a whole repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEvaluation {
    pub name: Str,
    /// The stored enabled flag, independent of strategy evaluation.
    pub feature_enabled: bool,
    pub result: EvaluationResult,
    pub variant: Variant,
}

/// What `is_enabled` reports when the feature is not in the repository.
#[derive(Clone, Copy)]
pub enum Fallback<'a> {
    /// Report disabled.
    Disabled,
    /// Report a fixed value.
    Value(bool),
    /// Ask the caller.
    Func(&'a dyn Fn(&str, &Context) -> bool),
}

impl Fallback<'_> {
    pub(crate) fn resolve(&self, feature_name: &str, context: &Context) -> bool {
        match self {
            Fallback::Disabled => false,
            Fallback::Value(value) => *value,
            Fallback::Func(function) => function(feature_name, context),
        }
    }
}

impl From<bool> for Fallback<'_> {
    fn from(value: bool) -> Self {
        Fallback::Value(value)
    }
}

/// A precomputed enabled-decision handed to `force_get_variant`.
///
/// Re-running strategy evaluation during variant resolution would re-roll random and non-sticky
/// rollout strategies and could desynchronize the variant from the enabled-decision the caller
/// already observed; this carries the decision over instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcedResult {
    pub enabled: Decision,
    pub variant: Option<Variant>,
}

impl From<&EvaluationResult> for ForcedResult {
    fn from(result: &EvaluationResult) -> ForcedResult {
        ForcedResult {
            enabled: result.enabled,
            variant: result.variant.clone(),
        }
    }
}
