//! Client features wire model.
//!
//! These types mirror the client features JSON document served to SDKs. Parsing is resilient:
//! individual features are wrapped in [`TryParse`], so one malformed entry degrades to
//! [`TryParse::ParseFailed`] instead of failing the whole document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Str;

/// Segments are referenced from strategies by their numeric id.
pub type SegmentId = i32;

/// Strategy parameters as delivered on the wire. Numeric parameters (`rollout`, `percentage`)
/// arrive as strings and are parsed leniently at evaluation time.
pub type Parameters = HashMap<String, String>;

/// Root of the client features document.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientFeatures {
    pub version: u32,
    pub features: Vec<TryParse<Feature>>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
///
/// Discarded data is available as `ParseFailed` variant.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}

impl<T> From<TryParse<T>> for Result<T, serde_json::Value> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Ok(v),
            TryParse::ParseFailed(v) => Err(v),
        }
    }
}

impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

impl<'a, T> From<&'a TryParse<T>> for Option<&'a T> {
    fn from(value: &TryParse<T>) -> Option<&T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

/// A stored feature definition: the activation strategies, variant definitions, and dependencies
/// the engine evaluates against a context.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub name: Str,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub feature_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub stale: bool,
    #[serde(default)]
    pub impression_data: bool,
    #[serde(default)]
    pub strategies: Vec<FeatureStrategy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<FeatureDependency>,
}

/// One configured activation strategy on a feature.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStrategy {
    pub name: Str,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// A disabled strategy stays in the configuration but is not evaluated; it reports the
    /// `unevaluated` status instead.
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Referenced segments, resolved through the repository at evaluation time.
    #[serde(default)]
    pub segments: Vec<SegmentId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantDef>,
}

/// A single predicate over one context field.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub context_name: String,
    pub operator: Operator,
    /// Single comparison value, used by numeric, date, and semver operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Comparison list, used by membership and string operators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Negates the operator result after evaluation.
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Constraint operators.
///
/// Operators added by newer servers deserialize as [`Operator::Unknown`] and evaluate to `false`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    In,
    NotIn,
    StrEndsWith,
    StrStartsWith,
    StrContains,
    NumEq,
    NumGt,
    NumGte,
    NumLt,
    NumLte,
    DateAfter,
    DateBefore,
    SemverEq,
    SemverGt,
    SemverLt,
    #[serde(other)]
    Unknown,
}

/// A reusable bundle of constraints, referenced from strategies by id.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    pub name: Str,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// A weighted variant definition attached to a feature or a strategy.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantDef {
    pub name: Str,
    /// Weight in per-mille units; a valid set sums to 1000.
    pub weight: i32,
    #[serde(default)]
    pub weight_type: WeightType,
    /// Context field used as the bucketing seed; `None` means `"default"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stickiness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<Override>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeightType {
    #[default]
    Variable,
    Fix,
}

/// Pins a variant to contexts whose `context_name` field has one of the listed values,
/// bypassing weighted selection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub context_name: String,
    pub values: Vec<String>,
}

/// Opaque payload attached to a variant. The engine passes it through without interpreting it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Payload {
    /// Declared format (`string`, `json`, `csv`, `number`). Kept as free-form text so newer
    /// payload types survive a round trip.
    #[serde(rename = "type")]
    pub payload_type: String,
    pub value: String,
}

/// Declares that a feature requires a parent feature to evaluate to a given state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDependency {
    pub feature: Str,
    /// Required parent state; `None` is treated as requiring the parent to be enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// When non-empty, the parent's resolved variant must be one of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{ClientFeatures, Operator, TryParse, WeightType};

    #[test]
    fn parse_partially_if_unexpected() {
        let features: ClientFeatures = serde_json::from_str(
            r#"
              {
                "version": 2,
                "features": [
                  {
                    "name": "good",
                    "enabled": true,
                    "strategies": [{"name": "default"}]
                  },
                  {
                    "name": "broken",
                    "enabled": "not-a-boolean"
                  }
                ]
              }
            "#,
        )
        .unwrap();

        assert_eq!(features.features.len(), 2);
        assert!(matches!(features.features[0], TryParse::Parsed(_)));
        assert!(matches!(features.features[1], TryParse::ParseFailed(_)));
    }

    #[test]
    fn unknown_operator_does_not_fail_parsing() {
        let features: ClientFeatures = serde_json::from_str(
            r#"
              {
                "version": 2,
                "features": [
                  {
                    "name": "f",
                    "enabled": true,
                    "strategies": [
                      {
                        "name": "default",
                        "constraints": [
                          {"contextName": "userId", "operator": "IN", "values": ["a"]},
                          {"contextName": "userId", "operator": "NEWLY_INVENTED", "values": ["a"]}
                        ]
                      }
                    ]
                  }
                ]
              }
            "#,
        )
        .unwrap();

        let feature: Option<&super::Feature> = (&features.features[0]).into();
        let constraints = &feature.unwrap().strategies[0].constraints;
        assert_eq!(constraints[0].operator, Operator::In);
        assert_eq!(constraints[1].operator, Operator::Unknown);
    }

    #[test]
    fn variant_defaults() {
        let features: ClientFeatures = serde_json::from_str(
            r#"
              {
                "version": 2,
                "features": [
                  {
                    "name": "f",
                    "enabled": true,
                    "variants": [{"name": "a", "weight": 1000}]
                  }
                ]
              }
            "#,
        )
        .unwrap();

        let feature: Option<&super::Feature> = (&features.features[0]).into();
        let variant = &feature.unwrap().variants[0];
        assert_eq!(variant.weight_type, WeightType::Variable);
        assert_eq!(variant.stickiness, None);
        assert!(variant.overrides.is_empty());
    }

    #[test]
    fn segments_are_optional() {
        let features: ClientFeatures =
            serde_json::from_str(r#"{"version": 2, "features": []}"#).unwrap();
        assert!(features.segments.is_empty());
    }
}
