//! Weighted variant selection.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::bucketing::normalized_variant_value;
use crate::strategy::RandomSource;
use crate::{Context, Override, Payload, Str, VariantDef};

/// A variant as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: Str,
    pub enabled: bool,
    /// Whether the owning feature evaluated to enabled. Distinct from `enabled`: a fallback
    /// variant of an enabled feature has `enabled: false, feature_enabled: true`.
    pub feature_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Variant {
    /// The fallback variant served when a feature is disabled or no variant matched.
    pub fn disabled() -> Variant {
        Variant {
            name: "disabled".into(),
            enabled: false,
            feature_enabled: false,
            payload: None,
        }
    }

    /// A definition that won selection. Selection only happens for enabled features.
    pub(crate) fn selected(definition: &VariantDef) -> Variant {
        Variant {
            name: definition.name.clone(),
            enabled: true,
            feature_enabled: true,
            payload: definition.payload.clone(),
        }
    }
}

/// Deterministically pick a variant definition for the context, or `None` when the set has no
/// selectable weight.
///
/// Overrides win first, in list order. Otherwise the context is bucketed into
/// `1..=total_weight` using the first definition's stickiness field as the seed, and the first
/// definition whose cumulative weight reaches the bucket is picked. Zero-weight definitions are
/// never picked.
pub fn select_variant<'a>(
    group_id: &str,
    variants: &'a [VariantDef],
    context: &Context,
    random: &dyn RandomSource,
) -> Option<&'a VariantDef> {
    let total_weight: i32 = variants.iter().map(|variant| variant.weight).sum();
    if total_weight <= 0 {
        return None;
    }

    if let Some(variant) = find_override(variants, context) {
        return Some(variant);
    }

    let stickiness = variants[0].stickiness.as_deref();
    let seed = resolve_seed(context, stickiness, random);
    let target = normalized_variant_value(&seed, group_id, total_weight as u32) as i32;

    let mut counter = 0;
    variants.iter().find(|variant| {
        if variant.weight == 0 {
            return false;
        }
        counter += variant.weight;
        counter >= target
    })
}

fn find_override<'a>(variants: &'a [VariantDef], context: &Context) -> Option<&'a VariantDef> {
    variants.iter().find(|variant| {
        variant
            .overrides
            .iter()
            .any(|rule| override_matches(context, rule))
    })
}

fn override_matches(context: &Context, rule: &Override) -> bool {
    let Some(context_value) = context.get(&rule.context_name) else {
        return false;
    };
    rule.values
        .iter()
        .any(|value| value.as_str() == context_value.as_ref())
}

/// Resolve the bucketing seed from the stickiness field.
///
/// Default stickiness walks `userId`, `sessionId`, `remoteAddress`; custom stickiness resolves
/// that context field. Anonymous traffic without any usable field gets a random seed, trading
/// stability for a best-effort assignment.
fn resolve_seed(context: &Context, stickiness: Option<&str>, random: &dyn RandomSource) -> String {
    match stickiness {
        None | Some("default") => context
            .user_id()
            .or_else(|| context.session_id())
            .or_else(|| context.remote_address())
            .map(str::to_owned)
            .unwrap_or_else(|| random.seed()),
        Some(custom) => context
            .get(custom)
            .map(Cow::into_owned)
            .unwrap_or_else(|| random.seed()),
    }
}
