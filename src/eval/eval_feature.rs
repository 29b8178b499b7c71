//! Feature-level evaluation.
//!
//! These functions are pure: they take the repository, the strategy catalog, and the current
//! time as arguments and touch no other state, so the same inputs always produce the same
//! result. [`EvaluationClient`][crate::eval::EvaluationClient] wraps them for callers that do
//! not want to supply the time themselves.

use crate::features::{select_variant, Feature, Variant};
use crate::repository::Repository;
use crate::strategy::StrategyCatalog;
use crate::{Context, Timestamp};

use super::eval_strategy::evaluate_strategy;
use super::results::{
    Decision, EvaluatedStrategy, EvaluationResult, EvaluationStatus, Fallback, FeatureEvaluation,
    ForcedResult,
};

/// Evaluate whether a feature is enabled for the given context.
///
/// A missing feature resolves through `fallback`. Strategy results are aggregated
/// most-definite-first: any strategy that definitely passed wins and contributes its variant
/// selection, otherwise a single unknown strategy makes the whole feature unknown.
pub fn evaluate_enabled(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    feature_name: &str,
    context: &Context,
    fallback: Fallback,
    now: Timestamp,
) -> EvaluationResult {
    let feature = repository.get_toggle(feature_name);
    let dependencies_satisfied = match feature {
        Some(feature) => is_parent_dependency_satisfied(repository, catalog, feature, context, now),
        None => true,
    };

    let mut result =
        evaluate_feature(repository, catalog, feature, feature_name, context, fallback, now);
    result.has_unsatisfied_dependency = !dependencies_satisfied;

    log::trace!(target: "toggle",
                feature_name,
                enabled = result.enabled,
                has_unsatisfied_dependency = result.has_unsatisfied_dependency;
                "evaluated a feature");

    result
}

/// Strategy evaluation without the dependency check. Shared between [`evaluate_enabled`] and
/// variant resolution, which handles dependencies itself.
fn evaluate_feature(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    feature: Option<&Feature>,
    feature_name: &str,
    context: &Context,
    fallback: Fallback,
    now: Timestamp,
) -> EvaluationResult {
    let Some(feature) = feature else {
        return EvaluationResult {
            enabled: fallback.resolve(feature_name, context).into(),
            strategies: Vec::new(),
            variant: None,
            variants: Vec::new(),
            has_unsatisfied_dependency: false,
        };
    };

    if feature.strategies.is_empty() {
        return EvaluationResult {
            enabled: feature.enabled.into(),
            strategies: Vec::new(),
            variant: None,
            variants: Vec::new(),
            has_unsatisfied_dependency: false,
        };
    }

    let strategies: Vec<EvaluatedStrategy> = feature
        .strategies
        .iter()
        .map(|config| evaluate_strategy(repository, catalog, &feature.name, config, context, now))
        .collect();

    // The first strategy that definitely passed wins and supplies the variant selection.
    let winner = strategies.iter().find(|strategy| {
        strategy.result.enabled == Decision::Enabled
            && strategy.result.evaluation_status == EvaluationStatus::Complete
    });
    let (enabled, variant, variants) = match winner {
        Some(winner) => (
            Decision::Enabled,
            winner.result.variant.clone(),
            winner.result.variants.clone(),
        ),
        None if strategies
            .iter()
            .any(|strategy| strategy.result.enabled == Decision::Unknown) =>
        {
            (Decision::Unknown, None, Vec::new())
        }
        None => (Decision::Disabled, None, Vec::new()),
    };

    EvaluationResult {
        enabled,
        strategies,
        variant,
        variants,
        has_unsatisfied_dependency: false,
    }
}

/// Evaluate every feature in the repository for one context, e.g. to preview a whole
/// environment at once.
///
/// Variants are resolved through the forced path, so each entry's variant stays consistent
/// with its enabled decision even for features behind randomized strategies.
pub fn evaluate_all(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    context: &Context,
    now: Timestamp,
) -> Vec<FeatureEvaluation> {
    repository
        .get_toggles()
        .into_iter()
        .map(|feature| {
            let result = evaluate_enabled(
                repository,
                catalog,
                &feature.name,
                context,
                Fallback::Disabled,
                now,
            );
            let forced = ForcedResult::from(&result);
            let variant = evaluate_forced_variant(
                repository,
                catalog,
                &feature.name,
                context,
                &forced,
                None,
                now,
            );
            FeatureEvaluation {
                name: feature.name.clone(),
                feature_enabled: feature.enabled,
                result,
                variant,
            }
        })
        .collect()
}

/// Check every dependency of `feature` against the repository.
///
/// Dependencies are single-level: a parent that has dependencies of its own is treated as
/// unsatisfied rather than resolved recursively, which also rules out cycles.
pub fn is_parent_dependency_satisfied(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    feature: &Feature,
    context: &Context,
    now: Timestamp,
) -> bool {
    if feature.dependencies.is_empty() {
        return true;
    }

    feature.dependencies.iter().all(|dependency| {
        let Some(parent) = repository.get_toggle(&dependency.feature) else {
            log::debug!(target: "toggle",
                        feature_name = feature.name,
                        parent = dependency.feature;
                        "dependency parent is not in the repository");
            return false;
        };
        if !parent.dependencies.is_empty() {
            return false;
        }

        if dependency.enabled == Some(false) {
            let parent_enabled = evaluate_enabled(
                repository,
                catalog,
                &dependency.feature,
                context,
                Fallback::Disabled,
                now,
            );
            return !parent_enabled.enabled.is_enabled();
        }

        if !dependency.variants.is_empty() {
            let parent_variant =
                evaluate_variant(repository, catalog, &dependency.feature, context, None, now);
            return dependency
                .variants
                .iter()
                .any(|name| *name == parent_variant.name.as_ref());
        }

        let parent_enabled = evaluate_enabled(
            repository,
            catalog,
            &dependency.feature,
            context,
            Fallback::Disabled,
            now,
        );
        parent_enabled.enabled.is_enabled()
    })
}

/// Resolve the variant served to the given context.
///
/// Returns `fallback_variant` (or the built-in disabled variant) when the feature is missing,
/// disabled, has unsatisfied dependencies, or defines no variants.
pub fn evaluate_variant(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    feature_name: &str,
    context: &Context,
    fallback_variant: Option<&Variant>,
    now: Timestamp,
) -> Variant {
    resolve_variant(
        repository,
        catalog,
        feature_name,
        context,
        fallback_variant,
        None,
        now,
    )
}

/// Like [`evaluate_variant`], but reuses a previously computed enabled decision instead of
/// evaluating the strategies again. Keeps paired enabled/variant reads consistent when a
/// randomized strategy sits in between.
pub fn evaluate_forced_variant(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    feature_name: &str,
    context: &Context,
    forced: &ForcedResult,
    fallback_variant: Option<&Variant>,
    now: Timestamp,
) -> Variant {
    resolve_variant(
        repository,
        catalog,
        feature_name,
        context,
        fallback_variant,
        Some(forced),
        now,
    )
}

fn resolve_variant(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    feature_name: &str,
    context: &Context,
    fallback_variant: Option<&Variant>,
    forced: Option<&ForcedResult>,
    now: Timestamp,
) -> Variant {
    let mut fallback = fallback_variant.cloned().unwrap_or_else(Variant::disabled);

    let Some(feature) = repository.get_toggle(feature_name) else {
        return fallback;
    };
    if !is_parent_dependency_satisfied(repository, catalog, feature, context, now) {
        return fallback;
    }

    let (decision, strategy_variant) = match forced {
        Some(forced) => (forced.enabled, forced.variant.clone()),
        None => {
            let fallback_enabled = fallback_variant.map(|it| it.enabled).unwrap_or(false);
            let result = evaluate_feature(
                repository,
                catalog,
                Some(feature),
                feature_name,
                context,
                Fallback::Value(fallback_enabled),
                now,
            );
            (result.enabled, result.variant)
        }
    };
    let enabled = decision.is_enabled();
    if fallback_variant.is_none() {
        fallback.feature_enabled = enabled;
    }

    if enabled {
        if let Some(variant) = strategy_variant {
            return variant;
        }
    } else {
        return fallback;
    }

    if feature.variants.is_empty() || !feature.enabled {
        return fallback;
    }
    match select_variant(&feature.name, &feature.variants, context, catalog.random()) {
        Some(definition) => Variant::selected(definition),
        None => fallback,
    }
}
