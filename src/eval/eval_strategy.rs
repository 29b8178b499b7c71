//! Per-strategy evaluation.

use crate::features::{
    evaluate_constraints, evaluate_segments, resolve_segments, select_variant, Variant,
};
use crate::repository::Repository;
use crate::strategy::{Strategy, StrategyCatalog};
use crate::{Context, FeatureStrategy, Timestamp};

use super::results::{Decision, EvaluatedStrategy, StrategyResult};

/// Evaluate one configured strategy of a feature.
///
/// Constraint and segment detail is produced in every case, including disabled and unresolvable
/// strategies, because "why was this off" diagnostics depend on it.
pub fn evaluate_strategy(
    repository: &dyn Repository,
    catalog: &StrategyCatalog,
    feature_name: &str,
    config: &FeatureStrategy,
    context: &Context,
    now: Timestamp,
) -> EvaluatedStrategy {
    let constraints = evaluate_constraints(context, &config.constraints, now);
    let resolved = resolve_segments(repository, &config.segments, feature_name);
    let segments = evaluate_segments(context, &resolved, now);
    let gates_pass = constraints.result && segments.result;

    let result = if config.disabled {
        StrategyResult::unevaluated()
    } else {
        match resolve_strategy(catalog, &config.name) {
            Some(strategy) => {
                let enabled =
                    gates_pass && strategy.is_enabled(&config.parameters, context, feature_name);
                let (variant, variants) = if enabled && !config.variants.is_empty() {
                    let variant = select_variant(
                        strategy_group_id(config, feature_name),
                        &config.variants,
                        context,
                        catalog.random(),
                    )
                    .map(Variant::selected);
                    (variant, config.variants.clone())
                } else {
                    (None, Vec::new())
                };
                StrategyResult::complete(enabled, variant, variants)
            }
            None => {
                // The strategy's own answer is unknowable here, but failing constraints or
                // segments already bound the result to false.
                let enabled = if gates_pass {
                    Decision::Unknown
                } else {
                    Decision::Disabled
                };
                StrategyResult::incomplete(enabled)
            }
        }
    };

    EvaluatedStrategy {
        name: config.name.clone(),
        id: config.id.clone(),
        title: config.title.clone(),
        disabled: config.disabled,
        parameters: config.parameters.clone(),
        result,
        constraints: constraints.constraints,
        segments: segments.segments,
    }
}

/// Look the strategy up by name.
///
/// `applicationHostname` depends on the identity of the evaluating machine, not on the context,
/// so it is deliberately treated as unresolvable even though the catalog carries it.
fn resolve_strategy<'a>(catalog: &'a StrategyCatalog, name: &str) -> Option<&'a dyn Strategy> {
    if name == "applicationHostname" {
        log::trace!(target: "toggle",
                    strategy = name;
                    "host-identity strategy cannot be answered from a context snapshot");
        return None;
    }
    let strategy = catalog.get(name);
    if strategy.is_none() {
        log::warn!(target: "toggle",
                   strategy = name;
                   "strategy is not registered, evaluating as unknown");
    }
    strategy
}

fn strategy_group_id<'a>(config: &'a FeatureStrategy, feature_name: &'a str) -> &'a str {
    match config.parameters.get("groupId").map(String::as_str) {
        Some(group_id) if !group_id.is_empty() => group_id,
        _ => feature_name,
    }
}
