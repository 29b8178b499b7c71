//! Feature evaluation.

mod eval_feature;
mod eval_strategy;
mod evaluator;
mod results;

pub use eval_feature::{
    evaluate_all, evaluate_enabled, evaluate_forced_variant, evaluate_variant,
    is_parent_dependency_satisfied,
};
pub use eval_strategy::evaluate_strategy;
pub use evaluator::EvaluationClient;
pub use results::{
    Decision, EvaluatedStrategy, EvaluationResult, EvaluationStatus, Fallback, FeatureEvaluation,
    ForcedResult, StrategyResult,
};
