use std::sync::Arc;

use chrono::Utc;

use crate::features::Variant;
use crate::repository::{FeatureSnapshot, FeatureStore};
use crate::strategy::StrategyCatalog;
use crate::Context;

use super::eval_feature::{
    evaluate_all, evaluate_enabled, evaluate_forced_variant, evaluate_variant,
};
use super::results::{EvaluationResult, Fallback, FeatureEvaluation, ForcedResult};

/// Binds a [`FeatureStore`] and a [`StrategyCatalog`] together and supplies the current time,
/// so callers do not have to.
pub struct EvaluationClient {
    store: Arc<FeatureStore>,
    catalog: StrategyCatalog,
}

impl EvaluationClient {
    pub fn new(store: Arc<FeatureStore>) -> EvaluationClient {
        EvaluationClient::with_catalog(store, StrategyCatalog::new())
    }

    /// Create a client with a custom catalog, e.g. one extended with
    /// [`StrategyCatalog::with_strategies`].
    pub fn with_catalog(store: Arc<FeatureStore>, catalog: StrategyCatalog) -> EvaluationClient {
        EvaluationClient { store, catalog }
    }

    /// Evaluate whether a feature is enabled.
    ///
    /// `fallback` decides the answer for features missing from the snapshot; a plain `bool`
    /// works in place of a [`Fallback`].
    pub fn is_enabled<'a>(
        &self,
        feature_name: &str,
        context: &Context,
        fallback: impl Into<Fallback<'a>>,
    ) -> EvaluationResult {
        evaluate_enabled(
            self.snapshot(feature_name).as_ref(),
            &self.catalog,
            feature_name,
            context,
            fallback.into(),
            Utc::now(),
        )
    }

    pub fn get_variant(
        &self,
        feature_name: &str,
        context: &Context,
        fallback_variant: Option<&Variant>,
    ) -> Variant {
        evaluate_variant(
            self.snapshot(feature_name).as_ref(),
            &self.catalog,
            feature_name,
            context,
            fallback_variant,
            Utc::now(),
        )
    }

    /// Resolve a variant consistent with an enabled result computed earlier, keeping paired
    /// reads stable even when a randomized strategy is involved.
    pub fn get_forced_variant(
        &self,
        feature_name: &str,
        context: &Context,
        forced: &ForcedResult,
        fallback_variant: Option<&Variant>,
    ) -> Variant {
        evaluate_forced_variant(
            self.snapshot(feature_name).as_ref(),
            &self.catalog,
            feature_name,
            context,
            forced,
            fallback_variant,
            Utc::now(),
        )
    }

    /// Evaluate every feature in the current snapshot for one context.
    pub fn evaluate_all(&self, context: &Context) -> Vec<FeatureEvaluation> {
        let Some(snapshot) = self.store.snapshot() else {
            log::warn!(target: "toggle", "evaluating before a snapshot has been stored");
            return Vec::new();
        };
        evaluate_all(snapshot.as_ref(), &self.catalog, context, Utc::now())
    }

    fn snapshot(&self, feature_name: &str) -> Arc<FeatureSnapshot> {
        match self.store.snapshot() {
            Some(snapshot) => snapshot,
            None => {
                log::warn!(target: "toggle",
                           feature_name;
                           "evaluating a feature before a snapshot has been stored");
                Arc::new(FeatureSnapshot::default())
            }
        }
    }
}
