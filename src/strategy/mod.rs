//! Activation strategies.
//!
//! A strategy is a named rule deciding whether a context is included in a feature's rollout.
//! [`StrategyCatalog`] holds the built-in strategies plus any caller-registered custom ones;
//! evaluation looks strategies up by the name configured on the feature.

mod builtin;

use std::sync::Arc;

use rand::Rng;

pub use builtin::{
    ApplicationHostname, DefaultStrategy, FlexibleRollout, GradualRolloutRandom,
    GradualRolloutSessionId, GradualRolloutUserId, RemoteAddress, UserWithId,
};

use crate::{Context, Error, Parameters, Result};

/// A named rule that gates feature enablement.
///
/// Implementations must be pure with respect to the context: given the same parameters, context,
/// and feature name, `is_enabled` returns the same answer (strategies built on a
/// [`RandomSource`] are deterministic once the source is).
pub trait Strategy: Send + Sync {
    /// The name this strategy is looked up by.
    fn name(&self) -> &str;

    /// Whether the context falls inside this strategy's rollout.
    ///
    /// `feature_name` is the feature under evaluation; rollout strategies use it as the default
    /// bucketing group when no `groupId` parameter is configured.
    fn is_enabled(&self, parameters: &Parameters, context: &Context, feature_name: &str) -> bool;
}

/// Source of randomness for evaluation paths that have no deterministic seed.
///
/// Injectable so tests can pin both the percentage roll and the seed fallback.
pub trait RandomSource: Send + Sync {
    /// A draw in `1..=100`, compared against percentage parameters.
    fn roll(&self) -> u32;

    /// A numeric-string seed for contexts with no usable stickiness field.
    fn seed(&self) -> String;
}

/// Thread-local randomness, the production [`RandomSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll(&self) -> u32 {
        rand::thread_rng().gen_range(1..=100)
    }

    fn seed(&self) -> String {
        rand::thread_rng().gen_range(0..100_000u32).to_string()
    }
}

/// The strategy registry.
///
/// Strategies are matched by name in registration order, built-ins first. Names that match
/// nothing degrade to the `unknown` evaluation path instead of failing.
pub struct StrategyCatalog {
    strategies: Vec<Box<dyn Strategy>>,
    random: Arc<dyn RandomSource>,
}

impl StrategyCatalog {
    /// Catalog with the built-in strategies and thread-local randomness.
    pub fn new() -> StrategyCatalog {
        StrategyCatalog::with_random(Arc::new(ThreadRandom))
    }

    /// Catalog with the built-in strategies drawing from the given randomness source.
    pub fn with_random(random: Arc<dyn RandomSource>) -> StrategyCatalog {
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(DefaultStrategy),
            Box::new(ApplicationHostname::from_env()),
            Box::new(UserWithId),
            Box::new(RemoteAddress),
            Box::new(GradualRolloutUserId),
            Box::new(GradualRolloutSessionId),
            Box::new(GradualRolloutRandom::new(random.clone())),
            Box::new(FlexibleRollout::new(random.clone())),
        ];
        StrategyCatalog { strategies, random }
    }

    /// Catalog with the built-ins plus the given custom strategies.
    pub fn with_strategies(custom: Vec<Box<dyn Strategy>>) -> Result<StrategyCatalog> {
        let mut catalog = StrategyCatalog::new();
        for strategy in custom {
            catalog.register(strategy)?;
        }
        Ok(catalog)
    }

    /// Register a custom strategy.
    ///
    /// This is the only configuration step that fails: a strategy without a name could never be
    /// matched, so it is rejected at registration instead of silently never applying.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) -> Result<()> {
        if strategy.name().is_empty() {
            return Err(Error::InvalidStrategy);
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&dyn Strategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.name() == name)
            .map(AsRef::as_ref)
    }

    pub(crate) fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        StrategyCatalog::new()
    }
}
