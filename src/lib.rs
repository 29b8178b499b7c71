//! `toggle_core` evaluates feature toggles against an evaluation context, answering "is this
//! feature on for this user, and which variant do they get" without talking to the network.
//!
//! # Overview
//!
//! [`FeatureSnapshot`](repository::FeatureSnapshot) is an immutable, indexed view of a client
//! features document (features, their strategies, and segments). Whatever fetches features from
//! an upstream service parses the document once into a snapshot; evaluation never re-parses.
//!
//! [`FeatureStore`](repository::FeatureStore) is a thread-safe multi-reader multi-writer
//! in-memory manager for snapshots. Whenever the feature set changes, the snapshot is replaced
//! completely. A reader holds on to the snapshot it got for the whole operation, so concurrent
//! writes never produce a half-updated answer.
//!
//! [`eval`] module contains the evaluation functions. They are pure: the repository, the
//! [`StrategyCatalog`](strategy::StrategyCatalog), and the current time all come in as
//! arguments, so the same inputs always produce the same result. Results are tri-state
//! ([`Decision`](eval::Decision)): a feature that hinges on an unrecognized custom strategy
//! evaluates to `unknown` rather than a wrong boolean.
//!
//! [`strategy`] module carries the built-in activation strategies (gradual rollouts, user and
//! IP lists, flexible rollout) and the [`Strategy`](strategy::Strategy) trait for registering
//! custom ones.
//!
//! Because the evaluation functions take repeated parameters, they are a bit tedious to call
//! directly. [`EvaluationClient`](eval::EvaluationClient) binds a store and a catalog together
//! and supplies the current time.
//!
//! # Versioning
//!
//! This library follows semver. It is primarily a building block for higher-level SDKs and
//! services, so expect breaking changes between major versions.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod bucketing;
pub mod eval;
pub mod features;
pub mod repository;
pub mod strategy;

mod context;
mod error;
mod str;

pub use crate::str::Str;
pub use context::{Context, Timestamp};
pub use error::{Error, Result};
pub use features::{
    ClientFeatures, Constraint, EvaluatedConstraint, EvaluatedSegment, Feature, FeatureDependency,
    FeatureStrategy, Operator, Override, Parameters, Payload, Segment, SegmentId, TryParse,
    Variant, VariantDef, WeightType,
};
