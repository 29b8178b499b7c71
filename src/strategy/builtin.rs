//! Built-in strategies.

use std::borrow::Cow;
use std::env;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;

use crate::bucketing::normalized_strategy_value;
use crate::{Context, Parameters};

use super::{RandomSource, Strategy};

/// `default`: on for everyone.
pub struct DefaultStrategy;

impl Strategy for DefaultStrategy {
    fn name(&self) -> &str {
        "default"
    }

    fn is_enabled(&self, _parameters: &Parameters, _context: &Context, _feature_name: &str) -> bool {
        true
    }
}

/// `applicationHostname`: on when the evaluating process runs on one of the hosts listed in the
/// `hostNames` parameter.
///
/// The hostname is injected at construction and lower-cased once, keeping evaluation itself free
/// of process-global lookups.
pub struct ApplicationHostname {
    hostname: String,
}

impl ApplicationHostname {
    pub fn new(hostname: impl AsRef<str>) -> ApplicationHostname {
        ApplicationHostname {
            hostname: hostname.as_ref().to_lowercase(),
        }
    }

    /// Hostname from the `HOSTNAME` environment variable, `"undefined"` when unset or empty.
    pub fn from_env() -> ApplicationHostname {
        let hostname = env::var("HOSTNAME").ok().filter(|it| !it.is_empty());
        ApplicationHostname::new(hostname.as_deref().unwrap_or("undefined"))
    }
}

impl Strategy for ApplicationHostname {
    fn name(&self) -> &str {
        "applicationHostname"
    }

    fn is_enabled(&self, parameters: &Parameters, _context: &Context, _feature_name: &str) -> bool {
        let Some(host_names) = parameters.get("hostNames") else {
            return false;
        };
        csv_entries(host_names).any(|entry| entry.to_lowercase() == self.hostname)
    }
}

/// `userWithId`: on for the user ids listed in the `userIds` parameter.
pub struct UserWithId;

impl Strategy for UserWithId {
    fn name(&self) -> &str {
        "userWithId"
    }

    fn is_enabled(&self, parameters: &Parameters, context: &Context, _feature_name: &str) -> bool {
        let (Some(user_ids), Some(user_id)) = (parameters.get("userIds"), context.user_id())
        else {
            return false;
        };
        csv_entries(user_ids).any(|entry| entry == user_id)
    }
}

/// `remoteAddress`: on when the context's remote address matches an entry of the `IPs`
/// parameter, either verbatim or by CIDR containment.
pub struct RemoteAddress;

impl Strategy for RemoteAddress {
    fn name(&self) -> &str {
        "remoteAddress"
    }

    fn is_enabled(&self, parameters: &Parameters, context: &Context, _feature_name: &str) -> bool {
        let (Some(ips), Some(remote_address)) = (parameters.get("IPs"), context.remote_address())
        else {
            return false;
        };
        csv_entries(ips).any(|entry| {
            if entry == remote_address {
                return true;
            }
            let Ok(address) = remote_address.parse::<IpAddr>() else {
                return false;
            };
            match entry.parse::<IpNet>() {
                Ok(network) => network.contains(&address),
                // Bare addresses compare as addresses, so textual variants still match.
                Err(_) => entry.parse::<IpAddr>().map(|ip| ip == address).unwrap_or(false),
            }
        })
    }
}

/// `gradualRolloutUserId`: deterministic percentage rollout bucketed on `userId`.
pub struct GradualRolloutUserId;

impl Strategy for GradualRolloutUserId {
    fn name(&self) -> &str {
        "gradualRolloutUserId"
    }

    fn is_enabled(&self, parameters: &Parameters, context: &Context, _feature_name: &str) -> bool {
        let Some(user_id) = context.user_id() else {
            return false;
        };
        let percentage = percentage_parameter(parameters, "percentage");
        let group_id = parameters.get("groupId").map(String::as_str).unwrap_or("");
        percentage > 0.0 && f64::from(normalized_strategy_value(user_id, group_id)) <= percentage
    }
}

/// `gradualRolloutSessionId`: deterministic percentage rollout bucketed on `sessionId`.
pub struct GradualRolloutSessionId;

impl Strategy for GradualRolloutSessionId {
    fn name(&self) -> &str {
        "gradualRolloutSessionId"
    }

    fn is_enabled(&self, parameters: &Parameters, context: &Context, _feature_name: &str) -> bool {
        let Some(session_id) = context.session_id() else {
            return false;
        };
        let percentage = percentage_parameter(parameters, "percentage");
        let group_id = parameters.get("groupId").map(String::as_str).unwrap_or("");
        percentage > 0.0 && f64::from(normalized_strategy_value(session_id, group_id)) <= percentage
    }
}

/// `gradualRolloutRandom`: non-sticky rollout; every evaluation re-rolls the dice.
pub struct GradualRolloutRandom {
    random: Arc<dyn RandomSource>,
}

impl GradualRolloutRandom {
    pub fn new(random: Arc<dyn RandomSource>) -> GradualRolloutRandom {
        GradualRolloutRandom { random }
    }
}

impl Strategy for GradualRolloutRandom {
    fn name(&self) -> &str {
        "gradualRolloutRandom"
    }

    fn is_enabled(&self, parameters: &Parameters, _context: &Context, _feature_name: &str) -> bool {
        let percentage = percentage_parameter(parameters, "percentage");
        percentage >= f64::from(self.random.roll())
    }
}

/// `flexibleRollout`: stickiness-driven percentage rollout.
///
/// The bucketing group defaults to the name of the feature under evaluation, so two features at
/// the same rollout percentage enable different user populations.
pub struct FlexibleRollout {
    random: Arc<dyn RandomSource>,
}

impl FlexibleRollout {
    pub fn new(random: Arc<dyn RandomSource>) -> FlexibleRollout {
        FlexibleRollout { random }
    }

    /// Default stickiness walks `userId` then `sessionId`, then falls back to a random seed.
    /// Custom stickiness is strict: a missing field disables the strategy instead of degrading
    /// to a random bucket.
    fn resolve_stickiness(&self, stickiness: &str, context: &Context) -> Option<String> {
        match stickiness {
            "default" => context
                .user_id()
                .or_else(|| context.session_id())
                .map(str::to_owned)
                .or_else(|| Some(self.random.seed())),
            "random" => Some(self.random.seed()),
            custom => context.get(custom).map(Cow::into_owned),
        }
    }
}

impl Strategy for FlexibleRollout {
    fn name(&self) -> &str {
        "flexibleRollout"
    }

    fn is_enabled(&self, parameters: &Parameters, context: &Context, feature_name: &str) -> bool {
        let rollout = percentage_parameter(parameters, "rollout");
        let group_id = match parameters.get("groupId").map(String::as_str) {
            Some(group_id) if !group_id.is_empty() => group_id,
            _ => feature_name,
        };
        let stickiness = parameters
            .get("stickiness")
            .map(String::as_str)
            .filter(|it| !it.is_empty())
            .unwrap_or("default");

        let Some(stickiness_id) = self.resolve_stickiness(stickiness, context) else {
            return false;
        };
        rollout > 0.0 && f64::from(normalized_strategy_value(&stickiness_id, group_id)) <= rollout
    }
}

/// Comma-separated parameter lists: entries trimmed, empty entries dropped.
fn csv_entries(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

/// Percentage parameters arrive as strings; unparseable values read as 0 (never enabled).
fn percentage_parameter(parameters: &Parameters, name: &str) -> f64 {
    parameters
        .get(name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRandom {
        roll: u32,
        seed: &'static str,
    }

    impl RandomSource for FixedRandom {
        fn roll(&self) -> u32 {
            self.roll
        }

        fn seed(&self) -> String {
            self.seed.to_owned()
        }
    }

    fn fixed(roll: u32, seed: &'static str) -> Arc<dyn RandomSource> {
        Arc::new(FixedRandom { roll, seed })
    }

    fn parameters(entries: &[(&str, &str)]) -> Parameters {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn user_context(user_id: &str) -> Context {
        Context {
            user_id: Some(user_id.to_owned()),
            ..Context::default()
        }
    }

    #[test]
    fn default_is_always_on() {
        let strategy = DefaultStrategy;
        assert!(strategy.is_enabled(&Parameters::new(), &Context::default(), "f"));
        assert!(strategy.is_enabled(
            &parameters(&[("anything", "ignored")]),
            &user_context("42"),
            "f"
        ));
    }

    #[test]
    fn hostname_matches_case_insensitively() {
        let strategy = ApplicationHostname::new("Host-A.internal");
        let params = parameters(&[("hostNames", "HOST-a.internal, host-b.internal")]);
        assert!(strategy.is_enabled(&params, &Context::default(), "f"));

        let strategy = ApplicationHostname::new("host-c.internal");
        assert!(!strategy.is_enabled(&params, &Context::default(), "f"));
    }

    #[test]
    fn hostname_without_parameter_is_off() {
        let strategy = ApplicationHostname::new("host-a");
        assert!(!strategy.is_enabled(&Parameters::new(), &Context::default(), "f"));
    }

    #[test]
    fn user_with_id_matches_listed_users() {
        let strategy = UserWithId;
        let params = parameters(&[("userIds", "123, 456 ,789")]);
        assert!(strategy.is_enabled(&params, &user_context("456"), "f"));
        assert!(!strategy.is_enabled(&params, &user_context("999"), "f"));
        assert!(!strategy.is_enabled(&params, &Context::default(), "f"));
        assert!(!strategy.is_enabled(&Parameters::new(), &user_context("123"), "f"));
    }

    fn address_context(remote: &str) -> Context {
        Context {
            remote_address: Some(remote.to_owned()),
            ..Context::default()
        }
    }

    #[test]
    fn remote_address_matches_exact_entries() {
        let strategy = RemoteAddress;
        let params = parameters(&[("IPs", "10.0.0.1, 10.0.0.2")]);
        assert!(strategy.is_enabled(&params, &address_context("10.0.0.2"), "f"));
        assert!(!strategy.is_enabled(&params, &address_context("10.0.0.3"), "f"));
    }

    #[test]
    fn remote_address_matches_cidr_ranges() {
        let strategy = RemoteAddress;
        let params = parameters(&[("IPs", "192.168.7.0/24")]);
        assert!(strategy.is_enabled(&params, &address_context("192.168.7.44"), "f"));
        assert!(!strategy.is_enabled(&params, &address_context("192.168.8.44"), "f"));
    }

    #[test]
    fn remote_address_matches_ipv6_textual_variants() {
        let strategy = RemoteAddress;
        let params = parameters(&[("IPs", "::1")]);
        assert!(strategy.is_enabled(&params, &address_context("0:0:0:0:0:0:0:1"), "f"));
    }

    #[test]
    fn remote_address_ignores_unparseable_entries() {
        let strategy = RemoteAddress;
        let params = parameters(&[("IPs", "not-an-ip, 10.0.0.1")]);
        assert!(strategy.is_enabled(&params, &address_context("10.0.0.1"), "f"));
        // An unparseable entry can still match verbatim.
        assert!(strategy.is_enabled(&params, &address_context("not-an-ip"), "f"));
        assert!(!strategy.is_enabled(&params, &address_context("10.0.0.9"), "f"));
    }

    // normalized_strategy_value("123", "gr1") == 73, a protocol-wide reference vector.
    #[test]
    fn gradual_rollout_user_id_follows_the_bucket() {
        let strategy = GradualRolloutUserId;
        let params = parameters(&[("percentage", "73"), ("groupId", "gr1")]);
        assert!(strategy.is_enabled(&params, &user_context("123"), "f"));

        let params = parameters(&[("percentage", "72"), ("groupId", "gr1")]);
        assert!(!strategy.is_enabled(&params, &user_context("123"), "f"));
    }

    #[test]
    fn gradual_rollout_user_id_requires_a_user() {
        let strategy = GradualRolloutUserId;
        let params = parameters(&[("percentage", "100"), ("groupId", "gr1")]);
        assert!(!strategy.is_enabled(&params, &Context::default(), "f"));
    }

    #[test]
    fn gradual_rollout_session_id_follows_the_bucket() {
        let strategy = GradualRolloutSessionId;
        let context = Context {
            session_id: Some("123".to_owned()),
            ..Context::default()
        };
        let params = parameters(&[("percentage", "73"), ("groupId", "gr1")]);
        assert!(strategy.is_enabled(&params, &context, "f"));

        let params = parameters(&[("percentage", "72"), ("groupId", "gr1")]);
        assert!(!strategy.is_enabled(&params, &context, "f"));
    }

    #[test]
    fn unparseable_percentage_is_never_enabled() {
        let strategy = GradualRolloutUserId;
        let params = parameters(&[("percentage", "fifty"), ("groupId", "gr1")]);
        assert!(!strategy.is_enabled(&params, &user_context("123"), "f"));

        let strategy = GradualRolloutUserId;
        assert!(!strategy.is_enabled(&Parameters::new(), &user_context("123"), "f"));
    }

    #[test]
    fn gradual_rollout_random_compares_against_the_roll() {
        let params = parameters(&[("percentage", "50")]);

        let strategy = GradualRolloutRandom::new(fixed(50, "1"));
        assert!(strategy.is_enabled(&params, &Context::default(), "f"));

        let strategy = GradualRolloutRandom::new(fixed(51, "1"));
        assert!(!strategy.is_enabled(&params, &Context::default(), "f"));
    }

    #[test]
    fn flexible_rollout_buckets_on_user_id() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let params = parameters(&[("rollout", "73"), ("groupId", "gr1")]);
        assert!(strategy.is_enabled(&params, &user_context("123"), "f"));

        let params = parameters(&[("rollout", "72"), ("groupId", "gr1")]);
        assert!(!strategy.is_enabled(&params, &user_context("123"), "f"));
    }

    #[test]
    fn flexible_rollout_group_defaults_to_the_feature_name() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let params = parameters(&[("rollout", "73")]);
        assert!(strategy.is_enabled(&params, &user_context("123"), "gr1"));
        assert!(!strategy.is_enabled(&params, &user_context("123"), "groupX"));

        // An empty groupId parameter falls back the same way.
        let params = parameters(&[("rollout", "73"), ("groupId", "")]);
        assert!(strategy.is_enabled(&params, &user_context("123"), "gr1"));
    }

    #[test]
    fn flexible_rollout_falls_back_to_session_id() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let context = Context {
            session_id: Some("123".to_owned()),
            ..Context::default()
        };
        let params = parameters(&[("rollout", "73"), ("groupId", "gr1")]);
        assert!(strategy.is_enabled(&params, &context, "f"));
    }

    #[test]
    fn flexible_rollout_anonymous_context_uses_the_random_seed() {
        let params = parameters(&[("rollout", "73"), ("groupId", "gr1")]);

        let strategy = FlexibleRollout::new(fixed(1, "123"));
        assert!(strategy.is_enabled(&params, &Context::default(), "f"));

        let strategy = FlexibleRollout::new(fixed(1, "999"));
        let params = parameters(&[("rollout", "24"), ("groupId", "groupX")]);
        assert!(!strategy.is_enabled(&params, &Context::default(), "f"));
    }

    #[test]
    fn flexible_rollout_random_stickiness_ignores_user_id() {
        let strategy = FlexibleRollout::new(fixed(1, "123"));
        let params = parameters(&[
            ("rollout", "73"),
            ("groupId", "gr1"),
            ("stickiness", "random"),
        ]);
        // Bucket comes from the seed "123" even though a userId is present.
        assert!(strategy.is_enabled(&params, &user_context("999"), "f"));
    }

    #[test]
    fn flexible_rollout_custom_stickiness_uses_the_named_field() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let params = parameters(&[
            ("rollout", "73"),
            ("groupId", "gr1"),
            ("stickiness", "tenant"),
        ]);
        let context = Context {
            properties: [("tenant".to_owned(), "123".to_owned())].into(),
            ..Context::default()
        };
        assert!(strategy.is_enabled(&params, &context, "f"));
    }

    #[test]
    fn flexible_rollout_missing_custom_stickiness_is_off() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let params = parameters(&[
            ("rollout", "100"),
            ("groupId", "gr1"),
            ("stickiness", "tenant"),
        ]);
        assert!(!strategy.is_enabled(&params, &user_context("123"), "f"));
    }

    #[test]
    fn flexible_rollout_zero_percent_is_off_for_everyone() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let params = parameters(&[("rollout", "0"), ("groupId", "gr1")]);
        for i in 0..50 {
            assert!(!strategy.is_enabled(&params, &user_context(&format!("user-{i}")), "f"));
        }
    }

    #[test]
    fn flexible_rollout_hundred_percent_is_on_for_everyone() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let params = parameters(&[("rollout", "100"), ("groupId", "gr1")]);
        for i in 0..50 {
            assert!(strategy.is_enabled(&params, &user_context(&format!("user-{i}")), "f"));
        }
    }

    #[test]
    fn flexible_rollout_splits_users_close_to_the_percentage() {
        let strategy = FlexibleRollout::new(fixed(1, "1"));
        let params = parameters(&[("rollout", "50"), ("groupId", "f1")]);
        let samples = 10_000;
        let mut enabled = 0;
        for i in 0..samples {
            if strategy.is_enabled(&params, &user_context(&format!("user-{i}")), "f1") {
                enabled += 1;
            }
        }
        let share = f64::from(enabled) / f64::from(samples);
        assert!(
            (0.47..=0.53).contains(&share),
            "expected ~50% of users enabled, got {share}"
        );
    }
}
