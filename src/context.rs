//! Request-time evaluation context.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps used throughout the crate.
pub type Timestamp = DateTime<Utc>;

/// Describes the request on whose behalf features are evaluated.
///
/// All fields are optional. The context is owned by the caller and read-only to the evaluation
/// functions. Empty strings are treated the same as absent fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Context {
    pub environment: Option<String>,
    pub app_name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub remote_address: Option<String>,
    /// Reference time for date constraints. When unset, evaluation falls back to the `now` value
    /// injected by the caller.
    pub current_time: Option<Timestamp>,
    /// Open-ended custom fields, addressable by constraint `contextName`.
    pub properties: HashMap<String, String>,
}

impl Context {
    /// Resolve a context field by its wire name.
    ///
    /// The predefined fields take precedence over `properties`; `currentTime` resolves to an
    /// RFC 3339 rendering. Empty values resolve to `None`.
    pub fn get(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "environment" => self.environment.as_deref().map(Cow::Borrowed),
            "appName" => self.app_name.as_deref().map(Cow::Borrowed),
            "userId" => self.user_id.as_deref().map(Cow::Borrowed),
            "sessionId" => self.session_id.as_deref().map(Cow::Borrowed),
            "remoteAddress" => self.remote_address.as_deref().map(Cow::Borrowed),
            "currentTime" => self
                .current_time
                .map(|t| Cow::Owned(t.to_rfc3339())),
            _ => self.properties.get(name).map(|v| Cow::Borrowed(v.as_str())),
        };
        value.filter(|v| !v.is_empty())
    }

    pub(crate) fn user_id(&self) -> Option<&str> {
        non_empty(self.user_id.as_deref())
    }

    pub(crate) fn session_id(&self) -> Option<&str> {
        non_empty(self.session_id.as_deref())
    }

    pub(crate) fn remote_address(&self) -> Option<&str> {
        non_empty(self.remote_address.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
