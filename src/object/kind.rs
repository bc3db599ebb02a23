//! # Resource kind identifier.
//!
//! A [`GroupVersionKind`] names the schema of a class of remote objects. It is
//! the key of the process-wide cache map: one watch exists per distinct value.
//!
//! ## Example
//! ```rust
//! use kindsource::GroupVersionKind;
//!
//! let gvk = GroupVersionKind::new("apps", "v1", "Deployment");
//! assert_eq!(gvk.to_string(), "apps/v1, Kind=Deployment");
//!
//! let core = GroupVersionKind::new("", "v1", "Pod");
//! assert_eq!(core.to_string(), "v1, Kind=Pod");
//! ```

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Group, version and kind of a remote object schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group (empty for the core group).
    pub group: Cow<'static, str>,
    /// API version within the group.
    pub version: Cow<'static, str>,
    /// Kind name, e.g. `Deployment`.
    pub kind: Cow<'static, str>,
}

impl GroupVersionKind {
    /// Creates a new identifier.
    pub fn new(
        group: impl Into<Cow<'static, str>>,
        version: impl Into<Cow<'static, str>>,
        kind: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Returns `group/version`, or just `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_api_version_core_group() {
        let gvk = GroupVersionKind::new("", "v1", "Namespace");
        assert_eq!(gvk.api_version(), "v1");
    }

    #[test]
    fn test_equal_values_hash_to_one_key() {
        let mut set = HashSet::new();
        set.insert(GroupVersionKind::new("apps", "v1", "Deployment"));
        set.insert(GroupVersionKind::new(
            String::from("apps"),
            String::from("v1"),
            String::from("Deployment"),
        ));
        set.insert(GroupVersionKind::new("apps", "v1beta1", "Deployment"));
        assert_eq!(set.len(), 2);
    }
}
