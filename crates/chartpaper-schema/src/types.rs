//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<String> for $name {
            fn eq(&self, other: &String) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Chart name as declared in `Chart.yaml` (or derived from its location).
    ChartName
);

string_newtype!(
    /// Chart reference understood by the rendering engine, e.g.
    /// `oci://registry-1.docker.io/bitnamicharts/redis` or a local path.
    Location
);

impl Location {
    /// Append `name` as the final path segment unless the location already
    /// ends with it. Repository hints in `Chart.yaml` point at the repository,
    /// not the chart, so this turns a hint into a chart reference.
    pub fn join_chart(&self, name: &str) -> Location {
        let base = self.0.trim_end_matches('/');
        if base.ends_with(&format!("/{name}")) {
            Location::new(base)
        } else {
            Location::new(format!("{base}/{name}"))
        }
    }

    /// Best-effort chart name from the location: last path segment with any
    /// `.tgz` suffix, `@digest`, or `:tag` removed.
    pub fn derive_name(&self) -> String {
        let trimmed = self.0.trim_end_matches('/');
        let without_scheme = trimmed
            .split_once("://")
            .map_or(trimmed, |(_, rest)| rest);
        let segment = without_scheme.rsplit('/').next().unwrap_or("");
        let segment = segment.split('@').next().unwrap_or("");
        let segment = segment.split(':').next().unwrap_or("");
        let segment = segment.strip_suffix(".tgz").unwrap_or(segment);
        // packaged charts are named <chart>-<semver>.tgz
        match segment.rsplit_once('-') {
            Some((head, tail))
                if !head.is_empty() && tail.starts_with(|c: char| c.is_ascii_digit()) =>
            {
                head.to_owned()
            }
            _ => segment.to_owned(),
        }
    }
}
