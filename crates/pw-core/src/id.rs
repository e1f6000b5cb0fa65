// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype identifier wrappers shared across the workspace.
//!
//! All identifiers here are assigned by an external collaborator (the
//! orchestration engine, the authoritative store, or a worker run) rather
//! than generated locally, so unlike a typical ID type there is no `new()`
//! that mints a fresh random value. `define_str_id!` only provides the
//! ergonomic wrapper: `Display`, `Deref<Target = str>`, `Borrow<str>`, and
//! cheap `From` conversions.

/// Define a newtype string identifier with the standard set of trait impls.
///
/// ```ignore
/// define_str_id! {
///     /// Doc comment for the ID type.
///     pub struct ModelName;
/// }
/// ```
#[macro_export]
macro_rules! define_str_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

define_str_id! {
    /// Identity of a task as assigned by the orchestration engine.
    pub struct TaskId;
}

define_str_id! {
    /// Name of a tracked entity model (e.g. `"node"`, `"task"`, `"log"`).
    pub struct ModelName;
}

define_str_id! {
    /// Identity of a persisted entity in the authoritative store.
    pub struct EntityId;
}

define_str_id! {
    /// Synthetic identity assigned to a newly created entity in a worker run,
    /// in the form `NEW_INSTANCE_<n>`. Resolved to a real [`EntityId`] when
    /// the parent applies the diff.
    pub struct TempId;
}

impl TempId {
    const PREFIX: &'static str = "NEW_INSTANCE_";

    /// Build the `n`th temp-id minted by one [`ChangeSink`](../index.html) run.
    pub fn nth(n: usize) -> Self {
        Self(format!("{}{}", Self::PREFIX, n))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
