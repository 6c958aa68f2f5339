//! Explicit environment handed to child processes.
//!
//! The process environment is captured once into a [`ToolEnv`]; every
//! overlay returns a new value, and the child is launched with exactly the
//! resulting map. Nothing here reads or writes the global environment after
//! [`ToolEnv::from_process`].

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// Variable selecting the AWS credential profile for a child process
pub const PROFILE_VAR: &str = "AWS_PROFILE";

/// Operator escape hatch: stop after a successful dry run when set to `1`
pub const STOP_AFTER_VALIDATION_VAR: &str = "PCLUSTER_STOP_AFTER_VALIDATION";

/// Immutable snapshot of environment variables.
///
/// Names and values are kept as raw OS strings so a variable that is not
/// valid UTF-8 still reaches the child untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolEnv {
    vars: BTreeMap<OsString, OsString>,
}

impl ToolEnv {
    /// Empty environment (children see no variables at all)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the current process environment, every variable included
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Value of `key` as text; `None` when unset or not valid UTF-8
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }

    /// Raw value of `key`
    pub fn get_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Copy with a single variable set
    pub fn with_var(&self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let mut next = self.clone();
        next.vars.insert(key.into(), value.into());
        next
    }

    /// Copy with `AWS_PROFILE` set; `None` leaves the inherited value alone
    pub fn with_profile(&self, profile: Option<&str>) -> Self {
        match profile {
            Some(profile) => self.with_var(PROFILE_VAR, profile),
            None => self.clone(),
        }
    }

    /// Copy with every entry of `overrides` applied on top
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut next = self.clone();
        for (key, value) in overrides {
            next.vars.insert(key.into(), value.into());
        }
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for ToolEnv {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// True only when the stop flag is exactly `"1"`
pub fn should_stop_after_validation(env: &ToolEnv) -> bool {
    env.get(STOP_AFTER_VALIDATION_VAR) == Some("1")
}
