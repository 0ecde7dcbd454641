//! Canonical service methods and pipeline stages.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six operations every service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Find,
    Get,
    Create,
    Update,
    Patch,
    Remove,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Find,
        Method::Get,
        Method::Create,
        Method::Update,
        Method::Patch,
        Method::Remove,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Remove => "remove",
        }
    }

    /// The event published after a successful call, if the method mutates.
    pub fn event(self) -> Option<&'static str> {
        match self {
            Self::Create => Some("created"),
            Self::Update => Some("updated"),
            Self::Patch => Some("patched"),
            Self::Remove => Some("removed"),
            Self::Find | Self::Get => None,
        }
    }

    /// Inverse of [`Method::event`].
    pub fn from_event(event: &str) -> Option<Self> {
        match event {
            "created" => Some(Self::Create),
            "updated" => Some(Self::Update),
            "patched" => Some(Self::Patch),
            "removed" => Some(Self::Remove),
            _ => None,
        }
    }

    pub fn is_mutation(self) -> bool {
        self.event().is_some()
    }

    /// Whether the call carries a payload (`create`, `update`, `patch`).
    ///
    /// The remaining methods carry only a query.
    pub fn carries_data(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Patch)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| ServiceError::bad_request(format!("Unknown method '{}'", s)))
    }
}

/// Pipeline stage a hook runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookType {
    Before,
    After,
    Error,
}

impl HookType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "error" => Ok(Self::Error),
            other => Err(ServiceError::bad_request(format!(
                "Unknown hook type '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_mutations_have_events() {
        assert_eq!(Method::Find.event(), None);
        assert_eq!(Method::Get.event(), None);
        assert_eq!(Method::Create.event(), Some("created"));
        assert_eq!(Method::Remove.event(), Some("removed"));
        assert!(!Method::Get.is_mutation());
        assert!(Method::Patch.is_mutation());
    }

    #[test]
    fn test_event_names_map_back() {
        for method in Method::ALL {
            if let Some(event) = method.event() {
                assert_eq!(Method::from_event(event), Some(method));
            }
        }
        assert_eq!(Method::from_event("sync"), None);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("PATCH".parse::<Method>().is_err());
        assert!("join".parse::<Method>().is_err());
    }

    #[test]
    fn test_data_location() {
        assert!(Method::Create.carries_data());
        assert!(Method::Update.carries_data());
        assert!(!Method::Find.carries_data());
        assert!(!Method::Remove.carries_data());
    }
}
