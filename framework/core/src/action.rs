use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kinds of request a scenario operation can issue against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    InsertOne,
    InsertMany,
    UpdateOne,
    FindOne,
    Find,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::InsertOne,
        ActionKind::InsertMany,
        ActionKind::UpdateOne,
        ActionKind::FindOne,
        ActionKind::Find,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::InsertOne => "InsertOne",
            ActionKind::InsertMany => "InsertMany",
            ActionKind::UpdateOne => "UpdateOne",
            ActionKind::FindOne => "FindOne",
            ActionKind::Find => "Find",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a supported [ActionKind].
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("action not supported: {action}")]
pub struct UnsupportedActionError {
    pub action: String,
}

impl FromStr for ActionKind {
    type Err = UnsupportedActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnsupportedActionError {
                action: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_every_action() {
        for kind in ActionKind::ALL {
            assert_eq!(kind, kind.as_str().parse().unwrap());
        }
    }

    #[test]
    fn reject_unknown_action() {
        let err = "DeleteMany".parse::<ActionKind>().unwrap_err();
        assert_eq!("DeleteMany", err.action);
        assert_eq!("action not supported: DeleteMany", err.to_string());
    }

    #[test]
    fn action_names_are_case_sensitive() {
        assert!("insertone".parse::<ActionKind>().is_err());
    }
}
