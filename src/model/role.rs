use serde::{Deserialize, Serialize};
use std::fmt;

/// Part a participant plays in a round.
///
/// The interrogator asks questions and submits the decisions; the describer
/// sees the round's image and answers.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    None,
    Interrogator,
    Describer,
}

impl Role {
    /// Role for `own` when paired with `peer`.
    ///
    /// Deterministic: the lexicographically larger name interrogates.
    pub fn for_pair(own: &str, peer: &str) -> Role {
        if own > peer {
            Role::Interrogator
        } else {
            Role::Describer
        }
    }

    pub fn counterpart(self) -> Role {
        match self {
            Role::Interrogator => Role::Describer,
            Role::Describer => Role::Interrogator,
            Role::None => Role::None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::None => write!(f, "none"),
            Role::Interrogator => write!(f, "interrogator"),
            Role::Describer => write!(f, "describer"),
        }
    }
}
