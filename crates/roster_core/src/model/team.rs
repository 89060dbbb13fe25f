//! Team entity.
//!
//! # Invariants
//! - `name` is never blank.
//! - The member list of a team is a read projection (`TeamWithMembers`);
//!   membership is stored on `members.team_id` only.

use crate::model::audit::{Auditable, Timestamps};
use crate::model::member::Member;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned team identifier.
pub type TeamId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamValidationError {
    BlankName,
}

impl Display for TeamValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "team name must not be blank"),
        }
    }
}

impl Error for TeamValidationError {}

/// A group members can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// `None` until the team is saved.
    pub id: Option<TeamId>,
    pub name: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            timestamps: Timestamps::default(),
        }
    }

    pub fn validate(&self) -> Result<(), TeamValidationError> {
        if self.name.trim().is_empty() {
            return Err(TeamValidationError::BlankName);
        }
        Ok(())
    }
}

impl Auditable for Team {
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

/// A team together with its current members, ordered by member id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamWithMembers {
    pub team: Team,
    pub members: Vec<Member>,
}

impl TeamWithMembers {
    pub fn usernames(&self) -> Vec<&str> {
        self.members
            .iter()
            .map(|member| member.username.as_str())
            .collect()
    }
}
