//! Member entity.
//!
//! # Responsibility
//! - Define the member record and its team reference.
//! - Validate member state before persistence.
//!
//! # Invariants
//! - `username` is never blank.
//! - `age` is never negative.
//! - `team_id`, when set, points at a saved team.

use crate::model::audit::{Auditable, Timestamps};
use crate::model::team::{Team, TeamId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned member identifier.
pub type MemberId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValidationError {
    BlankUsername,
    NegativeAge(i32),
    /// The referenced team has no identifier yet.
    UnsavedTeam(String),
}

impl Display for MemberValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankUsername => write!(f, "member username must not be blank"),
            Self::NegativeAge(age) => write!(f, "member age must not be negative, got {age}"),
            Self::UnsavedTeam(name) => {
                write!(f, "team `{name}` must be saved before members can join it")
            }
        }
    }
}

impl Error for MemberValidationError {}

/// A persisted person, optionally belonging to one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// `None` until the member is saved.
    pub id: Option<MemberId>,
    pub username: String,
    pub age: i32,
    pub team_id: Option<TeamId>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Member {
    /// Creates an unsaved member with age `0` and no team.
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_age(username, 0)
    }

    pub fn with_age(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team_id: None,
            timestamps: Timestamps::default(),
        }
    }

    /// Creates an unsaved member already assigned to `team`.
    pub fn with_team(
        username: impl Into<String>,
        age: i32,
        team: &Team,
    ) -> Result<Self, MemberValidationError> {
        let mut member = Self::with_age(username, age);
        member.change_team(team)?;
        Ok(member)
    }

    /// Points this member at `team`. The team must already be saved.
    pub fn change_team(&mut self, team: &Team) -> Result<(), MemberValidationError> {
        let team_id = team
            .id
            .ok_or_else(|| MemberValidationError::UnsavedTeam(team.name.clone()))?;
        self.team_id = Some(team_id);
        Ok(())
    }

    pub fn leave_team(&mut self) {
        self.team_id = None;
    }

    pub fn validate(&self) -> Result<(), MemberValidationError> {
        if self.username.trim().is_empty() {
            return Err(MemberValidationError::BlankUsername);
        }
        if self.age < 0 {
            return Err(MemberValidationError::NegativeAge(self.age));
        }
        Ok(())
    }
}

impl Auditable for Member {
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
