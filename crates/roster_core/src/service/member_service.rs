//! Member use-case service.
//!
//! # Responsibility
//! - Register members, move them between teams and look them up.
//! - Expose paged listing and dynamic search to callers.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - A member is only ever attached to a team that exists.

use crate::model::member::{Member, MemberId};
use crate::model::team::{Team, TeamId, TeamWithMembers};
use crate::repo::error::{Entity, RepoError, RepoResult};
use crate::repo::member_repo::MemberRepository;
use crate::repo::member_search::{MemberSearchCondition, MemberSearchRepository, MemberTeamDto};
use crate::repo::paging::{CountMode, Page, PageRequest};
use crate::repo::team_repo::TeamRepository;
use log::info;

/// Use-case service over member and team repositories.
pub struct MemberService<R, T>
where
    R: MemberRepository + MemberSearchRepository,
    T: TeamRepository,
{
    members: R,
    teams: T,
}

impl<R, T> MemberService<R, T>
where
    R: MemberRepository + MemberSearchRepository,
    T: TeamRepository,
{
    pub fn new(members: R, teams: T) -> Self {
        Self { members, teams }
    }

    pub fn create_team(&self, name: impl Into<String>) -> RepoResult<Team> {
        let mut team = Team::new(name);
        self.teams.save(&mut team)?;
        Ok(team)
    }

    /// Registers a member, optionally inside an existing team.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when `team_id` does not exist.
    /// - `RepoError::MemberValidation` for blank usernames or negative ages.
    pub fn join(
        &self,
        username: impl Into<String>,
        age: i32,
        team_id: Option<TeamId>,
    ) -> RepoResult<Member> {
        let mut member = Member::with_age(username, age);
        if let Some(team_id) = team_id {
            let team = self.require_team(team_id)?;
            member.change_team(&team)?;
        }
        let member_id = self.members.save(&mut member)?;
        info!(
            "event=member_join module=service status=ok member_id={member_id} has_team={}",
            member.team_id.is_some()
        );
        Ok(member)
    }

    pub fn change_team(&self, member_id: MemberId, team_id: TeamId) -> RepoResult<Member> {
        let mut member = self.require_member(member_id)?;
        let team = self.require_team(team_id)?;
        member.change_team(&team)?;
        self.members.update(&mut member)?;
        Ok(member)
    }

    /// Absence is `Ok(None)`.
    pub fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        self.members.find_by_id(id)
    }

    /// Like `get_member`, but absence is `RepoError::NotFound`.
    pub fn require_member(&self, id: MemberId) -> RepoResult<Member> {
        self.members.find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: Entity::Member,
            id,
        })
    }

    pub fn list_members(&self, page: &PageRequest) -> RepoResult<Page<Member>> {
        self.members.find_all_page(page)
    }

    /// Dynamic search; the total is derived from the page when possible.
    pub fn search_members(
        &self,
        condition: &MemberSearchCondition,
        page: Option<&PageRequest>,
    ) -> RepoResult<Page<MemberTeamDto>> {
        self.members.search_page(condition, page, CountMode::Optimized)
    }

    pub fn team_roster(&self, team_id: TeamId) -> RepoResult<TeamWithMembers> {
        self.teams
            .find_with_members(team_id)?
            .ok_or(RepoError::NotFound {
                entity: Entity::Team,
                id: team_id,
            })
    }

    /// Inserts `user0..user{count-1}` (age = index) into an empty store,
    /// all or nothing.
    ///
    /// Returns the number of inserted members; `0` when members already exist.
    pub fn seed_demo_members(&self, count: u32) -> RepoResult<u32> {
        if self.members.count()? > 0 {
            return Ok(0);
        }
        let mut demo = (0..count)
            .map(|index| {
                let age = i32::try_from(index).map_err(|_| {
                    RepoError::InvalidArgument(format!("seed count {count} is out of range"))
                })?;
                Ok(Member::with_age(format!("user{index}"), age))
            })
            .collect::<RepoResult<Vec<_>>>()?;
        self.members.save_all(&mut demo)?;
        info!("event=seed_members module=service status=ok inserted={count}");
        Ok(count)
    }

    fn require_team(&self, id: TeamId) -> RepoResult<Team> {
        self.teams.find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: Entity::Team,
            id,
        })
    }
}
