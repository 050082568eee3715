//! Poll engine - poll/election lifecycle from creation to resolution.
//!
//! State machine per poll: Open -> Expired -> Resolved. A poll is open
//! while `now < expires_at`; votes cast after that are silently dropped.
//! Resolution happens exactly once: concurrent checkers race on a
//! compare-and-swap claim of the `resolved` flag and only the winner
//! applies the outcome.
//!
//! Outcomes:
//! - A "change the creator?" poll whose Yes votes strictly outnumber No
//!   spawns an election among all members except the current creator.
//! - An election whose strictly-highest candidate received at least one
//!   vote transfers the creator role to that candidate. A tie changes
//!   nothing.

pub mod models;
pub mod tally;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::common::{Actor, DomainError, DomainResult, GroupId, MessageId, UserId};
use crate::domains::chat::models::Message;
use crate::domains::groups::models::{Group, Role};
use crate::kernel::store::paths;
use crate::kernel::CoreDeps;
use models::{Choice, Poll};
use tally::count_for;

/// The only poll this app runs; everything else is an election it spawns.
pub const CHANGE_CREATOR_QUESTION: &str = "Should we change the group creator?";

pub struct PollEngine {
    deps: CoreDeps,
}

impl PollEngine {
    pub fn new(deps: CoreDeps) -> Self {
        Self { deps }
    }

    /// Open a "change the creator?" poll in the group's message stream.
    pub async fn create_change_creator_poll(
        &self,
        actor: &Actor,
        group_id: &GroupId,
    ) -> DomainResult<MessageId> {
        self.require_member(group_id, actor.user_id()).await?;

        let now = self.deps.store.now();
        let poll = Poll {
            sender_id: Some(actor.user_id().clone()),
            question: Some(CHANGE_CREATOR_QUESTION.to_string()),
            options: vec!["Yes".to_string(), "No".to_string()],
            candidates: Vec::new(),
            votes: Default::default(),
            created_at: now,
            expires_at: now + Duration::seconds(self.deps.config.poll_duration_secs),
            resolved: false,
        };

        let key = self
            .deps
            .store
            .append(
                &paths::messages(group_id),
                serde_json::to_value(&Message::Poll(poll))?,
            )
            .await?;
        info!(group_id = %group_id, poll_id = %key, "change-creator poll opened");
        Ok(MessageId::from_key(key))
    }

    /// Record a ballot. Last vote wins per user; votes after expiry are
    /// dropped without error.
    pub async fn cast_vote(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        poll_id: &MessageId,
        choice: Choice,
    ) -> DomainResult<()> {
        let (kind, poll) = self.load_poll(group_id, poll_id).await?;
        self.require_member(group_id, actor.user_id()).await?;

        let now = self.deps.store.now();
        if !poll.is_open(now) {
            debug!(group_id = %group_id, poll_id = %poll_id, "vote after expiry ignored");
            return Ok(());
        }
        validate_choice(&kind, &poll, &choice)?;

        self.deps
            .store
            .write(
                &paths::vote(group_id, poll_id, actor.user_id()),
                serde_json::to_value(&choice)?,
            )
            .await?;
        Ok(())
    }

    /// Transition an expired poll to Resolved and apply its outcome.
    ///
    /// Idempotent: returns `true` only for the call that actually performs
    /// the resolution; every other caller (or any call before expiry) gets
    /// `false`.
    pub async fn check_expiry(
        &self,
        group_id: &GroupId,
        poll_id: &MessageId,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let (kind, poll) = self.load_poll(group_id, poll_id).await?;
        if poll.is_open(now) || poll.resolved {
            return Ok(false);
        }

        // Claim the resolution before any side effect
        let claimed = self
            .deps
            .store
            .compare_and_swap(
                &paths::message_resolved(group_id, poll_id),
                Some(Value::Bool(false)),
                Value::Bool(true),
            )
            .await?;
        if !claimed {
            return Ok(false);
        }

        match kind {
            PollKind::Poll => self.resolve_change_creator_poll(group_id, &poll).await?,
            PollKind::Election => self.resolve_election(group_id, &poll).await?,
        }
        Ok(true)
    }

    /// Resolve every expired, unresolved poll in a group. Returns how many
    /// were resolved by this call.
    pub async fn sweep_group(&self, group_id: &GroupId, now: DateTime<Utc>) -> DomainResult<u32> {
        let Some(value) = self.deps.store.read(&paths::messages(group_id)).await? else {
            return Ok(0);
        };
        let messages: std::collections::BTreeMap<String, Message> =
            serde_json::from_value(value)?;

        let mut resolved = 0;
        for (key, message) in messages {
            if matches!(message, Message::Poll(_) | Message::Election(_)) {
                let poll_id = MessageId::from_key(key);
                if self.check_expiry(group_id, &poll_id, now).await? {
                    resolved += 1;
                }
            }
        }
        Ok(resolved)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Strict Yes majority spawns a creator election; anything else ends
    /// the poll quietly.
    async fn resolve_change_creator_poll(
        &self,
        group_id: &GroupId,
        poll: &Poll,
    ) -> DomainResult<()> {
        let yes = count_for(&poll.votes, &Choice::Option(0));
        let no = count_for(&poll.votes, &Choice::Option(1));
        let first_option_is_yes = poll.options.first().map(String::as_str) == Some("Yes");
        if !first_option_is_yes || yes <= no {
            info!(group_id = %group_id, yes, no, "poll closed without an election");
            return Ok(());
        }

        let group = self.load_group(group_id).await?;
        let members = self.load_member_keys(group_id).await?;
        let candidates: Vec<UserId> = members
            .into_iter()
            .filter(|key| key.as_str() != group.creator_id.as_str())
            .map(UserId::from_key)
            .collect();

        let now = self.deps.store.now();
        let election = Poll {
            sender_id: None,
            question: None,
            options: Vec::new(),
            candidates,
            votes: Default::default(),
            created_at: now,
            expires_at: now + Duration::seconds(self.deps.config.election_duration_secs),
            resolved: false,
        };
        let key = self
            .deps
            .store
            .append(
                &paths::messages(group_id),
                serde_json::to_value(&Message::Election(election))?,
            )
            .await?;
        info!(group_id = %group_id, election_id = %key, yes, no, "creator election opened");
        Ok(())
    }

    /// Transfer the creator role to the strictly-highest candidate, if one
    /// exists with at least one vote.
    async fn resolve_election(&self, group_id: &GroupId, poll: &Poll) -> DomainResult<()> {
        let mut winner: Option<&UserId> = None;
        let mut best = 0usize;
        let mut tied = false;
        for candidate in &poll.candidates {
            let count = count_for(&poll.votes, &Choice::Candidate(candidate.clone()));
            if count > best {
                best = count;
                winner = Some(candidate);
                tied = false;
            } else if count == best && count > 0 {
                tied = true;
            }
        }

        let Some(new_creator) = winner else {
            info!(group_id = %group_id, "election ended with no votes");
            return Ok(());
        };
        if tied {
            info!(group_id = %group_id, votes = best, "election tied, creator unchanged");
            return Ok(());
        }

        let members = self.load_member_keys(group_id).await?;
        let mut changes: Vec<(String, Value)> = Vec::new();
        for key in &members {
            let member_id = UserId::from_key(key.clone());
            let role = if key.as_str() == new_creator.as_str() {
                Role::Creator
            } else {
                Role::Member
            };
            changes.push((
                format!("{}/role", paths::member(group_id, &member_id)),
                serde_json::to_value(role)?,
            ));
        }
        changes.push((
            format!("{}/creatorId", paths::group(group_id)),
            serde_json::to_value(new_creator)?,
        ));
        self.deps.store.update(changes).await?;

        info!(group_id = %group_id, new_creator = %new_creator, votes = best, "creator role transferred");
        Ok(())
    }

    // ========================================================================
    // Loaders
    // ========================================================================

    async fn load_poll(
        &self,
        group_id: &GroupId,
        poll_id: &MessageId,
    ) -> DomainResult<(PollKind, Poll)> {
        let value = self
            .deps
            .store
            .read(&paths::message(group_id, poll_id))
            .await?
            .ok_or(DomainError::NotFound("poll"))?;
        match serde_json::from_value(value)? {
            Message::Poll(poll) => Ok((PollKind::Poll, poll)),
            Message::Election(poll) => Ok((PollKind::Election, poll)),
            Message::Text(_) => Err(DomainError::InvalidArgument(
                "message is not a poll".to_string(),
            )),
        }
    }

    async fn load_group(&self, group_id: &GroupId) -> DomainResult<Group> {
        let value = self
            .deps
            .store
            .read(&paths::group(group_id))
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn load_member_keys(&self, group_id: &GroupId) -> DomainResult<Vec<String>> {
        let value = self
            .deps
            .store
            .read(&paths::members(group_id))
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        let Value::Object(members) = value else {
            return Ok(Vec::new());
        };
        Ok(members.keys().cloned().collect())
    }

    async fn require_member(&self, group_id: &GroupId, user_id: &UserId) -> DomainResult<()> {
        let members = self.load_member_keys(group_id).await?;
        if !members.iter().any(|key| key == user_id.as_str()) {
            return Err(DomainError::Forbidden("only group members can vote"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollKind {
    Poll,
    Election,
}

fn validate_choice(kind: &PollKind, poll: &Poll, choice: &Choice) -> DomainResult<()> {
    match (kind, choice) {
        (PollKind::Poll, Choice::Option(index)) if (*index as usize) < poll.options.len() => {
            Ok(())
        }
        (PollKind::Election, Choice::Candidate(candidate))
            if poll.candidates.contains(candidate) =>
        {
            Ok(())
        }
        _ => Err(DomainError::InvalidArgument(
            "choice does not match the poll".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domains::groups::models::Membership;
    use crate::domains::groups::GroupStore;
    use serde_json::json;

    async fn group_with_members(member_keys: &[&str]) -> (CoreDeps, Actor, GroupId) {
        crate::kernel::test_support::init_tracing();
        let deps = CoreDeps::in_memory();
        deps.store
            .write("users/creator", json!({"username": "cora"}))
            .await
            .unwrap();
        let creator = Actor::new(UserId::from_key("creator"));
        let group_id = GroupStore::new(deps.clone())
            .create_group(&creator, "Polls", "icon.png", 1000)
            .await
            .unwrap();

        for key in member_keys {
            let membership = Membership {
                name: key.to_string(),
                joined_at: deps.store.now(),
                role: Role::Member,
            };
            deps.store
                .update(vec![
                    (
                        paths::member(&group_id, &UserId::from_key(*key)),
                        serde_json::to_value(&membership).unwrap(),
                    ),
                    (
                        paths::member_points(&group_id, &UserId::from_key(*key)),
                        json!(1000),
                    ),
                ])
                .await
                .unwrap();
        }
        (deps, creator, group_id)
    }

    async fn find_election(deps: &CoreDeps, group_id: &GroupId) -> Option<(MessageId, Poll)> {
        let value = deps
            .store
            .read(&paths::messages(group_id))
            .await
            .unwrap()?;
        let messages: std::collections::BTreeMap<String, Message> =
            serde_json::from_value(value).unwrap();
        messages.into_iter().find_map(|(key, message)| match message {
            Message::Election(poll) => Some((MessageId::from_key(key), poll)),
            _ => None,
        })
    }

    #[tokio::test]
    async fn yes_majority_spawns_election_excluding_creator() {
        let (deps, creator, group_id) = group_with_members(&["alice", "bob"]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        for voter in ["creator", "alice", "bob"] {
            engine
                .cast_vote(
                    &Actor::new(UserId::from_key(voter)),
                    &group_id,
                    &poll_id,
                    Choice::Option(0),
                )
                .await
                .unwrap();
        }

        let later = deps.store.now() + Duration::hours(4);
        assert!(engine.check_expiry(&group_id, &poll_id, later).await.unwrap());

        let (_, election) = find_election(&deps, &group_id).await.unwrap();
        assert_eq!(election.candidates.len(), 2);
        assert!(!election
            .candidates
            .contains(&UserId::from_key("creator")));
    }

    #[tokio::test]
    async fn no_majority_spawns_nothing() {
        let (deps, creator, group_id) = group_with_members(&["alice", "bob"]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        // Yes=1, No=2
        engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(0))
            .await
            .unwrap();
        for voter in ["alice", "bob"] {
            engine
                .cast_vote(
                    &Actor::new(UserId::from_key(voter)),
                    &group_id,
                    &poll_id,
                    Choice::Option(1),
                )
                .await
                .unwrap();
        }

        let later = deps.store.now() + Duration::hours(4);
        assert!(engine.check_expiry(&group_id, &poll_id, later).await.unwrap());
        assert!(find_election(&deps, &group_id).await.is_none());
    }

    #[tokio::test]
    async fn resolution_happens_exactly_once() {
        let (deps, creator, group_id) = group_with_members(&["alice"]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(0))
            .await
            .unwrap();

        let later = deps.store.now() + Duration::hours(4);
        assert!(engine.check_expiry(&group_id, &poll_id, later).await.unwrap());
        assert!(!engine.check_expiry(&group_id, &poll_id, later).await.unwrap());

        // Only one election was spawned
        let value = deps.store.read(&paths::messages(&group_id)).await.unwrap().unwrap();
        let messages: std::collections::BTreeMap<String, Message> =
            serde_json::from_value(value).unwrap();
        let elections = messages
            .values()
            .filter(|m| matches!(m, Message::Election(_)))
            .count();
        assert_eq!(elections, 1);
    }

    #[tokio::test]
    async fn election_transfers_creator_role_on_strict_majority() {
        let (deps, creator, group_id) = group_with_members(&["alice", "bob", "carol"]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(0))
            .await
            .unwrap();
        let after_poll = deps.store.now() + Duration::hours(4);
        engine.check_expiry(&group_id, &poll_id, after_poll).await.unwrap();

        let (election_id, _) = find_election(&deps, &group_id).await.unwrap();
        // bob gets 2 votes, alice 1
        let ballots = [
            ("creator", "bob"),
            ("alice", "bob"),
            ("bob", "alice"),
        ];
        for (voter, candidate) in ballots {
            engine
                .cast_vote(
                    &Actor::new(UserId::from_key(voter)),
                    &group_id,
                    &election_id,
                    Choice::Candidate(UserId::from_key(candidate)),
                )
                .await
                .unwrap();
        }

        let after_election = deps.store.now() + Duration::hours(9);
        assert!(engine
            .check_expiry(&group_id, &election_id, after_election)
            .await
            .unwrap());

        let groups = GroupStore::new(deps.clone());
        let group = groups.group(&group_id).await.unwrap();
        assert_eq!(group.creator_id, UserId::from_key("bob"));

        let members = groups.members(&group_id).await.unwrap();
        assert_eq!(members.get("bob").unwrap().role, Role::Creator);
        assert_eq!(members.get("creator").unwrap().role, Role::Member);
        assert_eq!(members.get("alice").unwrap().role, Role::Member);
    }

    #[tokio::test]
    async fn tied_election_changes_nothing() {
        let (deps, creator, group_id) = group_with_members(&["alice", "bob"]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(0))
            .await
            .unwrap();
        let after_poll = deps.store.now() + Duration::hours(4);
        engine.check_expiry(&group_id, &poll_id, after_poll).await.unwrap();

        let (election_id, _) = find_election(&deps, &group_id).await.unwrap();
        // alice and bob get one vote each
        engine
            .cast_vote(
                &creator,
                &group_id,
                &election_id,
                Choice::Candidate(UserId::from_key("alice")),
            )
            .await
            .unwrap();
        engine
            .cast_vote(
                &Actor::new(UserId::from_key("alice")),
                &group_id,
                &election_id,
                Choice::Candidate(UserId::from_key("bob")),
            )
            .await
            .unwrap();

        let after_election = deps.store.now() + Duration::hours(9);
        assert!(engine
            .check_expiry(&group_id, &election_id, after_election)
            .await
            .unwrap());

        let group = GroupStore::new(deps.clone()).group(&group_id).await.unwrap();
        assert_eq!(group.creator_id, UserId::from_key("creator"));
    }

    #[tokio::test]
    async fn votes_after_expiry_are_silently_dropped() {
        let config = Config {
            poll_duration_secs: 0,
            ..Config::default()
        };
        let deps = CoreDeps::in_memory_with(config);
        deps.store
            .write("users/creator", json!({"username": "cora"}))
            .await
            .unwrap();
        let creator = Actor::new(UserId::from_key("creator"));
        let group_id = GroupStore::new(deps.clone())
            .create_group(&creator, "Expired", "icon.png", 0)
            .await
            .unwrap();

        let engine = PollEngine::new(deps.clone());
        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();

        engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(0))
            .await
            .unwrap();

        let (_, poll) = engine.load_poll(&group_id, &poll_id).await.unwrap();
        assert!(poll.votes.is_empty());
    }

    #[tokio::test]
    async fn non_members_get_forbidden_even_after_expiry() {
        let config = Config {
            poll_duration_secs: 0,
            ..Config::default()
        };
        let deps = CoreDeps::in_memory_with(config);
        deps.store
            .write("users/creator", json!({"username": "cora"}))
            .await
            .unwrap();
        let creator = Actor::new(UserId::from_key("creator"));
        let group_id = GroupStore::new(deps.clone())
            .create_group(&creator, "Expired", "icon.png", 0)
            .await
            .unwrap();

        let engine = PollEngine::new(deps.clone());
        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();

        // Membership is checked before the expiry short-circuit, so a
        // stranger's late ballot is rejected rather than silently accepted
        let result = engine
            .cast_vote(
                &Actor::new(UserId::from_key("stranger")),
                &group_id,
                &poll_id,
                Choice::Option(0),
            )
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn last_vote_wins_per_user() {
        let (deps, creator, group_id) = group_with_members(&[]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(0))
            .await
            .unwrap();
        engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(1))
            .await
            .unwrap();

        let (_, poll) = engine.load_poll(&group_id, &poll_id).await.unwrap();
        assert_eq!(poll.votes.len(), 1);
        assert_eq!(poll.votes.get("creator"), Some(&Choice::Option(1)));
    }

    #[tokio::test]
    async fn non_members_cannot_vote() {
        let (deps, creator, group_id) = group_with_members(&[]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        let result = engine
            .cast_vote(
                &Actor::new(UserId::from_key("stranger")),
                &group_id,
                &poll_id,
                Choice::Option(0),
            )
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn out_of_range_option_is_rejected() {
        let (deps, creator, group_id) = group_with_members(&[]).await;
        let engine = PollEngine::new(deps.clone());

        let poll_id = engine
            .create_change_creator_poll(&creator, &group_id)
            .await
            .unwrap();
        let result = engine
            .cast_vote(&creator, &group_id, &poll_id, Choice::Option(5))
            .await;
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }
}
