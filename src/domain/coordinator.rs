//! Process-wide room coordination state.
//!
//! The presence registry, leader assignments, pending departures and per-room
//! playback state live together behind a single lock, injected into the use
//! cases as one coordinator object. Every routing decision (join plus leader
//! assignment, optimistic removal, handover, grace claim) is a single
//! critical section with no suspension point inside, so no two events can
//! observe a half-applied transition.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;

use super::entity::Participant;
use super::value_object::{ConnectionId, RoomId, UserStatus, Username, VideoId};

/// Lifecycle of a participant as tracked by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantLifecycle {
    /// Listed in some room's presence entry.
    Present,
    /// Optimistically removed; the grace window has not expired yet.
    PendingDeparture,
    /// Neither present nor pending.
    Gone,
}

/// Captured state of a departing participant, held until the grace window
/// expires or the same username rejoins.
#[derive(Debug, Clone)]
pub struct PendingDeparture {
    pub room_id: RoomId,
    pub participant: Participant,
    epoch: u64,
}

/// Identifies one scheduled departure. A finalize may only claim the pending
/// entry armed with the same epoch, so a timer outlived by a rejoin-and-leave
/// cycle expires against a stale epoch and claims nothing.
#[derive(Debug, Clone)]
pub struct DepartureTicket {
    pub username: Username,
    epoch: u64,
}

/// Per-room playback sync state. Not persisted; dropped on teardown.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub selected_video: Option<VideoId>,
    pub sync_enabled: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            selected_video: None,
            sync_enabled: true,
        }
    }
}

/// Result of a join, decided atomically under the coordinator lock.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Updated presence list for broadcast.
    pub participants: Vec<Participant>,
    /// The room's leader after the join (first writer wins).
    pub leader: Username,
    /// The username was pending departure and the grace timer was disarmed.
    pub reconnected: bool,
    /// The username was already present; no new entry was appended.
    pub already_present: bool,
}

/// Result of a finalized departure.
#[derive(Debug, Clone)]
pub struct DepartureOutcome {
    /// Presence list after the departure.
    pub participants: Vec<Participant>,
    /// Leader after handover evaluation; `None` when the room emptied.
    pub leader: Option<Username>,
    pub room_empty: bool,
}

/// Snapshot of one room's coordination state, for the debug endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub participants: Vec<Participant>,
    pub leader: Option<Username>,
    pub playback: PlaybackState,
}

#[derive(Default)]
struct CoordinatorState {
    /// Presence entries, insertion order = join order. Index 0 is the
    /// fallback leader candidate.
    rooms: HashMap<RoomId, Vec<Participant>>,
    leaders: HashMap<RoomId, Username>,
    pending: HashMap<Username, PendingDeparture>,
    playback: HashMap<RoomId, PlaybackState>,
    next_epoch: u64,
}

impl CoordinatorState {
    fn is_leader_connection(&self, room_id: &RoomId, connection_id: ConnectionId) -> bool {
        let Some(leader) = self.leaders.get(room_id) else {
            return false;
        };
        self.rooms
            .get(room_id)
            .and_then(|participants| {
                participants
                    .iter()
                    .find(|p| p.connection_id == connection_id)
            })
            .is_some_and(|p| p.username == *leader)
    }

    fn sync_enabled(&self, room_id: &RoomId) -> bool {
        self.playback
            .get(room_id)
            .is_none_or(|playback| playback.sync_enabled)
    }
}

/// Single authority over presence, leadership, grace timers and playback
/// state for every room served by this process.
pub struct RoomCoordinator {
    state: Mutex<CoordinatorState>,
}

impl RoomCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Handle a join as one atomic step: disarm any pending departure for the
    /// username, create the room entry on first join, append the participant
    /// unless the username is already present, and assign the leader if the
    /// room has none.
    pub async fn join(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
        username: &Username,
    ) -> JoinOutcome {
        let mut state = self.state.lock().await;

        // Disarming the grace timer must precede every other join side
        // effect; a reconnect inside the window stays invisible.
        let reconnected = state.pending.remove(username).is_some();

        let entry = state.rooms.entry(room_id.clone()).or_default();
        let already_present = entry.iter().any(|p| p.username == *username);
        if !already_present {
            entry.push(Participant::new(connection_id, username.clone()));
        }
        let participants = entry.clone();

        state.playback.entry(room_id.clone()).or_default();
        let leader = state
            .leaders
            .entry(room_id.clone())
            .or_insert_with(|| username.clone())
            .clone();

        JoinOutcome {
            participants,
            leader,
            reconnected,
            already_present,
        }
    }

    /// Update the status of every participant matching the username (a user
    /// is expected in at most one room, but the lookup spans all of them as
    /// a safety net). Returns the rooms whose list actually changed, with
    /// fresh snapshots for targeted broadcast.
    pub async fn record_status(
        &self,
        username: &Username,
        status: UserStatus,
    ) -> Vec<(RoomId, Vec<Participant>)> {
        let mut state = self.state.lock().await;
        let mut changed = Vec::new();
        for (room_id, participants) in state.rooms.iter_mut() {
            let mut touched = false;
            for participant in participants.iter_mut() {
                if participant.username == *username && participant.status != status {
                    participant.status = status;
                    touched = true;
                }
            }
            if touched {
                changed.push((room_id.clone(), participants.clone()));
            }
        }
        changed
    }

    /// Optimistic removal at raw-disconnect time. The room entry is kept
    /// (even when emptied) and the leader assignment is untouched until the
    /// departure finalizes: the grace window only delays the externally
    /// visible consequences.
    pub async fn remove_by_connection(
        &self,
        connection_id: ConnectionId,
    ) -> Option<(RoomId, Participant)> {
        let mut state = self.state.lock().await;
        for (room_id, participants) in state.rooms.iter_mut() {
            if let Some(index) = participants
                .iter()
                .position(|p| p.connection_id == connection_id)
            {
                let removed = participants.remove(index);
                return Some((room_id.clone(), removed));
            }
        }
        None
    }

    /// Arm the grace window for a departed participant. An existing pending
    /// entry for the same username is replaced; its timer then holds a stale
    /// ticket and claims nothing at expiry.
    pub async fn schedule_departure(
        &self,
        room_id: RoomId,
        participant: Participant,
    ) -> DepartureTicket {
        let mut state = self.state.lock().await;
        state.next_epoch += 1;
        let epoch = state.next_epoch;
        let username = participant.username.clone();
        state.pending.insert(
            username.clone(),
            PendingDeparture {
                room_id,
                participant,
                epoch,
            },
        );
        DepartureTicket { username, epoch }
    }

    /// Claim a pending departure at timer expiry. Returns `None` when the
    /// departure was cancelled by a rejoin or replaced by a newer schedule.
    pub async fn claim_departure(&self, ticket: &DepartureTicket) -> Option<PendingDeparture> {
        let mut state = self.state.lock().await;
        let armed = state
            .pending
            .get(&ticket.username)
            .is_some_and(|pending| pending.epoch == ticket.epoch);
        if armed {
            state.pending.remove(&ticket.username)
        } else {
            None
        }
    }

    /// Evaluate leader handover and room emptiness for a finalized
    /// departure. When the departed user held the lead, the longest-tenured
    /// remaining member (index 0 of the post-removal list) takes over. An
    /// emptied room loses its presence entry, leader and playback state.
    pub async fn finalize_departure(
        &self,
        room_id: &RoomId,
        departed: &Username,
    ) -> DepartureOutcome {
        let mut state = self.state.lock().await;
        let participants = state.rooms.get(room_id).cloned().unwrap_or_default();

        if participants.is_empty() {
            state.rooms.remove(room_id);
            state.leaders.remove(room_id);
            state.playback.remove(room_id);
            return DepartureOutcome {
                participants,
                leader: None,
                room_empty: true,
            };
        }

        let was_leader = state.leaders.get(room_id).is_some_and(|l| l == departed);
        if was_leader {
            let new_leader = participants[0].username.clone();
            state.leaders.insert(room_id.clone(), new_leader);
        }
        let leader = state.leaders.get(room_id).cloned();

        DepartureOutcome {
            participants,
            leader,
            room_empty: false,
        }
    }

    pub async fn participants(&self, room_id: &RoomId) -> Vec<Participant> {
        let state = self.state.lock().await;
        state.rooms.get(room_id).cloned().unwrap_or_default()
    }

    pub async fn is_empty(&self, room_id: &RoomId) -> bool {
        let state = self.state.lock().await;
        state.rooms.get(room_id).is_none_or(|p| p.is_empty())
    }

    pub async fn leader(&self, room_id: &RoomId) -> Option<Username> {
        let state = self.state.lock().await;
        state.leaders.get(room_id).cloned()
    }

    /// Fan-out targets for a room: the connection of every present
    /// participant.
    pub async fn connections(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state
            .rooms
            .get(room_id)
            .map(|participants| participants.iter().map(|p| p.connection_id).collect())
            .unwrap_or_default()
    }

    /// Lifecycle state of a username, for asserting transitions.
    pub async fn lifecycle(&self, username: &Username) -> ParticipantLifecycle {
        let state = self.state.lock().await;
        if state
            .rooms
            .values()
            .any(|participants| participants.iter().any(|p| p.username == *username))
        {
            ParticipantLifecycle::Present
        } else if state.pending.contains_key(username) {
            ParticipantLifecycle::PendingDeparture
        } else {
            ParticipantLifecycle::Gone
        }
    }

    /// Advisory policy check gating playback relays: the sender's connection
    /// must belong to the room's leader and room-level sync must be enabled.
    /// This is UX policy, not a security boundary.
    pub async fn is_sync_authority(&self, room_id: &RoomId, connection_id: ConnectionId) -> bool {
        let state = self.state.lock().await;
        state.is_leader_connection(room_id, connection_id) && state.sync_enabled(room_id)
    }

    /// Leader-only toggle of room-level sync. Returns whether the toggle was
    /// applied.
    pub async fn set_sync_enabled(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
        enabled: bool,
    ) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_leader_connection(room_id, connection_id) {
            return false;
        }
        if let Some(playback) = state.playback.get_mut(room_id) {
            playback.sync_enabled = enabled;
            true
        } else {
            false
        }
    }

    /// Record the leader's video selection. Returns whether the sender held
    /// sync authority and the selection was applied.
    pub async fn select_video(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
        video_id: VideoId,
    ) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_leader_connection(room_id, connection_id) || !state.sync_enabled(room_id) {
            return false;
        }
        if let Some(playback) = state.playback.get_mut(room_id) {
            playback.selected_video = Some(video_id);
            true
        } else {
            false
        }
    }

    pub async fn selected_video(&self, room_id: &RoomId) -> Option<VideoId> {
        let state = self.state.lock().await;
        state
            .playback
            .get(room_id)
            .and_then(|playback| playback.selected_video.clone())
    }

    /// Snapshot of every room, for the debug endpoint.
    pub async fn snapshot(&self) -> Vec<RoomSnapshot> {
        let state = self.state.lock().await;
        state
            .rooms
            .iter()
            .map(|(room_id, participants)| RoomSnapshot {
                room_id: room_id.clone(),
                participants: participants.clone(),
                leader: state.leaders.get(room_id).cloned(),
                playback: state.playback.get(room_id).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

impl Default for RoomCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomId {
        RoomId::new("r1")
    }

    fn user(name: &str) -> Username {
        Username::new(name)
    }

    #[tokio::test]
    async fn test_first_join_creates_room_and_elects_leader() {
        // given:
        let coordinator = RoomCoordinator::new();

        // when:
        let outcome = coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // then:
        assert_eq!(outcome.participants.len(), 1);
        assert_eq!(outcome.leader, user("alice"));
        assert!(!outcome.reconnected);
        assert!(!outcome.already_present);
        assert!(!coordinator.is_empty(&room()).await);
    }

    #[tokio::test]
    async fn test_join_is_idempotent_by_username() {
        // given:
        let coordinator = RoomCoordinator::new();
        coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // when: the same username joins again from another connection
        let outcome = coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // then: no duplicate entry is appended
        assert!(outcome.already_present);
        assert_eq!(outcome.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_later_joins_do_not_change_leader() {
        // given:
        let coordinator = RoomCoordinator::new();
        coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // when:
        let outcome = coordinator
            .join(&room(), ConnectionId::new(), &user("bob"))
            .await;

        // then: first writer wins
        assert_eq!(outcome.leader, user("alice"));
        assert_eq!(outcome.participants.len(), 2);
        assert_eq!(outcome.participants[0].username, user("alice"));
        assert_eq!(outcome.participants[1].username, user("bob"));
    }

    #[tokio::test]
    async fn test_record_status_returns_only_changed_rooms() {
        // given:
        let coordinator = RoomCoordinator::new();
        coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // when:
        let changed = coordinator
            .record_status(&user("alice"), UserStatus::Idle)
            .await;

        // then:
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].0, room());
        assert_eq!(changed[0].1[0].status, UserStatus::Idle);

        // when: the same status is reported again
        let unchanged = coordinator
            .record_status(&user("alice"), UserStatus::Idle)
            .await;

        // then: no room reports a change
        assert!(unchanged.is_empty());
    }

    #[tokio::test]
    async fn test_record_status_for_unknown_username_changes_nothing() {
        // given:
        let coordinator = RoomCoordinator::new();
        coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // when:
        let changed = coordinator
            .record_status(&user("ghost"), UserStatus::Idle)
            .await;

        // then:
        assert!(changed.is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_connection_keeps_room_entry_and_leader() {
        // given:
        let coordinator = RoomCoordinator::new();
        let conn = ConnectionId::new();
        coordinator.join(&room(), conn, &user("alice")).await;

        // when:
        let removed = coordinator.remove_by_connection(conn).await;

        // then: the participant is gone from the list, but the (empty) room
        // entry and the leader survive until the departure finalizes
        let (room_id, participant) = removed.expect("participant should be found");
        assert_eq!(room_id, room());
        assert_eq!(participant.username, user("alice"));
        assert!(coordinator.is_empty(&room()).await);
        assert_eq!(coordinator.leader(&room()).await, Some(user("alice")));
    }

    #[tokio::test]
    async fn test_remove_by_unknown_connection_returns_none() {
        // given:
        let coordinator = RoomCoordinator::new();
        coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // when:
        let removed = coordinator.remove_by_connection(ConnectionId::new()).await;

        // then:
        assert!(removed.is_none());
    }

    #[tokio::test]
    async fn test_claim_succeeds_with_matching_ticket() {
        // given:
        let coordinator = RoomCoordinator::new();
        let conn = ConnectionId::new();
        coordinator.join(&room(), conn, &user("alice")).await;
        let (room_id, participant) = coordinator.remove_by_connection(conn).await.unwrap();

        // when:
        let ticket = coordinator.schedule_departure(room_id, participant).await;
        let pending = coordinator.claim_departure(&ticket).await;

        // then:
        assert!(pending.is_some());
        assert_eq!(pending.unwrap().participant.username, user("alice"));

        // and: a second claim finds nothing
        assert!(coordinator.claim_departure(&ticket).await.is_none());
    }

    #[tokio::test]
    async fn test_rejoin_disarms_pending_departure() {
        // given:
        let coordinator = RoomCoordinator::new();
        let conn = ConnectionId::new();
        coordinator.join(&room(), conn, &user("alice")).await;
        let (room_id, participant) = coordinator.remove_by_connection(conn).await.unwrap();
        let ticket = coordinator.schedule_departure(room_id, participant).await;

        // when: alice rejoins before the timer fires
        let outcome = coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;

        // then: the join reports the reconnect and the claim is void
        assert!(outcome.reconnected);
        assert_eq!(outcome.leader, user("alice"));
        assert!(coordinator.claim_departure(&ticket).await.is_none());
    }

    #[tokio::test]
    async fn test_replaced_schedule_invalidates_stale_ticket() {
        // given:
        let coordinator = RoomCoordinator::new();
        let conn = ConnectionId::new();
        coordinator.join(&room(), conn, &user("alice")).await;
        let (room_id, participant) = coordinator.remove_by_connection(conn).await.unwrap();
        let stale = coordinator
            .schedule_departure(room_id.clone(), participant.clone())
            .await;

        // when: a newer schedule replaces the pending entry
        let fresh = coordinator.schedule_departure(room_id, participant).await;

        // then: only the fresh ticket claims
        assert!(coordinator.claim_departure(&stale).await.is_none());
        assert!(coordinator.claim_departure(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_leader_departure_hands_over_to_longest_tenured() {
        // given: [alice, bob, charlie] with leader alice
        let coordinator = RoomCoordinator::new();
        let alice_conn = ConnectionId::new();
        coordinator.join(&room(), alice_conn, &user("alice")).await;
        coordinator
            .join(&room(), ConnectionId::new(), &user("bob"))
            .await;
        coordinator
            .join(&room(), ConnectionId::new(), &user("charlie"))
            .await;
        coordinator.remove_by_connection(alice_conn).await;

        // when:
        let outcome = coordinator.finalize_departure(&room(), &user("alice")).await;

        // then: bob, not charlie, takes over
        assert_eq!(outcome.leader, Some(user("bob")));
        assert!(!outcome.room_empty);
        assert_eq!(coordinator.leader(&room()).await, Some(user("bob")));
    }

    #[tokio::test]
    async fn test_non_leader_departure_keeps_leader() {
        // given:
        let coordinator = RoomCoordinator::new();
        coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;
        let bob_conn = ConnectionId::new();
        coordinator.join(&room(), bob_conn, &user("bob")).await;
        coordinator.remove_by_connection(bob_conn).await;

        // when:
        let outcome = coordinator.finalize_departure(&room(), &user("bob")).await;

        // then:
        assert_eq!(outcome.leader, Some(user("alice")));
    }

    #[tokio::test]
    async fn test_last_departure_empties_room_state() {
        // given:
        let coordinator = RoomCoordinator::new();
        let conn = ConnectionId::new();
        coordinator.join(&room(), conn, &user("alice")).await;
        coordinator.remove_by_connection(conn).await;

        // when:
        let outcome = coordinator.finalize_departure(&room(), &user("alice")).await;

        // then: presence entry, leader and playback state are all dropped
        assert!(outcome.room_empty);
        assert_eq!(outcome.leader, None);
        assert!(coordinator.is_empty(&room()).await);
        assert_eq!(coordinator.leader(&room()).await, None);
        assert_eq!(coordinator.selected_video(&room()).await, None);
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        // given:
        let coordinator = RoomCoordinator::new();
        let alice = user("alice");
        assert_eq!(
            coordinator.lifecycle(&alice).await,
            ParticipantLifecycle::Gone
        );

        // when: alice joins
        let conn = ConnectionId::new();
        coordinator.join(&room(), conn, &alice).await;

        // then:
        assert_eq!(
            coordinator.lifecycle(&alice).await,
            ParticipantLifecycle::Present
        );

        // when: alice's connection drops
        let (room_id, participant) = coordinator.remove_by_connection(conn).await.unwrap();
        let ticket = coordinator.schedule_departure(room_id, participant).await;

        // then:
        assert_eq!(
            coordinator.lifecycle(&alice).await,
            ParticipantLifecycle::PendingDeparture
        );

        // when: the grace window expires unanswered
        let pending = coordinator.claim_departure(&ticket).await.unwrap();
        coordinator
            .finalize_departure(&pending.room_id, &pending.participant.username)
            .await;

        // then:
        assert_eq!(
            coordinator.lifecycle(&alice).await,
            ParticipantLifecycle::Gone
        );
    }

    #[tokio::test]
    async fn test_sync_authority_requires_leader_connection() {
        // given:
        let coordinator = RoomCoordinator::new();
        let alice_conn = ConnectionId::new();
        let bob_conn = ConnectionId::new();
        coordinator.join(&room(), alice_conn, &user("alice")).await;
        coordinator.join(&room(), bob_conn, &user("bob")).await;

        // then:
        assert!(coordinator.is_sync_authority(&room(), alice_conn).await);
        assert!(!coordinator.is_sync_authority(&room(), bob_conn).await);
    }

    #[tokio::test]
    async fn test_disabling_sync_revokes_authority() {
        // given:
        let coordinator = RoomCoordinator::new();
        let alice_conn = ConnectionId::new();
        coordinator.join(&room(), alice_conn, &user("alice")).await;

        // when:
        let applied = coordinator.set_sync_enabled(&room(), alice_conn, false).await;

        // then: even the leader no longer relays
        assert!(applied);
        assert!(!coordinator.is_sync_authority(&room(), alice_conn).await);
    }

    #[tokio::test]
    async fn test_sync_toggle_by_non_leader_is_rejected() {
        // given:
        let coordinator = RoomCoordinator::new();
        coordinator
            .join(&room(), ConnectionId::new(), &user("alice"))
            .await;
        let bob_conn = ConnectionId::new();
        coordinator.join(&room(), bob_conn, &user("bob")).await;

        // when:
        let applied = coordinator.set_sync_enabled(&room(), bob_conn, false).await;

        // then: the toggle is ignored and sync stays enabled
        assert!(!applied);
        let snapshot = coordinator.snapshot().await;
        assert!(snapshot[0].playback.sync_enabled);
    }

    #[tokio::test]
    async fn test_select_video_is_authority_gated() {
        // given:
        let coordinator = RoomCoordinator::new();
        let alice_conn = ConnectionId::new();
        let bob_conn = ConnectionId::new();
        coordinator.join(&room(), alice_conn, &user("alice")).await;
        coordinator.join(&room(), bob_conn, &user("bob")).await;

        // when: the non-leader tries first
        let rejected = coordinator
            .select_video(&room(), bob_conn, VideoId::new("dQw4w9WgXcQ"))
            .await;

        // then:
        assert!(!rejected);
        assert_eq!(coordinator.selected_video(&room()).await, None);

        // when: the leader selects
        let applied = coordinator
            .select_video(&room(), alice_conn, VideoId::new("dQw4w9WgXcQ"))
            .await;

        // then:
        assert!(applied);
        assert_eq!(
            coordinator.selected_video(&room()).await,
            Some(VideoId::new("dQw4w9WgXcQ"))
        );
    }
}
