use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::{util::random_string, PrimaryKey};

/// Identifies one connected client. Connection-scoped, not an account id.
pub type SessionId = String;

/// Fans project events out to connected clients.
///
/// A client registers once per connection and can join any number of project
/// rooms. Events published into a room reach every member except the sender.
#[derive(Default)]
pub struct RoomRelay {
    rooms: Mutex<HashMap<PrimaryKey, HashSet<SessionId>>>,
    sessions: Mutex<HashMap<SessionId, UnboundedSender<RoomEvent>>>,
}

/// An event as delivered to room members
#[derive(Debug, Clone, Serialize)]
pub struct RoomEvent {
    pub project_id: PrimaryKey,
    #[serde(flatten)]
    pub kind: EventKind,
    /// The session the event originated from
    pub user_id: SessionId,
    pub timestamp: DateTime<Utc>,
}

/// What happened, along with its client-supplied payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum EventKind {
    ProjectUpdate(Value),
    TrackUpdate(Value),
    CursorUpdate(Value),
    PlaybackSync(Value),
    AudioStream(Value),
    ChatMessage(Value),
    UserJoined(Value),
    UserLeft(Value),
}

impl RoomRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection, returning its id and the receiving end
    /// of its event stream
    pub fn register(&self) -> (SessionId, UnboundedReceiver<RoomEvent>) {
        let session_id = random_string(16);
        let (sender, receiver) = unbounded_channel();

        self.sessions.lock().insert(session_id.clone(), sender);

        (session_id, receiver)
    }

    /// Adds the session to a project room and tells the other members
    pub fn join(&self, session_id: &SessionId, project_id: PrimaryKey) {
        self.rooms
            .lock()
            .entry(project_id)
            .or_default()
            .insert(session_id.clone());

        self.publish(
            session_id,
            project_id,
            EventKind::UserJoined(Value::Object(Default::default())),
        );
    }

    /// Removes the session from a project room and tells the other members
    pub fn leave(&self, session_id: &SessionId, project_id: PrimaryKey) {
        let mut rooms = self.rooms.lock();

        if let Some(members) = rooms.get_mut(&project_id) {
            members.remove(session_id);

            if members.is_empty() {
                rooms.remove(&project_id);
            }
        }

        drop(rooms);

        self.publish(
            session_id,
            project_id,
            EventKind::UserLeft(Value::Object(Default::default())),
        );
    }

    /// Delivers an event to every member of the room except the sender.
    /// The sender does not have to be a member itself.
    pub fn publish(&self, session_id: &SessionId, project_id: PrimaryKey, kind: EventKind) {
        let sessions = self.sessions.lock();

        if !sessions.contains_key(session_id) {
            return;
        }

        let event = RoomEvent {
            project_id,
            kind,
            user_id: session_id.clone(),
            timestamp: Utc::now(),
        };

        let members = self
            .rooms
            .lock()
            .get(&project_id)
            .cloned()
            .unwrap_or_default();

        for member in members {
            if member == *session_id {
                continue;
            }

            if let Some(sender) = sessions.get(&member) {
                // A send only fails when the receiver is gone, which the
                // disconnect path cleans up
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Tears down a connection, leaving every room it was part of
    pub fn disconnect(&self, session_id: &SessionId) {
        let joined: Vec<PrimaryKey> = self
            .rooms
            .lock()
            .iter()
            .filter(|(_, members)| members.contains(session_id))
            .map(|(project_id, _)| *project_id)
            .collect();

        for project_id in joined {
            self.leave(session_id, project_id);
        }

        self.sessions.lock().remove(session_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn events_reach_other_members_once() {
        let relay = RoomRelay::new();

        let (alice, mut alice_events) = relay.register();
        let (bob, mut bob_events) = relay.register();

        relay.join(&alice, 10);
        relay.join(&bob, 10);

        let joined = alice_events.recv().await.expect("alice hears bob join");
        assert!(matches!(joined.kind, EventKind::UserJoined(_)));
        assert_eq!(joined.user_id, bob);

        relay.publish(
            &alice,
            10,
            EventKind::ChatMessage(serde_json::json!({ "text": "hello" })),
        );

        let event = bob_events.recv().await.expect("event arrives");
        assert_eq!(event.user_id, alice);
        assert_eq!(event.project_id, 10);
        assert!(matches!(event.kind, EventKind::ChatMessage(_)));

        assert!(bob_events.try_recv().is_err());
    }

    #[tokio::test]
    async fn senders_do_not_hear_their_own_events() {
        let relay = RoomRelay::new();

        let (alice, mut alice_events) = relay.register();
        relay.join(&alice, 10);

        relay.publish(
            &alice,
            10,
            EventKind::CursorUpdate(serde_json::json!({ "position": 4 })),
        );

        assert!(alice_events.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnecting_notifies_every_joined_room() {
        let relay = RoomRelay::new();

        let (alice, _alice_events) = relay.register();
        let (bob, mut bob_events) = relay.register();
        let (carol, mut carol_events) = relay.register();

        relay.join(&bob, 10);
        relay.join(&carol, 20);
        relay.join(&alice, 10);
        relay.join(&alice, 20);

        // Skip the join notifications
        let _ = bob_events.recv().await;
        let _ = carol_events.recv().await;

        relay.disconnect(&alice);

        let left = bob_events.recv().await.expect("bob hears the departure");
        assert!(matches!(left.kind, EventKind::UserLeft(_)));
        assert_eq!(left.user_id, alice);

        let left = carol_events.recv().await.expect("carol hears the departure");
        assert!(matches!(left.kind, EventKind::UserLeft(_)));

        // Publishing after disconnect reaches nobody
        relay.publish(&bob, 10, EventKind::ChatMessage(serde_json::json!({})));
        assert!(bob_events.try_recv().is_err());
    }
}
