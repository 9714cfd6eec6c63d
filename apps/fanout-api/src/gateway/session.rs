//! Per-connection session state.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::events::PushMessage;

/// A frame queued for the connection's writer task.
#[derive(Debug)]
pub enum Outbound {
    Text(String),
    Ping,
    Close,
}

/// State for a single client connection.
///
/// The outbound sender is the only handle to the socket the rest of the
/// server ever sees; the matching receiver is owned by the connection's
/// writer task. Enqueueing is non-blocking and best-effort.
pub struct Session {
    /// Unique connection identity (`cli_` prefixed ULID).
    pub client_id: String,
    /// Tenant this connection belongs to, fixed at connect time.
    pub system_id: String,
    /// Whether group peers are told about this session's join/leave.
    pub notify_on_presence: bool,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::UnboundedSender<Outbound>,
    /// Tombstone: set exactly once when teardown starts.
    deleted: AtomicBool,
    /// Business identity, bound at most once.
    user_id: Mutex<Option<String>>,
    /// Opaque caller-supplied string bound alongside `user_id`.
    extend: Mutex<Option<String>>,
    /// Groups joined by this session, in join order, unique.
    groups: Mutex<Vec<String>>,
}

impl Session {
    pub fn new(
        client_id: String,
        system_id: String,
        notify_on_presence: bool,
        sender: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            client_id,
            system_id,
            notify_on_presence,
            connected_at: Utc::now(),
            sender,
            deleted: AtomicBool::new(false),
            user_id: Mutex::new(None),
            extend: Mutex::new(None),
            groups: Mutex::new(Vec::new()),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Set the tombstone. Returns `true` for the single caller that actually
    /// flipped it — only that caller may enqueue the disconnect event.
    pub fn mark_deleted(&self) -> bool {
        !self.deleted.swap(true, Ordering::SeqCst)
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.lock().clone()
    }

    pub fn extend(&self) -> Option<String> {
        self.extend.lock().clone()
    }

    /// Bind the business identity. The first non-empty binding wins; later
    /// calls are no-ops. Returns `true` if this call set it.
    pub fn bind_identity(&self, user_id: &str, extend: Option<&str>) -> bool {
        if user_id.is_empty() {
            return false;
        }
        let mut bound = self.user_id.lock();
        if bound.is_some() {
            return false;
        }
        *bound = Some(user_id.to_string());
        if let Some(extend) = extend {
            *self.extend.lock() = Some(extend.to_string());
        }
        true
    }

    pub fn groups(&self) -> Vec<String> {
        self.groups.lock().clone()
    }

    pub fn in_group(&self, group_name: &str) -> bool {
        self.groups.lock().iter().any(|g| g == group_name)
    }

    /// Append a group to this session's list. Returns `false` if the session
    /// already listed it.
    pub fn join_group(&self, group_name: &str) -> bool {
        let mut groups = self.groups.lock();
        if groups.iter().any(|g| g == group_name) {
            return false;
        }
        groups.push(group_name.to_string());
        true
    }

    pub fn lifetime_secs(&self) -> i64 {
        (Utc::now() - self.connected_at).num_seconds()
    }

    /// Enqueue a raw frame. A closed channel means the writer is gone; the
    /// frame is dropped silently.
    pub fn send(&self, frame: Outbound) {
        let _ = self.sender.send(frame);
    }

    /// Enqueue a delivery. Tombstoned sessions are never delivered to, even
    /// if they still appear in an index.
    pub fn deliver(&self, message: &PushMessage) {
        if self.is_deleted() {
            return;
        }
        if let Ok(json) = serde_json::to_string(message) {
            self.send(Outbound::Text(json));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> (Session, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new("cli_1".to_string(), "acme".to_string(), false, tx);
        (session, rx)
    }

    fn push(data: &str) -> PushMessage {
        PushMessage {
            message_id: "1".to_string(),
            send_user_id: String::new(),
            code: 0,
            msg: "success".to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn join_group_is_idempotent() {
        let (session, _rx) = make_session();
        assert!(session.join_group("lobby"));
        assert!(!session.join_group("lobby"));
        assert!(session.join_group("other"));
        assert_eq!(session.groups(), ["lobby", "other"]);
    }

    #[test]
    fn identity_binds_once() {
        let (session, _rx) = make_session();
        assert!(session.bind_identity("u1", Some("meta")));
        assert!(!session.bind_identity("u2", None));
        assert_eq!(session.user_id().as_deref(), Some("u1"));
        assert_eq!(session.extend().as_deref(), Some("meta"));
    }

    #[test]
    fn empty_identity_is_ignored() {
        let (session, _rx) = make_session();
        assert!(!session.bind_identity("", None));
        assert!(session.user_id().is_none());
    }

    #[test]
    fn tombstone_has_a_single_winner() {
        let (session, _rx) = make_session();
        assert!(!session.is_deleted());
        assert!(session.mark_deleted());
        assert!(!session.mark_deleted());
        assert!(session.is_deleted());
    }

    #[test]
    fn deliver_skips_tombstoned_session() {
        let (session, mut rx) = make_session();
        session.deliver(&push("a"));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Text(_))));

        session.mark_deleted();
        session.deliver(&push("b"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_writer_drop_is_silent() {
        let (session, rx) = make_session();
        drop(rx);
        session.send(Outbound::Ping);
    }
}
