use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use uuid::Uuid;

use crate::cards::Card;

use super::generator::Pack;

/// Sessions left idle this long are dropped when the next session opens.
const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Most sessions kept open at once. The oldest is dropped to make room.
const MAX_SESSIONS: usize = 4096;

/// An opened pack, revealed to the user one card at a time.
pub struct Session {
    pack: Pack,
    revealed: usize,
    last_used: Instant,
}

impl Session {
    fn new(pack: Pack, now: Instant) -> Self {
        Self {
            pack,
            revealed: 0,
            last_used: now,
        }
    }

    /// Reveal the next card in the pack, if any remain.
    pub fn reveal_next(&mut self) -> Option<&Card> {
        let card = self.pack.get(self.revealed)?;
        self.revealed += 1;
        Some(card)
    }

    pub fn remaining(&self) -> usize {
        self.pack.len() - self.revealed
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }
}

/// Result of revealing a card from a session.
pub struct Reveal {
    pub card: Option<Card>,
    pub remaining: usize,

    /// Whether the session was closed by this reveal.
    pub closed: bool,
}

/// Sessions in progress, keyed by session ID. A session is dropped as soon as
/// its last card is revealed, or once it has sat idle for `SESSION_TTL`.
#[derive(Default)]
pub struct Sessions {
    open: HashMap<Uuid, Session>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, pack: Pack) -> Uuid {
        self.open_at(pack, Instant::now())
    }

    fn open_at(&mut self, pack: Pack, now: Instant) -> Uuid {
        self.expire(now);
        while self.open.len() >= MAX_SESSIONS {
            let Some(oldest) = self
                .open
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            tracing::debug!("Too many open sessions, dropping {oldest}.");
            self.open.remove(&oldest);
        }

        let id = Uuid::new_v4();
        self.open.insert(id, Session::new(pack, now));
        id
    }

    /// Drop sessions idle for longer than `SESSION_TTL`.
    fn expire(&mut self, now: Instant) {
        let before = self.open.len();
        self.open
            .retain(|_, session| now.saturating_duration_since(session.last_used) < SESSION_TTL);
        let expired = before - self.open.len();
        if expired > 0 {
            tracing::debug!("Expired {expired} idle sessions.");
        }
    }

    /// Reveal the next card of a session. Returns None if the session doesn't
    /// exist. The session is closed once no cards remain.
    pub fn reveal(&mut self, id: Uuid) -> Option<Reveal> {
        self.reveal_at(id, Instant::now())
    }

    fn reveal_at(&mut self, id: Uuid, now: Instant) -> Option<Reveal> {
        let session = self.open.get_mut(&id)?;
        session.last_used = now;
        let card = session.reveal_next().cloned();
        let remaining = session.remaining();
        let closed = session.is_finished();
        if closed {
            self.open.remove(&id);
        }
        Some(Reveal {
            card,
            remaining,
            closed,
        })
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use uuid::Uuid;

    use crate::cards::Card;

    use super::{Session, Sessions, MAX_SESSIONS, SESSION_TTL};

    fn test_pack() -> Vec<Card> {
        vec![
            Card::sample("c-1", "Common"),
            Card::sample("u-1", "Uncommon"),
            Card::sample("r-1", "Rare"),
        ]
    }

    #[test]
    fn test_reveal_in_order() {
        let mut session = Session::new(test_pack(), Instant::now());
        assert_eq!(session.remaining(), 3);

        assert_eq!(session.reveal_next().unwrap().id(), "c-1");
        assert_eq!(session.reveal_next().unwrap().id(), "u-1");
        assert_eq!(session.remaining(), 1);
        assert!(!session.is_finished());

        assert_eq!(session.reveal_next().unwrap().id(), "r-1");
        assert!(session.is_finished());
        assert!(session.reveal_next().is_none());
    }

    #[test]
    fn test_sessions_discarded_when_exhausted() {
        let mut sessions = Sessions::new();
        let id = sessions.open(test_pack());
        let other = sessions.open(test_pack());
        assert_eq!(sessions.len(), 2);

        for (expected, remaining) in [("c-1", 2), ("u-1", 1)] {
            let reveal = sessions.reveal(id).unwrap();
            assert_eq!(reveal.card.unwrap().id(), expected);
            assert_eq!(reveal.remaining, remaining);
            assert!(!reveal.closed);
        }

        // Revealing the final card closes the session straight away.
        let reveal = sessions.reveal(id).unwrap();
        assert_eq!(reveal.card.unwrap().id(), "r-1");
        assert_eq!(reveal.remaining, 0);
        assert!(reveal.closed);
        assert!(sessions.reveal(id).is_none());

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.reveal(other).unwrap().remaining, 2);
    }

    #[test]
    fn test_fully_revealed_sessions_not_kept() {
        let mut sessions = Sessions::new();
        for _ in 0..10_000 {
            let id = sessions.open(vec![Card::sample("c-1", "Common")]);
            assert!(sessions.reveal(id).unwrap().closed);
        }
        assert_eq!(sessions.len(), 0);
    }

    #[test]
    fn test_empty_pack_closes_on_first_reveal() {
        let mut sessions = Sessions::new();
        let id = sessions.open(Vec::new());

        let reveal = sessions.reveal(id).unwrap();
        assert!(reveal.card.is_none());
        assert_eq!(reveal.remaining, 0);
        assert!(reveal.closed);
        assert_eq!(sessions.len(), 0);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let mut sessions = Sessions::new();
        let start = Instant::now();
        let idle = sessions.open_at(test_pack(), start);
        let active = sessions.open_at(test_pack(), start);

        // Revealing refreshes the session.
        let later = start + SESSION_TTL / 2;
        assert!(sessions.reveal_at(active, later).is_some());

        sessions.open_at(test_pack(), start + SESSION_TTL + Duration::from_secs(1));
        assert!(sessions.reveal(idle).is_none());
        assert!(sessions.reveal(active).is_some());
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_open_sessions_bounded() {
        let mut sessions = Sessions::new();
        let start = Instant::now();
        let first = sessions.open_at(test_pack(), start);
        for i in 1..=MAX_SESSIONS {
            sessions.open_at(test_pack(), start + Duration::from_millis(i as u64));
        }

        assert_eq!(sessions.len(), MAX_SESSIONS);
        assert!(sessions.reveal(first).is_none());
    }

    #[test]
    fn test_unknown_session() {
        let mut sessions = Sessions::new();
        assert!(sessions.reveal(Uuid::new_v4()).is_none());
    }
}
