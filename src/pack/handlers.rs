use rand::{thread_rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{cards::Card, Resp};

use super::{
    generator::{Pack, PackGenerator},
    session::Sessions,
    PackError,
};

pub struct AppState {
    generator: PackGenerator,
    sessions: Mutex<Sessions>,
}

impl AppState {
    pub fn new(generator: PackGenerator) -> Self {
        Self {
            generator,
            sessions: Mutex::new(Sessions::new()),
        }
    }

    /// Generate a pack, from a deterministic RNG if a seed is provided.
    fn generate(&self, seed: Option<u64>) -> Result<Pack, PackError> {
        match seed {
            Some(seed) => self.generator.generate(&mut ChaCha8Rng::seed_from_u64(seed)),
            None => self.generator.generate(&mut thread_rng()),
        }
    }
}

#[derive(serde::Deserialize, Default)]
pub struct PackQuery {
    seed: Option<u64>,
}

#[derive(serde::Serialize)]
struct Opened {
    session: Uuid,
    cards: usize,
}

#[derive(serde::Serialize)]
struct Revealed {
    card: Option<Card>,
    remaining: usize,
}

pub async fn handle_pack_request(
    state: std::sync::Arc<AppState>,
    query: PackQuery,
) -> axum::http::Response<String> {
    match state.generate(query.seed) {
        Ok(pack) => Resp::json(&pack),
        Err(e) => {
            tracing::error!("Pack generation failed: {e}");
            Resp::e500(e)
        }
    }
}

pub async fn handle_open_request(
    state: std::sync::Arc<AppState>,
    query: PackQuery,
) -> axum::http::Response<String> {
    let pack = match state.generate(query.seed) {
        Ok(pack) => pack,
        Err(e) => {
            tracing::error!("Pack generation failed: {e}");
            return Resp::e500(e);
        }
    };

    let cards = pack.len();
    let mut sessions = state.sessions.lock().await;
    let session = sessions.open(pack);
    tracing::debug!(
        "Opened session {session} with {cards} cards ({} open).",
        sessions.len()
    );
    Resp::json(&Opened { session, cards })
}

pub async fn handle_reveal_request(
    state: std::sync::Arc<AppState>,
    session: Uuid,
) -> axum::http::Response<String> {
    let Some(reveal) = state.sessions.lock().await.reveal(session) else {
        return Resp::e404(format!("No open session: {session}"));
    };

    if let Some(card) = &reveal.card {
        tracing::debug!("Session {session} revealed {} ({}).", card.name(), card.rarity());
    }
    if reveal.closed {
        tracing::debug!("Session {session} fully revealed.");
    }
    Resp::json(&Revealed {
        card: reveal.card,
        remaining: reveal.remaining,
    })
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use crate::{
        cards::{Card, Catalog},
        pack::{generator::PackGenerator, PackConfig},
    };

    use super::{handle_open_request, handle_pack_request, handle_reveal_request, AppState, PackQuery};

    fn test_state() -> Arc<AppState> {
        let mut catalog = Catalog::new();
        catalog.add_set(
            "swsh12pt5",
            vec![
                Card::sample("swsh12pt5-1", "Common"),
                Card::sample("swsh12pt5-2", "Uncommon"),
            ],
        );
        let config = PackConfig {
            set_weights: vec![("swsh12pt5".to_string(), 1.0)],
            ..Default::default()
        };
        Arc::new(AppState::new(
            PackGenerator::from_config(catalog, &config).unwrap(),
        ))
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_seeded_pack_request() {
        let state = test_state();
        let first = block_on(handle_pack_request(state.clone(), PackQuery { seed: Some(9) }));
        let second = block_on(handle_pack_request(state, PackQuery { seed: Some(9) }));

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.body(), second.body());

        let pack: Vec<Card> = serde_json::from_str(first.body()).unwrap();
        assert!(pack.len() <= 5);
    }

    #[test]
    fn test_open_and_reveal() {
        let state = test_state();
        let resp = block_on(handle_open_request(state.clone(), PackQuery::default()));
        assert_eq!(resp.status(), StatusCode::OK);

        let opened: serde_json::Value = serde_json::from_str(resp.body()).unwrap();
        let session = opened["session"].as_str().unwrap().parse().unwrap();
        let cards = opened["cards"].as_u64().unwrap();

        for i in 0..cards {
            let resp = block_on(handle_reveal_request(state.clone(), session));
            let revealed: serde_json::Value = serde_json::from_str(resp.body()).unwrap();
            assert!(revealed["card"]["id"].is_string());
            assert_eq!(revealed["remaining"].as_u64().unwrap(), cards - i - 1);
        }

        // The last reveal closes the session. An empty pack is closed by its
        // first reveal, which has no card.
        if cards == 0 {
            let resp = block_on(handle_reveal_request(state.clone(), session));
            let revealed: serde_json::Value = serde_json::from_str(resp.body()).unwrap();
            assert!(revealed["card"].is_null());
            assert_eq!(revealed["remaining"].as_u64().unwrap(), 0);
        }

        let resp = block_on(handle_reveal_request(state, session));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
