use hmac::Hmac;
use hmac::Mac;
use okey_tiles::Tile;
use sha2::Sha256;
use std::time::SystemTime;

type HmacSha256 = Hmac<Sha256>;

/// Serializes a shuffled tile order to the canonical commitment string:
/// a compact JSON array, field order id, Color, Value, IsFalseJoker,
/// no whitespace.
pub fn serialize_tiles(tiles: &[Tile]) -> String {
    serde_json::to_string(tiles).expect("tiles serialize")
}

/// `lowercase_hex(HMAC_SHA256(key = serverSeed, msg = initialState ":" nonce [":" clientSeed]))`
pub fn commitment_hash(
    server_seed: &str,
    initial_state: &str,
    nonce: u64,
    client_seed: Option<&str>,
) -> String {
    let mut mac =
        HmacSha256::new_from_slice(server_seed.as_bytes()).expect("hmac accepts any key length");
    mac.update(initial_state.as_bytes());
    mac.update(b":");
    mac.update(nonce.to_string().as_bytes());
    if let Some(client) = client_seed {
        mac.update(b":");
        mac.update(client.as_bytes());
    }
    hex::encode(mac.finalize().into_bytes())
}

/// Recomputes the hash from revealed inputs and compares.
/// Any single-field tamper fails.
pub fn verify(
    server_seed: &str,
    initial_state: &str,
    nonce: u64,
    client_seed: Option<&str>,
    hash: &str,
) -> bool {
    commitment_hash(server_seed, initial_state, nonce, client_seed) == hash
}

/// A sealed shuffle commitment.
///
/// The seed and initial order stay inside the room until the game reaches a
/// terminal phase; only the hash is published at game start.
#[derive(Debug, Clone)]
pub struct Commitment {
    server_seed: String,
    initial_state: String,
    nonce: u64,
    client_seed: Option<String>,
    hash: String,
    created_at: SystemTime,
    revealed: bool,
    revealed_at: Option<SystemTime>,
}

impl Commitment {
    pub fn new(
        server_seed: String,
        initial_state: String,
        nonce: u64,
        client_seed: Option<String>,
    ) -> Self {
        let hash = commitment_hash(
            &server_seed,
            &initial_state,
            nonce,
            client_seed.as_deref(),
        );
        Self {
            server_seed,
            initial_state,
            nonce,
            client_seed,
            hash,
            created_at: SystemTime::now(),
            revealed: false,
            revealed_at: None,
        }
    }
    pub fn hash(&self) -> &str {
        &self.hash
    }
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
    pub fn client_seed(&self) -> Option<&str> {
        self.client_seed.as_deref()
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
    pub fn revealed(&self) -> bool {
        self.revealed
    }
    /// Unseals the commitment, producing the public reveal record.
    pub fn reveal(&mut self) -> Reveal {
        self.revealed = true;
        self.revealed_at = Some(SystemTime::now());
        Reveal {
            server_seed: self.server_seed.clone(),
            initial_state: self.initial_state.clone(),
            nonce: self.nonce,
            client_seed: self.client_seed.clone(),
            commitment_hash: self.hash.clone(),
        }
    }
    /// The seed, exposed only to the reveal path and settlement record.
    pub fn server_seed(&self) -> &str {
        &self.server_seed
    }
}

/// Everything an observer needs to re-derive and check a commitment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Reveal {
    pub server_seed: String,
    pub initial_state: String,
    pub nonce: u64,
    pub client_seed: Option<String>,
    pub commitment_hash: String,
}

impl Reveal {
    pub fn verify(&self) -> bool {
        verify(
            &self.server_seed,
            &self.initial_state,
            self.nonce,
            self.client_seed.as_deref(),
            &self.commitment_hash,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FairRng;
    use okey_tiles::full_set;

    #[test]
    fn canonical_serialization_shape() {
        let tiles = full_set();
        let json = serialize_tiles(&tiles[..1]);
        assert_eq!(
            json,
            r#"[{"id":0,"Color":"Yellow","Value":1,"IsFalseJoker":false}]"#
        );
        assert!(!serialize_tiles(&tiles).contains(' '));
    }

    #[test]
    fn hash_is_deterministic_and_lowercase() {
        let a = commitment_hash("seed", "state", 1, None);
        let b = commitment_hash("seed", "state", 1, None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn any_tamper_fails_verification() {
        let hash = commitment_hash("seed", "state", 1, Some("client"));
        assert!(verify("seed", "state", 1, Some("client"), &hash));
        assert!(!verify("seedx", "state", 1, Some("client"), &hash));
        assert!(!verify("seed", "statex", 1, Some("client"), &hash));
        assert!(!verify("seed", "state", 2, Some("client"), &hash));
        assert!(!verify("seed", "state", 1, Some("clientx"), &hash));
        assert!(!verify("seed", "state", 1, None, &hash));
    }

    #[test]
    fn client_seed_changes_the_hash() {
        let bare = commitment_hash("seed", "state", 1, None);
        let with = commitment_hash("seed", "state", 1, Some("client"));
        assert_ne!(bare, with);
    }

    #[test]
    fn reveal_round_trips() {
        let mut commitment = Commitment::new(
            "seed".to_string(),
            "state".to_string(),
            9,
            Some("client".to_string()),
        );
        assert!(!commitment.revealed());
        let reveal = commitment.reveal();
        assert!(commitment.revealed());
        assert!(reveal.verify());
    }

    #[test]
    fn committed_shuffle_reproduces_from_reveal() {
        let server_seed = "a3f9c2e14bd05876a3f9c2e14bd05876";
        let nonce = 42;
        let mut rng = FairRng::new(server_seed, None, nonce);
        let mut tiles = full_set();
        okey_rules::shuffle(&mut tiles, &mut rng);
        let state = serialize_tiles(&tiles);
        let mut commitment =
            Commitment::new(server_seed.to_string(), state.clone(), nonce, None);
        let reveal = commitment.reveal();
        assert!(reveal.verify());
        // replay the shuffle from the revealed seed material
        let mut replay_rng = FairRng::new(&reveal.server_seed, None, reveal.nonce);
        let mut replay = full_set();
        okey_rules::shuffle(&mut replay, &mut replay_rng);
        assert_eq!(serialize_tiles(&replay), reveal.initial_state);
    }
}
