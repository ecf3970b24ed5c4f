use rand::RngCore;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Draws a fresh 128-bit server seed from the OS CSPRNG, lowercase hex.
pub fn server_seed() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

static NONCE: AtomicU64 = AtomicU64::new(1);

/// Process-wide monotonically increasing commitment nonce.
pub fn next_nonce() -> u64 {
    NONCE.fetch_add(1, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_hex_and_distinct() {
        let a = server_seed();
        let b = server_seed();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn nonces_increase() {
        let a = next_nonce();
        let b = next_nonce();
        assert!(b > a);
    }
}
