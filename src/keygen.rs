//! Random API key generation for the image host.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;

pub const DEFAULT_KEY_LENGTH: usize = 32;

/// Generate one key of `length` characters.
///
/// Draws directly from the OS CSPRNG; `Alphanumeric` is the uniform
/// 62-character `[A-Za-z0-9]` alphabet.
pub fn generate_key(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate `count` independent keys.
pub fn generate_batch(count: usize, length: usize) -> Vec<String> {
    (0..count).map(|_| generate_key(length)).collect()
}

/// Render a batch as the `API_KEYS=` line the Piclab server reads from
/// its environment.
pub fn format_batch(keys: &[String]) -> String {
    format!("API_KEYS={}", keys.join(","))
}
