//! Short opaque participant ids like "k7mqx2re".
//!
//! Ids only need to be unique within one roster (or one decoded token),
//! so a short code from a look-alike-free alphabet is enough.

use rand::Rng;

const CHARSET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
const ID_LENGTH: usize = 8;

pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Generate an id for which `exists` returns false.
pub fn generate_unique<F>(exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    loop {
        let id = generate();
        if !exists(&id) {
            return id;
        }
    }
}
