//! Share tokens: pairings packed into a string that survives unescaped in a
//! URL fragment.
//!
//! A token is URL-safe base64 (no padding) over the UTF-8 bytes of compact
//! JSON. The JSON is either a list of `[giver, receiver]` name tuples or a
//! list of `{"giver": {...}, "receiver": {...}}` objects that also carry
//! contact details. A single tuple or object (not wrapped in a list) is a
//! single-pairing share.
//!
//! Decoding yields a display-only snapshot: names (and emails) come back, the
//! original participant ids do not. Every decoded participant gets a fresh id.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use thiserror::Error;

use super::draw::Pairing;
use super::id;
use super::roster::Participant;

/// Fragment route a share link points at; the token follows it.
pub const SHARE_ROUTE: &str = "#/shared/";

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no pairings data found in token")]
    Missing,
    #[error("failed to decode pairings from token: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct Contact {
    name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Names(String, String),
    Contacts { giver: Contact, receiver: Contact },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Shared {
    Many(Vec<Entry>),
    One(Entry),
}

/// Encode pairings as `[[giver, receiver], ...]`.
pub fn encode(pairings: &[Pairing]) -> String {
    let entries = pairings.iter().map(names_entry).collect();
    pack(&Value::Array(entries))
}

/// Encode pairings as structured objects that keep email addresses.
pub fn encode_with_contacts(pairings: &[Pairing]) -> String {
    let entries = pairings
        .iter()
        .map(|p| {
            json!({
                "giver": contact_entry(&p.giver),
                "receiver": contact_entry(&p.receiver),
            })
        })
        .collect();
    pack(&Value::Array(entries))
}

/// Encode a single pairing (a bare tuple, not a list).
pub fn encode_one(pairing: &Pairing) -> String {
    pack(&names_entry(pairing))
}

fn names_entry(pairing: &Pairing) -> Value {
    json!([pairing.giver.name, pairing.receiver.name])
}

fn contact_entry(participant: &Participant) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), Value::String(participant.name.clone()));
    if let Some(email) = &participant.email {
        map.insert("email".into(), Value::String(email.clone()));
    }
    Value::Object(map)
}

fn pack(value: &Value) -> String {
    TOKEN_ENGINE.encode(value.to_string())
}

/// Decode a token (or a whole share link) back into pairings.
pub fn decode(input: &str) -> Result<Vec<Pairing>, DecodeError> {
    let token = extract_token(input);
    if token.is_empty() {
        return Err(DecodeError::Missing);
    }

    // Tolerate the standard alphabet too
    let token = token.replace('+', "-").replace('/', "_");

    let bytes = TOKEN_ENGINE
        .decode(token.as_bytes())
        .map_err(|e| malformed("invalid base64", e))?;
    let json = String::from_utf8(bytes).map_err(|e| malformed("invalid UTF-8", e))?;
    if json.trim().is_empty() {
        return Err(DecodeError::Malformed("token is empty".into()));
    }

    let shared: Shared =
        serde_json::from_str(&json).map_err(|e| malformed("unrecognized content", e))?;
    let entries = match shared {
        Shared::Many(entries) => entries,
        Shared::One(entry) => vec![entry],
    };
    if entries.is_empty() {
        return Err(DecodeError::Malformed("token holds no pairings".into()));
    }

    let mut minted = HashSet::new();
    let mut fresh = |name: String, email: Option<String>| {
        let id = id::generate_unique(|candidate| minted.contains(candidate));
        minted.insert(id.clone());
        Participant {
            email,
            ..Participant::new(id, name)
        }
    };

    let pairings = entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Names(giver, receiver) => Pairing {
                giver: fresh(giver, None),
                receiver: fresh(receiver, None),
            },
            Entry::Contacts { giver, receiver } => Pairing {
                giver: fresh(giver.name, giver.email),
                receiver: fresh(receiver.name, receiver.email),
            },
        })
        .collect();

    Ok(pairings)
}

fn malformed(what: &str, err: impl std::fmt::Display) -> DecodeError {
    tracing::debug!(error = %err, "{}", what);
    DecodeError::Malformed(format!("{}: {}", what, err))
}

/// Pull the token out of a share link; plain tokens pass through trimmed.
pub fn extract_token(input: &str) -> &str {
    let input = input.trim();
    let token = match input.rfind("/shared/") {
        Some(pos) => &input[pos + "/shared/".len()..],
        None => input,
    };
    token.trim_end_matches('/')
}

/// Assemble `<base>/#/shared/<token>`.
pub fn share_link(base_url: &str, token: &str) -> String {
    format!("{}/{}{}", base_url.trim_end_matches('/'), SHARE_ROUTE, token)
}
