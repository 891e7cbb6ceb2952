//! Participants and the roster they belong to.
//!
//! Every reference between participants goes through ids, never names:
//! two people called "Sam" are legal and stay distinguishable.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Ids this participant must never be assigned to give to.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exclusions: BTreeSet<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Participant {
            id: id.into(),
            name: name.into(),
            email: None,
            exclusions: BTreeSet::new(),
        }
    }

    #[cfg(test)]
    pub fn excluding<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Whether `receiver` is an allowed gift recipient for this giver.
    /// Self is always excluded, whatever the exclusion set says.
    pub fn can_give_to(&self, receiver: &Participant) -> bool {
        receiver.id != self.id && !self.exclusions.contains(&receiver.id)
    }
}

/// The working list of participants, in the order they were added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    pub fn new() -> Self {
        let now = Utc::now();
        Roster {
            created_at: now,
            updated_at: now,
            participants: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.id == id)
            .with_context(|| format!("no participant with id '{}'", id))
    }

    /// Add a participant with a freshly minted id.
    pub fn add(&mut self, name: &str, email: Option<&str>) -> Result<&Participant> {
        let name = name.trim();
        if name.is_empty() {
            bail!("participant name cannot be empty");
        }

        if self.participants.iter().any(|p| p.name == name) {
            tracing::debug!(name, "roster already has a participant with this name");
        }

        let id = id::generate_unique(|candidate| self.get(candidate).is_some());
        let mut participant = Participant::new(id, name);
        participant.email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        self.participants.push(participant);
        self.touch();
        self.participants
            .last()
            .context("participant disappeared after insert")
    }

    /// Remove a participant and scrub their id from everyone else's exclusions.
    pub fn remove(&mut self, id: &str) -> Result<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.id == id)
            .with_context(|| format!("no participant with id '{}'", id))?;
        let removed = self.participants.remove(index);

        for p in &mut self.participants {
            p.exclusions.remove(&removed.id);
        }

        self.touch();
        Ok(removed)
    }

    /// Forbid `giver_id` from drawing `receiver_id`. Returns false if the
    /// exclusion was already present.
    pub fn exclude(&mut self, giver_id: &str, receiver_id: &str) -> Result<bool> {
        if giver_id == receiver_id {
            bail!("a participant cannot exclude themselves (they never draw themselves anyway)");
        }
        if self.get(receiver_id).is_none() {
            bail!("no participant with id '{}'", receiver_id);
        }

        let added = self
            .get_mut(giver_id)?
            .exclusions
            .insert(receiver_id.to_string());
        if added {
            self.touch();
        }
        Ok(added)
    }

    /// Lift an exclusion. Returns false if there was nothing to lift.
    pub fn include(&mut self, giver_id: &str, receiver_id: &str) -> Result<bool> {
        let removed = self.get_mut(giver_id)?.exclusions.remove(receiver_id);
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Look a participant up by exact id, falling back to name.
    /// A name shared by several participants is rejected.
    pub fn resolve(&self, who: &str) -> Result<&Participant> {
        let who = who.trim();
        if let Some(p) = self.get(who) {
            return Ok(p);
        }

        let mut matches = self.participants.iter().filter(|p| p.name == who);
        match (matches.next(), matches.next()) {
            (Some(p), None) => Ok(p),
            (Some(_), Some(_)) => {
                bail!("more than one participant is named '{}'; use the id instead", who)
            }
            (None, _) => bail!("no participant named '{}'", who),
        }
    }

    /// Display names for a set of ids, in roster order.
    pub fn names_of<'a>(&'a self, ids: &'a BTreeSet<String>) -> Vec<&'a str> {
        self.participants
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| p.name.as_str())
            .collect()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_of(names: &[&str]) -> Roster {
        let mut roster = Roster::new();
        for name in names {
            roster.add(name, None).unwrap();
        }
        roster
    }

    fn id_of(roster: &Roster, name: &str) -> String {
        roster.resolve(name).unwrap().id.clone()
    }

    #[test]
    fn add_mints_distinct_ids() {
        let roster = roster_of(&["Alice", "Bob", "Carol"]);
        let ids: BTreeSet<_> = roster.participants.iter().map(|p| &p.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn add_trims_and_rejects_empty_names() {
        let mut roster = Roster::new();
        assert_eq!(roster.add("  Alice ", None).unwrap().name, "Alice");
        assert!(roster.add("   ", None).is_err());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn add_keeps_email_when_present() {
        let mut roster = Roster::new();
        let p = roster.add("Alice", Some("alice@example.com")).unwrap();
        assert_eq!(p.email.as_deref(), Some("alice@example.com"));
        let p = roster.add("Bob", Some("  ")).unwrap();
        assert_eq!(p.email, None);
    }

    #[test]
    fn duplicate_names_are_allowed() {
        let roster = roster_of(&["Sam", "Sam"]);
        assert_eq!(roster.len(), 2);
        assert_ne!(roster.participants[0].id, roster.participants[1].id);
    }

    #[test]
    fn remove_scrubs_exclusions_of_everyone_else() {
        let mut roster = roster_of(&["Alice", "Bob", "Carol"]);
        let (a, b, c) = (
            id_of(&roster, "Alice"),
            id_of(&roster, "Bob"),
            id_of(&roster, "Carol"),
        );
        roster.exclude(&a, &b).unwrap();
        roster.exclude(&c, &b).unwrap();
        roster.exclude(&c, &a).unwrap();

        let removed = roster.remove(&b).unwrap();
        assert_eq!(removed.name, "Bob");
        assert_eq!(roster.len(), 2);
        for p in &roster.participants {
            assert!(!p.exclusions.contains(&b), "{} still excludes Bob", p.name);
        }
        // Unrelated exclusions survive
        assert!(roster.get(&c).unwrap().exclusions.contains(&a));
    }

    #[test]
    fn remove_unknown_id_fails() {
        let mut roster = roster_of(&["Alice"]);
        assert!(roster.remove("nope").is_err());
    }

    #[test]
    fn exclude_and_include_round_trip() {
        let mut roster = roster_of(&["Alice", "Bob"]);
        let (a, b) = (id_of(&roster, "Alice"), id_of(&roster, "Bob"));

        assert!(roster.exclude(&a, &b).unwrap());
        assert!(!roster.exclude(&a, &b).unwrap());
        assert!(roster.get(&a).unwrap().exclusions.contains(&b));
        // Directed: Bob is unaffected
        assert!(roster.get(&b).unwrap().exclusions.is_empty());

        assert!(roster.include(&a, &b).unwrap());
        assert!(!roster.include(&a, &b).unwrap());
        assert!(roster.get(&a).unwrap().exclusions.is_empty());
    }

    #[test]
    fn exclude_rejects_self_and_unknown_ids() {
        let mut roster = roster_of(&["Alice"]);
        let a = id_of(&roster, "Alice");
        assert!(roster.exclude(&a, &a).is_err());
        assert!(roster.exclude(&a, "ghost").is_err());
        assert!(roster.exclude("ghost", &a).is_err());
    }

    #[test]
    fn resolve_prefers_id_then_unique_name() {
        let mut roster = roster_of(&["Sam", "Sam", "Alex"]);
        let first_sam = roster.participants[0].id.clone();

        assert_eq!(roster.resolve(&first_sam).unwrap().id, first_sam);
        assert_eq!(roster.resolve("Alex").unwrap().name, "Alex");

        let err = roster.resolve("Sam").unwrap_err().to_string();
        assert!(err.contains("more than one"), "{}", err);
        assert!(roster.resolve("Nobody").is_err());

        roster.remove(&first_sam).unwrap();
        assert_eq!(roster.resolve("Sam").unwrap().name, "Sam");
    }

    #[test]
    fn can_give_to_honors_self_and_exclusions() {
        let alice = Participant::new("a", "Alice").excluding(["b", "a"]);
        let bob = Participant::new("b", "Bob");
        let carol = Participant::new("c", "Carol");
        assert!(!alice.can_give_to(&alice));
        assert!(!alice.can_give_to(&bob));
        assert!(alice.can_give_to(&carol));
    }

    #[test]
    fn mutations_bump_updated_at() {
        let mut roster = Roster::new();
        let before = roster.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        roster.add("Alice", None).unwrap();
        assert!(roster.updated_at > before);
        assert_eq!(roster.created_at, before);
    }

    #[test]
    fn serializes_without_empty_optional_fields() {
        let p = Participant::new("a", "Alice");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"id":"a","name":"Alice"}"#);

        let back: Participant =
            serde_json::from_str(r#"{"id":"a","name":"Alice","exclusions":["b"]}"#).unwrap();
        assert!(back.exclusions.contains("b"));
    }
}
