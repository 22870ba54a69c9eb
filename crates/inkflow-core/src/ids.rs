//! Identifier services.
//!
//! Element ids are produced by an injected [`IdGenerator`] so independent
//! canvases (and tests) never share counter state.

use rand::Rng;
use uuid::Uuid;

/// Alphabet for room ids: lowercase alphanumerics without `i`, `l`, `o`, `0`, `1`.
pub const ROOM_ID_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

/// Length of a generated room id.
pub const ROOM_ID_LEN: usize = 6;

/// Source of globally unique element ids.
pub trait IdGenerator {
    /// Produce a fresh id. `prefix` names the element kind (`shape`, `port`, ...).
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Monotonic counter, unique per generator instance.
///
/// Suited to tests and single-user boards. Collaborative sessions should use
/// [`UuidIds`] so two peers never mint the same id.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting after `last`, e.g. when resuming a loaded board.
    pub fn starting_after(last: u64) -> Self {
        Self { next: last }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{prefix}-{}", self.next)
    }
}

/// Random v4 UUID ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

/// Generate a shareable room id.
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())] as char)
        .collect()
}

/// Whether `id` has the shape of a generated room id.
pub fn is_valid_room_id(id: &str) -> bool {
    id.len() == ROOM_ID_LEN && id.bytes().all(|b| ROOM_ID_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_ids_are_per_instance() {
        let mut a = SequentialIds::new();
        let mut b = SequentialIds::new();
        assert_eq!(a.next_id("shape"), "shape-1");
        assert_eq!(a.next_id("shape"), "shape-2");
        assert_eq!(b.next_id("shape"), "shape-1");
    }

    #[test]
    fn test_uuid_ids_unique() {
        let mut ids = UuidIds;
        let generated: HashSet<_> = (0..100).map(|_| ids.next_id("c")).collect();
        assert_eq!(generated.len(), 100);
    }

    #[test]
    fn test_room_id_format() {
        for _ in 0..200 {
            let id = generate_room_id();
            assert!(is_valid_room_id(&id), "bad room id {id}");
            assert!(!id.contains(['i', 'l', 'o', '0', '1']));
        }
    }

    #[test]
    fn test_room_id_validation() {
        assert!(is_valid_room_id("abc234"));
        assert!(!is_valid_room_id("abc23"));
        assert!(!is_valid_room_id("ABC234"));
        assert!(!is_valid_room_id("abc10o"));
    }
}
