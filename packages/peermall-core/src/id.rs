//! Identifier generation.
//!
//! Content ids are readable and roughly time-ordered
//! (`content-1714566600000-k3j9x0q2m`); posts, comments and users get a
//! UUID v4.

use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix on content ids.
pub const SUFFIX_LENGTH: usize = 9;

/// Generate a content id: `content-<epoch-ms>-<random base36>`.
pub fn content_id() -> String {
    format!(
        "content-{}-{}",
        crate::time::now_timestamp_millis(),
        random_base36(SUFFIX_LENGTH)
    )
}

/// Generate a UUID v4 string.
pub fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_shape() {
        let id = content_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "content");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LENGTH);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(content_id(), content_id());
        assert_ne!(uuid(), uuid());
        assert!(uuid::Uuid::parse_str(&uuid()).is_ok());
    }
}
