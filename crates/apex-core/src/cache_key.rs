//! Deterministic cache keys derived from request shape.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::{DataType, Sport};

pub const CACHE_KEY_PREFIX: &str = "apex:v1";

/// Builds `apex:v1:{data_type}:{sport}:{hex16}`.
///
/// The digest covers `{data_type}|{sport}|k1=v1&k2=v2...` with filter keys
/// trimmed, lower-cased and sorted, so insertion order never matters.
pub fn cache_key<'a, I>(data_type: DataType, sport: Sport, filters: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let canonical_filters = filters
        .into_iter()
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .collect::<BTreeMap<_, _>>();

    let query = canonical_filters
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let canonical = format!("{data_type}|{sport}|{query}");
    let digest = Sha256::digest(canonical.as_bytes());
    let hex16 = &hex::encode(digest)[..16];

    format!("{CACHE_KEY_PREFIX}:{data_type}:{sport}:{hex16}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn key_has_readable_prefix_and_short_digest() {
        let filters = BTreeMap::<String, String>::new();
        let key = cache_key(DataType::Teams, Sport::Basketball, &filters);

        assert!(key.starts_with("apex:v1:teams:basketball:"));
        let digest = key.rsplit(':').next().expect("digest segment");
        assert_eq!(digest.len(), 16);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn filter_order_and_key_case_do_not_change_the_key() {
        let mut first = HashMap::new();
        first.insert(String::from("season"), String::from("2024"));
        first.insert(String::from("Team"), String::from("14"));

        let mut second = BTreeMap::new();
        second.insert(String::from(" team "), String::from("14"));
        second.insert(String::from("season"), String::from("2024"));

        assert_eq!(
            cache_key(DataType::Games, Sport::Basketball, &first),
            cache_key(DataType::Games, Sport::Basketball, &second)
        );
    }

    #[test]
    fn different_shapes_get_different_keys() {
        let mut filters = BTreeMap::new();
        filters.insert(String::from("team"), String::from("14"));

        let games = cache_key(DataType::Games, Sport::Basketball, &filters);
        let other_team = {
            let mut other = filters.clone();
            other.insert(String::from("team"), String::from("15"));
            cache_key(DataType::Games, Sport::Basketball, &other)
        };
        let hockey = cache_key(DataType::Games, Sport::Hockey, &filters);

        assert_ne!(games, other_team);
        assert_ne!(games, hockey);
    }
}
