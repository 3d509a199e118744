//! Contract tests for provider normalization.
//!
//! Every adapter maps its own record shape onto the same canonical schema;
//! these tests hold each of them to the shared rules.

use std::sync::Arc;

use apex_core::adapters::normalize::{derive_abbreviation, derive_city, parse_status};
use apex_core::{
    BallDontLieAdapter, CanonicalPayload, DataType, EspnAdapter, GameStatus, HttpClient,
    OddsApiAdapter, ProviderAdapter, ProviderId, Sport, StaticHttpClient, TheSportsDbAdapter,
};
use serde_json::{json, Value};

struct AdapterCase {
    adapter: Arc<dyn ProviderAdapter>,
    name_only_team: Value,
    game: Value,
}

fn offline() -> Arc<dyn HttpClient> {
    Arc::new(StaticHttpClient::new())
}

fn team_cases() -> Vec<AdapterCase> {
    vec![
        AdapterCase {
            adapter: Arc::new(EspnAdapter::new(offline())),
            name_only_team: json!({"team": {"id": "13", "displayName": "Los Angeles Lakers"}}),
            game: json!({
                "id": "401585601",
                "date": "2024-01-15T00:30Z",
                "status": {"type": {"name": "STATUS_IN_PROGRESS"}},
                "competitions": [{"competitors": [
                    {"homeAway": "home", "score": "60", "team": {"id": "13", "displayName": "Los Angeles Lakers"}},
                    {"homeAway": "away", "score": "58", "team": {"id": "2", "displayName": "Boston Celtics"}}
                ]}]
            }),
        },
        AdapterCase {
            adapter: Arc::new(BallDontLieAdapter::new(offline(), "key")),
            name_only_team: json!({"id": 14, "full_name": "Los Angeles Lakers"}),
            game: json!({
                "id": 1037593,
                "date": "2024-01-15",
                "status": "2nd Qtr",
                "home_team_score": 60,
                "visitor_team_score": 58,
                "home_team": {"id": 14, "full_name": "Los Angeles Lakers", "abbreviation": "LAL"},
                "visitor_team": {"id": 2, "full_name": "Boston Celtics", "abbreviation": "BOS"}
            }),
        },
        AdapterCase {
            adapter: Arc::new(TheSportsDbAdapter::new(offline(), "3")),
            name_only_team: json!({"idTeam": "134867", "strTeam": "Los Angeles Lakers"}),
            game: json!({
                "idEvent": "1903457",
                "dateEvent": "2024-01-15",
                "strStatus": "In Progress",
                "strHomeTeam": "Los Angeles Lakers",
                "strAwayTeam": "Boston Celtics",
                "intHomeScore": "60",
                "intAwayScore": "58"
            }),
        },
    ]
}

// =============================================================================
// Team identity derivation
// =============================================================================

#[test]
fn name_only_team_gets_two_word_city_and_three_letter_code() {
    // Given: a team known only by its display name
    let name = "Los Angeles Lakers";

    // When: city and abbreviation are derived
    let city = derive_city(name);
    let abbreviation = derive_abbreviation(name, &city).expect("derivable");

    // Then: the known two-word prefix is kept together and initials are used
    assert_eq!(city, "Los Angeles");
    assert_eq!(abbreviation.as_str(), "LAL");
}

#[test]
fn every_team_adapter_derives_the_same_identity_from_a_name() {
    for case in team_cases() {
        // Given: a provider record carrying no city or abbreviation
        // When: the adapter normalizes it
        let team = case
            .adapter
            .normalize_team(&case.name_only_team, Sport::Basketball)
            .unwrap_or_else(|error| panic!("{} rejected a name-only team: {error}", case.adapter.id()));

        // Then: the canonical identity is identical across providers
        assert_eq!(team.name, "Los Angeles Lakers", "{}", case.adapter.id());
        assert_eq!(team.city, "Los Angeles", "{}", case.adapter.id());
        assert_eq!(team.abbreviation.as_str().len(), 3, "{}", case.adapter.id());
        assert_eq!(team.abbreviation.as_str(), "LAL", "{}", case.adapter.id());
        assert_eq!(team.source, case.adapter.id());
        assert_eq!(team.sport, Sport::Basketball);
    }
}

#[test]
fn bare_two_word_city_names_keep_both_words() {
    for name in ["New York", "San Jose", "Las Vegas"] {
        assert_eq!(derive_city(name), name);
    }
    let abbreviation = derive_abbreviation("San Jose", &derive_city("San Jose")).expect("derivable");
    assert_eq!(abbreviation.as_str(), "SAN");
}

#[test]
fn short_names_fall_back_to_city_letters() {
    let abbreviation = derive_abbreviation("Boston Celtics", "Boston").expect("derivable");
    assert_eq!(abbreviation.as_str(), "BOS");
}

// =============================================================================
// Game normalization
// =============================================================================

#[test]
fn every_game_adapter_maps_in_play_status_to_live() {
    for case in team_cases() {
        let game = case
            .adapter
            .normalize_game(&case.game, Sport::Basketball)
            .unwrap_or_else(|error| panic!("{} rejected a live game: {error}", case.adapter.id()));

        assert_eq!(game.status, GameStatus::Live, "{}", case.adapter.id());
        assert_eq!(game.home.score, Some(60), "{}", case.adapter.id());
        assert_eq!(game.away.score, Some(58), "{}", case.adapter.id());
        assert_eq!(
            game.home.team.abbreviation.as_ref().map(|code| code.as_str()),
            Some("LAL"),
            "{}",
            case.adapter.id()
        );
    }
}

#[test]
fn status_vocabulary_maps_onto_canonical_statuses() {
    let cases = [
        ("Final", GameStatus::Finished),
        ("Final/OT", GameStatus::Finished),
        ("FT", GameStatus::Finished),
        ("Halftime", GameStatus::Live),
        ("3rd Qtr", GameStatus::Live),
        ("Postponed", GameStatus::Postponed),
        ("Cancelled", GameStatus::Cancelled),
        ("7:30 pm ET", GameStatus::Scheduled),
        ("", GameStatus::Scheduled),
    ];
    for (text, expected) in cases {
        assert_eq!(parse_status(text), expected, "status text '{text}'");
    }
}

// =============================================================================
// Batch behavior
// =============================================================================

#[test]
fn one_bad_record_is_excluded_without_failing_the_batch() {
    // Given: an ESPN team list with one record missing its name
    let espn = EspnAdapter::new(offline());
    let raw = vec![
        json!({"team": {"id": "13", "displayName": "Los Angeles Lakers", "abbreviation": "LAL"}}),
        json!({"team": {"id": "99"}}),
        json!({"team": {"id": "2", "displayName": "Boston Celtics", "abbreviation": "BOS"}}),
    ];

    // When: the batch is normalized
    let batch = espn.normalize(DataType::Teams, &raw, Sport::Basketball);

    // Then: the good records survive and the bad one is reported
    assert_eq!(batch.received, 3);
    assert_eq!(batch.payload.len(), 2);
    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(batch.rejected[0].provider, ProviderId::Espn);
    assert_eq!(batch.rejected[0].field, "displayName");
    assert!(!batch.all_rejected());
}

#[test]
fn empty_upstream_batch_is_not_a_rejection() {
    let espn = EspnAdapter::new(offline());
    let batch = espn.normalize(DataType::Games, &[], Sport::Hockey);

    assert_eq!(batch.payload, CanonicalPayload::Games(Vec::new()));
    assert!(!batch.all_rejected());
}

#[test]
fn odds_provider_rejects_shapes_it_does_not_serve() {
    let oddsapi = OddsApiAdapter::new(offline(), "key");
    let batch = oddsapi.normalize(DataType::Teams, &[json!({"name": "Los Angeles Lakers"})], Sport::Basketball);

    assert!(batch.all_rejected());
    assert!(!oddsapi.supports(Sport::Basketball, DataType::Teams));
}

#[test]
fn adapters_without_odds_refuse_odds_records() {
    for case in team_cases() {
        assert!(
            !case.adapter.supports(Sport::Basketball, DataType::Odds),
            "{} should not claim odds",
            case.adapter.id()
        );
        assert!(case
            .adapter
            .normalize_odds(&json!({}), Sport::Basketball)
            .is_err());
    }
}
