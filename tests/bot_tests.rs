//! Integration tests for bot UI: every button the bot renders must produce
//! callback data the callback handler can parse back.

use teloxide::types::InlineKeyboardButtonKind;

use city_expert::bot::ui_builder::{format_favorites, format_history, place_keyboard};
use city_expert::bot::CallbackAction;
use city_expert::db::{FavoritePlace, SearchRecord};

fn callback_payloads(markup: &teloxide::types::InlineKeyboardMarkup) -> Vec<String> {
    markup
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_place_keyboard_payloads_round_trip() {
    let markup = place_keyboard("55.750000,37.610000", "Red Square", false);
    let payloads = callback_payloads(&markup);
    assert_eq!(payloads.len(), 2);

    for payload in &payloads {
        payload
            .parse::<CallbackAction>()
            .unwrap_or_else(|err| panic!("unparseable payload '{payload}': {err}"));
    }
    assert!(payloads
        .iter()
        .any(|p| matches!(p.parse::<CallbackAction>(), Ok(CallbackAction::Favorite { .. }))));
}

#[test]
fn test_favorited_place_keyboard_offers_removal() {
    let markup = place_keyboard("55.750000,37.610000", "Red Square", true);
    let payloads = callback_payloads(&markup);

    assert!(payloads
        .iter()
        .any(|p| matches!(p.parse::<CallbackAction>(), Ok(CallbackAction::Unfavorite { .. }))));
}

#[test]
fn test_keyboard_payloads_fit_telegram_limit() {
    let long_name = "An Extremely Long And Winding Establishment Name On The Riverside";
    let markup = place_keyboard("-89.999999,-179.999999", long_name, true);

    for payload in callback_payloads(&markup) {
        assert!(
            payload.len() <= 64,
            "payload exceeds 64 bytes: '{payload}' ({})",
            payload.len()
        );
    }
}

#[test]
fn test_history_formatting_mentions_queries() {
    let records = vec![SearchRecord {
        id: 1,
        user_id: 1,
        query: "coffee <&>".to_string(),
        latitude: Some(55.75),
        longitude: Some(37.61),
        results_count: 4,
        is_favorite: false,
        created_at: "2026-08-29 10:15:00".to_string(),
    }];

    let text = format_history(&records);
    assert!(text.contains("coffee &lt;&amp;&gt;"));
    assert!(!text.contains("coffee <&>"));
}

#[test]
fn test_favorites_formatting_links_to_maps() {
    let favorites = vec![FavoritePlace {
        id: 1,
        user_id: 1,
        place_id: "55.750000,37.610000".to_string(),
        name: "Red Square".to_string(),
        added_at: "2026-08-29 10:15:00".to_string(),
    }];

    let text = format_favorites(&favorites);
    assert!(text.contains("https://www.google.com/maps?q=55.750000,37.610000"));
    assert!(text.contains("Red Square"));
}
