//! UI builder module for creating keyboards and formatting messages

use chrono::NaiveDateTime;
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};
use teloxide::utils::html;

use super::callback_handler::CallbackAction;
use crate::db::{FavoritePlace, SearchRecord};
use crate::geo::haversine_distance;
use crate::places::Place;

pub const BTN_FIND_PLACES: &str = "🔍 Find places";
pub const BTN_NEAR_ME: &str = "📍 Near me";
pub const BTN_HISTORY: &str = "📖 Search history";
pub const BTN_HELP: &str = "❓ Help";
pub const BTN_BACK_TO_MENU: &str = "↩️ Back to menu";
pub const BTN_SEND_LOCATION: &str = "📍 Send my location";

/// Main menu reply keyboard.
pub fn main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BTN_FIND_PLACES)],
        vec![
            KeyboardButton::new(BTN_NEAR_ME),
            KeyboardButton::new(BTN_HISTORY),
        ],
        vec![KeyboardButton::new(BTN_HELP)],
    ])
    .resize_keyboard()
}

/// Keyboard asking the user to share their location.
pub fn location_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BTN_SEND_LOCATION).request(ButtonRequest::Location)],
        vec![KeyboardButton::new(BTN_BACK_TO_MENU)],
    ])
    .resize_keyboard()
    .one_time_keyboard()
}

/// Inline keyboard attached to a place card: open the map, toggle favorite.
pub fn place_keyboard(place_id: &str, name: &str, is_favorite: bool) -> InlineKeyboardMarkup {
    let map = InlineKeyboardButton::callback("🗺 Map", format!("map:{place_id}"));

    let toggle = if is_favorite {
        InlineKeyboardButton::callback(
            "⭐ Remove",
            CallbackAction::unfavorite(place_id, name).encode(),
        )
    } else {
        InlineKeyboardButton::callback(
            "🌟 Add",
            CallbackAction::favorite(place_id, name).encode(),
        )
    };

    InlineKeyboardMarkup::new(vec![vec![map, toggle]])
}

/// HTML card for one found place, with an optional distance line when the
/// searcher's location is known.
pub fn format_place_message(place: &Place, user_location: Option<(f64, f64)>) -> String {
    let mut text = format!(
        "📍 <b>{}</b>\n📌 <i>{}</i>\n",
        html::escape(&place.name),
        html::escape(&place.address),
    );

    match place.rating {
        Some(rating) => text.push_str(&format!("⭐ Rating: {rating:.1}\n")),
        None => text.push_str("⭐ Rating: none\n"),
    }

    if let Some((lat, lon)) = user_location {
        let distance = haversine_distance(lat, lon, place.latitude, place.longitude);
        text.push_str(&format!("🚶 ~{} m away\n", distance as i64));
    }

    if let Some(website) = &place.website {
        text.push_str(&format!("🌐 <a href=\"{}\">Website</a>\n", html::escape(website)));
    }
    if let Some(phone) = &place.phone {
        text.push_str(&format!("📞 Phone: {}\n", html::escape(phone)));
    }
    if let Some(hours) = &place.opening_hours {
        text.push_str(if hours.open_now {
            "🕒 Open now\n"
        } else {
            "🕒 Closed now\n"
        });
    }

    text
}

/// HTML list of the user's recent searches.
pub fn format_history(history: &[SearchRecord]) -> String {
    if history.is_empty() {
        return "📖 Your search history is empty. Try searching for something!".to_string();
    }

    let mut text = String::from("📖 <b>Search history:</b>\n\n");

    for (index, record) in history.iter().enumerate() {
        let location = match (record.latitude, record.longitude) {
            (Some(lat), Some(lon)) => format!(" | 📍 {lat:.4}, {lon:.4}"),
            _ => String::new(),
        };
        text.push_str(&format!(
            "{}. <b>{}</b>\n   🕒 {}{} | 🏙 Found: {}\n\n",
            index + 1,
            html::escape(&record.query),
            format_datetime(&record.created_at),
            location,
            record.results_count,
        ));
    }

    text
}

/// HTML list of the user's favorite places with map links.
pub fn format_favorites(favorites: &[FavoritePlace]) -> String {
    if favorites.is_empty() {
        return "⭐ You have no favorite places yet. Tap 🌟 Add on any place I find for you."
            .to_string();
    }

    let mut text = String::from("⭐ <b>Favorite places:</b>\n\n");

    for favorite in favorites {
        text.push_str(&format!(
            "🏛 <b>{}</b>\n📅 Added: {}\n📍 <a href=\"https://www.google.com/maps?q={}\">Show on map</a>\n\n",
            html::escape(&favorite.name),
            format_datetime(&favorite.added_at),
            favorite.place_id,
        ));
    }

    text
}

/// Welcome text for /start.
pub fn welcome_text() -> String {
    "👋 Hi! I can help you discover places around you.\n\
     Pick an action from the menu below 👇"
        .to_string()
}

/// Command summary for /help.
pub fn help_text() -> String {
    "📌 Available commands:\n\
     /start - Start over\n\
     /help - This help\n\
     /history - Your search history\n\
     /favorites - Your favorite places\n\n\
     Just send a place name to search, or share your location \
     to find interesting places nearby!"
        .to_string()
}

/// Render an SQLite datetime for display; falls back to the raw value when
/// it does not parse.
fn format_datetime(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
