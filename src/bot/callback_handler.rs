//! Callback handler module for processing inline keyboard callback queries
//!
//! Button payloads travel as `action:param...` strings. They are parsed once
//! at this boundary into [`CallbackAction`]; malformed payloads produce a
//! typed error, a user-facing validation message, and no state change.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::str::FromStr;
use std::sync::Arc;
use teloxide::prelude::*;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::db;
use crate::error::ErrorKind;
use crate::geo::parse_place_id;

use super::message_handler::report_operation_error;
use super::ui_builder::place_keyboard;

/// Longest place name carried inside callback data; Telegram caps the whole
/// payload at 64 bytes.
const MAX_CALLBACK_NAME_CHARS: usize = 30;

/// A parsed inline-button payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    Map { latitude: f64, longitude: f64 },
    Favorite { place_id: String, name: String },
    Unfavorite { place_id: String, name: String },
}

/// Why a callback payload failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackParseError {
    #[error("callback payload is missing the action delimiter")]
    MissingDelimiter,
    #[error("unknown callback action '{0}'")]
    UnknownAction(String),
    #[error("invalid coordinates in callback payload: '{0}'")]
    InvalidCoordinates(String),
    #[error("callback payload is missing the place name")]
    MissingName,
}

impl CallbackAction {
    pub fn favorite(place_id: &str, name: &str) -> Self {
        Self::Favorite {
            place_id: place_id.to_string(),
            name: truncate_name(name),
        }
    }

    pub fn unfavorite(place_id: &str, name: &str) -> Self {
        Self::Unfavorite {
            place_id: place_id.to_string(),
            name: truncate_name(name),
        }
    }

    /// Serialize to the `action:param...` wire form used in callback data.
    pub fn encode(&self) -> String {
        match self {
            Self::Map { latitude, longitude } => {
                format!("map:{}", crate::geo::place_id(*latitude, *longitude))
            }
            Self::Favorite { place_id, name } => format!("fav:{place_id}:{name}"),
            Self::Unfavorite { place_id, name } => format!("unfav:{place_id}:{name}"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let (action, payload) = data
            .split_once(':')
            .ok_or(CallbackParseError::MissingDelimiter)?;

        match action {
            "map" => {
                let (latitude, longitude) = parse_place_id(payload)
                    .ok_or_else(|| CallbackParseError::InvalidCoordinates(payload.to_string()))?;
                Ok(Self::Map { latitude, longitude })
            }
            "fav" | "unfav" => {
                let (place_id, name) = payload
                    .split_once(':')
                    .ok_or(CallbackParseError::MissingName)?;
                if parse_place_id(place_id).is_none() {
                    return Err(CallbackParseError::InvalidCoordinates(place_id.to_string()));
                }

                let place_id = place_id.to_string();
                let name = name.to_string();
                if action == "fav" {
                    Ok(Self::Favorite { place_id, name })
                } else {
                    Ok(Self::Unfavorite { place_id, name })
                }
            }
            other => Err(CallbackParseError::UnknownAction(other.to_string())),
        }
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_CALLBACK_NAME_CHARS).collect()
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    db: Arc<Mutex<Connection>>,
    config: Arc<Config>,
) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query");

    // Acknowledge early so the button stops showing a spinner.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref() else {
        warn!(user_id = %q.from.id, "Callback query without an accessible message");
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let data = q.data.as_deref().unwrap_or("");
    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(parse_err) => {
            warn!(user_id = %q.from.id, data, error = %parse_err, "Malformed callback payload");
            bot.send_message(chat_id, ErrorKind::Validation.user_message())
                .await?;
            return Ok(());
        }
    };

    let result = match &action {
        CallbackAction::Map { latitude, longitude } => {
            let url = format!("https://www.google.com/maps?q={latitude},{longitude}");
            bot.send_message(chat_id, format!("📍 Open in Google Maps:\n{url}"))
                .await
                .map(|_| ())
                .context("Failed to send map link")
        }
        CallbackAction::Favorite { place_id, name }
        | CallbackAction::Unfavorite { place_id, name } => {
            let add = matches!(action, CallbackAction::Favorite { .. });
            toggle_favorite(&bot, &q, &db, chat_id, message_id, place_id, name, add).await
        }
    };

    if let Err(err) = result {
        error!(user_id = %q.from.id, error = ?err, "Callback handling failed");
        report_operation_error(&bot, chat_id, &config, &err).await;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn toggle_favorite(
    bot: &Bot,
    q: &CallbackQuery,
    db: &Arc<Mutex<Connection>>,
    chat_id: ChatId,
    message_id: teloxide::types::MessageId,
    place_id: &str,
    name: &str,
    add: bool,
) -> Result<()> {
    let is_favorite = {
        let conn = db.lock().await;
        let user = db::get_or_create_user(
            &conn,
            q.from.id.0 as i64,
            &q.from.full_name(),
            q.from.username.as_deref(),
        )?;

        if add {
            db::add_favorite(&conn, user.id, place_id, name)?;
        } else {
            db::remove_favorite(&conn, user.id, place_id)?;
        }
        db::is_favorite(&conn, user.id, place_id)?
    };

    // Flip the button in place so the card reflects the new state.
    bot.edit_message_reply_markup(chat_id, message_id)
        .reply_markup(place_keyboard(place_id, name, is_favorite))
        .await
        .context("Failed to update place keyboard")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map_action() {
        let action = "map:55.750000,37.610000".parse::<CallbackAction>().unwrap();
        match action {
            CallbackAction::Map { latitude, longitude } => {
                assert!((latitude - 55.75).abs() < 1e-6);
                assert!((longitude - 37.61).abs() < 1e-6);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_parse_favorite_actions() {
        let action = "fav:55.750000,37.610000:Red Square"
            .parse::<CallbackAction>()
            .unwrap();
        assert_eq!(
            action,
            CallbackAction::Favorite {
                place_id: "55.750000,37.610000".to_string(),
                name: "Red Square".to_string(),
            }
        );

        let action = "unfav:55.750000,37.610000:Red Square"
            .parse::<CallbackAction>()
            .unwrap();
        assert!(matches!(action, CallbackAction::Unfavorite { .. }));
    }

    #[test]
    fn test_parse_name_keeps_embedded_delimiters() {
        let action = "fav:1.000000,2.000000:Cafe: The Sequel"
            .parse::<CallbackAction>()
            .unwrap();
        match action {
            CallbackAction::Favorite { name, .. } => assert_eq!(name, "Cafe: The Sequel"),
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_missing_delimiter() {
        assert_eq!(
            "no-delimiter".parse::<CallbackAction>(),
            Err(CallbackParseError::MissingDelimiter)
        );
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        assert_eq!(
            "zap:1,2".parse::<CallbackAction>(),
            Err(CallbackParseError::UnknownAction("zap".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        assert!(matches!(
            "map:not-coords".parse::<CallbackAction>(),
            Err(CallbackParseError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            "fav:garbage:Name".parse::<CallbackAction>(),
            Err(CallbackParseError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        assert_eq!(
            "fav:1.000000,2.000000".parse::<CallbackAction>(),
            Err(CallbackParseError::MissingName)
        );
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let original = CallbackAction::favorite("55.750000,37.610000", "Red Square");
        let parsed = original.encode().parse::<CallbackAction>().unwrap();
        assert_eq!(parsed, original);

        let map = CallbackAction::Map {
            latitude: 55.75,
            longitude: 37.61,
        };
        let parsed = map.encode().parse::<CallbackAction>().unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_constructor_truncates_long_names() {
        let long_name = "a very long place name that exceeds the callback data limit";
        let action = CallbackAction::favorite("1.000000,2.000000", long_name);
        match &action {
            CallbackAction::Favorite { name, .. } => {
                assert_eq!(name.chars().count(), MAX_CALLBACK_NAME_CHARS);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_truncation_respects_multibyte_chars() {
        let name = "кафе на набережной у большого моста";
        let action = CallbackAction::favorite("1.000000,2.000000", name);
        match action {
            CallbackAction::Favorite { name, .. } => {
                assert!(name.chars().count() <= MAX_CALLBACK_NAME_CHARS);
                // Must still be valid UTF-8 on a char boundary; encode must not panic.
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
