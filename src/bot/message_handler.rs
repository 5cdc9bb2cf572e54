//! Message handler module for processing incoming Telegram messages
//!
//! Routes commands, reply-keyboard buttons, shared locations and free-text
//! search queries. Every path that touches the database or the places API is
//! wrapped so the user always gets a readable answer instead of silence.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::{debug, error, info, warn};

use crate::config::{Config, DEFAULT_RADIUS_M};
use crate::db;
use crate::error::ErrorKind;
use crate::geo::place_id;
use crate::places::{Place, PlacesClient, SearchError};

use super::ui_builder::{
    self, format_favorites, format_history, format_place_message, help_text, location_keyboard,
    main_keyboard, place_keyboard, welcome_text,
};

/// How many result cards a free-text search sends.
const MAX_TEXT_RESULTS: usize = 5;
/// How many result cards a shared location triggers.
const MAX_LOCATION_RESULTS: usize = 3;
/// Shortest accepted free-text query.
const MIN_QUERY_CHARS: usize = 2;
/// History entries shown by /history.
const HISTORY_LIMIT: usize = 10;

/// Handle incoming messages
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    db: Arc<tokio::sync::Mutex<Connection>>,
    places: Arc<PlacesClient>,
    config: Arc<Config>,
) -> Result<()> {
    let result = route_message(&bot, &msg, &db, &places).await;

    if let Err(err) = result {
        let kind = ErrorKind::classify(&err);
        error!(
            chat_id = %msg.chat.id,
            tag = kind.log_tag(),
            error = ?err,
            "Message handling failed"
        );
        report_operation_error(&bot, msg.chat.id, &config, &err).await;
    }

    Ok(())
}

async fn route_message(
    bot: &Bot,
    msg: &Message,
    db: &Arc<tokio::sync::Mutex<Connection>>,
    places: &Arc<PlacesClient>,
) -> Result<()> {
    if let Some(location) = msg.location() {
        return handle_location(bot, msg, db, places, location.latitude, location.longitude).await;
    }

    let Some(text) = msg.text() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without text or location");
        return Ok(());
    };

    match text {
        "/start" => handle_start(bot, msg, db).await,
        "/help" | ui_builder::BTN_HELP => {
            bot.send_message(msg.chat.id, help_text())
                .parse_mode(ParseMode::Html)
                .reply_markup(main_keyboard())
                .await?;
            Ok(())
        }
        "/history" | ui_builder::BTN_HISTORY => handle_history(bot, msg, db).await,
        "/favorites" => handle_favorites(bot, msg, db).await,
        ui_builder::BTN_NEAR_ME => {
            bot.send_message(
                msg.chat.id,
                "Share your location and I'll find attractions around you.",
            )
            .reply_markup(location_keyboard())
            .await?;
            Ok(())
        }
        ui_builder::BTN_FIND_PLACES => {
            bot.send_message(
                msg.chat.id,
                "Type what you are looking for, e.g. \"coffee\", \"museum\" or \"pharmacy\".",
            )
            .await?;
            Ok(())
        }
        ui_builder::BTN_BACK_TO_MENU => {
            bot.send_message(msg.chat.id, "Main menu")
                .reply_markup(main_keyboard())
                .await?;
            Ok(())
        }
        query => handle_text_search(bot, msg, db, places, query).await,
    }
}

async fn handle_start(
    bot: &Bot,
    msg: &Message,
    db: &Arc<tokio::sync::Mutex<Connection>>,
) -> Result<()> {
    if let Some(from) = &msg.from {
        let conn = db.lock().await;
        db::get_or_create_user(
            &conn,
            from.id.0 as i64,
            &from.full_name(),
            from.username.as_deref(),
        )?;
        info!(user_id = %from.id, "User started the bot");
    }

    bot.send_message(msg.chat.id, welcome_text())
        .parse_mode(ParseMode::Html)
        .reply_markup(main_keyboard())
        .await?;
    Ok(())
}

async fn handle_history(
    bot: &Bot,
    msg: &Message,
    db: &Arc<tokio::sync::Mutex<Connection>>,
) -> Result<()> {
    let records = {
        let conn = db.lock().await;
        let user = require_user(&conn, msg)?;
        match user {
            Some(user) => db::recent_searches(&conn, user.id, HISTORY_LIMIT)?,
            None => Vec::new(),
        }
    };

    bot.send_message(msg.chat.id, format_history(&records))
        .parse_mode(ParseMode::Html)
        .reply_markup(main_keyboard())
        .await?;
    Ok(())
}

async fn handle_favorites(
    bot: &Bot,
    msg: &Message,
    db: &Arc<tokio::sync::Mutex<Connection>>,
) -> Result<()> {
    let favorites = {
        let conn = db.lock().await;
        let user = require_user(&conn, msg)?;
        match user {
            Some(user) => db::list_favorites(&conn, user.id)?,
            None => Vec::new(),
        }
    };

    bot.send_message(msg.chat.id, format_favorites(&favorites))
        .parse_mode(ParseMode::Html)
        .reply_markup(main_keyboard())
        .await?;
    Ok(())
}

async fn handle_location(
    bot: &Bot,
    msg: &Message,
    db: &Arc<tokio::sync::Mutex<Connection>>,
    places: &Arc<PlacesClient>,
    latitude: f64,
    longitude: f64,
) -> Result<()> {
    info!(chat_id = %msg.chat.id, latitude, longitude, "Received location");

    bot.send_message(msg.chat.id, "🔍 Looking for attractions near you...")
        .reply_markup(main_keyboard())
        .await?;

    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64);
    let results = match places
        .search(
            "attractions",
            Some(latitude),
            Some(longitude),
            DEFAULT_RADIUS_M,
            user_id,
        )
        .await
    {
        Ok(results) => results,
        Err(SearchError::RateLimited) => {
            bot.send_message(
                msg.chat.id,
                "⏳ Too many searches. Please wait a minute and try again.",
            )
            .await?;
            return Ok(());
        }
    };

    record_user_search(
        db,
        msg,
        "attractions",
        Some(latitude),
        Some(longitude),
        results.len(),
    )
    .await?;

    if results.is_empty() {
        bot.send_message(msg.chat.id, "Nothing found around this location.")
            .await?;
        return Ok(());
    }

    for place in results.iter().take(MAX_LOCATION_RESULTS) {
        send_place_result(bot, msg, db, place, Some((latitude, longitude))).await?;
    }
    Ok(())
}

async fn handle_text_search(
    bot: &Bot,
    msg: &Message,
    db: &Arc<tokio::sync::Mutex<Connection>>,
    places: &Arc<PlacesClient>,
    query: &str,
) -> Result<()> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        bot.send_message(
            msg.chat.id,
            "The query is too short. Please type at least two characters.",
        )
        .await?;
        return Ok(());
    }

    info!(chat_id = %msg.chat.id, query, "Free-text search");
    bot.send_message(msg.chat.id, format!("🔍 Searching for \"{query}\"..."))
        .await?;

    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64);
    let results = match places.search(query, None, None, DEFAULT_RADIUS_M, user_id).await {
        Ok(results) => results,
        Err(SearchError::RateLimited) => {
            bot.send_message(
                msg.chat.id,
                "⏳ Too many searches. Please wait a minute and try again.",
            )
            .await?;
            return Ok(());
        }
    };

    record_user_search(db, msg, query, None, None, results.len()).await?;

    if results.is_empty() {
        bot.send_message(
            msg.chat.id,
            format!("Nothing found for \"{query}\". Try a different query."),
        )
        .await?;
        return Ok(());
    }

    for place in results.iter().take(MAX_TEXT_RESULTS) {
        send_place_result(bot, msg, db, place, None).await?;
    }
    Ok(())
}

/// Send one place card: text (or photo with caption) plus its inline keyboard.
async fn send_place_result(
    bot: &Bot,
    msg: &Message,
    db: &Arc<tokio::sync::Mutex<Connection>>,
    place: &Place,
    origin: Option<(f64, f64)>,
) -> Result<()> {
    let id = place_id(place.latitude, place.longitude);

    let is_fav = {
        let conn = db.lock().await;
        match require_user(&conn, msg)? {
            Some(user) => db::is_favorite(&conn, user.id, &id)?,
            None => false,
        }
    };

    let text = format_place_message(place, origin);
    let keyboard = place_keyboard(&id, &place.name, is_fav);

    let photo_url = place
        .photos
        .iter()
        .find(|url| url.starts_with("http://") || url.starts_with("https://"));

    if let Some(url) = photo_url {
        let photo = InputFile::url(url.parse().context("Invalid photo URL")?);
        let sent = bot
            .send_photo(msg.chat.id, photo)
            .caption(text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await;
        if sent.is_ok() {
            return Ok(());
        }
        warn!(chat_id = %msg.chat.id, url, "Photo send failed, falling back to text");
    }

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn record_user_search(
    db: &Arc<tokio::sync::Mutex<Connection>>,
    msg: &Message,
    query: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    results_count: usize,
) -> Result<()> {
    let Some(from) = &msg.from else {
        return Ok(());
    };

    let conn = db.lock().await;
    let user = db::get_or_create_user(
        &conn,
        from.id.0 as i64,
        &from.full_name(),
        from.username.as_deref(),
    )?;
    db::record_search(&conn, user.id, query, latitude, longitude, results_count)?;
    Ok(())
}

/// Upsert the sender if present; `None` for channel posts and the like.
fn require_user(conn: &Connection, msg: &Message) -> Result<Option<db::User>> {
    let Some(from) = &msg.from else {
        return Ok(None);
    };
    let user = db::get_or_create_user(
        conn,
        from.id.0 as i64,
        &from.full_name(),
        from.username.as_deref(),
    )?;
    Ok(Some(user))
}

/// Tell the user something went wrong and optionally alert the operator.
pub(crate) async fn report_operation_error(
    bot: &Bot,
    chat_id: ChatId,
    config: &Config,
    err: &anyhow::Error,
) {
    let kind = ErrorKind::classify(err);

    if let Err(send_err) = bot
        .send_message(chat_id, kind.user_message())
        .reply_markup(main_keyboard())
        .await
    {
        error!(chat_id = %chat_id, error = ?send_err, "Failed to deliver error message");
    }

    if kind == ErrorKind::Unknown {
        if let Some(admin_chat_id) = config.admin_chat_id {
            let note = format!("⚠️ Unhandled error in chat {chat_id}:\n{err:#}");
            if let Err(send_err) = bot.send_message(ChatId(admin_chat_id), note).await {
                error!(error = ?send_err, "Failed to notify admin chat");
            }
        }
    }
}
