//! Bot module containing handlers for Telegram interactions
//!
//! This module is organized into submodules:
//! - `message_handler`: commands, reply-keyboard buttons, locations and
//!   free-text search queries
//! - `callback_handler`: inline keyboard callbacks (map links, favorites)
//! - `ui_builder`: keyboards and HTML message formatting

pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

pub use callback_handler::{callback_handler, CallbackAction, CallbackParseError};
pub use message_handler::message_handler;
pub use ui_builder::{location_keyboard, main_keyboard, place_keyboard};
