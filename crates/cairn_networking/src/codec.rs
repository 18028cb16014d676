//! # Wire Codec
//!
//! One JSON object per line. Decoding checks the `type` discriminator before
//! the fields, so an unknown kind and a broken known kind are distinct errors.

use cairn_shared::constants::MAX_MESSAGE_BYTES;
use cairn_shared::{ClientMessage, ServerMessage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Message kinds a client may send.
pub const CLIENT_TYPES: &[&str] = &[
    "join",
    "request_state",
    "player_update",
    "pick_up_stone",
    "throw_stone",
    "tower_destroyed",
    "leave",
];

/// Message kinds a server may send.
pub const SERVER_TYPES: &[&str] = &[
    "welcome",
    "player_joined",
    "player_left",
    "player_update",
    "player_correction",
    "initial_state",
    "stone_spawned",
    "stone_update",
    "stone_removed",
    "tower_created",
    "tower_update",
    "tower_destroyed",
    "cloud_update",
];

/// Encodes a message as a single line without the trailing newline.
///
/// # Errors
///
/// Returns the serializer error; the protocol types never produce one.
pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Decodes one line sent by a client.
///
/// # Errors
///
/// See [`DecodeError`].
pub fn decode_client(line: &str) -> Result<ClientMessage, DecodeError> {
    decode(line, CLIENT_TYPES)
}

/// Decodes one line sent by the server.
///
/// # Errors
///
/// See [`DecodeError`].
pub fn decode_server(line: &str) -> Result<ServerMessage, DecodeError> {
    decode(line, SERVER_TYPES)
}

fn decode<T: DeserializeOwned>(line: &str, known: &[&str]) -> Result<T, DecodeError> {
    if line.len() > MAX_MESSAGE_BYTES {
        return Err(DecodeError::TooLarge(line.len()));
    }
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;
    if !known.contains(&kind) {
        return Err(DecodeError::UnknownType(kind.to_owned()));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))
}
