//! Message payload helpers for the signing methods.

use crate::domain::error::{ProviderError, ProviderResult};
use crate::domain::methods::HostHandler;
use serde_json::Value;

/// Bytes of a message parameter.
///
/// A `0x`-prefixed string of valid hex is decoded; anything else is taken
/// as UTF-8 text.
pub fn message_to_bytes(message: &str) -> Vec<u8> {
    match message.strip_prefix("0x") {
        Some(hex) => hex::decode(hex).unwrap_or_else(|_| message.as_bytes().to_vec()),
        None => message.as_bytes().to_vec(),
    }
}

/// `0x`-prefixed lowercase hex
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Pick the host handler for an `eth_sign` payload and hex-encode it.
///
/// Text is signed as a personal message, binary data (e.g. a 32-byte hash
/// that is not valid UTF-8) as a raw message.
pub fn classify_sign_payload(message: &Value) -> ProviderResult<(HostHandler, String)> {
    let message = message
        .as_str()
        .ok_or_else(|| ProviderError::invalid_params("eth_sign message must be a string"))?;
    let bytes = message_to_bytes(message);
    let handler = if std::str::from_utf8(&bytes).is_ok() {
        HostHandler::SignPersonalMessage
    } else {
        HostHandler::SignMessage
    };
    Ok((handler, to_hex(bytes)))
}
