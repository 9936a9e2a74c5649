/// Maximum length, in characters, of any error message that is logged,
/// emitted as a metric or returned to a caller.
///
/// Transport errors can embed whole request bodies; this bounds log volume.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 150;

/// Keep the first [`MAX_ERROR_MESSAGE_LENGTH`] characters of `message`.
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_LENGTH) {
        Some((cut, _)) => message[..cut].to_string(),
        None => message.to_string(),
    }
}
