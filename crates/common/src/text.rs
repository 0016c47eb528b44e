use std::borrow::Cow;

/// Maximum number of characters of a relayed message that ends up in logs.
pub const LOG_PREVIEW_CHARS: usize = 64;

/// Shorten message content for log lines, appending an ellipsis when cut.
pub fn preview(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((idx, _)) => Cow::Owned(format!("{}…", &text[..idx])),
        None => Cow::Borrowed(text),
    }
}
