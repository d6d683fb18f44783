//! String helpers shared by the pipeline and the chat front end.

/// Fallback name when nothing usable is left after sanitization
pub const UNKNOWN_MEDIA_NAME: &str = "unknown_media";

/// Maximum length (in characters) of a sanitized file name stem
pub const MAX_FILENAME_CHARS: usize = 100;

/// Replaces characters that are unsafe in file names.
///
/// Path separators, Windows-reserved characters (`* ? : " < > |`) and
/// control characters become `_`. The result is capped at
/// [`MAX_FILENAME_CHARS`] characters. An empty input, or one where no
/// character survives, becomes [`UNKNOWN_MEDIA_NAME`]. Applying it twice
/// gives the same result as applying it once.
///
/// # Example
///
/// ```
/// use mediarelay::core::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// assert_eq!(sanitize_filename(""), "unknown_media");
/// assert_eq!(sanitize_filename("///"), "unknown_media");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let mut kept = 0usize;
    let result: String = name
        .chars()
        .map(|c| {
            if is_invalid_filename_char(c) {
                '_'
            } else {
                kept += 1;
                c
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect();

    if kept == 0 {
        UNKNOWN_MEDIA_NAME.to_string()
    } else {
        result
    }
}

fn is_invalid_filename_char(c: char) -> bool {
    matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Escapes special characters for Telegram's MarkdownV2 format.
///
/// The backslash is escaped too so that already-escaped input does not
/// produce dangling escapes.
///
/// # Example
///
/// ```
/// use mediarelay::core::utils::escape_markdown_v2;
///
/// let escaped = escape_markdown_v2("Hello. World!");
/// assert_eq!(escaped, "Hello\\. World\\!");
/// ```
pub fn escape_markdown_v2(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        match c {
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{'
            | '}' | '.' | '!' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    result
}

/// Escapes a URL for use inside the `(...)` part of a MarkdownV2 link.
pub fn escape_markdown_v2_url(url: &str) -> String {
    let mut result = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ')' || c == '\\' {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Shortens a title to `max_chars` characters, appending `...` when cut.
///
/// # Example
///
/// ```
/// use mediarelay::core::utils::truncate_title;
///
/// assert_eq!(truncate_title("short", 50), "short");
/// assert_eq!(truncate_title("abcdef", 3), "abc...");
/// ```
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// Size in megabytes (1 MB = 1024 * 1024 bytes)
pub fn bytes_to_mb(size_bytes: u64) -> f64 {
    size_bytes as f64 / (1024.0 * 1024.0)
}
