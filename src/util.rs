/// Longest prefix of `text` that fits in `max_bytes` without splitting a char.
pub fn truncate_string(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Strip `suffix` from the end of a file name, returning the stem.
pub fn strip_extension<'a>(file_name: &'a str, suffix: &str) -> Option<&'a str> {
    file_name.strip_suffix(suffix).filter(|stem| !stem.is_empty())
}
