//! Make a server-supplied name safe to create on disk.

const NAME_MAX: usize = 255;

/// Replace path separators, characters Windows rejects and control characters
/// with `_`, drop surrounding whitespace and dots, and cap the result at
/// 255 bytes on a char boundary. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
