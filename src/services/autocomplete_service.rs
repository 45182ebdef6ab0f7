/// Keyword to snippet table, checked in order against the trimmed text before the cursor.
const SUGGESTIONS: &[(&str, &str)] = &[
    ("def", " my_function():\n    pass"),
    ("class", " MyClass:\n    def __init__(self):\n        pass"),
    ("import", " os"),
    ("print", "('Hello World')"),
    ("if", " __name__ == \"__main__\":\n    pass"),
    ("for", " i in range(10):\n    print(i)"),
    ("try", ":\n    pass\nexcept Exception as e:\n    print(e)"),
    ("return", " True"),
];

/// Suggest a completion for the code before `cursor_position`.
///
/// The cursor is a character index; out of range values are clamped and negative
/// values count back from the end of `code`.
pub fn suggest(code: &str, cursor_position: i64) -> Option<&'static str> {
    let before = text_before(code, cursor_position);
    let trimmed = before.trim();
    SUGGESTIONS
        .iter()
        .find(|(keyword, _)| trimmed.ends_with(keyword))
        .map(|(_, snippet)| *snippet)
}

fn text_before(code: &str, cursor_position: i64) -> &str {
    let n_chars = code.chars().count() as i64;
    let cut = if cursor_position < 0 {
        (n_chars + cursor_position).max(0)
    } else {
        cursor_position.min(n_chars)
    };
    match code.char_indices().nth(cut as usize) {
        Some((byte_idx, _)) => &code[..byte_idx],
        None => code,
    }
}
