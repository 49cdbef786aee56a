//! Translation of `@name` placeholders into SQLite's numbered `?N` form.

use tabula_data::PARAM_MARKER;

/// Rewrite every `@name` placeholder in `sql` as `?N`.
///
/// Returns the rewritten text and the distinct parameter names in bind
/// order; a repeated name reuses its number.
///
/// Quoted literals (`'...'`), quoted identifiers (`"..."`, `[...]`) and
/// `@@` system variables are left untouched.
pub fn rewrite_named(sql: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        match c {
            '\'' | '"' | '[' => {
                let close = if c == '[' { ']' } else { c };
                out.push(c);
                for (_, inner) in chars.by_ref() {
                    out.push(inner);
                    if inner == close {
                        break;
                    }
                }
            }
            c if c == PARAM_MARKER => {
                if matches!(chars.peek(), Some((_, next)) if *next == PARAM_MARKER) {
                    out.push(c);
                    if let Some((_, next)) = chars.next() {
                        out.push(next);
                    }
                    continue;
                }
                let mut name = String::new();
                while let Some((_, next)) = chars.peek() {
                    if next.is_alphanumeric() || *next == '_' {
                        name.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    out.push(c);
                    continue;
                }
                let index = match names.iter().position(|n| *n == name) {
                    Some(pos) => pos + 1,
                    None => {
                        names.push(name);
                        names.len()
                    }
                };
                out.push_str(&format!("?{index}"));
            }
            other => out.push(other),
        }
    }

    (out, names)
}
