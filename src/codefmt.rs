//! Helpers for emitting Python source text.

/// Python keywords and the module aliases the built-in components import.
pub const RESERVED_NAMES: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield", "os", "pd", "np", "sqlalchemy",
];

/// Converts `csvFileInput` or `csv-file input` into `csv_file_input`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    let trimmed = out.trim_end_matches('_');
    match trimmed.chars().next() {
        None => "node".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{}", trimmed),
        Some(_) => trimmed.to_string(),
    }
}

/// Renders a double-quoted Python string literal.
pub fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other if other.is_ascii_control() => {
                out.push_str(&format!("\\x{:02x}", other as u32));
            }
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Renders a Python list of string literals.
pub fn py_str_list<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let items: Vec<String> = values.into_iter().map(py_str).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("csvFileInput"), "csv_file_input");
        assert_eq!(snake_case("envVariables"), "env_variables");
        assert_eq!(snake_case("sql table-output"), "sql_table_output");
        assert_eq!(snake_case("3d"), "_3d");
        assert_eq!(snake_case("--"), "node");
    }

    #[test]
    fn test_py_str_escapes() {
        assert_eq!(py_str("abc123"), "\"abc123\"");
        assert_eq!(py_str("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
        assert_eq!(py_str("C:\\data"), "\"C:\\\\data\"");
    }

    #[test]
    fn test_py_str_escapes_control_characters() {
        assert_eq!(py_str("a\0b"), r#""a\x00b""#);
        assert_eq!(py_str("\u{1b}[0m\u{7f}"), r#""\x1b[0m\x7f""#);
        assert_eq!(py_str("tab\there"), r#""tab\there""#);
    }

    #[test]
    fn test_py_str_list() {
        assert_eq!(py_str_list(["a", "b"]), "[\"a\", \"b\"]");
        assert_eq!(py_str_list(Vec::<&str>::new()), "[]");
    }
}
