//! Comma-separated text encoding with double-quote escaping.
//!
//! A field is quoted only when it contains a quote, a comma, or a line
//! break; embedded quotes are doubled. Rows end with `\n`. The parser
//! accepts `\n`, `\r\n`, and a bare `\r` as row terminators and tolerates
//! a missing final terminator.

use std::borrow::Cow;

/// Escapes one field for output.
#[must_use]
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Renders one row, including its trailing `\n`.
#[must_use]
pub fn render_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_field(field.as_ref()));
    }
    line.push('\n');
    line
}

/// Parses a whole table in one pass.
///
/// Quoted fields may span line breaks. Rows are returned as parsed; callers
/// decide what to do with headers and blank rows.
#[must_use]
pub fn parse_table(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut row_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        row_started = true;
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                row_started = false;
            },
            _ => field.push(c),
        }
    }

    if row_started {
        row.push(field);
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("plain", "plain" ; "plain text")]
    #[test_case("a,b", "\"a,b\"" ; "comma")]
    #[test_case("say \"hi\"", "\"say \"\"hi\"\"\"" ; "quotes doubled")]
    #[test_case("two\nlines", "\"two\nlines\"" ; "line feed")]
    #[test_case("cr\rhere", "\"cr\rhere\"" ; "carriage return")]
    #[test_case("", "" ; "empty")]
    fn test_escape_field(input: &str, expected: &str) {
        assert_eq!(escape_field(input), expected);
    }

    #[test]
    fn test_render_row() {
        assert_eq!(render_row(&["1", "Red, large", "x"]), "1,\"Red, large\",x\n");
        assert_eq!(render_row::<&str>(&[]), "\n");
    }

    #[test]
    fn test_parse_multiline_quoted_field() {
        let text = "id,details\n1,\"line one\nline \"\"two\"\"\"\n2,plain";
        let rows = parse_table(text);
        assert_eq!(
            rows,
            vec![
                vec!["id".to_string(), "details".to_string()],
                vec!["1".to_string(), "line one\nline \"two\"".to_string()],
                vec!["2".to_string(), "plain".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_crlf_is_one_break() {
        let rows = parse_table("a,b\r\nc,d\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_table("").is_empty());
    }

    #[test]
    fn test_parse_keeps_blank_line_as_row() {
        let rows = parse_table("a\n\nb\n");
        assert_eq!(rows, vec![vec!["a"], vec![""], vec!["b"]]);
    }

    #[test]
    fn test_parse_json_cell() {
        let json = r#"[{"40":2,"41":3}]"#;
        let line = render_row(&["7", json]);
        let rows = parse_table(&line);
        assert_eq!(rows[0][1], json);
    }
}
