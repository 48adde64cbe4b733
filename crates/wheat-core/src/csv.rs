//! Minimal CSV reading and writing for collection exports and chaff reports.

use std::io::{self, Write};
use std::mem::take;

/// Split CSV text into rows of fields.
///
/// Handles quoted fields (with `""` escapes and embedded separators or line
/// breaks), CRLF line endings and a UTF-8 byte order mark. Blank lines are
/// dropped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                push_row(&mut rows, take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    // Last line without a trailing newline.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.len() == 1 && row[0].is_empty();
    if !blank {
        rows.push(row);
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

/// Write one CSV row, quoting fields where needed.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn parses_plain_rows() {
        let rows = parse_rows("a,b,c\n1,2,3\n");
        assert_eq!(rows, vec![strings(&["a", "b", "c"]), strings(&["1", "2", "3"])]);
    }

    #[test]
    fn parses_quotes_crlf_and_missing_newline() {
        let rows = parse_rows("Name,Set name\r\n\"Jace, the Mind Sculptor\",\"Worldwake \"\"WWK\"\"\"\r\nForest,");
        assert_eq!(
            rows,
            vec![
                strings(&["Name", "Set name"]),
                strings(&["Jace, the Mind Sculptor", "Worldwake \"WWK\""]),
                strings(&["Forest", ""]),
            ]
        );
    }

    #[test]
    fn keeps_line_breaks_inside_quotes_and_skips_blank_lines() {
        let rows = parse_rows("\u{feff}a,b\n\n\"multi\nline\",x\n\n");
        assert_eq!(rows, vec![strings(&["a", "b"]), strings(&["multi\nline", "x"])]);
    }

    #[test]
    fn writes_quoted_fields_only_when_needed() {
        let mut out = Vec::new();
        write_row(&mut out, &["Forest", "Jace, the Mind Sculptor", "say \"hi\""]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Forest,\"Jace, the Mind Sculptor\",\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn written_rows_parse_back() {
        let row = strings(&["a,b", "c\"d", "plain", ""]);
        let mut out = Vec::new();
        write_row(&mut out, row.as_slice()).unwrap();
        assert_eq!(parse_rows(&String::from_utf8(out).unwrap()), vec![row]);
    }
}
