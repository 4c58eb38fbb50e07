use std::{borrow::Cow, fmt::Write as _};

use unicode_normalization::char::is_combining_mark;

const COLUMN_GAP: &str = "  ";
const MIN_RULE_WIDTH: usize = 3;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(headers, rows);
    let numeric = numeric_columns(headers.len(), rows);

    let mut output = String::new();
    let _ = writeln!(output, "{}", layout_row(headers, &widths, &[]));
    let rules = widths
        .iter()
        .map(|w| "-".repeat((*w).max(MIN_RULE_WIDTH)))
        .collect::<Vec<_>>();
    let rule_widths = widths
        .iter()
        .map(|w| (*w).max(MIN_RULE_WIDTH))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", layout_row(&rules, &rule_widths, &[]));
    for row in rows {
        let _ = writeln!(output, "{}", layout_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(&flatten_cell(cell)));
        }
    }
    widths.into_iter().map(|w| w.max(1)).collect()
}

// A column is right-aligned when every non-empty cell parses as a number.
fn numeric_columns(count: usize, rows: &[Vec<String>]) -> Vec<bool> {
    (0..count)
        .map(|idx| {
            let mut cells = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .filter(|cell| !cell.is_empty())
                .peekable();
            cells.peek().is_some() && cells.all(|cell| cell.trim().parse::<f64>().is_ok())
        })
        .collect()
}

fn layout_row(values: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (value, width))| {
            let flat = flatten_cell(value);
            let pad = " ".repeat(width.saturating_sub(display_width(&flat)));
            if right_align.get(idx).copied().unwrap_or(false) {
                format!("{pad}{flat}")
            } else {
                format!("{flat}{pad}")
            }
        })
        .collect::<Vec<_>>();
    cells.join(COLUMN_GAP).trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    let mut width = 0;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else if !is_combining_mark(ch) {
            width += 1;
        }
    }
    width
}

fn flatten_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combining_marks_take_no_width() {
        assert_eq!(display_width("Hòa"), 3);
        assert_eq!(display_width("Ho\u{300}a"), 3);
        assert_eq!(display_width("\u{1b}[31mERR\u{1b}[0m"), 3);
    }
}
