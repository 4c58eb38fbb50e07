//! Text normalizer for Vietnamese administrative names.
//!
//! [`normalize`] turns one raw name into its [`MatchKeySet`]:
//!
//! - the leading title (`Thành Phố`, `Quận`, `TP.`, `q.` ...) is stripped, dotted
//!   abbreviations first, then full words with or without their internal space;
//! - bare numbers get a level-appropriate title back (`Quận 3` → `Quận3`,
//!   `P.05` → `Phường5`), as do short all-uppercase ward names (`Phường IV`);
//! - `ascii_key` removes diacritics (including `đ`), case and every non-alphanumeric;
//! - `display_key` puts the canonical title back in front and re-spaces the
//!   camel-joined name at case and digit boundaries.
//!
//! Empty or whitespace-only input yields an empty key set; nothing here fails.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::model::{AdminLevel, MatchKeySet};

/// Administrative title words recognised in front of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminTitle {
    ThanhPho,
    Tinh,
    Quan,
    ThiXa,
    Huyen,
    Phuong,
    ThiTran,
    Xa,
}

impl AdminTitle {
    /// Camel-joined spelling used when the title is put back into a display key.
    pub fn canonical(self) -> &'static str {
        match self {
            AdminTitle::ThanhPho => "ThànhPhố",
            AdminTitle::Tinh => "Tỉnh",
            AdminTitle::Quan => "Quận",
            AdminTitle::ThiXa => "ThịXã",
            AdminTitle::Huyen => "Huyện",
            AdminTitle::Phuong => "Phường",
            AdminTitle::ThiTran => "ThịTrấn",
            AdminTitle::Xa => "Xã",
        }
    }
}

// Longest abbreviation first so `tp.` wins over `t.`.
const DOTTED_TITLES: &[(&str, AdminTitle)] = &[
    ("tp.", AdminTitle::ThanhPho),
    ("tx.", AdminTitle::ThiXa),
    ("tt.", AdminTitle::ThiTran),
    ("t.", AdminTitle::Tinh),
    ("q.", AdminTitle::Quan),
    ("h.", AdminTitle::Huyen),
    ("p.", AdminTitle::Phuong),
    ("x.", AdminTitle::Xa),
];

const WORD_TITLES: &[(&str, AdminTitle)] = &[
    ("thành phố", AdminTitle::ThanhPho),
    ("thànhphố", AdminTitle::ThanhPho),
    ("thị xã", AdminTitle::ThiXa),
    ("thịxã", AdminTitle::ThiXa),
    ("thị trấn", AdminTitle::ThiTran),
    ("thịtrấn", AdminTitle::ThiTran),
    ("tỉnh", AdminTitle::Tinh),
    ("quận", AdminTitle::Quan),
    ("huyện", AdminTitle::Huyen),
    ("phường", AdminTitle::Phuong),
    ("xã", AdminTitle::Xa),
];

const DISTRICT_NUMBER_TITLE: &str = "Quận";
const WARD_NUMBER_TITLE: &str = "Phường";
const SHORT_UPPERCASE_MAX_CHARS: usize = 3;

/// Computes the three match keys for `raw` at `level`.
pub fn normalize(raw: &str, level: AdminLevel) -> MatchKeySet {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return MatchKeySet::default();
    }
    let name = lift_parenthetical(&cleaned);
    let (title, rest) = strip_title(&name);
    let remainder: String = rest.split_whitespace().map(capitalize).collect();
    if remainder.is_empty() {
        return MatchKeySet::default();
    }

    let (normalized_key, reprefixed) = match number_title(&remainder, level) {
        Some(prefix) => (format!("{prefix}{}", trim_leading_zeros(&remainder)), true),
        None => (remainder, false),
    };
    let head = match title {
        Some(title) if !reprefixed => title.canonical(),
        _ => "",
    };
    MatchKeySet {
        ascii_key: ascii_fold(&normalized_key),
        display_key: insert_spaces(&format!("{head}{normalized_key}")),
        normalized_key,
    }
}

/// Splits a leading administrative title off `name`.
///
/// Returns the title and the rest of the name with leading separators removed. A
/// title that would leave nothing behind is not treated as a title.
pub fn strip_title(name: &str) -> (Option<AdminTitle>, &str) {
    for (prefix, title) in DOTTED_TITLES {
        if let Some(rest) = strip_prefix_ignore_case(name, prefix) {
            let rest = rest.trim_start();
            if !rest.is_empty() {
                return (Some(*title), rest);
            }
        }
    }
    for (prefix, title) in WORD_TITLES {
        if let Some(rest) = strip_prefix_ignore_case(name, prefix)
            && starts_new_word(rest)
        {
            let rest = rest.trim_start_matches(|ch: char| ch == '.' || ch.is_whitespace());
            if !rest.is_empty() {
                return (Some(*title), rest);
            }
        }
    }
    (None, name)
}

/// Removes diacritics, lowercases and keeps ASCII alphanumerics only.
pub fn ascii_fold(value: &str) -> String {
    value
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .map(|ch| match ch {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Inserts a space before every uppercase letter and before the first digit of each
/// digit run, then drops the leading space.
pub fn insert_spaces(word: &str) -> String {
    let mut spaced = String::with_capacity(word.len() + 8);
    let mut previous: Option<char> = None;
    for ch in word.chars() {
        let after_digit = previous.is_some_and(|p| p.is_ascii_digit());
        if ch.is_uppercase() || (ch.is_ascii_digit() && !after_digit) {
            spaced.push(' ');
        }
        spaced.push(ch);
        previous = Some(ch);
    }
    spaced.trim_start().to_string()
}

fn clean(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `CaoLãnh(Thànhphố)` becomes `Thànhphố CaoLãnh`; any other parenthetical is dropped.
fn lift_parenthetical(name: &str) -> String {
    let Some(open) = name.find('(') else {
        return name.to_string();
    };
    let main = name[..open].trim();
    let inner = name[open + 1..].split(')').next().unwrap_or_default().trim();
    let inner_is_title = WORD_TITLES
        .iter()
        .any(|(prefix, _)| strip_prefix_ignore_case(inner, prefix) == Some(""));
    if inner_is_title && !main.is_empty() {
        format!("{inner} {main}")
    } else if main.is_empty() {
        inner.to_string()
    } else {
        main.to_string()
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = value.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(std::iter::once(expected)) {
            return None;
        }
    }
    Some(&value[chars.offset()..])
}

fn starts_new_word(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_some_and(|ch| ch.is_whitespace() || ch == '.' || ch.is_uppercase() || ch.is_ascii_digit())
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn number_title(remainder: &str, level: AdminLevel) -> Option<&'static str> {
    let numeric = remainder.chars().all(|ch| ch.is_ascii_digit());
    match level {
        AdminLevel::District if numeric => Some(DISTRICT_NUMBER_TITLE),
        AdminLevel::Ward if numeric || is_short_uppercase(remainder) => Some(WARD_NUMBER_TITLE),
        _ => None,
    }
}

// Roman-numeral ward names such as `IV` or `XII`.
fn is_short_uppercase(remainder: &str) -> bool {
    remainder.chars().count() <= SHORT_UPPERCASE_MAX_CHARS
        && remainder.chars().any(char::is_alphabetic)
        && !remainder.chars().any(char::is_lowercase)
}

fn trim_leading_zeros(value: &str) -> &str {
    if !value.chars().all(|ch| ch.is_ascii_digit()) {
        return value;
    }
    let trimmed = value.trim_start_matches('0');
    if trimmed.is_empty() { "0" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_spaces_splits_case_and_digit_runs() {
        assert_eq!(insert_spaces("ThịXãBuônHồ"), "Thị Xã Buôn Hồ");
        assert_eq!(insert_spaces("Quận12"), "Quận 12");
        assert_eq!(insert_spaces("PhườngIV"), "Phường I V");
        assert_eq!(insert_spaces("12"), "12");
    }

    #[test]
    fn ascii_fold_handles_d_with_stroke() {
        assert_eq!(ascii_fold("ĐồngTháp"), "dongthap");
        assert_eq!(ascii_fold("Bà Rịa - Vũng Tàu"), "bariavungtau");
    }

    #[test]
    fn parenthetical_title_moves_to_front() {
        assert_eq!(lift_parenthetical("CaoLãnh(Thànhphố)"), "Thànhphố CaoLãnh");
        assert_eq!(lift_parenthetical("Phường 1 (cũ)"), "Phường 1");
    }

    #[test]
    fn title_requires_word_boundary() {
        assert_eq!(strip_title("Xãi Lang"), (None, "Xãi Lang"));
        assert_eq!(strip_title("QuậnBaĐình"), (Some(AdminTitle::Quan), "BaĐình"));
        assert_eq!(strip_title("Huyện"), (None, "Huyện"));
    }

    #[test]
    fn leading_zeros_are_dropped_from_numbers_only() {
        assert_eq!(trim_leading_zeros("05"), "5");
        assert_eq!(trim_leading_zeros("00"), "0");
        assert_eq!(trim_leading_zeros("0A"), "0A");
    }
}
