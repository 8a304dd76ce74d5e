//! Identifier inflection: snake-casing, domain abbreviations, and the
//! consonant-strip rule for over-long segments. Pure string functions, no
//! knowledge of JSON Schema or SQL.

const MAX_SEGMENT_LEN: usize = 40;

/// Snake-cases a single raw identifier: whitespace and `-` become `_`, and a
/// `_` is inserted before every uppercase letter that isn't the very first
/// character (so `TestTable` -> `test_table`, `test Table` -> `test__table`,
/// `Test_table` -> `test_table`).
fn camel_snake(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for (i, c) in raw.chars().enumerate() {
        if c.is_whitespace() || c == '-' {
            out.push('_');
        } else if c.is_uppercase() && i > 0 {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Domain-specific abbreviations applied word-by-word after snake-casing.
fn abbreviate_word(word: &str) -> &str {
    match word {
        "properties" => "props",
        "timestamp" => "ts",
        "date" => "dt",
        "from" => "from_col",
        "associated" => "assoc",
        other => other,
    }
}

/// Snake-cases `raw` and applies the abbreviation table to each `_`-separated
/// word, preserving empty words (so doubled underscores survive).
pub fn inflect_word(raw: &str) -> String {
    camel_snake(raw)
        .split('_')
        .map(abbreviate_word)
        .collect::<Vec<_>>()
        .join("_")
}

/// The "consonant-stripped CamelCase abbreviation" fallback for segments
/// that would push a column name past 40 characters. Builds a PascalCase
/// rendition of the segment, drops lowercase vowels (keeping consonants and
/// the capitalized word-initials), then lowercases the result. Falls back to
/// the first three characters of the raw segment if that leaves one
/// character or fewer.
pub fn consonant_strip_abbrev(raw: &str) -> String {
    let pascal: String = camel_snake(raw)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    let abbrev: String = pascal
        .chars()
        .filter(|c| c.is_uppercase() || !"aeiou".contains(c.to_ascii_lowercase()))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if abbrev.chars().count() <= 1 {
        raw.chars().take(3).collect::<String>().to_lowercase()
    } else {
        abbrev
    }
}

/// Flattens an ordered sequence of raw JSON-pointer path segments into one
/// column name, inflecting each segment and applying the length-based
/// consonant-strip fallback as the path is built up.
pub fn flatten_path(segments: &[&str]) -> String {
    let mut acc = String::new();
    for seg in segments {
        let inflected = inflect_word(seg);
        let candidate = if acc.is_empty() {
            inflected
        } else {
            format!("{acc}__{inflected}")
        };
        if candidate.len() > MAX_SEGMENT_LEN {
            let short = consonant_strip_abbrev(seg);
            acc = if acc.is_empty() {
                short
            } else {
                format!("{acc}__{short}")
            };
        } else {
            acc = candidate;
        }
    }
    acc
}

/// Inflects a single declared identifier (a `key_properties` entry, or a
/// stream name) without path-prefix bookkeeping.
pub fn inflect_identifier(raw: &str) -> String {
    inflect_word(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_cases_from_spec() {
        assert_eq!(inflect_identifier("TestTable"), "test_table");
        assert_eq!(inflect_identifier("Test_table"), "test_table");
        assert_eq!(inflect_identifier("test Table"), "test__table");
    }

    #[test]
    fn fingerprint_key_inflection() {
        assert_eq!(inflect_identifier("Test Primary"), "test__primary");
        assert_eq!(inflect_identifier("Test_secondary"), "test_secondary");
    }

    #[test]
    fn abbreviation_table_applies_per_word() {
        assert_eq!(inflect_word("properties"), "props");
        assert_eq!(inflect_word("timestamp"), "ts");
        assert_eq!(inflect_word("event_date"), "event_dt");
        assert_eq!(inflect_word("from"), "from_col");
        assert_eq!(inflect_word("associated_object"), "assoc_object");
    }

    #[test]
    fn long_segment_falls_back_to_consonant_strip() {
        let long = "a_very_long_property_name_that_exceeds_forty_characters";
        let path = flatten_path(&["parent", long]);
        assert!(path.len() <= 40 + "parent__".len());
        assert_ne!(path, format!("parent__{}", inflect_word(long)));
    }

    #[test]
    fn consonant_strip_falls_back_to_first_three_chars_when_too_short() {
        // a segment whose consonant-stripped form collapses to <=1 char
        let abbrev = consonant_strip_abbrev("aeiou");
        assert_eq!(abbrev, "aei");
    }
}
