//! Text normalisation: the first step of the cascade.

/// Normalises curly quotes, ellipses, dashes and whitespace to plain
/// ASCII equivalents and collapses whitespace runs.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{00A0}' | '\u{2009}' | '\u{200A}' | '\u{202F}' => out.push(' '),
            '\u{200B}' | '\u{FEFF}' => {}
            other => out.push(other),
        }
    }
    collapse_whitespace(&out)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curly_quotes_become_ascii() {
        assert_eq!(
            normalize_text("\u{201C}It\u{2019}s fine\u{201D}"),
            "\"It's fine\""
        );
    }

    #[test]
    fn ellipsis_expands() {
        assert_eq!(normalize_text("wait\u{2026} what"), "wait... what");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(normalize_text("  a \t b\n\nc  "), "a b c");
    }
}
