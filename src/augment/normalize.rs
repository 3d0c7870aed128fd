//! Whitespace normalization applied before instructions are appended.

fn is_horizontal(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Normalize prompt whitespace.
///
/// Strips spaces/tabs that end a line, caps blank-line runs at one blank line,
/// collapses runs of two or more spaces/tabs to a single space, and trims the
/// whole string. A lone tab inside a line is kept. Idempotent and never grows
/// the input.
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped = strip_line_endings(text);
    let capped = cap_newline_runs(&stripped);
    collapse_horizontal_runs(&capped).trim().to_string()
}

fn strip_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segments = text.split('\n').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_some() {
            out.push_str(segment.trim_end_matches(is_horizontal));
            out.push('\n');
        } else {
            out.push_str(segment);
        }
    }
    out
}

fn cap_newline_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            run += 1;
            if run <= 2 {
                out.push(ch);
            }
        } else {
            run = 0;
            out.push(ch);
        }
    }
    out
}

fn collapse_horizontal_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Option<char> = None;
    let mut run = 0usize;
    for ch in text.chars() {
        if is_horizontal(ch) {
            run += 1;
            pending = Some(ch);
            continue;
        }
        flush_run(&mut out, pending.take(), run);
        run = 0;
        out.push(ch);
    }
    flush_run(&mut out, pending, run);
    out
}

fn flush_run(out: &mut String, single: Option<char>, run: usize) {
    match (run, single) {
        (0, _) | (_, None) => {}
        (1, Some(ch)) => out.push(ch),
        _ => out.push(' '),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("  hello  ", "hello")]
    #[case("a    b", "a b")]
    #[case("a\t\tb", "a b")]
    #[case("a\tb", "a\tb")]
    #[case("line one   \nline two", "line one\nline two")]
    #[case("a\n\n\n\n\nb", "a\n\nb")]
    #[case("a\n\nb", "a\n\nb")]
    #[case("a \n \n \n b", "a\n\n b")]
    #[case(" \t\n", "")]
    #[case("", "")]
    fn normalize_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(input in "[a-c \t\n.]{0,64}") {
            let once = normalize(&input);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_never_grows(input in "\\PC{0,64}|[ \t\nxy]{0,64}") {
            prop_assert!(normalize(&input).len() <= input.len());
        }
    }
}
