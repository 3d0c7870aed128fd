//! Deduplicating instruction injection.

/// Something that can be appended to a prompt.
///
/// `marker` is the text checked for prior presence; it defaults to the full text.
/// Fragments whose body varies with the prompt (the JSON template) use a fixed
/// marker so a second pass still recognizes them.
pub trait Fragment {
    fn text(&self) -> &str;

    fn marker(&self) -> &str {
        self.text()
    }
}

impl Fragment for &str {
    fn text(&self) -> &str {
        self
    }
}

impl Fragment for String {
    fn text(&self) -> &str {
        self.as_str()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Append `fragments` to `text` as one trailing block.
///
/// A fragment is skipped when its marker already appears (case-insensitively) in `text`
/// or in a fragment accepted earlier in the same call, so re-running on augmented
/// output adds nothing. Accepted fragments keep call order, are joined by single
/// spaces, and are separated from the body by a blank line. With nothing accepted the
/// input is returned unchanged.
#[must_use]
pub fn inject<F: Fragment>(text: &str, fragments: &[F]) -> String {
    let mut accepted: Vec<&str> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let marker = fragment.marker();
        if contains_ignore_case(text, marker) {
            continue;
        }
        if accepted
            .iter()
            .any(|existing| contains_ignore_case(existing, marker))
        {
            continue;
        }
        accepted.push(fragment.text());
    }

    if accepted.is_empty() {
        return text.to_string();
    }
    format!("{text}\n\n{}", accepted.join(" "))
}
