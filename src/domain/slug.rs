//! URL slug derivation for event titles.

/// Derives a URL slug from an event title.
///
/// Lowercases the title, replaces whitespace runs with single dashes,
/// collapses dash runs, and trims leading and trailing dashes. Other
/// characters pass through unchanged. Returns an empty string for
/// whitespace-only input.
#[must_use]
pub fn slug_from_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let joined = lowered.split_whitespace().collect::<Vec<_>>().join("-");

    let mut slug = String::with_capacity(joined.len());
    let mut prev_dash = false;
    for c in joined.chars() {
        if c == '-' {
            if !prev_dash {
                slug.push('-');
            }
            prev_dash = true;
        } else {
            slug.push(c);
            prev_dash = false;
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_dashes() {
        assert_eq!(slug_from_title("Summer Music Festival"), "summer-music-festival");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(slug_from_title("Indie   Night\t2026"), "indie-night-2026");
    }

    #[test]
    fn collapses_existing_dashes() {
        assert_eq!(slug_from_title("Rock -- Roll"), "rock-roll");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(slug_from_title("  - Open Mic -  "), "open-mic");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(slug_from_title(""), "");
        assert_eq!(slug_from_title("   "), "");
    }
}
