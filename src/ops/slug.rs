use std::collections::HashSet;

use regex::Regex;

use crate::model::config::Config;

const FALLBACK_SLUG: &str = "item";

/// Turn a free-text name into a path-safe slug.
///
/// Filler words are dropped and at most `slug_word_limit` words kept (if
/// every word is filler the original words are used instead). Runs of
/// characters matching `slug_regex_pattern` collapse to one hyphen, and the
/// result is cut to `slug_max_length`.
pub fn slugify(name: &str, config: &Config) -> String {
    let lowered = name.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let limit = match config.slug_word_limit {
        0 => usize::MAX,
        n => n,
    };

    let mut kept: Vec<&str> = words
        .iter()
        .filter(|w| !config.slug_filler_words.iter().any(|f| f == *w))
        .take(limit)
        .copied()
        .collect();
    if kept.is_empty() {
        kept = words.iter().take(limit).copied().collect();
    }

    let joined = kept.join("-");
    let collapsed = collapse(&joined, config);
    let slug = truncate(collapsed.trim_matches('-'), config.slug_max_length);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Slug for `name` that differs from every entry in `existing`.
///
/// Collisions get `-1`, `-2`, ... with the base shortened so the suffixed
/// slug still fits `slug_max_length`.
pub fn unique_slug<'a, I>(name: &str, existing: I, config: &Config) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = existing.into_iter().collect();
    let base = slugify(name, config);
    if !taken.contains(base.as_str()) {
        return base;
    }

    let max_len = config.slug_max_length;
    let mut count = 1usize;
    loop {
        let suffix = count.to_string();
        let room = max_len.saturating_sub(suffix.len() + 1);
        let stem = if base.len() > room {
            truncate(&base, room)
        } else {
            base.clone()
        };
        let candidate = if stem.is_empty() {
            format!("{}-{}", FALLBACK_SLUG, suffix)
        } else {
            format!("{}-{}", stem, suffix)
        };
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        count += 1;
    }
}

/// Replace each run of separator characters with a single hyphen
fn collapse(s: &str, config: &Config) -> String {
    match Regex::new(&config.slug_regex_pattern) {
        Ok(re) => re.replace_all(s, "-").into_owned(),
        Err(e) => {
            tracing::warn!(pattern = %config.slug_regex_pattern, error = %e, "invalid slug pattern, keeping [a-z0-9] only");
            let mut out = String::with_capacity(s.len());
            for c in s.chars() {
                if c.is_ascii_lowercase() || c.is_ascii_digit() {
                    out.push(c);
                } else if !out.ends_with('-') {
                    out.push('-');
                }
            }
            out
        }
    }
}

/// Cut to at most `max_len` bytes (slugs are ASCII) and drop a trailing hyphen
fn truncate(s: &str, max_len: usize) -> String {
    let cut: String = s.chars().take(max_len).collect();
    cut.trim_end_matches('-').to_string()
}
