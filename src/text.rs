use std::collections::BTreeMap;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Counts prose words in markdown. Code, link targets and raw HTML are not words.
pub fn count_words(markdown: &str) -> u32 {
    let mut count = 0u32;
    let mut code_depth = 0usize;
    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => code_depth += 1,
            Event::End(TagEnd::CodeBlock) => code_depth = code_depth.saturating_sub(1),
            Event::Text(text) if code_depth == 0 => {
                count += text
                    .split_whitespace()
                    .filter(|w| w.chars().any(char::is_alphanumeric))
                    .count() as u32;
            }
            _ => {}
        }
    }
    count
}

/// 1.0 when sentences average 17.5 words, falling linearly to 0.0 at 0 or 35 words.
pub fn readability_score(markdown: &str) -> f64 {
    let sentences = markdown
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    if sentences == 0 {
        return 0.0;
    }
    let avg = f64::from(count_words(markdown)) / sentences as f64;
    (1.0 - (avg - 17.5).abs() / 17.5).clamp(0.0, 1.0)
}

/// Occurrences of `keyword` (whole words, case-insensitive) per word of text.
pub fn keyword_density(markdown: &str, keyword: &str) -> f64 {
    let total = count_words(markdown);
    if total == 0 {
        return 0.0;
    }
    let needle = tokens(keyword);
    if needle.is_empty() {
        return 0.0;
    }
    let haystack = tokens(markdown);
    let hits = haystack
        .windows(needle.len())
        .filter(|window| *window == needle.as_slice())
        .count();
    hits as f64 / f64::from(total)
}

pub fn keyword_densities<'a>(
    markdown: &str,
    keywords: impl IntoIterator<Item = &'a String>,
) -> BTreeMap<String, f64> {
    keywords
        .into_iter()
        .map(|k| (k.clone(), keyword_density(markdown, k)))
        .collect()
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_words_ignores_markup_and_code() {
        let md = "## Getting started\n\nInstall [the toolchain](https://go.dev) **today**.\n\n```go\nfunc main() {}\n```\n\nRun `go build` now.";
        // Getting started / Install the toolchain today / Run now
        assert_eq!(count_words(md), 8);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn readability_peaks_near_seventeen_words_per_sentence() {
        let ideal = format!("{}.", vec!["word"; 17].join(" "))
            + &format!(" {}.", vec!["word"; 18].join(" "));
        assert!((readability_score(&ideal) - 1.0).abs() < 1e-9);

        let choppy = "Go. Run. Now.";
        assert!(readability_score(choppy) < 0.1);
        assert_eq!(readability_score("   "), 0.0);
    }

    #[test]
    fn keyword_density_matches_whole_words_case_insensitively() {
        let text = "Rust is fast. rust is safe. Trusty tools.";
        assert!((keyword_density(text, "rust") - 2.0 / 8.0).abs() < 1e-9);
        assert!((keyword_density(text, "is fast") - 1.0 / 8.0).abs() < 1e-9);
        assert_eq!(keyword_density("", "rust"), 0.0);
    }
}
