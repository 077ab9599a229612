//! Heuristic read of a results page: what competitors cover and what they leave out.

use crate::formats::{CompetitorInsights, KeyInsight, SerpData};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordCounts {
    pub average: u32,
    pub highest: u32,
    pub recommended: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentAnalysis {
    pub main_headings: Vec<String>,
    pub common_topics: Vec<String>,
    pub word_counts: WordCounts,
    pub key_insights: Vec<KeyInsight>,
    pub unique_angles: Vec<String>,
    pub content_gaps: Vec<String>,
}

// A snippet is roughly a tenth of the page it summarises.
const SNIPPET_TO_PAGE_RATIO: u32 = 10;
const MIN_TOPIC_LEN: usize = 30;
const MIN_INSIGHT_LEN: usize = 20;
const GAP_SHARE: f64 = 0.3;

pub fn analyze(serp: &SerpData) -> ContentAnalysis {
    let results = &serp.organic_results;
    let mut analysis = ContentAnalysis::default();
    let mut total_words = 0u32;

    for result in results {
        let words = result.snippet.split_whitespace().count() as u32 * SNIPPET_TO_PAGE_RATIO;
        total_words += words;
        analysis.word_counts.highest = analysis.word_counts.highest.max(words);

        let heading = heading_from_title(&result.title);
        if !heading.is_empty() && !analysis.main_headings.contains(&heading) {
            analysis.main_headings.push(heading);
        }

        for topic in sentences(&result.snippet, MIN_TOPIC_LEN).map(topic_from_sentence) {
            if !analysis.common_topics.contains(&topic) {
                analysis.common_topics.push(topic);
            }
        }
    }

    if !results.is_empty() {
        analysis.word_counts.average =
            (f64::from(total_words) / results.len() as f64).round() as u32;
    }
    analysis.word_counts.recommended =
        (f64::from(analysis.word_counts.highest) * 1.5).round() as u32;

    for snippet in &serp.featured_snippets {
        analysis
            .key_insights
            .extend(sentences(snippet, MIN_INSIGHT_LEN).map(|topic| KeyInsight {
                topic: topic.to_owned(),
                frequency: 1,
            }));
    }

    for search in &serp.related_searches {
        let lowered = search.to_lowercase();
        let covered = analysis
            .main_headings
            .iter()
            .any(|h| lowered.contains(&h.to_lowercase()));
        if !covered {
            analysis.unique_angles.push(search.clone());
        }
    }

    let threshold = GAP_SHARE * results.len() as f64;
    for topic in &analysis.common_topics {
        let needle = topic.to_lowercase();
        let mentions = results
            .iter()
            .filter(|r| r.snippet.to_lowercase().contains(&needle))
            .count();
        if mentions as f64 <= threshold {
            analysis.content_gaps.push(topic.clone());
        }
    }

    analysis
}

/// Summary attached to a topic: 5 headings, 8 topics, 5 gaps, 5 insights, 3 angles.
pub fn competitor_insights(analysis: &ContentAnalysis) -> CompetitorInsights {
    CompetitorInsights {
        average_word_count: analysis.word_counts.average,
        recommended_word_count: analysis.word_counts.recommended,
        common_headings: take(&analysis.main_headings, 5),
        common_topics: take(&analysis.common_topics, 8),
        content_gaps: take(&analysis.content_gaps, 5),
        key_insights: take(&analysis.key_insights, 5),
        unique_angles: take(&analysis.unique_angles, 3),
        ..CompetitorInsights::default()
    }
}

fn take<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items.iter().take(n).cloned().collect()
}

fn heading_from_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut chars = title.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '-' | '|' => out.push(' '),
            // Drop list numbering like "10." but keep version numbers like "1.21".
            d if d.is_ascii_digit() => {
                let mut digits = String::from(d);
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_digit() {
                        break;
                    }
                    digits.push(next);
                    chars.next();
                }
                if chars.peek() == Some(&'.') {
                    chars.next();
                } else {
                    out.push_str(&digits);
                }
            }
            other => out.push(other),
        }
    }
    out.trim().to_owned()
}

fn sentences(text: &str, min_len: usize) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(move |s| s.len() > min_len)
}

fn topic_from_sentence(sentence: &str) -> String {
    let lowered = sentence.to_lowercase();
    let mut rest = sentence;
    for lead in ["how", "what", "why", "when", "where"] {
        let prefix = format!("{lead} to ");
        if lowered.starts_with(&prefix) {
            rest = sentence.get(prefix.len()..).unwrap_or(sentence);
            break;
        }
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
