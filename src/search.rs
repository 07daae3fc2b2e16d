//! Blog search.
//!
//! A linear scan over the in-memory index. Every query term has to appear
//! somewhere in a post for it to match; where it appears decides the score.

use std::collections::HashSet;

use tracing::debug;

use crate::blog::BlogIndex;
use crate::models::Post;

const TITLE_WEIGHT: usize = 5;
const TAXONOMY_WEIGHT: usize = 3;
const EXCERPT_WEIGHT: usize = 2;
const BODY_WEIGHT: usize = 1;
const MAX_BODY_HITS: usize = 5;

#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub post: &'a Post,
    pub score: usize,
}

/// Lowercased alphanumeric terms of a query, each kept once in query order.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

pub fn search<'a>(index: &'a BlogIndex, query: &str, limit: usize) -> Vec<SearchHit<'a>> {
    let terms = tokenize(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit<'a>> = index
        .posts()
        .iter()
        .filter_map(|post| score_post(post, &terms).map(|score| SearchHit { post, score }))
        .collect();

    // Posts are newest first already; the stable sort keeps that on ties.
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(limit);

    debug!(
        query,
        terms = terms.len(),
        hits = hits.len(),
        top_score = hits.first().map(|h| h.score),
        "blog search"
    );
    hits
}

fn score_post(post: &Post, terms: &[String]) -> Option<usize> {
    let title = post.title.to_lowercase();
    let excerpt = post.excerpt.to_lowercase();
    let body = post.text.to_lowercase();
    let taxonomy: String = post
        .tags
        .iter()
        .chain(post.category.iter())
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut total = 0;
    for term in terms {
        let mut score = 0;
        if title.contains(term.as_str()) {
            score += TITLE_WEIGHT;
        }
        if taxonomy.contains(term.as_str()) {
            score += TAXONOMY_WEIGHT;
        }
        if excerpt.contains(term.as_str()) {
            score += EXCERPT_WEIGHT;
        }
        let body_hits = body.matches(term.as_str()).count().min(MAX_BODY_HITS);
        score += body_hits * BODY_WEIGHT;

        if score == 0 {
            return None;
        }
        total += score;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::tests::post;

    fn index() -> BlogIndex {
        let mut rtos = post("choosing-an-rtos", "2024-02-01", &["RTOS"], Some("Firmware"));
        rtos.title = "Choosing an RTOS for a battery sensor".into();
        rtos.text =
            "FreeRTOS and Zephyr both run on the nRF52. Zephyr has better power management.".into();

        let mut power = post("low-power-tricks", "2024-04-01", &["Power"], Some("Firmware"));
        power.title = "Low power tricks".into();
        power.text = "Sleep modes on Zephyr and bare metal.".into();

        let mut can = post("can-bus-basics", "2023-06-01", &["CAN"], Some("Protocols"));
        can.title = "CAN bus basics".into();
        can.text = "Arbitration, bit timing and error frames.".into();

        BlogIndex::build(vec![rtos, power, can])
    }

    #[test]
    fn tokenize_splits_and_lowercases() {
        assert_eq!(tokenize("  Zephyr, RTOS!! "), vec!["zephyr", "rtos"]);
        assert!(tokenize("  --- ").is_empty());
    }

    #[test]
    fn repeated_terms_do_not_change_the_score() {
        assert_eq!(tokenize("zephyr rtos Zephyr"), vec!["zephyr", "rtos"]);
        let index = index();
        let once = search(&index, "zephyr rtos", 10);
        let twice = search(&index, "zephyr rtos zephyr", 10);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].score, twice[0].score);
    }

    #[test]
    fn empty_query_returns_nothing() {
        assert!(search(&index(), "", 10).is_empty());
        assert!(search(&index(), "?!", 10).is_empty());
    }

    #[test]
    fn title_match_outranks_body_match() {
        let index = index();
        let hits = search(&index, "power", 10);
        assert_eq!(hits[0].post.slug, "low-power-tricks");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn all_terms_must_match() {
        let index = index();
        let hits = search(&index, "zephyr arbitration", 10);
        assert!(hits.is_empty());
        let hits = search(&index, "ZEPHYR sleep", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].post.slug, "low-power-tricks");
    }

    #[test]
    fn matches_tags_and_categories() {
        let index = index();
        let hits = search(&index, "protocols", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].post.slug, "can-bus-basics");
    }

    #[test]
    fn ties_keep_newest_first_and_limit_applies() {
        let index = index();
        let hits = search(&index, "firmware", 10);
        let slugs: Vec<&str> = hits.iter().map(|h| h.post.slug.as_str()).collect();
        assert_eq!(slugs, ["low-power-tricks", "choosing-an-rtos"]);
        assert_eq!(search(&index, "firmware", 1).len(), 1);
    }
}
