//! In-memory blog index.
//!
//! Built once per content load from the parsed posts. Holds the posts newest
//! first and derives the tag, category and archive groupings from them.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Datelike;
use tracing::debug;

use crate::models::Post;
use crate::slug::slugify;

/// A tag or category and the posts filed under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub slug: String,
    /// First spelling seen, in index order.
    pub name: String,
    /// Indices into [`BlogIndex::posts`], newest first.
    posts: Vec<usize>,
}

impl Term {
    pub fn count(&self) -> usize {
        self.posts.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn label(&self) -> String {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveMonth {
    pub period: YearMonth,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct BlogIndex {
    posts: Vec<Post>,
    by_slug: HashMap<String, usize>,
    tags: BTreeMap<String, Term>,
    categories: BTreeMap<String, Term>,
    archives: BTreeMap<YearMonth, Vec<usize>>,
}

impl BlogIndex {
    pub fn build(mut posts: Vec<Post>) -> Self {
        posts.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.slug.cmp(&b.slug))
        });

        let mut index = BlogIndex::default();
        for (i, post) in posts.iter().enumerate() {
            index.by_slug.insert(post.slug.clone(), i);
            for tag in &post.tags {
                file_under(&mut index.tags, tag, i);
            }
            if let Some(category) = &post.category {
                file_under(&mut index.categories, category, i);
            }
            let period = YearMonth {
                year: post.date.year(),
                month: post.date.month(),
            };
            index.archives.entry(period).or_default().push(i);
        }
        index.posts = posts;

        debug!(
            posts = index.posts.len(),
            tags = index.tags.len(),
            categories = index.categories.len(),
            "blog index built"
        );
        index
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// All posts, newest first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, slug: &str) -> Option<&Post> {
        self.by_slug.get(slug).map(|&i| &self.posts[i])
    }

    pub fn recent(&self, n: usize) -> &[Post] {
        &self.posts[..n.min(self.posts.len())]
    }

    /// Tags ordered by post count, most used first, then by name.
    pub fn tags(&self) -> Vec<&Term> {
        sorted_by_count(&self.tags)
    }

    pub fn tag(&self, slug: &str) -> Option<&Term> {
        self.tags.get(slug)
    }

    pub fn categories(&self) -> Vec<&Term> {
        sorted_by_count(&self.categories)
    }

    pub fn category(&self, slug: &str) -> Option<&Term> {
        self.categories.get(slug)
    }

    pub fn posts_for_tag(&self, slug: &str) -> Vec<&Post> {
        self.tag(slug).map(|t| self.resolve(&t.posts)).unwrap_or_default()
    }

    pub fn posts_for_category(&self, slug: &str) -> Vec<&Post> {
        self.category(slug)
            .map(|t| self.resolve(&t.posts))
            .unwrap_or_default()
    }

    /// Months that have posts, newest first.
    pub fn archive_months(&self) -> Vec<ArchiveMonth> {
        self.archives
            .iter()
            .rev()
            .map(|(period, posts)| ArchiveMonth {
                period: *period,
                count: posts.len(),
            })
            .collect()
    }

    /// `(year, post count)`, newest year first.
    pub fn archive_years(&self) -> Vec<(i32, usize)> {
        let mut years: BTreeMap<i32, usize> = BTreeMap::new();
        for (period, posts) in &self.archives {
            *years.entry(period.year).or_default() += posts.len();
        }
        years.into_iter().rev().collect()
    }

    pub fn posts_in_year(&self, year: i32) -> Vec<&Post> {
        self.posts.iter().filter(|p| p.date.year() == year).collect()
    }

    pub fn posts_in_month(&self, year: i32, month: u32) -> Vec<&Post> {
        self.archives
            .get(&YearMonth { year, month })
            .map(|posts| self.resolve(posts))
            .unwrap_or_default()
    }

    /// Posts sharing tags or the category with `slug`.
    ///
    /// Each shared tag scores 2 and a shared category scores 1. Posts with no
    /// overlap are left out. Highest score first, newer first on ties.
    pub fn related(&self, slug: &str, n: usize) -> Vec<&Post> {
        let Some(post) = self.post(slug) else {
            return Vec::new();
        };
        let own_tags = tag_slugs(post);
        let own_category = post.category.as_deref().map(slugify);

        let mut scored: Vec<(usize, usize)> = self
            .posts
            .iter()
            .enumerate()
            .filter(|(_, other)| other.slug != post.slug)
            .filter_map(|(i, other)| {
                let shared_tags = tag_slugs(other).intersection(&own_tags).count();
                let same_category = match (&own_category, &other.category) {
                    (Some(own), Some(theirs)) => *own == slugify(theirs),
                    _ => false,
                };
                let score = shared_tags * 2 + usize::from(same_category);
                (score > 0).then_some((i, score))
            })
            .collect();

        // Index order is already newest first, so a stable sort keeps that on ties.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored
            .into_iter()
            .take(n)
            .map(|(i, _)| &self.posts[i])
            .collect()
    }

    fn resolve(&self, indices: &[usize]) -> Vec<&Post> {
        indices.iter().map(|&i| &self.posts[i]).collect()
    }
}

/// Distinct tag slugs of a post, the same identity the tag index uses.
fn tag_slugs(post: &Post) -> HashSet<String> {
    post.tags
        .iter()
        .map(|t| slugify(t))
        .filter(|s| !s.is_empty())
        .collect()
}

fn file_under(terms: &mut BTreeMap<String, Term>, name: &str, post: usize) {
    let slug = slugify(name);
    if slug.is_empty() {
        return;
    }
    let term = terms.entry(slug.clone()).or_insert_with(|| Term {
        slug,
        name: name.trim().to_string(),
        posts: Vec::new(),
    });
    // The same tag spelled twice on one post counts once.
    if term.posts.last() != Some(&post) {
        term.posts.push(post);
    }
}

fn sorted_by_count(terms: &BTreeMap<String, Term>) -> Vec<&Term> {
    let mut sorted: Vec<&Term> = terms.values().collect();
    sorted.sort_by(|a, b| b.count().cmp(&a.count()).then_with(|| a.name.cmp(&b.name)));
    sorted
}
