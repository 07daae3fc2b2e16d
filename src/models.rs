use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Frontmatter of a blog post. Only `title` and `date` are required; both are
/// optional here so a missing field is reported by the loader instead of
/// failing deserialization of the whole block.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PostFrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub excerpt: Option<String>,
    #[serde(rename = "coverImage", alias = "cover_image")]
    pub cover_image: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: NaiveDate,
    pub author: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub excerpt: String,
    pub cover_image: Option<String>,
    pub html: String,
    /// Visible text of `html`, used for search.
    pub text: String,
    /// Minutes.
    pub reading_time: usize,
    pub source: PathBuf,
}

impl Post {
    pub fn url(&self) -> String {
        format!("/posts/{}", self.slug)
    }

    pub fn display_date(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            date: self.date.format("%Y-%m-%d").to_string(),
            author: self.author.clone(),
            tags: self.tags.clone(),
            category: self.category.clone(),
            excerpt: self.excerpt.clone(),
            reading_time: self.reading_time,
            url: self.url(),
        }
    }
}

/// Post metadata as exposed by the JSON search API.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub author: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub excerpt: String,
    pub reading_time: usize,
    pub url: String,
}

/// Frontmatter shared by company pages, services and case studies.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct EntryFrontMatter {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub order: Option<i32>,
    pub client: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
}

/// A company page such as "about" or "team", served at `/{slug}`.
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub order: i32,
    pub html: String,
}

impl Service {
    pub fn url(&self) -> String {
        format!("/services/{}", self.slug)
    }
}

#[derive(Debug, Clone)]
pub struct CaseStudy {
    pub slug: String,
    pub title: String,
    pub client: Option<String>,
    pub industry: Option<String>,
    pub summary: String,
    /// Slugs of the services involved.
    pub services: Vec<String>,
    pub order: i32,
    pub html: String,
}

impl CaseStudy {
    pub fn url(&self) -> String {
        format!("/case-studies/{}", self.slug)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub message: String,
    /// Hidden field; humans leave it empty.
    #[serde(default)]
    pub website: String,
}
