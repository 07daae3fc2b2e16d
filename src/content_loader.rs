use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use gray_matter::{engine::YAML, Matter};
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::blog::BlogIndex;
use crate::config::SiteConfig;
use crate::error::{Result, SiteError};
use crate::markdown::{excerpt_from_text, plain_text, reading_time, render_markdown_to_html};
use crate::models::{CaseStudy, EntryFrontMatter, Page, Post, PostFrontMatter, Service};
use crate::slug::{is_valid_slug, slugify};
use crate::state::{AppState, SiteContent};

/// Top-level paths a company page may not take over.
const RESERVED_SLUGS: &[&str] = &[
    "api",
    "blog",
    "case-studies",
    "contact",
    "favicon",
    "posts",
    "services",
    "static",
    "ws",
];

pub async fn load_content(config: &SiteConfig) -> Result<SiteContent> {
    let dir = &config.content_dir;
    let layout_html = read_required(&dir.join("layout.html")).await?;
    let banner_html = read_required(&dir.join("banner.html")).await?;
    let not_found_html = read_required(&dir.join("not_found.html")).await?;
    let home_html = load_home(&dir.join("home.md")).await?;

    let pages = load_entries(&dir.join("pages"), "page", config, page_from_entry)
        .await?
        .into_iter()
        .filter(|page| {
            let reserved = RESERVED_SLUGS.contains(&page.slug.as_str());
            if reserved {
                warn!(slug = %page.slug, "skipping page whose slug collides with a site route");
            }
            !reserved
        })
        .collect::<Vec<_>>();
    let services =
        load_entries(&dir.join("services"), "service", config, service_from_entry).await?;
    let case_studies = load_entries(
        &dir.join("case-studies"),
        "case study",
        config,
        case_study_from_entry,
    )
    .await?;
    let blog = BlogIndex::build(load_posts(&dir.join("posts"), config).await?);

    info!(
        pages = pages.len(),
        services = services.len(),
        case_studies = case_studies.len(),
        posts = blog.len(),
        "content loaded"
    );

    Ok(SiteContent {
        layout_html,
        banner_html,
        not_found_html,
        home_html,
        pages,
        services,
        case_studies,
        blog,
    })
}

pub async fn reload_content(app_state: &AppState) {
    info!("Reloading application content...");
    match load_content(&app_state.config).await {
        Ok(content) => {
            *app_state.content.write().await = content;
            info!("Content successfully reloaded.");
        }
        Err(e) => {
            error!("Failed to reload content: {}", e);
        }
    }
}

async fn read_required(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| SiteError::io(path, e))
}

async fn load_home(path: &Path) -> Result<String> {
    let raw = read_required(path).await?;
    let body = match Matter::<YAML>::new().parse::<EntryFrontMatter>(&raw) {
        Ok(parsed) => parsed.content,
        Err(e) => {
            warn!(
                path = %path.display(),
                "home page front matter unreadable, rendering as-is: {}", e
            );
            raw
        }
    };
    Ok(render_markdown_to_html(&body))
}

/// Markdown files directly under `dir`, sorted by file name. A missing
/// directory is an empty collection.
async fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "content directory absent");
            return Ok(Vec::new());
        }
        Err(e) => return Err(SiteError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| SiteError::io(dir, e))? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") && !is_temp_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Emacs lock files (`.#name`) and backups (`name~`).
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|s| s.starts_with(".#") || s.ends_with('~'))
}

async fn load_posts(dir: &Path, config: &SiteConfig) -> Result<Vec<Post>> {
    let mut posts: Vec<Post> = Vec::new();

    for path in markdown_files(dir).await? {
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), "skipping unreadable post: {}", e);
                continue;
            }
        };

        match parse_post(&path, &raw, config) {
            Ok(Some(post)) => {
                if let Some(kept) = posts.iter().find(|p| p.slug == post.slug) {
                    warn!(
                        path = %path.display(),
                        kept = %kept.source.display(),
                        slug = %post.slug,
                        "skipping post with duplicate slug"
                    );
                    continue;
                }
                posts.push(post);
            }
            Ok(None) => debug!(path = %path.display(), "skipping draft"),
            Err(e) => warn!("skipping malformed post: {}", e),
        }
    }

    Ok(posts)
}

/// Parse one post file. Drafts yield `Ok(None)` outside development mode.
pub fn parse_post(path: &Path, raw: &str, config: &SiteConfig) -> Result<Option<Post>> {
    let (front, body) = parse_front_matter::<PostFrontMatter>(path, raw)?;
    let front = front.ok_or_else(|| SiteError::invalid_content(path, "missing front matter"))?;

    if front.draft && !config.is_development {
        return Ok(None);
    }

    let title = front
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SiteError::invalid_content(path, "missing title"))?;
    let date = front
        .date
        .as_deref()
        .ok_or_else(|| SiteError::invalid_content(path, "missing date"))
        .and_then(|d| {
            parse_date(d)
                .ok_or_else(|| SiteError::invalid_content(path, format!("unparseable date {d:?}")))
        })?;
    let slug = entry_slug(path, front.slug.as_deref())?;

    let html = render_markdown_to_html(&body);
    let text = plain_text(&html);
    let excerpt = front
        .excerpt
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| excerpt_from_text(&text, config.excerpt_length));
    let author = front
        .author
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| config.default_author.clone());

    Ok(Some(Post {
        slug,
        title,
        date,
        author,
        tags: front
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        category: front.category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        excerpt,
        cover_image: front.cover_image,
        reading_time: reading_time(&text, config.words_per_minute),
        html,
        text,
        source: path.to_path_buf(),
    }))
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp of which only the date is kept.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

fn parse_front_matter<D: DeserializeOwned>(path: &Path, raw: &str) -> Result<(Option<D>, String)> {
    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse::<D>(raw)
        .map_err(|e| SiteError::front_matter(path, e.to_string()))?;
    Ok((parsed.data, parsed.content))
}

fn entry_slug(path: &Path, explicit: Option<&str>) -> Result<String> {
    let source = explicit
        .map(str::to_string)
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .unwrap_or_default();
    let slug = slugify(&source);
    if is_valid_slug(&slug) {
        Ok(slug)
    } else {
        Err(SiteError::invalid_content(path, format!("cannot derive a slug from {source:?}")))
    }
}

struct Entry {
    slug: String,
    title: String,
    front: EntryFrontMatter,
    html: String,
}

async fn load_entries<T, F>(
    dir: &Path,
    kind: &str,
    config: &SiteConfig,
    build: F,
) -> Result<Vec<T>>
where
    F: Fn(Entry, &SiteConfig) -> T,
    T: Ordered,
{
    let mut items: Vec<T> = Vec::new();

    for path in markdown_files(dir).await? {
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), kind, "skipping unreadable file: {}", e);
                continue;
            }
        };
        match parse_entry(&path, &raw) {
            Ok(entry) => {
                let item = build(entry, config);
                if items.iter().any(|i| i.slug() == item.slug()) {
                    warn!(path = %path.display(), kind, "skipping duplicate slug");
                    continue;
                }
                items.push(item);
            }
            Err(e) => warn!(kind, "skipping malformed file: {}", e),
        }
    }

    items.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.title().cmp(b.title())));
    Ok(items)
}

fn parse_entry(path: &Path, raw: &str) -> Result<Entry> {
    let (front, body) = parse_front_matter::<EntryFrontMatter>(path, raw)?;
    let front = front.unwrap_or_default();
    let title = front
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| SiteError::invalid_content(path, "missing title"))?;
    let slug = entry_slug(path, front.slug.as_deref())?;
    Ok(Entry {
        slug,
        title,
        html: render_markdown_to_html(&body),
        front,
    })
}

fn summary_or_excerpt(summary: Option<String>, html: &str, config: &SiteConfig) -> String {
    summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| excerpt_from_text(&plain_text(html), config.excerpt_length))
}

fn page_from_entry(entry: Entry, _config: &SiteConfig) -> Page {
    Page {
        slug: entry.slug,
        title: entry.title,
        description: entry.front.description,
        order: entry.front.order.unwrap_or(0),
        html: entry.html,
    }
}

fn service_from_entry(entry: Entry, config: &SiteConfig) -> Service {
    Service {
        summary: summary_or_excerpt(entry.front.summary, &entry.html, config),
        slug: entry.slug,
        title: entry.title,
        order: entry.front.order.unwrap_or(0),
        html: entry.html,
    }
}

fn case_study_from_entry(entry: Entry, config: &SiteConfig) -> CaseStudy {
    CaseStudy {
        summary: summary_or_excerpt(entry.front.summary, &entry.html, config),
        slug: entry.slug,
        title: entry.title,
        client: entry.front.client,
        industry: entry.front.industry,
        services: entry.front.services.iter().map(|s| slugify(s)).collect(),
        order: entry.front.order.unwrap_or(0),
        html: entry.html,
    }
}

/// Ordering and identity shared by the non-blog collections.
trait Ordered {
    fn slug(&self) -> &str;
    fn title(&self) -> &str;
    fn order(&self) -> i32;
}

macro_rules! impl_ordered {
    ($($ty:ty),*) => {
        $(impl Ordered for $ty {
            fn slug(&self) -> &str {
                &self.slug
            }
            fn title(&self) -> &str {
                &self.title
            }
            fn order(&self) -> i32 {
                self.order
            }
        })*
    };
}

impl_ordered!(Page, Service, CaseStudy);
