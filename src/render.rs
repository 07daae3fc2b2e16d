//! HTML rendering.
//!
//! Pages are the content directory's `layout.html` with placeholders filled in.
//! Every fragment below escapes what came from frontmatter or the request;
//! rendered markdown is inserted as-is.

use std::fmt::Write;

use htmlescape::encode_minimal;

use crate::blog::{ArchiveMonth, Term};
use crate::config::SiteConfig;
use crate::contact::FieldError;
use crate::models::{CaseStudy, ContactForm, Page, Post, Service};
use crate::pagination::Paginated;
use crate::search::SearchHit;
use crate::slug::slugify;
use crate::state::SiteContent;

const HOT_RELOAD_SCRIPT: &str = r#"
<script>
    const socket = new WebSocket("ws://" + window.location.host + "/ws");
    socket.onmessage = (event) => {
        if (event.data === "reload") {
            window.location.reload();
        }
    };
</script>
"#;

const SIDEBAR_POSTS: usize = 5;
const HOME_POSTS: usize = 3;

pub fn render_with_layout(
    content: &SiteContent,
    config: &SiteConfig,
    title: &str,
    body: &str,
) -> String {
    let mut page = fill_placeholders(&content.layout_html, |name| match name {
        "title" => Some(encode_minimal(title)),
        "site_name" => Some(encode_minimal(&config.site_name)),
        "tagline" => Some(encode_minimal(&config.tagline)),
        "base_url" => Some(encode_minimal(&config.base_url)),
        "nav" => Some(nav(content)),
        "banner" => Some(content.banner_html.clone()),
        "posts" => Some(sidebar_posts(content.blog.recent(SIDEBAR_POSTS))),
        "content" => Some(body.to_string()),
        _ => None,
    });

    if config.is_development {
        if let Some(at) = page.rfind("</body>") {
            page.insert_str(at, HOT_RELOAD_SCRIPT);
        }
    }

    page
}

/// Replaces `{{ name }}` tokens in one left-to-right pass.
///
/// Substituted values are never scanned again, so a post title that looks
/// like a placeholder stays literal. Unknown names are left as written.
fn fill_placeholders(template: &str, value: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + len + 2;
        out.push_str(&rest[..start]);
        match value(rest[start + 2..end - 2].trim()) {
            Some(v) => out.push_str(&v),
            None => out.push_str(&rest[start..end]),
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

pub fn not_found_body(content: &SiteContent, slug: &str) -> String {
    fill_placeholders(&content.not_found_html, |name| {
        (name == "slug").then(|| encode_minimal(slug))
    })
}

fn nav(content: &SiteContent) -> String {
    let mut links = vec![("/".to_string(), "Home".to_string())];
    links.extend(
        content
            .pages
            .iter()
            .map(|p| (format!("/{}", p.slug), p.title.clone())),
    );
    links.push(("/services".into(), "Services".into()));
    links.push(("/case-studies".into(), "Case studies".into()));
    links.push(("/blog".into(), "Blog".into()));
    links.push(("/contact".into(), "Contact".into()));

    let mut out = String::from("<nav class=\"site-nav\"><ul>");
    for (href, label) in links {
        let _ = write!(
            out,
            "<li><a href=\"{}\">{}</a></li>",
            encode_minimal(&href),
            encode_minimal(&label)
        );
    }
    out.push_str("</ul></nav>");
    out
}

fn sidebar_posts(posts: &[Post]) -> String {
    let mut list_items = String::new();
    for post in posts {
        let _ = write!(
            list_items,
            "<li><a href=\"{}\" class=\"text-blue no-underline\">{}</a></li>",
            encode_minimal(&post.url()),
            encode_minimal(&post.title)
        );
    }
    list_items
}

fn tag_links(tags: &[String]) -> String {
    // Names without a slug never make it into the tag index.
    let linked: Vec<(String, &String)> = tags
        .iter()
        .map(|tag| (slugify(tag), tag))
        .filter(|(slug, _)| !slug.is_empty())
        .collect();
    if linked.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul class=\"tags\">");
    for (slug, tag) in linked {
        let _ = write!(
            out,
            "<li><a class=\"tag\" href=\"/blog/tags/{}\">{}</a></li>",
            slug,
            encode_minimal(tag)
        );
    }
    out.push_str("</ul>");
    out
}

fn post_meta(post: &Post) -> String {
    let mut meta = format!(
        "<p class=\"post-meta\"><time datetime=\"{}\">{}</time> · {} · {} min read",
        post.date.format("%Y-%m-%d"),
        post.display_date(),
        encode_minimal(&post.author),
        post.reading_time
    );
    if let Some(category) = &post.category {
        let slug = slugify(category);
        if !slug.is_empty() {
            let _ = write!(
                meta,
                " · <a class=\"category\" href=\"/blog/categories/{}\">{}</a>",
                slug,
                encode_minimal(category)
            );
        }
    }
    meta.push_str("</p>");
    meta
}

pub fn post_list(posts: &[&Post]) -> String {
    if posts.is_empty() {
        return "<p class=\"empty\">No posts yet.</p>".to_string();
    }
    let mut out = String::from("<ul class=\"post-list\">");
    for post in posts {
        let _ = write!(
            out,
            "<li class=\"post-card\"><h2><a href=\"{}\">{}</a></h2>{}<p class=\"excerpt\">{}</p>{}</li>",
            encode_minimal(&post.url()),
            encode_minimal(&post.title),
            post_meta(post),
            encode_minimal(&post.excerpt),
            tag_links(&post.tags)
        );
    }
    out.push_str("</ul>");
    out
}

pub fn post_page(post: &Post, related: &[&Post]) -> String {
    let mut out = String::from("<article class=\"post\">");
    if let Some(cover) = &post.cover_image {
        let _ = write!(
            out,
            "<img class=\"cover\" src=\"{}\" alt=\"{}\">",
            encode_minimal(cover),
            encode_minimal(&post.title)
        );
    }
    let _ = write!(
        out,
        "<h1>{}</h1>{}{}<div class=\"post-body\">{}</div></article>",
        encode_minimal(&post.title),
        post_meta(post),
        tag_links(&post.tags),
        post.html
    );
    if !related.is_empty() {
        out.push_str("<section class=\"related\"><h2>Related posts</h2><ul>");
        for other in related {
            let _ = write!(
                out,
                "<li><a href=\"{}\">{}</a></li>",
                encode_minimal(&other.url()),
                encode_minimal(&other.title)
            );
        }
        out.push_str("</ul></section>");
    }
    out
}

fn page_url(base: &str, page: usize) -> String {
    if page <= 1 {
        base.to_string()
    } else {
        format!("{base}/page/{page}")
    }
}

pub fn pagination_nav<T>(page: &Paginated<T>, base: &str) -> String {
    if page.total_pages <= 1 {
        return String::new();
    }
    let mut out = String::from("<nav class=\"pagination\">");
    if page.has_prev() {
        let _ = write!(
            out,
            "<a rel=\"prev\" href=\"{}\">Newer posts</a>",
            page_url(base, page.page - 1)
        );
    }
    let _ = write!(
        out,
        "<span class=\"page-count\">Page {} of {}</span>",
        page.page, page.total_pages
    );
    if page.has_next() {
        let _ = write!(
            out,
            "<a rel=\"next\" href=\"{}\">Older posts</a>",
            page_url(base, page.page + 1)
        );
    }
    out.push_str("</nav>");
    out
}

pub fn blog_index(page: &Paginated<&Post>, tags: &[&Term]) -> String {
    format!(
        "<h1>Blog</h1>{}<p class=\"count\">{} {}</p>{}<aside class=\"blog-links\"><a href=\"/blog/tags\">Tags</a> · <a href=\"/blog/categories\">Categories</a> · <a href=\"/blog/archive\">Archive</a></aside>{}",
        search_form(""),
        page.total_items,
        if page.total_items == 1 { "post" } else { "posts" },
        post_list(&page.items),
        if tags.is_empty() { String::new() } else { term_list(tags, "/blog/tags", "tag-cloud") }
    ) + &pagination_nav(page, "/blog")
}

pub fn term_list(terms: &[&Term], base: &str, class: &str) -> String {
    if terms.is_empty() {
        return "<p class=\"empty\">Nothing here yet.</p>".to_string();
    }
    let mut out = format!("<ul class=\"{class}\">");
    for term in terms {
        let _ = write!(
            out,
            "<li><a href=\"{base}/{}\">{}</a> <span class=\"count\">({})</span></li>",
            term.slug,
            encode_minimal(&term.name),
            term.count()
        );
    }
    out.push_str("</ul>");
    out
}

pub fn term_page(kind: &str, term: &Term, posts: &[&Post]) -> String {
    format!(
        "<h1>{} “{}”</h1><p class=\"count\">{} {}</p>{}",
        kind,
        encode_minimal(&term.name),
        posts.len(),
        if posts.len() == 1 { "post" } else { "posts" },
        post_list(posts)
    )
}

pub fn archive_index(years: &[(i32, usize)], months: &[ArchiveMonth]) -> String {
    if years.is_empty() {
        return "<h1>Archive</h1><p class=\"empty\">No posts yet.</p>".to_string();
    }
    let mut out = String::from("<h1>Archive</h1><ul class=\"archive\">");
    for (year, count) in years {
        let _ = write!(
            out,
            "<li><a href=\"/blog/archive/{year}\">{year}</a> <span class=\"count\">({count})</span><ul>"
        );
        for month in months.iter().filter(|m| m.period.year == *year) {
            let _ = write!(
                out,
                "<li><a href=\"/blog/archive/{}/{:02}\">{}</a> <span class=\"count\">({})</span></li>",
                month.period.year,
                month.period.month,
                month.period.label(),
                month.count
            );
        }
        out.push_str("</ul></li>");
    }
    out.push_str("</ul>");
    out
}

pub fn archive_period(label: &str, posts: &[&Post]) -> String {
    format!(
        "<h1>Posts from {}</h1>{}<p><a href=\"/blog/archive\">All archives</a></p>",
        encode_minimal(label),
        post_list(posts)
    )
}

fn search_form(query: &str) -> String {
    format!(
        "<form class=\"search\" action=\"/blog/search\" method=\"get\"><input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"Search posts\"><button type=\"submit\">Search</button></form>",
        encode_minimal(query)
    )
}

pub fn search_page(query: &str, hits: &[SearchHit<'_>]) -> String {
    let mut out = format!("<h1>Search</h1>{}", search_form(query));
    if query.trim().is_empty() {
        return out;
    }
    if hits.is_empty() {
        let _ = write!(
            out,
            "<p class=\"empty\">No posts match “{}”.</p>",
            encode_minimal(query)
        );
        return out;
    }
    let _ = write!(
        out,
        "<p class=\"result-count\">{} {} for “{}”</p>",
        hits.len(),
        if hits.len() == 1 { "result" } else { "results" },
        encode_minimal(query)
    );
    let posts: Vec<&Post> = hits.iter().map(|h| h.post).collect();
    out.push_str(&post_list(&posts));
    out
}

pub fn company_page(page: &Page) -> String {
    let mut out = format!("<article class=\"page\"><h1>{}</h1>", encode_minimal(&page.title));
    if let Some(description) = &page.description {
        let _ = write!(out, "<p class=\"lead\">{}</p>", encode_minimal(description));
    }
    out.push_str(&page.html);
    out.push_str("</article>");
    out
}

fn services_grid(services: &[Service]) -> String {
    let mut out = String::from("<ul class=\"services\">");
    for service in services {
        let _ = write!(
            out,
            "<li class=\"service-card\"><h3><a href=\"{}\">{}</a></h3><p>{}</p></li>",
            encode_minimal(&service.url()),
            encode_minimal(&service.title),
            encode_minimal(&service.summary)
        );
    }
    out.push_str("</ul>");
    out
}

pub fn services_page(services: &[Service]) -> String {
    if services.is_empty() {
        return "<h1>Services</h1><p class=\"empty\">Nothing listed yet.</p>".to_string();
    }
    format!("<h1>Services</h1>{}", services_grid(services))
}

pub fn service_page(service: &Service, case_studies: &[&CaseStudy]) -> String {
    let mut out = format!(
        "<article class=\"service\"><h1>{}</h1><p class=\"lead\">{}</p>{}</article>",
        encode_minimal(&service.title),
        encode_minimal(&service.summary),
        service.html
    );
    if !case_studies.is_empty() {
        out.push_str("<section class=\"case-studies\"><h2>Case studies</h2>");
        out.push_str(&case_study_cards(case_studies));
        out.push_str("</section>");
    }
    out.push_str("<p class=\"cta\"><a href=\"/contact\">Talk to us about your project</a></p>");
    out
}

fn case_study_cards(case_studies: &[&CaseStudy]) -> String {
    let mut out = String::from("<ul class=\"case-study-list\">");
    for study in case_studies {
        let _ = write!(
            out,
            "<li><h3><a href=\"{}\">{}</a></h3>",
            encode_minimal(&study.url()),
            encode_minimal(&study.title)
        );
        if let Some(industry) = &study.industry {
            let _ = write!(out, "<p class=\"industry\">{}</p>", encode_minimal(industry));
        }
        let _ = write!(out, "<p>{}</p></li>", encode_minimal(&study.summary));
    }
    out.push_str("</ul>");
    out
}

pub fn case_studies_page(case_studies: &[CaseStudy]) -> String {
    if case_studies.is_empty() {
        return "<h1>Case studies</h1><p class=\"empty\">Nothing published yet.</p>".to_string();
    }
    let refs: Vec<&CaseStudy> = case_studies.iter().collect();
    format!("<h1>Case studies</h1>{}", case_study_cards(&refs))
}

pub fn case_study_page(study: &CaseStudy, services: &[&Service]) -> String {
    let mut out = format!(
        "<article class=\"case-study\"><h1>{}</h1><dl class=\"facts\">",
        encode_minimal(&study.title)
    );
    if let Some(client) = &study.client {
        let _ = write!(out, "<dt>Client</dt><dd>{}</dd>", encode_minimal(client));
    }
    if let Some(industry) = &study.industry {
        let _ = write!(out, "<dt>Industry</dt><dd>{}</dd>", encode_minimal(industry));
    }
    if !services.is_empty() {
        out.push_str("<dt>Services</dt><dd>");
        let links: Vec<String> = services
            .iter()
            .map(|s| {
                format!(
                    "<a href=\"{}\">{}</a>",
                    encode_minimal(&s.url()),
                    encode_minimal(&s.title)
                )
            })
            .collect();
        out.push_str(&links.join(", "));
        out.push_str("</dd>");
    }
    out.push_str("</dl>");
    out.push_str(&study.html);
    out.push_str("</article>");
    out
}

pub fn home_page(content: &SiteContent) -> String {
    let mut out = content.home_html.clone();
    if !content.services.is_empty() {
        out.push_str("<section class=\"home-services\"><h2>What we do</h2>");
        out.push_str(&services_grid(&content.services));
        out.push_str("</section>");
    }
    if !content.blog.is_empty() {
        let recent: Vec<&Post> = content.blog.recent(HOME_POSTS).iter().collect();
        out.push_str("<section class=\"home-posts\"><h2>From the blog</h2>");
        out.push_str(&post_list(&recent));
        out.push_str("</section>");
    }
    out
}

fn field_error(errors: &[FieldError], field: &str) -> String {
    errors
        .iter()
        .filter(|e| e.field == field)
        .map(|e| format!("<p class=\"field-error\">{}</p>", e.message))
        .collect()
}

pub fn contact_page(form: &ContactForm, errors: &[FieldError], contact_email: &str) -> String {
    let mut out = String::from("<h1>Contact</h1>");
    if !errors.is_empty() {
        out.push_str(
            "<p class=\"form-error\" role=\"alert\">Please fix the highlighted fields.</p>",
        );
    }
    let _ = write!(
        out,
        concat!(
            "<form class=\"contact\" action=\"/contact\" method=\"post\">",
            "<label>Name <input name=\"name\" value=\"{name}\" required></label>{name_err}",
            "<label>Email <input type=\"email\" name=\"email\" value=\"{email}\" required></label>{email_err}",
            "<label>Company <input name=\"company\" value=\"{company}\"></label>{company_err}",
            "<label>Message <textarea name=\"message\" required>{message}</textarea></label>{message_err}",
            "<div class=\"hp\" aria-hidden=\"true\"><input name=\"website\" tabindex=\"-1\" autocomplete=\"off\"></div>",
            "<button type=\"submit\">Send</button></form>",
            "<p class=\"direct\">Or email us at <a href=\"mailto:{mail}\">{mail_text}</a>.</p>"
        ),
        name = encode_minimal(&form.name),
        name_err = field_error(errors, "name"),
        email = encode_minimal(&form.email),
        email_err = field_error(errors, "email"),
        company = encode_minimal(&form.company),
        company_err = field_error(errors, "company"),
        message = encode_minimal(&form.message),
        message_err = field_error(errors, "message"),
        mail = encode_minimal(contact_email),
        mail_text = encode_minimal(contact_email),
    );
    out
}

pub fn contact_thanks(name: &str) -> String {
    format!(
        "<h1>Thank you</h1><p class=\"thanks\">Thanks, {}. We'll get back to you within two working days.</p>",
        encode_minimal(name.trim())
    )
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;
    use crate::blog::tests::post;
    use crate::blog::BlogIndex;
    use crate::pagination::paginate;

    fn select_text(html: &str, selector: &str) -> Vec<String> {
        let doc = Html::parse_fragment(html);
        let selector = Selector::parse(selector).unwrap();
        doc.select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect()
    }

    fn content() -> SiteContent {
        SiteContent {
            layout_html: concat!(
                "<html><head><title>{{ title }}</title></head><body>",
                "{{ nav }}{{ banner }}<main>{{ content }}</main><ul>{{ posts }}</ul>",
                "</body></html>"
            )
            .into(),
            banner_html: "<header>B</header>".into(),
            not_found_html: "<p>No {{slug}}</p>".into(),
            blog: BlogIndex::build(vec![post("first-post", "2024-01-01", &["Rust"], None)]),
            ..SiteContent::default()
        }
    }

    #[test]
    fn layout_fills_placeholders_and_keeps_body_verbatim() {
        let content = content();
        let config = SiteConfig::default();
        let page = render_with_layout(&content, &config, "A & B", "<p>{{ posts }}</p>");
        assert!(page.contains("<title>A &amp; B</title>"));
        assert!(page.contains("<header>B</header>"));
        assert!(page.contains("<p>{{ posts }}</p>"));
        assert!(page.contains("href=\"/posts/first-post\""));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn placeholder_text_in_substituted_values_stays_literal() {
        let mut content = content();
        let mut tricky = post("tricky", "2024-02-01", &[], None);
        tricky.title = "Why {{ content }} placeholders bite".into();
        content.blog = BlogIndex::build(vec![tricky]);
        let config = SiteConfig::default();
        let page = render_with_layout(&content, &config, "{{ nav }}", "<p>BODY</p>");
        assert_eq!(page.matches("<p>BODY</p>").count(), 1);
        assert!(page.contains("Why {{ content }} placeholders bite"));
        assert!(page.contains("<title>{{ nav }}</title>"));
    }

    #[test]
    fn unknown_and_unclosed_placeholders_are_kept() {
        let filled = fill_placeholders("a {{ x }} {{ y }} {{ open", |name| {
            (name == "x").then(|| "X".to_string())
        });
        assert_eq!(filled, "a X {{ y }} {{ open");
    }

    #[test]
    fn development_mode_injects_reload_script() {
        let content = content();
        let config = SiteConfig {
            is_development: true,
            ..SiteConfig::default()
        };
        let page = render_with_layout(&content, &config, "t", "");
        assert!(page.contains("new WebSocket"));
        assert!(page.ends_with("</script>\n</body></html>"));
    }

    #[test]
    fn not_found_escapes_slug() {
        let body = not_found_body(&content(), "<script>");
        assert_eq!(body, "<p>No &lt;script&gt;</p>");
    }

    #[test]
    fn post_list_escapes_titles() {
        let mut p = post("x", "2024-01-01", &["C++"], Some("Tools & Tips"));
        p.title = "<b>Bold</b> claims".into();
        let html = post_list(&[&p]);
        assert_eq!(select_text(&html, "h2 a"), vec!["<b>Bold</b> claims"]);
        assert!(html.contains("href=\"/blog/tags/c\""));
        assert!(html.contains("href=\"/blog/categories/tools-tips\""));
    }

    #[test]
    fn terms_without_a_slug_are_not_linked() {
        let p = post("x", "2024-01-01", &["++", "Rust"], Some("日本語"));
        let html = post_list(&[&p]);
        assert!(!html.contains("href=\"/blog/tags/\""));
        assert!(!html.contains("href=\"/blog/categories/\""));
        assert_eq!(select_text(&html, "a.tag"), vec!["Rust"]);

        let bare = post("y", "2024-01-01", &["++"], None);
        assert!(!post_page(&bare, &[]).contains("class=\"tags\""));
    }

    #[test]
    fn pagination_links() {
        let posts = [
            post("a", "2024-01-03", &[], None),
            post("b", "2024-01-02", &[], None),
            post("c", "2024-01-01", &[], None),
        ];
        let refs: Vec<&Post> = posts.iter().collect();
        let page = paginate(&refs, 2, 1).unwrap();
        let nav = pagination_nav(&page, "/blog");
        assert!(nav.contains("href=\"/blog\""));
        assert!(nav.contains("href=\"/blog/page/3\""));
        assert!(nav.contains("Page 2 of 3"));

        let single = paginate(&refs, 1, 10).unwrap();
        assert!(pagination_nav(&single, "/blog").is_empty());
    }

    #[test]
    fn related_section_only_when_present() {
        let p = post("a", "2024-01-01", &[], None);
        let other = post("b", "2024-01-02", &[], None);
        assert!(!post_page(&p, &[]).contains("Related posts"));
        let html = post_page(&p, &[&other]);
        assert_eq!(select_text(&html, ".related li a"), vec!["b"]);
    }

    #[test]
    fn contact_form_preserves_values_and_shows_errors() {
        let form = ContactForm {
            name: "\"Quoted\"".into(),
            message: "</textarea>".into(),
            ..ContactForm::default()
        };
        let errors = vec![FieldError {
            field: "email",
            message: "Please enter a valid email address.",
        }];
        let html = contact_page(&form, &errors, "hello@example.com");
        assert!(html.contains("value=\"&quot;Quoted&quot;\""));
        assert!(html.contains("&lt;/textarea&gt;"));
        assert_eq!(
            select_text(&html, ".field-error"),
            vec!["Please enter a valid email address."]
        );
    }

    #[test]
    fn search_page_states() {
        assert!(!search_page("", &[]).contains("No posts match"));
        assert!(search_page("zig", &[]).contains("No posts match “zig”"));
        let p = post("a", "2024-01-01", &[], None);
        let hits = vec![SearchHit { post: &p, score: 3 }];
        assert!(search_page("a", &hits).contains("1 result for “a”"));
    }
}
