use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, get_service},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::contact::{self, Submission};
use crate::hot_reload::ws_handler;
use crate::models::{ContactForm, Post, PostSummary};
use crate::pagination::paginate;
use crate::render;
use crate::search::search;
use crate::state::{AppState, RouterState, SiteContent};

pub fn build_router(router_state: RouterState) -> Router {
    let static_root = router_state.app_state.config.content_dir.join("static");
    let static_dir = get_service(ServeDir::new(&static_root));
    let favicon_ico = get_service(ServeFile::new(static_root.join("favicon.ico")));
    let favicon_png = get_service(ServeFile::new(static_root.join("favicon.png")));

    Router::new()
        .route("/", get(homepage))
        .route("/services", get(services_index))
        .route("/services/{slug}", get(service_detail))
        .route("/case-studies", get(case_studies_index))
        .route("/case-studies/{slug}", get(case_study_detail))
        .route("/blog", get(blog_first_page))
        .route("/blog/page/{page}", get(blog_page))
        .route("/blog/tags", get(tags_index))
        .route("/blog/tags/{tag}", get(tag_posts))
        .route("/blog/categories", get(categories_index))
        .route("/blog/categories/{category}", get(category_posts))
        .route("/blog/archive", get(archive_index))
        .route("/blog/archive/{year}", get(archive_year))
        .route("/blog/archive/{year}/{month}", get(archive_month))
        .route("/blog/search", get(search_page))
        .route("/posts/{slug}", get(render_post))
        .route("/api/search", get(api_search))
        .route("/contact", get(contact_form).post(contact_submit))
        .route("/{slug}", get(company_page))
        .nest_service("/static", static_dir)
        .route_service("/favicon.ico", favicon_ico)
        .route_service("/favicon.png", favicon_png)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(router_state)
}

fn page(state: &AppState, content: &SiteContent, title: &str, body: &str) -> Html<String> {
    Html(render::render_with_layout(content, &state.config, title, body))
}

fn not_found(state: &AppState, content: &SiteContent, slug: &str) -> Response {
    let body = render::not_found_body(content, slug);
    (StatusCode::NOT_FOUND, page(state, content, "Not found", &body)).into_response()
}

async fn homepage(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = state.content.read().await;
    let body = render::home_page(&content);
    page(&state, &content, &state.config.site_name, &body)
}

async fn company_page(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    match content.page(&slug) {
        Some(p) => page(&state, &content, &p.title, &render::company_page(p)).into_response(),
        None => not_found(&state, &content, &slug),
    }
}

async fn services_index(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = state.content.read().await;
    let body = render::services_page(&content.services);
    page(&state, &content, "Services", &body)
}

async fn service_detail(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    let Some(service) = content.service(&slug) else {
        return not_found(&state, &content, &slug);
    };
    let studies = content.case_studies_for_service(&service.slug);
    let body = render::service_page(service, &studies);
    page(&state, &content, &service.title, &body).into_response()
}

async fn case_studies_index(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = state.content.read().await;
    let body = render::case_studies_page(&content.case_studies);
    page(&state, &content, "Case studies", &body)
}

async fn case_study_detail(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    let Some(study) = content.case_study(&slug) else {
        return not_found(&state, &content, &slug);
    };
    let services: Vec<_> = study
        .services
        .iter()
        .filter_map(|s| content.service(s))
        .collect();
    let body = render::case_study_page(study, &services);
    page(&state, &content, &study.title, &body).into_response()
}

async fn blog_first_page(State(state): State<Arc<AppState>>) -> Response {
    blog_listing(&state, 1, "blog").await
}

async fn blog_page(
    Path(page_number): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match page_number.parse::<usize>() {
        Ok(n) => blog_listing(&state, n, &page_number).await,
        Err(_) => {
            let content = state.content.read().await;
            not_found(&state, &content, &page_number)
        }
    }
}

async fn blog_listing(state: &AppState, page_number: usize, requested: &str) -> Response {
    let content = state.content.read().await;
    let posts: Vec<&Post> = content.blog.posts().iter().collect();
    let Some(paginated) = paginate(&posts, page_number, state.config.posts_per_page) else {
        debug!(page = page_number, "blog page out of range");
        return not_found(state, &content, requested);
    };
    let body = render::blog_index(&paginated, &content.blog.tags());
    let title = if page_number == 1 {
        "Blog".to_string()
    } else {
        format!("Blog, page {page_number}")
    };
    page(state, &content, &title, &body).into_response()
}

async fn render_post(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    let Some(post) = content.blog.post(&slug) else {
        return not_found(&state, &content, &slug);
    };
    let related = content.blog.related(&slug, state.config.related_posts);
    let body = render::post_page(post, &related);
    page(&state, &content, &post.title, &body).into_response()
}

async fn tags_index(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = state.content.read().await;
    let body = format!(
        "<h1>Tags</h1>{}",
        render::term_list(&content.blog.tags(), "/blog/tags", "tag-cloud")
    );
    page(&state, &content, "Tags", &body)
}

async fn tag_posts(
    Path(tag): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    let Some(term) = content.blog.tag(&tag) else {
        return not_found(&state, &content, &tag);
    };
    let posts = content.blog.posts_for_tag(&tag);
    let body = render::term_page("Tagged", term, &posts);
    page(&state, &content, &term.name, &body).into_response()
}

async fn categories_index(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = state.content.read().await;
    let body = format!(
        "<h1>Categories</h1>{}",
        render::term_list(&content.blog.categories(), "/blog/categories", "categories")
    );
    page(&state, &content, "Categories", &body)
}

async fn category_posts(
    Path(category): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    let Some(term) = content.blog.category(&category) else {
        return not_found(&state, &content, &category);
    };
    let posts = content.blog.posts_for_category(&category);
    let body = render::term_page("Category", term, &posts);
    page(&state, &content, &term.name, &body).into_response()
}

async fn archive_index(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = state.content.read().await;
    let body = render::archive_index(
        &content.blog.archive_years(),
        &content.blog.archive_months(),
    );
    page(&state, &content, "Archive", &body)
}

async fn archive_year(
    Path(year): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    let posts = year
        .parse::<i32>()
        .map(|y| content.blog.posts_in_year(y))
        .unwrap_or_default();
    if posts.is_empty() {
        return not_found(&state, &content, &year);
    }
    let body = render::archive_period(&year, &posts);
    page(&state, &content, &year, &body).into_response()
}

async fn archive_month(
    Path((year, month)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let content = state.content.read().await;
    let period = year.parse::<i32>().ok().zip(month.parse::<u32>().ok());
    let posts = period
        .map(|(y, m)| content.blog.posts_in_month(y, m))
        .unwrap_or_default();
    let Some((y, m)) = period.filter(|_| !posts.is_empty()) else {
        return not_found(&state, &content, &format!("{year}/{month}"));
    };
    let label = crate::blog::YearMonth { year: y, month: m }.label();
    let body = render::archive_period(&label, &posts);
    page(&state, &content, &label, &body).into_response()
}

#[derive(Deserialize, Debug, Default)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_page(
    Query(params): Query<SearchParams>,
    State(state): State<Arc<AppState>>,
) -> Html<String> {
    let content = state.content.read().await;
    let hits = search(&content.blog, &params.q, state.config.search_result_limit);
    let body = render::search_page(&params.q, &hits);
    page(&state, &content, "Search", &body)
}

async fn api_search(
    Query(params): Query<SearchParams>,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let content = state.content.read().await;
    // `total` counts every match; `results` stops at the configured limit.
    let hits = search(&content.blog, &params.q, usize::MAX);
    let total = hits.len();
    let results: Vec<PostSummary> = hits
        .into_iter()
        .take(state.config.search_result_limit)
        .map(|hit| hit.post.summary())
        .collect();
    Json(json!({
        "query": params.q,
        "total": total,
        "results": results,
    }))
}

async fn contact_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let content = state.content.read().await;
    let body = render::contact_page(&ContactForm::default(), &[], &state.config.contact_email);
    page(&state, &content, "Contact", &body)
}

async fn contact_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ContactForm>,
) -> Response {
    let content = state.content.read().await;
    match contact::check(&form) {
        Submission::Accepted => {
            info!(
                sender = %form.name.trim(),
                email = %form.email.trim(),
                company = %form.company.trim(),
                message_chars = form.message.trim().chars().count(),
                "contact form submission received"
            );
            page(&state, &content, "Thank you", &render::contact_thanks(&form.name)).into_response()
        }
        Submission::Spam => {
            debug!("dropping contact submission caught by honeypot");
            page(&state, &content, "Thank you", &render::contact_thanks(&form.name)).into_response()
        }
        Submission::Rejected(errors) => {
            debug!(errors = errors.len(), "contact form rejected");
            let body = render::contact_page(&form, &errors, &state.config.contact_email);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                page(&state, &content, "Contact", &body),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use super::*;
    use crate::config::SiteConfig;
    use crate::content_loader::load_content;
    use crate::content_loader::tests::fixture_site;

    async fn app() -> (tempfile::TempDir, Router) {
        let (dir, config) = fixture_site();
        app_with(dir, config).await
    }

    async fn app_with(dir: tempfile::TempDir, config: SiteConfig) -> (tempfile::TempDir, Router) {
        let content = load_content(&config).await.unwrap();
        let (tx, _rx) = broadcast::channel(1);
        let router = build_router(RouterState {
            app_state: Arc::new(AppState::new(config, content)),
            broadcaster: tx,
        });
        (dir, router)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn post_form(router: Router, body: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/contact")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn homepage_renders_inside_layout() {
        let (_dir, router) = app().await;
        let (status, html) = get(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<h1>We ship firmware</h1>"));
        assert!(html.contains("<header>Banner</header>"));
        assert!(html.contains("Firmware development"));
        assert!(html.contains("href=\"/about\""));
    }

    #[tokio::test]
    async fn company_page_and_reserved_slug() {
        let (_dir, router) = app().await;
        let (status, html) = get(router.clone(), "/about").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<strong>bare metal</strong>"));

        let (status, html) = get(router, "/careers").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(html.contains("No page at careers"));
    }

    #[tokio::test]
    async fn services_and_case_studies_link_up() {
        let (_dir, router) = app().await;
        let (status, html) = get(router.clone(), "/services/firmware").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Smart meter firmware"));

        let (status, html) = get(router.clone(), "/case-studies/smart-meter").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("GridCo"));
        assert!(html.contains("href=\"/services/firmware\""));

        let (status, _) = get(router, "/services/pcb-layout").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blog_is_paginated() {
        let (_dir, router) = app().await;
        let (status, html) = get(router.clone(), "/blog").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Zephyr power management"));
        assert!(html.contains("Getting started with Zephyr"));
        assert!(!html.contains("CAN bus basics</a></h2>"));
        assert!(html.contains("href=\"/blog/page/2\""));

        let (status, html) = get(router.clone(), "/blog/page/2").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("CAN bus basics</a></h2>"));

        for uri in ["/blog/page/3", "/blog/page/0", "/blog/page/two"] {
            let (status, _) = get(router.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn post_page_shows_related_posts() {
        let (_dir, router) = app().await;
        let (status, html) = get(router.clone(), "/posts/zephyr-intro").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(
            "<title>Getting started with Zephyr | Embedded Systems Consulting</title>"
        ));
        assert!(html.contains("Related posts"));
        assert!(html.contains("href=\"/posts/zephyr-power\""));

        let (status, html) = get(router, "/posts/no-such-post").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(html.contains("No page at no-such-post"));
    }

    #[tokio::test]
    async fn tags_categories_and_archives() {
        let (_dir, router) = app().await;
        let (status, html) = get(router.clone(), "/blog/tags/zephyr").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("2 posts"));

        let (status, html) = get(router.clone(), "/blog/categories/protocols").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("CAN bus basics"));

        let (status, html) = get(router.clone(), "/blog/archive").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("href=\"/blog/archive/2024/03\""));

        let (status, html) = get(router.clone(), "/blog/archive/2024/03").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Posts from March 2024"));

        let (status, _) = get(router.clone(), "/blog/archive/2023").await;
        assert_eq!(status, StatusCode::OK);

        for uri in ["/blog/archive/1999", "/blog/archive/2024/13", "/blog/tags/cobol"] {
            let (status, _) = get(router.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn search_page_and_api() {
        let (_dir, router) = app().await;
        let (status, html) = get(router.clone(), "/blog/search?q=arbitration").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("1 result for “arbitration”"));

        let (status, body) = get(router, "/api/search?q=zephyr").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["total"], 2);
        assert_eq!(value["results"][0]["slug"], "zephyr-intro");
        assert_eq!(value["results"][1]["url"], "/posts/zephyr-power");
    }

    #[tokio::test]
    async fn api_search_with_empty_query() {
        let (_dir, router) = app().await;
        for uri in ["/api/search?q=", "/api/search"] {
            let (status, body) = get(router.clone(), uri).await;
            assert_eq!(status, StatusCode::OK);
            let value: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(value["total"], 0, "{uri}");
            assert_eq!(value["results"].as_array().map(Vec::len), Some(0));
        }
    }

    #[tokio::test]
    async fn search_result_limit_caps_results_not_total() {
        let (dir, config) = fixture_site();
        let config = SiteConfig {
            search_result_limit: 1,
            ..config
        };
        let (_dir, router) = app_with(dir, config).await;

        let (_, body) = get(router.clone(), "/api/search?q=zephyr").await;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["total"], 2);
        assert_eq!(value["results"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["results"][0]["slug"], "zephyr-intro");

        let (status, html) = get(router, "/blog/search?q=zephyr").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("1 result for “zephyr”"));
    }

    #[tokio::test]
    async fn empty_blog_still_has_a_first_page() {
        let (dir, config) = fixture_site();
        std::fs::remove_dir_all(dir.path().join("posts")).unwrap();
        let (_dir, router) = app_with(dir, config).await;

        let (status, html) = get(router.clone(), "/blog").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("No posts yet."));
        assert!(!html.contains("class=\"pagination\""));

        let (status, _) = get(router, "/blog/page/2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn contact_form_round_trip() {
        let (_dir, router) = app().await;
        let (status, html) = get(router.clone(), "/contact").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("action=\"/contact\""));

        let (status, html) = post_form(
            router.clone(),
            "name=Grace&email=grace%40example.com&message=We+need+a+bootloader+for+our+STM32+board",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Thanks, Grace."));

        let (status, html) = post_form(router, "name=Grace&email=nope&message=short").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(html.contains("Please enter a valid email address."));
        assert!(html.contains("value=\"Grace\""));
    }

    #[tokio::test]
    async fn honeypot_submission_gets_the_thank_you_page() {
        let (_dir, router) = app().await;
        let (status, html) = post_form(
            router,
            "name=Bot&email=nope&message=buy&website=http%3A%2F%2Fspam.example",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Thanks, Bot."));
        assert!(!html.contains("Please enter a valid email address."));
    }
}
