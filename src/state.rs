use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::blog::BlogIndex;
use crate::config::SiteConfig;
use crate::models::{CaseStudy, Page, Service};

pub type RefreshBroadcaster = broadcast::Sender<()>;

/// Everything loaded from the content directory. Replaced as a whole on reload.
#[derive(Debug, Default)]
pub struct SiteContent {
    pub layout_html: String,
    pub banner_html: String,
    pub not_found_html: String, // supports {{slug}} placeholder
    pub home_html: String,
    pub pages: Vec<Page>,
    pub services: Vec<Service>,
    pub case_studies: Vec<CaseStudy>,
    pub blog: BlogIndex,
}

impl SiteContent {
    pub fn page(&self, slug: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.slug == slug)
    }

    pub fn service(&self, slug: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.slug == slug)
    }

    pub fn case_study(&self, slug: &str) -> Option<&CaseStudy> {
        self.case_studies.iter().find(|c| c.slug == slug)
    }

    pub fn case_studies_for_service(&self, service_slug: &str) -> Vec<&CaseStudy> {
        self.case_studies
            .iter()
            .filter(|c| c.services.iter().any(|s| s == service_slug))
            .collect()
    }
}

pub struct AppState {
    pub content: RwLock<SiteContent>,
    pub config: SiteConfig,
}

impl AppState {
    pub fn new(config: SiteConfig, content: SiteContent) -> Self {
        Self {
            content: RwLock::new(content),
            config,
        }
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub app_state: Arc<AppState>,
    pub broadcaster: RefreshBroadcaster,
}

impl axum::extract::FromRef<RouterState> for Arc<AppState> {
    fn from_ref(state: &RouterState) -> Self {
        state.app_state.clone()
    }
}

impl axum::extract::FromRef<RouterState> for RefreshBroadcaster {
    fn from_ref(state: &RouterState) -> Self {
        state.broadcaster.clone()
    }
}
