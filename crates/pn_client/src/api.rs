use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};
use tracing::{debug, info};
use url::Url;

use pn_core::status::RawStatus;
use pn_core::submit::RawSubmit;
use pn_core::{Error, Result, StatusFetch, SubmitOutcome, TaskState, TaskSubmit};

use crate::csrf::PageContext;

const CSRF_HEADER: &str = "X-CSRFToken";
const REQUESTED_WITH: &str = "X-Requested-With";

/// Status-endpoint routes for the two task families the portal runs.
#[derive(Debug, Clone)]
pub struct TaskRoutes {
    status_prefix: String,
}

impl TaskRoutes {
    pub fn scraping() -> Self {
        Self {
            status_prefix: "/noticias/scraping/task-status".to_string(),
        }
    }

    pub fn analysis() -> Self {
        Self {
            status_prefix: "/analisis/api/estado".to_string(),
        }
    }

    pub fn custom(status_prefix: impl Into<String>) -> Self {
        Self {
            status_prefix: status_prefix.into(),
        }
    }

    fn status_path(&self, task_id: &str) -> String {
        format!("{}/{}/", self.status_prefix.trim_end_matches('/'), task_id)
    }
}

/// HTTP client for the portal's task endpoints.
///
/// Submission requests deliberately run without a transport timeout:
/// the server holds them while queueing long-running work. Polling is
/// bounded by attempt count instead.
pub struct PortalClient {
    http: reqwest::Client,
    base: Url,
    page: PageContext,
    routes: TaskRoutes,
}

impl PortalClient {
    pub fn new(base_url: &str, page: PageContext, routes: TaskRoutes) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            page,
            routes,
        })
    }

    pub fn for_scraping(base_url: &str, page: PageContext) -> Result<Self> {
        Self::new(base_url, page, TaskRoutes::scraping())
    }

    pub fn for_analysis(base_url: &str, page: PageContext) -> Result<Self> {
        Self::new(base_url, page, TaskRoutes::analysis())
    }

    fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    fn request_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let token = self.page.csrf_token();
        headers.insert(
            CSRF_HEADER,
            HeaderValue::from_str(&token).map_err(|e| Error::Csrf(e.to_string()))?,
        );
        headers.insert(REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        if let Some(cookies) = self.page.cookie_header() {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&cookies).map_err(|e| Error::Csrf(e.to_string()))?,
            );
        }
        Ok(headers)
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(cookies) = self.page.cookie_header() {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&cookies).map_err(|e| Error::Csrf(e.to_string()))?,
            );
        }
        Ok(headers)
    }

    /// Check whether an analysis already exists for an article, so the
    /// caller can skip submission entirely. Lookup errors degrade to
    /// "not found"; the worst case is one redundant submission.
    pub async fn latest_analysis(&self, article_id: i64) -> Option<i64> {
        let url = self
            .endpoint_url(&format!("/analisis/api/ultimo/{}/", article_id))
            .ok()?;
        let headers = self.get_headers().ok()?;
        let response = match self.http.get(url).headers(headers).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("latest-analysis lookup failed: {}", e);
                return None;
            }
        };
        let raw: RawSubmit = response.json().await.ok()?;
        match raw.status.as_deref() {
            Some("existe") => raw.analisis_id,
            _ => None,
        }
    }
}

#[async_trait]
impl TaskSubmit for PortalClient {
    async fn submit(&self, endpoint: &str) -> Result<SubmitOutcome> {
        let url = self.endpoint_url(endpoint)?;
        let token = self.page.csrf_token();
        info!("📤 Submitting task to {}", url);

        let response = self
            .http
            .post(url)
            .headers(self.request_headers()?)
            .form(&[("csrfmiddlewaretoken", token.as_str())])
            .send()
            .await?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        if !is_json {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(100).collect();
            return Err(Error::Submission(format!(
                "non-JSON response ({}): {}",
                status, preview
            )));
        }

        let raw: RawSubmit = response.json().await?;
        if !status.is_success() {
            let message = raw
                .message
                .or(raw.error)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(Error::Submission(message));
        }

        raw.into_outcome()
    }
}

#[async_trait]
impl StatusFetch for PortalClient {
    async fn task_status(&self, task_id: &str) -> Result<TaskState> {
        let url = self.endpoint_url(&self.routes.status_path(task_id))?;
        let response = self
            .http
            .get(url)
            .headers(self.get_headers()?)
            .send()
            .await?
            .error_for_status()?;
        let raw: RawStatus = response.json().await?;
        Ok(raw.into())
    }
}
