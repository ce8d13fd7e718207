// crates/adapt/src/ssr/context.rs

use domain::{ContentRecord, Language};
use http::StatusCode;
use serde_json::{json, Map, Value as Json};

/// What the client asked for. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub path: String,
    pub query: Option<String>,
    pub language: Language,
}

impl RenderRequest {
    pub fn new(path: impl Into<String>, query: Option<String>) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            query: query.filter(|q| !q.is_empty()),
            language,
        }
    }

    /// Path plus query, as originally requested.
    pub fn url(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }
}

/// Content route the request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoute {
    pub category: String,
    pub canonical_id: String,
    /// Per-language hrefs of the same item.
    pub alternates: Vec<(Language, String)>,
}

/// Everything a single render needs besides the shared bundle and template.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub request: RenderRequest,
    pub route: Option<PageRoute>,
    pub content: Option<ContentRecord>,
    /// A content route was matched but the store had nothing for it.
    pub not_found: bool,
}

impl RenderJob {
    pub fn page(request: RenderRequest) -> Self {
        Self {
            request,
            route: None,
            content: None,
            not_found: false,
        }
    }

    /// The context object handed to the application's render entry point.
    pub fn to_js(&self, document: &str, document_path: &str, site_origin: &str) -> Json {
        let alternates: Map<String, Json> = self
            .route
            .iter()
            .flat_map(|r| r.alternates.iter())
            .map(|(lang, href)| (lang.code().to_string(), Json::String(href.clone())))
            .collect();

        json!({
            "url": self.request.url(),
            "path": self.request.path,
            "query": self.request.query.clone().unwrap_or_default(),
            "language": self.request.language.code(),
            "baseHref": "/",
            "document": document,
            "documentPath": document_path,
            "content": self.content.as_ref().map(ContentRecord::as_json),
            "notFound": self.not_found,
            "category": self.route.as_ref().map(|r| r.category.as_str()),
            "canonicalId": self.route.as_ref().map(|r| r.canonical_id.as_str()),
            "alternates": alternates,
            "site": {
                "origin": site_origin,
                "languages": Language::ALL.iter().map(|l| l.code()).collect::<Vec<_>>(),
            },
        })
    }
}

/// Result of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub html: String,
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_detects_language_and_keeps_query() {
        let req = RenderRequest::new("/en/contact", Some("ref=nav".into()));
        assert_eq!(req.language, Language::En);
        assert_eq!(req.url(), "/en/contact?ref=nav");

        let req = RenderRequest::new("/contact", Some(String::new()));
        assert_eq!(req.language, Language::Fr);
        assert_eq!(req.url(), "/contact");
    }

    #[test]
    fn context_carries_route_and_content() {
        let job = RenderJob {
            request: RenderRequest::new("/en/methods/leasehold-financing", None),
            route: Some(PageRoute {
                category: "methods-asset".into(),
                canonical_id: "expertise-credit-bail".into(),
                alternates: vec![
                    (Language::Fr, "/methodes/expertise-credit-bail".into()),
                    (Language::En, "/en/methods/leasehold-financing".into()),
                ],
            }),
            content: Some(ContentRecord::new(json!({ "slug": "expertise-credit-bail" }))),
            not_found: false,
        };

        let ctx = job.to_js("<html></html>", "dist/index.html", "https://www.example.fr");
        assert_eq!(ctx["url"], "/en/methods/leasehold-financing");
        assert_eq!(ctx["language"], "en");
        assert_eq!(ctx["category"], "methods-asset");
        assert_eq!(ctx["canonicalId"], "expertise-credit-bail");
        assert_eq!(ctx["alternates"]["fr"], "/methodes/expertise-credit-bail");
        assert_eq!(ctx["content"]["slug"], "expertise-credit-bail");
        assert_eq!(ctx["site"]["languages"], json!(["fr", "en"]));
        assert_eq!(ctx["notFound"], false);
    }

    #[test]
    fn plain_page_has_null_route_fields() {
        let ctx = RenderJob::page(RenderRequest::new("/", None)).to_js("", "", "http://localhost");
        assert_eq!(ctx["category"], Json::Null);
        assert_eq!(ctx["content"], Json::Null);
        assert_eq!(ctx["alternates"], json!({}));
    }
}
