//! Typed endpoints of the document portal.
//!
//! `PortalApi` turns each portal screen's data needs into one method. All
//! calls go through the shared `SessionClient`, so they inherit bearer
//! authentication and token refresh.

use serde::Serialize;
use tracing::debug;

use crate::models::tag::{names_for_ids, normalize_tag_name};
use crate::models::{
    Category, ContentDetails, ContentSummary, ContentUpdate, Envelope, Feedback, NewContent, Page, Tag,
    Wrapped,
};

use super::client::SessionClient;
use super::request::{ApiRequest, FormPart};
use super::ApiError;

/// Supported UI languages
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "de"];

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Serialize)]
struct ContentsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<i64>,
    page: u32,
}

#[derive(Debug, Serialize)]
struct NewTag<'a> {
    tag: &'a str,
}

/// Normalize a locale to one the service understands, falling back to English.
pub fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.trim().to_ascii_lowercase();
    SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|l| lower == *l || lower.starts_with(&format!("{}-", l)) || lower.starts_with(&format!("{}_", l)))
        .unwrap_or(DEFAULT_LOCALE)
}

#[derive(Clone)]
pub struct PortalApi {
    session: SessionClient,
    locale: &'static str,
}

impl PortalApi {
    pub fn new(session: SessionClient, locale: &str) -> Self {
        Self {
            session,
            locale: normalize_locale(locale),
        }
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    pub fn locale(&self) -> &str {
        self.locale
    }

    // ===== Categories =====

    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let request = ApiRequest::post("/categories")
            .locale(self.locale)
            .json(&serde_json::json!({}))?;
        let categories = self.session.send_json::<Wrapped<Vec<Category>>>(request).await?.into_inner();
        debug!(count = categories.len(), "Fetched categories");
        Ok(categories)
    }

    /// The service has no single-category endpoint; look it up in the list.
    pub async fn category(&self, id: i64) -> Result<Option<Category>, ApiError> {
        Ok(self.categories().await?.into_iter().find(|c| c.id == id))
    }

    // ===== Content =====

    pub async fn category_contents(&self, category_id: Option<i64>, page: u32) -> Result<Page<ContentSummary>, ApiError> {
        let request = ApiRequest::post("/category-contents")
            .locale(self.locale)
            .json(&ContentsQuery {
                category_id,
                page: page.max(1),
            })?;
        let envelope: Envelope<Page<ContentSummary>> = self.session.send_json(request).await?;
        debug!(
            category_id = ?category_id,
            page = envelope.data.current_page,
            last_page = envelope.data.last_page,
            "Fetched category contents"
        );
        Ok(envelope.data)
    }

    pub async fn content(&self, id: i64) -> Result<ContentDetails, ApiError> {
        let request = ApiRequest::get(format!("/category-content/get/{}", id));
        let envelope: Envelope<ContentDetails> = self.session.send_json(request).await?;
        Ok(envelope.data)
    }

    pub async fn create_content(&self, content: &NewContent) -> Result<(), ApiError> {
        content.validate().map_err(ApiError::Validation)?;
        let request = ApiRequest::post("/category-content/create").multipart(new_content_form(content));
        self.session.send_ok(request).await?;
        debug!(category_id = content.category_id, "Content created");
        Ok(())
    }

    /// Update an item. Selected tag ids are sent by name, so the current tag
    /// list is fetched first.
    pub async fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<(), ApiError> {
        update.validate().map_err(ApiError::Validation)?;
        let tags = self.tags().await?;
        let request = ApiRequest::post(format!("/category-content/update/{}", id))
            .multipart(content_update_form(update, &tags));
        self.session.send_ok(request).await?;
        debug!(id = id, "Content updated");
        Ok(())
    }

    // ===== Tags =====

    pub async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        let envelope: Envelope<Vec<Tag>> = self.session.send_json(ApiRequest::get("/tags")).await?;
        Ok(envelope.data)
    }

    pub async fn create_tag(&self, name: &str) -> Result<(), ApiError> {
        let name = normalize_tag_name(name)
            .ok_or_else(|| ApiError::Validation("Tag name must not be empty.".to_string()))?;
        let request = ApiRequest::post("/tag/create").json(&NewTag { tag: &name })?;
        self.session.send_ok(request).await
    }

    // ===== Feedback =====

    pub async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), ApiError> {
        let request = ApiRequest::post("/feedback").locale(self.locale).json(feedback)?;
        self.session.send_ok(request).await
    }
}

fn new_content_form(content: &NewContent) -> Vec<FormPart> {
    let mut parts = vec![
        FormPart::text("title", content.title.trim()),
        FormPart::text("notes", content.notes.trim()),
        FormPart::text("category_id", content.category_id.to_string()),
    ];
    if let Some(ref file) = content.media_file {
        parts.push(FormPart::file("media_file", file.file_name.clone(), file.bytes.clone()));
    }
    for (i, tag_id) in content.tag_ids.iter().enumerate() {
        parts.push(FormPart::text(format!("tags[{}]", i), tag_id.to_string()));
    }
    parts
}

fn content_update_form(update: &ContentUpdate, tags: &[Tag]) -> Vec<FormPart> {
    let mut parts = vec![
        FormPart::text("title", update.title.trim()),
        FormPart::text("notes", update.notes.trim()),
    ];
    for (i, name) in names_for_ids(tags, &update.tag_ids).into_iter().enumerate() {
        parts.push(FormPart::text(format!("tags[{}]", i), name));
    }
    for (i, file) in update.media_files.iter().enumerate() {
        parts.push(FormPart::file(format!("media_files[{}]", i), file.file_name.clone(), file.bytes.clone()));
    }
    parts
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialPair, MemoryTokenStore};
    use crate::models::Upload;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    fn portal(server: &Server) -> PortalApi {
        let store = Arc::new(MemoryTokenStore::with_pair(CredentialPair::new("A1", Some("R1".into()), 120)));
        let session = SessionClient::new(&server.url(), store).unwrap();
        PortalApi::new(session, "de")
    }

    fn text_value<'a>(parts: &'a [FormPart], name: &str) -> Option<&'a str> {
        parts.iter().find_map(|p| match p {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("de"), "de");
        assert_eq!(normalize_locale("DE-at"), "de");
        assert_eq!(normalize_locale("en_US"), "en");
        assert_eq!(normalize_locale("fr"), "en");
        assert_eq!(normalize_locale(""), "en");
    }

    #[test]
    fn test_new_content_form_fields() {
        let content = NewContent {
            category_id: 4,
            title: " MRI ".into(),
            notes: "knee".into(),
            media_file: Some(Upload::new("knee.png", vec![1])),
            tag_ids: vec![7, 8],
        };
        let parts = new_content_form(&content);
        assert_eq!(text_value(&parts, "title"), Some("MRI"));
        assert_eq!(text_value(&parts, "category_id"), Some("4"));
        assert_eq!(text_value(&parts, "tags[0]"), Some("7"));
        assert_eq!(text_value(&parts, "tags[1]"), Some("8"));
        assert!(parts.iter().any(|p| p.name() == "media_file"));
    }

    #[test]
    fn test_update_form_sends_tag_names_and_indexed_files() {
        let tags = vec![Tag { id: 1, tag: "lab".into() }, Tag { id: 2, tag: "ortho".into() }];
        let update = ContentUpdate {
            title: "X".into(),
            notes: "".into(),
            tag_ids: vec![2, 42],
            media_files: vec![Upload::new("a.pdf", vec![]), Upload::new("b.pdf", vec![])],
        };
        let parts = content_update_form(&update, &tags);
        assert_eq!(text_value(&parts, "tags[0]"), Some("ortho"));
        assert_eq!(text_value(&parts, "tags[1]"), None);
        assert!(parts.iter().any(|p| p.name() == "media_files[0]"));
        assert!(parts.iter().any(|p| p.name() == "media_files[1]"));
    }

    #[tokio::test]
    async fn test_categories_sends_locale_and_unwraps_envelope() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/categories")
            .match_header("authorization", "Bearer A1")
            .match_header("x-locale", "de")
            .with_status(200)
            .with_body(r#"{"data":[{"id":1,"category_name":"Befunde","icon":"i.svg","content_count":2},
                                   {"id":2,"category_name":"Labor","icon":null,"content_count":null}]}"#)
            .expect(2)
            .create_async()
            .await;

        let api = portal(&server);
        let categories = api.categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Befunde");

        let found = api.category(2).await.unwrap().unwrap();
        assert_eq!(found.name, "Labor");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_categories_accepts_bare_list() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/categories")
            .with_status(200)
            .with_body(r#"[{"id":3,"category_name":"Röntgen","icon":"x.svg","content_count":1}]"#)
            .create_async()
            .await;

        let categories = portal(&server).categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Röntgen");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_category_contents_posts_page_in_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/category-contents")
            .match_body(Matcher::Json(json!({ "category_id": 3, "page": 2 })))
            .with_status(200)
            .with_body(r#"{"data":{"data":[{"id":10,"title":"CT"}],"current_page":2,"last_page":4}}"#)
            .create_async()
            .await;

        let page = portal(&server).category_contents(Some(3), 2).await.unwrap();
        assert_eq!(page.data[0].display_title(), "CT");
        assert!(page.has_next());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_content_details() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/category-content/get/5")
            .with_status(200)
            .with_body(r#"{"data":{"contentData":{"id":5,"title":"Report","notes":null,"media_file":null},"contentTags":[]}}"#)
            .create_async()
            .await;

        let details = portal(&server).content(5).await.unwrap();
        assert_eq!(details.content.title, "Report");
        assert!(details.content.media_file.is_empty());
    }

    #[tokio::test]
    async fn test_create_tag_trims_and_rejects_blank() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tag/create")
            .match_body(Matcher::Json(json!({ "tag": "cardio" })))
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let api = portal(&server);
        api.create_tag("  cardio ").await.unwrap();
        let err = api.create_tag("   ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_content_validates_before_sending() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/category-content/create")
            .expect(0)
            .create_async()
            .await;

        let content = NewContent {
            category_id: 1,
            title: "".into(),
            notes: "n".into(),
            media_file: None,
            tag_ids: vec![],
        };
        let err = portal(&server).create_content(&content).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_content_resolves_tag_names() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/tags")
            .with_status(200)
            .with_body(r#"{"data":[{"id":1,"tag":"lab"},{"id":2,"tag":"ortho"}]}"#)
            .create_async()
            .await;
        let update_mock = server
            .mock("POST", "/category-content/update/9")
            .match_body(Matcher::Regex("ortho".to_string()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let update = ContentUpdate {
            title: "Knee".into(),
            notes: "".into(),
            tag_ids: vec![2],
            media_files: vec![],
        };
        portal(&server).update_content(9, &update).await.unwrap();
        update_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_feedback() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/feedback")
            .match_body(Matcher::PartialJson(json!({ "title": "Bug", "feedback": "Broken" })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let feedback = Feedback::new("Bug", "Broken").unwrap();
        portal(&server).submit_feedback(&feedback).await.unwrap();
        mock.assert_async().await;
    }
}
