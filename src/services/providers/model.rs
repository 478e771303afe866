/// Model-based recommender
///
/// Highlights ranked by a per-user predicted rating. Only usable with an
/// identity; the merger never calls it without one, and a call that slips
/// through is rejected before any request is made.
///
/// API: `GET /recommend/predict?user_id=U&page=N&per_page=5&table=T[&search=S]`
use crate::{
    error::{AppError, AppResult},
    models::{ApiRecommendationsResponse, FeedQuery, SourcePage, PAGE_SIZE},
    services::providers::{
        followed::{into_source_page, push_search},
        BackendClient, RecommendationSource,
    },
};

#[derive(Clone)]
pub struct ModelSource {
    backend: BackendClient,
    table: String,
}

impl ModelSource {
    pub fn new(backend: BackendClient, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }
}

#[async_trait::async_trait]
impl RecommendationSource for ModelSource {
    async fn fetch_page(&self, page: u32, query: FeedQuery) -> AppResult<SourcePage> {
        let identity = query.identity.as_ref().ok_or_else(|| {
            AppError::Unauthorized("Model recommendations require a user identity".to_string())
        })?;

        let mut params = vec![
            ("user_id", identity.user_id.clone()),
            ("page", page.to_string()),
            ("per_page", PAGE_SIZE.to_string()),
            ("table", self.table.clone()),
        ];
        push_search(&mut params, &query);

        let response: ApiRecommendationsResponse = self
            .backend
            .get_json("/recommend/predict", &params, Some(identity.token.as_str()))
            .await?;

        let page_result = into_source_page(response)?;

        tracing::debug!(
            page,
            user_id = %identity.user_id,
            items = page_result.items.len(),
            has_more = page_result.has_more,
            source = "model",
            "Source page fetched"
        );

        Ok(page_result)
    }
}
