/// Followed-entity recommender
///
/// Highlights for the teams and players the user follows. Needs no user
/// model, so it is available from the first render.
///
/// API: `GET /recommend/follow?page=N&per_page=5[&search=S]`
use crate::{
    error::{AppError, AppResult},
    models::{ApiRecommendationsResponse, FeedQuery, RawRecommendation, SourcePage, PAGE_SIZE},
    services::providers::{BackendClient, RecommendationSource},
};

#[derive(Clone)]
pub struct FollowedSource {
    backend: BackendClient,
}

impl FollowedSource {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait::async_trait]
impl RecommendationSource for FollowedSource {
    async fn fetch_page(&self, page: u32, query: FeedQuery) -> AppResult<SourcePage> {
        let mut params = vec![
            ("page", page.to_string()),
            ("per_page", PAGE_SIZE.to_string()),
        ];
        push_search(&mut params, &query);

        let response: ApiRecommendationsResponse = self
            .backend
            .get_json("/recommend/follow", &params, query.token())
            .await?;

        let page_result = into_source_page(response)?;

        tracing::debug!(
            page,
            items = page_result.items.len(),
            has_more = page_result.has_more,
            source = "followed",
            "Source page fetched"
        );

        Ok(page_result)
    }
}

pub(crate) fn push_search(params: &mut Vec<(&'static str, String)>, query: &FeedQuery) {
    if let Some(search) = &query.search {
        params.push(("search", search.clone()));
    }
}

/// Validates a recommendations payload and trims it to one block
pub(crate) fn into_source_page(response: ApiRecommendationsResponse) -> AppResult<SourcePage> {
    if !response.success {
        return Err(AppError::ExternalApi(
            response
                .message
                .unwrap_or_else(|| "Recommendation request was not successful".to_string()),
        ));
    }

    let items = response
        .recommendations
        .into_iter()
        .map(RawRecommendation::from)
        .filter(|rec| !rec.reel_id.trim().is_empty())
        .take(PAGE_SIZE)
        .collect();

    Ok(SourcePage {
        items,
        has_more: response.has_more,
    })
}
