//! Collection parameters shared by all list endpoints

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::filter::SearchQuery;
use super::response::ListResponse;

/// Default page size of collections other than game objects
pub const DEFAULT_PER_PAGE: usize = 10;

/// Query string of a collection request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    /// Zero or negative returns all results
    pub results_per_page: Option<i64>,
    /// JSON search document
    pub q: Option<String>,
}

impl ListParams {
    /// Page size to use, `None` meaning everything
    pub fn per_page(&self, default: Option<usize>) -> Option<usize> {
        match self.results_per_page {
            Some(n) if n <= 0 => None,
            Some(n) => Some(n as usize),
            None => default,
        }
    }
}

/// Filter, sort and paginate a collection
///
/// With `"single": true` in the search document the first match is
/// returned on its own instead of a page.
pub fn respond<T: Serialize>(
    items: Vec<T>,
    params: &ListParams,
    default_per_page: Option<usize>,
) -> Result<Response, ApiError> {
    let query = SearchQuery::parse(params.q.as_deref())?;

    let values = items
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let mut values = query.apply(values)?;

    if query.single {
        if values.is_empty() {
            return Err(ApiError::NotFound("Result".to_string()));
        }
        return Ok(Json(values.swap_remove(0)).into_response());
    }

    let page = ListResponse::paginate(
        values,
        params.page.unwrap_or(1),
        params.per_page(default_per_page),
    );
    Ok(Json(page).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_per_page() {
        let params = ListParams::default();
        assert_eq!(params.per_page(Some(DEFAULT_PER_PAGE)), Some(10));
        assert_eq!(params.per_page(None), None);

        let params = ListParams {
            results_per_page: Some(-1),
            ..Default::default()
        };
        assert_eq!(params.per_page(Some(DEFAULT_PER_PAGE)), None);

        let params = ListParams {
            results_per_page: Some(3),
            ..Default::default()
        };
        assert_eq!(params.per_page(None), Some(3));
    }

    #[test]
    fn test_single_result() {
        let params = ListParams {
            q: Some(r#"{"filters": [{"name": "n", "op": "gt", "val": 1}], "single": true}"#.into()),
            ..Default::default()
        };
        let items = vec![serde_json::json!({"n": 1}), serde_json::json!({"n": 2})];
        assert_eq!(respond(items, &params, None).unwrap().status(), StatusCode::OK);

        let err = respond(vec![serde_json::json!({"n": 0})], &params, None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
