//! Property listing endpoint.

use axum::{
    extract::{Path, Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use estatemap_core::{Category, DatasetKey, Record};
use serde::Deserialize;
use tracing::warn;

use super::X_CACHE;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::{metrics, UNKNOWN_DATASET_LABEL};

#[derive(Debug, Default, Deserialize)]
pub struct PropertiesQuery {
    /// Return typed errors instead of an empty list.
    #[serde(default)]
    pub strict: bool,
    /// Keep only records of this category (label or English name).
    pub status: Option<String>,
}

impl PropertiesQuery {
    fn status_filter(&self) -> ApiResult<Option<Category>> {
        let Some(raw) = self.status.as_deref() else {
            return Ok(None);
        };
        match raw.parse::<Category>() {
            Ok(category) if category.is_classified() => Ok(Some(category)),
            Ok(category) => Err(ApiError::invalid_input(format!(
                "'{}' records are never served",
                category
            ))),
            Err(reason) => Err(ApiError::invalid_input(reason)),
        }
    }
}

/// Metric label for a requested dataset. Only configured keys become labels.
fn dataset_label<'a>(state: &AppState, dataset: &'a str) -> &'a str {
    if state
        .service
        .cache()
        .registry()
        .contains(&DatasetKey::new(dataset))
    {
        dataset
    } else {
        UNKNOWN_DATASET_LABEL
    }
}

fn cache_header(hit: bool) -> HeaderValue {
    HeaderValue::from_static(if hit { "HIT" } else { "MISS" })
}

/// GET /api/properties/:dataset
///
/// Without `strict`, fetch failures degrade to `200 []` for the map client.
pub async fn get_properties(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Query(query): Query<PropertiesQuery>,
) -> ApiResult<Response> {
    let filter = query.status_filter()?;
    let label = dataset_label(&state, &dataset);

    let (records, hit): (Vec<Record>, bool) = match state.service.try_get_property_data(&dataset).await {
        Ok(read) => {
            let hit = read.was_cache_hit();
            if let Some(m) = metrics() {
                m.record_cache_request(label, if hit { "hit" } else { "miss" });
            }
            (read.into_records(), hit)
        }
        Err(err) => {
            if let Some(m) = metrics() {
                m.record_cache_request(label, "error");
            }
            if query.strict {
                return Err(err.into());
            }
            warn!(dataset = %dataset, error = %err, "serving empty property list");
            (Vec::new(), false)
        }
    };

    let records: Vec<Record> = match filter {
        Some(category) => records.into_iter().filter(|r| r.status == category).collect(),
        None => records,
    };

    let mut response = Json(records).into_response();
    response.headers_mut().insert(X_CACHE, cache_header(hit));
    Ok(response)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:dataset", get(get_properties))
}
