//! Hexagram derivation over HTTP.

use axum::extract::Query;
use axum::Json;
use iching_core::hexagram::{derive_divination, lenient_number, Divination};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;

/// `?first=&second=&third=`, each parsed leniently.
#[derive(Debug, Deserialize)]
pub struct DivinationParams {
    pub first: Option<String>,
    pub second: Option<String>,
    pub third: Option<String>,
}

/// GET /api/v1/hexagrams
///
/// All three parameters must be present. Values that are not numbers count
/// as `0`, decimals are floored, and negatives use their absolute value.
pub async fn get_divination(
    Query(params): Query<DivinationParams>,
) -> AppResult<Json<DataResponse<Divination>>> {
    let (Some(first), Some(second), Some(third)) = (params.first, params.second, params.third)
    else {
        return Err(AppError::BadRequest(
            "Query parameters 'first', 'second' and 'third' are required".into(),
        ));
    };

    let divination = derive_divination(
        lenient_number(&first),
        lenient_number(&second),
        lenient_number(&third),
    );
    tracing::debug!(
        parent = %divination.coordinates.parent,
        child = %divination.coordinates.child,
        initial = divination.initial.number,
        transformed = divination.transformed.number,
        "Derived divination",
    );
    Ok(Json(DataResponse { data: divination }))
}
