use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::{ActingUser, ApiError, ApiResult, AppState};
use crate::engine::InterestListing;
use crate::models::{Direction, EdgeId, InterestEdge, UserId};

#[derive(Debug, Deserialize)]
pub struct SendInterestRequest {
    pub to: UserId,
}

#[derive(Debug, Deserialize)]
pub struct ListInterestsQuery {
    #[serde(default = "default_direction")]
    pub direction: Direction,
    #[serde(default)]
    pub archived: bool,
}

fn default_direction() -> Direction {
    Direction::Received
}

pub async fn send_interest(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Json(req): Json<SendInterestRequest>,
) -> Result<(StatusCode, Json<InterestEdge>), ApiError> {
    let edge = state.engine.send_interest(user, req.to).await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

pub async fn list_interests(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Query(query): Query<ListInterestsQuery>,
) -> ApiResult<Vec<InterestListing>> {
    let listings = state
        .engine
        .list_interests(user, query.direction, query.archived)
        .await?;
    Ok(Json(listings))
}

pub async fn archive_interest(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<EdgeId>,
) -> ApiResult<InterestEdge> {
    Ok(Json(state.engine.archive(id, user).await?))
}

pub async fn restore_interest(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<EdgeId>,
) -> ApiResult<InterestEdge> {
    Ok(Json(state.engine.restore(id, user).await?))
}

pub async fn delete_interest(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<EdgeId>,
) -> Result<StatusCode, ApiError> {
    state.engine.hard_delete(id, user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, call};
    use crate::engine::fixtures::harness;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_list_archive_delete_flow() {
        let h = harness();
        let app = app(&h);

        let (status, edge) = call(&app, "POST", "/api/interests", Some(1), Some(json!({ "to": 2 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = edge["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "POST", "/api/interests", Some(1), Some(json!({ "to": 2 }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let (status, list) = call(&app, "GET", "/api/interests?direction=received", Some(2), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["counterparty"]["visibility"], "masked");

        let (status, archived) = call(&app, "POST", &format!("/api/interests/{id}/archive"), Some(2), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(archived["receiver_archived"], true);

        let (_, list) = call(&app, "GET", "/api/interests?direction=received&archived=true", Some(2), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = call(&app, "DELETE", &format!("/api/interests/{id}"), Some(3), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, "DELETE", &format!("/api/interests/{id}"), Some(1), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "POST", &format!("/api/interests/{id}/restore"), Some(2), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
