use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

use super::{ActingUser, ApiResult, AppState};
use crate::engine::{ChatDecision, VisibilityDecision};
use crate::models::{ThreadRow, UserId};

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub matched: bool,
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub can_see_identity: bool,
    pub decision: VisibilityDecision,
}

#[derive(Debug, Serialize)]
pub struct ChatGateResponse {
    pub allowed: bool,
    pub decision: ChatDecision,
}

pub async fn match_status(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(other): Path<UserId>,
) -> ApiResult<MatchResponse> {
    let matched = state.engine.is_match(user, other).await?;
    Ok(Json(MatchResponse { matched }))
}

pub async fn visibility(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(other): Path<UserId>,
) -> ApiResult<VisibilityResponse> {
    let decision = state.engine.decide_visibility(user, other).await?;
    Ok(Json(VisibilityResponse {
        can_see_identity: decision.is_revealed(),
        decision,
    }))
}

pub async fn chat_gate(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(recipient): Path<UserId>,
) -> ApiResult<ChatGateResponse> {
    let decision = state.engine.decide_chat(user, recipient).await?;
    Ok(Json(ChatGateResponse {
        allowed: decision.is_allowed(),
        decision,
    }))
}

/// Shadow-filters a thread listing produced by the messaging service. Rows
/// the caller does not take part in are dropped.
pub async fn filter_threads(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Json(rows): Json<Vec<ThreadRow>>,
) -> ApiResult<Vec<ThreadRow>> {
    Ok(Json(state.engine.filter_for_viewer(user, rows).await?))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, call};
    use crate::engine::fixtures::harness;
    use crate::models::{SubscriptionTier, UserId};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_policy_endpoints_reflect_tiers() {
        let h = harness();
        h.tier(UserId(2), SubscriptionTier::Elite).await;
        h.engine.send_interest(UserId(1), UserId(2)).await.unwrap();
        let app = app(&h);

        let (status, body) = call(&app, "GET", "/api/matches/2", Some(1), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matched"], false);

        let (_, body) = call(&app, "GET", "/api/visibility/2", Some(1), None).await;
        assert_eq!(body["can_see_identity"], false);
        assert_eq!(body["decision"]["decision"], "masked");

        let (_, body) = call(&app, "GET", "/api/visibility/1", Some(2), None).await;
        assert_eq!(body["can_see_identity"], true);
        assert_eq!(body["decision"]["basis"], "paid_tier");

        let (_, body) = call(&app, "GET", "/api/chat-gate/2", Some(1), None).await;
        assert_eq!(body["allowed"], false);
        assert_eq!(body["decision"]["reason"], "tier_insufficient");
    }

    #[tokio::test]
    async fn test_thread_filter_hides_flagged_counterparties() {
        let h = harness();
        h.directory.flag_abuse(UserId(9)).await;
        let app = app(&h);
        let rows = json!([
            { "thread_id": "6b8f0f8e-6d0e-4c65-9d53-0a4f7f6f6a01", "participants": [1, 9] },
            { "thread_id": "6b8f0f8e-6d0e-4c65-9d53-0a4f7f6f6a02", "participants": [1, 3] }
        ]);

        let (status, body) = call(&app, "POST", "/api/threads/filter", Some(1), Some(rows.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["participants"][1], 3);

        // The flagged caller still sees their own thread with user 1.
        let (_, body) = call(&app, "POST", "/api/threads/filter", Some(9), Some(rows)).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["participants"][0], 1);
    }

    #[tokio::test]
    async fn test_thread_filter_drops_foreign_threads() {
        let h = harness();
        let rows = json!([
            { "thread_id": "6b8f0f8e-6d0e-4c65-9d53-0a4f7f6f6a03", "participants": [5, 6] },
            { "thread_id": "6b8f0f8e-6d0e-4c65-9d53-0a4f7f6f6a04", "participants": [6, 1] }
        ]);

        let (status, body) = call(&app(&h), "POST", "/api/threads/filter", Some(1), Some(rows)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["participants"][0], 6);
    }
}
