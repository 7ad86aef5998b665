use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::{ActingUser, ApiError, ApiResult, AppState};
use crate::models::{EchoOffer, OfferId, RevealResult, UserId};

/// Issued by the platform's matching service, not by end users. Mounted
/// only on the internal router.
#[derive(Debug, Deserialize)]
pub struct GrantOfferRequest {
    pub from: UserId,
    pub to: UserId,
}

pub async fn grant_offer(
    State(state): State<AppState>,
    Json(req): Json<GrantOfferRequest>,
) -> Result<(StatusCode, Json<EchoOffer>), ApiError> {
    let offer = state.engine.grant_offer(req.from, req.to).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

pub async fn redeem_offer(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<OfferId>,
) -> ApiResult<RevealResult> {
    Ok(Json(state.engine.redeem(id, user).await?))
}

pub async fn list_offers(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> ApiResult<Vec<EchoOffer>> {
    Ok(Json(state.engine.list_offers(user).await?))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{app, call, internal_app};
    use crate::engine::fixtures::harness;
    use crate::models::UserId;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_grant_and_redeem_over_http() {
        let h = harness();
        h.engine.send_interest(UserId(1), UserId(2)).await.unwrap();
        let app = app(&h);

        let (status, offer) = call(&internal_app(&h), "POST", "/internal/echoes", None, Some(json!({ "from": 1, "to": 2 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(offer["status"], "offered");
        let id = offer["id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, "POST", &format!("/api/echoes/{id}/redeem"), Some(1), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, reveal) = call(&app, "POST", &format!("/api/echoes/{id}/redeem"), Some(2), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reveal["offer"]["status"], "redeemed");

        let (status, body) = call(&app, "POST", &format!("/api/echoes/{id}/redeem"), Some(2), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["detail"].as_str().unwrap().contains("already redeemed"));

        let (_, offers) = call(&app, "GET", "/api/echoes", Some(1), None).await;
        assert_eq!(offers.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_public_router_cannot_mint_offers() {
        let h = harness();
        h.engine.send_interest(UserId(1), UserId(2)).await.unwrap();

        let body = Some(json!({ "from": 1, "to": 2 }));
        let (status, _) = call(&app(&h), "POST", "/api/echoes", Some(2), body.clone()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let (status, _) = call(&app(&h), "POST", "/internal/echoes", Some(2), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(h.engine.list_offers(UserId(2)).await.unwrap().is_empty());
    }
}
