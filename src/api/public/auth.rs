use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::entities::user::{self, Entity as UserEntity};
use crate::middleware::{
    auth::generate_token,
    logging::{to_response, ApiError},
};
use crate::services::Shop;

//ROUTERS
pub fn auth_router(secret: Arc<str>) -> Router {
    Router::new()
        .route("/login", post(login))
        .layer(Extension(TokenSecret(secret)))
}

#[derive(Clone)]
struct TokenSecret(Arc<str>);

async fn login(
    Extension(shop): Extension<Arc<Shop>>,
    Extension(TokenSecret(secret)): Extension<TokenSecret>,
    Json(payload): Json<UserLogin>,
) -> Response {
    let found = UserEntity::find()
        .filter(user::Column::Username.eq(payload.username.as_str()))
        .one(&shop.db)
        .await;

    let model = match found {
        Ok(Some(model)) => model,
        Ok(None) => return invalid_credentials(),
        Err(err) => {
            return to_response(
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error"
                    })),
                ),
                Err(ApiError::DbError(err.to_string())),
            );
        }
    };

    if model.check_hash(&payload.password).is_err() {
        return invalid_credentials();
    }

    match generate_token(&secret, model.id, model.role) {
        Ok(token) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "token": token
                })),
            ),
            Ok(()),
        ),
        Err(err) => to_response(
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error"
                })),
            ),
            Err(ApiError::TokenGenerationFailed(err.to_string())),
        ),
    }
}

fn invalid_credentials() -> Response {
    to_response(
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Invalid username or password"
            })),
        ),
        Err(ApiError::ValidationFail("invalid credentials".into())),
    )
}

//Structs
#[derive(Deserialize)]
struct UserLogin {
    username: String,
    password: String,
}
