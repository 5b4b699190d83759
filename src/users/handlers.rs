use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{SearchParams, UpdateRoleRequest, UpdateStatusRequest, UserRequest, UserResponse};
use super::filters::UserFilter;
use super::repo::{Page, PageRequest};
use crate::{error::ApiError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/role", patch(update_role))
        .route("/users/:id/status", patch(update_status))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<UserResponse>), ApiError> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;
    let user = state.users.create(draft).await?;

    let location = format!("/api/v1/users/{}", user.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(user.into()),
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let user = state.users.get_by_id(id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let Query(params) = params?;
    let paging = &state.config.paging;

    let size = params.size.unwrap_or(paging.default_size);
    if size == 0 || size > paging.max_size {
        return Err(ApiError::bad_request(format!(
            "size: must be between 1 and {}.",
            paging.max_size
        )));
    }
    let request = PageRequest {
        page: params.page.unwrap_or(0),
        size,
    };
    let filter = UserFilter {
        search: params.search,
        status: params.status,
        role: params.role,
    };

    let page = state.users.search(&filter, request).await?;
    Ok(Json(page.map(UserResponse::from)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;
    let user = state.users.full_update(id, draft).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let user = state.users.update_role(id, payload.role).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let user = state.users.update_status(id, payload.status).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use super::*;
    use crate::{app::build_app, state::AppState};

    fn app() -> Router {
        build_app(AppState::fake())
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn ana() -> Value {
        json!({"name": "Ana Li", "email": "ana@x.com", "phone_number": "+10000000001"})
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = app()
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_returns_created_user_with_location() {
        let app = app();
        let mut body = ana();
        body["role"] = json!("ADMIN");
        body["status"] = json!("INACTIVE");

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let user: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(user["role"], "USER");
        assert_eq!(user["status"], "ACTIVE");
        assert_eq!(user["created_at"], user["updated_at"]);
        assert_eq!(location, format!("/api/v1/users/{}", user["id"].as_str().unwrap()));

        let (status, fetched) = call(&app, Method::GET, &location, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, user);
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request() {
        let app = app();
        let (status, err) = call(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(json!({"name": "A", "email": "nope", "phone_number": "+1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["status"], 400);
        assert_eq!(err["error"], "Bad Request");
        assert!(err["message"].as_str().unwrap().contains("email: Invalid email address."));

        let missing_fields = Some(json!({"name": "Ana"}));
        let (status, _) = call(&app, Method::POST, "/api/v1/users", missing_fields).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, "/api/v1/users/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, "/api/v1/users?status=GONE", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, "/api/v1/users?size=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, "/api/v1/users?size=1000", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_is_conflict() {
        let app = app();
        let (status, _) = call(&app, Method::POST, "/api/v1/users", Some(ana())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, err) = call(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Ana Two",
                "email": "ana@x.com",
                "phone_number": "+10000000002"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["message"], "Email or phone number already in use.");
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = app();
        let uri = format!("/api/v1/users/{}", Uuid::new_v4());

        let (status, err) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["status"], 404);

        let (status, _) = call(&app, Method::PUT, &uri, Some(ana())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let role = Some(json!({"role": "ADMIN"}));
        let (status, _) = call(&app, Method::PATCH, &format!("{uri}/role"), role).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let user_status = Some(json!({"status": "INACTIVE"}));
        let (status, _) = call(&app, Method::PATCH, &format!("{uri}/status"), user_status).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[traced_test]
    async fn not_found_and_conflict_warn_once_each() {
        let app = app();
        let (status, _) = call(&app, Method::POST, "/api/v1/users", Some(ana())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, Method::POST, "/api/v1/users", Some(ana())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let uri = format!("/api/v1/users/{}/role", Uuid::new_v4());
        let (status, _) = call(&app, Method::PATCH, &uri, Some(json!({"role": "ADMIN"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        logs_assert(|lines: &[&str]| {
            let warns = lines.iter().filter(|line| line.contains("WARN")).count();
            match warns {
                2 => Ok(()),
                n => Err(format!("expected one warn line per failed request, got {n}")),
            }
        });
    }

    #[tokio::test]
    async fn full_lifecycle_over_http() {
        let app = app();
        let (_, ana) = call(&app, Method::POST, "/api/v1/users", Some(ana())).await;
        let id = ana["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/users/{id}");

        let (status, updated) = call(
            &app,
            Method::PUT,
            &uri,
            Some(json!({
                "name": "Ana Maria Li",
                "email": "ana@x.com",
                "phone_number": "+10000000001"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Ana Maria Li");
        assert_eq!(updated["created_at"], ana["created_at"]);

        let (status, admin) =
            call(&app, Method::PATCH, &format!("{uri}/role"), Some(json!({"role": "ADMIN"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(admin["role"], "ADMIN");

        let (status, _) =
            call(&app, Method::PATCH, &format!("{uri}/role"), Some(json!({"role": "ROOT"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let deactivate = Some(json!({"status": "INACTIVE"}));
        let (status, inactive) =
            call(&app, Method::PATCH, &format!("{uri}/status"), deactivate).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(inactive["status"], "INACTIVE");

        let (status, page) = call(&app, Method::GET, "/api/v1/users?status=INACTIVE", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_elements"], 1);
        assert_eq!(page["content"][0]["id"], id.as_str());

        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let app = app();
        let people = [
            ("Alice Smith", "alice@x.com", "+10000000001"),
            ("Bob Ray", "bob@alice.org", "+10000000002"),
            ("Carol Ng", "carol@x.com", "+10000000003"),
        ];
        for (name, email, phone) in people {
            let (status, _) = call(
                &app,
                Method::POST,
                "/api/v1/users",
                Some(json!({"name": name, "email": email, "phone_number": phone})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, page) = call(&app, Method::GET, "/api/v1/users", None).await;
        assert_eq!(page["total_elements"], 3);
        assert_eq!(page["size"], 10);
        assert_eq!(page["page"], 0);

        let (_, page) = call(&app, Method::GET, "/api/v1/users?search=Alice", None).await;
        assert_eq!(page["total_elements"], 2);

        let uri = "/api/v1/users?search=alice&role=ADMIN";
        let (_, page) = call(&app, Method::GET, uri, None).await;
        assert_eq!(page["total_elements"], 0);

        let (_, page) = call(&app, Method::GET, "/api/v1/users?page=1&size=2", None).await;
        assert_eq!(page["content"].as_array().unwrap().len(), 1);
        assert_eq!(page["total_pages"], 2);
    }
}
