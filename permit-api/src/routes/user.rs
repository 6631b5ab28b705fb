/// Login, token refresh and user administration
///
/// # Endpoints
///
/// - `POST /user/login/` - Login and get tokens, roles and menu tree (public)
/// - `POST /user/refresh` - Refresh access token (public)
/// - `GET  /user/info` - Current user's profile, role codes and menu tree
/// - `POST /user/search` - Paginated user search
/// - `POST /user/save` - Create (no `id`) or update a user
/// - `POST /user/delete` - Delete a user
/// - `POST /user/resetPassword` - Replace a user's password
/// - `POST /user/status` - Enable or disable a user
/// - `GET  /user/getUserRoles?userId=` - Role IDs of a user
/// - `POST /user/assignRoles` - Replace a user's role set

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{DeleteRequest, SearchRequest},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use permit_shared::{
    auth::gate::AuthContext,
    models::user::{User, UserProfile, UserStatus},
    services::{
        auth::{CurrentUser, LoginOutcome},
        user::NewUser,
        AssignmentReport,
    },
    store::Page,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Create or update a user
///
/// Without `id` a new user is created and `username` and `password` are
/// required. With `id` the profile fields are replaced and `status` is
/// applied if given; username and password are left alone.
#[derive(Deserialize, Validate)]
pub struct SaveUserRequest {
    pub id: Option<i64>,

    #[validate(length(min = 1, max = 100, message = "Username must be 1 to 100 characters"))]
    pub username: Option<String>,

    pub password: Option<String>,

    pub status: Option<UserStatus>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "Avatar must be at most 255 characters"))]
    pub avatar: Option<String>,

    #[validate(length(max = 500, message = "Remark must be at most 500 characters"))]
    pub remark: Option<String>,
}

impl SaveUserRequest {
    fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            phone: self.phone.clone(),
            avatar: self.avatar.clone(),
            remark: self.remark.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub id: i64,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub id: i64,
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AssignRolesRequest {
    pub user_id: i64,

    /// Complete new role set; unknown IDs are skipped
    #[serde(default)]
    pub role_ids: Vec<i64>,
}

/// Login endpoint
///
/// ```text
/// POST /user/login/
/// Content-Type: application/json
///
/// { "username": "admin", "password": "..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown user, wrong password or disabled account,
///   all with the same message
/// - `422 Unprocessable Entity`: blank username or password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginOutcome>> {
    req.validate()?;

    let outcome = state.auth.login(&req.username, &req.password).await?;
    Ok(Json(outcome))
}

/// Exchanges a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(RefreshResponse { access_token }))
}

/// Profile, role codes and menu tree of the caller
pub async fn info(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CurrentUser>> {
    Ok(Json(state.auth.current_user(auth.user_id).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<Page<User>>> {
    req.validate()?;
    Ok(Json(state.users.search(&req.query, req.page()).await?))
}

pub async fn save(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SaveUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = match req.id {
        None => {
            let password = req
                .password
                .clone()
                .ok_or_else(|| ApiError::validation("password", "Password is required"))?;
            state
                .users
                .create(NewUser {
                    username: req.username.clone().unwrap_or_default(),
                    password,
                    status: req.status.unwrap_or(UserStatus::Enabled),
                    profile: req.profile(),
                })
                .await?
        }
        Some(id) => {
            state
                .users
                .update(auth.user_id, id, req.profile(), req.status)
                .await?
        }
    };

    Ok(Json(user))
}

/// Deletes a user; callers cannot delete themselves
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;
    state.users.delete(auth.user_id, req.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<StatusCode> {
    state.users.reset_password(req.id, &req.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.set_status(auth.user_id, req.id, req.status).await?))
}

pub async fn get_user_roles(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> ApiResult<Json<Vec<i64>>> {
    Ok(Json(state.users.role_ids(query.user_id).await?))
}

/// Replaces the user's role set and reports skipped IDs
pub async fn assign_roles(
    State(state): State<AppState>,
    Json(req): Json<AssignRolesRequest>,
) -> ApiResult<Json<AssignmentReport>> {
    Ok(Json(state.users.assign_roles(req.user_id, &req.role_ids).await?))
}
