use crate::auth::{ClientIp, CurrentUser, UserAgent};
use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{ChangePasswordRequest, LoginRequest, ProfileUpdateRequest, RegisterRequest, UserResponse};
use crate::service::auth::AuthService;
use rocket::http::{Cookie, CookieJar, Status};
use rocket::serde::json::Json;
use rocket::{State, routes};
use sqlx::PgPool;
use validator::Validate;

fn set_user_cookie(cookies: &CookieJar<'_>, id: &uuid::Uuid, username: &str) {
    let value = format!("{}:{}", id, username);
    cookies.add_private(Cookie::build(("user", value)).path("/").build());
}

#[rocket::post("/register", data = "<payload>")]
pub async fn register(pool: &State<PgPool>, config: &State<Config>, payload: Json<RegisterRequest>) -> Result<(Status, Json<UserResponse>), AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let auth = AuthService::new(&repo, config.login_guard.clone());

    let user = auth.register(&payload).await?;
    Ok((Status::Created, Json(UserResponse::from(&user))))
}

#[rocket::post("/login", data = "<payload>")]
pub async fn login(
    pool: &State<PgPool>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    payload: Json<LoginRequest>,
) -> Result<Json<UserResponse>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository::new(pool.inner().clone());
    let auth = AuthService::new(&repo, config.login_guard.clone());

    let user = auth.authenticate(&payload.username, &payload.password, &client_ip.0, user_agent.0.as_deref()).await?;
    set_user_cookie(cookies, &user.id, &user.username);

    Ok(Json(UserResponse::from(&user)))
}

#[rocket::post("/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove_private(Cookie::build("user").build());
    Status::Ok
}

#[rocket::get("/profile")]
pub async fn get_profile(pool: &State<PgPool>, current_user: CurrentUser) -> Result<Json<UserResponse>, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let user = repo.find_user_by_id(&current_user.id).await?.ok_or(AppError::UserNotFound)?;

    Ok(Json(UserResponse::from(&user)))
}

#[rocket::put("/profile", data = "<payload>")]
pub async fn update_profile(
    pool: &State<PgPool>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    current_user: CurrentUser,
    payload: Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let auth = AuthService::new(&repo, config.login_guard.clone());

    let user = auth.update_profile(&current_user.id, &payload).await?;
    // The username is part of the session cookie; refresh it after an edit.
    set_user_cookie(cookies, &user.id, &user.username);

    Ok(Json(UserResponse::from(&user)))
}

#[rocket::post("/change-password", data = "<payload>")]
pub async fn change_password(
    pool: &State<PgPool>,
    config: &State<Config>,
    current_user: CurrentUser,
    payload: Json<ChangePasswordRequest>,
) -> Result<Status, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let auth = AuthService::new(&repo, config.login_guard.clone());

    auth.change_password(&current_user.id, &payload).await?;
    Ok(Status::Ok)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![register, login, logout, get_profile, update_profile, change_password]
}
