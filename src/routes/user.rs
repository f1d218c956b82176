use crate::auth::AdminUser;
use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::user::SetActiveRequest;
use crate::service::auth::AuthService;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, routes};
use sqlx::PgPool;
use uuid::Uuid;

#[rocket::put("/<id>/active", data = "<payload>")]
pub async fn set_active(
    pool: &State<PgPool>,
    config: &State<Config>,
    _admin: AdminUser,
    id: &str,
    payload: Json<SetActiveRequest>,
) -> Result<Status, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let auth = AuthService::new(&repo, config.login_guard.clone());

    let user_id = Uuid::parse_str(id)?;
    auth.set_active(&user_id, payload.active).await?;

    Ok(Status::Ok)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![set_active]
}
