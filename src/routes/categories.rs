use actix_web::{get, web, HttpResponse, Responder};

use crate::{auth::AuthenticatedUser, error::AppError, state::AppState};

/// Lists every category in id order.
#[get("")]
pub async fn list_categories(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let categories = state.categories.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}
