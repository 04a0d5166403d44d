use actix_web::{get, post, web, HttpResponse, Responder};

use crate::{auth::AuthenticatedUser, error::AppError, models::PaymentInput, state::AppState};

/// Lists the authenticated user's payments in id order.
#[get("")]
pub async fn list_payments(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let payments = state.payments.list(user.id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

/// Records a payment for the authenticated user.
///
/// ## Request Body:
/// - `amount` (required): decimal number or string, at most two fractional digits.
/// - `description` (optional): up to 500 characters.
///
/// ## Responses:
/// - `201 Created`: the stored payment.
/// - `400 Bad Request`: missing or malformed amount, or description too long.
#[post("")]
pub async fn create_payment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payment: web::Json<PaymentInput>,
) -> Result<impl Responder, AppError> {
    let payment = state.payments.record(user.id, payment.into_inner()).await?;
    Ok(HttpResponse::Created().json(payment))
}
