//! Donation payment route.

use axum::{body::Bytes, extract::State, http::StatusCode};
use charity_yeti_core::{DonationRecord, PaymentAuthorizationRequest};
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Authorize a donation with the payment middleware and record it.
///
/// 1. Decode the body (400 on failure)
/// 2. Require a payment method nonce (400, no outbound call)
/// 3. Forward to the middleware (its status is mirrored on failure)
/// 4. Append the donation to the donor document
///
/// Responds 200 with an empty body once the donation is recorded.
#[instrument(
    skip(state, body),
    fields(
        donor_document_id = tracing::field::Empty,
        transaction_id = tracing::field::Empty
    )
)]
pub async fn authorize_payment(State(state): State<AppState>, body: Bytes) -> Result<StatusCode> {
    let request: PaymentAuthorizationRequest = serde_json::from_slice(&body)?;
    tracing::Span::current().record("donor_document_id", request.donor_document_id.as_str());

    request.validate()?;

    let transaction = state
        .middleware()
        .send_payment_authorization(&request)
        .await?;
    tracing::Span::current().record("transaction_id", transaction.id.as_str());

    let record = DonationRecord::from_charge(&request, &transaction, state.honorary());

    let donation_id = state
        .store()
        .append(&request.donor_document_id, &record)
        .await
        .map_err(|source| AppError::DonationNotRecorded {
            transaction_id: transaction.id.clone(),
            donor_document_id: request.donor_document_id.clone(),
            amount: transaction.amount.clone(),
            source,
        })?;

    info!(
        donation_id = %donation_id,
        amount = %transaction.amount,
        "Donation recorded"
    );

    Ok(StatusCode::OK)
}
