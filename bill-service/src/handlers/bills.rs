use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::bills::{
    BillRequest, BillResponse, ListBillsQuery, ListBillsResponse, NextNumberResponse,
    ResetCounterRequest, UpdateBillResponse, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use crate::middleware::AuthUser;
use crate::models::ListBillsFilter;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

/// Preview the number the caller's next bill will get.
pub async fn next_number(State(state): State<AppState>, user: AuthUser) -> impl IntoResponse {
    let bill_number = state.bills.allocator().peek_next(user.owner_id()).await;
    Json(NextNumberResponse {
        bill_number: bill_number.into_string(),
    })
}

pub async fn reset_counter(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<ResetCounterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let allocator = state.bills.allocator();
    allocator.reset(user.owner_id(), req.start_from).await?;
    let next = allocator.peek_next(user.owner_id()).await;
    Ok(Json(NextNumberResponse {
        bill_number: next.into_string(),
    }))
}

pub async fn create_bill(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<BillRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (draft, _) = req.into_draft()?;
    let bill = state.bills.create(user.owner_id(), draft).await?;
    Ok((StatusCode::CREATED, Json(BillResponse::from(bill))))
}

pub async fn list_bills(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListBillsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ListBillsFilter {
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset: query.offset.unwrap_or(0),
    };

    let bills: Vec<BillResponse> = state
        .bills
        .list(user.owner_id(), &filter)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ListBillsResponse {
        count: bills.len(),
        bills,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

pub async fn get_bill(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bill = state.bills.get(user.owner_id(), &bill_id).await?;
    Ok(Json(BillResponse::from(bill)))
}

/// Full update. `new_payment` in the body is added to the bill's accumulated
/// additional payment; it is not stored on its own.
pub async fn update_bill(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bill_id): Path<String>,
    ValidatedJson(req): ValidatedJson<BillRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (draft, new_payment) = req.into_draft()?;
    let (bill, applied) = state
        .bills
        .update(user.owner_id(), &bill_id, draft, new_payment)
        .await?;

    Ok(Json(UpdateBillResponse {
        bill: bill.into(),
        new_payment_applied: applied,
    }))
}

pub async fn delete_bill(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.bills.delete(user.owner_id(), &bill_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
