//! Admin API route handlers.
//!
//! All endpoints return JSON. State is the shared `Arc<Casino>`. Casino
//! calls block on locks and file IO, so handlers run them on tokio's
//! blocking pool.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::engine::Casino;
use crate::game::SessionSnapshot;
use crate::ledger::BalanceEntry;
use crate::loans::{BatchAccrualReport, LoanRecord};
use crate::types::{CasinoError, CasinoResult, UserId};

pub type AppState = Arc<Casino>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A domain error on its way to an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    Casino(CasinoError),
    /// The blocking task running the casino call died.
    Internal(String),
}

impl From<CasinoError> for ApiError {
    fn from(e: CasinoError) -> Self {
        Self::Casino(e)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Casino(CasinoError::StorageUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Casino(CasinoError::UnknownRequest(_) | CasinoError::NoActiveSession) => StatusCode::NOT_FOUND,
            Self::Casino(CasinoError::SessionAlreadyActive | CasinoError::RequestAlreadyFulfilled(_)) => {
                StatusCode::CONFLICT
            }
            Self::Casino(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Casino(e) => e.to_string(),
            Self::Internal(_) => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(reason) => error!(reason = %reason, "Admin API task failed"),
            Self::Casino(e) if status == StatusCode::SERVICE_UNAVAILABLE => {
                warn!(error = %e, "Admin API request hit unavailable storage")
            }
            Self::Casino(_) => {}
        }
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}

/// Run a casino call on the blocking pool.
async fn blocking<T, F>(casino: AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Casino) -> CasinoResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&casino)).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user: UserId,
    pub balance: Decimal,
    pub bet: Decimal,
    pub loan: LoanRecord,
    pub session: Option<SessionSnapshot>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/balances
pub async fn get_balances(State(casino): State<AppState>) -> Result<Json<Vec<BalanceEntry>>, ApiError> {
    Ok(Json(blocking(casino, |c| c.balances()).await?))
}

/// GET /api/users/:user
pub async fn get_user(
    State(casino): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = UserId::new(user);
    let summary = blocking(casino, move |c| {
        let session = match c.inspect(&user) {
            Ok(snapshot) => Some(snapshot),
            Err(CasinoError::NoActiveSession) => None,
            Err(e) => return Err(e),
        };
        Ok(UserSummary {
            balance: c.get_balance(&user)?,
            bet: c.get_bet(&user),
            loan: c.get_loan_info(&user)?,
            session,
            user,
        })
    })
    .await?;
    Ok(Json(summary))
}

/// POST /api/loans/accrue
pub async fn accrue_loans(State(casino): State<AppState>) -> Result<Json<BatchAccrualReport>, ApiError> {
    Ok(Json(blocking(casino, |c| c.accrue_all()).await?))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
