use crate::application::{AlertService, SessionService};
use crate::infrastructure::{LocationRepository, LocationRepositoryTrait, SessionRepository, SessionRepositoryTrait};
use crate::interfaces::http::middleware::CronCaller;
use crate::shared::{AppError, BusinessId};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Clone)]
pub struct CronState {
    pub session_service: SessionService,
    pub location_repo: LocationRepository,
    pub session_repo: SessionRepository,
    pub alert_service: AlertService,
}

#[derive(Debug, Default, Serialize)]
pub struct EndOfDaySummary {
    pub locations_checked: usize,
    pub sessions_closed: usize,
}

/// §4.5 `AutoClose` end-of-day sweep. There is no single query across a
/// business's open sessions, so this walks every location and asks each
/// one whether it has a session still open — an external scheduler is
/// expected to call this once per business (§4.13 `CronConfig`).
pub async fn end_of_day_handler(
    _cron: CronCaller,
    State(state): State<CronState>,
    Path(business_id): Path<BusinessId>,
) -> Result<Json<EndOfDaySummary>, AppError> {
    let locations = state.location_repo.list_for_business(business_id).await?;
    let mut summary = EndOfDaySummary {
        locations_checked: locations.len(),
        sessions_closed: 0,
    };

    for location in locations {
        let Some(session) = state.session_repo.find_open_session_for_location(location.id).await? else {
            continue;
        };
        if state.session_service.auto_close(session.id).await?.is_some() {
            summary.sessions_closed += 1;
        }
    }

    Ok(Json(summary))
}

/// §4.9 scheduled alert sweep for one business.
pub async fn evaluate_alerts_handler(
    _cron: CronCaller,
    State(state): State<CronState>,
    Path(business_id): Path<BusinessId>,
) -> Result<Json<Vec<crate::domain::notification::Notification>>, AppError> {
    let dispatched = state.alert_service.evaluate_business(business_id).await?;
    Ok(Json(dispatched))
}
