// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface and production wiring.
//!
//! Three routes cover the engine's outer contracts: intake creates entries,
//! the cancellation hook triggers an offer round, and the claim route
//! resolves accept/decline tokens. Everything else in the platform (booking
//! CRUD, billing, admin screens) lives elsewhere and talks to these.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use waitline_config::WaitlineConfig;
use waitline_core::{
    BookingGateway, ClaimPolicy, ClaimRejection, EmailSender, FreedSlot, PolicyResolver,
    SmsSender, WaitlineError, WaitlistEntry, WaitlistOffer,
};
use waitline_engine::{
    ClaimAction, ClaimResolution, ClaimResolver, ClaimTokens, ExpirySweep, IntakeConfig,
    IntakeRequest, IntakeService, OfferConfig, OfferCoordinator, ResolverConfig, SweepConfig,
};
use waitline_notify::{DisabledEmail, DisabledSms, SmtpEmail, TwilioSms};
use waitline_storage::SqliteStore;

use crate::sweeper;

/// Everything the HTTP handlers need.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<OfferCoordinator>,
    pub resolver: Arc<ClaimResolver>,
    pub intake: Arc<IntakeService>,
}

/// Claim-expiry policy resolver backed by the `[[policies]]` config rules.
pub struct ConfigPolicies {
    default_policy: ClaimPolicy,
    rules: HashMap<(String, String), i64>,
}

impl ConfigPolicies {
    pub fn from_config(config: &WaitlineConfig) -> Self {
        Self {
            default_policy: ClaimPolicy {
                claim_expiry_minutes: config.waitlist.default_claim_expiry_minutes,
            },
            rules: config
                .policies
                .iter()
                .map(|rule| {
                    (
                        (rule.salon_id.clone(), rule.service_id.clone()),
                        rule.claim_expiry_minutes,
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl PolicyResolver for ConfigPolicies {
    async fn resolve_policy(
        &self,
        salon_id: &str,
        service_id: &str,
    ) -> Result<ClaimPolicy, WaitlineError> {
        let key = (salon_id.to_string(), service_id.to_string());
        Ok(self
            .rules
            .get(&key)
            .map(|&claim_expiry_minutes| ClaimPolicy {
                claim_expiry_minutes,
            })
            .unwrap_or(self.default_policy))
    }
}

/// Stand-in booking gateway minting opaque references.
// TODO: replace with the scheduler service client once its booking API
// stabilizes; the reference format is already compatible.
pub struct UuidBookings;

#[async_trait]
impl BookingGateway for UuidBookings {
    async fn create_booking(
        &self,
        _entry: &WaitlistEntry,
        _offer: &WaitlistOffer,
    ) -> Result<String, WaitlineError> {
        Ok(Uuid::new_v4().to_string())
    }
}

/// Production wiring: senders chosen from config.
pub fn build_state(
    config: &WaitlineConfig,
    store: Arc<SqliteStore>,
) -> Result<AppState, WaitlineError> {
    let sms: Arc<dyn SmsSender> = if config.sms.enabled {
        // Validation guarantees the credentials are present when enabled.
        Arc::new(
            TwilioSms::new(
                config.sms.account_sid.clone().unwrap_or_default(),
                config.sms.auth_token.clone().unwrap_or_default(),
                config.sms.from_number.clone().unwrap_or_default(),
            )
            .with_base_url(config.sms.api_base_url.clone()),
        )
    } else {
        Arc::new(DisabledSms)
    };

    let email: Arc<dyn EmailSender> = if config.email.enabled {
        Arc::new(SmtpEmail::new(
            config.email.smtp_host.as_deref().unwrap_or_default(),
            config.email.smtp_port,
            config.email.username.clone(),
            config.email.password.clone(),
            config.email.from_address.as_deref().unwrap_or_default(),
        )?)
    } else {
        Arc::new(DisabledEmail)
    };

    build_state_with_senders(config, store, sms, email)
}

/// Wiring with caller-supplied senders, shared with the end-to-end tests.
pub fn build_state_with_senders(
    config: &WaitlineConfig,
    store: Arc<SqliteStore>,
    sms: Arc<dyn SmsSender>,
    email: Arc<dyn EmailSender>,
) -> Result<AppState, WaitlineError> {
    let secret = config.claims.token_secret.clone().ok_or_else(|| {
        WaitlineError::Config("claims.token_secret is required to serve".to_string())
    })?;
    let tokens = ClaimTokens::new(secret);

    let policies = Arc::new(ConfigPolicies::from_config(config));
    let offer_config = OfferConfig {
        default_policy: ClaimPolicy {
            claim_expiry_minutes: config.waitlist.default_claim_expiry_minutes,
        },
        sms_timeout: std::time::Duration::from_secs(config.claims.sms_timeout_secs),
        email_timeout: std::time::Duration::from_secs(config.claims.email_timeout_secs),
        claim_base_url: config.claims.public_base_url.clone(),
    };

    let coordinator = Arc::new(OfferCoordinator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        policies,
        sms,
        email,
        tokens.clone(),
        offer_config,
    ));

    let resolver = Arc::new(ClaimResolver::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(UuidBookings),
        tokens,
        ResolverConfig {
            max_declines: config.waitlist.max_declines,
            decline_cooldown: Duration::minutes(config.waitlist.decline_cooldown_minutes),
        },
    ));

    let intake = Arc::new(IntakeService::new(
        store,
        IntakeConfig {
            rate_limit_per_hour: config.waitlist.intake_rate_limit_per_hour,
        },
    ));

    Ok(AppState {
        coordinator,
        resolver,
        intake,
    })
}

/// The service router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/salons/{salon_id}/waitlist", post(create_entry))
        .route("/v1/salons/{salon_id}/cancellations", post(slot_cancelled))
        .route("/v1/salons/{salon_id}/claim", get(resolve_claim))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP surface and the background sweep until ctrl-c.
pub async fn run(config: WaitlineConfig) -> Result<(), WaitlineError> {
    let store = SqliteStore::open(&config.storage.database_path).await?;
    let state = build_state(&config, store.clone())?;
    let router = build_router(state);

    let cancel = CancellationToken::new();
    let sweep = Arc::new(ExpirySweep::new(
        store.clone(),
        store.clone(),
        store,
        sweep_config(&config),
    ));
    let sweep_task = tokio::spawn(sweeper::run_loop(
        sweep,
        std::time::Duration::from_secs(config.waitlist.sweep_interval_secs),
        cancel.clone(),
    ));

    let addr = format!("{}:{}", config.service.bind_address, config.service.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WaitlineError::Config(format!("cannot bind {addr}: {e}")))?;
    info!(%addr, "waitline serving");

    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await
        .map_err(|e| WaitlineError::Internal(format!("server error: {e}")))?;

    cancel.cancel();
    let _ = sweep_task.await;
    Ok(())
}

pub fn sweep_config(config: &WaitlineConfig) -> SweepConfig {
    SweepConfig {
        batch_limit: config.waitlist.sweep_batch_limit,
        requeue_lapsed: config.waitlist.requeue_lapsed,
        lapse_cooldown: Duration::minutes(config.waitlist.lapse_cooldown_minutes),
        orphan_grace: Duration::minutes(config.waitlist.orphan_grace_minutes),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct IntakeBody {
    customer_id: String,
    display_name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    service_id: String,
    #[serde(default)]
    employee_id: Option<String>,
    preferred_date: String,
    preference_mode: String,
    #[serde(default)]
    preferred_time_start: Option<String>,
    #[serde(default)]
    preferred_time_end: Option<String>,
    #[serde(default)]
    flex_window_minutes: Option<i64>,
}

async fn create_entry(
    State(state): State<AppState>,
    Path(salon_id): Path<String>,
    Json(body): Json<IntakeBody>,
) -> Response {
    let request = IntakeRequest {
        salon_id,
        customer_id: body.customer_id,
        display_name: body.display_name,
        email: body.email,
        phone: body.phone,
        service_id: body.service_id,
        employee_id: body.employee_id,
        preferred_date: body.preferred_date,
        preference_mode: body.preference_mode,
        preferred_time_start: body.preferred_time_start,
        preferred_time_end: body.preferred_time_end,
        flex_window_minutes: body.flex_window_minutes,
    };
    match state.intake.submit(request).await {
        Ok(entry) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": entry.id,
                "status": entry.status,
                "priority_score": entry.priority_score_snapshot,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CancellationBody {
    service_id: String,
    #[serde(default)]
    employee_id: Option<String>,
    date: NaiveDate,
    start: DateTime<Utc>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
}

async fn slot_cancelled(
    State(state): State<AppState>,
    Path(salon_id): Path<String>,
    Json(body): Json<CancellationBody>,
) -> Response {
    let slot = FreedSlot {
        salon_id,
        service_id: body.service_id,
        employee_id: body.employee_id,
        date: body.date,
        start: body.start,
        end: body.end,
    };
    let outcome = state.coordinator.handle_cancellation(&slot).await;
    Json(serde_json::json!({
        "notified": outcome.notified,
        "entry_id": outcome.entry.map(|e| e.id),
        "error": outcome.error,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct ClaimQuery {
    action: String,
    token: String,
}

async fn resolve_claim(
    State(state): State<AppState>,
    Path(salon_id): Path<String>,
    Query(query): Query<ClaimQuery>,
) -> Response {
    let Ok(action) = query.action.parse::<ClaimAction>() else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "action must be `accept` or `decline`"})),
        )
            .into_response();
    };

    match state.resolver.resolve(&salon_id, &query.token, action).await {
        Ok(ClaimResolution::Accepted { booking_id, .. }) => Json(serde_json::json!({
            "result": "accepted",
            "booking_id": booking_id,
        }))
        .into_response(),
        Ok(ClaimResolution::DeclinedRequeued { cooldown_until }) => Json(serde_json::json!({
            "result": "declined",
            "requeued": true,
            "cooldown_until": cooldown_until,
        }))
        .into_response(),
        Ok(ClaimResolution::DeclinedExpired) => Json(serde_json::json!({
            "result": "declined",
            "requeued": false,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Map engine errors onto the outer contract's response shapes.
fn error_response(error: WaitlineError) -> Response {
    let (status, body) = match &error {
        WaitlineError::Validation(message) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            serde_json::json!({"error": message}),
        ),
        WaitlineError::Claim(ClaimRejection::NotFound) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({"error": "not_found"}),
        ),
        WaitlineError::Claim(ClaimRejection::AlreadyResolved { status }) => (
            StatusCode::CONFLICT,
            serde_json::json!({"error": "already_resolved", "status": status}),
        ),
        WaitlineError::Claim(ClaimRejection::Expired) => (
            StatusCode::GONE,
            serde_json::json!({"error": "expired"}),
        ),
        _ => {
            tracing::error!(error = %error, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": "internal error"}),
            )
        }
    };
    (status, Json(body)).into_response()
}
