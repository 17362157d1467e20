//! # API REST
//!
//! REST API implementation for the patient record management service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, status-code mapping, CORS)
//!
//! Record operations live in `prms-core`; this crate only translates HTTP
//! requests into service calls and service results into responses.

#![warn(rust_2018_idioms)]

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use prms_core::{
    Collection, NewPatient, PatientError, PatientService, RecordPatch, SortKey, SortOrder,
};

/// Application state shared across REST API handlers
///
/// Contains shared state that needs to be accessible to all request handlers,
/// currently the PatientService instance for record operations.
#[derive(Clone)]
pub struct AppState {
    pub patient_service: Arc<PatientService>,
}

/// Acknowledgement payload returned by the informational and mutating
/// endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

/// Error payload returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

/// Wrapper translating core errors into HTTP responses.
///
/// Storage failures are logged with their cause and surfaced as a generic
/// 500; everything else maps onto the documented client-error codes.
pub struct ApiError(PatientError);

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            PatientError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("{field}: {message}"),
            ),
            PatientError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "patient not found".to_string())
            }
            PatientError::AlreadyExists(_) => {
                (StatusCode::BAD_REQUEST, "patient already exists".to_string())
            }
            PatientError::InvalidQuery(message) => (StatusCode::BAD_REQUEST, message.clone()),
            PatientError::FileRead(_)
            | PatientError::FileWrite(_)
            | PatientError::Serialization(_)
            | PatientError::Deserialization(_) => {
                tracing::error!("storage error: {:?}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
        };
        (status, Json(ErrorRes { detail })).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        home,
        about,
        view,
        view_patient,
        sort_patients,
        create_patient,
        update_patient,
        delete_patient,
    ),
    components(schemas(
        MessageRes,
        ErrorRes,
        prms_core::NewPatient,
        prms_core::RecordPatch,
        prms_core::PatientRecord,
        prms_core::Gender,
        prms_core::Verdict,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with all routes, documentation, and middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/view", get(view))
        .route("/patient/:id", get(view_patient))
        .route("/sort", get(sort_patients))
        .route("/create", post(create_patient))
        .route("/edit/:id", put(update_patient))
        .route("/delete/:id", delete(delete_patient))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = MessageRes)
    )
)]
/// Service banner endpoint
#[axum::debug_handler]
async fn home() -> Json<MessageRes> {
    Json(MessageRes {
        message: "Patient Record Management API".into(),
    })
}

#[utoipa::path(
    get,
    path = "/about",
    responses(
        (status = 200, description = "Service description", body = MessageRes)
    )
)]
/// Service description endpoint
#[axum::debug_handler]
async fn about() -> Json<MessageRes> {
    Json(MessageRes {
        message: "A fully functional API to manage your patient records".into(),
    })
}

#[utoipa::path(
    get,
    path = "/view",
    responses(
        (status = 200, description = "Full patient collection keyed by id"),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// View the full patient collection
///
/// Returns the persisted collection unmodified: a JSON object keyed by
/// patient id.
///
/// # Errors
/// Returns `500 Internal Server Error` if the backing file cannot be read.
#[axum::debug_handler]
async fn view(State(state): State<AppState>) -> Result<Json<Collection>, ApiError> {
    Ok(Json(state.patient_service.view_all()?))
}

#[utoipa::path(
    get,
    path = "/patient/{id}",
    responses(
        (status = 200, description = "Stored record for the patient", body = prms_core::PatientRecord),
        (status = 404, description = "Unknown patient id", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// View a single patient record
///
/// Looks up the record stored under the given id. The id itself is the
/// collection key and does not appear inside the returned object.
///
/// # Errors
/// Returns `404 Not Found` if the id is absent.
#[axum::debug_handler]
async fn view_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.patient_service.view_one(&id)?))
}

/// Query parameters accepted by the sort endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SortParams {
    /// Field to order by: height, weight or bmi
    pub sort_by: String,
    /// Direction: asc (default) or desc
    pub order: Option<String>,
}

#[utoipa::path(
    get,
    path = "/sort",
    params(SortParams),
    responses(
        (status = 200, description = "Records ordered by the chosen field"),
        (status = 400, description = "Invalid sort_by or order", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// List records ordered by height, weight, or bmi
///
/// The sort is stable; records with equal field values keep their creation
/// order.
///
/// # Errors
/// Returns `400 Bad Request` if `sort_by` is not one of height/weight/bmi or
/// `order` is not asc/desc.
#[axum::debug_handler]
async fn sort_patients(
    State(state): State<AppState>,
    Query(params): Query<SortParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let sort_by: SortKey = params.sort_by.parse()?;
    let order = match params.order.as_deref() {
        Some(raw) => raw.parse()?,
        None => SortOrder::default(),
    };
    Ok(Json(state.patient_service.sorted(sort_by, order)?))
}

#[utoipa::path(
    post,
    path = "/create",
    request_body = prms_core::NewPatient,
    responses(
        (status = 201, description = "Patient created", body = MessageRes),
        (status = 400, description = "Patient id already exists", body = ErrorRes),
        (status = 422, description = "Validation failure", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Create a new patient record
///
/// Validates the payload, computes the derived bmi/verdict fields, and
/// persists the whole collection.
///
/// # Errors
/// Returns `400 Bad Request` if the id is already taken, or
/// `422 Unprocessable Entity` if a field invariant is violated.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<NewPatient>,
) -> Result<(StatusCode, Json<MessageRes>), ApiError> {
    state.patient_service.create(req)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageRes {
            message: "patient created successfully".into(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/edit/{id}",
    request_body = prms_core::RecordPatch,
    responses(
        (status = 200, description = "Patient updated", body = MessageRes),
        (status = 404, description = "Unknown patient id", body = ErrorRes),
        (status = 422, description = "Validation failure on the merged record", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Update an existing patient record with a partial patch
///
/// Fields absent from the patch are left untouched; the merged record is
/// re-validated as a whole, which recomputes bmi and verdict.
///
/// # Errors
/// Returns `404 Not Found` if the id is absent, or `422 Unprocessable
/// Entity` if the merged record violates a field invariant.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<MessageRes>, ApiError> {
    state.patient_service.update(&id, patch)?;
    Ok(Json(MessageRes {
        message: "patient updated successfully".into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/delete/{id}",
    responses(
        (status = 200, description = "Patient deleted", body = MessageRes),
        (status = 404, description = "Unknown patient id", body = ErrorRes),
        (status = 500, description = "Storage failure", body = ErrorRes)
    )
)]
/// Delete a patient record
///
/// # Errors
/// Returns `404 Not Found` if the id is absent.
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<MessageRes>, ApiError> {
    state.patient_service.delete(&id)?;
    Ok(Json(MessageRes {
        message: "patient deleted successfully".into(),
    }))
}
