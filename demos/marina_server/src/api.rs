//! JSON API over the registry and ledger
//!
//! Every storage call runs on the blocking pool; the store itself is
//! synchronous and serializes same-berth writers internally.

use crate::auth::{AuthError, Claims, Role, TokenSigner};
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use marina_core::{
    parse_instant, CatwayNumber, CatwayPatch, CatwayState, CatwayType, NewReservation,
    ReservationId, ReservationPatch,
};
use marina_db::Store;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// State shared across all connections
pub struct AppState {
    pub store: Arc<Store>,
    pub signer: TokenSigner,
}

/// A matched API path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Info,
    Catways,
    Catway(String),
    Reservations(String),
    Reservation(String, String),
    Active(String),
}

impl Route {
    /// Match a request path; `None` for anything outside the API
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path
            .trim_end_matches('/')
            .split('/')
            .skip(1)
            .collect();
        match segments.as_slice() {
            ["api"] => Some(Route::Info),
            ["api", "catways"] => Some(Route::Catways),
            ["api", "catways", n] => Some(Route::Catway(n.to_string())),
            ["api", "catways", n, "reservations"] => Some(Route::Reservations(n.to_string())),
            ["api", "catways", n, "reservations", id] => {
                Some(Route::Reservation(n.to_string(), id.to_string()))
            }
            ["api", "catways", n, "active"] => Some(Route::Active(n.to_string())),
            _ => None,
        }
    }
}

/// Failure of a request, rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    Db(marina_db::Error),
    Auth(AuthError),
    Forbidden,
    BadRequest(String),
    NotFound(String),
    MethodNotAllowed,
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Db(err) => match err {
                marina_db::Error::NotFound(_) => StatusCode::NOT_FOUND,
                marina_db::Error::Conflict { .. } | marina_db::Error::DuplicateKey(_) => {
                    StatusCode::CONFLICT
                }
                marina_db::Error::InvalidEnum { .. }
                | marina_db::Error::InvalidInterval { .. }
                | marina_db::Error::InvalidField(_) => StatusCode::BAD_REQUEST,
                marina_db::Error::Database(_) | marina_db::Error::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        let body = match &self {
            ApiError::Db(marina_db::Error::Conflict {
                catway,
                existing,
                start,
                end,
            }) => json!({
                "error": self.message(),
                "conflict": {
                    "catwayNumber": catway,
                    "reservationId": existing,
                    "startDate": start,
                    "endDate": end,
                }
            }),
            _ => json!({ "error": self.message() }),
        };
        json_response(status, &body)
    }

    fn message(&self) -> String {
        match self {
            ApiError::Db(err) if err.is_internal() => "internal storage error".to_string(),
            ApiError::Db(err) => err.to_string(),
            ApiError::Auth(err) => err.to_string(),
            ApiError::Forbidden => "admin role required".to_string(),
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.clone(),
            ApiError::MethodNotAllowed => "method not allowed".to_string(),
            ApiError::Internal(_) => "internal error".to_string(),
        }
    }
}

impl From<marina_db::Error> for ApiError {
    fn from(err: marina_db::Error) -> Self {
        ApiError::Db(err)
    }
}

impl From<marina_core::Error> for ApiError {
    fn from(err: marina_core::Error) -> Self {
        ApiError::Db(err.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

/// Serialize `value` as the JSON body of a response
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value)
        .unwrap_or_else(|_| br#"{"error":"response encoding failed"}"#.to_vec());
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// hyper entry point: collect the body and dispatch
pub async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(dispatch(&state, &parts.method, &parts.uri, &parts.headers, body).await)
}

/// Route one request and render the outcome
pub async fn dispatch(
    state: &Arc<AppState>,
    method: &Method,
    uri: &hyper::Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let result = match Route::parse(uri.path()) {
        Some(route) => route_request(state, method, route, uri.query(), headers, body).await,
        None => Err(ApiError::NotFound(format!("no route for {}", uri.path()))),
    };

    match result {
        Ok(response) => {
            debug!(%method, path = uri.path(), status = response.status().as_u16(), "request");
            response
        }
        Err(err) => {
            let status = err.status();
            match &err {
                ApiError::Db(inner) if inner.is_internal() => {
                    error!(%method, path = uri.path(), error = %inner, "storage failure")
                }
                ApiError::Internal(msg) => {
                    error!(%method, path = uri.path(), error = %msg, "internal failure")
                }
                _ => debug!(
                    %method,
                    path = uri.path(),
                    status = status.as_u16(),
                    error = %err.message(),
                    "request rejected"
                ),
            }
            err.into_response()
        }
    }
}

async fn route_request(
    state: &Arc<AppState>,
    method: &Method,
    route: Route,
    query: Option<&str>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response<Full<Bytes>>, ApiError> {
    match (method, route) {
        (&Method::GET, Route::Info) => info(state).await,

        (&Method::GET, Route::Catways) => {
            let catways = blocking(state, |store| store.registry().list()).await?;
            Ok(json_response(StatusCode::OK, &catways))
        }
        (&Method::POST, Route::Catways) => {
            require_admin(state, headers)?;
            create_catway(state, &body).await
        }

        (&Method::GET, Route::Catway(n)) => {
            let number = parse_number(&n)?;
            let catway = blocking(state, move |store| store.registry().get(number)).await?;
            Ok(json_response(StatusCode::OK, &catway))
        }
        (&Method::PUT, Route::Catway(n)) => {
            require_admin(state, headers)?;
            update_catway(state, parse_number(&n)?, &body).await
        }
        (&Method::DELETE, Route::Catway(n)) => {
            require_admin(state, headers)?;
            let number = parse_number(&n)?;
            let removed = blocking(state, move |store| store.registry().delete(number)).await?;
            Ok(json_response(
                StatusCode::OK,
                &json!({ "catwayNumber": number, "reservationsRemoved": removed }),
            ))
        }

        (&Method::GET, Route::Reservations(n)) => {
            let number = parse_number(&n)?;
            let list = blocking(state, move |store| store.ledger().list_for_berth(number)).await?;
            Ok(json_response(StatusCode::OK, &list))
        }
        (&Method::POST, Route::Reservations(n)) => {
            require_user(state, headers)?;
            create_reservation(state, parse_number(&n)?, &body).await
        }

        (&Method::GET, Route::Reservation(n, id)) => {
            let number = parse_number(&n)?;
            let id = ReservationId::new(id);
            let rsvp = blocking(state, move |store| store.ledger().get(number, &id)).await?;
            Ok(json_response(StatusCode::OK, &rsvp))
        }
        (&Method::PUT, Route::Reservation(n, id)) => {
            require_user(state, headers)?;
            update_reservation(state, parse_number(&n)?, ReservationId::new(id), &body).await
        }
        (&Method::DELETE, Route::Reservation(n, id)) => {
            require_user(state, headers)?;
            let number = parse_number(&n)?;
            let id = ReservationId::new(id);
            blocking(state, move |store| store.ledger().delete(number, &id)).await?;
            Ok(empty_response(StatusCode::NO_CONTENT))
        }

        (&Method::GET, Route::Active(n)) => {
            let number = parse_number(&n)?;
            let at = match query_param(query, "at") {
                Some(raw) => parse_instant(&raw)?,
                None => Utc::now(),
            };
            let active = blocking(state, move |store| store.ledger().active_at(number, at)).await?;
            Ok(json_response(StatusCode::OK, &active))
        }

        _ => Err(ApiError::MethodNotAllowed),
    }
}

async fn info(state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError> {
    let (catways, reservations) = blocking(state, |store| store.counts()).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "name": "marina",
            "version": env!("CARGO_PKG_VERSION"),
            "catways": catways,
            "reservations": reservations,
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatwayBody {
    catway_number: Option<u32>,
    catway_type: Option<String>,
    catway_state: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReservationBody {
    client_name: Option<String>,
    boat_name: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn create_catway(
    state: &Arc<AppState>,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let body: CatwayBody = parse_body(body)?;
    let number = CatwayNumber::new(required("catwayNumber", body.catway_number)?)?;
    let catway_type: CatwayType = required("catwayType", body.catway_type)?.parse()?;
    let catway_state: CatwayState = match body.catway_state {
        Some(raw) => raw.parse()?,
        None => CatwayState::default(),
    };

    let catway = blocking(state, move |store| {
        store
            .registry()
            .create_with_state(number, catway_type, catway_state)
    })
    .await?;
    Ok(json_response(StatusCode::CREATED, &catway))
}

async fn update_catway(
    state: &Arc<AppState>,
    number: CatwayNumber,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let body: CatwayBody = parse_body(body)?;
    if body
        .catway_number
        .is_some_and(|requested| requested != number.raw())
    {
        return Err(ApiError::BadRequest(
            "catwayNumber cannot be changed".to_string(),
        ));
    }
    let patch = CatwayPatch::parse(body.catway_type.as_deref(), body.catway_state.as_deref())?;
    let catway = blocking(state, move |store| store.registry().update(number, patch)).await?;
    Ok(json_response(StatusCode::OK, &catway))
}

async fn create_reservation(
    state: &Arc<AppState>,
    number: CatwayNumber,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let body: ReservationBody = parse_body(body)?;
    let request = NewReservation::new(
        required("clientName", body.client_name)?,
        required("boatName", body.boat_name)?,
        parse_instant(&required("startDate", body.start_date)?)?,
        parse_instant(&required("endDate", body.end_date)?)?,
    );
    let rsvp = blocking(state, move |store| store.ledger().create(number, &request)).await?;
    Ok(json_response(StatusCode::CREATED, &rsvp))
}

async fn update_reservation(
    state: &Arc<AppState>,
    number: CatwayNumber,
    id: ReservationId,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let body: ReservationBody = parse_body(body)?;
    let patch = ReservationPatch {
        client_name: body.client_name,
        boat_name: body.boat_name,
        start_date: optional_instant(body.start_date)?,
        end_date: optional_instant(body.end_date)?,
    };
    let rsvp = blocking(state, move |store| store.ledger().update(number, &id, &patch)).await?;
    Ok(json_response(StatusCode::OK, &rsvp))
}

/// Run a store operation on the blocking pool
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> marina_db::Result<T> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn require_user(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    state.signer.verify_header(header).map_err(|err| {
        warn!(error = %err, "rejected credentials");
        ApiError::from(err)
    })
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let claims = require_user(state, headers)?;
    if claims.role != Role::Admin {
        warn!(subject = %claims.subject, "admin route refused");
        return Err(ApiError::Forbidden);
    }
    Ok(claims)
}

fn parse_number(raw: &str) -> Result<CatwayNumber, ApiError> {
    let value: u32 = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("'{}' is not a catway number", raw)))?;
    Ok(CatwayNumber::new(value)?)
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

fn optional_instant(raw: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    Ok(raw.as_deref().map(parse_instant).transpose()?)
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| percent_decode_str(v).decode_utf8_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        state: Arc<AppState>,
        admin: String,
        user: String,
    }

    impl Harness {
        fn new() -> Self {
            let signer = TokenSigner::new("test-secret", 3600);
            let admin = format!("Bearer {}", signer.issue(Role::Admin, "harbour-master"));
            let user = format!("Bearer {}", signer.issue(Role::User, "dupont"));
            Self {
                state: Arc::new(AppState {
                    store: Arc::new(Store::in_memory().unwrap()),
                    signer,
                }),
                admin,
                user,
            }
        }

        async fn call(
            &self,
            method: Method,
            path: &str,
            auth: Option<&str>,
            body: serde_json::Value,
        ) -> (StatusCode, serde_json::Value) {
            let uri: hyper::Uri = path.parse().unwrap();
            let mut headers = HeaderMap::new();
            if let Some(auth) = auth {
                headers.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
            }
            let body = Bytes::from(serde_json::to_vec(&body).unwrap());
            let response = dispatch(&self.state, &method, &uri, &headers, body).await;
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn add_catway(&self, number: u32) {
            let (status, _) = self
                .call(
                    Method::POST,
                    "/api/catways",
                    Some(&self.admin),
                    json!({ "catwayNumber": number, "catwayType": "long" }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        async fn book(&self, number: u32, start: &str, end: &str) -> (StatusCode, serde_json::Value) {
            self.call(
                Method::POST,
                &format!("/api/catways/{}/reservations", number),
                Some(&self.user),
                json!({
                    "clientName": "Dupont",
                    "boatName": "BlueSea",
                    "startDate": start,
                    "endDate": end,
                }),
            )
            .await
        }
    }

    #[test]
    fn test_route_parse() {
        assert_eq!(Route::parse("/api"), Some(Route::Info));
        assert_eq!(Route::parse("/api/catways/"), Some(Route::Catways));
        assert_eq!(
            Route::parse("/api/catways/3/reservations/abc"),
            Some(Route::Reservation("3".to_string(), "abc".to_string()))
        );
        assert_eq!(Route::parse("/index.html"), None);
        assert_eq!(Route::parse("/api/boats"), None);
    }

    #[tokio::test]
    async fn test_catway_lifecycle() {
        let h = Harness::new();
        h.add_catway(1).await;

        let (status, body) = h.call(Method::GET, "/api/catways/1", None, json!(null)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["catwayType"], "long");
        assert_eq!(body["catwayState"], "free");

        let (status, body) = h
            .call(
                Method::PUT,
                "/api/catways/1",
                Some(&h.admin),
                json!({ "catwayState": "maintenance" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["catwayState"], "maintenance");

        let (status, _) = h
            .call(
                Method::PUT,
                "/api/catways/1",
                Some(&h.admin),
                json!({ "catwayState": "sunk" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h
            .call(
                Method::POST,
                "/api/catways",
                Some(&h.admin),
                json!({ "catwayNumber": 1, "catwayType": "short" }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_auth_is_enforced() {
        let h = Harness::new();
        let body = json!({ "catwayNumber": 1, "catwayType": "long" });

        let (status, _) = h.call(Method::POST, "/api/catways", None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = h
            .call(Method::POST, "/api/catways", Some("Bearer nope"), body.clone())
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = h
            .call(Method::POST, "/api/catways", Some(&h.user), body)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_reservation_conflicts_map_to_409() {
        let h = Harness::new();
        h.add_catway(1).await;

        let (status, first) = h.book(1, "2025-01-01", "2025-01-05").await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = h.book(1, "2025-01-05", "2025-01-10").await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = h.book(1, "2025-01-03", "2025-01-04").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["conflict"]["reservationId"], first["id"]);

        let (status, _) = h.book(1, "2025-01-20", "2025-01-20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h.book(1, "demain", "2025-01-20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h.book(9, "2025-01-01", "2025-01-05").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, list) = h
            .call(Method::GET, "/api/catways/1/reservations", None, json!(null))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_reservation_update_and_delete() {
        let h = Harness::new();
        h.add_catway(2).await;
        let (_, rsvp) = h.book(2, "2025-03-01", "2025-03-05").await;
        let id = rsvp["id"].as_str().unwrap().to_string();
        let path = format!("/api/catways/2/reservations/{}", id);

        let (status, body) = h
            .call(
                Method::PUT,
                &path,
                Some(&h.user),
                json!({ "endDate": "2025-03-08" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endDate"], "2025-03-08T00:00:00Z");

        let (status, active) = h
            .call(
                Method::GET,
                "/api/catways/2/active?at=2025-03-07T12:00:00Z",
                None,
                json!(null),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(active["id"], id.as_str());

        let (status, _) = h.call(Method::DELETE, &path, Some(&h.user), json!(null)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = h.call(Method::GET, &path, None, json!(null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_catway_reports_cascade() {
        let h = Harness::new();
        h.add_catway(4).await;
        h.book(4, "2025-05-01", "2025-05-03").await;
        h.book(4, "2025-05-03", "2025-05-09").await;

        let (status, body) = h
            .call(Method::DELETE, "/api/catways/4", Some(&h.admin), json!(null))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reservationsRemoved"], 2);

        let (status, _) = h
            .call(Method::GET, "/api/catways/4/reservations", None, json!(null))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let h = Harness::new();
        let (status, body) = h.call(Method::GET, "/nowhere", None, json!(null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = h.call(Method::PATCH, "/api/catways", None, json!(null)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = h.call(Method::GET, "/api/catways/zero", None, json!(null)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
