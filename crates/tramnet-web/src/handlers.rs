//! Request handlers. Each one opens the store on the blocking pool, does its
//! work through `tramnet_core`, and drops the connection before replying.

use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tramnet_core::db::{self, query};
use tramnet_core::error::NetworkError;
use tramnet_core::graph::{EdgeView, NodeView};
use tramnet_core::model::{Coordinate, Line, Stop, StopConnection, weekday_name};
use tramnet_core::ops::{self, NewConnection, NewStop};

use crate::AppState;
use crate::response::{ApiError, ApiResponse};

type ApiResult = Result<HttpResponse, ApiError>;

/// Run `work` against a freshly opened store on the blocking thread pool.
///
/// The database must already exist; requests never create one.
async fn with_store<F, R>(state: &web::Data<AppState>, work: F) -> Result<R, ApiError>
where
    F: FnOnce(&Connection) -> Result<R, ApiError> + Send + 'static,
    R: Send + 'static,
{
    let path = state.db_path.clone();
    web::block(move || {
        if !path.exists() {
            return Err(ApiError::NotInitialized(format!(
                "no network database at {}",
                path.display()
            )));
        }
        let conn = db::open_store(&path).map_err(|e| ApiError::Storage(format!("{e:#}")))?;
        work(&conn)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "tramnet",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Stops
// ---------------------------------------------------------------------------

pub async fn list_stops(state: web::Data<AppState>) -> ApiResult {
    let stops = with_store(&state, |conn| Ok(query::list_stops(conn)?)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stops)))
}

pub async fn stops_by_status(state: web::Data<AppState>) -> ApiResult {
    let split = with_store(&state, |conn| Ok(query::list_stops_by_status(conn)?)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(split)))
}

#[derive(Debug, Serialize)]
pub struct TrafficView {
    pub day: &'static str,
    pub hour: u8,
    pub congestion: f64,
}

#[derive(Debug, Serialize)]
pub struct StopDetail {
    pub info: Stop,
    pub lines: Vec<String>,
    pub connections: Vec<StopConnection>,
    pub traffic: Vec<TrafficView>,
}

pub async fn stop_detail(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let stop_id = path.into_inner();
    let detail = with_store(&state, move |conn| {
        let info = query::get_stop(conn, &stop_id)?
            .ok_or_else(|| ApiError::StopNotFound(stop_id.clone()))?;
        let traffic = query::traffic_for(conn, &stop_id)?
            .into_iter()
            .map(|sample| TrafficView {
                day: weekday_name(sample.day),
                hour: sample.hour,
                congestion: sample.congestion,
            })
            .collect();
        Ok(StopDetail {
            lines: query::lines_for_stop(conn, &stop_id)?,
            connections: query::connections_for_stop(conn, &stop_id)?,
            traffic,
            info,
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

/// `POST /api/stops` body. Coordinates may arrive as numbers or strings.
#[derive(Debug, Deserialize)]
pub struct AddStopRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default, alias = "lon")]
    pub lng: Option<Value>,
}

impl AddStopRequest {
    fn into_new_stop(self) -> Result<NewStop, NetworkError> {
        let lat = degrees("latitude", self.lat.as_ref())?;
        let lon = degrees("longitude", self.lng.as_ref())?;
        let coordinate = Coordinate::from_parts(lat, lon)?;
        let mut stop = NewStop::named(&self.name, coordinate);
        if let Some(id) = self.id.filter(|id| !id.trim().is_empty()) {
            stop.id = id.trim().to_string();
        }
        Ok(stop)
    }
}

fn degrees(field: &'static str, value: Option<&Value>) -> Result<Option<f64>, NetworkError> {
    let invalid = |raw: &dyn std::fmt::Display| NetworkError::Validation {
        field,
        reason: format!("'{raw}' is not a number"),
    };
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| invalid(n)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| invalid(s)),
        Some(other) => Err(invalid(other)),
    }
}

pub async fn add_stop(state: web::Data<AppState>, body: web::Json<AddStopRequest>) -> ApiResult {
    let new_stop = body.into_inner().into_new_stop()?;
    let stop = with_store(&state, move |conn| Ok(ops::add_stop(conn, &new_stop)?)).await?;
    let message = format!("Stop '{}' saved", stop.name);
    Ok(HttpResponse::Created().json(ApiResponse::with_message(stop, message)))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

pub async fn delete_stop(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let stop_id = path.into_inner();
    let deleted = with_store(&state, move |conn| Ok(ops::delete_stop(conn, &stop_id)?)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(Deleted { deleted })))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub active: bool,
}

pub async fn set_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> ApiResult {
    let stop_id = path.into_inner();
    let active = body.active;
    let stop = with_store(&state, move |conn| {
        ops::set_active(conn, &stop_id, active)?;
        query::get_stop(conn, &stop_id)?.ok_or(ApiError::StopNotFound(stop_id))
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stop)))
}

// ---------------------------------------------------------------------------
// Connections and lines
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ConnectionView {
    pub line: String,
    pub from: String,
    pub to: String,
    pub weight: u32,
    /// Both endpoints active.
    pub active: bool,
}

pub async fn list_connections(state: web::Data<AppState>) -> ApiResult {
    let views = with_store(&state, |conn| {
        let active: HashMap<String, bool> = query::list_stop_details(conn)?
            .into_iter()
            .map(|s| (s.id, s.active))
            .collect();
        let is_active = |id: &str| active.get(id).copied().unwrap_or(false);
        Ok(query::list_connections(conn, false)?
            .into_iter()
            .map(|c| ConnectionView {
                active: is_active(&c.from) && is_active(&c.to),
                line: c.line,
                from: c.from,
                to: c.to,
                weight: c.weight,
            })
            .collect::<Vec<_>>())
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(views)))
}

pub async fn add_connection(
    state: web::Data<AppState>,
    body: web::Json<NewConnection>,
) -> ApiResult {
    let new = body.into_inner();
    let message = format!("Connected {} and {}", new.from, new.to);
    with_store(&state, move |conn| Ok(ops::add_connection(conn, &new)?)).await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message((), message)))
}

#[derive(Debug, Deserialize)]
pub struct StopPairRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub removed: usize,
}

pub async fn delete_connection(
    state: web::Data<AppState>,
    body: web::Json<StopPairRequest>,
) -> ApiResult {
    let StopPairRequest { from, to } = body.into_inner();
    let removed = with_store(&state, move |conn| Ok(ops::delete_connection(conn, &from, &to)?)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(Removed { removed })))
}

pub async fn list_lines(state: web::Data<AppState>) -> ApiResult {
    let lines: Vec<Line> = with_store(&state, |conn| Ok(query::list_lines(conn)?)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(lines)))
}

// ---------------------------------------------------------------------------
// Routing and network views
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ShortestPathRequest {
    #[serde(alias = "start")]
    pub start_id: String,
    #[serde(alias = "end")]
    pub end_id: String,
}

#[derive(Debug, Serialize)]
pub struct ShortestPathResponse {
    pub path: Vec<String>,
    pub ids: Vec<String>,
    pub duration: String,
    pub total_minutes: u64,
}

pub async fn shortest_path(
    state: web::Data<AppState>,
    body: web::Json<ShortestPathRequest>,
) -> ApiResult {
    let ShortestPathRequest { start_id, end_id } = body.into_inner();
    let route = with_store(&state, move |conn| {
        ops::find_route(conn, &start_id, &end_id)?.map_err(ApiError::from)
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ShortestPathResponse {
        path: route.names().into_iter().map(str::to_string).collect(),
        ids: route.ids().into_iter().map(str::to_string).collect(),
        duration: route.duration_label(),
        total_minutes: route.total_minutes,
    })))
}

#[derive(Debug, Serialize)]
pub struct NetworkGraphResponse {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub fingerprint: String,
}

pub async fn network_graph(state: web::Data<AppState>) -> ApiResult {
    let (view, fingerprint) = with_store(&state, |conn| Ok(ops::network_view(conn)?)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(NetworkGraphResponse {
        nodes: view.nodes,
        edges: view.edges,
        fingerprint,
    })))
}

pub async fn stats(state: web::Data<AppState>) -> ApiResult {
    let stats = with_store(&state, |conn| Ok(query::network_stats(conn)?)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_accepts_numbers_and_numeric_strings() {
        assert_eq!(degrees("latitude", None).expect("none"), None);
        assert_eq!(
            degrees("latitude", Some(&serde_json::json!(50.5))).expect("number"),
            Some(50.5)
        );
        assert_eq!(
            degrees("latitude", Some(&serde_json::json!(" 19.25 "))).expect("string"),
            Some(19.25)
        );
        assert_eq!(degrees("latitude", Some(&serde_json::json!(""))).expect("blank"), None);
        assert!(degrees("latitude", Some(&serde_json::json!("north"))).is_err());
        assert!(degrees("latitude", Some(&serde_json::json!([1]))).is_err());
    }

    #[test]
    fn add_stop_request_derives_id_from_name() {
        let request = AddStopRequest {
            id: None,
            name: "Teatr Bagatela".into(),
            lat: Some(serde_json::json!("50.06")),
            lng: Some(serde_json::json!(19.93)),
        };
        let stop = request.into_new_stop().expect("valid");
        assert_eq!(stop.id, "TEATR BAGATELA");
        assert!(stop.coordinate.is_some());
    }

    #[test]
    fn add_stop_request_rejects_half_a_coordinate() {
        let request = AddStopRequest {
            id: Some("X".into()),
            name: "X".into(),
            lat: Some(serde_json::json!(50.0)),
            lng: None,
        };
        assert!(matches!(
            request.into_new_stop(),
            Err(NetworkError::Validation { .. })
        ));
    }
}
