//! `/REST`：与消息通道语义相同的 HTTP 接口

use crate::backend::BackendHandle;
use crate::channel::Channel;
use crate::error::DeckError;
use crate::model::{
    CapabilityKind, DeleteDeviceResponse, DeletePageResponse, Device, DeviceId, NewDeviceParams,
    Page, PageId, SelectableOption, UpdateDeviceParams, UpdatePagesParams, UpdateParams,
    UpdateResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::warn;

pub fn router(backend: BackendHandle) -> Router {
    Router::new()
        .route("/devices/", get(get_devices).put(add_device))
        .route("/devices/name/", put(update_device_name))
        .route("/devices/:id", delete(delete_device))
        .route("/pages/", get(get_pages))
        .route("/pages/:param", post(add_page).put(update_pages).delete(delete_page))
        .route("/deviceOptions/:kind", get(get_device_options))
        .layer(CorsLayer::permissive())
        .with_state(backend)
}

pub enum RestError {
    BadRequest(String),
    Backend(DeckError),
}

impl From<DeckError> for RestError {
    fn from(e: DeckError) -> Self {
        RestError::Backend(e)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        match self {
            RestError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            RestError::Backend(DeckError::Remote(message)) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            RestError::Backend(e) => {
                warn!("REST request failed: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
            }
        }
    }
}

type RestResult<T> = std::result::Result<Json<T>, RestError>;

fn parse<T: std::str::FromStr>(segment: &str, what: &str) -> Result<T, RestError> {
    segment
        .parse()
        .map_err(|_| RestError::BadRequest(format!("Invalid {}: {}", what, segment)))
}

async fn get_devices(State(backend): State<BackendHandle>) -> RestResult<Vec<Device>> {
    Ok(Json(backend.query(Channel::DevicesGet).await?))
}

async fn add_device(
    State(backend): State<BackendHandle>,
    Json(params): Json<NewDeviceParams>,
) -> RestResult<UpdateResponse> {
    let success = backend.execute(Channel::DevicesAdd, &params).await?;
    Ok(Json(UpdateResponse { success }))
}

async fn delete_device(
    State(backend): State<BackendHandle>,
    Path(id): Path<String>,
) -> RestResult<DeleteDeviceResponse> {
    let id: DeviceId = parse(&id, "device id")?;
    let success = backend.execute(Channel::DevicesDelete, &id).await?;
    Ok(Json(DeleteDeviceResponse { deleted_device_id: id, success }))
}

async fn update_device_name(
    State(backend): State<BackendHandle>,
    Json(params): Json<UpdateDeviceParams>,
) -> RestResult<UpdateResponse> {
    let success = backend.execute(Channel::DevicesUpdate, &params).await?;
    Ok(Json(UpdateResponse { success }))
}

async fn get_pages(State(backend): State<BackendHandle>) -> RestResult<Vec<Page>> {
    Ok(Json(backend.query(Channel::PagesGet).await?))
}

async fn add_page(
    State(backend): State<BackendHandle>,
    Path(device_id): Path<String>,
) -> RestResult<UpdateResponse> {
    let device_id: DeviceId = parse(&device_id, "device id")?;
    let success = backend.execute(Channel::PagesAdd, &device_id).await?;
    Ok(Json(UpdateResponse { success }))
}

async fn delete_page(
    State(backend): State<BackendHandle>,
    Path(id): Path<String>,
) -> RestResult<DeletePageResponse> {
    let id: PageId = parse(&id, "page id")?;
    let success = backend.execute(Channel::PagesDelete, &id).await?;
    Ok(Json(DeletePageResponse { deleted_page_id: id, success }))
}

async fn update_pages(
    State(backend): State<BackendHandle>,
    Path(field): Path<String>,
    Json(update): Json<UpdateParams>,
) -> RestResult<UpdateResponse> {
    let field: CapabilityKind = parse(&field, "page field")?;
    let params = UpdatePagesParams { field, update };
    let success = backend.execute(Channel::PagesUpdate, &params).await?;
    Ok(Json(UpdateResponse { success }))
}

async fn get_device_options(
    State(backend): State<BackendHandle>,
    Path(kind): Path<String>,
) -> RestResult<Vec<SelectableOption>> {
    let kind: CapabilityKind = parse(&kind, "capability kind")?;
    Ok(Json(backend.execute(Channel::DevicesCapabilities, &kind).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Api, Backend};
    use crate::repository::{Capabilities, Data};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Backend::spawn(Api::new(Data::seeded(), Capabilities::new())))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn call_json<T: DeserializeOwned>(app: &Router, method: Method, uri: &str, body: Option<Value>) -> T {
        let (status, bytes) = call(app, method, uri, body).await;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&bytes));
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_devices_and_pages() {
        let app = app();
        let devices: Vec<Device> = call_json(&app, Method::GET, "/devices/", None).await;
        let pages: Vec<Page> = call_json(&app, Method::GET, "/pages/", None).await;

        assert_eq!(devices.len(), 2);
        assert_eq!(pages.len(), 4);
    }

    #[tokio::test]
    async fn test_put_device_then_rename() {
        let app = app();
        let added: UpdateResponse = call_json(&app, Method::PUT, "/devices/", Some(json!({ "name": "X" }))).await;
        assert!(added.success);

        let renamed: UpdateResponse = call_json(
            &app,
            Method::PUT,
            "/devices/name/",
            Some(json!({ "id": 3, "newValue": "Y" })),
        )
        .await;
        assert!(renamed.success);

        let devices: Vec<Device> = call_json(&app, Method::GET, "/devices/", None).await;
        assert!(devices.contains(&Device { id: 3, name: "Y".into() }));
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let app = app();
        let deleted: DeleteDeviceResponse = call_json(&app, Method::DELETE, "/devices/1", None).await;
        assert_eq!(deleted, DeleteDeviceResponse { deleted_device_id: 1, success: true });

        let missing: DeletePageResponse = call_json(&app, Method::DELETE, "/pages/1000", None).await;
        assert_eq!(missing, DeletePageResponse { deleted_page_id: 1000, success: false });
    }

    #[tokio::test]
    async fn test_add_and_update_pages() {
        let app = app();
        let added: UpdateResponse = call_json(&app, Method::POST, "/pages/2", None).await;
        assert!(added.success);

        let updated: UpdateResponse = call_json(
            &app,
            Method::PUT,
            "/pages/mediaType",
            Some(json!({ "pages": [1, 5], "newValue": "glossy" })),
        )
        .await;
        assert!(updated.success);

        let pages: Vec<Page> = call_json(&app, Method::GET, "/pages/", None).await;
        let glossy: Vec<_> = pages.iter().filter(|p| p.media_type == "glossy").map(|p| p.id).collect();
        assert_eq!(glossy, vec![1, 5]);
    }

    #[tokio::test]
    async fn test_device_options() {
        let app = app();
        let options: Vec<SelectableOption> = call_json(&app, Method::GET, "/deviceOptions/destination", None).await;
        assert!(options.iter().any(|o| o.value == "basket"));
    }

    #[tokio::test]
    async fn test_unknown_segments_are_bad_requests() {
        let app = app();
        let (status, _) = call(&app, Method::GET, "/deviceOptions/colour", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::PUT, "/pages/colour", Some(json!({ "pages": [1], "newValue": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::DELETE, "/devices/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
