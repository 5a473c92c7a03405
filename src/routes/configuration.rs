//! Catalog configuration route handlers
//!
//! Read endpoints for domains, data providers, clients, data assets and
//! their instances, plus the nested instance upsert.

use crate::auth::ServiceUser;
use crate::db::store::{get_or_404, PgCatalog};
use crate::error::{ApiResult, AppError, ErrorResponse};
use crate::models::{
    required_error, Client, DataAssetInstancePayload, DataAssetInstanceView, DataAssetView,
    DataProvider, Domain, FunctionMappingView, SftpSource,
};
use crate::pagination::{Page, PageParams};
use crate::routes::extract::{AppPath, AppQuery};
use crate::service;
use crate::state::SharedState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension, Json,
};
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// Form accepted by the upsert endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UpsertForm {
    /// JSON document describing the instance and its sub-resources
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

pub async fn welcome() -> &'static str {
    "Welcome to the frickin' Galactic Core."
}

/// List domains, newest first
#[utoipa::path(
    get,
    path = "/v1/domains/",
    tag = "domain",
    params(PageParams),
    responses(
        (status = 200, description = "One page of domains", body = Page<Domain>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    )
)]
pub async fn list_domains(
    State(state): State<SharedState>,
    AppQuery(params): AppQuery<PageParams>,
) -> ApiResult<Json<Page<Domain>>> {
    params.validate()?;
    let client = state.client().await?;
    let page = service::list_records::<Domain, _>(&mut PgCatalog::new(&**client), &params).await?;
    Ok(Json(page))
}

/// Get domain by id
#[utoipa::path(
    get,
    path = "/v1/domains/{id}",
    tag = "domain",
    params(("id" = i32, Path, description = "Domain id")),
    responses(
        (status = 200, description = "The domain", body = Domain),
        (status = 404, description = "No such domain", body = ErrorResponse),
    )
)]
pub async fn get_domain(State(state): State<SharedState>, AppPath(id): AppPath<i32>) -> ApiResult<Json<Domain>> {
    let client = state.client().await?;
    let domain = get_or_404(&mut PgCatalog::new(&**client), id).await?;
    Ok(Json(domain))
}

/// List data providers, newest first
#[utoipa::path(
    get,
    path = "/v1/data-providers/",
    tag = "data-provider",
    params(PageParams),
    responses(
        (status = 200, description = "One page of data providers", body = Page<DataProvider>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    )
)]
pub async fn list_data_providers(
    State(state): State<SharedState>,
    AppQuery(params): AppQuery<PageParams>,
) -> ApiResult<Json<Page<DataProvider>>> {
    params.validate()?;
    let client = state.client().await?;
    let page = service::list_records::<DataProvider, _>(&mut PgCatalog::new(&**client), &params).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/v1/data-providers/{id}",
    tag = "data-provider",
    params(("id" = i32, Path, description = "Data provider id")),
    responses(
        (status = 200, description = "The data provider", body = DataProvider),
        (status = 404, description = "No such data provider", body = ErrorResponse),
    )
)]
pub async fn get_data_provider(
    State(state): State<SharedState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<DataProvider>> {
    let client = state.client().await?;
    let provider = get_or_404(&mut PgCatalog::new(&**client), id).await?;
    Ok(Json(provider))
}

/// List clients, newest first
#[utoipa::path(
    get,
    path = "/v1/clients/",
    tag = "client",
    params(PageParams),
    responses(
        (status = 200, description = "One page of clients", body = Page<Client>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    )
)]
pub async fn list_clients(
    State(state): State<SharedState>,
    AppQuery(params): AppQuery<PageParams>,
) -> ApiResult<Json<Page<Client>>> {
    params.validate()?;
    let client = state.client().await?;
    let page = service::list_records::<Client, _>(&mut PgCatalog::new(&**client), &params).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/v1/clients/{id}",
    tag = "client",
    params(("id" = i32, Path, description = "Client id")),
    responses(
        (status = 200, description = "The client", body = Client),
        (status = 404, description = "No such client", body = ErrorResponse),
    )
)]
pub async fn get_client(State(state): State<SharedState>, AppPath(id): AppPath<i32>) -> ApiResult<Json<Client>> {
    let client = state.client().await?;
    let record = get_or_404(&mut PgCatalog::new(&**client), id).await?;
    Ok(Json(record))
}

/// List data assets, newest first, without their schemas
#[utoipa::path(
    get,
    path = "/v1/data-assets/",
    tag = "data-asset",
    params(PageParams),
    responses(
        (status = 200, description = "One page of data assets", body = Page<DataAssetView>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    )
)]
pub async fn list_data_assets(
    State(state): State<SharedState>,
    AppQuery(params): AppQuery<PageParams>,
) -> ApiResult<Json<Page<DataAssetView>>> {
    params.validate()?;
    let client = state.client().await?;
    let page = service::list_data_assets(&mut PgCatalog::new(&**client), &params).await?;
    Ok(Json(page))
}

/// Get data asset by id, schema included
#[utoipa::path(
    get,
    path = "/v1/data-assets/{id}",
    tag = "data-asset",
    params(("id" = i32, Path, description = "Data asset id")),
    responses(
        (status = 200, description = "The data asset", body = DataAssetView),
        (status = 404, description = "No such data asset", body = ErrorResponse),
    )
)]
pub async fn get_data_asset(
    State(state): State<SharedState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<DataAssetView>> {
    let client = state.client().await?;
    let view = service::get_data_asset(&mut PgCatalog::new(&**client), id).await?;
    Ok(Json(view))
}

/// List data asset instances, newest first
#[utoipa::path(
    get,
    path = "/v1/data-assets/instances/",
    tag = "data-asset",
    params(PageParams),
    responses(
        (status = 200, description = "One page of data asset instances", body = Page<DataAssetInstanceView>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    )
)]
pub async fn list_data_asset_instances(
    State(state): State<SharedState>,
    AppQuery(params): AppQuery<PageParams>,
) -> ApiResult<Json<Page<DataAssetInstanceView>>> {
    params.validate()?;
    let client = state.client().await?;
    let page = service::list_data_asset_instances(&mut PgCatalog::new(&**client), &params).await?;
    Ok(Json(page))
}

/// Get data asset instance by id with its file format, schema and ingest
#[utoipa::path(
    get,
    path = "/v1/data-assets/instances/{id}",
    tag = "data-asset",
    params(("id" = i32, Path, description = "Data asset instance id")),
    responses(
        (status = 200, description = "The data asset instance", body = DataAssetInstanceView),
        (status = 404, description = "No such data asset instance", body = ErrorResponse),
    )
)]
pub async fn get_data_asset_instance(
    State(state): State<SharedState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<DataAssetInstanceView>> {
    let client = state.client().await?;
    let view = service::get_data_asset_instance(&mut PgCatalog::new(&**client), id).await?;
    Ok(Json(view))
}

/// Source a data asset instance ingests from
#[utoipa::path(
    get,
    path = "/v1/data-assets/instances/{id}/source",
    tag = "data-asset",
    params(("id" = i32, Path, description = "Data asset instance id")),
    responses(
        (status = 200, description = "The SFTP source", body = SftpSource),
        (status = 404, description = "No such instance, or it has no source", body = ErrorResponse),
    )
)]
pub async fn get_data_asset_instance_source(
    State(state): State<SharedState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<SftpSource>> {
    let client = state.client().await?;
    let source = service::get_data_asset_instance_source(&mut PgCatalog::new(&**client), id).await?;
    Ok(Json(source))
}

/// List function mappings of an instance ordered by sequence number
#[utoipa::path(
    get,
    path = "/v1/data-assets/instances/{id}/functions",
    tag = "data-asset",
    params(("id" = i32, Path, description = "Data asset instance id"), PageParams),
    responses(
        (status = 200, description = "One page of function mappings", body = Page<FunctionMappingView>),
        (status = 404, description = "No such data asset instance", body = ErrorResponse),
    )
)]
pub async fn list_function_mappings(
    State(state): State<SharedState>,
    AppPath(id): AppPath<i32>,
    AppQuery(params): AppQuery<PageParams>,
) -> ApiResult<Json<Page<FunctionMappingView>>> {
    params.validate()?;
    let client = state.client().await?;
    let page = service::list_function_mappings(&mut PgCatalog::new(&**client), id, &params).await?;
    Ok(Json(page))
}

/// Create or update a data asset instance from an uploaded JSON document
///
/// Every sub-resource is upserted in one transaction.
#[utoipa::path(
    post,
    path = "/v1/data-assets/instances/upsert",
    tag = "data-asset",
    request_body(content = UpsertForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "The upserted instance", body = DataAssetInstanceView),
        (status = 400, description = "Unreadable or invalid document", body = ErrorResponse),
    )
)]
pub async fn upsert_data_asset_instance(
    State(state): State<SharedState>,
    Extension(user): Extension<ServiceUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DataAssetInstanceView>> {
    let payload = read_upload(&mut multipart?).await?;

    let mut client = state.client().await?;
    let tx = client.transaction().await?;
    let view = {
        let mut store = PgCatalog::new(&*tx);
        let instance = service::upsert_data_asset_instance(&mut store, payload).await?;
        service::get_data_asset_instance(&mut store, instance.id).await?
    };
    tx.commit().await?;

    info!(id = view.id, user = %user, "Data asset instance upsert committed");
    Ok(Json(view))
}

/// Pull the `file` field out of the form and parse it
async fn read_upload(multipart: &mut Multipart) -> ApiResult<DataAssetInstancePayload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            debug!(name = ?field.name(), "Skipping form field");
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return parse_document(&bytes);
    }

    let mut errors = ValidationErrors::new();
    errors.add("file", required_error());
    Err(errors.into())
}

fn parse_document(bytes: &[u8]) -> ApiResult<DataAssetInstancePayload> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::BadRequest("Please provide valid json file".to_string()))?;
    serde_json::from_str(text).map_err(|e| AppError::Validation(format!("Invalid document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::FromRequest;
    use axum::http::{header, Request, StatusCode};
    use axum::response::IntoResponse;
    use serde_json::Value;

    const BOUNDARY: &str = "galactic-boundary";

    const DOCUMENT: &str = r#"{
        "name": "claims_acme",
        "data_asset": {"name": "claims", "domain": {"name": "healthcare"}},
        "client": {"name": "acme"},
        "data_provider": {"name": "clearinghouse"}
    }"#;

    /// Multipart body with one part per `(name, content)`
    async fn form(parts: &[(&str, &str)]) -> Multipart {
        let mut body = String::new();
        for (name, content) in parts {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}.json\"\r\nContent-Type: application/json\r\n\r\n{}\r\n",
                BOUNDARY, name, name, content
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        let request = Request::post("/v1/data-assets/instances/upsert")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let mut multipart = form(&[("document", DOCUMENT)]).await;
        let response = read_upload(&mut multipart).await.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Validation Error");
        assert_eq!(body["error_details"]["file"][0]["code"], "required");
    }

    #[tokio::test]
    async fn test_upload_skips_other_fields() {
        let mut multipart = form(&[("notes", "not json at all"), ("file", DOCUMENT)]).await;
        let payload = read_upload(&mut multipart).await.unwrap();

        assert_eq!(payload.instance.name.as_deref(), Some("claims_acme"));
        assert_eq!(payload.client.name.as_deref(), Some("acme"));
    }

    #[test]
    fn test_missing_boundary_is_json_error() {
        let request = Request::post("/v1/data-assets/instances/upsert")
            .header(header::CONTENT_TYPE, "multipart/form-data")
            .body(Body::empty())
            .unwrap();
        let rejection = tokio_test::block_on(Multipart::from_request(request, &())).unwrap_err();
        let err = AppError::from(rejection);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_welcome() {
        assert_eq!(welcome().await, "Welcome to the frickin' Galactic Core.");
    }

    #[test]
    fn test_parse_document_rejects_non_utf8() {
        let err = parse_document(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Bad request: Please provide valid json file");
    }

    #[test]
    fn test_parse_document_rejects_bad_json() {
        let err = parse_document(b"{\"name\": ").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_document() {
        let payload = parse_document(DOCUMENT.as_bytes()).unwrap();

        assert_eq!(payload.instance.name.as_deref(), Some("claims_acme"));
        assert_eq!(payload.data_asset.domain.name.as_deref(), Some("healthcare"));
        assert!(payload.source.is_none());
    }
}
