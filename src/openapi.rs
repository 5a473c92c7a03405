//! OpenAPI document for the catalog API

use crate::config::{AuthConfig, DocsConfig};
use utoipa::openapi::security::{
    ClientCredentials, Flow, OAuth2, Scopes, SecurityRequirement, SecurityScheme,
};
use utoipa::openapi::{Components, OpenApi as OpenApiDoc};
use utoipa::OpenApi;

/// Name of the OAuth2 security scheme
pub const SECURITY_SCHEME: &str = "AuthServer";

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::configuration::list_domains,
        crate::routes::configuration::get_domain,
        crate::routes::configuration::list_data_providers,
        crate::routes::configuration::get_data_provider,
        crate::routes::configuration::list_clients,
        crate::routes::configuration::get_client,
        crate::routes::configuration::list_data_assets,
        crate::routes::configuration::get_data_asset,
        crate::routes::configuration::list_data_asset_instances,
        crate::routes::configuration::get_data_asset_instance,
        crate::routes::configuration::get_data_asset_instance_source,
        crate::routes::configuration::list_function_mappings,
        crate::routes::configuration::upsert_data_asset_instance,
        crate::routes::metadata::create_pipeline_task,
        crate::routes::metadata::get_pipeline_task,
        crate::routes::metadata::update_pipeline_task,
    ),
    tags(
        (name = "domain", description = "Business domains"),
        (name = "data-provider", description = "Parties supplying data"),
        (name = "client", description = "Customers data is held for"),
        (name = "data-asset", description = "Data assets and their instances"),
        (name = "pipeline-task", description = "Pipeline execution log"),
    )
)]
pub struct ApiDoc;

/// Build the document, titled from config and secured when an issuer is known
pub fn openapi(docs: &DocsConfig, auth: &AuthConfig) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    doc.info.title = docs.title.clone();
    doc.info.version = docs.version.clone();

    if let Some(token_url) = auth.token_url() {
        let flow = Flow::ClientCredentials(ClientCredentials::new(token_url, Scopes::new()));
        doc.components
            .get_or_insert_with(Components::default)
            .add_security_scheme(SECURITY_SCHEME, SecurityScheme::OAuth2(OAuth2::new([flow])));
        doc.security = Some(vec![SecurityRequirement::new(
            SECURITY_SCHEME,
            Vec::<String>::new(),
        )]);
    }

    doc
}

/// Serialized document, or `None` when serving it is disabled
pub fn openapi_json(docs: &DocsConfig, auth: &AuthConfig) -> Result<Option<String>, serde_json::Error> {
    if !docs.enable_openapi {
        return Ok(None);
    }
    openapi(docs, auth).to_pretty_json().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::auth_config;
    use serde_json::Value;

    fn spec(issuer: Option<&str>) -> Value {
        let mut auth = auth_config("Bearer", &[]);
        auth.issuer = issuer.map(str::to_string);
        let docs = DocsConfig {
            title: "Catalog".to_string(),
            version: "2".to_string(),
            ..DocsConfig::default()
        };
        serde_json::to_value(openapi(&docs, &auth)).unwrap()
    }

    #[test]
    fn test_info_from_config() {
        let spec = spec(None);
        assert_eq!(spec["info"]["title"], "Catalog");
        assert_eq!(spec["info"]["version"], "2");
    }

    #[test]
    fn test_paths_documented() {
        let spec = spec(None);
        let paths = spec["paths"].as_object().unwrap();
        for path in [
            "/v1/domains/",
            "/v1/domains/{id}",
            "/v1/data-assets/instances/{id}/functions",
            "/v1/data-assets/instances/upsert",
            "/v1/pipeline-tasks/{id}",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
        assert!(spec["paths"]["/v1/pipeline-tasks/{id}"]["patch"].is_object());
    }

    #[test]
    fn test_no_security_without_issuer() {
        let spec = spec(None);
        assert!(spec.get("security").is_none());
        assert!(spec["components"]["securitySchemes"].get(SECURITY_SCHEME).is_none());
    }

    #[test]
    fn test_client_credentials_scheme_with_issuer() {
        let spec = spec(Some("https://auth.example.com"));
        let scheme = &spec["components"]["securitySchemes"][SECURITY_SCHEME];
        assert_eq!(scheme["type"], "oauth2");
        assert_eq!(
            scheme["flows"]["clientCredentials"]["tokenUrl"],
            "https://auth.example.com/oauth2/token"
        );
        assert_eq!(spec["security"][0][SECURITY_SCHEME], serde_json::json!([]));
    }

    #[test]
    fn test_disabled_document() {
        let docs = DocsConfig {
            enable_openapi: false,
            ..DocsConfig::default()
        };
        assert!(openapi_json(&docs, &auth_config("Bearer", &[])).unwrap().is_none());
    }
}
