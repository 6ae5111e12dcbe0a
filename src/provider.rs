//! The provider front object.
//!
//! [`M3terProvider`] owns the registry of resource and data source handlers
//! and the configured API client, and dispatches host operations by type
//! name. It is the single entry point a host embeds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{info, instrument};

use crate::client::{Client, ClientConfig};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Diagnostic, ProviderSchema, Schema};
use crate::validation;
use crate::value::StringValue;

/// Environment fallback for the organization id attribute.
pub const ENV_ORGANIZATION_ID: &str = "M3TER_ORGANIZATION_ID";
/// Environment fallback for the access key attribute.
pub const ENV_ACCESS_KEY: &str = "M3TER_ACCESS_KEY";
/// Environment fallback for the secret key attribute.
pub const ENV_SECRET_KEY: &str = "M3TER_SECRET_KEY";

/// A managed m3ter entity type.
#[async_trait]
pub trait ProviderResource: Send + Sync {
    /// The resource type name, e.g. `m3ter_product`.
    fn type_name(&self) -> &'static str;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Create the entity from planned state and return new state.
    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError>;

    /// Refresh state from the API.
    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError>;

    /// Apply planned state to the existing entity and return new state.
    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError>;

    /// Delete the entity.
    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError>;

    /// Import an existing entity by id (or code, where supported) and
    /// return its state.
    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError>;
}

/// A read-only m3ter lookup.
#[async_trait]
pub trait ProviderDataSource: Send + Sync {
    /// The data source type name, e.g. `m3ter_product`.
    fn type_name(&self) -> &'static str;

    /// The data source schema.
    fn schema(&self) -> Schema;

    /// Resolve the lookup and return its state.
    async fn read(&self, client: &Client, config: &Json) -> Result<Json, ProviderError>;
}

/// Provider-level configuration, with environment fallbacks for every
/// credential attribute.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// The m3ter organization to manage.
    pub organization_id: StringValue,
    /// OAuth2 client id.
    pub access_key: StringValue,
    /// OAuth2 client secret.
    pub secret_key: StringValue,
    /// Optional API endpoint override.
    pub base_url: StringValue,
}

impl ProviderConfig {
    /// Resolve attributes against their environment fallbacks into a client
    /// configuration. Missing values produce attribute-scoped diagnostics.
    pub fn resolve(&self) -> Result<ClientConfig, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();

        let organization_id = resolve_attr(
            &self.organization_id,
            "organization_id",
            ENV_ORGANIZATION_ID,
            &mut diagnostics,
        );
        let access_key = resolve_attr(&self.access_key, "access_key", ENV_ACCESS_KEY, &mut diagnostics);
        let secret_key = resolve_attr(&self.secret_key, "secret_key", ENV_SECRET_KEY, &mut diagnostics);

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let mut config = ClientConfig::new(organization_id, access_key, secret_key);
        if let Some(url) = self.base_url.known() {
            config = config.with_base_url(url.clone());
        }
        Ok(config)
    }
}

fn resolve_attr(
    value: &StringValue,
    attribute: &str,
    env_var: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    if let Some(v) = value.known() {
        return v.clone();
    }
    match std::env::var(env_var) {
        Ok(v) if !v.is_empty() => v,
        _ => {
            diagnostics.push(
                Diagnostic::error(format!("Missing provider attribute '{}'", attribute))
                    .with_detail(format!(
                        "Set the {} attribute or the {} environment variable",
                        attribute, env_var
                    ))
                    .with_attribute(attribute),
            );
            String::new()
        }
    }
}

/// Provider metadata reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// The provider name.
    pub name: String,
    /// The crate version.
    pub version: String,
}

/// The m3ter provider: handler registry plus the configured client.
#[derive(Default)]
pub struct M3terProvider {
    resources: HashMap<&'static str, Box<dyn ProviderResource>>,
    data_sources: HashMap<&'static str, Box<dyn ProviderDataSource>>,
    client: Option<Arc<Client>>,
}

impl M3terProvider {
    /// Create a provider with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with every built-in resource and data source
    /// registered.
    pub fn builtin() -> Self {
        let mut provider = Self::new();
        crate::resources::register_all(&mut provider);
        crate::data_sources::register_all(&mut provider);
        provider
    }

    /// Register a resource handler.
    pub fn register_resource(&mut self, resource: Box<dyn ProviderResource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    /// Register a data source handler.
    pub fn register_data_source(&mut self, data_source: Box<dyn ProviderDataSource>) {
        self.data_sources.insert(data_source.type_name(), data_source);
    }

    /// Provider metadata.
    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "m3ter".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// The full provider schema: configuration plus every registered
    /// resource and data source.
    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: provider_config_schema(),
            resources: self
                .resources
                .values()
                .map(|r| (r.type_name().to_string(), r.schema()))
                .collect(),
            data_sources: self
                .data_sources
                .values()
                .map(|d| (d.type_name().to_string(), d.schema()))
                .collect(),
        }
    }

    /// Validate a provider configuration value against the provider schema.
    pub fn validate_provider_config(&self, config: &Json) -> Vec<Diagnostic> {
        validation::validate(&provider_config_schema(), config)
    }

    /// Resolve the configuration and build the API client. Must be called
    /// before any CRUD or data source operation.
    #[instrument(skip(self, config))]
    pub fn configure(&mut self, config: &Json) -> Result<(), ProviderError> {
        let parsed: ProviderConfig = serde_json::from_value(config.clone())?;
        let client_config = parsed.resolve().map_err(|diags| {
            ProviderError::Configuration(
                diags
                    .iter()
                    .map(|d| d.summary.clone())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        info!(
            organization_id = %client_config.organization_id,
            base_url = %client_config.base_url,
            "configuring provider"
        );
        self.client = Some(Arc::new(Client::new(client_config)?));
        Ok(())
    }

    /// The configured client.
    pub fn client(&self) -> Result<&Arc<Client>, ProviderError> {
        self.client
            .as_ref()
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
    }

    fn resource(&self, type_name: &str) -> Result<&dyn ProviderResource, ProviderError> {
        self.resources
            .get(type_name)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<&dyn ProviderDataSource, ProviderError> {
        self.data_sources
            .get(type_name)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownDataSource(type_name.to_string()))
    }

    /// Validate a resource configuration against its schema.
    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Json,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(type_name)?;
        Ok(validation::validate(&resource.schema(), config))
    }

    /// Create a resource and return its new state.
    #[instrument(skip(self, planned_state))]
    pub async fn create(&self, type_name: &str, planned_state: &Json) -> Result<Json, ProviderError> {
        let resource = self.resource(type_name)?;
        resource.create(self.client()?, planned_state).await
    }

    /// Refresh a resource's state.
    #[instrument(skip(self, current_state))]
    pub async fn read(&self, type_name: &str, current_state: &Json) -> Result<Json, ProviderError> {
        let resource = self.resource(type_name)?;
        resource.read(self.client()?, current_state).await
    }

    /// Update a resource and return its new state.
    #[instrument(skip(self, planned_state))]
    pub async fn update(&self, type_name: &str, planned_state: &Json) -> Result<Json, ProviderError> {
        let resource = self.resource(type_name)?;
        resource.update(self.client()?, planned_state).await
    }

    /// Delete a resource.
    #[instrument(skip(self, current_state))]
    pub async fn delete(&self, type_name: &str, current_state: &Json) -> Result<(), ProviderError> {
        let resource = self.resource(type_name)?;
        resource.delete(self.client()?, current_state).await
    }

    /// Import an existing entity into state by identifier.
    #[instrument(skip(self))]
    pub async fn import_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> Result<Json, ProviderError> {
        let resource = self.resource(type_name)?;
        resource.import(self.client()?, identifier).await
    }

    /// Validate a data source configuration against its schema.
    pub fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Json,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(type_name)?;
        Ok(validation::validate(&data_source.schema(), config))
    }

    /// Resolve a data source lookup.
    #[instrument(skip(self, config))]
    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: &Json,
    ) -> Result<Json, ProviderError> {
        let data_source = self.data_source(type_name)?;
        data_source.read(self.client()?, config).await
    }
}

fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_description("Manage m3ter billing and metering entities")
        .with_attribute(
            "organization_id",
            Attribute::optional(AttributeType::String)
                .with_description("The m3ter organization id. Falls back to M3TER_ORGANIZATION_ID."),
        )
        .with_attribute(
            "access_key",
            Attribute::optional(AttributeType::String)
                .sensitive()
                .with_description("OAuth2 client id. Falls back to M3TER_ACCESS_KEY."),
        )
        .with_attribute(
            "secret_key",
            Attribute::optional(AttributeType::String)
                .sensitive()
                .with_description("OAuth2 client secret. Falls back to M3TER_SECRET_KEY."),
        )
        .with_attribute(
            "base_url",
            Attribute::optional(AttributeType::String)
                .with_description("API endpoint override, mainly for testing."),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata() {
        let provider = M3terProvider::new();
        let metadata = provider.metadata();
        assert_eq!(metadata.name, "m3ter");
        assert!(!metadata.version.is_empty());
    }

    #[test]
    fn test_builtin_registry() {
        let provider = M3terProvider::builtin();
        let schema = provider.schema();
        assert!(schema.resources.contains_key("m3ter_product"));
        assert!(schema.resources.contains_key("m3ter_meter"));
        assert!(schema.resources.contains_key("m3ter_organization_config"));
        assert!(schema.data_sources.contains_key("m3ter_product"));
    }

    #[test]
    fn test_validate_provider_config() {
        let provider = M3terProvider::new();
        assert!(provider
            .validate_provider_config(&json!({"organization_id": "org-1"}))
            .is_empty());

        let diagnostics = provider.validate_provider_config(&json!({"organization_id": 7}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_configure_from_attributes() {
        let mut provider = M3terProvider::new();
        provider
            .configure(&json!({
                "organization_id": "org-1",
                "access_key": "key",
                "secret_key": "secret",
                "base_url": "http://localhost:9000"
            }))
            .unwrap();
        assert!(provider.client().is_ok());
    }

    #[test]
    fn test_configure_missing_credentials() {
        // Guard against ambient credentials leaking into the test.
        std::env::remove_var(ENV_ORGANIZATION_ID);
        std::env::remove_var(ENV_ACCESS_KEY);
        std::env::remove_var(ENV_SECRET_KEY);

        let mut provider = M3terProvider::new();
        let err = provider.configure(&json!({})).unwrap_err();
        match err {
            ProviderError::Configuration(msg) => {
                assert!(msg.contains("organization_id"));
                assert!(msg.contains("access_key"));
                assert!(msg.contains("secret_key"));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_unconfigured_client_errors() {
        let provider = M3terProvider::new();
        assert!(matches!(
            provider.client(),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let mut provider = M3terProvider::new();
        provider
            .configure(&json!({
                "organization_id": "org-1",
                "access_key": "key",
                "secret_key": "secret"
            }))
            .unwrap();

        let err = provider
            .create("m3ter_gadget", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = provider
            .read_data_source("m3ter_gadget", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownDataSource(_)));
    }
}
