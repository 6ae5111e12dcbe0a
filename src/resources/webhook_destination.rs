//! The `m3ter_webhook_destination` resource.
//!
//! Credentials are write-only: they are sent on create and update but the API
//! never returns them, so `read` leaves them untouched in state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::client::Client;
use crate::crud::{
    generic_create, generic_delete, generic_read, generic_update, ResourceModel,
};
use crate::error::ProviderError;
use crate::mapper::Mapper;
use crate::provider::ProviderResource;
use crate::schema::{Attribute, AttributeType, Constraint, Schema};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::{id_attribute, version_attribute};

const PATH: &str = "/integrationdestinations/webhooks";
const ENTITY: &str = "webhook destination";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct WebhookCredentialsModel {
    api_key: StringValue,
    secret: StringValue,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WebhookDestinationModel {
    name: StringValue,
    description: StringValue,
    url: StringValue,
    code: StringValue,
    active: BoolValue,
    credentials: Value<WebhookCredentialsModel>,
    id: StringValue,
    version: Int64Value,
}

impl ResourceModel for WebhookDestinationModel {
    fn id(&self) -> &StringValue {
        &self.id
    }
}

fn read(m: &mut Mapper<'_>, data: &mut WebhookDestinationModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("name", &mut data.name);
    m.to("description", &mut data.description);
    m.to("url", &mut data.url);
    m.to("code", &mut data.code);
    m.to("active", &mut data.active);

    // Never map the credentials back to the model since they are write-only
}

fn write(m: &mut Mapper<'_>, data: &WebhookDestinationModel) {
    m.from(&data.id, "id");
    m.from(&data.version, "version");
    m.from(&data.name, "name");
    m.from(&data.description, "description");
    m.from(&data.url, "url");
    m.from(&data.code, "code");
    m.from(&data.active, "active");

    let credentials = data.credentials.known().cloned();
    m.nested("credentials", |creds| {
        if let Some(credentials) = &credentials {
            creds.from(&credentials.api_key, "apiKey");
            creds.from(&credentials.secret, "secret");
        }
        creds.set("type", json!("M3TER_SIGNED_REQUEST"));
        creds.set("empty", json!(false));
    });
}

fn credentials_type() -> AttributeType {
    AttributeType::object([
        (
            "api_key",
            Attribute::required(AttributeType::String)
                .with_description(
                    "The API key provided by m3ter. This key is part of the credential set \
                     required for signing requests and authenticating with m3ter services.",
                )
                .with_constraint(Constraint::LengthAtLeast(1)),
        ),
        (
            "secret",
            Attribute::required(AttributeType::String)
                .with_description(
                    "The secret associated with the API key. This secret is used in \
                     conjunction with the API key to generate a signature for secure \
                     authentication.",
                )
                .sensitive()
                .with_constraint(Constraint::LengthAtLeast(1)),
        ),
    ])
}

/// Manages a Webhook Destination.
pub struct WebhookDestinationResource;

#[async_trait]
impl ProviderResource for WebhookDestinationResource {
    fn type_name(&self) -> &'static str {
        "m3ter_webhook_destination"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Webhook destination resource")
            .with_attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .with_description("Name of the Webhook Destination")
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute(
                "description",
                Attribute::required(AttributeType::String)
                    .with_description("Description of the Webhook Destination")
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute(
                "url",
                Attribute::required(AttributeType::String)
                    .with_description(
                        "The URL to which the Webhook Destination requests will be sent.",
                    )
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute("code", Attribute::required(AttributeType::String))
            .with_attribute("active", Attribute::optional_computed(AttributeType::Bool))
            .with_attribute("credentials", Attribute::required(credentials_type()))
            .with_attribute("id", id_attribute())
            .with_attribute("version", version_attribute())
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_create::<WebhookDestinationModel>(client, PATH, ENTITY, planned_state, read, write)
            .await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        generic_read::<WebhookDestinationModel>(client, PATH, ENTITY, current_state, read).await
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_update::<WebhookDestinationModel>(client, PATH, ENTITY, planned_state, read, write)
            .await
    }

    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError> {
        generic_delete::<WebhookDestinationModel>(client, PATH, ENTITY, current_state).await
    }

    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError> {
        generic_read::<WebhookDestinationModel>(
            client,
            PATH,
            ENTITY,
            &json!({"id": identifier}),
            read,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Diagnostics;
    use crate::validation::validate;
    use serde_json::Map;

    fn model() -> WebhookDestinationModel {
        WebhookDestinationModel {
            name: StringValue::Known("Billing events".to_string()),
            description: StringValue::Known("Webhook for billing events".to_string()),
            url: StringValue::Known("https://example.com/hook".to_string()),
            code: StringValue::Known("billing_hook".to_string()),
            credentials: Value::Known(WebhookCredentialsModel {
                api_key: StringValue::Known("key".to_string()),
                secret: StringValue::Known("shh".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_schema_requires_credentials() {
        let schema = WebhookDestinationResource.schema();
        let config = json!({
            "name": "Billing events",
            "description": "Webhook for billing events",
            "url": "https://example.com/hook",
            "code": "billing_hook",
            "credentials": {"api_key": "key", "secret": "shh"}
        });
        assert!(validate(&schema, &config).is_empty());

        let mut bad = config.clone();
        bad.as_object_mut().unwrap().remove("credentials");
        assert_eq!(validate(&schema, &bad).len(), 1);

        let mut bad = config.clone();
        bad["credentials"] = json!({"api_key": "key"});
        assert_eq!(validate(&schema, &bad).len(), 1);
    }

    #[test]
    fn test_write_injects_credential_envelope() {
        let mut doc = Map::new();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        write(&mut m, &model());

        assert_eq!(
            doc["credentials"],
            json!({
                "apiKey": "key",
                "secret": "shh",
                "type": "M3TER_SIGNED_REQUEST",
                "empty": false
            })
        );
    }

    #[test]
    fn test_read_leaves_credentials_untouched() {
        let mut doc = json!({
            "id": "wh-1",
            "name": "Billing events",
            "credentials": {"apiKey": "rotated", "secret": "rotated"}
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut data = model();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut data);

        assert!(!diags.has_errors());
        assert_eq!(data.id, StringValue::Known("wh-1".to_string()));
        let creds = data.credentials.known().unwrap();
        assert_eq!(creds.secret, StringValue::Known("shh".to_string()));
    }
}
