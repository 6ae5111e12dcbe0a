//! The `m3ter_notification` resource.

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
use crate::value::{BoolValue, Int64Value, StringValue};

use super::{id_attribute, version_attribute};

const PATH: &str = "/notifications/configurations";
const ENTITY: &str = "notification";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct NotificationModel {
    name: StringValue,
    description: StringValue,
    active: BoolValue,
    always_fire_event: BoolValue,
    calculation: StringValue,
    code: StringValue,
    event_name: StringValue,
    id: StringValue,
    version: Int64Value,
}

impl ResourceModel for NotificationModel {
    fn id(&self) -> &StringValue {
        &self.id
    }
}

// Responses from /notifications/configurations use snake_case for these two
// fields while requests expect camelCase.
fn read(m: &mut Mapper<'_>, data: &mut NotificationModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("name", &mut data.name);
    m.to("description", &mut data.description);
    m.to("active", &mut data.active);
    m.to("always_fire_event", &mut data.always_fire_event);
    m.to("calculation", &mut data.calculation);
    m.to("code", &mut data.code);
    m.to("event_name", &mut data.event_name);
}

fn write(m: &mut Mapper<'_>, data: &NotificationModel) {
    m.from(&data.id, "id");
    m.from(&data.version, "version");
    m.from(&data.name, "name");
    m.from(&data.description, "description");
    m.from(&data.active, "active");
    m.from(&data.always_fire_event, "alwaysFireEvent");
    m.from(&data.calculation, "calculation");
    m.from(&data.code, "code");
    m.from(&data.event_name, "eventName");
}

/// Manages a Notification configuration.
pub struct NotificationResource;

#[async_trait]
impl ProviderResource for NotificationResource {
    fn type_name(&self) -> &'static str {
        "m3ter_notification"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Notification resource")
            .with_attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .with_description("Name of the notification")
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute(
                "description",
                Attribute::required(AttributeType::String)
                    .with_description("Description of the notification")
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute(
                "active",
                Attribute::optional_computed(AttributeType::Bool).with_description(
                    "Boolean flag that sets the Notification as active or inactive. Only \
                     active Notifications are sent when triggered by the Event they are \
                     based on.",
                ),
            )
            .with_attribute(
                "always_fire_event",
                Attribute::optional_computed(AttributeType::Bool).with_description(
                    "A Boolean flag indicating whether the Notification is always triggered, \
                     regardless of other conditions and omitting reference to any \
                     calculation. This means the Notification will be triggered simply by \
                     the Event it is based on occurring and with no further conditions \
                     having to be met.",
                ),
            )
            .with_attribute(
                "calculation",
                Attribute::optional(AttributeType::String).with_description(
                    "A logical expression that that is evaluated to a Boolean. If it \
                     evaluates as True, a Notification for the Event is created and sent to \
                     the configured destination. Calculations can reference numeric, string, \
                     and boolean Event fields.",
                ),
            )
            .with_attribute(
                "code",
                Attribute::required(AttributeType::String)
                    .with_description("The short code for the Notification.")
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute(
                "event_name",
                Attribute::required(AttributeType::String)
                    .with_description("The name of the Event that triggers the Notification.")
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute("id", id_attribute())
            .with_attribute("version", version_attribute())
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_create::<NotificationModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        generic_read::<NotificationModel>(client, PATH, ENTITY, current_state, read).await
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_update::<NotificationModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError> {
        generic_delete::<NotificationModel>(client, PATH, ENTITY, current_state).await
    }

    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError> {
        generic_read::<NotificationModel>(client, PATH, ENTITY, &json!({"id": identifier}), read)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Diagnostics;
    use crate::validation::validate;
    use serde_json::Map;

    #[test]
    fn test_schema_requires_non_empty_strings() {
        let schema = NotificationResource.schema();
        let config = json!({
            "name": "Spend alert",
            "description": "Fires when commitment is breached",
            "code": "spend_alert",
            "event_name": "billing.commitment.breached"
        });
        assert!(validate(&schema, &config).is_empty());

        let mut bad = config.clone();
        bad["description"] = json!("");
        assert_eq!(validate(&schema, &bad).len(), 1);
    }

    #[test]
    fn test_response_keys_differ_from_request_keys() {
        let mut doc = json!({
            "id": "ntf-1",
            "always_fire_event": true,
            "event_name": "billing.commitment.breached"
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut model = NotificationModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);
        assert!(!diags.has_errors());
        assert_eq!(model.always_fire_event, BoolValue::Known(true));

        let mut out = Map::new();
        let mut m = Mapper::new(&mut out, &mut diags);
        write(&mut m, &model);
        assert_eq!(out["alwaysFireEvent"], json!(true));
        assert_eq!(out["eventName"], json!("billing.commitment.breached"));
        assert!(!out.contains_key("always_fire_event"));
    }
}
