//! The `m3ter_product` resource.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::client::Client;
use crate::crud::{
    find_id_by_code, generic_create, generic_delete, generic_read, generic_update, ResourceModel,
};
use crate::error::ProviderError;
use crate::mapper::Mapper;
use crate::provider::ProviderResource;
use crate::schema::{Attribute, AttributeType, Constraint, Schema};
use crate::value::{CustomFields, Int64Value, StringValue};

use super::{code_attribute, custom_fields_attribute, id_attribute, version_attribute};

const PATH: &str = "/products";
const ENTITY: &str = "product";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ProductModel {
    name: StringValue,
    code: StringValue,
    custom_fields: CustomFields,
    id: StringValue,
    version: Int64Value,
}

impl ResourceModel for ProductModel {
    fn id(&self) -> &StringValue {
        &self.id
    }
}

fn read(m: &mut Mapper<'_>, data: &mut ProductModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("name", &mut data.name);
    m.to("code", &mut data.code);
    m.custom_fields_to("customFields", &mut data.custom_fields);
}

fn write(m: &mut Mapper<'_>, data: &ProductModel) {
    m.from(&data.id, "id");
    m.from(&data.version, "version");
    m.from(&data.name, "name");
    m.from(&data.code, "code");
    m.custom_fields_from(&data.custom_fields, "customFields");
}

/// Manages a Product.
pub struct ProductResource;

#[async_trait]
impl ProviderResource for ProductResource {
    fn type_name(&self) -> &'static str {
        "m3ter_product"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Product resource")
            .with_attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .with_description(
                        "Descriptive name for the Product providing context and information.",
                    )
                    .with_constraint(Constraint::LengthBetween(1, 200)),
            )
            .with_attribute(
                "code",
                code_attribute(
                    "A unique short code to identify the Product. It should not contain \
                     control characters or spaces.",
                ),
            )
            .with_attribute("custom_fields", custom_fields_attribute())
            .with_attribute("id", id_attribute())
            .with_attribute("version", version_attribute())
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_create::<ProductModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        generic_read::<ProductModel>(client, PATH, ENTITY, current_state, read).await
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_update::<ProductModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError> {
        generic_delete::<ProductModel>(client, PATH, ENTITY, current_state).await
    }

    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError> {
        let id = find_id_by_code(client, PATH, identifier).await?;
        generic_read::<ProductModel>(client, PATH, ENTITY, &json!({"id": id}), read).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Diagnostics;
    use crate::validation::validate;
    use serde_json::Map;

    #[test]
    fn test_schema_validates_config() {
        let schema = ProductResource.schema();

        let diagnostics = validate(
            &schema,
            &json!({"name": "Storage", "code": "storage", "custom_fields": {}}),
        );
        assert!(diagnostics.is_empty());

        // code must not be wrapped in whitespace
        let diagnostics = validate(
            &schema,
            &json!({"name": "Storage", "code": " storage ", "custom_fields": {}}),
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_write_skips_unset_fields() {
        let model = ProductModel {
            name: StringValue::Known("Storage".to_string()),
            code: StringValue::Known("storage".to_string()),
            ..Default::default()
        };

        let mut doc = Map::new();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        write(&mut m, &model);

        assert_eq!(
            Json::Object(doc),
            json!({"name": "Storage", "code": "storage", "customFields": {}})
        );
    }

    #[test]
    fn test_read_maps_rest_document() {
        let mut doc = json!({
            "id": "prod-1",
            "version": 3,
            "name": "Storage",
            "code": "storage",
            "customFields": {"tier": "gold"}
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut model = ProductModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);

        assert!(!diags.has_errors());
        assert_eq!(model.id, StringValue::Known("prod-1".to_string()));
        assert_eq!(model.version, Int64Value::Known(3));
        assert!(model.custom_fields.is_known());
    }
}
