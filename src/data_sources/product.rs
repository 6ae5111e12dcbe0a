//! The `m3ter_product` data source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::client::{escape, Client};
use crate::error::ProviderError;
use crate::mapper::Mapper;
use crate::provider::ProviderDataSource;
use crate::schema::{Attribute, AttributeType, Diagnostics, Schema};
use crate::value::{CustomFields, Int64Value, StringValue};

use super::find_matching;

const PATH: &str = "/products";
const ENTITY: &str = "product";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ProductDataSourceModel {
    name: StringValue,
    code: StringValue,
    custom_fields: CustomFields,
    id: StringValue,
    version: Int64Value,
}

fn read(m: &mut Mapper<'_>, data: &mut ProductDataSourceModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("name", &mut data.name);
    m.to("code", &mut data.code);
    m.custom_fields_to("customFields", &mut data.custom_fields);
}

/// Looks up an existing Product by id, name, or code.
pub struct ProductDataSource;

#[async_trait]
impl ProviderDataSource for ProductDataSource {
    fn type_name(&self) -> &'static str {
        "m3ter_product"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Product data source")
            .with_attribute(
                "name",
                Attribute::optional_computed(AttributeType::String).with_description(
                    "Descriptive name for the Product providing context and information.",
                ),
            )
            .with_attribute(
                "code",
                Attribute::optional_computed(AttributeType::String).with_description(
                    "A unique short code to identify the Product. It should not contain \
                     control characters or spaces.",
                ),
            )
            .with_attribute(
                "custom_fields",
                Attribute::computed(AttributeType::Dynamic).with_description(
                    "User defined fields enabling you to attach custom data. The value for a \
                     custom field can be either a string or a number.",
                ),
            )
            .with_attribute(
                "id",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("Product identifier"),
            )
            .with_attribute(
                "version",
                Attribute::computed(AttributeType::Int64).with_description("Product version"),
            )
    }

    async fn read(&self, client: &Client, config: &Json) -> Result<Json, ProviderError> {
        let mut data: ProductDataSourceModel = serde_json::from_value(config.clone())?;

        let doc = match data.id.known() {
            Some(id) => {
                debug!(entity = ENTITY, %id, "looking up by id");
                client
                    .get(&format!("{}/{}", PATH, escape(id)))
                    .await?
                    .unwrap_or(Json::Object(Map::new()))
            }
            None => {
                debug!(entity = ENTITY, "looking up by filters");
                find_matching(
                    client,
                    PATH,
                    ENTITY,
                    data.name.known().map(String::as_str),
                    data.code.known().map(String::as_str),
                )
                .await?
            }
        };

        let mut doc = doc.as_object().cloned().unwrap_or_default();
        let mut diagnostics = Diagnostics::new();
        let mut mapper = Mapper::new(&mut doc, &mut diagnostics);
        read(&mut mapper, &mut data);
        if diagnostics.has_errors() {
            return Err(ProviderError::Validation(format!(
                "cannot decode {} response: {}",
                ENTITY,
                diagnostics.error_summary()
            )));
        }
        Ok(serde_json::to_value(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_maps_rest_document() {
        let mut doc = json!({
            "id": "prod-1",
            "version": 2,
            "name": "Storage",
            "code": "storage",
            "customFields": {"tier": "gold"}
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut data = ProductDataSourceModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut data);

        assert!(!diags.has_errors());
        assert_eq!(data.id, StringValue::Known("prod-1".to_string()));
        assert_eq!(data.version, Int64Value::Known(2));
        assert!(data.custom_fields.is_known());
    }
}
