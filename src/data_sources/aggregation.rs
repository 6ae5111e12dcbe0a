//! The `m3ter_aggregation` data source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::client::{escape, Client};
use crate::error::ProviderError;
use crate::mapper::Mapper;
use crate::provider::ProviderDataSource;
use crate::schema::{Attribute, AttributeType, Diagnostics, Schema};
use crate::value::{CustomFields, Int64Value, StringValue, Value};

use super::find_matching;

const PATH: &str = "/aggregations";
const ENTITY: &str = "aggregation";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct AggregationDataSourceModel {
    name: StringValue,
    code: StringValue,
    custom_fields: CustomFields,
    segments: Value<Vec<BTreeMap<String, String>>>,
    id: StringValue,
    version: Int64Value,
}

fn read(m: &mut Mapper<'_>, data: &mut AggregationDataSourceModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("name", &mut data.name);
    m.to("code", &mut data.code);
    m.custom_fields_to("customFields", &mut data.custom_fields);

    // Non-string segment values are dropped rather than rejected; a lookup
    // should not fail because of fields it does not use.
    data.segments = Value::Null;
    m.list_to("segments", &mut data.segments, |elem, _| {
        elem.as_object().map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect::<BTreeMap<_, _>>()
        })
    });
}

/// Looks up an existing Aggregation by id, name, or code.
pub struct AggregationDataSource;

#[async_trait]
impl ProviderDataSource for AggregationDataSource {
    fn type_name(&self) -> &'static str {
        "m3ter_aggregation"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Aggregation data source")
            .with_attribute(
                "name",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("Descriptive name for the Aggregation."),
            )
            .with_attribute(
                "code",
                Attribute::optional_computed(AttributeType::String).with_description(
                    "Code of the Aggregation. A unique short code to identify the Aggregation.",
                ),
            )
            .with_attribute(
                "custom_fields",
                Attribute::optional_computed(AttributeType::Dynamic).with_description(
                    "User defined fields enabling you to attach custom data. The value for a \
                     custom field can be either a string or a number.",
                ),
            )
            .with_attribute(
                "segments",
                Attribute::computed(AttributeType::list(AttributeType::map(
                    AttributeType::String,
                )))
                .with_description(
                    "Contains the values that are to be used as the segments, read from the \
                     fields in the meter pointed at by segmentedFields.",
                ),
            )
            .with_attribute(
                "id",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("The UUID of the entity."),
            )
            .with_attribute(
                "version",
                Attribute::computed(AttributeType::Int64).with_description("The version number."),
            )
    }

    async fn read(&self, client: &Client, config: &Json) -> Result<Json, ProviderError> {
        let mut data: AggregationDataSourceModel = serde_json::from_value(config.clone())?;

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
    fn test_read_maps_segments() {
        let mut doc = json!({
            "id": "agg-1",
            "version": 1,
            "name": "Total calls",
            "segments": [{"region": "eu"}, {"region": "us", "ignored": 7}]
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut data = AggregationDataSourceModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut data);

        assert!(!diags.has_errors());
        let segments = data.segments.known().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].get("region"), Some(&"eu".to_string()));
        // non-string values are dropped
        assert!(!segments[1].contains_key("ignored"));
    }

    #[test]
    fn test_read_without_segments_leaves_null() {
        let mut doc = json!({"id": "agg-1"}).as_object().cloned().unwrap();

        let mut data = AggregationDataSourceModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut data);

        assert!(data.segments.is_null());
    }
}
