//! The `m3ter_aggregation` resource.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::client::Client;
use crate::crud::{
    find_id_by_code, generic_create, generic_delete, generic_read, generic_update, ResourceModel,
};
use crate::error::ProviderError;
use crate::mapper::{Mapper, Scalar};
use crate::provider::ProviderResource;
use crate::schema::{Attribute, AttributeType, Constraint, Schema};
use crate::value::{CustomFields, Float64Value, Int64Value, StringValue, Value};

use super::{
    custom_fields_attribute, id_attribute, version_attribute, FIELD_CODE_MESSAGE,
    FIELD_CODE_PATTERN,
};

const PATH: &str = "/aggregations";
const ENTITY: &str = "aggregation";

const ROUNDING_MODES: [&str; 4] = ["UP", "DOWN", "NEAREST", "NONE"];
const AGGREGATION_METHODS: [&str; 7] = ["SUM", "MIN", "MAX", "COUNT", "LATEST", "MEAN", "UNIQUE"];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct AggregationModel {
    name: StringValue,
    custom_fields: CustomFields,
    rounding: StringValue,
    quantity_per_unit: Float64Value,
    unit: StringValue,
    code: StringValue,
    meter_id: StringValue,
    target_field: StringValue,
    aggregation: StringValue,
    segmented_fields: Value<Vec<String>>,
    segments: Value<Vec<BTreeMap<String, String>>>,
    default_value: Float64Value,
    id: StringValue,
    version: Int64Value,
}

impl ResourceModel for AggregationModel {
    fn id(&self) -> &StringValue {
        &self.id
    }
}

fn read(m: &mut Mapper<'_>, data: &mut AggregationModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("name", &mut data.name);
    m.custom_fields_to("customFields", &mut data.custom_fields);
    m.to("rounding", &mut data.rounding);
    m.to("quantityPerUnit", &mut data.quantity_per_unit);
    m.to("unit", &mut data.unit);
    m.to("code", &mut data.code);
    m.to("meterId", &mut data.meter_id);
    m.to("targetField", &mut data.target_field);
    m.to("aggregation", &mut data.aggregation);
    m.list_to("segmentedFields", &mut data.segmented_fields, |elem, diags| {
        match String::from_json(elem) {
            Some(s) => Some(s),
            None => {
                diags.add_error(
                    "Cannot map field segmentedFields",
                    "expected a string in segmented fields",
                );
                None
            }
        }
    });
    m.list_to("segments", &mut data.segments, |elem, diags| {
        let obj = match elem.as_object() {
            Some(obj) => obj,
            None => {
                diags.add_error("Cannot map field segments", "expected a map in segments");
                return None;
            }
        };
        let mut segment = BTreeMap::new();
        for (key, value) in obj {
            match value.as_str() {
                Some(s) => {
                    segment.insert(key.clone(), s.to_string());
                }
                None => {
                    diags.add_error("Cannot map field segments", "expected a string in segment");
                    return None;
                }
            }
        }
        Some(segment)
    });
    m.to("defaultValue", &mut data.default_value);
}

fn write(m: &mut Mapper<'_>, data: &AggregationModel) {
    m.from(&data.id, "id");
    m.from(&data.version, "version");
    m.from(&data.name, "name");
    m.custom_fields_from(&data.custom_fields, "customFields");
    m.from(&data.rounding, "rounding");
    m.from(&data.quantity_per_unit, "quantityPerUnit");
    m.from(&data.unit, "unit");
    m.from(&data.code, "code");
    m.from(&data.meter_id, "meterId");
    m.from(&data.target_field, "targetField");
    m.from(&data.aggregation, "aggregation");
    m.list_from(&data.segmented_fields, "segmentedFields", |field, _| {
        Json::String(field.clone())
    });
    m.list_from(&data.segments, "segments", |segment, _| {
        Json::Object(
            segment
                .iter()
                .map(|(k, v)| (k.clone(), Json::String(v.clone())))
                .collect(),
        )
    });
    m.from(&data.default_value, "defaultValue");
}

/// Manages an Aggregation.
pub struct AggregationResource;

#[async_trait]
impl ProviderResource for AggregationResource {
    fn type_name(&self) -> &'static str {
        "m3ter_aggregation"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Aggregation resource")
            .with_attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .with_description("Descriptive name for the Aggregation."),
            )
            .with_attribute("custom_fields", custom_fields_attribute())
            .with_attribute(
                "rounding",
                Attribute::required(AttributeType::String)
                    .with_description(
                        "Specifies how you want to deal with non-integer, fractional number \
                         Aggregation values.",
                    )
                    .with_constraint(Constraint::OneOf(
                        ROUNDING_MODES.iter().map(|r| r.to_string()).collect(),
                    )),
            )
            .with_attribute(
                "quantity_per_unit",
                Attribute::required(AttributeType::Float64)
                    .with_description(
                        "Defines how much of a quantity equates to 1 unit. Used when setting \
                         the price per unit for billing purposes.",
                    )
                    .with_constraint(Constraint::AtLeast(0.0)),
            )
            .with_attribute(
                "unit",
                Attribute::required(AttributeType::String)
                    .with_description(
                        "User defined label for units shown for Bill line items, indicating to \
                         your customers what they are being charged for.",
                    )
                    .with_constraint(Constraint::LengthBetween(1, 50)),
            )
            .with_attribute(
                "code",
                Attribute::optional(AttributeType::String)
                    .with_description(
                        "Code of the new Aggregation. A unique short code to identify the \
                         Aggregation.",
                    )
                    .with_constraint(Constraint::LengthAtMost(80))
                    .with_constraint(Constraint::Matches {
                        pattern: FIELD_CODE_PATTERN.to_string(),
                        message: FIELD_CODE_MESSAGE.to_string(),
                    }),
            )
            .with_attribute(
                "meter_id",
                Attribute::required(AttributeType::String).with_description(
                    "The UUID of the Meter used as the source of usage data for the Aggregation.",
                ),
            )
            .with_attribute(
                "target_field",
                Attribute::required(AttributeType::String).with_description(
                    "Code of the target dataField or derivedField on the Meter used as the \
                     basis for the Aggregation.",
                ),
            )
            .with_attribute(
                "aggregation",
                Attribute::required(AttributeType::String)
                    .with_description(
                        "Specifies the computation method applied to usage data collected in \
                         targetField.",
                    )
                    .with_constraint(Constraint::OneOf(
                        AGGREGATION_METHODS.iter().map(|a| a.to_string()).collect(),
                    )),
            )
            .with_attribute(
                "segmented_fields",
                Attribute::optional(AttributeType::list(AttributeType::String)).with_description(
                    "Used when creating a segmented Aggregation, which segments the usage data \
                     collected by a single Meter. Works together with segments.",
                ),
            )
            .with_attribute(
                "segments",
                Attribute::optional(AttributeType::list(AttributeType::map(AttributeType::String)))
                    .with_description(
                        "Used when creating a segmented Aggregation, which segments the usage \
                         data collected by a single Meter. Works together with segmentedFields.",
                    ),
            )
            .with_attribute(
                "default_value",
                Attribute::optional(AttributeType::Float64).with_description(
                    "Aggregation value used when no usage data is available to be aggregated.",
                ),
            )
            .with_attribute("id", id_attribute())
            .with_attribute("version", version_attribute())
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_create::<AggregationModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        generic_read::<AggregationModel>(client, PATH, ENTITY, current_state, read).await
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_update::<AggregationModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError> {
        generic_delete::<AggregationModel>(client, PATH, ENTITY, current_state).await
    }

    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError> {
        let id = find_id_by_code(client, PATH, identifier).await?;
        generic_read::<AggregationModel>(client, PATH, ENTITY, &json!({"id": id}), read).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Diagnostics;
    use crate::validation::validate;
    use serde_json::Map;

    fn valid_config() -> Json {
        json!({
            "name": "Total calls",
            "custom_fields": {},
            "rounding": "NEAREST",
            "quantity_per_unit": 1.0,
            "unit": "calls",
            "meter_id": "meter-1",
            "target_field": "calls",
            "aggregation": "SUM"
        })
    }

    #[test]
    fn test_schema_enums() {
        let schema = AggregationResource.schema();
        assert!(validate(&schema, &valid_config()).is_empty());

        let mut config = valid_config();
        config["rounding"] = json!("CEILING");
        assert_eq!(validate(&schema, &config).len(), 1);

        let mut config = valid_config();
        config["aggregation"] = json!("MEDIAN");
        assert_eq!(validate(&schema, &config).len(), 1);
    }

    #[test]
    fn test_segments_round_trip() {
        let mut doc = json!({
            "segmentedFields": ["region"],
            "segments": [{"region": "eu"}, {"region": "us"}]
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut model = AggregationModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);
        assert!(!diags.has_errors());

        let segments = model.segments.known().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].get("region"), Some(&"us".to_string()));

        let mut out = Map::new();
        let mut m = Mapper::new(&mut out, &mut diags);
        write(&mut m, &model);
        assert_eq!(out["segments"], json!([{"region": "eu"}, {"region": "us"}]));
        assert_eq!(out["segmentedFields"], json!(["region"]));
    }

    #[test]
    fn test_segments_reject_non_string_values() {
        let mut doc = json!({"segments": [{"region": 7}]})
            .as_object()
            .cloned()
            .unwrap();

        let mut model = AggregationModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);

        assert!(diags.has_errors());
    }
}
