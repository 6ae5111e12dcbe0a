//! The `m3ter_meter` resource.
//!
//! Meters carry two nested object lists: `data_fields` for raw usage values
//! and `derived_fields` for values calculated from other fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::client::Client;
use crate::crud::{
    find_id_by_code, generic_create, generic_delete, generic_read, generic_update, ResourceModel,
};
use crate::error::ProviderError;
use crate::mapper::{map_object, unmap_object, Mapper};
use crate::provider::ProviderResource;
use crate::schema::{Attribute, AttributeType, Constraint, Schema};
use crate::value::{CustomFields, Int64Value, StringValue, Value};

use super::{
    code_attribute, custom_fields_attribute, id_attribute, version_attribute,
    FIELD_CODE_MESSAGE, FIELD_CODE_PATTERN,
};

const PATH: &str = "/meters";
const ENTITY: &str = "meter";

const FIELD_CATEGORIES: [&str; 8] = [
    "WHO", "WHAT", "WHERE", "OTHER", "METADATA", "MEASURE", "INCOME", "COST",
];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct DataFieldModel {
    category: StringValue,
    code: StringValue,
    name: StringValue,
    unit: StringValue,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct DerivedFieldModel {
    category: StringValue,
    code: StringValue,
    name: StringValue,
    unit: StringValue,
    calculation: StringValue,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MeterModel {
    custom_fields: CustomFields,
    product_id: StringValue,
    group_id: StringValue,
    name: StringValue,
    code: StringValue,
    data_fields: Value<Vec<DataFieldModel>>,
    derived_fields: Value<Vec<DerivedFieldModel>>,
    id: StringValue,
    version: Int64Value,
}

impl ResourceModel for MeterModel {
    fn id(&self) -> &StringValue {
        &self.id
    }
}

fn read(m: &mut Mapper<'_>, data: &mut MeterModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.custom_fields_to("customFields", &mut data.custom_fields);
    m.to("productId", &mut data.product_id);
    m.to("groupId", &mut data.group_id);
    m.to("name", &mut data.name);
    m.to("code", &mut data.code);
    m.list_to("dataFields", &mut data.data_fields, |elem, diags| {
        map_object(elem, diags, |m, f: &mut DataFieldModel| {
            m.to("category", &mut f.category);
            m.to("code", &mut f.code);
            m.to("name", &mut f.name);
            m.to("unit", &mut f.unit);
        })
    });
    m.list_to("derivedFields", &mut data.derived_fields, |elem, diags| {
        map_object(elem, diags, |m, f: &mut DerivedFieldModel| {
            m.to("category", &mut f.category);
            m.to("code", &mut f.code);
            m.to("name", &mut f.name);
            m.to("unit", &mut f.unit);
            m.to("calculation", &mut f.calculation);
        })
    });
}

fn write(m: &mut Mapper<'_>, data: &MeterModel) {
    m.from(&data.id, "id");
    m.from(&data.version, "version");
    m.custom_fields_from(&data.custom_fields, "customFields");
    m.from(&data.product_id, "productId");
    m.from(&data.group_id, "groupId");
    m.from(&data.name, "name");
    m.from(&data.code, "code");
    m.list_from(&data.data_fields, "dataFields", |field, diags| {
        unmap_object(field, diags, |m, f: &DataFieldModel| {
            m.from(&f.category, "category");
            m.from(&f.code, "code");
            m.from(&f.name, "name");
            m.from(&f.unit, "unit");
        })
    });
    m.list_from(&data.derived_fields, "derivedFields", |field, diags| {
        unmap_object(field, diags, |m, f: &DerivedFieldModel| {
            m.from(&f.category, "category");
            m.from(&f.code, "code");
            m.from(&f.name, "name");
            m.from(&f.unit, "unit");
            m.from(&f.calculation, "calculation");
        })
    });
}

fn category_attribute() -> Attribute {
    Attribute::required(AttributeType::String)
        .with_description("The field type, which defines the type of data collected in the field.")
        .with_constraint(Constraint::OneOf(
            FIELD_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        ))
}

fn field_code_attribute() -> Attribute {
    Attribute::required(AttributeType::String)
        .with_description("Short code to identify the field")
        .with_constraint(Constraint::LengthBetween(1, 80))
        .with_constraint(Constraint::Matches {
            pattern: FIELD_CODE_PATTERN.to_string(),
            message: FIELD_CODE_MESSAGE.to_string(),
        })
}

fn field_name_attribute() -> Attribute {
    Attribute::required(AttributeType::String)
        .with_description("Descriptive name for the field")
        .with_constraint(Constraint::LengthBetween(1, 200))
}

fn field_unit_attribute() -> Attribute {
    Attribute::optional(AttributeType::String)
        .with_description(
            "The units to measure the data with. Should conform to Unified Code for Units \
             of Measure (UCUM). Required only for numeric field categories.",
        )
        .with_constraint(Constraint::LengthBetween(1, 50))
}

fn data_field_type() -> AttributeType {
    AttributeType::object([
        ("category", category_attribute()),
        ("code", field_code_attribute()),
        ("name", field_name_attribute()),
        ("unit", field_unit_attribute()),
    ])
}

fn derived_field_type() -> AttributeType {
    AttributeType::object([
        ("category", category_attribute()),
        ("code", field_code_attribute()),
        ("name", field_name_attribute()),
        ("unit", field_unit_attribute()),
        (
            "calculation",
            Attribute::required(AttributeType::String).with_description(
                "The calculation used to transform the value of submitted dataFields in \
                 usage data. Calculation can reference dataFields, customFields, or system \
                 Timestamp fields.",
            ),
        ),
    ])
}

/// Manages a Meter.
pub struct MeterResource;

#[async_trait]
impl ProviderResource for MeterResource {
    fn type_name(&self) -> &'static str {
        "m3ter_meter"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Meter resource")
            .with_attribute("custom_fields", custom_fields_attribute())
            .with_attribute(
                "product_id",
                Attribute::optional(AttributeType::String).with_description(
                    "UUID of the product the Meter belongs to. (Optional) - if left blank, \
                     the Meter is global.",
                ),
            )
            .with_attribute(
                "group_id",
                Attribute::optional(AttributeType::String)
                    .with_description("UUID of the group the Meter belongs to. (Optional)."),
            )
            .with_attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .with_description("Descriptive name for the Meter.")
                    .with_constraint(Constraint::LengthBetween(1, 200)),
            )
            .with_attribute(
                "code",
                code_attribute("Code of the Meter - unique short code used to identify the Meter."),
            )
            .with_attribute(
                "data_fields",
                Attribute::required(AttributeType::list(data_field_type()))
                    .with_description(
                        "Used to submit categorized raw usage data values for ingest into the \
                         platform. At least one required per Meter; maximum 15 per Meter.",
                    )
                    .with_constraint(Constraint::SizeBetween(1, 15)),
            )
            .with_attribute(
                "derived_fields",
                Attribute::required(AttributeType::list(derived_field_type()))
                    .with_description(
                        "Used to submit usage data values that are the result of a calculation \
                         performed on dataFields, customFields, or system Timestamp fields. \
                         Maximum 15 per Meter.",
                    )
                    .with_constraint(Constraint::SizeAtMost(15)),
            )
            .with_attribute("id", id_attribute())
            .with_attribute("version", version_attribute())
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_create::<MeterModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        generic_read::<MeterModel>(client, PATH, ENTITY, current_state, read).await
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_update::<MeterModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError> {
        generic_delete::<MeterModel>(client, PATH, ENTITY, current_state).await
    }

    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError> {
        let id = find_id_by_code(client, PATH, identifier).await?;
        generic_read::<MeterModel>(client, PATH, ENTITY, &json!({"id": id}), read).await
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
            "custom_fields": {},
            "name": "API calls",
            "code": "api_calls",
            "data_fields": [
                {"category": "MEASURE", "code": "calls", "name": "Calls", "unit": "n"}
            ],
            "derived_fields": []
        })
    }

    #[test]
    fn test_schema_field_counts() {
        let schema = MeterResource.schema();
        assert!(validate(&schema, &valid_config()).is_empty());

        // data_fields must have at least one entry
        let mut config = valid_config();
        config["data_fields"] = json!([]);
        assert_eq!(validate(&schema, &config).len(), 1);
    }

    #[test]
    fn test_schema_category_enum() {
        let schema = MeterResource.schema();
        let mut config = valid_config();
        config["data_fields"][0]["category"] = json!("BOGUS");
        assert_eq!(validate(&schema, &config).len(), 1);
    }

    #[test]
    fn test_nested_field_round_trip() {
        let mut doc = json!({
            "dataFields": [
                {"category": "MEASURE", "code": "calls", "name": "Calls", "unit": "n"}
            ],
            "derivedFields": [
                {"category": "MEASURE", "code": "rate", "name": "Rate", "calculation": "calls / 60"}
            ]
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut model = MeterModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);
        assert!(!diags.has_errors());

        let data_fields = model.data_fields.known().unwrap();
        assert_eq!(data_fields[0].code, StringValue::Known("calls".to_string()));
        let derived = model.derived_fields.known().unwrap();
        assert_eq!(
            derived[0].calculation,
            StringValue::Known("calls / 60".to_string())
        );
        // unit missing in the derived field leaves the default null
        assert!(derived[0].unit.is_null());

        let mut out = Map::new();
        let mut m = Mapper::new(&mut out, &mut diags);
        write(&mut m, &model);
        assert!(!diags.has_errors());
        // the null unit is skipped on write
        assert_eq!(
            out["derivedFields"],
            json!([{"category": "MEASURE", "code": "rate", "name": "Rate", "calculation": "calls / 60"}])
        );
    }

    #[test]
    fn test_read_rejects_non_object_field() {
        let mut doc = json!({"dataFields": ["oops"]}).as_object().cloned().unwrap();

        let mut model = MeterModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);

        assert!(diags.has_errors());
        assert!(model.data_fields.is_null());
    }
}
