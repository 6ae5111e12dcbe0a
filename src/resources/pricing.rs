//! The `m3ter_pricing` resource.
//!
//! Pricing bands are nested objects whose REST keys are camelCase
//! (`lowerLimit`, `fixedPrice`, `unitPrice`) while the state attribute names
//! are snake_case.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::client::Client;
use crate::crud::{
    generic_create, generic_delete, generic_read, generic_update, ResourceModel,
};
use crate::error::ProviderError;
use crate::mapper::{map_object, unmap_object, Mapper};
use crate::provider::ProviderResource;
use crate::schema::{Attribute, AttributeType, Constraint, Schema};
use crate::value::{BoolValue, Float64Value, Int64Value, StringValue, Value};

use super::{code_attribute, id_attribute, version_attribute};

const PATH: &str = "/pricings";
const ENTITY: &str = "pricing";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PricingBandModel {
    id: StringValue,
    lower_limit: Float64Value,
    fixed_price: Float64Value,
    unit_price: Float64Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct PricingModel {
    description: StringValue,
    code: StringValue,
    aggregation_id: StringValue,
    compound_aggregation_id: StringValue,
    #[serde(rename = "type")]
    pricing_type: StringValue,
    segment: Value<BTreeMap<String, String>>,
    tiers_span_plan: BoolValue,
    minimum_spend: Float64Value,
    minimum_spend_description: StringValue,
    minimum_spend_bill_in_advance: BoolValue,
    overage_pricing_bands: Value<Vec<PricingBandModel>>,
    plan_id: StringValue,
    plan_template_id: StringValue,
    cumulative: BoolValue,
    start_date: StringValue,
    end_date: StringValue,
    pricing_bands: Value<Vec<PricingBandModel>>,
    id: StringValue,
    version: Int64Value,
}

impl ResourceModel for PricingModel {
    fn id(&self) -> &StringValue {
        &self.id
    }
}

fn band_to(m: &mut Mapper<'_>, band: &mut PricingBandModel) {
    m.to("id", &mut band.id);
    m.to("lowerLimit", &mut band.lower_limit);
    m.to("fixedPrice", &mut band.fixed_price);
    m.to("unitPrice", &mut band.unit_price);
}

fn band_from(m: &mut Mapper<'_>, band: &PricingBandModel) {
    m.from(&band.id, "id");
    m.from(&band.lower_limit, "lowerLimit");
    m.from(&band.fixed_price, "fixedPrice");
    m.from(&band.unit_price, "unitPrice");
}

fn read(m: &mut Mapper<'_>, data: &mut PricingModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("description", &mut data.description);
    m.to("code", &mut data.code);
    m.to("aggregationId", &mut data.aggregation_id);
    m.to("compoundAggregationId", &mut data.compound_aggregation_id);
    m.to("type", &mut data.pricing_type);
    m.string_map_to("segment", &mut data.segment);
    m.to("tiersSpanPlan", &mut data.tiers_span_plan);
    m.to("minimumSpend", &mut data.minimum_spend);
    m.to("minimumSpendDescription", &mut data.minimum_spend_description);
    m.to("minimumSpendBillInAdvance", &mut data.minimum_spend_bill_in_advance);

    // An absent or empty overage list stays null so an omitted attribute
    // does not drift.
    let mut overage: Value<Vec<PricingBandModel>> = Value::Null;
    m.list_to("overagePricingBands", &mut overage, |elem, diags| {
        map_object(elem, diags, band_to)
    });
    if overage.known().map_or(false, |bands| !bands.is_empty()) {
        data.overage_pricing_bands = overage;
    }

    m.to("planId", &mut data.plan_id);
    m.to("planTemplateId", &mut data.plan_template_id);
    m.to("cumulative", &mut data.cumulative);
    m.to("startDate", &mut data.start_date);
    m.to("endDate", &mut data.end_date);
    m.list_to("pricingBands", &mut data.pricing_bands, |elem, diags| {
        map_object(elem, diags, band_to)
    });
}

fn write(m: &mut Mapper<'_>, data: &PricingModel) {
    m.from(&data.id, "id");
    m.from(&data.version, "version");
    m.from(&data.description, "description");
    m.from(&data.code, "code");
    m.from(&data.aggregation_id, "aggregationId");
    m.from(&data.compound_aggregation_id, "compoundAggregationId");
    m.from(&data.pricing_type, "type");
    m.string_map_from(&data.segment, "segment");
    m.from(&data.tiers_span_plan, "tiersSpanPlan");
    m.from(&data.minimum_spend, "minimumSpend");
    m.from(&data.minimum_spend_description, "minimumSpendDescription");
    m.from(&data.minimum_spend_bill_in_advance, "minimumSpendBillInAdvance");
    m.list_from(&data.overage_pricing_bands, "overagePricingBands", |band, diags| {
        unmap_object(band, diags, band_from)
    });
    m.from(&data.plan_id, "planId");
    m.from(&data.plan_template_id, "planTemplateId");
    m.from(&data.cumulative, "cumulative");
    m.from(&data.start_date, "startDate");
    m.from(&data.end_date, "endDate");
    m.list_from(&data.pricing_bands, "pricingBands", |band, diags| {
        unmap_object(band, diags, band_from)
    });
}

fn pricing_band_type() -> AttributeType {
    AttributeType::object([
        ("id", Attribute::computed(AttributeType::String)),
        (
            "lower_limit",
            Attribute::required(AttributeType::Float64).with_constraint(Constraint::AtLeast(0.0)),
        ),
        ("fixed_price", Attribute::required(AttributeType::Float64)),
        ("unit_price", Attribute::required(AttributeType::Float64)),
    ])
}

/// Manages a Pricing.
pub struct PricingResource;

#[async_trait]
impl ProviderResource for PricingResource {
    fn type_name(&self) -> &'static str {
        "m3ter_pricing"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Pricing resource")
            .with_attribute(
                "description",
                Attribute::optional(AttributeType::String)
                    .with_description("Displayed on Bill line items.")
                    .with_constraint(Constraint::LengthAtMost(200)),
            )
            .with_attribute("code", {
                // optional for pricings, unlike most entities
                let mut attr = code_attribute("Unique short code for the Pricing.");
                attr.flags.required = false;
                attr.flags.optional = true;
                attr
            })
            .with_attribute(
                "aggregation_id",
                Attribute::optional(AttributeType::String)
                    .with_description(
                        "UUID of the Aggregation used to create the Pricing. Use this when \
                         creating a Pricing for a segmented aggregation.",
                    )
                    .with_force_new(),
            )
            .with_attribute(
                "compound_aggregation_id",
                Attribute::optional(AttributeType::String)
                    .with_description("UUID of the Compound Aggregation used to create the Pricing.")
                    .with_force_new(),
            )
            .with_attribute(
                "type",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("The type of the pricing.")
                    .with_constraint(Constraint::OneOf(vec![
                        "DEBIT".to_string(),
                        "PRODUCT_CREDIT".to_string(),
                        "GLOBAL_CREDIT".to_string(),
                    ])),
            )
            .with_attribute(
                "segment",
                Attribute::optional(AttributeType::map(AttributeType::String)).with_description(
                    "Specifies the segment value which you are defining a Pricing for using \
                     this call.",
                ),
            )
            .with_attribute(
                "tiers_span_plan",
                Attribute::optional_computed(AttributeType::Bool).with_description(
                    "If TRUE, usage accumulates over the entire period the priced Plan is \
                     active for the account, and is not reset for pricing band rates at the \
                     start of each billing period.",
                ),
            )
            .with_attribute(
                "minimum_spend",
                Attribute::optional(AttributeType::Float64)
                    .with_description(
                        "The minimum spend amount per billing cycle for end customer Accounts \
                         on a Plan to which the Pricing is applied.",
                    )
                    .with_constraint(Constraint::AtLeast(0.0)),
            )
            .with_attribute(
                "minimum_spend_description",
                Attribute::optional(AttributeType::String)
                    .with_description("Minimum spend description (displayed on the bill line item).")
                    .with_constraint(Constraint::LengthAtMost(200)),
            )
            .with_attribute(
                "minimum_spend_bill_in_advance",
                Attribute::optional(AttributeType::Bool).with_description(
                    "When TRUE, minimum spend is billed at the start of each billing period.",
                ),
            )
            .with_attribute(
                "overage_pricing_bands",
                Attribute::optional(AttributeType::list(pricing_band_type())).with_description(
                    "Specify Prepayment/Balance overage pricing in pricing bands for the case \
                     of a Tiered pricing structure.",
                ),
            )
            .with_attribute(
                "plan_id",
                Attribute::optional(AttributeType::String)
                    .with_description("UUID of the Plan the Pricing is created for.")
                    .with_force_new(),
            )
            .with_attribute(
                "plan_template_id",
                Attribute::optional(AttributeType::String)
                    .with_description("UUID of the Plan Template the Pricing is created for.")
                    .with_force_new(),
            )
            .with_attribute(
                "cumulative",
                Attribute::optional_computed(AttributeType::Bool).with_description(
                    "Controls whether charge rates under a set of pricing bands are applied \
                     according to each separate band or at the highest band reached.",
                ),
            )
            .with_attribute(
                "start_date",
                Attribute::required(AttributeType::String).with_description(
                    "The start date (in ISO-8601 format) for when the Pricing starts to be \
                     active for the Plan or Plan Template.",
                ),
            )
            .with_attribute(
                "end_date",
                Attribute::optional(AttributeType::String).with_description(
                    "The end date (in ISO-8601 format) for when the Pricing ceases to be \
                     active for the Plan or Plan Template.",
                ),
            )
            .with_attribute(
                "pricing_bands",
                Attribute::required(AttributeType::list(pricing_band_type()))
                    .with_description("The pricing bands of the pricing."),
            )
            .with_attribute("id", id_attribute())
            .with_attribute("version", version_attribute())
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_create::<PricingModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        generic_read::<PricingModel>(client, PATH, ENTITY, current_state, read).await
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_update::<PricingModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError> {
        generic_delete::<PricingModel>(client, PATH, ENTITY, current_state).await
    }

    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError> {
        generic_read::<PricingModel>(client, PATH, ENTITY, &json!({"id": identifier}), read).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Diagnostics;
    use crate::validation::validate;
    use serde_json::Map;

    #[test]
    fn test_schema_band_constraints() {
        let schema = PricingResource.schema();
        let config = json!({
            "start_date": "2026-01-01T00:00:00Z",
            "plan_id": "plan-1",
            "aggregation_id": "agg-1",
            "pricing_bands": [
                {"lower_limit": 0.0, "fixed_price": 0.0, "unit_price": 0.25}
            ]
        });
        assert!(validate(&schema, &config).is_empty());

        let mut bad = config.clone();
        bad["pricing_bands"][0]["lower_limit"] = json!(-1.0);
        assert_eq!(validate(&schema, &bad).len(), 1);
    }

    #[test]
    fn test_band_key_translation() {
        let model = PricingModel {
            start_date: StringValue::Known("2026-01-01T00:00:00Z".to_string()),
            pricing_bands: Value::Known(vec![PricingBandModel {
                id: StringValue::Null,
                lower_limit: Float64Value::Known(0.0),
                fixed_price: Float64Value::Known(1.5),
                unit_price: Float64Value::Known(0.25),
            }]),
            ..Default::default()
        };

        let mut doc = Map::new();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        write(&mut m, &model);

        assert_eq!(
            doc["pricingBands"],
            json!([{"lowerLimit": 0.0, "fixedPrice": 1.5, "unitPrice": 0.25}])
        );
    }

    #[test]
    fn test_read_skips_empty_overage_bands() {
        let mut doc = json!({
            "pricingBands": [
                {"id": "band-1", "lowerLimit": 0.0, "fixedPrice": 0.0, "unitPrice": 0.25}
            ],
            "overagePricingBands": []
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut model = PricingModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);

        assert!(!diags.has_errors());
        assert!(model.overage_pricing_bands.is_null());
        let bands = model.pricing_bands.known().unwrap();
        assert_eq!(bands[0].id, StringValue::Known("band-1".to_string()));
    }

    #[test]
    fn test_segment_round_trip() {
        let mut doc = json!({"segment": {"region": "eu"}})
            .as_object()
            .cloned()
            .unwrap();

        let mut model = PricingModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);

        assert_eq!(
            model.segment.known().unwrap().get("region"),
            Some(&"eu".to_string())
        );
    }
}
