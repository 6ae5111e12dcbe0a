//! The `m3ter_plan` resource.

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
use crate::value::{BoolValue, CustomFields, Float64Value, Int64Value, StringValue};

use super::{code_attribute, custom_fields_attribute, id_attribute, version_attribute};

const PATH: &str = "/plans";
const ENTITY: &str = "plan";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct PlanModel {
    name: StringValue,
    code: StringValue,
    custom_fields: CustomFields,
    plan_template_id: StringValue,
    standing_charge: Float64Value,
    standing_charge_description: StringValue,
    bespoke: BoolValue,
    minimum_spend: Float64Value,
    minimum_spend_description: StringValue,
    standing_charge_bill_in_advance: BoolValue,
    minimum_spend_bill_in_advance: BoolValue,
    account_id: StringValue,
    id: StringValue,
    version: Int64Value,
}

impl ResourceModel for PlanModel {
    fn id(&self) -> &StringValue {
        &self.id
    }
}

fn read(m: &mut Mapper<'_>, data: &mut PlanModel) {
    m.to("id", &mut data.id);
    m.to("version", &mut data.version);
    m.to("name", &mut data.name);
    m.to("code", &mut data.code);
    m.to("planTemplateId", &mut data.plan_template_id);
    m.to("standingCharge", &mut data.standing_charge);
    m.to("standingChargeDescription", &mut data.standing_charge_description);
    m.to("bespoke", &mut data.bespoke);
    m.to("minimumSpend", &mut data.minimum_spend);
    m.to("minimumSpendDescription", &mut data.minimum_spend_description);
    m.to("standingChargeBillInAdvance", &mut data.standing_charge_bill_in_advance);
    m.to("minimumSpendBillInAdvance", &mut data.minimum_spend_bill_in_advance);
    m.to("accountId", &mut data.account_id);
    m.custom_fields_to("customFields", &mut data.custom_fields);
}

fn write(m: &mut Mapper<'_>, data: &PlanModel) {
    m.from(&data.id, "id");
    m.from(&data.version, "version");
    m.from(&data.name, "name");
    m.from(&data.code, "code");
    m.from(&data.plan_template_id, "planTemplateId");
    m.from(&data.standing_charge, "standingCharge");
    m.from(&data.standing_charge_description, "standingChargeDescription");
    m.from(&data.bespoke, "bespoke");
    m.from(&data.minimum_spend, "minimumSpend");
    m.from(&data.minimum_spend_description, "minimumSpendDescription");
    m.from(&data.standing_charge_bill_in_advance, "standingChargeBillInAdvance");
    m.from(&data.minimum_spend_bill_in_advance, "minimumSpendBillInAdvance");
    m.from(&data.account_id, "accountId");
    m.custom_fields_from(&data.custom_fields, "customFields");
}

/// Manages a Plan.
pub struct PlanResource;

#[async_trait]
impl ProviderResource for PlanResource {
    fn type_name(&self) -> &'static str {
        "m3ter_plan"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Plan resource")
            .with_attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .with_description("Descriptive name for the Plan.")
                    .with_constraint(Constraint::LengthBetween(1, 200)),
            )
            .with_attribute(
                "code",
                code_attribute("Unique short code reference for the Plan."),
            )
            .with_attribute("custom_fields", custom_fields_attribute())
            .with_attribute(
                "plan_template_id",
                Attribute::required(AttributeType::String)
                    .with_description("UUID of the PlanTemplate the Plan belongs to.")
                    .with_force_new(),
            )
            .with_attribute(
                "standing_charge",
                Attribute::optional(AttributeType::Float64)
                    .with_description(
                        "The standing charge applied to bills for end customers. This is prorated.",
                    )
                    .with_constraint(Constraint::AtLeast(0.0)),
            )
            .with_attribute(
                "standing_charge_description",
                Attribute::optional(AttributeType::String)
                    .with_description("Standing charge description (displayed on the bill line item).")
                    .with_constraint(Constraint::LengthAtMost(200)),
            )
            .with_attribute(
                "bespoke",
                Attribute::optional_computed(AttributeType::Bool)
                    .with_description(
                        "TRUE/FALSE flag indicating whether the plan is a custom/bespoke Plan \
                         for a particular Account.",
                    )
                    .with_force_new(),
            )
            .with_attribute(
                "minimum_spend",
                Attribute::optional(AttributeType::Float64)
                    .with_description(
                        "The product minimum spend amount per billing cycle for end customer \
                         Accounts on a priced Plan.",
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
                "standing_charge_bill_in_advance",
                Attribute::optional(AttributeType::Bool).with_description(
                    "When TRUE, standing charge is billed at the start of each billing period.",
                ),
            )
            .with_attribute(
                "minimum_spend_bill_in_advance",
                Attribute::optional(AttributeType::Bool).with_description(
                    "When TRUE, minimum spend is billed at the start of each billing period.",
                ),
            )
            .with_attribute(
                "account_id",
                Attribute::optional(AttributeType::String)
                    .with_description(
                        "Used to specify an Account for which the Plan will be a custom/bespoke Plan.",
                    )
                    .with_force_new(),
            )
            .with_attribute("id", id_attribute())
            .with_attribute("version", version_attribute())
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_create::<PlanModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        generic_read::<PlanModel>(client, PATH, ENTITY, current_state, read).await
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        generic_update::<PlanModel>(client, PATH, ENTITY, planned_state, read, write).await
    }

    async fn delete(&self, client: &Client, current_state: &Json) -> Result<(), ProviderError> {
        generic_delete::<PlanModel>(client, PATH, ENTITY, current_state).await
    }

    async fn import(&self, client: &Client, identifier: &str) -> Result<Json, ProviderError> {
        generic_read::<PlanModel>(client, PATH, ENTITY, &json!({"id": identifier}), read).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Diagnostics;
    use crate::validation::validate;
    use serde_json::Map;

    #[test]
    fn test_schema_constraints() {
        let schema = PlanResource.schema();
        let base = json!({
            "name": "Starter",
            "code": "starter",
            "custom_fields": {},
            "plan_template_id": "tmpl-1"
        });
        assert!(validate(&schema, &base).is_empty());

        let mut bad = base.clone();
        bad["standing_charge"] = json!(-1.0);
        assert_eq!(validate(&schema, &bad).len(), 1);
    }

    #[test]
    fn test_camel_case_round_trip() {
        let model = PlanModel {
            name: StringValue::Known("Starter".to_string()),
            plan_template_id: StringValue::Known("tmpl-1".to_string()),
            standing_charge_bill_in_advance: BoolValue::Known(true),
            ..Default::default()
        };

        let mut doc = Map::new();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        write(&mut m, &model);

        assert_eq!(
            Json::Object(doc),
            json!({
                "name": "Starter",
                "planTemplateId": "tmpl-1",
                "standingChargeBillInAdvance": true,
                "customFields": {}
            })
        );
    }
}
