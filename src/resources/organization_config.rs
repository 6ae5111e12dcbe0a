//! The `m3ter_organization_config` resource.
//!
//! Organization config is a singleton: there is no create or delete on the
//! API side. Create and update both fetch the current document, overlay the
//! planned fields, and PUT the result back. Delete only stops managing the
//! settings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::client::Client;
use crate::error::ProviderError;
use crate::mapper::{map_object, unmap_object, Mapper, Scalar};
use crate::provider::ProviderResource;
use crate::schema::{Attribute, AttributeType, Constraint, Diagnostics, Schema};
use crate::value::{BoolValue, Float64Value, Int32Value, Int64Value, StringValue, Value};

const PATH: &str = "/organizationconfig";
const ENTITY: &str = "organization config";

const EPOCH_PATTERN: &str = r"\d{4}-\d{2}-\d{2}";
const EPOCH_MESSAGE: &str = "must be in the format YYYY-MM-DD";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CurrencyConversionModel {
    from: StringValue,
    to: StringValue,
    multiplier: Float64Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OrganizationConfigModel {
    timezone: StringValue,
    year_epoch: StringValue,
    month_epoch: StringValue,
    week_epoch: StringValue,
    day_epoch: StringValue,
    currency: StringValue,
    currency_conversions: Value<Vec<CurrencyConversionModel>>,
    days_before_bill_due: Int32Value,
    scheduled_bill_interval: Float64Value,
    standing_charge_bill_in_advance: BoolValue,
    commitment_fee_bill_in_advance: BoolValue,
    minimum_spend_bill_in_advance: BoolValue,
    external_invoice_date: StringValue,
    suppressed_empty_bills: BoolValue,
    consolidate_bills: BoolValue,
    default_statement_definition_id: StringValue,
    sequence_start_number: Int64Value,
    auto_generate_statement_mode: StringValue,
    credit_application_order: Value<Vec<String>>,
    id: StringValue,
    version: Int64Value,
}

fn conversion_to(m: &mut Mapper<'_>, conv: &mut CurrencyConversionModel) {
    m.to("from", &mut conv.from);
    m.to("to", &mut conv.to);
    m.to("multiplier", &mut conv.multiplier);
}

fn conversion_from(m: &mut Mapper<'_>, conv: &CurrencyConversionModel) {
    m.from(&conv.from, "from");
    m.from(&conv.to, "to");
    m.from(&conv.multiplier, "multiplier");
}

// The id never comes from the REST document; it is the organization id the
// client was configured with.
fn read(m: &mut Mapper<'_>, data: &mut OrganizationConfigModel) {
    m.to("version", &mut data.version);
    m.to("timezone", &mut data.timezone);
    m.to("yearEpoch", &mut data.year_epoch);
    m.to("monthEpoch", &mut data.month_epoch);
    m.to("weekEpoch", &mut data.week_epoch);
    m.to("dayEpoch", &mut data.day_epoch);
    m.to("currency", &mut data.currency);
    m.to("daysBeforeBillDue", &mut data.days_before_bill_due);
    m.to("scheduledBillInterval", &mut data.scheduled_bill_interval);
    m.to("standingChargeBillInAdvance", &mut data.standing_charge_bill_in_advance);
    m.to("commitmentFeeBillInAdvance", &mut data.commitment_fee_bill_in_advance);
    m.to("minimumSpendBillInAdvance", &mut data.minimum_spend_bill_in_advance);
    m.to("externalInvoiceDate", &mut data.external_invoice_date);
    m.to("suppressedEmptyBills", &mut data.suppressed_empty_bills);
    m.to("consolidateBills", &mut data.consolidate_bills);
    m.to("defaultStatementDefinitionId", &mut data.default_statement_definition_id);
    m.to("sequenceStartNumber", &mut data.sequence_start_number);
    m.to("autoGenerateStatementMode", &mut data.auto_generate_statement_mode);
    m.list_to("currencyConversions", &mut data.currency_conversions, |elem, diags| {
        map_object(elem, diags, conversion_to)
    });
    m.list_to("creditApplicationOrder", &mut data.credit_application_order, |elem, diags| {
        match String::from_json(elem) {
            Some(s) => Some(s),
            None => {
                diags.add_error(
                    "Cannot map field creditApplicationOrder",
                    "expected a string in credit application order",
                );
                None
            }
        }
    });
}

fn write(m: &mut Mapper<'_>, data: &OrganizationConfigModel) {
    m.from(&data.version, "version");
    m.from(&data.timezone, "timezone");
    m.from(&data.year_epoch, "yearEpoch");
    m.from(&data.month_epoch, "monthEpoch");
    m.from(&data.week_epoch, "weekEpoch");
    m.from(&data.day_epoch, "dayEpoch");
    m.from(&data.currency, "currency");
    m.from(&data.days_before_bill_due, "daysBeforeBillDue");
    m.from(&data.scheduled_bill_interval, "scheduledBillInterval");
    m.from(&data.standing_charge_bill_in_advance, "standingChargeBillInAdvance");
    m.from(&data.commitment_fee_bill_in_advance, "commitmentFeeBillInAdvance");
    m.from(&data.minimum_spend_bill_in_advance, "minimumSpendBillInAdvance");
    m.from(&data.external_invoice_date, "externalInvoiceDate");
    m.from(&data.suppressed_empty_bills, "suppressedEmptyBills");
    m.from(&data.consolidate_bills, "consolidateBills");
    m.from(&data.default_statement_definition_id, "defaultStatementDefinitionId");
    m.from(&data.sequence_start_number, "sequenceStartNumber");
    m.from(&data.auto_generate_statement_mode, "autoGenerateStatementMode");
    m.list_from(&data.currency_conversions, "currencyConversions", |conv, diags| {
        unmap_object(conv, diags, conversion_from)
    });
    m.list_from(&data.credit_application_order, "creditApplicationOrder", |order, _| {
        Json::String(order.clone())
    });
}

fn epoch_attribute(description: &str) -> Attribute {
    Attribute::optional_computed(AttributeType::String)
        .with_description(description)
        .with_constraint(Constraint::Matches {
            pattern: EPOCH_PATTERN.to_string(),
            message: EPOCH_MESSAGE.to_string(),
        })
}

fn currency_conversion_type() -> AttributeType {
    AttributeType::object([
        (
            "from",
            Attribute::required(AttributeType::String)
                .with_description("Currency to convert from. For example: GBP.")
                .with_constraint(Constraint::LengthAtLeast(1)),
        ),
        (
            "to",
            Attribute::required(AttributeType::String)
                .with_description("Currency to convert to. For example: USD.")
                .with_constraint(Constraint::LengthAtLeast(1)),
        ),
        (
            "multiplier",
            Attribute::required(AttributeType::Float64)
                .with_description("Conversion rate between currencies.")
                .with_constraint(Constraint::AtLeast(0.0)),
        ),
    ])
}

/// Manages the singleton Organization configuration.
pub struct OrganizationConfigResource;

impl OrganizationConfigResource {
    async fn apply(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        let mut model: OrganizationConfigModel = serde_json::from_value(planned_state.clone())?;

        debug!(entity = ENTITY, "fetching current document");
        let mut body = client
            .get(PATH)
            .await?
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        let mut diagnostics = Diagnostics::new();
        let mut mapper = Mapper::new(&mut body, &mut diagnostics);
        write(&mut mapper, &model);
        if diagnostics.has_errors() {
            return Err(ProviderError::Validation(format!(
                "cannot encode {}: {}",
                ENTITY,
                diagnostics.error_summary()
            )));
        }

        debug!(entity = ENTITY, "updating organization config");
        let response = client.put(PATH, &Json::Object(body)).await?;
        self.refresh(client, response, &mut model)?;
        Ok(serde_json::to_value(&model)?)
    }

    fn refresh(
        &self,
        client: &Client,
        response: Option<Json>,
        model: &mut OrganizationConfigModel,
    ) -> Result<(), ProviderError> {
        let mut doc = response
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        let mut diagnostics = Diagnostics::new();
        let mut mapper = Mapper::new(&mut doc, &mut diagnostics);
        read(&mut mapper, model);
        if diagnostics.has_errors() {
            return Err(ProviderError::Validation(format!(
                "cannot decode {} response: {}",
                ENTITY,
                diagnostics.error_summary()
            )));
        }
        model.id = StringValue::Known(client.organization_id().to_string());
        Ok(())
    }
}

#[async_trait]
impl ProviderResource for OrganizationConfigResource {
    fn type_name(&self) -> &'static str {
        "m3ter_organization_config"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Organization config resource")
            .with_attribute(
                "timezone",
                Attribute::optional_computed(AttributeType::String).with_description(
                    "Specifies the time zone used for the generated Bills, ensuring alignment \
                     with the local time zone.",
                ),
            )
            .with_attribute(
                "year_epoch",
                epoch_attribute(
                    "Optional setting that defines the billing cycle date for Accounts that \
                     are billed yearly. Defines the date of the first Bill and then acts as \
                     reference for when subsequent Bills are created for the Account.",
                ),
            )
            .with_attribute(
                "month_epoch",
                epoch_attribute(
                    "Optional setting that defines the billing cycle date for Accounts that \
                     are billed monthly. Defines the date of the first Bill and then acts as \
                     reference for when subsequent Bills are created for the Account.",
                ),
            )
            .with_attribute(
                "week_epoch",
                epoch_attribute(
                    "Optional setting that defines the billing cycle date for Accounts that \
                     are billed weekly. Defines the date of the first Bill and then acts as \
                     reference for when subsequent Bills are created for the Account.",
                ),
            )
            .with_attribute(
                "day_epoch",
                epoch_attribute(
                    "Optional setting that defines the billing cycle date for Accounts that \
                     are billed daily. Defines the date of the first Bill and then acts as \
                     reference for when subsequent Bills are created for the Account.",
                ),
            )
            .with_attribute(
                "currency",
                Attribute::optional_computed(AttributeType::String)
                    .with_description(
                        "The currency code for the Organization. For example: USD, GBP, or EUR.",
                    )
                    .with_constraint(Constraint::LengthAtLeast(1)),
            )
            .with_attribute(
                "currency_conversions",
                Attribute::optional_computed(AttributeType::list(currency_conversion_type()))
                    .with_description(
                        "Define currency conversion rates from pricing currency to billing \
                         currency",
                    ),
            )
            .with_attribute(
                "days_before_bill_due",
                Attribute::optional_computed(AttributeType::Int32)
                    .with_description(
                        "The number of days after the Bill generation date that you want to \
                         show on Bills as the due date.",
                    )
                    .with_constraint(Constraint::AtLeast(0.0)),
            )
            .with_attribute(
                "scheduled_bill_interval",
                Attribute::optional_computed(AttributeType::Float64)
                    .with_description("Sets the required interval for updating bills.")
                    .with_constraint(Constraint::NumberOneOf(vec![
                        0.25, 0.5, 1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 0.0,
                    ])),
            )
            .with_attribute(
                "standing_charge_bill_in_advance",
                Attribute::optional_computed(AttributeType::Bool).with_description(
                    "Boolean flag that sets the Standing Charge as a bill in advance.",
                ),
            )
            .with_attribute(
                "commitment_fee_bill_in_advance",
                Attribute::optional_computed(AttributeType::Bool).with_description(
                    "Boolean flag that sets the Commitment Fee as a bill in advance.",
                ),
            )
            .with_attribute(
                "minimum_spend_bill_in_advance",
                Attribute::optional_computed(AttributeType::Bool).with_description(
                    "Boolean flag that sets the Minimum Spend as a bill in advance.",
                ),
            )
            .with_attribute(
                "external_invoice_date",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("The date on which the external invoice is generated.")
                    .with_constraint(Constraint::OneOf(vec![
                        "FIRST_DAY_OF_NEXT_PERIOD".to_string(),
                        "LAST_DAY_OF_CURRENT_PERIOD".to_string(),
                    ])),
            )
            .with_attribute(
                "suppressed_empty_bills",
                Attribute::optional_computed(AttributeType::Bool)
                    .with_description("Boolean flag that suppresses the generation of empty Bills."),
            )
            .with_attribute(
                "consolidate_bills",
                Attribute::optional_computed(AttributeType::Bool)
                    .with_description("Boolean flag that consolidates Bills."),
            )
            .with_attribute(
                "default_statement_definition_id",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("The default Statement Definition ID."),
            )
            .with_attribute(
                "sequence_start_number",
                Attribute::optional_computed(AttributeType::Int64)
                    .with_description("The sequence start number."),
            )
            .with_attribute(
                "auto_generate_statement_mode",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("The auto generate statement mode.")
                    .with_constraint(Constraint::OneOf(vec![
                        "JSON_AND_CSV".to_string(),
                        "JSON".to_string(),
                        "NONE".to_string(),
                    ])),
            )
            .with_attribute(
                "credit_application_order",
                Attribute::optional_computed(AttributeType::list(AttributeType::String))
                    .with_description("The credit application order.")
                    .with_constraint(Constraint::ElementsOneOf(vec![
                        "PREPAYMENT".to_string(),
                        "BALANCE".to_string(),
                    ])),
            )
            .with_attribute(
                "id",
                Attribute::computed(AttributeType::String)
                    .with_description("Organization identifier"),
            )
            .with_attribute(
                "version",
                Attribute::computed(AttributeType::Int64)
                    .with_description("Organization version"),
            )
    }

    async fn create(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        self.apply(client, planned_state).await
    }

    async fn read(&self, client: &Client, current_state: &Json) -> Result<Json, ProviderError> {
        let mut model: OrganizationConfigModel = serde_json::from_value(current_state.clone())?;

        debug!(entity = ENTITY, "reading organization config");
        let response = client.get(PATH).await?;
        self.refresh(client, response, &mut model)?;
        Ok(serde_json::to_value(&model)?)
    }

    async fn update(&self, client: &Client, planned_state: &Json) -> Result<Json, ProviderError> {
        self.apply(client, planned_state).await
    }

    async fn delete(&self, _client: &Client, _current_state: &Json) -> Result<(), ProviderError> {
        // The organization config cannot be deleted; it just stops being
        // managed.
        Ok(())
    }

    async fn import(&self, client: &Client, _identifier: &str) -> Result<Json, ProviderError> {
        self.read(client, &Json::Object(Map::new())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_schema_constraints() {
        let schema = OrganizationConfigResource.schema();

        let config = json!({
            "timezone": "UTC",
            "month_epoch": "2026-01-01",
            "currency": "USD",
            "scheduled_bill_interval": 0.5,
            "credit_application_order": ["PREPAYMENT", "BALANCE"],
            "currency_conversions": [{"from": "GBP", "to": "USD", "multiplier": 1.3}]
        });
        assert!(validate(&schema, &config).is_empty());

        let mut bad = config.clone();
        bad["month_epoch"] = json!("January 2026");
        assert_eq!(validate(&schema, &bad).len(), 1);

        let mut bad = config.clone();
        bad["scheduled_bill_interval"] = json!(5.0);
        assert_eq!(validate(&schema, &bad).len(), 1);

        let mut bad = config.clone();
        bad["credit_application_order"] = json!(["CREDIT"]);
        assert_eq!(validate(&schema, &bad).len(), 1);
    }

    #[test]
    fn test_write_overlays_fetched_document() {
        let model = OrganizationConfigModel {
            currency: StringValue::Known("USD".to_string()),
            days_before_bill_due: Int32Value::Known(30),
            ..Default::default()
        };

        // Simulates a fetched document carrying fields this provider does
        // not manage.
        let mut doc = json!({"currency": "GBP", "monthlyBillingMode": "CALENDAR"})
            .as_object()
            .cloned()
            .unwrap();

        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        write(&mut m, &model);

        assert_eq!(doc["currency"], json!("USD"));
        assert_eq!(doc["daysBeforeBillDue"], json!(30));
        assert_eq!(doc["monthlyBillingMode"], json!("CALENDAR"));
    }

    #[test]
    fn test_read_maps_conversions_and_order() {
        let mut doc = json!({
            "version": 4,
            "currencyConversions": [{"from": "GBP", "to": "USD", "multiplier": 1.3}],
            "creditApplicationOrder": ["PREPAYMENT", "BALANCE"]
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut model = OrganizationConfigModel::default();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);
        read(&mut m, &mut model);

        assert!(!diags.has_errors());
        assert_eq!(model.version, Int64Value::Known(4));
        let conversions = model.currency_conversions.known().unwrap();
        assert_eq!(conversions[0].multiplier, Float64Value::Known(1.3));
        assert_eq!(
            model.credit_application_order.known().unwrap(),
            &vec!["PREPAYMENT".to_string(), "BALANCE".to_string()]
        );
    }
}
