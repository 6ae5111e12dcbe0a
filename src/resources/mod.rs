//! Resource handlers for the m3ter entity types.

use crate::provider::M3terProvider;
use crate::schema::{Attribute, AttributeType, Constraint};

pub mod aggregation;
pub mod meter;
pub mod notification;
pub mod organization_config;
pub mod plan;
pub mod pricing;
pub mod product;
pub mod webhook_destination;

/// Entity codes must not contain control characters or start/end with
/// whitespace.
pub(crate) const ENTITY_CODE_PATTERN: &str =
    r"^([^\p{Cc}\s])|([^\p{Cc}\s][[^\p{Cc}\s] ]*[^\p{Cc}\s])$";
pub(crate) const ENTITY_CODE_MESSAGE: &str =
    "The code must not contain control characters or start/end with whitespace.";

/// Field codes are identifier-like: a letter, underscore, or dollar sign
/// followed by letters, digits, underscores, or dollar signs.
pub(crate) const FIELD_CODE_PATTERN: &str = r"^[\p{L}_$][\p{L}_$0-9]*$";
pub(crate) const FIELD_CODE_MESSAGE: &str =
    "The code must start with a letter or underscore and contain only letters, numbers, and underscores.";

/// Register every built-in resource.
pub fn register_all(provider: &mut M3terProvider) {
    provider.register_resource(Box::new(product::ProductResource));
    provider.register_resource(Box::new(plan::PlanResource));
    provider.register_resource(Box::new(meter::MeterResource));
    provider.register_resource(Box::new(aggregation::AggregationResource));
    provider.register_resource(Box::new(pricing::PricingResource));
    provider.register_resource(Box::new(notification::NotificationResource));
    provider.register_resource(Box::new(webhook_destination::WebhookDestinationResource));
    provider.register_resource(Box::new(organization_config::OrganizationConfigResource));
}

/// The computed `id` attribute shared by every entity.
pub(crate) fn id_attribute() -> Attribute {
    Attribute::computed(AttributeType::String).with_description("The UUID of the entity.")
}

/// The computed `version` attribute shared by every entity.
pub(crate) fn version_attribute() -> Attribute {
    Attribute::computed(AttributeType::Int64).with_description("The version number.")
}

/// The required entity `code` attribute with its standard constraints.
pub(crate) fn code_attribute(description: &str) -> Attribute {
    Attribute::required(AttributeType::String)
        .with_description(description)
        .with_constraint(Constraint::LengthBetween(1, 80))
        .with_constraint(Constraint::Matches {
            pattern: ENTITY_CODE_PATTERN.to_string(),
            message: ENTITY_CODE_MESSAGE.to_string(),
        })
}

/// The required `custom_fields` attribute shared by most entities.
pub(crate) fn custom_fields_attribute() -> Attribute {
    Attribute::required(AttributeType::Dynamic).with_description(
        "User defined fields enabling you to attach custom data. The value for a custom \
         field can be either a string or a number.",
    )
}
