//! Data source implementations.
//!
//! Data sources look up existing entities either directly by id or by paging
//! the collection and filtering on name and code. The lookup must resolve to
//! exactly one entity.

use serde_json::Value as Json;

use crate::client::Client;
use crate::error::ProviderError;
use crate::provider::M3terProvider;

pub mod aggregation;
pub mod product;

/// Register every built-in data source on the provider.
pub fn register_all(provider: &mut M3terProvider) {
    provider.register_data_source(Box::new(product::ProductDataSource));
    provider.register_data_source(Box::new(aggregation::AggregationDataSource));
}

/// Page a collection and return the single entity whose name and code match
/// the given filters. A `None` filter matches everything.
pub(crate) async fn find_matching(
    client: &Client,
    path: &str,
    entity: &str,
    name: Option<&str>,
    code: Option<&str>,
) -> Result<Json, ProviderError> {
    let items = client.list(path, &[]).await?;

    let mut matches = items.into_iter().filter(|item| {
        let name_matches = name.map_or(true, |n| item.get("name").and_then(Json::as_str) == Some(n));
        let code_matches = code.map_or(true, |c| item.get("code").and_then(Json::as_str) == Some(c));
        name_matches && code_matches
    });

    let found = matches.next().ok_or_else(|| {
        ProviderError::NotFound(format!("no {} found matching the specified criteria", entity))
    })?;
    if matches.next().is_some() {
        return Err(ProviderError::Validation(format!(
            "multiple {}s found matching the specified criteria",
            entity
        )));
    }
    Ok(found)
}
