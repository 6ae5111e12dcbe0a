//! Generic CRUD flows shared by every collection-backed resource.
//!
//! A resource supplies its model type, collection path, and a pair of
//! mapping callbacks; these functions do the rest. The REST response is
//! authoritative: after every create and update the returned document is
//! mapped back over the model before state is re-encoded, so server-side
//! defaults and computed fields land in state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::client::{escape, Client};
use crate::error::ProviderError;
use crate::mapper::Mapper;
use crate::schema::Diagnostics;
use crate::value::StringValue;

/// A typed resource model that round-trips through JSON state.
pub trait ResourceModel: Serialize + DeserializeOwned + Default + Send {
    /// The entity id attribute.
    fn id(&self) -> &StringValue;
}

/// REST → model mapping callback.
pub type ReadFn<M> = fn(&mut Mapper<'_>, &mut M);

/// Model → REST mapping callback.
pub type WriteFn<M> = fn(&mut Mapper<'_>, &M);

/// Create an entity: map the planned model into a request body, POST it,
/// and map the response back into state.
pub async fn generic_create<M: ResourceModel>(
    client: &Client,
    path: &str,
    entity: &str,
    planned_state: &Json,
    read: ReadFn<M>,
    write: WriteFn<M>,
) -> Result<Json, ProviderError> {
    let mut model: M = decode(planned_state)?;

    let mut body = Map::new();
    write_model(&mut body, &model, write, entity)?;

    debug!(entity, path, "creating entity");
    let response = client.post(path, &Json::Object(body)).await?;
    read_response(response, &mut model, read, entity)?;
    encode(&model)
}

/// Read an entity by the id in current state and refresh the model from the
/// response.
pub async fn generic_read<M: ResourceModel>(
    client: &Client,
    path: &str,
    entity: &str,
    current_state: &Json,
    read: ReadFn<M>,
) -> Result<Json, ProviderError> {
    let mut model: M = decode(current_state)?;
    let id = require_id(&model, entity)?;

    debug!(entity, %id, "reading entity");
    let response = client.get(&entity_path(path, &id)).await?;
    read_response(response, &mut model, read, entity)?;
    encode(&model)
}

/// Update an entity.
///
/// The current REST document is fetched first and the planned fields are
/// written over it, so fields this provider does not manage survive the PUT.
pub async fn generic_update<M: ResourceModel>(
    client: &Client,
    path: &str,
    entity: &str,
    planned_state: &Json,
    read: ReadFn<M>,
    write: WriteFn<M>,
) -> Result<Json, ProviderError> {
    let mut model: M = decode(planned_state)?;
    let id = require_id(&model, entity)?;

    debug!(entity, %id, "updating entity");
    let current = client
        .get(&entity_path(path, &id))
        .await?
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();

    let mut body = current;
    write_model(&mut body, &model, write, entity)?;

    let response = client.put(&entity_path(path, &id), &Json::Object(body)).await?;
    read_response(response, &mut model, read, entity)?;
    encode(&model)
}

/// Delete an entity by the id in current state.
pub async fn generic_delete<M: ResourceModel>(
    client: &Client,
    path: &str,
    entity: &str,
    current_state: &Json,
) -> Result<(), ProviderError> {
    let model: M = decode(current_state)?;
    let id = require_id(&model, entity)?;

    debug!(entity, %id, "deleting entity");
    client.delete(&entity_path(path, &id)).await?;
    Ok(())
}

/// Resolve an import identifier to an entity id.
///
/// Tries a GET by id first. On 404 the identifier is treated as a `code` and
/// the collection is paged until a match is found.
pub async fn find_id_by_code(
    client: &Client,
    path: &str,
    identifier: &str,
) -> Result<String, ProviderError> {
    match client.get(&entity_path(path, identifier)).await {
        Ok(doc) => {
            let id = doc
                .as_ref()
                .and_then(|d| d.get("id"))
                .and_then(Json::as_str)
                .unwrap_or(identifier);
            Ok(id.to_string())
        }
        Err(e) if e.is_not_found() => {
            debug!(path, identifier, "id lookup missed, matching by code");
            let items = client.list(path, &[]).await?;
            for item in items {
                if item.get("code").and_then(Json::as_str) == Some(identifier) {
                    if let Some(id) = item.get("id").and_then(Json::as_str) {
                        return Ok(id.to_string());
                    }
                }
            }
            Err(ProviderError::NotFound(format!(
                "no entity at {} with id or code '{}'",
                path, identifier
            )))
        }
        Err(e) => Err(e),
    }
}

fn entity_path(path: &str, id: &str) -> String {
    format!("{}/{}", path, escape(id))
}

fn decode<M: ResourceModel>(state: &Json) -> Result<M, ProviderError> {
    Ok(serde_json::from_value(state.clone())?)
}

fn encode<M: ResourceModel>(model: &M) -> Result<Json, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

fn require_id<M: ResourceModel>(model: &M, entity: &str) -> Result<String, ProviderError> {
    model
        .id()
        .known()
        .cloned()
        .ok_or_else(|| ProviderError::Validation(format!("{} state has no id", entity)))
}

fn write_model<M>(
    body: &mut Map<String, Json>,
    model: &M,
    write: WriteFn<M>,
    entity: &str,
) -> Result<(), ProviderError> {
    let mut diagnostics = Diagnostics::new();
    let mut mapper = Mapper::new(body, &mut diagnostics);
    write(&mut mapper, model);
    if diagnostics.has_errors() {
        return Err(ProviderError::Validation(format!(
            "cannot encode {}: {}",
            entity,
            diagnostics.error_summary()
        )));
    }
    Ok(())
}

fn read_response<M>(
    response: Option<Json>,
    model: &mut M,
    read: ReadFn<M>,
    entity: &str,
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
            entity,
            diagnostics.error_summary()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Widget {
        id: StringValue,
        name: StringValue,
    }

    impl ResourceModel for Widget {
        fn id(&self) -> &StringValue {
            &self.id
        }
    }

    fn widget_read(m: &mut Mapper<'_>, model: &mut Widget) {
        m.to("id", &mut model.id);
        m.to("name", &mut model.name);
    }

    fn offline_client() -> Client {
        // Points nowhere; these tests must fail before any request is sent.
        Client::new(ClientConfig::new("org", "k", "s").with_base_url("http://127.0.0.1:1"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_aborts_on_mapping_diagnostics() {
        fn bad_write(m: &mut Mapper<'_>, _model: &Widget) {
            m.diagnostics().add_error("Cannot map field name", "boom");
        }

        let client = offline_client();
        let err = generic_create::<Widget>(
            &client,
            "/widgets",
            "widget",
            &json!({"name": "w"}),
            widget_read,
            bad_write,
        )
        .await
        .unwrap_err();

        match err {
            ProviderError::Validation(msg) => assert!(msg.contains("Cannot map field name")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_requires_id() {
        let client = offline_client();
        let err = generic_read::<Widget>(&client, "/widgets", "widget", &json!({}), widget_read)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_requires_id() {
        let client = offline_client();
        let err =
            generic_delete::<Widget>(&client, "/widgets", "widget", &json!({"name": "w"}))
                .await
                .unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
    }
}
