//! Bidirectional mapping between typed models and REST documents.
//!
//! Every resource defines a model struct of [`Value`] fields plus a pair of
//! callbacks built on [`Mapper`]: `read` moves fields from a REST response
//! into the model, `write` moves model fields into a request body. The same
//! callbacks serve create, read, and update, which keeps the per-entity code
//! down to the field list.
//!
//! Conversion failures never panic. They are recorded on the shared
//! [`Diagnostics`] sink and the surrounding operation aborts before any HTTP
//! call is made.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use crate::schema::Diagnostics;
use crate::value::{CustomFieldValue, CustomFields, Value};

/// A scalar that can cross the model/REST boundary.
pub trait Scalar: Sized {
    /// The name used in mismatch diagnostics.
    const KIND: &'static str;

    /// Extract the scalar from a JSON value, if the types line up.
    fn from_json(v: &Json) -> Option<Self>;

    /// Convert the scalar into a JSON value.
    fn to_json(&self) -> Json;
}

impl Scalar for String {
    const KIND: &'static str = "string";

    fn from_json(v: &Json) -> Option<Self> {
        v.as_str().map(str::to_string)
    }

    fn to_json(&self) -> Json {
        Json::String(self.clone())
    }
}

impl Scalar for i32 {
    const KIND: &'static str = "int32";

    fn from_json(v: &Json) -> Option<Self> {
        v.as_i64().and_then(|i| i32::try_from(i).ok())
    }

    fn to_json(&self) -> Json {
        Json::from(*self)
    }
}

impl Scalar for i64 {
    const KIND: &'static str = "int64";

    fn from_json(v: &Json) -> Option<Self> {
        v.as_i64()
    }

    fn to_json(&self) -> Json {
        Json::from(*self)
    }
}

impl Scalar for f64 {
    const KIND: &'static str = "float64";

    fn from_json(v: &Json) -> Option<Self> {
        v.as_f64()
    }

    fn to_json(&self) -> Json {
        Json::from(*self)
    }
}

impl Scalar for bool {
    const KIND: &'static str = "bool";

    fn from_json(v: &Json) -> Option<Self> {
        v.as_bool()
    }

    fn to_json(&self) -> Json {
        Json::Bool(*self)
    }
}

/// Moves fields between a model and a mutable REST document.
pub struct Mapper<'a> {
    doc: &'a mut Map<String, Json>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Mapper<'a> {
    /// Create a mapper over a REST document and a diagnostics sink.
    pub fn new(doc: &'a mut Map<String, Json>, diagnostics: &'a mut Diagnostics) -> Self {
        Self { doc, diagnostics }
    }

    /// The diagnostics sink, for callbacks that report their own errors.
    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    /// REST → model: copy the scalar under `key` into `target`.
    ///
    /// A missing key leaves `target` untouched, JSON null maps to
    /// [`Value::Null`], and a type mismatch records an error diagnostic.
    pub fn to<T: Scalar>(&mut self, key: &str, target: &mut Value<T>) {
        match self.doc.get(key) {
            None => {}
            Some(Json::Null) => *target = Value::Null,
            Some(v) => match T::from_json(v) {
                Some(scalar) => *target = Value::Known(scalar),
                None => self.diagnostics.add_error(
                    format!("Cannot map field {}", key),
                    format!("Expected {}, got {}", T::KIND, type_name(v)),
                ),
            },
        }
    }

    /// Model → REST: insert the scalar under `key`.
    ///
    /// Null and unknown values are skipped so the API applies its own
    /// defaults.
    pub fn from<T: Scalar>(&mut self, source: &Value<T>, key: &str) {
        if let Value::Known(v) = source {
            self.doc.insert(key.to_string(), v.to_json());
        }
    }

    /// REST → model for a list attribute, converting each element through
    /// `convert`. The closure returns `None` after recording a diagnostic
    /// for elements it cannot convert.
    pub fn list_to<T>(
        &mut self,
        key: &str,
        target: &mut Value<Vec<T>>,
        mut convert: impl FnMut(&Json, &mut Diagnostics) -> Option<T>,
    ) {
        match self.doc.get(key) {
            None => {}
            Some(Json::Null) => *target = Value::Null,
            Some(Json::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                let mut failed = false;
                for item in items {
                    match convert(item, self.diagnostics) {
                        Some(v) => out.push(v),
                        None => failed = true,
                    }
                }
                if !failed {
                    *target = Value::Known(out);
                }
            }
            Some(v) => self.diagnostics.add_error(
                format!("Cannot map field {}", key),
                format!("Expected list, got {}", type_name(v)),
            ),
        }
    }

    /// Model → REST for a list attribute, converting each element through
    /// `convert`. A null list writes JSON null so the remote value is
    /// cleared; only unknown lists are skipped.
    pub fn list_from<T>(
        &mut self,
        source: &Value<Vec<T>>,
        key: &str,
        mut convert: impl FnMut(&T, &mut Diagnostics) -> Json,
    ) {
        match source {
            Value::Known(items) => {
                let out: Vec<Json> = items
                    .iter()
                    .map(|item| convert(item, self.diagnostics))
                    .collect();
                self.doc.insert(key.to_string(), Json::Array(out));
            }
            Value::Null => {
                self.doc.insert(key.to_string(), Json::Null);
            }
            Value::Unknown => {}
        }
    }

    /// REST → model for a map-of-strings attribute.
    pub fn string_map_to(&mut self, key: &str, target: &mut Value<BTreeMap<String, String>>) {
        match self.doc.get(key) {
            None => {}
            Some(Json::Null) => *target = Value::Null,
            Some(Json::Object(obj)) => {
                let mut out = BTreeMap::new();
                let mut failed = false;
                for (name, value) in obj {
                    match value.as_str() {
                        Some(s) => {
                            out.insert(name.clone(), s.to_string());
                        }
                        None => {
                            self.diagnostics.add_error(
                                format!("Cannot map field {}", key),
                                format!("Expected a string for key {}", name),
                            );
                            failed = true;
                        }
                    }
                }
                if !failed {
                    *target = Value::Known(out);
                }
            }
            Some(v) => self.diagnostics.add_error(
                format!("Cannot map field {}", key),
                format!("Expected object, got {}", type_name(v)),
            ),
        }
    }

    /// Model → REST for a map-of-strings attribute.
    pub fn string_map_from(&mut self, source: &Value<BTreeMap<String, String>>, key: &str) {
        if let Value::Known(map) = source {
            let obj: Map<String, Json> = map
                .iter()
                .map(|(k, v)| (k.clone(), Json::String(v.clone())))
                .collect();
            self.doc.insert(key.to_string(), Json::Object(obj));
        }
    }

    /// Insert a raw JSON value under `key`.
    pub fn set(&mut self, key: &str, value: Json) {
        self.doc.insert(key.to_string(), value);
    }

    /// Map into a nested object under `key`, preserving any fields the
    /// document already carries there.
    pub fn nested(&mut self, key: &str, f: impl FnOnce(&mut Mapper<'_>)) {
        let mut obj = match self.doc.remove(key) {
            Some(Json::Object(o)) => o,
            _ => Map::new(),
        };
        {
            let mut mapper = Mapper::new(&mut obj, self.diagnostics);
            f(&mut mapper);
        }
        self.doc.insert(key.to_string(), Json::Object(obj));
    }

    /// REST → model for the `customFields` object.
    ///
    /// An absent or empty object leaves the model value untouched, so a
    /// configuration that never set custom fields stays null. Values other
    /// than strings and numbers record an error diagnostic.
    pub fn custom_fields_to(&mut self, key: &str, target: &mut CustomFields) {
        let obj = match self.doc.get(key) {
            None | Some(Json::Null) => return,
            Some(Json::Object(obj)) => obj,
            Some(v) => {
                self.diagnostics.add_error(
                    format!("Cannot map field {}", key),
                    format!("Expected object, got {}", type_name(v)),
                );
                return;
            }
        };
        if obj.is_empty() && !target.is_known() {
            return;
        }

        let mut out = BTreeMap::new();
        let mut failed = false;
        for (name, value) in obj {
            match value {
                Json::String(s) => {
                    out.insert(name.clone(), CustomFieldValue::String(s.clone()));
                }
                Json::Number(n) => match n.as_f64() {
                    Some(f) => {
                        out.insert(name.clone(), CustomFieldValue::Number(f));
                    }
                    None => {
                        self.diagnostics.add_error(
                            format!("Cannot map custom field {}", name),
                            "Expected a number representable as float64",
                        );
                        failed = true;
                    }
                },
                other => {
                    self.diagnostics.add_error(
                        format!("Cannot map custom field {}", name),
                        format!("Expected string or number, got {}", type_name(other)),
                    );
                    failed = true;
                }
            }
        }
        if !failed {
            *target = Value::Known(out);
        }
    }

    /// Model → REST for the `customFields` object. A known value is always
    /// written, including an empty map, and a null value writes an empty
    /// object, so cleared custom fields are removed remotely. Only unknown
    /// values are skipped.
    pub fn custom_fields_from(&mut self, source: &CustomFields, key: &str) {
        match source {
            Value::Known(fields) => {
                let mut obj = Map::new();
                for (name, value) in fields {
                    let json = match value {
                        CustomFieldValue::String(s) => Json::String(s.clone()),
                        CustomFieldValue::Number(n) => Json::from(*n),
                    };
                    obj.insert(name.clone(), json);
                }
                self.doc.insert(key.to_string(), Json::Object(obj));
            }
            Value::Null => {
                self.doc.insert(key.to_string(), Json::Object(Map::new()));
            }
            Value::Unknown => {}
        }
    }
}

/// Convert a REST object element into a model value through a nested mapper.
///
/// Helper for object-list attributes: clones the element, runs `map` over a
/// mapper for it, and returns the result unless diagnostics were recorded.
pub fn map_object<T: Default>(
    element: &Json,
    diagnostics: &mut Diagnostics,
    map: impl FnOnce(&mut Mapper<'_>, &mut T),
) -> Option<T> {
    let obj = match element {
        Json::Object(obj) => obj,
        other => {
            diagnostics.add_error(
                "Cannot map list element",
                format!("Expected object, got {}", type_name(other)),
            );
            return None;
        }
    };
    let mut doc = obj.clone();
    let before = diagnostics.entries().len();
    let mut model = T::default();
    let mut mapper = Mapper::new(&mut doc, diagnostics);
    map(&mut mapper, &mut model);
    if diagnostics.entries().len() == before {
        Some(model)
    } else {
        None
    }
}

/// Convert a model value into a REST object element through a nested mapper.
pub fn unmap_object<T>(
    element: &T,
    diagnostics: &mut Diagnostics,
    map: impl FnOnce(&mut Mapper<'_>, &T),
) -> Json {
    let mut doc = Map::new();
    let mut mapper = Mapper::new(&mut doc, diagnostics);
    map(&mut mapper, element);
    Json::Object(doc)
}

fn type_name(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{BoolValue, Float64Value, Int64Value, StringValue};
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Map<String, Json> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_to_scalars() {
        let mut doc = doc(json!({
            "name": "Storage",
            "quantity": 3,
            "rate": 0.25,
            "archived": false
        }));
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);

        let mut name = StringValue::Unknown;
        let mut quantity = Int64Value::Unknown;
        let mut rate = Float64Value::Unknown;
        let mut archived = BoolValue::Unknown;
        m.to("name", &mut name);
        m.to("quantity", &mut quantity);
        m.to("rate", &mut rate);
        m.to("archived", &mut archived);

        assert!(!diags.has_errors());
        assert_eq!(name, Value::Known("Storage".to_string()));
        assert_eq!(quantity, Value::Known(3));
        assert_eq!(rate, Value::Known(0.25));
        assert_eq!(archived, Value::Known(false));
    }

    #[test]
    fn test_to_missing_key_leaves_target() {
        let mut doc = doc(json!({}));
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);

        let mut name = StringValue::Known("planned".to_string());
        m.to("name", &mut name);
        assert_eq!(name, Value::Known("planned".to_string()));
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_to_null_maps_to_null() {
        let mut doc = doc(json!({"name": null}));
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);

        let mut name = StringValue::Known("planned".to_string());
        m.to("name", &mut name);
        assert!(name.is_null());
    }

    #[test]
    fn test_to_type_mismatch_records_diagnostic() {
        let mut doc = doc(json!({"quantity": "three"}));
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut doc, &mut diags);

        let mut quantity = Int64Value::Null;
        m.to("quantity", &mut quantity);

        assert!(diags.has_errors());
        assert!(quantity.is_null());
        assert!(diags.entries()[0].summary.contains("quantity"));
    }

    #[test]
    fn test_from_skips_null_and_unknown() {
        let mut target = Map::new();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut target, &mut diags);

        m.from(&StringValue::Known("Storage".to_string()), "name");
        m.from(&StringValue::Null, "code");
        m.from(&Int64Value::Unknown, "version");

        assert_eq!(Json::Object(target), json!({"name": "Storage"}));
    }

    #[test]
    fn test_list_round_trip_with_objects() {
        let mut source = doc(json!({
            "dataFields": [
                {"code": "calls", "category": "MEASURE"},
                {"code": "region", "category": "WHO"}
            ]
        }));
        let mut diags = Diagnostics::new();

        #[derive(Debug, Default, PartialEq)]
        struct Field {
            code: StringValue,
            category: StringValue,
        }

        let mut fields: Value<Vec<Field>> = Value::Null;
        let mut m = Mapper::new(&mut source, &mut diags);
        m.list_to("dataFields", &mut fields, |elem, diags| {
            map_object(elem, diags, |m, f: &mut Field| {
                m.to("code", &mut f.code);
                m.to("category", &mut f.category);
            })
        });

        assert!(!diags.has_errors());
        let known = fields.known().unwrap();
        assert_eq!(known.len(), 2);
        assert_eq!(known[0].code, Value::Known("calls".to_string()));

        let mut out = Map::new();
        let mut m = Mapper::new(&mut out, &mut diags);
        m.list_from(&fields, "dataFields", |f, diags| {
            unmap_object(f, diags, |m, f: &Field| {
                m.from(&f.code, "code");
                m.from(&f.category, "category");
            })
        });
        assert_eq!(
            Json::Object(out),
            json!({"dataFields": [
                {"code": "calls", "category": "MEASURE"},
                {"code": "region", "category": "WHO"}
            ]})
        );
    }

    #[test]
    fn test_list_to_bad_element_records_diagnostic() {
        let mut source = doc(json!({"segmentedFields": ["a", 7]}));
        let mut diags = Diagnostics::new();

        let mut fields: Value<Vec<String>> = Value::Null;
        let mut m = Mapper::new(&mut source, &mut diags);
        m.list_to("segmentedFields", &mut fields, |elem, diags| {
            match String::from_json(elem) {
                Some(s) => Some(s),
                None => {
                    diags.add_error("Cannot map segmented field", "expected a string");
                    None
                }
            }
        });

        assert!(diags.has_errors());
        assert!(fields.is_null());
    }

    #[test]
    fn test_custom_fields_to() {
        let mut source = doc(json!({"customFields": {"tier": "gold", "limit": 5}}));
        let mut diags = Diagnostics::new();

        let mut fields = CustomFields::Null;
        let mut m = Mapper::new(&mut source, &mut diags);
        m.custom_fields_to("customFields", &mut fields);

        assert!(!diags.has_errors());
        let known = fields.known().unwrap();
        assert_eq!(
            known.get("tier"),
            Some(&CustomFieldValue::String("gold".to_string()))
        );
        assert_eq!(known.get("limit"), Some(&CustomFieldValue::Number(5.0)));
    }

    #[test]
    fn test_custom_fields_to_empty_leaves_null() {
        let mut source = doc(json!({"customFields": {}}));
        let mut diags = Diagnostics::new();

        let mut fields = CustomFields::Null;
        let mut m = Mapper::new(&mut source, &mut diags);
        m.custom_fields_to("customFields", &mut fields);

        assert!(fields.is_null());
    }

    #[test]
    fn test_custom_fields_to_rejects_nested_values() {
        let mut source = doc(json!({"customFields": {"nested": {"a": 1}}}));
        let mut diags = Diagnostics::new();

        let mut fields = CustomFields::Null;
        let mut m = Mapper::new(&mut source, &mut diags);
        m.custom_fields_to("customFields", &mut fields);

        assert!(diags.has_errors());
        assert!(fields.is_null());
    }

    #[test]
    fn test_custom_fields_from() {
        let mut fields = BTreeMap::new();
        fields.insert("tier".to_string(), CustomFieldValue::String("gold".into()));
        fields.insert("limit".to_string(), CustomFieldValue::Number(5.0));

        let mut target = Map::new();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut target, &mut diags);
        m.custom_fields_from(&Value::Known(fields), "customFields");

        assert_eq!(
            Json::Object(target),
            json!({"customFields": {"tier": "gold", "limit": 5.0}})
        );
    }

    #[test]
    fn test_string_map_round_trip() {
        let mut source = doc(json!({"segment": {"region": "eu", "tier": "gold"}}));
        let mut diags = Diagnostics::new();

        let mut segment: Value<BTreeMap<String, String>> = Value::Null;
        let mut m = Mapper::new(&mut source, &mut diags);
        m.string_map_to("segment", &mut segment);

        assert!(!diags.has_errors());
        assert_eq!(segment.known().unwrap().get("region"), Some(&"eu".to_string()));

        let mut out = Map::new();
        let mut m = Mapper::new(&mut out, &mut diags);
        m.string_map_from(&segment, "segment");
        assert_eq!(
            Json::Object(out),
            json!({"segment": {"region": "eu", "tier": "gold"}})
        );
    }

    #[test]
    fn test_string_map_to_rejects_non_strings() {
        let mut source = doc(json!({"segment": {"region": 7}}));
        let mut diags = Diagnostics::new();

        let mut segment: Value<BTreeMap<String, String>> = Value::Null;
        let mut m = Mapper::new(&mut source, &mut diags);
        m.string_map_to("segment", &mut segment);

        assert!(diags.has_errors());
        assert!(segment.is_null());
    }

    #[test]
    fn test_nested_preserves_existing_fields() {
        let mut target = doc(json!({"credentials": {"destination": "kept"}}));
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut target, &mut diags);

        m.nested("credentials", |m| {
            m.from(&StringValue::Known("key-1".to_string()), "apiKey");
            m.set("type", json!("M3TER_SIGNED_REQUEST"));
        });

        assert_eq!(
            Json::Object(target),
            json!({"credentials": {
                "destination": "kept",
                "apiKey": "key-1",
                "type": "M3TER_SIGNED_REQUEST"
            }})
        );
    }

    #[test]
    fn test_custom_fields_from_writes_empty_map() {
        let mut target = Map::new();
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut target, &mut diags);

        m.custom_fields_from(&Value::Known(BTreeMap::new()), "customFields");
        m.custom_fields_from(&CustomFields::Null, "cleared");
        m.custom_fields_from(&CustomFields::Unknown, "skipped");

        assert_eq!(
            Json::Object(target),
            json!({"customFields": {}, "cleared": {}})
        );
    }

    #[test]
    fn test_null_values_clear_fetched_fields() {
        // Update flows fetch the remote document and write planned fields
        // over it. A field removed from the configuration is Null and must
        // overwrite what was fetched, or the removal never reaches the API.
        let mut target = doc(json!({
            "segments": [{"region": "eu"}],
            "customFields": {"tier": "gold"}
        }));
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut target, &mut diags);

        let segments: Value<Vec<BTreeMap<String, String>>> = Value::Null;
        m.list_from(&segments, "segments", |_, _| Json::Null);
        m.custom_fields_from(&CustomFields::Null, "customFields");

        assert!(!diags.has_errors());
        assert_eq!(
            Json::Object(target),
            json!({"segments": null, "customFields": {}})
        );
    }

    #[test]
    fn test_unknown_values_leave_fetched_fields() {
        let mut target = doc(json!({"segments": [{"region": "eu"}]}));
        let mut diags = Diagnostics::new();
        let mut m = Mapper::new(&mut target, &mut diags);

        let segments: Value<Vec<BTreeMap<String, String>>> = Value::Unknown;
        m.list_from(&segments, "segments", |_, _| Json::Null);

        assert_eq!(Json::Object(target), json!({"segments": [{"region": "eu"}]}));
    }
}
