//! Layer merging with deletion support.
//!
//! A configuration layer is applied to the mapping built so far as an
//! [`Overlay`]: a key-wise description of what the layer does to each key.
//! Mappings are merged recursively, every other value (arrays included) is
//! replaced wholesale, and keys marked [`OverlayEntry::Omit`] are removed from
//! the result as if they had never been specified.
//!
//! In TOML sources the deletion marker is written as the reserved inline table
//! `{ "$omit" = true }`:
//!
//! ```toml
//! [config]
//! command_prefix = { "$omit" = true }
//! ```

use std::collections::BTreeMap;

use ortho_config::serde_json::{Map, Value};

/// A resolved configuration mapping. Never contains a deletion marker.
pub type ConfigMapping = Map<String, Value>;

/// The key of the reserved marker table that requests deletion.
pub const OMIT_MARKER: &str = "$omit";

/// What an overlay does to a single key.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEntry {
    /// Remove the key from the result.
    Omit,
    /// Merge the nested overlay into the mapping stored under the key.
    Merge(Overlay),
    /// Replace whatever is stored under the key.
    Replace(Value),
}

/// The override side of a merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    entries: BTreeMap<String, OverlayEntry>,
}

impl Overlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an overlay from a parsed configuration source.
    ///
    /// Tables become [`OverlayEntry::Merge`], the reserved `{ "$omit" = true }`
    /// table becomes [`OverlayEntry::Omit`], and everything else becomes
    /// [`OverlayEntry::Replace`].
    #[must_use]
    pub fn from_mapping(mapping: &ConfigMapping) -> Self {
        let entries = mapping
            .iter()
            .map(|(key, value)| (key.clone(), OverlayEntry::from_value(value)))
            .collect();
        Self { entries }
    }

    /// Sets the entry for `key`, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, entry: OverlayEntry) -> Option<OverlayEntry> {
        self.entries.insert(key.into(), entry)
    }

    /// Marks `key` for replacement with `value`.
    pub fn replace(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), OverlayEntry::Replace(value));
    }

    /// Marks `key` for deletion.
    pub fn omit(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into(), OverlayEntry::Omit);
    }

    /// Returns the entry for `key`, if the overlay touches it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OverlayEntry> {
        self.entries.get(key)
    }

    /// Returns `true` if the overlay touches no key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of keys the overlay touches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &OverlayEntry)> {
        self.entries.iter()
    }
}

impl OverlayEntry {
    fn from_value(value: &Value) -> Self {
        match value {
            _ if is_omit_marker(value) => Self::Omit,
            Value::Object(map) => Self::Merge(Overlay::from_mapping(map)),
            other => Self::Replace(other.clone()),
        }
    }
}

/// Returns `true` if `value` is the reserved deletion marker table.
#[must_use]
pub fn is_omit_marker(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.len() == 1 && map.get(OMIT_MARKER) == Some(&Value::Bool(true)))
}

/// Applies `overlay` to `base`, returning the merged mapping.
///
/// - `Omit` removes the key
/// - `Merge` recurses into a base mapping, or into an empty one when the base
///   value is absent or not a mapping
/// - `Replace` swaps the value wholesale; arrays are never concatenated
#[must_use]
pub fn merge(mut base: ConfigMapping, overlay: &Overlay) -> ConfigMapping {
    for (key, entry) in overlay.iter() {
        match entry {
            OverlayEntry::Omit => {
                base.remove(key);
            }
            OverlayEntry::Replace(value) => {
                base.insert(key.clone(), value.clone());
            }
            OverlayEntry::Merge(nested) => {
                let nested_base = match base.remove(key) {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                base.insert(key.clone(), Value::Object(merge(nested_base, nested)));
            }
        }
    }
    base
}

/// Applies several overlays in order, later ones taking precedence.
#[must_use]
pub fn merge_all<'a>(
    base: ConfigMapping,
    overlays: impl IntoIterator<Item = &'a Overlay>,
) -> ConfigMapping {
    overlays.into_iter().fold(base, merge)
}

/// Combines two overlays into one with the same effect as applying them in
/// sequence.
///
/// For every base `b`: `merge(merge(b, first), second) == merge(b, compose(first, second))`.
/// A key deleted or replaced by `first` and then merged into by `second`
/// composes to a `Replace`, so nothing of the base value survives.
#[must_use]
pub fn compose(first: &Overlay, second: &Overlay) -> Overlay {
    let mut entries = first.entries.clone();
    for (key, later) in &second.entries {
        let combined = match (entries.remove(key), later) {
            (_, OverlayEntry::Omit) => OverlayEntry::Omit,
            (_, OverlayEntry::Replace(value)) => OverlayEntry::Replace(value.clone()),
            (None, OverlayEntry::Merge(nested)) => OverlayEntry::Merge(nested.clone()),
            (Some(OverlayEntry::Merge(earlier)), OverlayEntry::Merge(nested)) => {
                OverlayEntry::Merge(compose(&earlier, nested))
            }
            (Some(OverlayEntry::Replace(Value::Object(map))), OverlayEntry::Merge(nested)) => {
                OverlayEntry::Replace(Value::Object(merge(map, nested)))
            }
            (Some(OverlayEntry::Replace(_) | OverlayEntry::Omit), OverlayEntry::Merge(nested)) => {
                OverlayEntry::Replace(Value::Object(merge(Map::new(), nested)))
            }
        };
        entries.insert(key.clone(), combined);
    }
    Overlay { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ortho_config::serde_json::json;
    use rstest::rstest;

    fn mapping(value: Value) -> ConfigMapping {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn overlay(value: Value) -> Overlay {
        Overlay::from_mapping(&mapping(value))
    }

    fn omit() -> Value {
        json!({ "$omit": true })
    }

    #[rstest]
    fn merge_simple_objects() {
        let result = merge(mapping(json!({"a": 1, "b": 2})), &overlay(json!({"b": 3, "c": 4})));
        assert_eq!(result, mapping(json!({"a": 1, "b": 3, "c": 4})));
    }

    #[rstest]
    fn merge_nested_objects() {
        let base = mapping(json!({
            "authentication": {"token": "file", "client_id": 1},
            "auto_migrate": true
        }));
        let result = merge(base, &overlay(json!({"authentication": {"token": "local"}})));
        assert_eq!(
            result,
            mapping(json!({
                "authentication": {"token": "local", "client_id": 1},
                "auto_migrate": true
            }))
        );
    }

    #[rstest]
    fn arrays_replaced_not_concatenated() {
        let result = merge(
            mapping(json!({"owner_ids": [1, 2, 3]})),
            &overlay(json!({"owner_ids": [4]})),
        );
        assert_eq!(result, mapping(json!({"owner_ids": [4]})));
    }

    #[rstest]
    fn omit_deletes_key() {
        let result = merge(mapping(json!({"a": 1, "b": 2})), &overlay(json!({"a": omit()})));
        assert_eq!(result, mapping(json!({"b": 2})));
    }

    #[rstest]
    fn omit_of_absent_key_is_a_no_op() {
        let result = merge(mapping(json!({"b": 2})), &overlay(json!({"a": omit()})));
        assert_eq!(result, mapping(json!({"b": 2})));
    }

    #[rstest]
    fn nested_omit_deletes_only_the_nested_key() {
        let result = merge(
            mapping(json!({"authentication": {"token": "t", "client_id": 7}})),
            &overlay(json!({"authentication": {"client_id": omit()}})),
        );
        assert_eq!(result, mapping(json!({"authentication": {"token": "t"}})));
    }

    #[rstest]
    fn omit_marker_never_reaches_merged_mapping() {
        let result = merge(Map::new(), &overlay(json!({"x": {"y": omit()}})));
        assert_eq!(result, mapping(json!({"x": {}})));
    }

    #[rstest]
    #[case(json!({ "$omit": true }), true)]
    #[case(json!({ "$omit": false }), false)]
    #[case(json!({ "$omit": true, "other": 1 }), false)]
    #[case(json!("..."), false)]
    #[case(Value::Null, false)]
    fn omit_marker_detection(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_omit_marker(&value), expected);
    }

    #[rstest]
    fn overlay_replaces_primitive_with_object() {
        let result = merge(
            mapping(json!({"value": 42})),
            &overlay(json!({"value": {"nested": true}})),
        );
        assert_eq!(result, mapping(json!({"value": {"nested": true}})));
    }

    #[rstest]
    fn overlay_replaces_object_with_primitive() {
        let result = merge(
            mapping(json!({"value": {"nested": true}})),
            &overlay(json!({"value": 42})),
        );
        assert_eq!(result, mapping(json!({"value": 42})));
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"a": 1, "b": [1, 2], "c": {"d": {"e": "f"}}}))]
    #[case(json!({"authentication": {"token": "t"}, "extensions": [{"name": "x"}]}))]
    fn merge_with_itself_is_identity(#[case] value: Value) {
        let base = mapping(value);
        let result = merge(base.clone(), &Overlay::from_mapping(&base));
        assert_eq!(result, base);
    }

    #[rstest]
    #[case(
        json!({"a": 1, "b": {"c": 2, "d": 3}}),
        json!({"b": {"c": 20}}),
        json!({"b": {"d": 30}, "e": 5})
    )]
    #[case(
        json!({"a": 1, "b": {"c": 2}}),
        json!({"a": { "$omit": true }}),
        json!({"a": 10})
    )]
    #[case(
        json!({"a": 1, "b": {"c": 2, "d": 3}}),
        json!({"b": { "$omit": true }}),
        json!({"b": {"c": 9}})
    )]
    #[case(
        json!({"b": {"c": 2, "d": 3}}),
        json!({"b": 7}),
        json!({"b": {"c": 9}})
    )]
    #[case(
        json!({"b": {"c": 2, "d": 3}}),
        json!({"b": [1, 2]}),
        json!({"b": {"x": { "$omit": true }}})
    )]
    #[case(
        json!({"b": {"c": 2}}),
        json!({"b": {"c": { "$omit": true }, "d": 1}}),
        json!({"b": { "$omit": true }})
    )]
    fn composition_matches_sequential_application(
        #[case] base: Value,
        #[case] first: Value,
        #[case] second: Value,
    ) {
        let base_map = mapping(base);
        let first_overlay = overlay(first);
        let second_overlay = overlay(second);

        let sequential = merge(merge(base_map.clone(), &first_overlay), &second_overlay);
        let composed = merge(base_map, &compose(&first_overlay, &second_overlay));

        assert_eq!(sequential, composed);
    }

    #[rstest]
    fn deleted_then_merged_key_does_not_resurrect_base_content() {
        let base = mapping(json!({"b": {"c": 2, "d": 3}}));
        let composed = compose(
            &overlay(json!({"b": omit()})),
            &overlay(json!({"b": {"c": 9}})),
        );
        assert_eq!(
            composed.get("b"),
            Some(&OverlayEntry::Replace(json!({"c": 9})))
        );
        assert_eq!(merge(base, &composed), mapping(json!({"b": {"c": 9}})));
    }

    #[rstest]
    fn built_overlay_matches_parsed_overlay() {
        let mut built = Overlay::new();
        built.replace("command_prefix", json!("?"));
        built.omit("owner_ids");
        let previous = built.insert("intents", OverlayEntry::Replace(json!(1)));

        assert!(previous.is_none());
        assert_eq!(
            built,
            overlay(json!({"command_prefix": "?", "owner_ids": omit(), "intents": 1}))
        );
    }

    #[rstest]
    fn merge_all_applies_layers_in_order() {
        let layers = [
            overlay(json!({"a": 1})),
            overlay(json!({"b": 2})),
            overlay(json!({"a": 3, "c": 4})),
        ];
        let result = merge_all(Map::new(), &layers);
        assert_eq!(result, mapping(json!({"a": 3, "b": 2, "c": 4})));
    }
}
