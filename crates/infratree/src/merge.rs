//! cascading override of raw configuration
//!
//! [merge] is the only primitive: later tiers are laid over earlier ones, key by key and index by index.
//! Neither input is touched, the result is always a fresh structure.
use crate::tree::{NodeId, Tree};
use crate::value::{Map, Value};

/// Deep merge `over` onto `base`
///
/// - object + object: every key of `base` is kept, every key of `over` is merged in
/// - array + array: merged pairwise by index, the shorter side padded with [Value::Null]
/// - anything else: `over` wins unless it is [Value::Null]
pub fn merge(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Object(base_map), Value::Object(over_map)) => {
            let mut merged = base_map.clone();
            for (key, over_value) in over_map {
                let base_value = base_map.get(key).unwrap_or(&Value::Null);
                merged.insert(key.clone(), merge(base_value, over_value));
            }
            Value::Object(merged)
        }
        (Value::Array(base_list), Value::Array(over_list)) => {
            let len = base_list.len().max(over_list.len());
            Value::Array(
                (0..len)
                    .map(|i| {
                        merge(
                            base_list.get(i).unwrap_or(&Value::Null),
                            over_list.get(i).unwrap_or(&Value::Null),
                        )
                    })
                    .collect(),
            )
        }
        (base, Value::Null) => base.clone(),
        (_, over) => over.clone(),
    }
}

/// Merge a sequence of tiers, lowest precedence first
pub fn merge_all<'a>(tiers: impl IntoIterator<Item = &'a Value>) -> Value {
    tiers
        .into_iter()
        .fold(Value::Null, |merged, tier| merge(&merged, tier))
}

/// Record the pre-merge value of every overridden top-level key on `node`
///
/// Purely diagnostic: resolution never looks at it.
pub fn annotate_base(tree: &mut Tree, node: NodeId, override_config: &Value, base_config: &Value) {
    let Some(keys) = override_config.as_object() else {
        return;
    };

    let annotations: Map = keys
        .keys()
        .filter_map(|key| {
            base_config
                .get(key)
                .filter(|value| !value.is_null())
                .map(|value| (key.clone(), value.clone()))
        })
        .collect();

    tracing::trace!(node = %node, keys = annotations.len(), "annotate base config");
    tree.node_mut(node).base.extend(annotations);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::yaml;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_override() {
        let base = yaml("a: 1\nb: {x: 1, y: 2}");
        let over = yaml("b: {y: 3}");
        assert_eq!(merge(&base, &over), yaml("a: 1\nb: {x: 1, y: 3}"));
    }

    #[test]
    fn merge_with_itself_is_identity() {
        let a = yaml("a: [1, {b: 2}]\nc: {d: text, e: ~}\nf: 1.5");
        assert_eq!(merge(&a, &a), a);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let a = yaml("a: [1, 2]\nc: {d: text}");
        assert_eq!(merge(&a, &Value::Object(Map::new())), a);
    }

    #[test]
    fn keys_only_in_base_survive_and_new_keys_are_added() {
        let base = yaml("keep: 1\nchange: 1");
        let over = yaml("change: 2\nadd: 3");
        let merged = merge(&base, &over);
        assert_eq!(merged, yaml("keep: 1\nchange: 2\nadd: 3"));
    }

    #[test]
    fn null_override_keeps_base() {
        let base = yaml("alarms: {cpu: {threshold: 90}}");
        let over = yaml("alarms: ~");
        assert_eq!(merge(&base, &over), base);
    }

    #[test]
    fn arrays_merge_by_index_and_pad() {
        let base = yaml("- {a: 1}\n- {a: 2}\n- {a: 3}");
        let over = yaml("- {b: 1}");
        assert_eq!(merge(&base, &over), yaml("- {a: 1, b: 1}\n- {a: 2}\n- {a: 3}"));

        let longer = yaml("- x\n- y");
        assert_eq!(merge(&yaml("- a"), &longer), longer);
    }

    #[test]
    fn mismatched_shapes_take_override() {
        assert_eq!(merge(&yaml("{a: 1}"), &yaml("[1]")), yaml("[1]"));
        assert_eq!(merge(&yaml("[1]"), &yaml("text")), yaml("text"));
    }

    #[test]
    fn inputs_are_untouched() {
        let base = yaml("a: {b: 1}");
        let over = yaml("a: {c: 2}");
        let (base_before, over_before) = (base.clone(), over.clone());
        let _ = merge(&base, &over);
        assert_eq!(base, base_before);
        assert_eq!(over, over_before);
    }

    #[test]
    fn three_tiers() {
        let base = yaml("size: small\ncount: 1\ntags: {team: a}");
        let env_default = yaml("count: 2\ntags: {env: prod}");
        let env_region = yaml("size: large");
        assert_eq!(
            merge_all([&base, &env_default, &env_region]),
            yaml("size: large\ncount: 2\ntags: {team: a, env: prod}")
        );
    }
}
