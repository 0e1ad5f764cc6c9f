use serde::Serialize;
use serde_json::{Map, Value};

/// Builds a deterministic cache key from request parameters
///
/// Parameter names are sorted lexicographically and joined as `name:JSON(value)`
/// pairs separated by `|`, so logically equal parameter sets map to the same key
/// regardless of construction order.
///
/// Only values are JSON-encoded. Names are written as-is, so a name containing
/// `:` or `|` can collide with a different parameter set; keep names to plain
/// identifiers.
///
/// # Examples
///
/// ```
/// use hearth_crawl::cache::generate_cache_key;
/// use serde_json::json;
///
/// let a = json!({"b": 2, "a": 1});
/// let b = json!({"a": 1, "b": 2});
/// assert_eq!(
///     generate_cache_key(a.as_object().unwrap()),
///     generate_cache_key(b.as_object().unwrap())
/// );
/// assert_eq!(generate_cache_key(b.as_object().unwrap()), "a:1|b:2");
/// ```
pub fn generate_cache_key(params: &Map<String, Value>) -> String {
    let mut pairs: Vec<(&String, &Value)> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .into_iter()
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join("|")
}

/// Builds a cache key from any serializable parameter struct
///
/// Structs and maps are keyed field by field via [`generate_cache_key`]; any
/// other value is keyed by its JSON text.
pub fn cache_key<T: Serialize + ?Sized>(params: &T) -> Result<String, serde_json::Error> {
    match serde_json::to_value(params)? {
        Value::Object(map) => Ok(generate_cache_key(&map)),
        other => Ok(other.to_string()),
    }
}
