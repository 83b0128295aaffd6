//! Search queries on collections
//!
//! Collections accept `?q=` with a JSON document such as
//!
//! ```json
//! {"filters": [{"name": "world_id", "op": "eq", "val": 1},
//!              {"or": [{"name": "name", "op": "like", "val": "K%"},
//!                      {"name": "isonmap", "op": "eq", "val": false}]}],
//!  "order_by": [{"field": "name", "direction": "desc"}]}
//! ```
//!
//! Filters are evaluated against the JSON form of each result, so every
//! field a client sees can be filtered on. Dotted names reach into nested
//! objects (`game.package`).

use std::cmp::Ordering;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::error::ApiError;

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    #[serde(alias = "==", alias = "equals")]
    Eq,
    #[serde(alias = "!=", alias = "ne", alias = "not_equal_to")]
    Neq,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=", alias = "lte")]
    Le,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=", alias = "gte")]
    Ge,
    In,
    NotIn,
    Like,
    IsNull,
    IsNotNull,
}

/// One node of a filter tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    And {
        and: Vec<Filter>,
    },
    Or {
        or: Vec<Filter>,
    },
    Not {
        not: Box<Filter>,
    },
    Field {
        name: String,
        op: Op,
        #[serde(default)]
        val: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

/// A complete `?q=` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// Return only the first matching result instead of a page
    #[serde(default)]
    pub single: bool,
}

impl SearchQuery {
    /// Parse the `q` parameter; absent or empty means no filtering
    pub fn parse(q: Option<&str>) -> Result<Self, ApiError> {
        match q.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(q) => serde_json::from_str(q)
                .map_err(|e| ApiError::InvalidInput(format!("Invalid search query: {}", e))),
        }
    }

    /// Check the top-level filters, which are implicitly joined with AND
    pub fn matches(&self, item: &Value) -> Result<bool, ApiError> {
        for filter in &self.filters {
            if !filter.matches(item)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Filter and sort a list of JSON results
    pub fn apply(&self, items: Vec<Value>) -> Result<Vec<Value>, ApiError> {
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if self.matches(&item)? {
                kept.push(item);
            }
        }

        if !self.order_by.is_empty() {
            kept.sort_by(|a, b| {
                for order in &self.order_by {
                    let ordering = compare_values(lookup(a, &order.field), lookup(b, &order.field));
                    let ordering = match order.direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        Ok(kept)
    }
}

impl Filter {
    pub fn matches(&self, item: &Value) -> Result<bool, ApiError> {
        match self {
            Filter::And { and } => {
                for filter in and {
                    if !filter.matches(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or { or } => {
                for filter in or {
                    if filter.matches(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not { not } => Ok(!not.matches(item)?),
            Filter::Field { name, op, val } => {
                let field = lookup(item, name);
                apply_op(*op, field, val)
            }
        }
    }
}

/// Resolve a dotted field name; missing fields read as null
fn lookup<'a>(item: &'a Value, name: &str) -> &'a Value {
    name.split('.')
        .try_fold(item, |value, key| value.get(key))
        .unwrap_or(&Value::Null)
}

fn apply_op(op: Op, field: &Value, val: &Value) -> Result<bool, ApiError> {
    Ok(match op {
        Op::Eq => values_equal(field, val),
        Op::Neq => !values_equal(field, val),
        Op::Lt => ordered(field, val) == Some(Ordering::Less),
        Op::Le => matches!(ordered(field, val), Some(Ordering::Less | Ordering::Equal)),
        Op::Gt => ordered(field, val) == Some(Ordering::Greater),
        Op::Ge => matches!(ordered(field, val), Some(Ordering::Greater | Ordering::Equal)),
        Op::In | Op::NotIn => {
            let Value::Array(candidates) = val else {
                return Err(ApiError::InvalidInput(
                    "Operators in and not_in need a list value".to_string(),
                ));
            };
            let found = candidates.iter().any(|c| values_equal(field, c));
            if op == Op::In {
                found
            } else {
                !found
            }
        }
        Op::Like => {
            let Value::String(pattern) = val else {
                return Err(ApiError::InvalidInput(
                    "Operator like needs a string value".to_string(),
                ));
            };
            match field {
                Value::String(s) => like_regex(pattern)?.is_match(s),
                _ => false,
            }
        }
        Op::IsNull => field.is_null(),
        Op::IsNotNull => !field.is_null(),
    })
}

/// Numbers compare by value so `1` equals `1.0`
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Order two values of the same type; mixed types are incomparable
fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order for sorting; nulls and incomparable values go last
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => ordered(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Translate an SQL LIKE pattern (`%`, `_`) into an anchored regex
fn like_regex(pattern: &str) -> Result<Regex, ApiError> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| ApiError::InvalidInput(format!("Invalid like pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kangoo() -> Value {
        json!({
            "id": 4,
            "type": "game_test_Kangoo",
            "name": "Kangoo",
            "world_id": 1,
            "isonmap": true,
            "latitude": 50.5,
            "owner_id": null,
            "game": {"package": "test"}
        })
    }

    fn q(doc: Value) -> SearchQuery {
        SearchQuery::parse(Some(&doc.to_string())).unwrap()
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = SearchQuery::parse(None).unwrap();
        assert!(query.matches(&kangoo()).unwrap());
        assert_eq!(SearchQuery::parse(Some("  ")).unwrap(), SearchQuery::default());
    }

    #[test]
    fn test_field_operators() {
        let item = kangoo();
        let check = |name: &str, op: &str, val: Value| {
            q(json!({"filters": [{"name": name, "op": op, "val": val}]}))
                .matches(&item)
                .unwrap()
        };

        assert!(check("world_id", "eq", json!(1)));
        assert!(check("world_id", "==", json!(1.0)));
        assert!(check("name", "neq", json!("Beer")));
        assert!(check("latitude", "gt", json!(50)));
        assert!(!check("latitude", "lt", json!(50)));
        assert!(check("latitude", "le", json!(50.5)));
        assert!(check("type", "in", json!(["Item", "game_test_Kangoo"])));
        assert!(check("type", "not_in", json!(["Item"])));
        assert!(check("name", "like", json!("Kan%")));
        assert!(check("name", "like", json!("K_ngoo")));
        assert!(!check("name", "like", json!("kan%")));
        assert!(check("owner_id", "is_null", Value::Null));
        assert!(check("missing", "is_null", Value::Null));
        assert!(check("game.package", "eq", json!("test")));
        assert!(!check("name", "gt", json!(3)));
    }

    #[test]
    fn test_boolean_combinations() {
        let item = kangoo();
        let query = q(json!({"filters": [
            {"or": [
                {"name": "name", "op": "eq", "val": "Beer"},
                {"and": [
                    {"name": "isonmap", "op": "eq", "val": true},
                    {"not": {"name": "id", "op": "eq", "val": 5}}
                ]}
            ]}
        ]}));
        assert!(query.matches(&item).unwrap());

        let query = q(json!({"filters": [
            {"name": "world_id", "op": "eq", "val": 1},
            {"name": "isonmap", "op": "eq", "val": false}
        ]}));
        assert!(!query.matches(&item).unwrap());
    }

    #[test]
    fn test_order_by() {
        let items = vec![
            json!({"name": "b", "id": 1}),
            json!({"name": null, "id": 2}),
            json!({"name": "c", "id": 3}),
            json!({"name": "a", "id": 4}),
        ];

        let sorted = q(json!({"order_by": [{"field": "name"}]}))
            .apply(items.clone())
            .unwrap();
        let ids: Vec<_> = sorted.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![4, 1, 3, 2]);

        let sorted = q(json!({"order_by": [{"field": "id", "direction": "desc"}]}))
            .apply(items)
            .unwrap();
        assert_eq!(sorted[0]["id"], 4);
    }

    #[test]
    fn test_invalid_queries() {
        assert!(SearchQuery::parse(Some("not json")).is_err());
        assert!(SearchQuery::parse(Some(r#"{"filters": [{"name": "x", "op": "near"}]}"#)).is_err());

        let query = q(json!({"filters": [{"name": "id", "op": "in", "val": 4}]}));
        assert!(query.matches(&kangoo()).is_err());
    }
}
