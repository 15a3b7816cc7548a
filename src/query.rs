use crate::error::Error;
use crate::CredxResult;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A WQL restriction over credential tags.
///
/// ```json
/// {"$or": [{"schema_name": "gvt"}, {"issuer_did": {"$in": ["a", "b"]}}]}
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Query {
    /// Every sub-query holds
    And(Vec<Query>),
    /// At least one sub-query holds
    Or(Vec<Query>),
    /// The sub-query does not hold
    Not(Box<Query>),
    /// Tag equals value
    Eq(String, String),
    /// Tag differs from value
    Neq(String, String),
    /// Tag equals one of the values
    In(String, Vec<String>),
}

impl Query {
    /// Parse a query from its JSON form
    pub fn from_value(value: &Value) -> CredxResult<Self> {
        match value {
            Value::Object(map) => Self::parse_object(map),
            _ => Err(Error::InvalidInput("query must be a JSON object".to_string())),
        }
    }

    /// Render the query as JSON
    pub fn to_value(&self) -> Value {
        match self {
            Self::And(qs) => json_op("$and", Value::Array(qs.iter().map(Self::to_value).collect())),
            Self::Or(qs) => json_op("$or", Value::Array(qs.iter().map(Self::to_value).collect())),
            Self::Not(q) => json_op("$not", q.to_value()),
            Self::Eq(tag, v) => json_op(tag, Value::String(v.clone())),
            Self::Neq(tag, v) => json_op(tag, json_op("$neq", Value::String(v.clone()))),
            Self::In(tag, vs) => json_op(
                tag,
                json_op(
                    "$in",
                    Value::Array(vs.iter().cloned().map(Value::String).collect()),
                ),
            ),
        }
    }

    fn parse_object(map: &Map<String, Value>) -> CredxResult<Self> {
        let mut operators = map
            .iter()
            .map(|(key, value)| Self::parse_entry(key, value))
            .collect::<CredxResult<Vec<Query>>>()?;
        if operators.len() == 1 {
            Ok(operators.remove(0))
        } else {
            Ok(Self::And(operators))
        }
    }

    fn parse_entry(key: &str, value: &Value) -> CredxResult<Self> {
        match (key, value) {
            ("$and", Value::Array(values)) => Ok(Self::And(Self::parse_list(values)?)),
            ("$or", Value::Array(values)) => Ok(Self::Or(Self::parse_list(values)?)),
            ("$not", Value::Object(map)) => Ok(Self::Not(Box::new(Self::parse_object(map)?))),
            (tag, Value::String(v)) if !tag.starts_with('$') => {
                Ok(Self::Eq(tag.to_string(), v.clone()))
            }
            (tag, Value::Object(map)) if !tag.starts_with('$') && map.len() == 1 => {
                match map.iter().next() {
                    Some((op, Value::String(v))) if op == "$neq" => {
                        Ok(Self::Neq(tag.to_string(), v.clone()))
                    }
                    Some((op, Value::String(v))) if op == "$eq" => {
                        Ok(Self::Eq(tag.to_string(), v.clone()))
                    }
                    Some((op, Value::Array(vs))) if op == "$in" => {
                        let values = vs
                            .iter()
                            .map(|v| {
                                v.as_str().map(String::from).ok_or_else(|| {
                                    Error::InvalidInput("`$in` values must be strings".to_string())
                                })
                            })
                            .collect::<CredxResult<Vec<String>>>()?;
                        Ok(Self::In(tag.to_string(), values))
                    }
                    _ => Err(Error::InvalidInput(format!(
                        "unsupported operator for tag `{}`",
                        tag
                    ))),
                }
            }
            _ => Err(Error::InvalidInput(format!(
                "unsupported query operator `{}`",
                key
            ))),
        }
    }

    fn parse_list(values: &[Value]) -> CredxResult<Vec<Self>> {
        values.iter().map(Self::from_value).collect()
    }
}

fn json_op(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(s)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        Self::from_value(&value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_nested() {
        let q: Query = serde_json::from_value(json!({
            "$or": [
                {"schema_name": "gvt", "issuer_did": {"$neq": "x"}},
                {"cred_def_id": {"$in": ["a", "b"]}},
                {"$not": {"schema_version": "1.0"}}
            ]
        }))
        .unwrap();
        match q {
            Query::Or(ref qs) => {
                assert_eq!(qs.len(), 3);
                assert!(matches!(qs[0], Query::And(ref inner) if inner.len() == 2));
                assert_eq!(
                    qs[1],
                    Query::In("cred_def_id".to_string(), vec!["a".to_string(), "b".to_string()])
                );
                assert!(matches!(qs[2], Query::Not(_)));
            }
            _ => panic!("expected $or"),
        }
        let again: Query = serde_json::from_value(serde_json::to_value(&q).unwrap()).unwrap();
        assert_eq!(again, q);
    }

    #[test]
    fn rejects_unknown_operators() {
        assert!(serde_json::from_value::<Query>(json!({"age": {"$gt": "5"}})).is_err());
        assert!(serde_json::from_value::<Query>(json!({"$xor": []})).is_err());
        assert!(serde_json::from_value::<Query>(json!(["schema_name"])).is_err());
    }
}
