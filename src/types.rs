//! Common GraphQL types

use async_graphql::{Scalar, ScalarType, Value};
use chrono::{DateTime, Utc};

/// RFC 3339 timestamp scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(pub DateTime<Utc>);

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

#[Scalar]
impl ScalarType for Timestamp {
    fn parse(value: Value) -> async_graphql::InputValueResult<Self> {
        if let Value::String(s) = value {
            Ok(Timestamp(
                DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| format!("Invalid Timestamp: {}", e))?
                    .with_timezone(&Utc),
            ))
        } else {
            Err("Expected string for Timestamp".into())
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trips_through_value() {
        let ts = Timestamp::from(Utc::now());
        let parsed = <Timestamp as ScalarType>::parse(ts.to_value()).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_timestamp_rejects_non_string() {
        assert!(<Timestamp as ScalarType>::parse(Value::from(42)).is_err());
    }
}
