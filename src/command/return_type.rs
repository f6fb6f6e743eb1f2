/*
 *
 *  *
 *  *      Copyright (c) 2018-2025, SnackCloud All rights reserved.
 *  *
 *  *   Redistribution and use in source and binary forms, with or without
 *  *   modification, are permitted provided that the following conditions are met:
 *  *
 *  *   Redistributions of source code must retain the above copyright notice,
 *  *   this list of conditions and the following disclaimer.
 *  *   Redistributions in binary form must reproduce the above copyright
 *  *   notice, this list of conditions and the following disclaimer in the
 *  *   documentation and/or other materials provided with the distribution.
 *  *   Neither the name of the www.snackcloud.cn developer nor the names of its
 *  *   contributors may be used to endorse or promote products derived from
 *  *   this software without specific prior written permission.
 *  *   Author: SnackCloud
 *  *
 *
 */
use redis::{FromRedisValue, Value};
use serde::{Deserialize, Serialize};

use crate::{RedissonError, RedissonResult};

/// How a script reply is shaped before it is decoded into the caller's type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnType {
    Boolean,
    Integer,
    Multi,
    Status,
    Value,
    MapValue,
    MapValueList,
}

impl ReturnType {
    pub fn convert(&self, value: Value) -> RedissonResult<Value> {
        match self {
            ReturnType::Boolean => to_boolean(value),
            ReturnType::Integer => to_integer(value),
            ReturnType::Multi => Ok(to_multi(value)),
            ReturnType::Status => to_status(value),
            ReturnType::Value => Ok(value),
            ReturnType::MapValue => to_map(value),
            ReturnType::MapValueList => match to_multi(value) {
                Value::Array(items) => items
                    .into_iter()
                    .map(to_map)
                    .collect::<RedissonResult<Vec<_>>>()
                    .map(Value::Array),
                other => Err(unexpected("map list", &other)),
            },
        }
    }

    /// Coerces `value` and decodes it into `T`.
    pub fn decode<T: FromRedisValue>(&self, value: Value) -> RedissonResult<T> {
        let converted = self.convert(value)?;
        Ok(T::from_redis_value(converted)?)
    }
}

fn unexpected(expected: &str, value: &Value) -> RedissonError {
    RedissonError::DeserializationError(format!("expected {} reply, got {:?}", expected, value))
}

fn to_boolean(value: Value) -> RedissonResult<Value> {
    let flag = match &value {
        Value::Int(n) => *n != 0,
        Value::Nil => false,
        Value::Boolean(b) => *b,
        Value::Okay => true,
        Value::SimpleString(s) => s == "OK" || s == "1",
        Value::BulkString(bytes) => bytes.as_slice() == b"1",
        _ => return Err(unexpected("boolean", &value)),
    };
    Ok(Value::Int(flag as i64))
}

fn to_integer(value: Value) -> RedissonResult<Value> {
    match value {
        Value::Int(_) | Value::Nil => Ok(value),
        Value::SimpleString(ref s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| unexpected("integer", &value)),
        Value::BulkString(ref bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(Value::Int)
            .ok_or_else(|| unexpected("integer", &value)),
        other => Err(unexpected("integer", &other)),
    }
}

fn to_multi(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Set(items) => Value::Array(items),
        Value::Nil => Value::Array(Vec::new()),
        other => Value::Array(vec![other]),
    }
}

fn to_status(value: Value) -> RedissonResult<Value> {
    match value {
        Value::Okay => Ok(Value::SimpleString("OK".to_string())),
        Value::SimpleString(_) => Ok(value),
        Value::BulkString(bytes) => String::from_utf8(bytes)
            .map(Value::SimpleString)
            .map_err(|e| RedissonError::DeserializationError(e.to_string())),
        other => Err(unexpected("status", &other)),
    }
}

fn to_map(value: Value) -> RedissonResult<Value> {
    match value {
        Value::Map(_) => Ok(value),
        Value::Nil => Ok(Value::Map(Vec::new())),
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(RedissonError::DeserializationError(format!(
                    "map reply has an odd number of elements: {}",
                    items.len()
                )));
            }
            let mut pairs = Vec::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                pairs.push((k, v));
            }
            Ok(Value::Map(pairs))
        }
        other => Err(unexpected("map", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn test_boolean_from_integer_reply() {
        assert!(ReturnType::Boolean.decode::<bool>(Value::Int(1)).unwrap());
        assert!(!ReturnType::Boolean.decode::<bool>(Value::Int(0)).unwrap());
        assert!(!ReturnType::Boolean.decode::<bool>(Value::Nil).unwrap());
        assert!(ReturnType::Boolean.decode::<bool>(Value::Okay).unwrap());
    }

    #[test]
    fn test_integer_parses_bulk_string() {
        assert_eq!(ReturnType::Integer.decode::<i64>(bulk("42")).unwrap(), 42);
        assert_eq!(ReturnType::Integer.decode::<Option<i64>>(Value::Nil).unwrap(), None);
        assert!(ReturnType::Integer.convert(bulk("forty")).is_err());
    }

    #[test]
    fn test_multi_wraps_nil_and_scalars() {
        let empty: Vec<String> = ReturnType::Multi.decode(Value::Nil).unwrap();
        assert!(empty.is_empty());
        let single: Vec<String> = ReturnType::Multi.decode(bulk("a")).unwrap();
        assert_eq!(single, vec!["a".to_string()]);
        let many: Vec<i64> = ReturnType::Multi
            .decode(Value::Set(vec![Value::Int(1), Value::Int(2)]))
            .unwrap();
        assert_eq!(many, vec![1, 2]);
    }

    #[test]
    fn test_status_normalizes_okay() {
        let status: String = ReturnType::Status.decode(Value::Okay).unwrap();
        assert_eq!(status, "OK");
        assert!(ReturnType::Status.convert(Value::Int(3)).is_err());
    }

    #[test]
    fn test_map_value_from_flat_array() {
        let reply = Value::Array(vec![bulk("a"), bulk("1"), bulk("b"), bulk("2")]);
        let map: HashMap<String, String> = ReturnType::MapValue.decode(reply).unwrap();
        assert_eq!(map.get("a").map(String::as_str), Some("1"));
        assert_eq!(map.get("b").map(String::as_str), Some("2"));

        let odd = Value::Array(vec![bulk("a")]);
        assert!(ReturnType::MapValue.convert(odd).is_err());
    }

    #[test]
    fn test_map_value_list() {
        let reply = Value::Array(vec![
            Value::Array(vec![bulk("k"), bulk("v")]),
            Value::Map(vec![(bulk("x"), bulk("y"))]),
        ]);
        let maps: Vec<HashMap<String, String>> = ReturnType::MapValueList.decode(reply).unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0]["k"], "v");
        assert_eq!(maps[1]["x"], "y");
    }

    #[test]
    fn test_value_passes_through() {
        let reply = Value::Array(vec![Value::Int(1), bulk("two")]);
        assert_eq!(ReturnType::Value.convert(reply.clone()).unwrap(), reply);
    }
}
