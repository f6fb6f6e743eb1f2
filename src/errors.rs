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

use redis::{ParsingError, RedisError};
use thiserror::Error;

pub type RedissonResult<T> = std::result::Result<T, RedissonError>;

#[derive(Error, Debug)]
pub enum RedissonError {
    #[error("Redis error: {0}")]
    RedisError(RedisError),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Script runtime error: {0}")]
    ScriptRuntime(String),

    #[error("Unknown script digest: {0}")]
    UnknownDigest(String),

    #[error("Broadcast failed on {failed}/{total} nodes: {}", format_node_errors(.errors))]
    PartialBroadcastFailure {
        failed: usize,
        total: usize,
        errors: Vec<(String, String)>,
    },

    #[error("Connection pool error: {0}")]
    PoolError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Async runtime error: {0}")]
    AsyncError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

fn format_node_errors(errors: &[(String, String)]) -> String {
    errors
        .iter()
        .map(|(node, message)| format!("{} => {}", node, message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl RedissonError {
    /// True for failures where the target node could not be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, RedissonError::Connectivity(_) | RedissonError::PoolError(_))
    }

    /// Reclassifies the reply error of `EVAL`/`EVALSHA`: any error code raised while the
    /// script ran (including custom `redis.error_reply` codes) is a script failure.
    pub fn into_script_error(self) -> Self {
        match self {
            RedissonError::RedisError(err) => match err.code() {
                Some(code) if !SERVER_STATE_CODES.contains(&code) => RedissonError::ScriptRuntime(err.to_string()),
                _ => RedissonError::RedisError(err),
            },
            other => other,
        }
    }
}

/// Error codes a server returns about script execution itself.
const SCRIPT_STATE_CODES: &[&str] = &["BUSY", "NOTBUSY", "UNKILLABLE"];

/// Error codes that describe the server or cluster state, whatever command was sent.
const SERVER_STATE_CODES: &[&str] = &[
    "ASK", "CLUSTERDOWN", "CROSSSLOT", "EXECABORT", "LOADING", "MASTERDOWN", "MOVED", "NOAUTH", "NOPERM",
    "NOPROTO", "READONLY", "TRYAGAIN", "WRONGPASS",
];

impl From<RedisError> for RedissonError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            return RedissonError::Connectivity(err.to_string());
        }
        match err.code() {
            Some("NOSCRIPT") => RedissonError::UnknownDigest(err.to_string()),
            Some(code) if SCRIPT_STATE_CODES.contains(&code) => RedissonError::ScriptRuntime(err.to_string()),
            Some(code) if !SERVER_STATE_CODES.contains(&code) && mentions_script(&err) => {
                RedissonError::ScriptRuntime(err.to_string())
            }
            _ => RedissonError::RedisError(err),
        }
    }
}

// Compile and runtime errors carry "script" in their detail ("Error compiling script",
// "@user_script:1").
fn mentions_script(err: &RedisError) -> bool {
    err.detail()
        .map(|detail| detail.to_ascii_lowercase().contains("script"))
        .unwrap_or(false)
}

impl From<deadpool::managed::PoolError<RedisError>> for RedissonError {
    fn from(err: deadpool::managed::PoolError<RedisError>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(e) => RedissonError::from(e),
            other => RedissonError::PoolError(other.to_string()),
        }
    }
}

impl From<deadpool::managed::BuildError> for RedissonError {
    fn from(err: deadpool::managed::BuildError) -> Self {
        RedissonError::PoolError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RedissonError {
    fn from(err: tokio::task::JoinError) -> Self {
        RedissonError::AsyncError(err.to_string())
    }
}

impl From<serde_json::Error> for RedissonError {
    fn from(err: serde_json::Error) -> Self {
        RedissonError::SerializationError(err.to_string())
    }
}

impl From<ParsingError> for RedissonError {
    fn from(err: ParsingError) -> Self {
        RedissonError::DeserializationError(err.to_string())
    }
}
