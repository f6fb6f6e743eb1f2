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
mod callback;
mod redis_executor;
mod stats;
#[cfg(test)]
pub(crate) mod testing;

pub use callback::*;
pub use redis_executor::*;
pub use stats::*;

use async_trait::async_trait;
use std::sync::Arc;

use crate::{RedisCommand, RedissonResult};

/// Executes command descriptors against one node, a routed node or every node.
///
/// Implementations are shared through `Arc<dyn CommandExecutor>` and called concurrently.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs `command` on a read-capable node owning `key` (any node when `None`).
    async fn read_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        args: Vec<Vec<u8>>,
    ) -> RedissonResult<redis::Value>;

    /// Runs `command` on the primary owning `key` (any primary when `None`).
    async fn write_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        args: Vec<Vec<u8>>,
    ) -> RedissonResult<redis::Value>;

    /// Evaluates on a read-capable node. Routes by `key`, else by the first script key.
    async fn eval_read_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        script: &str,
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
    ) -> RedissonResult<redis::Value>;

    /// Evaluates on the primary. Routes by `key`, else by the first script key.
    async fn eval_write_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        script: &str,
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
    ) -> RedissonResult<redis::Value>;

    /// Sends `command` to every primary and reduces the replies through `callback`.
    async fn write_all_async(
        &self,
        command: RedisCommand,
        args: Vec<Vec<u8>>,
        callback: Arc<dyn SlotCallback>,
    ) -> RedissonResult<redis::Value>;
}

/// Routing key of an evaluation: the explicit key, or the first script key.
pub fn eval_routing_key<'a>(key: Option<&'a str>, keys: &'a [Vec<u8>]) -> Option<&'a [u8]> {
    key.map(str::as_bytes)
        .or_else(|| keys.first().map(Vec::as_slice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_wins() {
        let keys = vec![b"first".to_vec()];
        assert_eq!(eval_routing_key(Some("explicit"), &keys), Some(&b"explicit"[..]));
    }

    #[test]
    fn test_falls_back_to_first_key() {
        let keys = vec![b"first".to_vec(), b"second".to_vec()];
        assert_eq!(eval_routing_key(None, &keys), Some(&b"first"[..]));
        assert_eq!(eval_routing_key(None, &[]), None);
    }
}
