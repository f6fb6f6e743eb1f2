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
use std::sync::Arc;

use redis::{FromRedisValue, ToRedisArgs};

use crate::{
    to_args, AckCallback, CommandExecutor, DigestCallback, Mode, RedisCommand, RedissonError, RedissonResult,
    ReturnType,
};

/// Asynchronous Lua scripting: `EVAL`, `EVALSHA` and the `SCRIPT` family.
///
/// Every operation takes an optional routing key. With a key the command goes to
/// the node owning it; without one, `SCRIPT LOAD`, `SCRIPT KILL` and `SCRIPT FLUSH`
/// are sent to every primary. Replies are coerced by [`ReturnType`] and decoded
/// into the caller's type. Failures come straight from the executor; an unknown
/// digest is reported as [`RedissonError::UnknownDigest`] and never retried with `EVAL`.
#[derive(Clone)]
pub struct AsyncRScript {
    executor: Arc<dyn CommandExecutor>,
}

impl AsyncRScript {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    /// Caches `script` server side and returns its SHA1 digest.
    pub async fn script_load(&self, key: Option<&str>, script: &str) -> RedissonResult<String> {
        let args = vec![script.as_bytes().to_vec()];
        let reply = match key {
            Some(_) => self.executor.write_async(key, RedisCommand::SCRIPT_LOAD, args).await?,
            None => {
                self.executor
                    .write_all_async(RedisCommand::SCRIPT_LOAD, args, Arc::new(DigestCallback::new()))
                    .await?
            }
        };
        Ok(String::from_redis_value(reply)?)
    }

    /// Runs a script by body (`by_sha == false`) or by digest.
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate<T, K, V>(
        &self,
        key: Option<&str>,
        mode: Mode,
        script: &str,
        return_type: ReturnType,
        keys: &[K],
        values: &[V],
        by_sha: bool,
    ) -> RedissonResult<T>
    where
        T: FromRedisValue,
        K: ToRedisArgs,
        V: ToRedisArgs,
    {
        let command = if by_sha { RedisCommand::EVALSHA } else { RedisCommand::EVAL };
        let keys = to_args(keys);
        let values = to_args(values);
        let reply = match mode {
            Mode::ReadOnly => self.executor.eval_read_async(key, command, script, keys, values).await?,
            Mode::ReadWrite => self.executor.eval_write_async(key, command, script, keys, values).await?,
        };
        return_type.decode(reply)
    }

    pub async fn eval<T, K, V>(
        &self,
        key: Option<&str>,
        mode: Mode,
        script: &str,
        return_type: ReturnType,
        keys: &[K],
        values: &[V],
    ) -> RedissonResult<T>
    where
        T: FromRedisValue,
        K: ToRedisArgs,
        V: ToRedisArgs,
    {
        self.evaluate(key, mode, script, return_type, keys, values, false).await
    }

    pub async fn eval_sha<T, K, V>(
        &self,
        key: Option<&str>,
        mode: Mode,
        sha_digest: &str,
        return_type: ReturnType,
        keys: &[K],
        values: &[V],
    ) -> RedissonResult<T>
    where
        T: FromRedisValue,
        K: ToRedisArgs,
        V: ToRedisArgs,
    {
        self.evaluate(key, mode, sha_digest, return_type, keys, values, true).await
    }

    pub async fn script_kill(&self, key: Option<&str>) -> RedissonResult<()> {
        match key {
            Some(_) => self.executor.write_async(key, RedisCommand::SCRIPT_KILL, vec![]).await?,
            None => {
                self.executor
                    .write_all_async(RedisCommand::SCRIPT_KILL, vec![], Arc::new(AckCallback))
                    .await?
            }
        };
        Ok(())
    }

    /// One flag per digest, in input order.
    pub async fn script_exists(&self, key: Option<&str>, sha_digests: &[&str]) -> RedissonResult<Vec<bool>> {
        if sha_digests.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self
            .executor
            .write_async(key, RedisCommand::SCRIPT_EXISTS, to_args(sha_digests))
            .await?;
        let flags: Vec<bool> = ReturnType::Multi.decode(reply)?;
        if flags.len() != sha_digests.len() {
            return Err(RedissonError::DeserializationError(format!(
                "SCRIPT EXISTS returned {} flags for {} digests",
                flags.len(),
                sha_digests.len()
            )));
        }
        Ok(flags)
    }

    pub async fn script_flush(&self, key: Option<&str>) -> RedissonResult<()> {
        match key {
            Some(_) => self.executor.write_async(key, RedisCommand::SCRIPT_FLUSH, vec![]).await?,
            None => {
                self.executor
                    .write_all_async(RedisCommand::SCRIPT_FLUSH, vec![], Arc::new(AckCallback))
                    .await?
            }
        };
        Ok(())
    }
}
