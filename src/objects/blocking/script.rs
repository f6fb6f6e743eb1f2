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

use crate::{AsyncRScript, CommandExecutor, CommandSync, Mode, RedissonResult, ReturnType};

/// === RScript (blocking script execution) ===
#[derive(Clone)]
pub struct RScript {
    inner: AsyncRScript,
    sync: CommandSync,
}

impl RScript {
    pub fn new(executor: Arc<dyn CommandExecutor>, sync: CommandSync) -> Self {
        Self { inner: AsyncRScript::new(executor), sync }
    }

    pub fn as_async(&self) -> &AsyncRScript {
        &self.inner
    }

    pub fn script_load(&self, key: Option<&str>, script: &str) -> RedissonResult<String> {
        self.sync.get(self.inner.script_load(key, script))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn evaluate<T, K, V>(
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
        self.sync.get(self.inner.evaluate(key, mode, script, return_type, keys, values, by_sha))
    }

    pub fn eval<T, K, V>(
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
        self.sync.get(self.inner.eval(key, mode, script, return_type, keys, values))
    }

    pub fn eval_sha<T, K, V>(
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
        self.sync.get(self.inner.eval_sha(key, mode, sha_digest, return_type, keys, values))
    }

    pub fn script_kill(&self, key: Option<&str>) -> RedissonResult<()> {
        self.sync.get(self.inner.script_kill(key))
    }

    pub fn script_exists(&self, key: Option<&str>, sha_digests: &[&str]) -> RedissonResult<Vec<bool>> {
        self.sync.get(self.inner.script_exists(key, sha_digests))
    }

    pub fn script_flush(&self, key: Option<&str>) -> RedissonResult<()> {
        self.sync.get(self.inner.script_flush(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{sha1_of, InMemoryExecutor};
    use crate::{RedissonError, NO_ARGS};
    use redis::Value;

    const SUM: &str = "return tonumber(ARGV[1]) + tonumber(ARGV[2])";

    fn sum(values: &[Vec<u8>]) -> i64 {
        values
            .iter()
            .map(|v| String::from_utf8_lossy(v).parse::<i64>().unwrap_or(0))
            .sum()
    }

    fn script(nodes: usize) -> (Arc<InMemoryExecutor>, RScript) {
        let executor = Arc::new(
            InMemoryExecutor::with_nodes(nodes).register(SUM, |_, values| Ok(Value::Int(sum(values)))),
        );
        let script = RScript::new(executor.clone(), CommandSync::new(1).unwrap());
        (executor, script)
    }

    #[test]
    fn test_blocking_load_eval_flush_cycle() {
        let (executor, script) = script(2);
        let digest = script.script_load(None, SUM).unwrap();
        assert_eq!(digest, sha1_of(SUM));
        assert_eq!(script.script_exists(None, &[digest.as_str()]).unwrap(), vec![true]);

        let total: i64 = script
            .eval_sha(None, Mode::ReadOnly, &digest, ReturnType::Integer, NO_ARGS, &[2, 3])
            .unwrap();
        assert_eq!(total, 5);
        let total: i64 = script
            .evaluate(None, Mode::ReadWrite, SUM, ReturnType::Integer, NO_ARGS, &[10, 5], false)
            .unwrap();
        assert_eq!(total, 15);

        script.script_flush(None).unwrap();
        assert_eq!(executor.node(0).cached_digests(), 0);
        assert_eq!(executor.node(1).cached_digests(), 0);
        let missing: RedissonResult<i64> =
            script.eval_sha(None, Mode::ReadOnly, &digest, ReturnType::Integer, NO_ARGS, &[1, 1]);
        assert!(matches!(missing, Err(RedissonError::UnknownDigest(_))));
    }

    #[test]
    fn test_blocking_matches_async() {
        let (_executor, script) = script(1);
        let blocking: i64 = script
            .eval(None, Mode::ReadWrite, SUM, ReturnType::Integer, NO_ARGS, &[4, 4])
            .unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let non_blocking: i64 = runtime
            .block_on(script.as_async().eval(None, Mode::ReadWrite, SUM, ReturnType::Integer, NO_ARGS, &[4, 4]))
            .unwrap();
        assert_eq!(blocking, non_blocking);
    }

    #[test]
    fn test_blocking_kill_reports_not_busy() {
        let (executor, script) = script(1);
        executor.set_busy(0, true);
        script.script_kill(None).unwrap();
        assert!(matches!(script.script_kill(None), Err(RedissonError::ScriptRuntime(_))));
    }
}
