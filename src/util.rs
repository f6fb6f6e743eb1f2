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
use std::future::Future;
use std::sync::Arc;

use redis::ToRedisArgs;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::{RedissonError, RedissonResult};

/// Flattens script keys or arguments into wire arguments.
pub fn to_args<T: ToRedisArgs>(items: &[T]) -> Vec<Vec<u8>> {
    items.iter().flat_map(|item| item.to_redis_args()).collect()
}

/// Runtime owned by blocking callers. Dropped with `shutdown_background`, so the
/// last clone may go away inside another runtime.
struct OwnedRuntime(Option<Runtime>);

impl OwnedRuntime {
    fn handle(&self) -> RedissonResult<&Handle> {
        self.0
            .as_ref()
            .map(Runtime::handle)
            .ok_or_else(|| RedissonError::AsyncError("runtime already shut down".to_string()))
    }
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// Waits on an async operation from synchronous code.
///
/// Futures run on the owned runtime. Inside a multi-thread runtime the current
/// worker is handed over with `block_in_place`; a current-thread runtime cannot
/// be blocked and gets an error instead.
#[derive(Clone)]
pub struct CommandSync {
    runtime: Arc<OwnedRuntime>,
}

impl CommandSync {
    pub fn new(worker_threads: usize) -> RedissonResult<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name("redisson-script");
        if worker_threads > 0 {
            builder.worker_threads(worker_threads);
        }
        let runtime = builder
            .build()
            .map_err(|e| RedissonError::AsyncError(e.to_string()))?;
        Ok(Self::from_runtime(runtime))
    }

    pub fn from_runtime(runtime: Runtime) -> Self {
        Self { runtime: Arc::new(OwnedRuntime(Some(runtime))) }
    }

    pub fn handle(&self) -> RedissonResult<&Handle> {
        self.runtime.handle()
    }

    pub fn get<F, T>(&self, future: F) -> RedissonResult<T>
    where
        F: Future<Output = RedissonResult<T>>,
    {
        let handle = self.runtime.handle()?;
        match Handle::try_current() {
            Err(_) => handle.block_on(future),
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            Ok(_) => Err(RedissonError::AsyncError(
                "blocking call made from a current-thread runtime".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_args_flattens() {
        let args = to_args(&["a", "bc"]);
        assert_eq!(args, vec![b"a".to_vec(), b"bc".to_vec()]);
        let numbers = to_args(&[1i64, 20]);
        assert_eq!(numbers, vec![b"1".to_vec(), b"20".to_vec()]);
        assert!(to_args::<String>(&[]).is_empty());
    }

    #[test]
    fn test_get_outside_runtime() {
        let sync = CommandSync::new(1).unwrap();
        let value = sync.get(async { Ok::<_, RedissonError>(7) }).unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_get_inside_multi_thread_runtime() {
        let sync = CommandSync::new(1).unwrap();
        let value = sync.get(async { Ok::<_, RedissonError>("done") }).unwrap();
        assert_eq!(value, "done");
        drop(sync);
    }

    #[tokio::test]
    async fn test_get_inside_current_thread_runtime_fails() {
        let sync = CommandSync::new(1).unwrap();
        let result = sync.get(async { Ok::<_, RedissonError>(()) });
        assert!(matches!(result, Err(RedissonError::AsyncError(_))));
        drop(sync);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_last_clone_dropped_inside_runtime() {
        let sync = CommandSync::new(1).unwrap();
        let clone = sync.clone();
        drop(sync);
        assert_eq!(clone.get(async { Ok::<_, RedissonError>(3) }).unwrap(), 3);
        drop(clone);
        tokio::task::yield_now().await;
    }
}
