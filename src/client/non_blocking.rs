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
use tracing::info;

use crate::{AsyncRScript, ExecutorStats, RedisCommandExecutor, RedissonConfig, RedissonResult};

// Asynchronous client
#[derive(Clone)]
pub struct AsyncRedissonClient {
    config: RedissonConfig,
    executor: Arc<RedisCommandExecutor>,
}

impl AsyncRedissonClient {
    pub async fn new(config: RedissonConfig) -> RedissonResult<Self> {
        let executor = Arc::new(RedisCommandExecutor::from_config(&config).await?);
        info!(
            "Redisson script client started in {:?} mode",
            executor.connection_manager().connection_type()
        );
        Ok(Self { config, executor })
    }

    pub fn get_config(&self) -> &RedissonConfig {
        &self.config
    }

    pub fn get_executor(&self) -> &Arc<RedisCommandExecutor> {
        &self.executor
    }

    pub fn get_script(&self) -> AsyncRScript {
        AsyncRScript::new(self.executor.clone())
    }

    pub fn get_stats(&self) -> ExecutorStats {
        self.executor.get_stats()
    }

    pub fn shutdown(&self) {
        self.executor.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.executor.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, ReturnType, NO_ARGS};
    use std::time::Duration;

    fn unreachable() -> RedissonConfig {
        RedissonConfig::single_server("redis://127.0.0.1:1")
            .with_pool_size(1)
            .with_connection_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_client_surfaces_connectivity_errors() {
        let client = AsyncRedissonClient::new(unreachable()).await.unwrap();
        let script = client.get_script();
        let result: RedissonResult<i64> = script
            .eval(None, Mode::ReadWrite, "return 1", ReturnType::Integer, NO_ARGS, NO_ARGS)
            .await;
        assert!(result.unwrap_err().is_connectivity());
        assert_eq!(client.get_stats().error_count, 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_executor() {
        let client = AsyncRedissonClient::new(unreachable()).await.unwrap();
        client.shutdown();
        assert!(client.is_shutdown());
        assert!(client.get_script().script_flush(Some("k")).await.is_err());
    }
}
