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

use crate::{CommandSync, ExecutorStats, RScript, RedisCommandExecutor, RedissonConfig, RedissonResult};

// Synchronous client, driving the async executor on its own runtime
#[derive(Clone)]
pub struct RedissonClient {
    config: RedissonConfig,
    executor: Arc<RedisCommandExecutor>,
    sync: CommandSync,
}

impl RedissonClient {
    pub fn new(config: RedissonConfig) -> RedissonResult<Self> {
        let sync = CommandSync::new(config.threads)?;
        let executor = Arc::new(sync.get(RedisCommandExecutor::from_config(&config))?);
        info!(
            "Redisson blocking script client started in {:?} mode",
            executor.connection_manager().connection_type()
        );
        Ok(Self { config, executor, sync })
    }

    pub fn get_config(&self) -> &RedissonConfig {
        &self.config
    }

    pub fn get_executor(&self) -> &Arc<RedisCommandExecutor> {
        &self.executor
    }

    pub fn get_script(&self) -> RScript {
        RScript::new(self.executor.clone(), self.sync.clone())
    }

    pub fn get_stats(&self) -> ExecutorStats {
        self.executor.get_stats()
    }

    pub fn shutdown(&self) {
        self.executor.close();
    }
}
