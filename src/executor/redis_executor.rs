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
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use redis::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

use crate::{
    eval_routing_key, AsyncRedisConnectionManager, BroadcastAggregator, CommandExecutor, ExecutorStats, NodeEntry,
    RedisCommand, RedissonConfig, RedissonError, RedissonResult, SlotCallback,
};

/// `CommandExecutor` over pooled redis connections
pub struct RedisCommandExecutor {
    connection_manager: Arc<AsyncRedisConnectionManager>,
    response_timeout: Duration,
    stats: Arc<RwLock<ExecutorStats>>,
}

impl RedisCommandExecutor {
    pub fn new(connection_manager: Arc<AsyncRedisConnectionManager>) -> Self {
        let response_timeout = connection_manager.config().response_timeout;
        Self {
            connection_manager,
            response_timeout,
            stats: Arc::new(RwLock::new(ExecutorStats::new())),
        }
    }

    pub async fn from_config(config: &RedissonConfig) -> RedissonResult<Self> {
        let connection_manager = AsyncRedisConnectionManager::new(config).await?;
        Ok(Self::new(Arc::new(connection_manager)))
    }

    pub fn connection_manager(&self) -> &Arc<AsyncRedisConnectionManager> {
        &self.connection_manager
    }

    pub fn get_stats(&self) -> ExecutorStats {
        self.stats.read().clone()
    }

    pub fn reset_stats(&self) {
        self.stats.write().reset();
    }

    pub fn close(&self) {
        self.connection_manager.close()
    }

    pub fn is_closed(&self) -> bool {
        self.connection_manager.is_closed()
    }

    async fn broadcast_cluster(&self, cmd: &redis::Cmd) -> RedissonResult<Vec<(String, RedissonResult<Value>)>> {
        match timeout(self.response_timeout, self.connection_manager.query_all_primaries(cmd)).await {
            Ok(replies) => replies,
            Err(_) => Err(RedissonError::Connectivity(format!(
                "no response within {:?}",
                self.response_timeout
            ))),
        }
    }

    async fn broadcast_nodes(
        &self,
        nodes: Vec<NodeEntry>,
        cmd: &redis::Cmd,
        callback: Arc<dyn SlotCallback>,
    ) -> Arc<BroadcastAggregator> {
        let aggregator = Arc::new(BroadcastAggregator::new(
            nodes.iter().map(|node| node.id().to_string()),
            callback,
        ));
        let handles: Vec<_> = nodes
            .iter()
            .cloned()
            .map(|node| {
                let aggregator = aggregator.clone();
                let cmd = cmd.clone();
                let limit = self.response_timeout;
                tokio::spawn(async move {
                    let result = bounded(limit, node.query(&cmd)).await;
                    aggregator.on_node_result(node.id(), result);
                })
            })
            .collect();

        for (node, joined) in nodes.iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                aggregator.on_node_result(node.id(), Err(e.into()));
            }
        }

        aggregator
    }

    async fn execute(&self, route_key: Option<&[u8]>, read_only: bool, cmd: redis::Cmd) -> RedissonResult<Value> {
        let start = Instant::now();
        let result = bounded(self.response_timeout, async {
            let mut conn = self.connection_manager.get_connection(read_only).await?;
            conn.query_routed(&cmd, route_key, read_only).await
        })
        .await;

        let elapsed = start.elapsed();
        let mut stats = self.stats.write();
        match &result {
            Ok(_) => stats.record_success(elapsed),
            Err(e) => {
                stats.record_failure(elapsed);
                debug!("Command failed after {:?}: {}", elapsed, e);
            }
        }
        result
    }
}

async fn bounded<F>(limit: Duration, fut: F) -> RedissonResult<Value>
where
    F: Future<Output = RedissonResult<Value>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RedissonError::Connectivity(format!("no response within {:?}", limit))),
    }
}

#[async_trait]
impl CommandExecutor for RedisCommandExecutor {
    async fn read_async(&self, key: Option<&str>, command: RedisCommand, args: Vec<Vec<u8>>) -> RedissonResult<Value> {
        debug!("read {} key={:?}", command, key);
        self.execute(key.map(str::as_bytes), true, command.to_cmd(&args)).await
    }

    async fn write_async(&self, key: Option<&str>, command: RedisCommand, args: Vec<Vec<u8>>) -> RedissonResult<Value> {
        debug!("write {} key={:?}", command, key);
        self.execute(key.map(str::as_bytes), false, command.to_cmd(&args)).await
    }

    async fn eval_read_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        script: &str,
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
    ) -> RedissonResult<Value> {
        debug!("read {} keys={} args={}", command, keys.len(), values.len());
        let cmd = command.to_eval_cmd(script, &keys, &values);
        self.execute(eval_routing_key(key, &keys), true, cmd)
            .await
            .map_err(RedissonError::into_script_error)
    }

    async fn eval_write_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        script: &str,
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
    ) -> RedissonResult<Value> {
        debug!("write {} keys={} args={}", command, keys.len(), values.len());
        let cmd = command.to_eval_cmd(script, &keys, &values);
        self.execute(eval_routing_key(key, &keys), false, cmd)
            .await
            .map_err(RedissonError::into_script_error)
    }

    async fn write_all_async(
        &self,
        command: RedisCommand,
        args: Vec<Vec<u8>>,
        callback: Arc<dyn SlotCallback>,
    ) -> RedissonResult<Value> {
        if self.connection_manager.is_closed() {
            return Err(RedissonError::PoolError("Connection manager is closed".to_string()));
        }

        let start = Instant::now();
        let cmd = command.to_cmd(&args);
        let aggregator = if self.connection_manager.is_cluster() {
            debug!("broadcast {} to every cluster primary", command);
            match self.broadcast_cluster(&cmd).await {
                Ok(replies) if replies.is_empty() => {
                    return Err(RedissonError::PoolError("cluster reported no primaries".to_string()));
                }
                Ok(replies) => {
                    let aggregator =
                        BroadcastAggregator::new(replies.iter().map(|(node, _)| node.clone()), callback);
                    for (node, result) in replies {
                        aggregator.on_node_result(&node, result);
                    }
                    Arc::new(aggregator)
                }
                Err(e) => {
                    let mut stats = self.stats.write();
                    stats.record_broadcast();
                    stats.record_failure(start.elapsed());
                    return Err(e);
                }
            }
        } else {
            let nodes = self.connection_manager.nodes().to_vec();
            if nodes.is_empty() {
                return Err(RedissonError::PoolError("no nodes to broadcast to".to_string()));
            }
            debug!("broadcast {} to {} nodes", command, nodes.len());
            self.broadcast_nodes(nodes, &cmd, callback).await
        };

        let result = aggregator.wait().await;
        let elapsed = start.elapsed();
        let mut stats = self.stats.write();
        stats.record_broadcast();
        match &result {
            Ok(_) => stats.record_success(elapsed),
            Err(_) => stats.record_failure(elapsed),
        }
        result
    }
}
