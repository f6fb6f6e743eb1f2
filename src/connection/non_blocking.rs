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
use deadpool::managed::{Manager, Metrics, Pool};
use deadpool::Runtime;
use redis::aio::ConnectionLike as AsyncConnectionLike;
use redis::cluster::{ClusterClient, ClusterClientBuilder};
use redis::cluster_async::ClusterConnection;
use redis::cluster_read_routing::RandomReplicaStrategy;
use redis::cluster_routing::{MultipleNodeRoutingInfo, Route, RoutingInfo, SingleNodeRoutingInfo, SlotAddr};
use redis::sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType};
use redis::{
    Client, ConnectionAddr, ConnectionInfo, FromRedisValue, IntoConnectionInfo, RedisConnectionInfo, RedisError,
    TlsMode, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::config::{ReadMode, RedissonConfig};
use crate::errors::{RedissonError, RedissonResult};
use crate::{ConnectionMode, ConnectionType};

type AsyncRedisPool = Pool<AsyncSingleRedisConnectionManager>;
type AsyncClusterPool = Pool<AsyncClusterConnectionManager>;
type AsyncSentinelPool = Pool<AsyncSentinelConnectionManager>;

pub enum AsyncRedisConnection {
    Single(deadpool::managed::Object<AsyncSingleRedisConnectionManager>),
    Cluster(deadpool::managed::Object<AsyncClusterConnectionManager>),
    Sentinel(deadpool::managed::Object<AsyncSentinelConnectionManager>),
}

impl AsyncConnectionLike for AsyncRedisConnection {
    fn req_packed_command<'a>(
        &'a mut self,
        cmd: &'a redis::Cmd,
    ) -> redis::RedisFuture<'a, redis::Value> {
        match self {
            AsyncRedisConnection::Single(conn) => conn.req_packed_command(cmd),
            AsyncRedisConnection::Cluster(conn) => conn.req_packed_command(cmd),
            AsyncRedisConnection::Sentinel(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a redis::Pipeline,
        offset: usize,
        count: usize,
    ) -> redis::RedisFuture<'a, Vec<redis::Value>> {
        match self {
            AsyncRedisConnection::Single(conn) => conn.req_packed_commands(cmd, offset, count),
            AsyncRedisConnection::Cluster(conn) => conn.req_packed_commands(cmd, offset, count),
            AsyncRedisConnection::Sentinel(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            AsyncRedisConnection::Single(conn) => conn.get_db(),
            AsyncRedisConnection::Cluster(conn) => conn.get_db(),
            AsyncRedisConnection::Sentinel(conn) => conn.get_db(),
        }
    }
}

impl AsyncRedisConnection {
    /// Sends `cmd`. On a cluster connection with a routing key the command is pinned
    /// to the slot owner (a replica is allowed for read-only calls).
    pub async fn query_routed(
        &mut self,
        cmd: &redis::Cmd,
        route_key: Option<&[u8]>,
        read_only: bool,
    ) -> RedissonResult<Value> {
        match (self, route_key) {
            (AsyncRedisConnection::Cluster(conn), Some(key)) => {
                Ok(conn.route_command(cmd.clone(), key_routing(key, read_only)).await?)
            }
            (conn, _) => Ok(cmd.query_async::<Value>(conn).await?),
        }
    }
}

/// Routes to the owner of `key`'s slot; read-only calls may land on a replica.
pub(crate) fn key_routing(key: &[u8], read_only: bool) -> RoutingInfo {
    let slot_addr = if read_only { SlotAddr::ReplicaOptional } else { SlotAddr::Master };
    RoutingInfo::SingleNode(SingleNodeRoutingInfo::SpecificNode(Route::with_key(key, slot_addr)))
}

/// Every primary of the cluster, replies kept apart per node.
pub(crate) fn all_primaries_routing() -> RoutingInfo {
    RoutingInfo::MultiNode((MultipleNodeRoutingInfo::AllMasters, None))
}

/// Splits an address-keyed multi-node reply into one result per primary.
pub(crate) fn split_node_replies(reply: Value) -> RedissonResult<Vec<(String, RedissonResult<Value>)>> {
    match reply {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(address, value)| {
                let node = String::from_redis_value(address)?;
                let result = match value {
                    Value::ServerError(err) => Err(RedissonError::from(RedisError::from(err))),
                    value => Ok(value),
                };
                Ok((node, result))
            })
            .collect(),
        other => Err(RedissonError::DeserializationError(format!(
            "expected one reply per primary, got {:?}",
            other
        ))),
    }
}

pub struct AsyncSingleRedisConnectionManager {
    client: Client,
    database: Option<i64>,
}

#[async_trait::async_trait]
impl Manager for AsyncSingleRedisConnectionManager {
    type Type = redis::aio::MultiplexedConnection;
    type Error = redis::RedisError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        if let Some(db) = self.database {
            redis::cmd("SELECT")
                .arg(db)
                .query_async::<()>(&mut conn)
                .await?;
        }

        Ok(conn)
    }

    async fn recycle(&self, conn: &mut Self::Type, _metrics: &Metrics) -> deadpool::managed::RecycleResult<Self::Error> {
        ping(conn).await
    }
}

pub struct AsyncClusterConnectionManager {
    client: ClusterClient,
}

#[async_trait::async_trait]
impl Manager for AsyncClusterConnectionManager {
    type Type = ClusterConnection;
    type Error = redis::RedisError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.client.get_async_connection().await
    }

    async fn recycle(&self, conn: &mut Self::Type, _metrics: &Metrics) -> deadpool::managed::RecycleResult<Self::Error> {
        ping(conn).await
    }
}

pub struct AsyncSentinelConnectionManager {
    client: TokioMutex<SentinelClient>,
}

#[async_trait::async_trait]
impl Manager for AsyncSentinelConnectionManager {
    type Type = redis::aio::MultiplexedConnection;
    type Error = redis::RedisError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let mut client = self.client.lock().await;
        client.get_async_connection().await
    }

    async fn recycle(&self, conn: &mut Self::Type, _metrics: &Metrics) -> deadpool::managed::RecycleResult<Self::Error> {
        ping(conn).await
    }
}

async fn ping<C: AsyncConnectionLike + Send>(conn: &mut C) -> deadpool::managed::RecycleResult<redis::RedisError> {
    match redis::cmd("PING").query_async::<String>(conn).await {
        Ok(pong) if pong == "PONG" => Ok(()),
        Ok(_) => Err(deadpool::managed::RecycleError::Message("Invalid PONG response".into())),
        Err(e) => Err(deadpool::managed::RecycleError::Backend(e)),
    }
}

#[derive(Clone)]
enum NodePool {
    Single(AsyncRedisPool),
    Sentinel(AsyncSentinelPool),
}

/// One addressable server and its pool
#[derive(Clone)]
pub struct NodeEntry {
    id: String,
    pool: NodePool,
}

impl NodeEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn get_connection(&self) -> RedissonResult<AsyncRedisConnection> {
        match &self.pool {
            NodePool::Single(pool) => Ok(AsyncRedisConnection::Single(pool.get().await?)),
            NodePool::Sentinel(pool) => Ok(AsyncRedisConnection::Sentinel(pool.get().await?)),
        }
    }

    pub async fn query(&self, cmd: &redis::Cmd) -> RedissonResult<Value> {
        let mut conn = self.get_connection().await?;
        conn.query_routed(cmd, None, false).await
    }
}

/// Owns the pools behind an executor.
///
/// Outside a cluster `nodes` holds what a broadcast reaches: the server or the
/// sentinel master. A cluster keeps a single `cluster_pool` and broadcasts through
/// it to every primary of the current topology.
pub struct AsyncRedisConnectionManager {
    config: RedissonConfig,
    nodes: Vec<NodeEntry>,
    replica: Option<NodeEntry>,
    cluster_pool: Option<AsyncClusterPool>,
    is_closed: AtomicBool,
}

impl AsyncRedisConnectionManager {
    pub async fn new(config: &RedissonConfig) -> RedissonResult<Self> {
        config.validate()?;

        let (nodes, replica, cluster_pool) = match &config.connection_mode {
            ConnectionMode::SingleServer { url, host, port } => {
                let id = if !url.is_empty() {
                    url.clone()
                } else {
                    format!("{}:{}", host.as_deref().unwrap_or_default(), port.unwrap_or_default())
                };
                let pool = Self::create_single_pool(config)?;
                (vec![NodeEntry { id, pool: NodePool::Single(pool) }], None, None)
            }
            ConnectionMode::Sentinel { master_name, .. } => {
                let master = NodeEntry {
                    id: format!("sentinel:{}", master_name),
                    pool: NodePool::Sentinel(Self::create_sentinel_pool(config, SentinelServerType::Master)?),
                };
                let replica = if config.read_mode == ReadMode::Replica {
                    Some(NodeEntry {
                        id: format!("sentinel:{}:replica", master_name),
                        pool: NodePool::Sentinel(Self::create_sentinel_pool(config, SentinelServerType::Replica)?),
                    })
                } else {
                    None
                };
                (vec![master], replica, None)
            }
            ConnectionMode::Cluster { .. } => (Vec::new(), None, Some(Self::create_cluster_pool(config)?)),
        };

        debug!(
            "Connection manager ready: mode={:?}, broadcast nodes={}",
            ConnectionType::from(&config.connection_mode),
            if cluster_pool.is_some() { "all primaries".to_string() } else { nodes.len().to_string() }
        );

        Ok(Self {
            config: config.clone(),
            nodes,
            replica,
            cluster_pool,
            is_closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RedissonConfig {
        &self.config
    }

    pub fn connection_type(&self) -> ConnectionType {
        ConnectionType::from(&self.config.connection_mode)
    }

    /// Nodes reached by a broadcast outside a cluster; empty in cluster mode.
    pub fn nodes(&self) -> &[NodeEntry] {
        &self.nodes
    }

    pub fn is_cluster(&self) -> bool {
        self.cluster_pool.is_some()
    }

    /// Sends `cmd` to every primary of the cluster and returns each primary's result
    /// keyed by its address.
    pub async fn query_all_primaries(&self, cmd: &redis::Cmd) -> RedissonResult<Vec<(String, RedissonResult<Value>)>> {
        if self.is_closed() {
            return Err(RedissonError::PoolError("Connection manager is closed".to_string()));
        }
        let pool = self
            .cluster_pool
            .as_ref()
            .ok_or_else(|| RedissonError::ConfigError("Not a cluster connection".to_string()))?;
        let mut conn = pool.get().await?;
        let reply = conn.route_command(cmd.clone(), all_primaries_routing()).await?;
        split_node_replies(reply)
    }

    /// Connection for routed traffic. Read-only calls prefer a replica when one is configured.
    pub async fn get_connection(&self, read_only: bool) -> RedissonResult<AsyncRedisConnection> {
        if self.is_closed() {
            return Err(RedissonError::PoolError("Connection manager is closed".to_string()));
        }

        if let Some(pool) = &self.cluster_pool {
            return Ok(AsyncRedisConnection::Cluster(pool.get().await?));
        }

        if read_only {
            if let Some(replica) = &self.replica {
                return replica.get_connection().await;
            }
        }

        match self.nodes.first() {
            Some(node) => node.get_connection().await,
            None => Err(RedissonError::PoolError("no connection available".to_string())),
        }
    }

    pub fn close(&self) {
        self.is_closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }

    fn build_pool<M: Manager>(manager: M, config: &RedissonConfig) -> RedissonResult<Pool<M>> {
        let pool = Pool::builder(manager)
            .max_size(config.pool_size as usize)
            .timeouts(deadpool::managed::Timeouts {
                wait: Some(config.connection_timeout),
                create: Some(config.connection_timeout),
                recycle: Some(Duration::from_secs(5)),
            })
            .runtime(Runtime::Tokio1)
            .build()?;
        Ok(pool)
    }

    fn create_single_pool(config: &RedissonConfig) -> RedissonResult<AsyncRedisPool> {
        let client = Self::create_single_client(config)?;
        Self::build_pool(AsyncSingleRedisConnectionManager { client, database: config.database }, config)
    }

    fn create_cluster_pool(config: &RedissonConfig) -> RedissonResult<AsyncClusterPool> {
        let client = Self::create_cluster_client(config)?;
        Self::build_pool(AsyncClusterConnectionManager { client }, config)
    }

    fn create_sentinel_pool(config: &RedissonConfig, server_type: SentinelServerType) -> RedissonResult<AsyncSentinelPool> {
        let client = Self::create_sentinel_client(config, server_type)?;
        Self::build_pool(AsyncSentinelConnectionManager { client: TokioMutex::new(client) }, config)
    }

    fn create_single_client(config: &RedissonConfig) -> RedissonResult<Client> {
        match &config.connection_mode {
            ConnectionMode::SingleServer { url, host, port } => {
                let conn_info = if !url.is_empty() {
                    Self::build_connection_info_from_url(url, config)?
                } else if let (Some(host), Some(port)) = (host, port) {
                    Self::build_connection_info_from_host_port(host, *port, config)?
                } else {
                    return Err(RedissonError::ConfigError(
                        "Single server mode requires either URL or host/port".to_string()
                    ));
                };

                Client::open(conn_info)
                    .map_err(|e| RedissonError::ConfigError(e.to_string()))
            }
            _ => Err(RedissonError::ConfigError("Expected single server mode".to_string())),
        }
    }

    fn create_cluster_client(config: &RedissonConfig) -> RedissonResult<ClusterClient> {
        match &config.connection_mode {
            ConnectionMode::Cluster { node_addresses } => {
                let mut builder = ClusterClientBuilder::new(node_addresses.clone());

                if let Some(username) = &config.username {
                    builder = builder.username(username.clone());
                }
                if let Some(password) = &config.password {
                    builder = builder.password(password.clone());
                }
                if config.read_mode == ReadMode::Replica {
                    builder = builder.read_routing_strategy(RandomReplicaStrategy);
                }

                builder = builder.response_timeout(config.response_timeout);
                builder = builder.connection_timeout(config.connection_timeout);

                if config.ssl {
                    builder = builder.tls(TlsMode::Secure);
                }

                builder.build()
                    .map_err(|e| RedissonError::ConfigError(e.to_string()))
            }
            _ => Err(RedissonError::ConfigError("Expected cluster mode".to_string())),
        }
    }

    fn create_sentinel_client(config: &RedissonConfig, server_type: SentinelServerType) -> RedissonResult<SentinelClient> {
        match &config.connection_mode {
            ConnectionMode::Sentinel { master_name, sentinel_addresses } => {
                let mut master_connection_info = RedisConnectionInfo::default();
                if let Some(username) = &config.username {
                    master_connection_info = master_connection_info.set_username(username.clone());
                }
                if let Some(password) = &config.password {
                    master_connection_info = master_connection_info.set_password(password.clone());
                }
                if let Some(db) = config.database {
                    master_connection_info = master_connection_info.set_db(db);
                }

                let node_connection_info = SentinelNodeConnectionInfo::default()
                    .set_redis_connection_info(master_connection_info);

                SentinelClient::build(
                    sentinel_addresses.clone(),
                    master_name.clone(),
                    node_connection_info.into(),
                    server_type,
                )
                    .map_err(|e| RedissonError::ConfigError(e.to_string()))
            }
            _ => Err(RedissonError::ConfigError("Expected sentinel mode".to_string())),
        }
    }

    fn build_connection_info_from_url(url: &str, config: &RedissonConfig) -> RedissonResult<ConnectionInfo> {
        let conn_info: ConnectionInfo = url
            .into_connection_info()
            .map_err(|e| RedissonError::ConfigError(e.to_string()))?;

        let mut redis_connection = RedisConnectionInfo::default();
        if let Some(username) = &config.username {
            redis_connection = redis_connection.set_username(username);
        }
        if let Some(password) = &config.password {
            redis_connection = redis_connection.set_password(password);
        }
        if let Some(db) = config.database {
            redis_connection = redis_connection.set_db(db);
        }
        Ok(conn_info.set_redis_settings(redis_connection))
    }

    fn build_connection_info_from_host_port(host: &str, port: u16, config: &RedissonConfig) -> RedissonResult<ConnectionInfo> {
        let addr = if config.ssl {
            ConnectionAddr::TcpTls {
                host: host.to_string(),
                port,
                insecure: false,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(host.to_string(), port)
        };

        let mut redis_info = RedisConnectionInfo::default()
            .set_db(config.database.unwrap_or(0));
        if let Some(username) = &config.username {
            redis_info = redis_info.set_username(username);
        }
        if let Some(password) = &config.password {
            redis_info = redis_info.set_password(password);
        }

        let connection = addr.into_connection_info()?;
        Ok(connection.set_redis_settings(redis_info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_server_has_one_node() {
        let config = RedissonConfig::single_server("redis://127.0.0.1:6379");
        let manager = AsyncRedisConnectionManager::new(&config).await.unwrap();
        assert_eq!(manager.nodes().len(), 1);
        assert_eq!(manager.nodes()[0].id(), "redis://127.0.0.1:6379");
        assert_eq!(manager.connection_type(), ConnectionType::Single);
    }

    #[tokio::test]
    async fn test_cluster_broadcasts_through_the_cluster_pool() {
        let config = RedissonConfig::cluster(vec![
            "redis://127.0.0.1:7000".to_string(),
            "redis://127.0.0.1:7001".to_string(),
        ]);
        let manager = AsyncRedisConnectionManager::new(&config).await.unwrap();
        assert!(manager.is_cluster());
        assert!(manager.nodes().is_empty());
        assert_eq!(manager.connection_type(), ConnectionType::Cluster);
    }

    #[tokio::test]
    async fn test_cluster_with_replica_reads_builds() {
        let config = RedissonConfig::cluster(vec!["redis://127.0.0.1:7000".to_string()])
            .with_read_mode(ReadMode::Replica);
        let manager = AsyncRedisConnectionManager::new(&config).await.unwrap();
        assert!(manager.is_cluster());
        assert_eq!(manager.config().read_mode, ReadMode::Replica);
    }

    #[tokio::test]
    async fn test_repeated_cluster_address_is_rejected() {
        let config = RedissonConfig::cluster(vec!["redis://127.0.0.1:7000".to_string(); 2]);
        assert!(matches!(
            AsyncRedisConnectionManager::new(&config).await,
            Err(RedissonError::ConfigError(_))
        ));
    }

    #[test]
    fn test_key_routing_targets_slot_owner() {
        // CLUSTER KEYSLOT foo = 12182
        assert_eq!(
            key_routing(b"foo", false),
            RoutingInfo::SingleNode(SingleNodeRoutingInfo::SpecificNode(Route::new(12182, SlotAddr::Master)))
        );
        assert_eq!(
            key_routing(b"foo", true),
            RoutingInfo::SingleNode(SingleNodeRoutingInfo::SpecificNode(Route::new(
                12182,
                SlotAddr::ReplicaOptional
            )))
        );
        assert_eq!(key_routing(b"{user1000}.following", false), key_routing(b"user1000", false));
    }

    #[test]
    fn test_broadcast_routing_reaches_every_primary() {
        assert_eq!(
            all_primaries_routing(),
            RoutingInfo::MultiNode((MultipleNodeRoutingInfo::AllMasters, None))
        );
    }

    #[test]
    fn test_split_node_replies_keeps_per_node_errors() {
        let reply = Value::Map(vec![
            (
                Value::BulkString(b"127.0.0.1:7000".to_vec()),
                Value::BulkString(b"e0e1f9fabfc9d4800c877a703b823ac0578ff8db".to_vec()),
            ),
            (
                Value::BulkString(b"127.0.0.1:7001".to_vec()),
                redis::parse_redis_value(b"-NOTBUSY No scripts in execution right now.\r\n").unwrap(),
            ),
        ]);
        let replies = split_node_replies(reply).unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].0, "127.0.0.1:7000");
        assert!(replies[0].1.is_ok());
        assert_eq!(replies[1].0, "127.0.0.1:7001");
        assert!(matches!(replies[1].1, Err(RedissonError::ScriptRuntime(_))));

        assert!(matches!(
            split_node_replies(Value::Okay),
            Err(RedissonError::DeserializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = RedissonConfig::cluster(vec![]);
        assert!(matches!(
            AsyncRedisConnectionManager::new(&config).await,
            Err(RedissonError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_manager_refuses_connections() {
        let config = RedissonConfig::single_server("redis://127.0.0.1:6379");
        let manager = AsyncRedisConnectionManager::new(&config).await.unwrap();
        manager.close();
        assert!(manager.is_closed());
        assert!(matches!(manager.get_connection(false).await, Err(RedissonError::PoolError(_))));
    }
}
