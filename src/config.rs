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
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{RedissonError, RedissonResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConnectionMode {
    SingleServer {
        url: String,
        host: Option<String>,
        port: Option<u16>,
    },
    Sentinel {
        master_name: String,
        sentinel_addresses: Vec<String>,
    },
    Cluster {
        node_addresses: Vec<String>,
    },
}

/// Where read-only script evaluations are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadMode {
    Master,
    Replica,
}

impl Default for ReadMode {
    fn default() -> Self {
        Self::Master
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedissonConfig {
    /// Connection mode
    pub connection_mode: ConnectionMode,
    /// Connection pool size (per node)
    pub pool_size: u32,
    /// Connection timeout time
    pub connection_timeout: Duration,
    /// Response timeout time
    pub response_timeout: Duration,
    /// Node used for read-only evaluations
    #[serde(default)]
    pub read_mode: ReadMode,
    /// User name
    pub username: Option<String>,
    /// PASSWORD
    pub password: Option<String>,
    /// Database number
    pub database: Option<i64>,
    /// SSL enabled or not
    pub ssl: bool,
    /// Worker threads of the runtime owned by the blocking client, 0 for the tokio default
    #[serde(default)]
    pub threads: usize,
}

impl Default for RedissonConfig {
    fn default() -> Self {
        Self {
            connection_mode: ConnectionMode::SingleServer { url: "".to_string(), host: Some("localhost".to_string()), port: Some(6379) },
            pool_size: 10,
            connection_timeout: Duration::from_secs(3),
            response_timeout: Duration::from_secs(3),
            read_mode: ReadMode::Master,
            username: None,
            password: None,
            database: Some(0),
            ssl: false,
            threads: 0,
        }
    }
}

impl RedissonConfig {
    pub fn single_server(address: &str) -> Self {
        Self {
            connection_mode: ConnectionMode::SingleServer { url: address.to_string(), host: None, port: None },
            ..Default::default()
        }
    }

    pub fn sentinel(master_name: &str, sentinel_addresses: Vec<String>) -> Self {
        Self {
            connection_mode: ConnectionMode::Sentinel {
                master_name: master_name.to_string(),
                sentinel_addresses,
            },
            ..Default::default()
        }
    }

    pub fn cluster(node_addresses: Vec<String>) -> Self {
        Self {
            connection_mode: ConnectionMode::Cluster { node_addresses },
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> RedissonResult<Self> {
        let config: RedissonConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> RedissonResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RedissonError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> RedissonResult<()> {
        if self.pool_size == 0 {
            return Err(RedissonError::ConfigError("Pool size cannot be zero".to_string()));
        }

        match &self.connection_mode {
            ConnectionMode::SingleServer { url, host, port } => {
                if url.is_empty() && (host.is_none() || port.is_none()) {
                    return Err(RedissonError::ConfigError(
                        "Single server mode requires either URL or host/port".to_string()
                    ));
                }
            }
            ConnectionMode::Cluster { node_addresses } => {
                if node_addresses.is_empty() {
                    return Err(RedissonError::ConfigError(
                        "Cluster mode requires at least one node address".to_string()
                    ));
                }
                if let Some(address) = first_duplicate(node_addresses) {
                    return Err(RedissonError::ConfigError(format!(
                        "Cluster node address {} is listed more than once", address
                    )));
                }
            }
            ConnectionMode::Sentinel { master_name, sentinel_addresses } => {
                if master_name.is_empty() {
                    return Err(RedissonError::ConfigError(
                        "Sentinel mode requires master name".to_string()
                    ));
                }
                if sentinel_addresses.is_empty() {
                    return Err(RedissonError::ConfigError(
                        "Sentinel mode requires at least one sentinel address".to_string()
                    ));
                }
                if let Some(address) = first_duplicate(sentinel_addresses) {
                    return Err(RedissonError::ConfigError(format!(
                        "Sentinel address {} is listed more than once", address
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_database(mut self, db: i64) -> Self {
        self.database = Some(db);
        self
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

fn first_duplicate(addresses: &[String]) -> Option<&str> {
    let mut seen = std::collections::HashSet::with_capacity(addresses.len());
    addresses
        .iter()
        .find(|address| !seen.insert(address.as_str()))
        .map(String::as_str)
}
