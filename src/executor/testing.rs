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
//! In-memory multi-node executor used by the facade tests.
//!
//! Scripts are not interpreted: each body is registered with a Rust closure
//! standing in for its Lua code. Bodies that were never registered fail to load.

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{
    eval_routing_key, BroadcastAggregator, CommandExecutor, RedisCommand, RedissonError, RedissonResult,
    SlotCallback,
};

type Program = Arc<dyn Fn(&[Vec<u8>], &[Vec<u8>]) -> RedissonResult<Value> + Send + Sync>;

pub(crate) fn sha1_of(script: &str) -> String {
    redis::Script::new(script).get_hash().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub node: String,
    pub command: RedisCommand,
    pub read_only: bool,
    pub broadcast: bool,
}

pub(crate) struct FakeNode {
    id: String,
    scripts: Mutex<HashMap<String, String>>,
    reachable: AtomicBool,
    busy: AtomicBool,
}

impl FakeNode {
    fn new(id: String) -> Self {
        Self {
            id,
            scripts: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            busy: AtomicBool::new(false),
        }
    }

    pub fn cached_digests(&self) -> usize {
        self.scripts.lock().len()
    }
}

pub(crate) struct InMemoryExecutor {
    nodes: Vec<Arc<FakeNode>>,
    programs: Mutex<HashMap<String, Program>>,
    calls: Mutex<Vec<Call>>,
}

impl InMemoryExecutor {
    pub fn with_nodes(count: usize) -> Self {
        Self {
            nodes: (0..count)
                .map(|i| Arc::new(FakeNode::new(format!("node-{}", i))))
                .collect(),
            programs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn register<F>(self, script: &str, program: F) -> Self
    where
        F: Fn(&[Vec<u8>], &[Vec<u8>]) -> RedissonResult<Value> + Send + Sync + 'static,
    {
        self.programs.lock().insert(script.to_string(), Arc::new(program));
        self
    }

    pub fn node(&self, index: usize) -> &Arc<FakeNode> {
        &self.nodes[index]
    }

    pub fn set_reachable(&self, index: usize, reachable: bool) {
        self.nodes[index].reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_busy(&self, index: usize, busy: bool) {
        self.nodes[index].busy.store(busy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Node owning `key`; keyless commands go to the first node.
    pub fn node_index_for(&self, key: Option<&[u8]>) -> usize {
        match key {
            Some(key) => key.iter().map(|b| *b as usize).sum::<usize>() % self.nodes.len(),
            None => 0,
        }
    }

    fn record(&self, node: &FakeNode, command: RedisCommand, read_only: bool, broadcast: bool) {
        self.calls.lock().push(Call {
            node: node.id.clone(),
            command,
            read_only,
            broadcast,
        });
    }

    fn program(&self, script: &str) -> RedissonResult<Program> {
        self.programs
            .lock()
            .get(script)
            .cloned()
            .ok_or_else(|| RedissonError::ScriptRuntime("ERR Error compiling script".to_string()))
    }

    fn run(&self, node: &FakeNode, command: RedisCommand, args: &[Vec<u8>]) -> RedissonResult<Value> {
        if !node.reachable.load(Ordering::SeqCst) {
            return Err(RedissonError::Connectivity(format!("{} is unreachable", node.id)));
        }
        match command {
            RedisCommand::SCRIPT_LOAD => {
                let script = String::from_utf8_lossy(&args[0]).to_string();
                self.program(&script)?;
                let digest = sha1_of(&script);
                node.scripts.lock().insert(digest.clone(), script);
                Ok(Value::BulkString(digest.into_bytes()))
            }
            RedisCommand::SCRIPT_EXISTS => {
                let scripts = node.scripts.lock();
                Ok(Value::Array(
                    args.iter()
                        .map(|digest| {
                            let digest = String::from_utf8_lossy(digest).to_lowercase();
                            Value::Int(scripts.contains_key(&digest) as i64)
                        })
                        .collect(),
                ))
            }
            RedisCommand::SCRIPT_FLUSH => {
                node.scripts.lock().clear();
                Ok(Value::Okay)
            }
            RedisCommand::SCRIPT_KILL => {
                if node.busy.swap(false, Ordering::SeqCst) {
                    Ok(Value::Okay)
                } else {
                    Err(RedissonError::ScriptRuntime(
                        "NOTBUSY No scripts in execution right now.".to_string(),
                    ))
                }
            }
            other => Err(RedissonError::ScriptRuntime(format!("ERR unknown command '{}'", other))),
        }
    }

    fn eval(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        script: &str,
        keys: &[Vec<u8>],
        values: &[Vec<u8>],
        read_only: bool,
    ) -> RedissonResult<Value> {
        let node = &self.nodes[self.node_index_for(eval_routing_key(key, keys))];
        self.record(node, command, read_only, false);
        if !node.reachable.load(Ordering::SeqCst) {
            return Err(RedissonError::Connectivity(format!("{} is unreachable", node.id)));
        }

        let body = if command == RedisCommand::EVALSHA {
            node.scripts
                .lock()
                .get(&script.to_lowercase())
                .cloned()
                .ok_or_else(|| {
                    RedissonError::UnknownDigest("NOSCRIPT No matching script. Please use EVAL.".to_string())
                })?
        } else {
            let program = self.program(script)?;
            node.scripts.lock().insert(sha1_of(script), script.to_string());
            return program(keys, values);
        };
        let program = self.program(&body)?;
        program(keys, values)
    }

    fn single(&self, key: Option<&str>, command: RedisCommand, args: &[Vec<u8>], read_only: bool) -> RedissonResult<Value> {
        let node = &self.nodes[self.node_index_for(key.map(str::as_bytes))];
        self.record(node, command, read_only, false);
        self.run(node, command, args)
    }
}

#[async_trait]
impl CommandExecutor for InMemoryExecutor {
    async fn read_async(&self, key: Option<&str>, command: RedisCommand, args: Vec<Vec<u8>>) -> RedissonResult<Value> {
        self.single(key, command, &args, true)
    }

    async fn write_async(&self, key: Option<&str>, command: RedisCommand, args: Vec<Vec<u8>>) -> RedissonResult<Value> {
        self.single(key, command, &args, false)
    }

    async fn eval_read_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        script: &str,
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
    ) -> RedissonResult<Value> {
        self.eval(key, command, script, &keys, &values, true)
    }

    async fn eval_write_async(
        &self,
        key: Option<&str>,
        command: RedisCommand,
        script: &str,
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
    ) -> RedissonResult<Value> {
        self.eval(key, command, script, &keys, &values, false)
    }

    async fn write_all_async(
        &self,
        command: RedisCommand,
        args: Vec<Vec<u8>>,
        callback: Arc<dyn SlotCallback>,
    ) -> RedissonResult<Value> {
        let aggregator = BroadcastAggregator::new(self.nodes.iter().map(|node| node.id.clone()), callback);
        // Report in reverse order to show the result does not depend on arrival order.
        for node in self.nodes.iter().rev() {
            self.record(node, command, false, true);
            aggregator.on_node_result(&node.id, self.run(node, command, &args));
        }
        aggregator.wait().await
    }
}
