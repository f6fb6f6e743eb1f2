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
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use redis::{FromRedisValue, Value};
use tokio::sync::watch;
use tracing::warn;

use crate::{RedissonError, RedissonResult};

/// Receives one reply per node of a broadcast and reduces them to a single value.
///
/// `on_slot_result` may be called concurrently from several tasks.
pub trait SlotCallback: Send + Sync {
    fn on_slot_result(&self, node: &str, result: Value) -> RedissonResult<()>;

    fn on_finish(&self) -> RedissonResult<Value>;
}

/// Keeps the digest returned by `SCRIPT LOAD`; every node hashes the same body,
/// so the last reply wins.
#[derive(Default)]
pub struct DigestCallback {
    digest: Mutex<Option<String>>,
}

impl DigestCallback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotCallback for DigestCallback {
    fn on_slot_result(&self, node: &str, result: Value) -> RedissonResult<()> {
        let digest = String::from_redis_value(result)?;
        let mut current = self.digest.lock();
        if let Some(previous) = current.as_ref() {
            if *previous != digest {
                warn!("Node {} returned digest {} but {} was already recorded", node, digest, previous);
            }
        }
        *current = Some(digest);
        Ok(())
    }

    fn on_finish(&self) -> RedissonResult<Value> {
        self.digest
            .lock()
            .take()
            .map(|digest| Value::BulkString(digest.into_bytes()))
            .ok_or_else(|| RedissonError::DeserializationError("no node returned a script digest".to_string()))
    }
}

/// For broadcasts without a payload (`SCRIPT KILL`, `SCRIPT FLUSH`).
#[derive(Default)]
pub struct AckCallback;

impl SlotCallback for AckCallback {
    fn on_slot_result(&self, _node: &str, _result: Value) -> RedissonResult<()> {
        Ok(())
    }

    fn on_finish(&self) -> RedissonResult<Value> {
        Ok(Value::Okay)
    }
}

enum NodeOutcome {
    Awaiting,
    Reporting,
    Succeeded,
    Failed(RedissonError),
}

/// Collects per-node outcomes of one broadcast and completes once every node reported.
///
/// The target nodes are fixed up front. Repeated ids collapse into one node, so the
/// countdown always matches the number of distinct nodes.
pub struct BroadcastAggregator {
    total: usize,
    callback: Arc<dyn SlotCallback>,
    outcomes: Mutex<HashMap<String, NodeOutcome>>,
    remaining_tx: watch::Sender<usize>,
    remaining_rx: watch::Receiver<usize>,
    finished: AtomicBool,
}

impl BroadcastAggregator {
    pub fn new<I, S>(nodes: I, callback: Arc<dyn SlotCallback>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outcomes: HashMap<String, NodeOutcome> = nodes
            .into_iter()
            .map(|node| (node.into(), NodeOutcome::Awaiting))
            .collect();
        let total = outcomes.len();
        let (remaining_tx, remaining_rx) = watch::channel(total);
        Self {
            total,
            callback,
            outcomes: Mutex::new(outcomes),
            remaining_tx,
            remaining_rx,
            finished: AtomicBool::new(false),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        *self.remaining_rx.borrow()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Records the reply of `node`. Replies from unknown nodes and repeated replies are ignored.
    pub fn on_node_result(&self, node: &str, result: RedissonResult<Value>) {
        {
            let mut outcomes = self.outcomes.lock();
            match outcomes.get_mut(node) {
                Some(outcome) if matches!(outcome, NodeOutcome::Awaiting) => *outcome = NodeOutcome::Reporting,
                Some(_) => {
                    warn!("Ignoring duplicate broadcast reply from node {}", node);
                    return;
                }
                None => {
                    warn!("Ignoring broadcast reply from unexpected node {}", node);
                    return;
                }
            }
        }

        let outcome = match result.and_then(|value| self.callback.on_slot_result(node, value)) {
            Ok(()) => NodeOutcome::Succeeded,
            Err(e) => NodeOutcome::Failed(e),
        };
        self.outcomes.lock().insert(node.to_string(), outcome);
        self.remaining_tx.send_modify(|remaining| *remaining = remaining.saturating_sub(1));
    }

    /// Waits for every node, then reduces. Can only be called once.
    pub async fn wait(&self) -> RedissonResult<Value> {
        let mut rx = self.remaining_rx.clone();
        loop {
            let remaining = *rx.borrow_and_update();
            if remaining == 0 {
                break;
            }
            rx.changed()
                .await
                .map_err(|e| RedissonError::AsyncError(e.to_string()))?;
        }
        self.finish()
    }

    fn finish(&self) -> RedissonResult<Value> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(RedissonError::AsyncError("broadcast result already consumed".to_string()));
        }

        let outcomes = std::mem::take(&mut *self.outcomes.lock());
        let mut failures: Vec<(String, RedissonError)> = outcomes
            .into_iter()
            .filter_map(|(node, outcome)| match outcome {
                NodeOutcome::Failed(e) => Some((node, e)),
                _ => None,
            })
            .collect();

        if failures.is_empty() {
            return self.callback.on_finish();
        }
        if self.total == 1 {
            return Err(failures.remove(0).1);
        }

        failures.sort_by(|a, b| a.0.cmp(&b.0));
        warn!("Broadcast failed on {}/{} nodes", failures.len(), self.total);
        Err(RedissonError::PartialBroadcastFailure {
            failed: failures.len(),
            total: self.total,
            errors: failures
                .into_iter()
                .map(|(node, e)| (node, e.to_string()))
                .collect(),
        })
    }
}
