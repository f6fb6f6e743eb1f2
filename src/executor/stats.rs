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
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct ExecutorStats {
    pub total_commands: u64,
    pub error_count: u64,
    pub broadcast_count: u64,
    pub total_response_time_ms: f64,
    pub last_reset: Instant,
}

impl ExecutorStats {
    pub fn new() -> Self {
        Self {
            total_commands: 0,
            error_count: 0,
            broadcast_count: 0,
            total_response_time_ms: 0.0,
            last_reset: Instant::now(),
        }
    }

    pub fn record_success(&mut self, elapsed: Duration) {
        self.total_commands += 1;
        self.total_response_time_ms += elapsed.as_millis() as f64;
    }

    pub fn record_failure(&mut self, elapsed: Duration) {
        self.total_commands += 1;
        self.error_count += 1;
        self.total_response_time_ms += elapsed.as_millis() as f64;
    }

    pub fn record_broadcast(&mut self) {
        self.broadcast_count += 1;
    }

    pub fn avg_response_time_ms(&self) -> f64 {
        if self.total_commands == 0 {
            0.0
        } else {
            self.total_response_time_ms / self.total_commands as f64
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.total_commands == 0 {
            0.0
        } else {
            self.error_count as f64 / self.total_commands as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ExecutorStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut stats = ExecutorStats::new();
        assert_eq!(stats.error_rate(), 0.0);
        stats.record_success(Duration::from_millis(10));
        stats.record_failure(Duration::from_millis(30));
        stats.record_broadcast();
        assert_eq!(stats.total_commands, 2);
        assert_eq!(stats.error_rate(), 0.5);
        assert_eq!(stats.avg_response_time_ms(), 20.0);
        stats.reset();
        assert_eq!(stats.broadcast_count, 0);
    }
}
