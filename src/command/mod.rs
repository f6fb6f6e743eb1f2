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
mod return_type;

pub use return_type::*;

use serde::{Deserialize, Serialize};

/// Routing intent of a script evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

impl Mode {
    pub fn is_read_only(&self) -> bool {
        *self == Mode::ReadOnly
    }
}

/// Descriptor of a command the executor renders onto the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RedisCommand {
    pub name: &'static str,
    pub sub_name: Option<&'static str>,
}

impl RedisCommand {
    pub const SCRIPT_LOAD: RedisCommand = RedisCommand::with_sub("SCRIPT", "LOAD");
    pub const SCRIPT_KILL: RedisCommand = RedisCommand::with_sub("SCRIPT", "KILL");
    pub const SCRIPT_EXISTS: RedisCommand = RedisCommand::with_sub("SCRIPT", "EXISTS");
    pub const SCRIPT_FLUSH: RedisCommand = RedisCommand::with_sub("SCRIPT", "FLUSH");
    pub const EVAL: RedisCommand = RedisCommand::new("EVAL");
    pub const EVALSHA: RedisCommand = RedisCommand::new("EVALSHA");

    pub const fn new(name: &'static str) -> Self {
        Self { name, sub_name: None }
    }

    pub const fn with_sub(name: &'static str, sub_name: &'static str) -> Self {
        Self { name, sub_name: Some(sub_name) }
    }

    pub fn is_eval(&self) -> bool {
        self.sub_name.is_none() && (self.name == "EVAL" || self.name == "EVALSHA")
    }

    /// Builds `NAME [SUB] arg...`
    pub fn to_cmd(&self, args: &[Vec<u8>]) -> redis::Cmd {
        let mut cmd = redis::cmd(self.name);
        if let Some(sub_name) = self.sub_name {
            cmd.arg(sub_name);
        }
        for arg in args {
            cmd.arg(arg.as_slice());
        }
        cmd
    }

    /// Builds `EVAL|EVALSHA <script> <numkeys> <key...> <arg...>`
    pub fn to_eval_cmd(&self, script: &str, keys: &[Vec<u8>], values: &[Vec<u8>]) -> redis::Cmd {
        let mut cmd = redis::cmd(self.name);
        cmd.arg(script).arg(keys.len());
        for key in keys {
            cmd.arg(key.as_slice());
        }
        for value in values {
            cmd.arg(value.as_slice());
        }
        cmd
    }
}

impl std::fmt::Display for RedisCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sub_name {
            Some(sub_name) => write!(f, "{} {}", self.name, sub_name),
            None => write!(f, "{}", self.name),
        }
    }
}
