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

//! Redisson-style Lua scripting for Redis.
//!
//! [`AsyncRScript`] and [`RScript`] expose `EVAL`, `EVALSHA` and the `SCRIPT`
//! commands. They build command descriptors and hand them to a
//! [`CommandExecutor`]; [`RedisCommandExecutor`] is the pooled implementation
//! for single-server, sentinel and cluster deployments.

mod command;
mod config;
mod connection;
mod errors;
mod executor;
mod util;
mod objects;
mod client;

pub use command::*;
pub use config::*;
pub use connection::*;
pub use errors::*;
pub use executor::*;
pub use util::*;
pub use objects::*;
pub use client::*;
