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
use redisson_script::{AsyncRedissonClient, Mode, RedissonConfig, RedissonError, RedissonResult, ReturnType, NO_ARGS};

const INCR_BY: &str = "return redis.call('INCRBY', KEYS[1], ARGV[1])";

#[tokio::main]
async fn main() -> RedissonResult<()> {
    // 1. Create configuration
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let config = RedissonConfig::single_server(&url);

    // 2. Create async client and script facade
    let client = AsyncRedissonClient::new(config).await?;
    let script = client.get_script();

    // 3. Cache the script on every node, then run it by digest
    let digest = script.script_load(None, INCR_BY).await?;
    println!("Loaded script {}", digest);

    let counter: i64 = script
        .eval_sha(None, Mode::ReadWrite, &digest, ReturnType::Integer, &["demo:counter"], &[5])
        .await?;
    println!("Counter after EVALSHA: {}", counter);

    // 4. Run a script by body
    let greeting: String = script
        .eval(None, Mode::ReadOnly, "return 'hello'", ReturnType::Value, NO_ARGS, NO_ARGS)
        .await?;
    println!("EVAL returned {}", greeting);

    // 5. Check and flush the script cache
    let exists = script.script_exists(None, &[digest.as_str()]).await?;
    println!("Cached: {:?}", exists);

    script.script_flush(None).await?;
    match script
        .eval_sha::<i64, _, _>(None, Mode::ReadWrite, &digest, ReturnType::Integer, &["demo:counter"], &[5])
        .await
    {
        Err(RedissonError::UnknownDigest(message)) => println!("After flush: {}", message),
        other => println!("After flush: {:?}", other),
    }

    client.shutdown();
    Ok(())
}
