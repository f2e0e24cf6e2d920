//! Command dispatcher: maps a parsed RESP token vector onto a [`Datastore`]
//! operation and frames the result as a [`Reply`].
//!
//! The dispatcher is stateless — it holds no data of its own, only the
//! match arm that routes a command name to the store method that
//! implements it. No error is allowed to escape as a panic: numeric
//! parsing failures and datastore errors are both turned into RESP error
//! replies here, per the propagation policy of the specification's error
//! handling section.

use keyspace_domain::{Key, KeyspaceError};
use keyspace_protocol::Reply;
use keyspace_store::Datastore;

/// Dispatch one already-parsed command to `store`, returning the reply to
/// send back to the client.
///
/// An empty token vector (a malformed or blank request) yields a protocol
/// error reply; the caller does not need to special-case it.
pub fn dispatch(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    let Some(name) = tokens.first() else {
        return KeyspaceError::Protocol("empty command".into()).into();
    };
    let name = String::from_utf8_lossy(name).to_ascii_uppercase();

    match name.as_str() {
        "PING" => cmd_ping(tokens),
        "ECHO" => cmd_echo(tokens),
        "FLUSHALL" => cmd_flushall(store, tokens),
        "SET" => cmd_set(store, tokens),
        "GET" => cmd_get(store, tokens),
        "KEYS" => cmd_keys(store, tokens),
        "TYPE" => cmd_type(store, tokens),
        "DEL" | "UNLINK" => cmd_del(store, tokens),
        "EXPIRE" => cmd_expire(store, tokens),
        "RENAME" => cmd_rename(store, tokens),
        "LLEN" => cmd_llen(store, tokens),
        "LPUSH" => cmd_push(store, tokens, true),
        "RPUSH" => cmd_push(store, tokens, false),
        "LPOP" => cmd_pop(store, tokens, true),
        "RPOP" => cmd_pop(store, tokens, false),
        "LREM" => cmd_lrem(store, tokens),
        "LINDEX" => cmd_lindex(store, tokens),
        "LSET" => cmd_lset(store, tokens),
        "HSET" => cmd_hset(store, tokens),
        "HGET" => cmd_hget(store, tokens),
        "HEXISTS" => cmd_hexists(store, tokens),
        "HDEL" => cmd_hdel(store, tokens),
        "HGETALL" => cmd_hgetall(store, tokens),
        "HKEYS" => cmd_hkeys(store, tokens),
        "HVALS" => cmd_hvals(store, tokens),
        "HLEN" => cmd_hlen(store, tokens),
        "HMSET" => cmd_hmset(store, tokens),
        other => {
            tracing::debug!(command = other, "unknown command");
            Reply::Error("ERROR: unknown command".into())
        }
    }
}

fn wrong_arity(name: &str) -> Reply {
    KeyspaceError::wrong_arity(name).into()
}

fn invalid(message: impl Into<String>) -> Reply {
    KeyspaceError::Argument(message.into()).into()
}

fn key_at(tokens: &[Vec<u8>], index: usize) -> Key {
    Key::from(tokens[index].clone())
}

fn parse_u64(bytes: &[u8], what: &str) -> Result<u64, Reply> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| invalid(format!("invalid {what}")))
}

fn parse_i64(bytes: &[u8], what: &str) -> Result<i64, Reply> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| invalid(format!("invalid {what}")))
}

fn bulk_or_nil(value: Option<Vec<u8>>) -> Reply {
    match value {
        Some(v) => Reply::bulk(v),
        None => Reply::Nil,
    }
}

fn cmd_ping(tokens: &[Vec<u8>]) -> Reply {
    match tokens.len() {
        1 => Reply::Simple("PONG".into()),
        2 => Reply::bulk(tokens[1].clone()),
        _ => wrong_arity("PING"),
    }
}

fn cmd_echo(tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("ECHO");
    }
    Reply::bulk(tokens[1].clone())
}

fn cmd_flushall(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 1 {
        return wrong_arity("FLUSHALL");
    }
    store.flushall();
    Reply::ok()
}

fn cmd_set(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() < 3 || tokens.len() > 4 {
        return wrong_arity("SET");
    }
    let ttl = if tokens.len() == 4 {
        match parse_u64(&tokens[3], "ttl") {
            Ok(v) => v,
            Err(reply) => return reply,
        }
    } else {
        0
    };
    store.set(key_at(tokens, 1), tokens[2].clone(), ttl);
    Reply::ok()
}

fn cmd_get(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("GET");
    }
    match store.get(&key_at(tokens, 1)) {
        Ok(value) => bulk_or_nil(value),
        Err(err) => err.into(),
    }
}

fn cmd_keys(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 1 {
        return wrong_arity("KEYS");
    }
    let items = store
        .keys()
        .into_iter()
        .map(|k| Reply::bulk(k.into_bytes()))
        .collect();
    Reply::Array(items)
}

fn cmd_type(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("TYPE");
    }
    Reply::Simple(store.type_of(&key_at(tokens, 1)).as_str().to_string())
}

fn cmd_del(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("DEL");
    }
    Reply::Integer(store.del(&key_at(tokens, 1)))
}

fn cmd_expire(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 3 {
        return wrong_arity("EXPIRE");
    }
    let secs = match parse_u64(&tokens[2], "seconds") {
        Ok(v) => v,
        Err(reply) => return reply,
    };
    match store.expire(&key_at(tokens, 1), secs) {
        Ok(()) => Reply::ok(),
        Err(err) => err.into(),
    }
}

fn cmd_rename(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 3 {
        return wrong_arity("RENAME");
    }
    match store.rename(&key_at(tokens, 1), &key_at(tokens, 2)) {
        Ok(()) => Reply::ok(),
        Err(err) => err.into(),
    }
}

fn cmd_llen(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("LLEN");
    }
    match store.llen(&key_at(tokens, 1)) {
        Ok(n) => Reply::Integer(n),
        Err(err) => err.into(),
    }
}

fn cmd_push(store: &Datastore, tokens: &[Vec<u8>], front: bool) -> Reply {
    let name = if front { "LPUSH" } else { "RPUSH" };
    if tokens.len() != 3 {
        return wrong_arity(name);
    }
    let key = key_at(tokens, 1);
    let result = if front {
        store.lpush(&key, tokens[2].clone())
    } else {
        store.rpush(&key, tokens[2].clone())
    };
    match result {
        Ok(n) => Reply::Integer(n),
        Err(err) => err.into(),
    }
}

fn cmd_pop(store: &Datastore, tokens: &[Vec<u8>], front: bool) -> Reply {
    let name = if front { "LPOP" } else { "RPOP" };
    if tokens.len() != 2 {
        return wrong_arity(name);
    }
    let key = key_at(tokens, 1);
    let result = if front { store.lpop(&key) } else { store.rpop(&key) };
    match result {
        Ok(value) => bulk_or_nil(value),
        Err(err) => err.into(),
    }
}

fn cmd_lrem(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 4 {
        return wrong_arity("LREM");
    }
    let count = match parse_i64(&tokens[2], "count") {
        Ok(v) => v,
        Err(reply) => return reply,
    };
    match store.lrem(&key_at(tokens, 1), count, &tokens[3]) {
        Ok(n) => Reply::Integer(n),
        Err(err) => err.into(),
    }
}

fn cmd_lindex(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 3 {
        return wrong_arity("LINDEX");
    }
    let index = match parse_i64(&tokens[2], "index") {
        Ok(v) => v,
        Err(reply) => return reply,
    };
    match store.lindex(&key_at(tokens, 1), index) {
        Ok(value) => bulk_or_nil(value),
        Err(err) => err.into(),
    }
}

fn cmd_lset(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 4 {
        return wrong_arity("LSET");
    }
    let index = match parse_i64(&tokens[2], "index") {
        Ok(v) => v,
        Err(reply) => return reply,
    };
    match store.lset(&key_at(tokens, 1), index, tokens[3].clone()) {
        Ok(()) => Reply::ok(),
        Err(err) => err.into(),
    }
}

fn cmd_hset(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 4 {
        return wrong_arity("HSET");
    }
    match store.hset(&key_at(tokens, 1), tokens[2].clone(), tokens[3].clone()) {
        Ok(n) => Reply::Integer(n),
        Err(err) => err.into(),
    }
}

fn cmd_hget(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 3 {
        return wrong_arity("HGET");
    }
    match store.hget(&key_at(tokens, 1), &tokens[2]) {
        Ok(value) => bulk_or_nil(value),
        Err(err) => err.into(),
    }
}

fn cmd_hexists(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 3 {
        return wrong_arity("HEXISTS");
    }
    match store.hexists(&key_at(tokens, 1), &tokens[2]) {
        Ok(true) => Reply::Integer(1),
        Ok(false) => Reply::Integer(0),
        Err(err) => err.into(),
    }
}

fn cmd_hdel(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 3 {
        return wrong_arity("HDEL");
    }
    match store.hdel(&key_at(tokens, 1), &tokens[2]) {
        Ok(n) => Reply::Integer(n),
        Err(err) => err.into(),
    }
}

fn cmd_hgetall(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("HGETALL");
    }
    match store.hgetall(&key_at(tokens, 1)) {
        Ok(pairs) => {
            let mut items = Vec::with_capacity(pairs.len() * 2);
            for (field, value) in pairs {
                items.push(Reply::bulk(field));
                items.push(Reply::bulk(value));
            }
            Reply::Array(items)
        }
        Err(err) => err.into(),
    }
}

fn cmd_hkeys(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("HKEYS");
    }
    match store.hkeys(&key_at(tokens, 1)) {
        Ok(fields) => Reply::Array(fields.into_iter().map(Reply::bulk).collect()),
        Err(err) => err.into(),
    }
}

fn cmd_hvals(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("HVALS");
    }
    match store.hvals(&key_at(tokens, 1)) {
        Ok(values) => Reply::Array(values.into_iter().map(Reply::bulk).collect()),
        Err(err) => err.into(),
    }
}

fn cmd_hlen(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() != 2 {
        return wrong_arity("HLEN");
    }
    match store.hlen(&key_at(tokens, 1)) {
        Ok(n) => Reply::Integer(n),
        Err(err) => err.into(),
    }
}

fn cmd_hmset(store: &Datastore, tokens: &[Vec<u8>]) -> Reply {
    if tokens.len() < 4 || (tokens.len() - 2) % 2 != 0 {
        return wrong_arity("HMSET");
    }
    let pairs = tokens[2..]
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    match store.hmset(&key_at(tokens, 1), pairs) {
        Ok(()) => Reply::ok(),
        Err(err) => err.into(),
    }
}
