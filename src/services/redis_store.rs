use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use crate::database::pool::create_connection_manager;
use crate::error::Result;
use crate::models::rate_limit::ClientRequestRecord;
use crate::services::counter_store::CounterStore;

// INCR and the expiry run server-side in one script. A key that lost its
// TTL gets a fresh one here.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Counter store shared by every instance behind the same Redis. Window
/// expiry is delegated to Redis key TTLs.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    key_prefix: String,
    script: Script,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            script: Script::new(INCREMENT_SCRIPT),
        }
    }

    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let conn = create_connection_manager(url).await?;
        Ok(Self::new(conn, key_prefix))
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str, now_ms: i64) -> Result<Option<ClientRequestRecord>> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn.clone();
        let (count, ttl): (Option<u64>, i64) = redis::pipe()
            .cmd("GET")
            .arg(&redis_key)
            .cmd("PTTL")
            .arg(&redis_key)
            .query_async(&mut conn)
            .await?;
        Ok(match count {
            Some(count) if ttl >= 0 => Some(ClientRequestRecord {
                count,
                reset_at_ms: now_ms.saturating_add(ttl),
            }),
            _ => None,
        })
    }

    async fn increment(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: u64,
    ) -> Result<ClientRequestRecord> {
        let mut conn = self.conn.clone();
        let (count, ttl): (u64, i64) = self
            .script
            .key(self.redis_key(key))
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await?;
        Ok(ClientRequestRecord {
            count,
            reset_at_ms: now_ms.saturating_add(ttl),
        })
    }

    async fn sweep_expired(&self, _now_ms: i64) -> Result<usize> {
        Ok(0)
    }
}
