// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! RediSearch backend
//!
//! Documents are HASHes under `doc:<sha256>` with fields `name` (TAG) and
//! `embedding` (raw little-endian FLOAT32). Queries use a KNN 1 vector search
//! sorted by `vector_score` (cosine distance).

use crate::codec::embedding_to_bytes;
use crate::store::{AnnStore, IndexSchema, IndexStatus, Neighbor, StoredEntry};
use crate::{CacheError, CacheResult, DEFAULT_INDEX_NAME};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info};

const KNN_QUERY: &str = "*=>[KNN 1 @embedding $vec_param AS vector_score]";

/// Connection parameters for the Redis backend
#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
    pub index_name: String,
    pub connect_timeout: Duration,
}

impl RedisSettings {
    pub fn url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!("redis://:{}@{}:{}/{}", password, self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

pub struct RedisAnnStore {
    client: redis::Client,
    connection: Mutex<Option<redis::Connection>>,
    index_name: String,
    connect_timeout: Duration,
}

impl RedisAnnStore {
    /// Build a client; no connection is made until the first call
    pub fn new(settings: &RedisSettings) -> CacheResult<Self> {
        let client = redis::Client::open(settings.url())?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            index_name: settings.index_name.clone(),
            connect_timeout: settings.connect_timeout,
        })
    }

    /// Run `op` on the shared connection, reconnecting lazily
    ///
    /// A connection that failed at the transport level is dropped so the next
    /// call dials again.
    fn with_connection<T, F>(&self, op: F) -> CacheResult<T>
    where
        F: FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    {
        let mut guard = self.connection.lock();
        if guard.is_none() {
            let connection = self.client.get_connection_with_timeout(self.connect_timeout)?;
            debug!("[CACHE] Connected to {:?}", self.client.get_connection_info().addr);
            *guard = Some(connection);
        }
        let Some(connection) = guard.as_mut() else {
            return Err(CacheError::Unreachable("no connection".to_string()));
        };

        match op(connection) {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
                    *guard = None;
                }
                Err(err.into())
            }
        }
    }
}

impl AnnStore for RedisAnnStore {
    fn ping(&self) -> CacheResult<()> {
        self.with_connection(|con| redis::cmd("PING").query::<String>(con))
            .map(|_| ())
    }

    fn ensure_index(&self, schema: &IndexSchema) -> CacheResult<IndexStatus> {
        self.with_connection(|con| {
            let info: redis::RedisResult<redis::Value> =
                redis::cmd("FT.INFO").arg(&schema.index_name).query(con);
            match info {
                Ok(_) => return Ok(IndexStatus::AlreadyExists),
                Err(err) if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() => {
                    return Err(err)
                }
                // Unknown index
                Err(_) => {}
            }

            let created: redis::RedisResult<()> = redis::cmd("FT.CREATE")
                .arg(&schema.index_name)
                .arg("ON")
                .arg("HASH")
                .arg("PREFIX")
                .arg(1)
                .arg(&schema.key_prefix)
                .arg("SCHEMA")
                .arg("name")
                .arg("TAG")
                .arg("embedding")
                .arg("VECTOR")
                .arg("FLAT")
                .arg(6)
                .arg("TYPE")
                .arg("FLOAT32")
                .arg("DIM")
                .arg(schema.dimension)
                .arg("DISTANCE_METRIC")
                .arg("COSINE")
                .query(con);

            match created {
                Ok(()) => {
                    info!("[CACHE] Created index '{}' (dim {})", schema.index_name, schema.dimension);
                    Ok(IndexStatus::Created)
                }
                // Another process won the race
                Err(err) if err.to_string().to_lowercase().contains("already exists") => {
                    Ok(IndexStatus::AlreadyExists)
                }
                Err(err) => Err(err),
            }
        })
    }

    fn nearest(&self, query: &[f32]) -> CacheResult<Option<Neighbor>> {
        let reply: Vec<redis::Value> = self.with_connection(|con| {
            redis::cmd("FT.SEARCH")
                .arg(&self.index_name)
                .arg(KNN_QUERY)
                .arg("PARAMS")
                .arg(2)
                .arg("vec_param")
                .arg(embedding_to_bytes(query))
                .arg("SORTBY")
                .arg("vector_score")
                .arg("RETURN")
                .arg(2)
                .arg("name")
                .arg("vector_score")
                .arg("DIALECT")
                .arg(2)
                .query(con)
        })?;

        parse_knn_reply(&reply)
    }

    fn upsert(&self, key: &str, entry: &StoredEntry, ttl: Duration) -> CacheResult<()> {
        let bytes = embedding_to_bytes(entry.embedding.as_slice());
        self.with_connection(|con| {
            redis::pipe()
                .atomic()
                .cmd("HSET")
                .arg(key)
                .arg("name")
                .arg(&entry.name)
                .arg("embedding")
                .arg(bytes)
                .ignore()
                .cmd("EXPIRE")
                .arg(key)
                .arg(ttl.as_secs().max(1))
                .ignore()
                .query::<()>(con)
        })
    }

    fn len(&self) -> CacheResult<usize> {
        let reply: Vec<redis::Value> = self.with_connection(|con| {
            redis::cmd("FT.SEARCH")
                .arg(&self.index_name)
                .arg("*")
                .arg("LIMIT")
                .arg(0)
                .arg(0)
                .query(con)
        })?;
        let total = match reply.first() {
            Some(value) => redis::from_redis_value::<i64>(value)?,
            None => 0,
        };
        Ok(total.max(0) as usize)
    }
}

/// `[total, key, [field, value, ...], ...]` → first document
fn parse_knn_reply(reply: &[redis::Value]) -> CacheResult<Option<Neighbor>> {
    let total = match reply.first() {
        Some(value) => redis::from_redis_value::<i64>(value)?,
        None => return Ok(None),
    };
    if total <= 0 || reply.len() < 3 {
        return Ok(None);
    }

    let key: String = redis::from_redis_value(&reply[1])?;
    let fields: Vec<String> = redis::from_redis_value(&reply[2])?;

    let mut name = None;
    let mut score = None;
    for pair in fields.chunks_exact(2) {
        match pair[0].as_str() {
            "name" => name = Some(pair[1].clone()),
            "vector_score" => score = Some(pair[1].clone()),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| CacheError::InvalidEntry(format!("{} has no name", key)))?;
    let distance = score
        .ok_or_else(|| CacheError::InvalidEntry(format!("{} has no vector_score", key)))?
        .parse::<f64>()
        .map_err(|e| CacheError::InvalidEntry(format!("{} vector_score: {}", key, e)))?;

    Ok(Some(Neighbor { key, name, distance }))
}
