//! Connection lifecycle of the message store
//!
//! The first caller to ask for a connection starts the open sequence (pool
//! creation plus schema migration). Callers that arrive while it is still
//! running await the same shared future, so the database is opened and
//! migrated once. `close` drops the pool; the next `connect` opens again.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::pool::{create_pool, DbPool, StoreLocation};
use super::schema::initialize_schema;
use crate::types::error::{MessagingError, Result};

type OpenFuture = Shared<BoxFuture<'static, Result<DbPool>>>;

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Uninitialized,
    Opening,
    Open,
    Closed,
}

enum ConnectionState {
    Uninitialized,
    Opening { generation: u64, future: OpenFuture },
    Open(DbPool),
    Closed,
}

struct Inner {
    state: ConnectionState,
    /// Bumped for every open attempt
    generation: u64,
}

pub struct ConnectionManager {
    location: StoreLocation,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location,
            inner: Mutex::new(Inner {
                state: ConnectionState::Uninitialized,
                generation: 0,
            }),
        }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.lock().state {
            ConnectionState::Uninitialized => ConnectionStatus::Uninitialized,
            ConnectionState::Opening { .. } => ConnectionStatus::Opening,
            ConnectionState::Open(_) => ConnectionStatus::Open,
            ConnectionState::Closed => ConnectionStatus::Closed,
        }
    }

    /// Number of open sequences started so far
    pub fn open_attempts(&self) -> u64 {
        self.lock().generation
    }

    /// Return the open pool, opening the database if needed.
    pub async fn connect(&self) -> Result<DbPool> {
        let (generation, future) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match &inner.state {
                ConnectionState::Open(pool) => return Ok(pool.clone()),
                ConnectionState::Opening { generation, future } => (*generation, future.clone()),
                ConnectionState::Uninitialized | ConnectionState::Closed => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let future = Self::open(self.location.clone());
                    inner.state = ConnectionState::Opening {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let result = future.await;

        // Only the attempt that is still current may settle the state; a
        // close (or a newer open) that happened meanwhile wins.
        let mut inner = self.lock();
        let current = matches!(
            &inner.state,
            ConnectionState::Opening { generation: g, .. } if *g == generation
        );
        if current {
            inner.state = match &result {
                Ok(pool) => ConnectionState::Open(pool.clone()),
                Err(e) => {
                    warn!("Failed to open message store: {}", e);
                    ConnectionState::Uninitialized
                }
            };
        }

        result
    }

    /// Release the connection. No-op when nothing is open.
    pub async fn close(&self) {
        let pending = {
            let mut inner = self.lock();
            match std::mem::replace(&mut inner.state, ConnectionState::Closed) {
                ConnectionState::Open(pool) => {
                    drop(pool);
                    info!("Closed message store");
                    None
                }
                ConnectionState::Opening { future, .. } => Some(future),
                ConnectionState::Uninitialized => {
                    inner.state = ConnectionState::Uninitialized;
                    None
                }
                ConnectionState::Closed => None,
            }
        };

        if let Some(future) = pending {
            debug!("Closing message store after in-flight open completes");
            // The opened pool (if any) is dropped right here.
            let _ = future.await;
        }
    }

    fn open(location: StoreLocation) -> OpenFuture {
        async move {
            tokio::task::spawn_blocking(move || {
                let pool = create_pool(&location)?;
                let mut conn = pool.get()?;
                initialize_schema(&mut conn)?;
                drop(conn);
                Ok::<_, MessagingError>(pool)
            })
            .await
            .map_err(MessagingError::from)?
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
