#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
};
use std::time::Duration;
use users_cache_service::{
    datalayer::CRUD::{
        redis::CacheStore,
        types::{NewUser, User},
        users::UserRepository,
    },
    errors::errors::{ServiceError, ServiceResult},
    state::AppState,
};

/// Users kept in memory; ids are assigned sequentially from 1
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<i64, User>>,
    next_id: AtomicI64,
    pub lookups: AtomicUsize,
    pub down: AtomicBool,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: NewUser) -> ServiceResult<User> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            name: user.name,
            lastname: user.lastname,
            age: user.age,
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> ServiceResult<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn ping(&self) -> ServiceResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ServiceError::DatabaseConnectionError);
        }
        Ok(())
    }
}

/// String cache kept in memory; can be switched to fail every call, or to
/// hang on every call like a Redis that stopped answering
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
    pub down: AtomicBool,
    pub stalled: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn check(&self) -> ServiceResult<()> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(ServiceError::CacheUnavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> ServiceResult<Option<String>> {
        self.check().await?;
        Ok(self.entry(key))
    }

    async fn set(&self, key: &str, value: String) -> ServiceResult<()> {
        self.check().await?;
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn ping(&self) -> ServiceResult<()> {
        self.check().await
    }
}

pub struct TestApp {
    pub state: AppState,
    pub repository: Arc<InMemoryUserRepository>,
    pub cache: Arc<InMemoryCache>,
}

pub fn test_app() -> TestApp {
    test_app_with("user", Duration::from_millis(500))
}

pub fn test_app_with(key_prefix: &str, cache_timeout: Duration) -> TestApp {
    let repository = Arc::new(InMemoryUserRepository::new());
    let cache = Arc::new(InMemoryCache::new());
    let state = AppState::new(repository.clone(), cache.clone(), key_prefix, cache_timeout);

    TestApp {
        state,
        repository,
        cache,
    }
}
