//! Per-User Permission Context Cache
//!
//! Caches loaded [`AuthContext`]s per user using `DashMap` for lock-free
//! concurrent access. Contexts are loaded on first use and dropped on
//! logout or explicit refresh.
//!
//! Per-user generation counters keep a load that started before an
//! invalidation from writing its stale result back. A counter only lives
//! while a load for that user is in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;

use super::context::AuthContext;
use super::loader::try_load_auth_context;
use super::source::PrivilegeSource;

/// Thread-safe cache of per-user permission contexts.
#[derive(Default)]
pub struct AuthContextCache {
    contexts: DashMap<String, Arc<AuthContext>>,
    /// Generation counters of users with a load in flight.
    generations: DashMap<String, Arc<AtomicU64>>,
}

impl AuthContextCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn user_generation(&self, user_id: &str) -> Arc<AtomicU64> {
        Arc::clone(
            self.generations
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(AtomicU64::new(0)))
                .value(),
        )
    }

    /// Cached context for a user, without loading.
    pub fn get(&self, user_id: &str) -> Option<Arc<AuthContext>> {
        self.contexts.get(user_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Get the context for a user, loading it if not cached.
    ///
    /// A failed load returns the anonymous context and is not cached, so the
    /// next call tries again.
    #[tracing::instrument(skip(self, source))]
    pub async fn get_or_load(
        &self,
        source: &dyn PrivilegeSource,
        user_id: &str,
    ) -> Arc<AuthContext> {
        if let Some(ctx) = self.get(user_id) {
            return ctx;
        }

        let gen = self.user_generation(user_id);
        let gen_before = gen.load(Ordering::Acquire);

        let ctx = match try_load_auth_context(source, user_id).await {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load permissions, denying all");
                drop(gen);
                self.release_generation(user_id);
                return Arc::new(AuthContext::anonymous(Some(user_id)));
            }
        };

        // Generation check and insert happen under the entry lock that
        // `invalidate` also takes
        let ctx = match self.contexts.entry(user_id.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(slot) => {
                if gen.load(Ordering::Acquire) == gen_before {
                    slot.insert(Arc::clone(&ctx));
                }
                ctx
            }
        };

        drop(gen);
        self.release_generation(user_id);

        ctx
    }

    /// Drop the generation counter of a user once no load holds it.
    fn release_generation(&self, user_id: &str) {
        self.generations
            .remove_if(user_id, |_, gen| Arc::strong_count(gen) == 1);
    }

    /// Drop the cached context for a user (logout or refresh).
    pub fn invalidate(&self, user_id: &str) {
        let entry = self.contexts.entry(user_id.to_string());
        if let Some(gen) = self.generations.get(user_id) {
            gen.fetch_add(1, Ordering::Release);
        }
        if let Entry::Occupied(entry) = entry {
            entry.remove();
        }
    }

    /// Drop every cached context.
    pub fn clear(&self) {
        for entry in &self.generations {
            entry.value().fetch_add(1, Ordering::Release);
        }
        self.contexts.clear();
        self.generations.retain(|_, gen| Arc::strong_count(gen) > 1);
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
