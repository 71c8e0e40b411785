//! Admission control: whitelist, blocked flag, token buckets.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use pdm_store::SecretStore;

use crate::errors::{AdmitRejection, PolicyError};
use crate::types::{OriginConfig, RateLimitConfig};
use crate::{ALWAYS_ALLOWED_ACTIONS, ORIGIN_CONFIGS_KEY};

/// Buckets beyond this count trigger a stale-bucket sweep.
const MAX_BUCKETS: usize = 1024;

struct RateBucket {
    window_ms: u64,
    timestamps: Vec<u64>,
}

/// Owns origin configs and their in-memory rate buckets.
pub struct OriginPolicy {
    store: SecretStore,
    configs: Mutex<HashMap<String, OriginConfig>>,
    buckets: Mutex<HashMap<String, RateBucket>>,
}

fn lock_map<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Origin policy mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl OriginPolicy {
    /// Load persisted origin configs; buckets start empty (a restart grants
    /// a fresh budget).
    pub fn load(store: SecretStore) -> Result<Self, PolicyError> {
        let persisted: Vec<OriginConfig> = store
            .get_persistent(ORIGIN_CONFIGS_KEY)?
            .unwrap_or_default();
        let configs = persisted
            .into_iter()
            .map(|c| (c.origin.clone(), c))
            .collect::<HashMap<_, _>>();

        if !configs.is_empty() {
            tracing::info!(count = configs.len(), "Loaded origin configs");
        }
        Ok(Self {
            store,
            configs: Mutex::new(configs),
            buckets: Mutex::new(HashMap::new()),
        })
    }

    /// Admit or reject `action` from `origin` at `now_ms`.
    ///
    /// An origin seen for the first time gets an open record (a page may
    /// issue its first request before an explicit `connect`); the action
    /// whitelist exists only once `connect` has installed one. Check order:
    /// blocked, then the whitelist, then the rate bucket, so a disallowed
    /// action never consumes budget and a rejected request never counts as
    /// use.
    pub fn admit(&self, origin: &str, action: &str, now_ms: u64) -> Result<(), AdmitRejection> {
        let rate_limit = {
            let mut configs = lock_map(&self.configs);
            let config = configs
                .entry(origin.to_string())
                .or_insert_with(|| OriginConfig::with_defaults(origin, now_ms));

            if config.blocked {
                return Err(AdmitRejection::Blocked);
            }
            if let Some(allowed) = &config.allowed_actions {
                if !ALWAYS_ALLOWED_ACTIONS.contains(&action)
                    && !allowed.iter().any(|a| a == action)
                {
                    return Err(AdmitRejection::NotAllowed {
                        action: action.to_string(),
                    });
                }
            }
            config.rate_limit
        };

        self.check_rate(origin, rate_limit, now_ms)?;

        {
            let mut configs = lock_map(&self.configs);
            if let Some(config) = configs.get_mut(origin) {
                config.last_used_at = now_ms;
            }
            self.persist(&configs);
        }
        Ok(())
    }

    /// Create or update an origin record, installing the narrowing
    /// whitelist: the requested actions, or the default set when the
    /// request names none. Returns the effective allowed actions.
    pub fn connect(
        &self,
        origin: &str,
        requested_actions: &[String],
        rate_limit: Option<RateLimitConfig>,
        now_ms: u64,
    ) -> Result<Vec<String>, PolicyError> {
        if let Some(limit) = &rate_limit {
            if limit.max_requests == 0 || limit.window_ms == 0 {
                return Err(PolicyError::InvalidRateLimit(
                    "maxRequests and windowMs must be positive".into(),
                ));
            }
        }

        let allowed = {
            let mut configs = lock_map(&self.configs);
            let config = configs
                .entry(origin.to_string())
                .or_insert_with(|| OriginConfig::with_defaults(origin, now_ms));

            let actions = if requested_actions.is_empty() {
                crate::DEFAULT_ALLOWED_ACTIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            } else {
                requested_actions.to_vec()
            };
            config.allowed_actions = Some(actions.clone());
            if let Some(limit) = rate_limit {
                config.rate_limit = limit;
            }
            config.last_used_at = now_ms;
            self.persist(&configs);
            actions
        };

        tracing::info!(origin, "Origin connected");
        Ok(allowed)
    }

    /// Remove an origin's record and bucket.
    pub fn disconnect(&self, origin: &str) -> bool {
        let removed = {
            let mut configs = lock_map(&self.configs);
            let removed = configs.remove(origin).is_some();
            if removed {
                self.persist(&configs);
            }
            removed
        };
        lock_map(&self.buckets).remove(origin);
        if removed {
            tracing::info!(origin, "Origin disconnected");
        }
        removed
    }

    /// Snapshot of one origin's record.
    pub fn config_for(&self, origin: &str) -> Option<OriginConfig> {
        lock_map(&self.configs).get(origin).cloned()
    }

    fn check_rate(
        &self,
        origin: &str,
        limit: RateLimitConfig,
        now_ms: u64,
    ) -> Result<(), AdmitRejection> {
        let mut buckets = lock_map(&self.buckets);
        let bucket = buckets.entry(origin.to_string()).or_insert(RateBucket {
            window_ms: limit.window_ms,
            timestamps: Vec::new(),
        });
        bucket.window_ms = limit.window_ms;

        // Drop everything outside the current window.
        bucket
            .timestamps
            .retain(|&ts| ts + limit.window_ms > now_ms);

        if bucket.timestamps.len() >= limit.max_requests as usize {
            return Err(AdmitRejection::RateLimited);
        }
        bucket.timestamps.push(now_ms);

        if buckets.len() > MAX_BUCKETS {
            evict_stale(&mut buckets, now_ms);
        }
        Ok(())
    }

    fn persist(&self, configs: &HashMap<String, OriginConfig>) {
        let mut list: Vec<&OriginConfig> = configs.values().collect();
        list.sort_by(|a, b| a.origin.cmp(&b.origin));
        if let Err(e) = self.store.put_persistent(ORIGIN_CONFIGS_KEY, &list) {
            tracing::warn!(error = %e, "Failed to persist origin configs, continuing in memory");
        }
    }
}

fn evict_stale(buckets: &mut HashMap<String, RateBucket>, now_ms: u64) {
    buckets.retain(|_, bucket| {
        bucket
            .timestamps
            .last()
            .is_some_and(|&newest| newest + bucket.window_ms > now_ms)
    });
}
