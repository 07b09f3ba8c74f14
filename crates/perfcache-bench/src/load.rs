//! Threaded increment load against an in-memory counter category.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use perfcache_api::{CategoryDefinition, CounterType, MemoryCounterApi};
use perfcache_core::{
    base_type_for, CacheConfig, CacheError, CacheResult, CounterFacade, KeyStrategy,
};
use tracing::{debug, info};

pub const LOAD_CATEGORY: &str = "PerfcacheBench";
pub const LOAD_COUNTER: &str = "Operations";
pub const LOAD_BASE: &str = "OperationsBase";

/// Shape of one load run.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub threads: usize,
    pub iterations: usize,
    pub counter_type: CounterType,
    pub key_strategy: KeyStrategy,
}

/// Outcome of one load run.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub elapsed: Duration,
    pub operations: u64,
    /// Raw value of the counter that plain increments advance: the base when
    /// one is bound, the counter itself otherwise.
    pub observed: i64,
    pub advanced_base: bool,
}

impl LoadReport {
    pub fn expected(&self) -> i64 {
        i64::try_from(self.operations).unwrap_or(i64::MAX)
    }

    pub fn is_exact(&self) -> bool {
        self.observed == self.expected()
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.operations as f64 / secs
    }
}

fn load_category(counter_type: CounterType) -> CategoryDefinition {
    let definition = CategoryDefinition::new(LOAD_CATEGORY).counter(LOAD_COUNTER, counter_type);
    match base_type_for(counter_type) {
        Some(base) => definition.counter(LOAD_BASE, base),
        None => definition,
    }
}

/// Runs `threads` workers, each calling `increment` `iterations` times on
/// the same key after the category has been warmed.
pub fn run(plan: &LoadPlan) -> CacheResult<LoadReport> {
    let api = Arc::new(MemoryCounterApi::new().with_category(load_category(plan.counter_type)));
    let config = CacheConfig {
        key_strategy: plan.key_strategy,
        ..CacheConfig::default()
    };
    let facade = CounterFacade::with_config(api, &config);

    facade.cache_counters(LOAD_CATEGORY, None)?;
    let key = facade.get_or_register_key(LOAD_CATEGORY, None, LOAD_COUNTER)?;
    let cached = facade.liaison().cache_category(LOAD_CATEGORY, None)?;
    let advanced_base = cached.bound(LOAD_COUNTER)?.has_base();
    let observed_key = if advanced_base {
        facade.get_or_register_key(LOAD_CATEGORY, None, LOAD_BASE)?
    } else {
        key
    };
    debug!(key, observed_key, advanced_base, "Load counter ready");

    info!(
        threads = plan.threads,
        iterations = plan.iterations,
        counter_type = %plan.counter_type,
        key_strategy = plan.key_strategy.as_str(),
        "Starting load"
    );

    let start = Instant::now();
    let results: Vec<CacheResult<()>> = thread::scope(|scope| {
        let mut workers = Vec::with_capacity(plan.threads);
        for _ in 0..plan.threads {
            workers.push(scope.spawn(|| -> CacheResult<()> {
                for _ in 0..plan.iterations {
                    facade.increment(key)?;
                }
                Ok(())
            }));
        }
        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|_| Err(CacheError::invalid_operation("load worker panicked")))
            })
            .collect()
    });
    let elapsed = start.elapsed();
    results.into_iter().collect::<CacheResult<Vec<()>>>()?;

    let observed = facade.raw_value(observed_key)?;

    Ok(LoadReport {
        elapsed,
        operations: (plan.threads * plan.iterations) as u64,
        observed,
        advanced_base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan(counter_type: CounterType, key_strategy: KeyStrategy) -> LoadPlan {
        LoadPlan {
            threads: 4,
            iterations: 2_500,
            counter_type,
            key_strategy,
        }
    }

    #[test]
    fn test_plain_counter_is_exact() {
        let report = run(&plan(CounterType::NumberOfItems64, KeyStrategy::Hash)).unwrap();
        assert_eq!(report.expected(), 10_000);
        assert_eq!(report.observed, 10_000);
        assert!(!report.advanced_base);
        assert!(report.is_exact());
    }

    #[test]
    fn test_ratio_counter_advances_base() {
        let report = run(&plan(CounterType::AverageTimer32, KeyStrategy::Sequential)).unwrap();
        assert!(report.advanced_base);
        assert!(report.is_exact());
    }

    #[test]
    fn test_load_category_appends_base() {
        let definition = load_category(CounterType::RawFraction);
        assert_eq!(
            definition,
            CategoryDefinition::new(LOAD_CATEGORY)
                .counter(LOAD_COUNTER, CounterType::RawFraction)
                .counter(LOAD_BASE, CounterType::RawBase)
        );
    }
}
