//! A system clock that workers may use to enqueue periodic jobs
//!
//! The underlying scheduler does not support sub-second precision, so timer
//! periods are restricted to whole seconds

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::needless_pass_by_ref_mut)]

use std::{future::Future, time::Duration};

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::error;
use util::err_str;

/// The error type returned by the clock
#[derive(Debug, Clone)]
pub struct SystemClockError(pub String);

/// The system clock allows workers to schedule periodic notifications
/// delivered to a callback of choice
#[derive(Clone)]
pub struct SystemClock {
    /// The underlying timer
    scheduler: JobScheduler,
}

impl SystemClock {
    /// Create a new system clock
    pub async fn new() -> Self {
        let scheduler = JobScheduler::new().await.expect("could not build system clock");
        scheduler.start().await.expect("could not start system clock");
        Self { scheduler }
    }

    /// Add a job to the clock
    pub async fn add_timer<F>(
        &self,
        name: String,
        run_every: Duration,
        mut callback: F,
    ) -> Result<(), SystemClockError>
    where
        F: 'static,
        F: FnMut() -> Result<(), String> + Send + Sync,
    {
        assert!(
            Self::check_duration_precision(run_every),
            "`run_every` must not specify a sub-second precision"
        );

        let job = Job::new_repeated(run_every, move |_, _| {
            if let Err(e) = callback() {
                error!("error in clock callback {name}: {e}")
            }
        })
        .map_err(err_str!(SystemClockError))?;
        self.scheduler.add(job).await.map_err(err_str!(SystemClockError)).map(|_| ())
    }

    /// Add an asynchronous job to the clock
    pub async fn add_async_timer<F, R>(
        &self,
        name: String,
        run_every: Duration,
        mut callback: F,
    ) -> Result<(), SystemClockError>
    where
        F: 'static,
        F: FnMut() -> R + Send + Sync,
        R: Future<Output = Result<(), String>> + Send + 'static,
    {
        assert!(
            Self::check_duration_precision(run_every),
            "`run_every` must not specify a sub-second precision"
        );

        let job = Job::new_repeated_async(run_every, move |_, _| {
            let fut = callback();
            let name = name.clone();
            Box::pin(async move {
                if let Err(e) = fut.await {
                    error!("error in clock callback {name}: {e}")
                }
            })
        })
        .map_err(err_str!(SystemClockError))?;
        self.scheduler.add(job).await.map_err(err_str!(SystemClockError)).map(|_| ())
    }

    /// Check if the duration does not specify a sub-second precision
    fn check_duration_precision(duration: Duration) -> bool {
        duration.subsec_nanos() == 0
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use crate::SystemClock;

    /// Tests that a periodic timer fires repeatedly at the whole-second period
    #[cfg_attr(feature = "ci", ignore)]
    #[tokio::test]
    async fn test_timer_fires_periodically() {
        let clock = SystemClock::new().await;
        let fires = Arc::new(AtomicU64::new(0));

        let fires_clone = fires.clone();
        clock
            .add_timer("test-timer".to_string(), Duration::from_secs(1), move || {
                fires_clone.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .await
            .expect("could not add timer");

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let count = fires.load(Ordering::Relaxed);
        assert!((2..=4).contains(&count), "timer fired {count} times");
    }

    /// Tests that an async timer runs its future each period
    #[cfg_attr(feature = "ci", ignore)]
    #[tokio::test]
    async fn test_async_timer_fires() {
        let clock = SystemClock::new().await;
        let fires = Arc::new(AtomicU64::new(0));

        let fires_clone = fires.clone();
        clock
            .add_async_timer("async-test-timer".to_string(), Duration::from_secs(1), move || {
                let fires = fires_clone.clone();
                async move {
                    fires.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            })
            .await
            .expect("could not add async timer");

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(fires.load(Ordering::Relaxed) >= 1);
    }

    /// Tests that sub-second periods are refused
    #[cfg_attr(feature = "ci", ignore)]
    #[tokio::test]
    #[should_panic(expected = "sub-second")]
    async fn test_subsecond_period_panics() {
        let clock = SystemClock::new().await;
        let _ = clock
            .add_timer("bad-timer".to_string(), Duration::from_millis(1500), move || Ok(()))
            .await;
    }
}
