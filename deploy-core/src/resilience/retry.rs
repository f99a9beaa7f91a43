use crate::executor::capability::CapabilityError;
use async_trait::async_trait;
use rand::Rng;
use std::fmt::Debug;
use std::time::Duration;

#[async_trait]
pub trait RetryPolicy: Send + Sync + Debug {
    async fn should_retry(&self, attempt: u32, error: &CapabilityError) -> bool;
    fn delay(&self, attempt: u32) -> Duration;
    fn max_attempts(&self) -> u32;
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl ExponentialBackoffRetry {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            jitter: true,
        }
    }

    /// A single attempt: failures surface immediately.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

impl Default for ExponentialBackoffRetry {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(10))
    }
}

#[async_trait]
impl RetryPolicy for ExponentialBackoffRetry {
    async fn should_retry(&self, attempt: u32, error: &CapabilityError) -> bool {
        attempt < self.max_attempts && error.is_transient()
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_secs_f64() * 2_f64.powi(attempt as i32 - 1);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.75..=1.0); // 0.75 to 1.0
            Duration::from_secs_f64(delay_secs * jitter_factor)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

pub async fn retry_with_policy<F, Fut, T>(
    policy: &dyn RetryPolicy,
    mut f: F,
) -> Result<T, CapabilityError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, CapabilityError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if !policy.should_retry(attempt, &e).await {
                    return Err(e);
                }
                let delay = policy.delay(attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying deployment call");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
