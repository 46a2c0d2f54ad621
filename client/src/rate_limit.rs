use std::{
    fmt::Debug,
    sync::Mutex,
    thread,
    time::{Duration, Instant},
};

/// 传输速率限制器
///
/// 请求体和响应体的每个数据块在放行前都会先申请许可
pub trait RateLimiter: Debug + Send + Sync {
    /// 申请传输 `bytes` 字节的许可，许可不足时阻塞等待
    fn acquire(&self, bytes: usize);
}

/// 令牌桶限速器
#[derive(Debug)]
pub struct TokenBucketLimiter {
    bytes_per_second: u64,
    burst_size: u64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucketLimiter {
    /// 创建限速器，突发容量默认为一秒的传输量
    pub fn new(bytes_per_second: u64) -> Self {
        Self::with_burst_size(bytes_per_second, bytes_per_second)
    }

    /// 创建限速器并指定突发容量
    pub fn with_burst_size(bytes_per_second: u64, burst_size: u64) -> Self {
        Self {
            bytes_per_second,
            burst_size: burst_size.max(1),
            state: Mutex::new(BucketState {
                tokens: burst_size.max(1) as f64,
                last_update: Instant::now(),
            }),
        }
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn acquire(&self, bytes: usize) {
        if self.bytes_per_second == 0 {
            return;
        }
        // 单块数据可能超过桶容量,按容量封顶以保证能够取得许可
        let need = (bytes as f64).min(self.burst_size as f64);
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap();
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_update).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.bytes_per_second as f64)
                    .min(self.burst_size as f64);
                state.last_update = now;
                if state.tokens >= need {
                    state.tokens -= need;
                    return;
                }
                Duration::from_secs_f64((need - state.tokens) / self.bytes_per_second as f64)
            };
            thread::sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_not_throttled() {
        let limiter = TokenBucketLimiter::new(1024);
        let begin = Instant::now();
        limiter.acquire(1024);
        assert!(begin.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_acquire_blocks_after_burst() {
        let limiter = TokenBucketLimiter::with_burst_size(100_000, 1000);
        limiter.acquire(1000);
        let begin = Instant::now();
        limiter.acquire(1000);
        assert!(begin.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_oversized_chunk_is_capped() {
        let limiter = TokenBucketLimiter::with_burst_size(1_000_000, 100);
        let begin = Instant::now();
        limiter.acquire(10_000);
        assert!(begin.elapsed() < Duration::from_secs(1));
    }
}
