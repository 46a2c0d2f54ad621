use crate::error::{ErrorStatus, ServiceError};
use aliyun_oss_http::ErrorKind as TransportErrorKind;
use std::{fmt::Debug, time::Duration};

/// 重试策略
///
/// `attempted_retries` 从 0 开始计数，表示此前已经重试过的次数
pub trait RetryStrategy: Debug + Send + Sync {
    /// 判断一次失败是否应该重试
    fn should_retry(&self, error: &ServiceError, attempted_retries: usize) -> bool;

    /// 计算下一次重试前的等待时长
    fn delay(&self, error: &ServiceError, attempted_retries: usize) -> Duration;
}

/// 默认重试策略
///
/// 5xx 状态码和可恢复的传输错误会被重试，等待时长按尝试次数指数增长，
/// 不带抖动，上限为 `(1 << max_retries) * scale_factor`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DefaultRetryStrategy {
    max_retries: usize,
    scale_factor: Duration,
}

impl Default for DefaultRetryStrategy {
    #[inline]
    fn default() -> Self {
        Self::new(3, Duration::from_millis(300))
    }
}

impl DefaultRetryStrategy {
    #[inline]
    pub const fn new(max_retries: usize, scale_factor: Duration) -> Self {
        Self {
            max_retries,
            scale_factor,
        }
    }
}

impl RetryStrategy for DefaultRetryStrategy {
    fn should_retry(&self, error: &ServiceError, attempted_retries: usize) -> bool {
        if attempted_retries >= self.max_retries {
            return false;
        }

        match error.status() {
            ErrorStatus::Http(status_code) => (500..599).contains(&status_code.as_u16()),
            ErrorStatus::Transport(kind) => matches!(
                kind,
                TransportErrorKind::ConnectError
                    | TransportErrorKind::PartialFile
                    | TransportErrorKind::WriteError
                    | TransportErrorKind::TimeoutError
                    | TransportErrorKind::GotNothing
                    | TransportErrorKind::SendError
                    | TransportErrorKind::ReceiveError
            ),
            _ => false,
        }
    }

    fn delay(&self, _error: &ServiceError, attempted_retries: usize) -> Duration {
        self.scale_factor * (1u32 << attempted_retries.min(31))
    }
}
