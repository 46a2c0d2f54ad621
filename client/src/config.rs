use crate::{
    rate_limit::RateLimiter,
    retry::{DefaultRetryStrategy, RetryStrategy},
};
use aliyun_oss_http::Proxy;
use std::{fmt, sync::Arc, time::Duration};

/// 访问协议
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl Default for Scheme {
    #[inline]
    fn default() -> Self {
        Self::Http
    }
}

impl fmt::Display for Scheme {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 客户端配置
///
/// 客户端构建完成后配置只读，调整配置需要构建新的客户端
#[derive(Debug)]
pub struct ClientConfiguration {
    user_agent: Box<str>,
    scheme: Scheme,
    max_connections: usize,
    request_timeout: Duration,
    connect_timeout: Duration,
    retry_strategy: Box<dyn RetryStrategy>,
    proxy: Option<Proxy>,
    verify_ssl: bool,
    is_cname: bool,
    enable_crc64: bool,
    send_rate_limiter: Option<Arc<dyn RateLimiter>>,
    recv_rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl Default for ClientConfiguration {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfiguration {
    /// 返回客户端配置构建器
    #[inline]
    pub fn builder() -> ClientConfigurationBuilder {
        ClientConfigurationBuilder::default()
    }

    #[inline]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// 异步执行器的工作线程数量上限
    #[inline]
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    #[inline]
    pub fn retry_strategy(&self) -> &dyn RetryStrategy {
        self.retry_strategy.as_ref()
    }

    #[inline]
    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    #[inline]
    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    /// 接入点是否为绑定的自定义域名
    #[inline]
    pub fn is_cname(&self) -> bool {
        self.is_cname
    }

    /// 是否启用 CRC64 端到端校验
    #[inline]
    pub fn enable_crc64(&self) -> bool {
        self.enable_crc64
    }

    #[inline]
    pub fn send_rate_limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.send_rate_limiter.as_ref()
    }

    #[inline]
    pub fn recv_rate_limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.recv_rate_limiter.as_ref()
    }
}

/// 客户端配置构建器
#[derive(Debug)]
pub struct ClientConfigurationBuilder {
    inner: ClientConfiguration,
}

impl Default for ClientConfigurationBuilder {
    fn default() -> Self {
        Self {
            inner: ClientConfiguration {
                user_agent: format!("aliyun-sdk-rust/{}", env!("CARGO_PKG_VERSION")).into(),
                scheme: Scheme::default(),
                max_connections: 16,
                request_timeout: Duration::from_millis(10000),
                connect_timeout: Duration::from_millis(5000),
                retry_strategy: Box::new(DefaultRetryStrategy::default()),
                proxy: None,
                verify_ssl: false,
                is_cname: false,
                enable_crc64: true,
                send_rate_limiter: None,
                recv_rate_limiter: None,
            },
        }
    }
}

impl ClientConfigurationBuilder {
    #[inline]
    pub fn user_agent(mut self, user_agent: impl Into<Box<str>>) -> Self {
        self.inner.user_agent = user_agent.into();
        self
    }

    #[inline]
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.inner.scheme = scheme;
        self
    }

    #[inline]
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.inner.max_connections = max_connections;
        self
    }

    #[inline]
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.inner.request_timeout = request_timeout;
        self
    }

    #[inline]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.inner.connect_timeout = connect_timeout;
        self
    }

    #[inline]
    pub fn retry_strategy(mut self, retry_strategy: Box<dyn RetryStrategy>) -> Self {
        self.inner.retry_strategy = retry_strategy;
        self
    }

    #[inline]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.inner.proxy = Some(proxy);
        self
    }

    #[inline]
    pub fn verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.inner.verify_ssl = verify_ssl;
        self
    }

    #[inline]
    pub fn is_cname(mut self, is_cname: bool) -> Self {
        self.inner.is_cname = is_cname;
        self
    }

    #[inline]
    pub fn enable_crc64(mut self, enable_crc64: bool) -> Self {
        self.inner.enable_crc64 = enable_crc64;
        self
    }

    #[inline]
    pub fn send_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.inner.send_rate_limiter = Some(limiter);
        self
    }

    #[inline]
    pub fn recv_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.inner.recv_rate_limiter = Some(limiter);
        self
    }

    /// 构建客户端配置
    #[inline]
    pub fn build(self) -> ClientConfiguration {
        self.inner
    }
}
