use std::{error, fmt, result};

/// HTTP 传输错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 非法的请求 / 响应错误
    InvalidRequestResponse,

    /// 非法的 URL
    InvalidUrl,

    /// 非法的 HTTP 头
    InvalidHeader,

    /// 网络连接失败
    ConnectError,

    /// 代理连接失败
    ProxyError,

    /// 域名解析失败
    UnknownHostError,

    /// 发送失败
    SendError,

    /// 接收失败
    ReceiveError,

    /// 响应体不完整
    PartialFile,

    /// 写入失败
    WriteError,

    /// 服务器未返回任何数据
    GotNothing,

    /// 本地 IO 失败
    LocalIoError,

    /// 超时失败
    TimeoutError,

    /// SSL 错误
    SslError,

    /// 重定向次数过多
    TooManyRedirect,

    /// 未知错误
    UnknownError,

    /// 用户取消
    UserCanceled,
}

impl ErrorKind {
    /// 获取错误类型的名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequestResponse => "InvalidRequestResponse",
            Self::InvalidUrl => "InvalidUrl",
            Self::InvalidHeader => "InvalidHeader",
            Self::ConnectError => "ConnectError",
            Self::ProxyError => "ProxyError",
            Self::UnknownHostError => "UnknownHostError",
            Self::SendError => "SendError",
            Self::ReceiveError => "ReceiveError",
            Self::PartialFile => "PartialFile",
            Self::WriteError => "WriteError",
            Self::GotNothing => "GotNothing",
            Self::LocalIoError => "LocalIoError",
            Self::TimeoutError => "TimeoutError",
            Self::SslError => "SslError",
            Self::TooManyRedirect => "TooManyRedirect",
            Self::UnknownError => "UnknownError",
            Self::UserCanceled => "UserCanceled",
        }
    }
}

/// HTTP 传输错误
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: Box<dyn error::Error + Send + Sync>,
}

impl Error {
    /// 创建 HTTP 传输错误
    #[inline]
    pub fn new(kind: ErrorKind, err: impl Into<Box<dyn error::Error + Send + Sync>>) -> Self {
        Error {
            kind,
            error: err.into(),
        }
    }

    /// 获取 HTTP 传输错误类型
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn into_inner(self) -> Box<dyn error::Error + Send + Sync> {
        self.error
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// HTTP 传输结果
pub type Result<T> = result::Result<T, Error>;
