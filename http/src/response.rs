use http::{
    header::{AsHeaderName, HeaderMap, IntoHeaderName},
    status::StatusCode,
    HeaderValue,
};
use std::{
    default::Default,
    fmt::Debug,
    io::{Cursor, Read, Result as IoResult},
};

trait ReadDebug: Read + Debug + Send {}
impl<T: Read + Debug + Send> ReadDebug for T {}

/// HTTP 响应体
#[derive(Debug)]
pub struct ResponseBody(ResponseBodyInner);

#[derive(Debug)]
enum ResponseBodyInner {
    Reader(Box<dyn ReadDebug>),
    Bytes(Cursor<Vec<u8>>),
}

impl ResponseBody {
    /// 以输入流为响应体
    #[inline]
    pub fn from_reader(reader: impl Read + Debug + Send + 'static) -> Self {
        Self(ResponseBodyInner::Reader(Box::new(reader)))
    }

    /// 以一段内存数据为响应体
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(ResponseBodyInner::Bytes(Cursor::new(bytes)))
    }
}

impl Default for ResponseBody {
    #[inline]
    fn default() -> Self {
        Self::from_bytes(Default::default())
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            ResponseBodyInner::Reader(reader) => reader.read(buf),
            ResponseBodyInner::Bytes(bytes) => bytes.read(buf),
        }
    }
}

/// HTTP 响应信息
///
/// 不包含响应体
#[derive(Debug, Default)]
pub struct ResponseParts {
    status_code: StatusCode,
    headers: HeaderMap,
}

impl ResponseParts {
    /// HTTP 状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取指定的 HTTP 响应头
    #[inline]
    pub fn header(&self, name: impl AsHeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }
}

/// HTTP 响应
///
/// 封装 HTTP 响应相关字段
#[derive(Debug, Default)]
pub struct Response {
    parts: ResponseParts,
    body: ResponseBody,
}

impl Response {
    /// 返回 HTTP 响应构建器
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// 获取响应体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    /// 拆出 HTTP 响应信息和响应体
    #[inline]
    pub fn into_parts_and_body(self) -> (ResponseParts, ResponseBody) {
        (self.parts, self.body)
    }
}

impl std::ops::Deref for Response {
    type Target = ResponseParts;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

/// HTTP 响应构建器
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    /// 设置 HTTP 状态码
    #[inline]
    pub fn status_code(mut self, status_code: StatusCode) -> Self {
        self.inner.parts.status_code = status_code;
        self
    }

    /// 添加 HTTP 响应头
    #[inline]
    pub fn header(mut self, name: impl IntoHeaderName, value: HeaderValue) -> Self {
        self.inner.parts.headers.insert(name, value);
        self
    }

    /// 设置全部 HTTP 响应头
    #[inline]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner.parts.headers = headers;
        self
    }

    /// 设置响应体
    #[inline]
    pub fn body(mut self, body: ResponseBody) -> Self {
        self.inner.body = body;
        self
    }

    /// 构建 HTTP 响应
    #[inline]
    pub fn build(self) -> Response {
        self.inner
    }
}
