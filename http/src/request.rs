use http::{
    header::{HeaderMap, IntoHeaderName},
    method::Method,
    uri::Uri,
    HeaderValue,
};
use std::{
    default::Default,
    fmt::Debug,
    io::{Cursor, Read, Result as IoResult, Seek, SeekFrom},
    time::Duration,
};

trait ReadDebug: Read + Debug + Send {}
impl<T: Read + Debug + Send> ReadDebug for T {}

trait ReadSeekDebug: Read + Seek + Debug + Send {}
impl<T: Read + Seek + Debug + Send> ReadSeekDebug for T {}

/// 代理服务器配置
#[derive(Clone, Debug)]
pub struct Proxy {
    scheme: String,
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl Proxy {
    /// 创建代理服务器配置，协议默认为 http
    #[inline]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: "http".to_owned(),
            host: host.into(),
            port,
            username: Default::default(),
            password: Default::default(),
        }
    }

    /// 设置代理服务器协议
    #[inline]
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// 设置代理服务器的用户名和密码
    #[inline]
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    #[inline]
    pub fn scheme_str(&self) -> &str {
        &self.scheme
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }
}

/// HTTP 请求信息
///
/// 不包含请求体
#[derive(Debug, Default)]
pub struct RequestParts {
    method: Method,
    url: Uri,
    headers: HeaderMap,
    connect_timeout: Duration,
    request_timeout: Duration,
    proxy: Option<Proxy>,
    verify_ssl: bool,
}

impl RequestParts {
    /// 获取请求 HTTP 方法
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 获取 HTTP 请求 URL
    #[inline]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// 获取请求 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取请求 HTTP Headers 的可变引用
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// 获取连接超时时长，零表示使用传输层默认值
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// 获取请求超时时长，零表示使用传输层默认值
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// 获取代理服务器配置
    #[inline]
    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    /// 是否校验服务端证书
    #[inline]
    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }
}

/// HTTP 请求
///
/// 封装 HTTP 请求相关字段
#[derive(Debug, Default)]
pub struct Request<'r> {
    parts: RequestParts,
    body: MaybeOwnedBody<'r>,
}

impl<'r> Request<'r> {
    /// 返回 HTTP 请求构建器
    #[inline]
    pub fn builder() -> RequestBuilder<'r> {
        RequestBuilder::default()
    }

    /// 获取请求体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut MaybeOwnedBody<'r> {
        &mut self.body
    }

    /// 拆出 HTTP 请求信息和请求体
    #[inline]
    pub fn into_parts_and_body(self) -> (RequestParts, MaybeOwnedBody<'r>) {
        (self.parts, self.body)
    }
}

impl std::ops::Deref for Request<'_> {
    type Target = RequestParts;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl std::ops::DerefMut for Request<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parts
    }
}

/// HTTP 请求构建器
#[derive(Debug, Default)]
pub struct RequestBuilder<'r> {
    inner: Request<'r>,
}

impl<'r> RequestBuilder<'r> {
    /// 设置请求 HTTP 方法
    #[inline]
    pub fn method(mut self, method: Method) -> Self {
        self.inner.parts.method = method;
        self
    }

    /// 设置 HTTP 请求 URL
    #[inline]
    pub fn url(mut self, url: Uri) -> Self {
        self.inner.parts.url = url;
        self
    }

    /// 添加 HTTP 请求头
    #[inline]
    pub fn header(mut self, name: impl IntoHeaderName, value: HeaderValue) -> Self {
        self.inner.parts.headers.insert(name, value);
        self
    }

    /// 设置全部 HTTP 请求头
    #[inline]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner.parts.headers = headers;
        self
    }

    /// 设置请求体
    #[inline]
    pub fn body(mut self, body: MaybeOwnedBody<'r>) -> Self {
        self.inner.body = body;
        self
    }

    /// 设置连接超时时长
    #[inline]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.inner.parts.connect_timeout = timeout;
        self
    }

    /// 设置请求超时时长
    #[inline]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.inner.parts.request_timeout = timeout;
        self
    }

    /// 设置代理服务器
    #[inline]
    pub fn proxy(mut self, proxy: Option<Proxy>) -> Self {
        self.inner.parts.proxy = proxy;
        self
    }

    /// 设置是否校验服务端证书
    #[inline]
    pub fn verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.inner.parts.verify_ssl = verify_ssl;
        self
    }

    /// 构建 HTTP 请求
    #[inline]
    pub fn build(self) -> Request<'r> {
        self.inner
    }
}

/// HTTP 请求体
///
/// 持有请求体数据来源，并记录起始位置以支持重试时回卷
#[derive(Debug)]
pub struct RequestBody(BodyInner);

#[derive(Debug)]
enum BodyInner {
    Reader(Box<dyn ReadDebug>),
    Seekable {
        reader: Box<dyn ReadSeekDebug>,
        size: u64,
        start: u64,
    },
    Bytes(Cursor<Vec<u8>>),
}

impl RequestBody {
    /// 以一段内存数据为请求体
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(BodyInner::Bytes(Cursor::new(bytes)))
    }

    /// 以不可定位的输入流为请求体，无法获知长度，也无法回卷重试
    #[inline]
    pub fn from_reader(reader: impl Read + Debug + Send + 'static) -> Self {
        Self(BodyInner::Reader(Box::new(reader)))
    }

    /// 以可定位的输入流为请求体
    ///
    /// 通过定位到流末尾获取数据长度，读取从流的当前位置开始
    pub fn from_seekable_reader(
        mut reader: impl Read + Seek + Debug + Send + 'static,
    ) -> IoResult<Self> {
        let start = reader.seek(SeekFrom::Current(0))?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;
        Ok(Self(BodyInner::Seekable {
            reader: Box::new(reader),
            size: end - start,
            start,
        }))
    }

    /// 获取请求体长度，不可定位的输入流返回 `None`
    #[inline]
    pub fn size_hint(&self) -> Option<u64> {
        match &self.0 {
            BodyInner::Reader(_) => None,
            BodyInner::Seekable { size, .. } => Some(*size),
            BodyInner::Bytes(bytes) => Some(bytes.get_ref().len() as u64),
        }
    }

    /// 请求体是否可以回卷后重新读取
    #[inline]
    pub fn is_rewindable(&self) -> bool {
        !matches!(&self.0, BodyInner::Reader(_))
    }

    /// 将请求体回卷到起始位置
    pub fn reset(&mut self) -> IoResult<()> {
        match &mut self.0 {
            BodyInner::Reader(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "request body is not rewindable",
            )),
            BodyInner::Seekable { reader, start, .. } => {
                reader.seek(SeekFrom::Start(*start))?;
                Ok(())
            }
            BodyInner::Bytes(bytes) => {
                bytes.set_position(0);
                Ok(())
            }
        }
    }
}

impl Default for RequestBody {
    #[inline]
    fn default() -> Self {
        Self::from_bytes(Default::default())
    }
}

impl Read for RequestBody {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            BodyInner::Reader(reader) => reader.read(buf),
            BodyInner::Seekable { reader, .. } => reader.read(buf),
            BodyInner::Bytes(bytes) => bytes.read(buf),
        }
    }
}

/// HTTP 请求体引用
///
/// 请求体可能持有引用，以便调用方在传输结束后继续使用原始数据来源
#[derive(Debug)]
pub struct MaybeOwnedBody<'a>(MaybeOwnedBodyInner<'a>);

#[derive(Debug)]
enum MaybeOwnedBodyInner<'a> {
    ReaderRef(&'a mut dyn ReadDebug),
    BytesRef(Cursor<&'a [u8]>),
    Owned(RequestBody),
}

impl<'a> MaybeOwnedBody<'a> {
    #[inline]
    pub fn from_referenced_reader<T: Read + Debug + Send>(reader: &'a mut T) -> Self {
        Self(MaybeOwnedBodyInner::ReaderRef(reader))
    }

    #[inline]
    pub fn from_referenced_bytes(bytes: &'a [u8]) -> Self {
        Self(MaybeOwnedBodyInner::BytesRef(Cursor::new(bytes)))
    }

    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(MaybeOwnedBodyInner::Owned(RequestBody::from_bytes(bytes)))
    }

    #[inline]
    pub fn from_body(body: RequestBody) -> Self {
        Self(MaybeOwnedBodyInner::Owned(body))
    }
}

impl Default for MaybeOwnedBody<'_> {
    #[inline]
    fn default() -> Self {
        Self::from_bytes(Default::default())
    }
}

impl Read for MaybeOwnedBody<'_> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            MaybeOwnedBodyInner::ReaderRef(reader) => reader.read(buf),
            MaybeOwnedBodyInner::BytesRef(bytes) => bytes.read(buf),
            MaybeOwnedBodyInner::Owned(owned) => owned.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_body_size_hint() -> IoResult<()> {
        let body = RequestBody::from_bytes(b"hello".to_vec());
        assert_eq!(body.size_hint(), Some(5));
        assert!(body.is_rewindable());

        let body = RequestBody::from_seekable_reader(Cursor::new(b"hello world".to_vec()))?;
        assert_eq!(body.size_hint(), Some(11));
        assert!(body.is_rewindable());

        let body = RequestBody::from_reader(Cursor::new(b"opaque".to_vec()));
        assert_eq!(body.size_hint(), None);
        assert!(!body.is_rewindable());
        Ok(())
    }

    #[test]
    fn test_request_body_reset_to_start_position() -> IoResult<()> {
        let mut cursor = Cursor::new(b"skip-me:payload".to_vec());
        cursor.set_position(8);
        let mut body = RequestBody::from_seekable_reader(cursor)?;
        assert_eq!(body.size_hint(), Some(7));

        let mut first = String::new();
        body.read_to_string(&mut first)?;
        assert_eq!(first, "payload");

        body.reset()?;
        let mut second = String::new();
        body.read_to_string(&mut second)?;
        assert_eq!(second, "payload");
        Ok(())
    }

    #[test]
    fn test_unseekable_body_refuses_reset() {
        let mut body = RequestBody::from_reader(Cursor::new(b"data".to_vec()));
        assert!(body.reset().is_err());
    }
}
