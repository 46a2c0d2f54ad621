use aliyun_oss_http::{
    header::CONTENT_TYPE, HeaderMap, HeaderValue, OnProgressCallback, RequestBody,
};
use std::{
    collections::BTreeMap,
    fmt::Debug,
    io::{Cursor, Read, Result as IoResult, Seek, Write},
    sync::Arc,
};
use thiserror::Error;

/// 请求的子资源参数集合，键名有序以便参与签名
pub type Parameters = BTreeMap<String, String>;

/// 请求行为标志，在请求发出之后不再变化
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestFlags {
    content_md5: bool,
    param_in_path: bool,
    check_crc64: bool,
}

impl RequestFlags {
    #[inline]
    pub const fn new() -> Self {
        Self {
            content_md5: false,
            param_in_path: false,
            check_crc64: false,
        }
    }

    /// 要求自动计算请求体的 Content-MD5
    #[inline]
    pub const fn with_content_md5(mut self) -> Self {
        self.content_md5 = true;
        self
    }

    /// 请求自带完整路径，跳过 URL 组装
    #[inline]
    pub const fn with_param_in_path(mut self) -> Self {
        self.param_in_path = true;
        self
    }

    /// 启用 CRC64 端到端校验
    #[inline]
    pub const fn with_check_crc64(mut self) -> Self {
        self.check_crc64 = true;
        self
    }

    #[inline]
    pub fn content_md5(&self) -> bool {
        self.content_md5
    }

    #[inline]
    pub fn param_in_path(&self) -> bool {
        self.param_in_path
    }

    #[inline]
    pub fn check_crc64(&self) -> bool {
        self.check_crc64
    }
}

/// 请求在本地校验失败的原因
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("The bucket name is invalid")]
    InvalidBucketName,

    #[error("The object key is invalid")]
    InvalidObjectKey,

    #[error("The part list is empty")]
    EmptyPartList,

    #[error("The upload id is empty")]
    EmptyUploadId,

    #[error("The part number is out of range")]
    InvalidPartNumber,
}

/// 校验存储空间名称
///
/// 长度 3 到 63，只允许小写字母、数字和连字符，且不能以连字符开头或结尾
pub fn is_valid_bucket_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// 校验对象名称
///
/// UTF-8 编码长度 1 到 1023 字节，且不能以 `/` 或 `\` 开头
pub fn is_valid_object_key(key: &str) -> bool {
    (1..=1023).contains(&key.len()) && !key.starts_with('/') && !key.starts_with('\\')
}

/// 响应数据的接收目标
///
/// 响应体会被完整写入该目标，随后回卷到起始位置供调用方读取
pub trait ResponseSink: Read + Write + Seek + Debug + Send {}
impl<T: Read + Write + Seek + Debug + Send> ResponseSink for T {}

/// 响应接收目标的工厂函数，每次请求尝试都会重新创建
pub type ResponseSinkFactory = Arc<dyn Fn() -> IoResult<Box<dyn ResponseSink>> + Send + Sync>;

pub(crate) fn default_response_sink() -> IoResult<Box<dyn ResponseSink>> {
    Ok(Box::new(Cursor::new(Vec::new())))
}

/// OSS 请求能力集合
///
/// 每种操作实现该接口，描述自身的桶、对象、标志、请求头、子资源参数与请求体，
/// 请求管线据此完成校验、签名与收发
pub trait ServiceRequest {
    /// 请求的存储空间名称，可能为空
    fn bucket(&self) -> &str {
        ""
    }

    /// 请求的对象名称，可能为空
    fn key(&self) -> &str {
        ""
    }

    fn flags(&self) -> RequestFlags {
        RequestFlags::new()
    }

    /// 本地校验，失败时不会发起网络请求
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn special_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    fn special_parameters(&self) -> Parameters {
        Parameters::new()
    }

    /// 打开请求体数据来源，无请求体时返回 `None`
    fn payload(&self) -> IoResult<Option<RequestBody>> {
        Ok(None)
    }

    /// 跳过 URL 组装时使用的完整路径，配合 [`RequestFlags::with_param_in_path`]
    fn path_override(&self) -> Option<String> {
        None
    }

    /// 完整的预签名 URL，携带该 URL 的请求跳过本地校验与签名
    fn presigned_url(&self) -> Option<&str> {
        None
    }

    fn response_sink_factory(&self) -> Option<ResponseSinkFactory> {
        None
    }

    fn progress_callback(&self) -> Option<OnProgressCallback> {
        None
    }

    /// 请求头集合，未指定 Content-Type 时默认为 application/xml
    fn headers(&self) -> HeaderMap {
        let mut headers = self.special_headers();
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        }
        headers
    }
}
