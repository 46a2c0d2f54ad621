use crate::request::Parameters;
use aliyun_oss_http::Method;
use std::collections::BTreeMap;

/// 生成预签名 URL 的请求
///
/// 过期时间为绝对的 Unix 时间戳，参与签名的请求头与实际访问时必须一致
#[derive(Clone, Debug)]
pub struct GeneratePresignedUrlRequest {
    bucket: String,
    key: String,
    method: Method,
    expires: u64,
    content_type: Option<String>,
    content_md5: Option<String>,
    user_metadata: BTreeMap<String, String>,
    parameters: Parameters,
}

impl GeneratePresignedUrlRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, expires: u64) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            method: Method::GET,
            expires,
            content_type: None,
            content_md5: None,
            user_metadata: BTreeMap::new(),
            parameters: Parameters::new(),
        }
    }

    #[inline]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[inline]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[inline]
    pub fn content_md5(mut self, content_md5: impl Into<String>) -> Self {
        self.content_md5 = Some(content_md5.into());
        self
    }

    /// 添加用户自定义元数据，名称会自动添加 `x-oss-meta-` 前缀
    #[inline]
    pub fn metadata(mut self, name: &str, value: impl Into<String>) -> Self {
        self.user_metadata
            .insert(name.to_lowercase(), value.into());
        self
    }

    /// 添加查询参数，白名单内的参数会参与签名
    #[inline]
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub(crate) fn bucket_name(&self) -> &str {
        &self.bucket
    }

    #[inline]
    pub(crate) fn object_key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub(crate) fn http_method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub(crate) fn expiration(&self) -> u64 {
        self.expires
    }

    #[inline]
    pub(crate) fn content_type_value(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[inline]
    pub(crate) fn content_md5_value(&self) -> Option<&str> {
        self.content_md5.as_deref()
    }

    #[inline]
    pub(crate) fn user_metadata_entries(&self) -> &BTreeMap<String, String> {
        &self.user_metadata
    }

    #[inline]
    pub(crate) fn query_parameters(&self) -> &Parameters {
        &self.parameters
    }
}
