use crate::{
    bucket::{serialize_xml, xml_payload},
    endpoint::encode_path,
    models::{Delete, DeleteKey},
    request::{
        is_valid_bucket_name, is_valid_object_key, Parameters, RequestFlags, ResponseSinkFactory,
        ServiceRequest, ValidationError,
    },
};
use aliyun_oss_http::{
    header::{HeaderName, RANGE},
    HeaderMap, HeaderValue, OnProgressCallback, RequestBody,
};
use std::{
    fs::File,
    io::{BufReader, Result as IoResult},
    path::PathBuf,
};

const X_OSS_META_PREFIX: &str = "x-oss-meta-";

/// 请求体数据来源
#[derive(Clone, Debug)]
pub enum ObjectContent {
    /// 内存中的数据
    Bytes(Vec<u8>),
    /// 本地文件，发起请求时打开
    File(PathBuf),
}

impl ObjectContent {
    pub(crate) fn open(&self) -> IoResult<RequestBody> {
        match self {
            Self::Bytes(bytes) => Ok(RequestBody::from_bytes(bytes.clone())),
            Self::File(path) => {
                RequestBody::from_seekable_reader(BufReader::new(File::open(path)?))
            }
        }
    }
}

fn validate_bucket_and_key(bucket: &str, key: &str) -> Result<(), ValidationError> {
    if !is_valid_bucket_name(bucket) {
        return Err(ValidationError::InvalidBucketName);
    }
    if !is_valid_object_key(key) {
        return Err(ValidationError::InvalidObjectKey);
    }
    Ok(())
}

fn insert_meta_header(headers: &mut HeaderMap, name: &str, value: &str) {
    let name = format!("{}{}", X_OSS_META_PREFIX, name.to_lowercase());
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}

/// 上传对象
pub struct PutObjectRequest {
    bucket: String,
    key: String,
    content: ObjectContent,
    headers: HeaderMap,
    progress: Option<OnProgressCallback>,
}

impl PutObjectRequest {
    /// 以内存数据创建上传请求
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            content: ObjectContent::Bytes(content),
            headers: HeaderMap::new(),
            progress: None,
        }
    }

    /// 以本地文件创建上传请求
    pub fn from_file(
        bucket: impl Into<String>,
        key: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            content: ObjectContent::File(path.into()),
            headers: HeaderMap::new(),
            progress: None,
        }
    }

    #[inline]
    pub fn content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert("content-type", value);
        }
        self
    }

    /// 设置用户自定义元数据，名称会自动添加 `x-oss-meta-` 前缀
    #[inline]
    pub fn metadata(mut self, name: &str, value: &str) -> Self {
        insert_meta_header(&mut self.headers, name, value);
        self
    }

    /// 设置任意请求头
    #[inline]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[inline]
    pub fn on_progress(mut self, callback: OnProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}

impl ServiceRequest for PutObjectRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn flags(&self) -> RequestFlags {
        RequestFlags::new().with_check_crc64()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }

    fn special_headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn payload(&self) -> IoResult<Option<RequestBody>> {
        self.content.open().map(Some)
    }

    fn progress_callback(&self) -> Option<OnProgressCallback> {
        self.progress.clone()
    }
}

/// 下载对象
pub struct GetObjectRequest {
    bucket: String,
    key: String,
    range: Option<(u64, Option<u64>)>,
    process: Option<String>,
    headers: HeaderMap,
    sink_factory: Option<ResponseSinkFactory>,
    progress: Option<OnProgressCallback>,
}

impl GetObjectRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            range: None,
            process: None,
            headers: HeaderMap::new(),
            sink_factory: None,
            progress: None,
        }
    }

    /// 下载指定的字节区间，`end` 为 `None` 时直到对象末尾
    #[inline]
    pub fn range(mut self, begin: u64, end: Option<u64>) -> Self {
        self.range = Some((begin, end));
        self
    }

    /// 设置数据处理方式，例如图片缩放
    #[inline]
    pub fn process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }

    #[inline]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// 设置响应数据的接收目标，默认写入内存
    #[inline]
    pub fn response_sink(mut self, factory: ResponseSinkFactory) -> Self {
        self.sink_factory = Some(factory);
        self
    }

    #[inline]
    pub fn on_progress(mut self, callback: OnProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}

impl ServiceRequest for GetObjectRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn flags(&self) -> RequestFlags {
        RequestFlags::new().with_check_crc64()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }

    fn special_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if let Some((begin, end)) = self.range {
            let value = match end {
                Some(end) => format!("bytes={}-{}", begin, end),
                None => format!("bytes={}-", begin),
            };
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(RANGE, value);
            }
        }
        headers
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        if let Some(process) = self.process.as_deref() {
            parameters.insert("x-oss-process".to_owned(), process.to_owned());
        }
        parameters
    }

    fn response_sink_factory(&self) -> Option<ResponseSinkFactory> {
        self.sink_factory.clone()
    }

    fn progress_callback(&self) -> Option<OnProgressCallback> {
        self.progress.clone()
    }
}

/// 删除对象
#[derive(Clone, Debug)]
pub struct DeleteObjectRequest {
    bucket: String,
    key: String,
}

impl DeleteObjectRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl ServiceRequest for DeleteObjectRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }
}

/// 批量删除对象
#[derive(Clone, Debug)]
pub struct DeleteObjectsRequest {
    bucket: String,
    keys: Vec<String>,
    quiet: bool,
}

impl DeleteObjectsRequest {
    pub fn new(bucket: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            bucket: bucket.into(),
            keys,
            quiet: false,
        }
    }

    /// 安静模式下应答只包含删除失败的对象
    #[inline]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

impl ServiceRequest for DeleteObjectsRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn flags(&self) -> RequestFlags {
        RequestFlags::new().with_content_md5()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_bucket_name(&self.bucket) {
            return Err(ValidationError::InvalidBucketName);
        }
        if self.keys.iter().any(|key| !is_valid_object_key(key)) {
            return Err(ValidationError::InvalidObjectKey);
        }
        Ok(())
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("delete".to_owned(), String::new());
        parameters
    }

    fn payload(&self) -> IoResult<Option<RequestBody>> {
        let payload = Delete {
            quiet: self.quiet,
            object: self
                .keys
                .iter()
                .map(|key| DeleteKey { key: key.clone() })
                .collect(),
        };
        xml_payload(serialize_xml("Delete", &payload)?)
    }
}

/// 查询对象的全部元数据
#[derive(Clone, Debug)]
pub struct HeadObjectRequest {
    bucket: String,
    key: String,
    headers: HeaderMap,
}

impl HeadObjectRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            headers: HeaderMap::new(),
        }
    }

    #[inline]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl ServiceRequest for HeadObjectRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }

    fn special_headers(&self) -> HeaderMap {
        self.headers.clone()
    }
}

/// 查询对象的基础元数据
#[derive(Clone, Debug)]
pub struct GetObjectMetaRequest {
    bucket: String,
    key: String,
}

impl GetObjectMetaRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl ServiceRequest for GetObjectMetaRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("objectMeta".to_owned(), String::new());
        parameters
    }
}

/// 复制对象
#[derive(Clone, Debug)]
pub struct CopyObjectRequest {
    bucket: String,
    key: String,
    source_bucket: String,
    source_key: String,
    headers: HeaderMap,
}

impl CopyObjectRequest {
    pub fn new(
        source_bucket: impl Into<String>,
        source_key: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            source_bucket: source_bucket.into(),
            source_key: source_key.into(),
            headers: HeaderMap::new(),
        }
    }

    #[inline]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl ServiceRequest for CopyObjectRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)?;
        validate_bucket_and_key(&self.source_bucket, &self.source_key)
    }

    fn special_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        let source = format!(
            "/{}/{}",
            self.source_bucket,
            encode_path(&self.source_key)
        );
        if let Ok(value) = HeaderValue::from_str(&source) {
            headers.insert("x-oss-copy-source", value);
        }
        headers
    }
}

/// 创建软链接
#[derive(Clone, Debug)]
pub struct CreateSymlinkRequest {
    bucket: String,
    key: String,
    target: String,
}

impl CreateSymlinkRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            target: target.into(),
        }
    }
}

impl ServiceRequest for CreateSymlinkRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)?;
        if is_valid_object_key(&self.target) {
            Ok(())
        } else {
            Err(ValidationError::InvalidObjectKey)
        }
    }

    fn special_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&encode_path(&self.target)) {
            headers.insert("x-oss-symlink-target", value);
        }
        headers
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("symlink".to_owned(), String::new());
        parameters
    }
}

/// 查询软链接指向的对象
#[derive(Clone, Debug)]
pub struct GetSymlinkRequest {
    bucket: String,
    key: String,
}

impl GetSymlinkRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl ServiceRequest for GetSymlinkRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("symlink".to_owned(), String::new());
        parameters
    }
}

/// 解冻归档对象
#[derive(Clone, Debug)]
pub struct RestoreObjectRequest {
    bucket: String,
    key: String,
}

impl RestoreObjectRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl ServiceRequest for RestoreObjectRequest {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_and_key(&self.bucket, &self.key)
    }

    fn special_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("restore".to_owned(), String::new());
        parameters
    }
}

/// 通过预签名 URL 下载对象
pub struct GetObjectByUrlRequest {
    url: String,
    sink_factory: Option<ResponseSinkFactory>,
    progress: Option<OnProgressCallback>,
}

impl GetObjectByUrlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sink_factory: None,
            progress: None,
        }
    }

    #[inline]
    pub fn response_sink(mut self, factory: ResponseSinkFactory) -> Self {
        self.sink_factory = Some(factory);
        self
    }

    #[inline]
    pub fn on_progress(mut self, callback: OnProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}

impl ServiceRequest for GetObjectByUrlRequest {
    fn presigned_url(&self) -> Option<&str> {
        Some(&self.url)
    }

    // 预签名 URL 的签名覆盖 Content-Type,不追加默认值
    fn headers(&self) -> HeaderMap {
        self.special_headers()
    }

    fn response_sink_factory(&self) -> Option<ResponseSinkFactory> {
        self.sink_factory.clone()
    }

    fn progress_callback(&self) -> Option<OnProgressCallback> {
        self.progress.clone()
    }
}

/// 通过预签名 URL 上传对象
pub struct PutObjectByUrlRequest {
    url: String,
    content: ObjectContent,
    headers: HeaderMap,
    progress: Option<OnProgressCallback>,
}

impl PutObjectByUrlRequest {
    pub fn new(url: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            content: ObjectContent::Bytes(content),
            headers: HeaderMap::new(),
            progress: None,
        }
    }

    #[inline]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[inline]
    pub fn on_progress(mut self, callback: OnProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}

impl ServiceRequest for PutObjectByUrlRequest {
    fn flags(&self) -> RequestFlags {
        RequestFlags::new().with_check_crc64()
    }

    fn special_headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn payload(&self) -> IoResult<Option<RequestBody>> {
        self.content.open().map(Some)
    }

    fn presigned_url(&self) -> Option<&str> {
        Some(&self.url)
    }

    // 预签名 URL 的签名覆盖 Content-Type,不追加默认值
    fn headers(&self) -> HeaderMap {
        self.special_headers()
    }

    fn progress_callback(&self) -> Option<OnProgressCallback> {
        self.progress.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_object_range_header() {
        let request = GetObjectRequest::new("examplebucket", "nelson").range(0, Some(99));
        assert_eq!(
            request
                .special_headers()
                .get(RANGE)
                .and_then(|v| v.to_str().ok()),
            Some("bytes=0-99"),
        );

        let request = GetObjectRequest::new("examplebucket", "nelson").range(128, None);
        assert_eq!(
            request
                .special_headers()
                .get(RANGE)
                .and_then(|v| v.to_str().ok()),
            Some("bytes=128-"),
        );
    }

    #[test]
    fn test_copy_object_source_header() {
        let request =
            CopyObjectRequest::new("src-bucket", "dir/src key", "dst-bucket", "dst-key");
        assert_eq!(
            request
                .special_headers()
                .get("x-oss-copy-source")
                .and_then(|v| v.to_str().ok()),
            Some("/src-bucket/dir/src%20key"),
        );
    }

    #[test]
    fn test_put_object_metadata_header() {
        let request =
            PutObjectRequest::new("examplebucket", "nelson", b"data".to_vec()).metadata("Author", "foo@bar.com");
        assert_eq!(
            request
                .special_headers()
                .get("x-oss-meta-author")
                .and_then(|v| v.to_str().ok()),
            Some("foo@bar.com"),
        );
    }

    #[test]
    fn test_delete_objects_payload_and_flags() {
        let request = DeleteObjectsRequest::new(
            "examplebucket",
            vec!["a.txt".to_owned(), "b.txt".to_owned()],
        )
        .quiet(true);
        assert!(request.flags().content_md5());
        let mut body = request.payload().unwrap().unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut body, &mut xml).unwrap();
        assert_eq!(
            xml,
            "<Delete><Quiet>true</Quiet><Object><Key>a.txt</Key></Object><Object><Key>b.txt</Key></Object></Delete>"
        );
    }

    #[test]
    fn test_by_url_request_skips_signing() {
        let request = GetObjectByUrlRequest::new("http://bucket.endpoint/key?Signature=abc");
        assert!(request.presigned_url().is_some());
        assert!(request.validate().is_ok());
        assert_eq!(request.bucket(), "");
    }
}
