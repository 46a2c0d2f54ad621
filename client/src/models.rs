use crate::{call::ServiceResult, request::ResponseSink};
use aliyun_oss_http::HeaderMap;
use serde::{Deserialize, Serialize};

/// 资源拥有者
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    pub display_name: String,
}

/// 存储空间摘要
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Bucket {
    pub name: String,
    pub location: String,
    pub creation_date: String,
    pub extranet_endpoint: String,
    pub intranet_endpoint: String,
    pub storage_class: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Buckets {
    pub bucket: Vec<Bucket>,
}

/// ListBuckets 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListAllMyBucketsResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub owner: Owner,
    pub buckets: Buckets,
    pub prefix: String,
    pub marker: String,
    pub max_keys: Option<u32>,
    pub is_truncated: Option<bool>,
    pub next_marker: Option<String>,
}

/// 对象摘要
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Contents {
    pub key: String,
    pub last_modified: String,
    #[serde(rename = "ETag")]
    pub e_tag: String,
    #[serde(rename = "Type")]
    pub object_type: String,
    pub size: u64,
    pub storage_class: String,
    pub owner: Option<Owner>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CommonPrefixes {
    pub prefix: String,
}

/// ListObjects 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListBucketResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub name: String,
    pub prefix: String,
    pub marker: String,
    pub max_keys: Option<u32>,
    pub delimiter: String,
    pub is_truncated: Option<bool>,
    pub next_marker: Option<String>,
    pub contents: Vec<Contents>,
    pub common_prefixes: Vec<CommonPrefixes>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AccessControlList {
    pub grant: String,
}

/// GetBucketAcl / GetObjectAcl 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AccessControlPolicy {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub owner: Owner,
    pub access_control_list: AccessControlList,
}

/// GetBucketLocation 的应答，根节点文本即地域
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LocationConstraint {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    #[serde(rename = "$text", default)]
    pub location: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BucketDetail {
    pub name: String,
    pub location: String,
    pub creation_date: String,
    pub extranet_endpoint: String,
    pub intranet_endpoint: String,
    pub storage_class: String,
    pub owner: Owner,
}

/// GetBucketInfo 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BucketInfo {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub bucket: BucketDetail,
}

/// DeleteObjects 应答中的单个结果
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeletedObject {
    pub key: String,
}

/// DeleteObjects 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeleteResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub deleted: Vec<DeletedObject>,
}

/// CopyObject / UploadPartCopy 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CopyObjectResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    #[serde(rename = "ETag")]
    pub e_tag: String,
    pub last_modified: String,
}

/// InitiateMultipartUpload 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InitiateMultipartUploadResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// CompleteMultipartUpload 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CompleteMultipartUploadResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub location: String,
    pub bucket: String,
    pub key: String,
    #[serde(rename = "ETag")]
    pub e_tag: String,
}

/// ListParts 应答中的分片
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Part {
    pub part_number: u32,
    pub last_modified: String,
    #[serde(rename = "ETag")]
    pub e_tag: String,
    pub size: u64,
}

/// ListParts 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListPartsResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub max_parts: Option<u32>,
    pub next_part_number_marker: Option<String>,
    pub is_truncated: Option<bool>,
    pub part: Vec<Part>,
}

/// ListMultipartUploads 应答中的进行中上传
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Upload {
    pub key: String,
    pub upload_id: String,
    pub initiated: String,
}

/// ListMultipartUploads 的应答
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListMultipartUploadsResult {
    /// 服务端分配的请求标识，解析应答后由客户端填入
    #[serde(skip)]
    pub request_id: String,
    pub bucket: String,
    pub key_marker: String,
    pub upload_id_marker: String,
    pub next_key_marker: Option<String>,
    pub next_upload_id_marker: Option<String>,
    pub max_uploads: Option<u32>,
    pub is_truncated: Option<bool>,
    pub upload: Vec<Upload>,
}

/// CompleteMultipartUpload 请求包体中的分片
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletePart {
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub e_tag: String,
}

impl CompletePart {
    #[inline]
    pub fn new(part_number: u32, e_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.into(),
        }
    }
}

/// CompleteMultipartUpload 的请求包体
#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct CompleteMultipartUpload {
    #[serde(rename = "Part")]
    pub(crate) part: Vec<CompletePart>,
}

/// DeleteObjects 的请求包体
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Delete {
    pub(crate) quiet: bool,
    #[serde(rename = "Object")]
    pub(crate) object: Vec<DeleteKey>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeleteKey {
    pub(crate) key: String,
}

/// CreateBucket 的请求包体
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateBucketConfiguration {
    pub(crate) storage_class: String,
}

/// 只携带请求标识的应答
#[derive(Clone, Debug, Default)]
pub struct VoidResult {
    pub request_id: String,
}

impl VoidResult {
    pub(crate) fn from_result(result: &ServiceResult) -> Self {
        Self {
            request_id: result.request_id().to_owned(),
        }
    }
}

/// PutObject / UploadPart 的应答，来自响应头
#[derive(Clone, Debug, Default)]
pub struct PutObjectResult {
    pub request_id: String,
    pub e_tag: String,
    /// 服务端计算的整个对象的 CRC64 值
    pub hash_crc64ecma: Option<u64>,
}

impl PutObjectResult {
    pub(crate) fn from_result(result: &ServiceResult) -> Self {
        Self {
            request_id: result.request_id().to_owned(),
            e_tag: result.header_str("etag").to_owned(),
            hash_crc64ecma: result.header_str("x-oss-hash-crc64ecma").parse().ok(),
        }
    }
}

/// 从响应头得到的对象元数据
#[derive(Debug)]
pub struct ObjectMetadata {
    request_id: String,
    headers: HeaderMap,
}

impl ObjectMetadata {
    pub(crate) fn from_result(result: &ServiceResult) -> Self {
        Self {
            request_id: result.request_id().to_owned(),
            headers: result.headers().clone(),
        }
    }

    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    fn header_str(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header_str("content-length").parse().ok()
    }

    pub fn content_type(&self) -> &str {
        self.header_str("content-type")
    }

    pub fn e_tag(&self) -> &str {
        self.header_str("etag")
    }

    pub fn last_modified(&self) -> &str {
        self.header_str("last-modified")
    }

    pub fn hash_crc64ecma(&self) -> Option<u64> {
        self.header_str("x-oss-hash-crc64ecma").parse().ok()
    }

    /// 用户自定义元数据的值，名称不含 `x-oss-meta-` 前缀
    pub fn user_metadata(&self, name: &str) -> Option<&str> {
        self.headers
            .get(format!("x-oss-meta-{}", name.to_lowercase()))
            .and_then(|value| value.to_str().ok())
    }

    /// 全部响应头
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// GetObject 的应答，元数据加对象数据流
#[derive(Debug)]
pub struct GetObjectResult {
    metadata: ObjectMetadata,
    result: ServiceResult,
}

impl GetObjectResult {
    pub(crate) fn from_result(result: ServiceResult) -> Self {
        Self {
            metadata: ObjectMetadata::from_result(&result),
            result,
        }
    }

    #[inline]
    pub fn request_id(&self) -> &str {
        self.result.request_id()
    }

    #[inline]
    pub fn metadata(&self) -> &ObjectMetadata {
        &self.metadata
    }

    /// 对象数据，已经回卷到起始位置
    #[inline]
    pub fn body_mut(&mut self) -> &mut dyn ResponseSink {
        self.result.body_mut()
    }

    /// 取出对象数据流
    #[inline]
    pub fn into_body(self) -> Box<dyn ResponseSink> {
        self.result.into_body()
    }
}

/// CreateSymlink 的应答
#[derive(Clone, Debug, Default)]
pub struct CreateSymlinkResult {
    pub request_id: String,
    pub e_tag: String,
}

impl CreateSymlinkResult {
    pub(crate) fn from_result(result: &ServiceResult) -> Self {
        Self {
            request_id: result.request_id().to_owned(),
            e_tag: result.header_str("etag").to_owned(),
        }
    }
}

/// GetSymlink 的应答
#[derive(Clone, Debug, Default)]
pub struct GetSymlinkResult {
    pub request_id: String,
    pub target: String,
    pub e_tag: String,
}

impl GetSymlinkResult {
    pub(crate) fn from_result(result: &ServiceResult) -> Self {
        Self {
            request_id: result.request_id().to_owned(),
            target: result.header_str("x-oss-symlink-target").to_owned(),
            e_tag: result.header_str("etag").to_owned(),
        }
    }
}
