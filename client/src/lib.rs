#![deny(
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    keyword_idents,
    macro_use_extern_crate,
    non_ascii_idents,
    unsafe_code,
    unused_extern_crates,
    unused_lifetimes
)]

//! 阿里云 OSS 客户端
//!
//! 将带类型的请求经由校验、签名、发送、重试、CRC64 端到端校验与应答归类
//! 的完整管线转换为带类型的结果或错误。HTTP 传输通过
//! [`HttpCaller`](aliyun_oss_http::HttpCaller) 接口注入。

pub extern crate aliyun_oss_crc64 as crc64;
pub extern crate aliyun_oss_credential as credential;
pub extern crate aliyun_oss_http as http;

mod auth;
mod body;
mod bucket;
mod call;
mod client;
mod config;
mod endpoint;
mod error;
mod executor;
mod models;
mod multipart;
mod object;
mod presign;
mod rate_limit;
mod request;
mod retry;

pub use auth::{HmacSha1Signer, Signer};
pub use bucket::{
    CannedAccessControlList, CreateBucketRequest, DeleteBucketRequest, GetBucketAclRequest,
    GetBucketInfoRequest, GetBucketLocationRequest, ListBucketsRequest, ListObjectsRequest,
    StorageClass,
};
pub use call::ServiceResult;
pub use client::OssClient;
pub use config::{ClientConfiguration, ClientConfigurationBuilder, Scheme};
pub use error::{ApiResult, ErrorStatus, ServiceError};
pub use executor::{CancellationToken, Executor, ExecutorShutDown};
pub use models::{
    AccessControlList, AccessControlPolicy, Bucket, BucketDetail, BucketInfo, Buckets,
    CommonPrefixes, CompleteMultipartUploadResult, CompletePart, Contents, CopyObjectResult,
    CreateSymlinkResult, DeleteResult, DeletedObject, GetObjectResult, GetSymlinkResult,
    InitiateMultipartUploadResult, ListAllMyBucketsResult, ListBucketResult,
    ListMultipartUploadsResult, ListPartsResult, LocationConstraint, ObjectMetadata, Owner, Part,
    PutObjectResult, Upload, VoidResult,
};
pub use multipart::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, InitiateMultipartUploadRequest,
    ListMultipartUploadsRequest, ListPartsRequest, UploadPartCopyRequest, UploadPartRequest,
};
pub use object::{
    CopyObjectRequest, CreateSymlinkRequest, DeleteObjectRequest, DeleteObjectsRequest,
    GetObjectByUrlRequest, GetObjectMetaRequest, GetObjectRequest, GetSymlinkRequest,
    HeadObjectRequest, ObjectContent, PutObjectByUrlRequest, PutObjectRequest,
    RestoreObjectRequest,
};
pub use presign::GeneratePresignedUrlRequest;
pub use rate_limit::{RateLimiter, TokenBucketLimiter};
pub use request::{
    is_valid_bucket_name, is_valid_object_key, Parameters, RequestFlags, ResponseSink,
    ResponseSinkFactory, ServiceRequest, ValidationError,
};
pub use retry::{DefaultRetryStrategy, RetryStrategy};

pub mod prelude {
    pub use super::{
        credential::CredentialProvider, http::HttpCaller, RateLimiter, RetryStrategy,
        ServiceRequest,
    };
}
