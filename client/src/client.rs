use crate::{
    auth::{canonical_resource, canonical_string, HmacSha1Signer, Signer},
    bucket::{
        CreateBucketRequest, DeleteBucketRequest, GetBucketAclRequest, GetBucketInfoRequest,
        GetBucketLocationRequest, ListBucketsRequest, ListObjectsRequest,
    },
    call::{execute, RequestContext, ServiceResult},
    config::ClientConfiguration,
    endpoint::{combine_host, combine_path, parse_endpoint, query_string},
    error::{ApiResult, ServiceError},
    executor::{CancellationToken, Executor, ExecutorShutDown},
    models::{
        AccessControlPolicy, BucketInfo, CompleteMultipartUploadResult, CopyObjectResult,
        CreateSymlinkResult, DeleteResult, GetObjectResult, GetSymlinkResult,
        InitiateMultipartUploadResult, ListAllMyBucketsResult, ListBucketResult,
        ListMultipartUploadsResult, ListPartsResult, LocationConstraint, ObjectMetadata,
        PutObjectResult, VoidResult,
    },
    multipart::{
        AbortMultipartUploadRequest, CompleteMultipartUploadRequest,
        InitiateMultipartUploadRequest, ListMultipartUploadsRequest, ListPartsRequest,
        UploadPartCopyRequest, UploadPartRequest,
    },
    object::{
        CopyObjectRequest, CreateSymlinkRequest, DeleteObjectRequest, DeleteObjectsRequest,
        GetObjectByUrlRequest, GetObjectMetaRequest, GetObjectRequest, GetSymlinkRequest,
        HeadObjectRequest, PutObjectByUrlRequest, PutObjectRequest, RestoreObjectRequest,
    },
    presign::GeneratePresignedUrlRequest,
    request::{is_valid_bucket_name, is_valid_object_key, ServiceRequest},
};
use aliyun_oss_credential::CredentialProvider;
use aliyun_oss_http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, HttpCaller, Method};
use assert_impl::assert_impl;
use log::debug;
use serde::de::DeserializeOwned;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use url::Url;

/// 阿里云 OSS 客户端
///
/// 持有接入点、认证信息提供者与 HTTP 传输实现；
/// 客户端可以廉价克隆，内部状态在克隆间共享
#[derive(Clone, Debug)]
pub struct OssClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    endpoint: Url,
    credentials_provider: Box<dyn CredentialProvider>,
    signer: Box<dyn Signer>,
    http_caller: Box<dyn HttpCaller>,
    configuration: ClientConfiguration,
    executor: Executor,
    disabled: AtomicBool,
}

impl OssClient {
    /// 创建 OSS 客户端
    pub fn new(
        endpoint: impl AsRef<str>,
        credentials_provider: impl CredentialProvider + 'static,
        http_caller: impl HttpCaller + 'static,
        configuration: ClientConfiguration,
    ) -> ApiResult<Self> {
        let endpoint = parse_endpoint(endpoint.as_ref(), configuration.scheme())?;
        let executor = Executor::new(configuration.max_connections());
        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint,
                credentials_provider: Box::new(credentials_provider),
                signer: Box::new(HmacSha1Signer),
                http_caller: Box::new(http_caller),
                configuration,
                executor,
                disabled: AtomicBool::new(false),
            }),
        })
    }

    #[inline]
    pub fn configuration(&self) -> &ClientConfiguration {
        &self.inner.configuration
    }

    #[inline]
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    /// 同步执行一次 OSS 操作，返回原始应答
    pub fn execute(
        &self,
        request: &dyn ServiceRequest,
        method: Method,
    ) -> ApiResult<ServiceResult> {
        let ctx = self.request_context();
        execute(&ctx, request, method, None)
    }

    /// 提交异步任务，应答通过回调交付
    ///
    /// 返回的取消令牌可以在任意数据块边界终止任务
    pub fn execute_async<R>(
        &self,
        request: R,
        method: Method,
        handler: impl FnOnce(ApiResult<ServiceResult>) + Send + 'static,
    ) -> Result<CancellationToken, ExecutorShutDown>
    where
        R: ServiceRequest + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let inner = self.inner.clone();
        self.inner.executor.submit(move || {
            let ctx = RequestContext {
                configuration: &inner.configuration,
                endpoint: &inner.endpoint,
                credentials_provider: inner.credentials_provider.as_ref(),
                signer: inner.signer.as_ref(),
                http_caller: inner.http_caller.as_ref(),
                disabled: &inner.disabled,
            };
            handler(execute(&ctx, &request, method, Some(&task_token)));
        })?;
        Ok(token)
    }

    /// 停止发出新的请求，进行中的重试也会随之终止
    pub fn disable_requests(&self) {
        self.inner.disabled.store(true, Ordering::SeqCst);
        debug!("oss client requests disabled");
    }

    /// 恢复发出请求
    pub fn enable_requests(&self) {
        self.inner.disabled.store(false, Ordering::SeqCst);
        debug!("oss client requests enabled");
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }

    fn request_context(&self) -> RequestContext<'_> {
        RequestContext {
            configuration: &self.inner.configuration,
            endpoint: &self.inner.endpoint,
            credentials_provider: self.inner.credentials_provider.as_ref(),
            signer: self.inner.signer.as_ref(),
            http_caller: self.inner.http_caller.as_ref(),
            disabled: &self.inner.disabled,
        }
    }

    // ------------------------------------------------------------------
    // Service / Bucket
    // ------------------------------------------------------------------

    pub fn list_buckets(
        &self,
        request: &ListBucketsRequest,
    ) -> ApiResult<ListAllMyBucketsResult> {
        let result = self.execute(request, Method::GET)?;
        let (mut parsed, request_id) = parse_xml_result::<ListAllMyBucketsResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn create_bucket(&self, request: &CreateBucketRequest) -> ApiResult<VoidResult> {
        let result = self.execute(request, Method::PUT)?;
        Ok(VoidResult::from_result(&result))
    }

    pub fn delete_bucket(&self, request: &DeleteBucketRequest) -> ApiResult<VoidResult> {
        let result = self.execute(request, Method::DELETE)?;
        Ok(VoidResult::from_result(&result))
    }

    pub fn list_objects(&self, request: &ListObjectsRequest) -> ApiResult<ListBucketResult> {
        let result = self.execute(request, Method::GET)?;
        let (mut parsed, request_id) = parse_xml_result::<ListBucketResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn get_bucket_acl(&self, request: &GetBucketAclRequest) -> ApiResult<AccessControlPolicy> {
        let result = self.execute(request, Method::GET)?;
        let (mut parsed, request_id) = parse_xml_result::<AccessControlPolicy>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn get_bucket_location(
        &self,
        request: &GetBucketLocationRequest,
    ) -> ApiResult<LocationConstraint> {
        let result = self.execute(request, Method::GET)?;
        let (mut parsed, request_id) = parse_xml_result::<LocationConstraint>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn get_bucket_info(&self, request: &GetBucketInfoRequest) -> ApiResult<BucketInfo> {
        let result = self.execute(request, Method::GET)?;
        let (mut parsed, request_id) = parse_xml_result::<BucketInfo>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    // ------------------------------------------------------------------
    // Object
    // ------------------------------------------------------------------

    pub fn put_object(&self, request: &PutObjectRequest) -> ApiResult<PutObjectResult> {
        let result = self.execute(request, Method::PUT)?;
        Ok(PutObjectResult::from_result(&result))
    }

    pub fn get_object(&self, request: &GetObjectRequest) -> ApiResult<GetObjectResult> {
        let result = self.execute(request, Method::GET)?;
        Ok(GetObjectResult::from_result(result))
    }

    pub fn delete_object(&self, request: &DeleteObjectRequest) -> ApiResult<VoidResult> {
        let result = self.execute(request, Method::DELETE)?;
        Ok(VoidResult::from_result(&result))
    }

    pub fn delete_objects(&self, request: &DeleteObjectsRequest) -> ApiResult<DeleteResult> {
        let result = self.execute(request, Method::POST)?;
        let (mut parsed, request_id) = parse_xml_result::<DeleteResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn head_object(&self, request: &HeadObjectRequest) -> ApiResult<ObjectMetadata> {
        let result = self.execute(request, Method::HEAD)?;
        Ok(ObjectMetadata::from_result(&result))
    }

    pub fn get_object_meta(&self, request: &GetObjectMetaRequest) -> ApiResult<ObjectMetadata> {
        let result = self.execute(request, Method::HEAD)?;
        Ok(ObjectMetadata::from_result(&result))
    }

    pub fn copy_object(&self, request: &CopyObjectRequest) -> ApiResult<CopyObjectResult> {
        let result = self.execute(request, Method::PUT)?;
        let (mut parsed, request_id) = parse_xml_result::<CopyObjectResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn create_symlink(&self, request: &CreateSymlinkRequest) -> ApiResult<CreateSymlinkResult> {
        let result = self.execute(request, Method::PUT)?;
        Ok(CreateSymlinkResult::from_result(&result))
    }

    pub fn get_symlink(&self, request: &GetSymlinkRequest) -> ApiResult<GetSymlinkResult> {
        let result = self.execute(request, Method::GET)?;
        Ok(GetSymlinkResult::from_result(&result))
    }

    pub fn restore_object(&self, request: &RestoreObjectRequest) -> ApiResult<VoidResult> {
        let result = self.execute(request, Method::POST)?;
        Ok(VoidResult::from_result(&result))
    }

    /// 通过预签名 URL 下载对象，跳过签名
    pub fn get_object_by_url(&self, request: &GetObjectByUrlRequest) -> ApiResult<GetObjectResult> {
        let result = self.execute(request, Method::GET)?;
        Ok(GetObjectResult::from_result(result))
    }

    /// 通过预签名 URL 上传对象，跳过签名
    pub fn put_object_by_url(&self, request: &PutObjectByUrlRequest) -> ApiResult<PutObjectResult> {
        let result = self.execute(request, Method::PUT)?;
        Ok(PutObjectResult::from_result(&result))
    }

    /// 异步上传对象
    pub fn put_object_async(
        &self,
        request: PutObjectRequest,
        handler: impl FnOnce(ApiResult<PutObjectResult>) + Send + 'static,
    ) -> Result<CancellationToken, ExecutorShutDown> {
        self.execute_async(request, Method::PUT, move |outcome| {
            handler(outcome.map(|result| PutObjectResult::from_result(&result)))
        })
    }

    /// 异步下载对象
    pub fn get_object_async(
        &self,
        request: GetObjectRequest,
        handler: impl FnOnce(ApiResult<GetObjectResult>) + Send + 'static,
    ) -> Result<CancellationToken, ExecutorShutDown> {
        self.execute_async(request, Method::GET, move |outcome| {
            handler(outcome.map(GetObjectResult::from_result))
        })
    }

    // ------------------------------------------------------------------
    // Multipart
    // ------------------------------------------------------------------

    pub fn initiate_multipart_upload(
        &self,
        request: &InitiateMultipartUploadRequest,
    ) -> ApiResult<InitiateMultipartUploadResult> {
        let result = self.execute(request, Method::POST)?;
        let (mut parsed, request_id) = parse_xml_result::<InitiateMultipartUploadResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn upload_part(&self, request: &UploadPartRequest) -> ApiResult<PutObjectResult> {
        let result = self.execute(request, Method::PUT)?;
        Ok(PutObjectResult::from_result(&result))
    }

    pub fn upload_part_copy(
        &self,
        request: &UploadPartCopyRequest,
    ) -> ApiResult<CopyObjectResult> {
        let result = self.execute(request, Method::PUT)?;
        let (mut parsed, request_id) = parse_xml_result::<CopyObjectResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn complete_multipart_upload(
        &self,
        request: &CompleteMultipartUploadRequest,
    ) -> ApiResult<CompleteMultipartUploadResult> {
        let result = self.execute(request, Method::POST)?;
        let (mut parsed, request_id) = parse_xml_result::<CompleteMultipartUploadResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn abort_multipart_upload(
        &self,
        request: &AbortMultipartUploadRequest,
    ) -> ApiResult<VoidResult> {
        let result = self.execute(request, Method::DELETE)?;
        Ok(VoidResult::from_result(&result))
    }

    pub fn list_multipart_uploads(
        &self,
        request: &ListMultipartUploadsRequest,
    ) -> ApiResult<ListMultipartUploadsResult> {
        let result = self.execute(request, Method::GET)?;
        let (mut parsed, request_id) = parse_xml_result::<ListMultipartUploadsResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    pub fn list_parts(&self, request: &ListPartsRequest) -> ApiResult<ListPartsResult> {
        let result = self.execute(request, Method::GET)?;
        let (mut parsed, request_id) = parse_xml_result::<ListPartsResult>(result)?;
        parsed.request_id = request_id;
        Ok(parsed)
    }

    // ------------------------------------------------------------------
    // Presigned URL
    // ------------------------------------------------------------------

    /// 生成预签名 URL
    ///
    /// 生成的 URL 与服务端以完全一致的规范化串验签，
    /// 参与签名的请求头与实际访问时必须一致
    pub fn generate_presigned_url(
        &self,
        request: &GeneratePresignedUrlRequest,
    ) -> ApiResult<String> {
        if !is_valid_bucket_name(request.bucket_name())
            || !is_valid_object_key(request.object_key())
        {
            return Err(ServiceError::new(
                "ValidateError",
                "The Bucket or Key is invalid",
            ));
        }

        let mut headers = HeaderMap::new();
        if let Some(content_type) = request.content_type_value() {
            headers.insert(CONTENT_TYPE, header_value(content_type)?);
        }
        if let Some(content_md5) = request.content_md5_value() {
            headers.insert("content-md5", header_value(content_md5)?);
        }
        for (name, value) in request.user_metadata_entries() {
            let name = format!("x-oss-meta-{}", name);
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                ServiceError::new(
                    "ValidateError",
                    format!("The metadata name `{}` is invalid: {}", name, err),
                )
            })?;
            headers.insert(name, header_value(value)?);
        }

        let credential = self
            .inner
            .credentials_provider
            .get()
            .map_err(|err| ServiceError::new("SignError", err.to_string()))?;
        let mut parameters = request.query_parameters().clone();
        if let Some(token) = credential.security_token() {
            parameters.insert("security-token".to_owned(), token.to_owned());
        }

        let expires = request.expiration().to_string();
        let resource = canonical_resource(request.bucket_name(), request.object_key());
        let canonical = canonical_string(
            request.http_method(),
            &resource,
            &expires,
            &headers,
            &parameters,
        );
        debug!("presigned canonical string:\n{}", canonical);
        let signature = self
            .inner
            .signer
            .generate(&canonical, credential.access_key_secret());

        parameters.insert("Expires".to_owned(), expires);
        parameters.insert(
            "OSSAccessKeyId".to_owned(),
            credential.access_key_id().to_owned(),
        );
        parameters.insert("Signature".to_owned(), signature);

        Ok(format!(
            "{}://{}{}?{}",
            self.inner.endpoint.scheme(),
            combine_host(
                &self.inner.endpoint,
                request.bucket_name(),
                self.inner.configuration.is_cname(),
            ),
            combine_path(
                &self.inner.endpoint,
                request.bucket_name(),
                request.object_key(),
                self.inner.configuration.is_cname(),
            ),
            query_string(&parameters),
        ))
    }
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| {
        ServiceError::new(
            "ValidateError",
            format!("The header value `{}` is invalid: {}", value, err),
        )
    })
}

fn parse_xml_result<T: DeserializeOwned>(mut result: ServiceResult) -> ApiResult<(T, String)> {
    let request_id = result.request_id().to_owned();
    let text = result.read_body_to_string().map_err(|err| {
        ServiceError::new("ParseXMLError", err.to_string()).with_request_id(request_id.clone())
    })?;
    let parsed = quick_xml::de::from_str(&text).map_err(|err| {
        ServiceError::new("ParseXMLError", err.to_string()).with_request_id(request_id.clone())
    })?;
    Ok((parsed, request_id))
}
