use crate::{
    auth::{authorization, canonical_resource, canonical_string, Signer},
    body::{content_md5, ensure_sized_body, ResponseDrain, TransferBody},
    config::ClientConfiguration,
    endpoint::{combine_host, compose_url},
    error::{classify_error_response, request_id_of, ApiResult, ErrorStatus, ServiceError},
    executor::CancellationToken,
    request::{default_response_sink, ResponseSink, ServiceRequest},
};
use aliyun_oss_crc64::Crc64;
use aliyun_oss_credential::CredentialProvider;
use aliyun_oss_http::{
    header::{AsHeaderName, AUTHORIZATION, CONTENT_LENGTH, DATE, RANGE, USER_AGENT},
    ErrorKind as TransportErrorKind, HeaderMap, HeaderValue, HttpCaller, MaybeOwnedBody, Method,
    Request as HttpRequest, RequestBody, StatusCode, Uri,
};
use chrono::Utc;
use log::debug;
use std::{
    convert::TryFrom,
    io::{Read, Result as IoResult, Seek, SeekFrom},
    sync::atomic::{AtomicBool, Ordering},
    thread,
};
use url::Url;

const CONTENT_MD5: &str = "content-md5";
const X_OSS_SECURITY_TOKEN: &str = "x-oss-security-token";
const X_OSS_HASH_CRC64ECMA: &str = "x-oss-hash-crc64ecma";

/// 请求管线依赖的客户端侧资源
pub(crate) struct RequestContext<'a> {
    pub(crate) configuration: &'a ClientConfiguration,
    pub(crate) endpoint: &'a Url,
    pub(crate) credentials_provider: &'a dyn CredentialProvider,
    pub(crate) signer: &'a dyn Signer,
    pub(crate) http_caller: &'a dyn HttpCaller,
    pub(crate) disabled: &'a AtomicBool,
}

/// 服务端应答
///
/// 响应体已经写入接收目标并回卷到起始位置
#[derive(Debug)]
pub struct ServiceResult {
    request_id: String,
    status_code: StatusCode,
    headers: HeaderMap,
    body: Box<dyn ResponseSink>,
}

impl ServiceResult {
    /// 服务端分配的请求标识
    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取指定响应头的字符串值，不存在时为空
    pub fn header_str(&self, name: impl AsHeaderName) -> &str {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    /// 获取响应体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut dyn ResponseSink {
        &mut *self.body
    }

    /// 取出响应体
    #[inline]
    pub fn into_body(self) -> Box<dyn ResponseSink> {
        self.body
    }

    pub(crate) fn read_body_to_string(&mut self) -> IoResult<String> {
        let mut text = String::new();
        self.body.read_to_string(&mut text)?;
        Ok(text)
    }
}

fn io_error_to_service(err: std::io::Error) -> ServiceError {
    ServiceError::new(TransportErrorKind::LocalIoError.as_str(), err.to_string())
        .with_status(ErrorStatus::Transport(TransportErrorKind::LocalIoError))
}

fn cancelled_service_error() -> ServiceError {
    ServiceError::new("Cancelled", "The request was cancelled by the caller")
        .with_status(ErrorStatus::Transport(TransportErrorKind::UserCanceled))
}

fn http_date_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| {
        ServiceError::new(
            TransportErrorKind::InvalidHeader.as_str(),
            format!("The header value `{}` is invalid: {}", value, err),
        )
    })
}

/// 执行一次 OSS 操作
///
/// 校验、构造、签名、发送、校验完整性并归类结果；
/// 重试由配置的策略决定，且要求请求体可以回卷
pub(crate) fn execute(
    ctx: &RequestContext<'_>,
    request: &dyn ServiceRequest,
    method: Method,
    cancel: Option<&CancellationToken>,
) -> ApiResult<ServiceResult> {
    if request.presigned_url().is_none() {
        request
            .validate()
            .map_err(|err| ServiceError::new("ValidateError", err.to_string()))?;
    }

    let flags = request.flags();
    let parameters = request.special_parameters();
    let base_headers = request.headers();

    // 请求体只打开一次,重试时回卷复用
    let mut body = request.payload().map_err(io_error_to_service)?;
    let mut content_length = base_headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let needs_md5 = flags.content_md5() && !base_headers.contains_key(CONTENT_MD5);
    let mut body_md5 = None;
    body = match body {
        Some(mut current) => {
            if content_length.is_none() || (needs_md5 && !current.is_rewindable()) {
                let (sized, size) = ensure_sized_body(current).map_err(io_error_to_service)?;
                if content_length.is_none() {
                    content_length = Some(size);
                }
                current = sized;
            }
            if needs_md5 {
                body_md5 = Some(content_md5(&mut current).map_err(io_error_to_service)?);
            }
            Some(current)
        }
        None => None,
    };

    let crc_enabled = flags.check_crc64()
        && ctx.configuration.enable_crc64()
        && !base_headers.contains_key(RANGE);
    let progress = request.progress_callback();
    let retry_strategy = ctx.configuration.retry_strategy();
    let mut attempted_retries = 0;

    loop {
        if ctx.disabled.load(Ordering::Relaxed) {
            return Err(ServiceError::new(
                "ClientDisabled",
                "The client has disabled all requests",
            ));
        }
        if let Some(cancel) = cancel {
            if cancel.is_cancelled() {
                return Err(cancelled_service_error());
            }
        }

        match attempt_once(
            ctx,
            request,
            &method,
            &parameters,
            &base_headers,
            body.as_mut(),
            content_length,
            body_md5.as_deref(),
            crc_enabled,
            progress.clone(),
            cancel,
        ) {
            Ok(result) => return Ok(result),
            Err(err) => {
                let rewindable = body.as_ref().map_or(true, RequestBody::is_rewindable);
                if !rewindable || !retry_strategy.should_retry(&err, attempted_retries) {
                    return Err(err);
                }
                if let Some(body) = body.as_mut() {
                    if body.reset().is_err() {
                        return Err(err);
                    }
                }
                let delay = retry_strategy.delay(&err, attempted_retries);
                debug!(
                    "request failed with `{}`, retry after {:?} (already retried {} times)",
                    err, delay, attempted_retries
                );
                if delay.as_nanos() > 0 {
                    thread::sleep(delay);
                }
                attempted_retries += 1;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn attempt_once(
    ctx: &RequestContext<'_>,
    request: &dyn ServiceRequest,
    method: &Method,
    parameters: &crate::request::Parameters,
    base_headers: &HeaderMap,
    body: Option<&mut RequestBody>,
    content_length: Option<u64>,
    body_md5: Option<&str>,
    crc_enabled: bool,
    progress: Option<aliyun_oss_http::OnProgressCallback>,
    cancel: Option<&CancellationToken>,
) -> ApiResult<ServiceResult> {
    let configuration = ctx.configuration;
    let mut headers = base_headers.clone();
    headers.insert(USER_AGENT, header_value(configuration.user_agent())?);
    if !headers.contains_key(DATE) {
        headers.insert(DATE, header_value(&http_date_now())?);
    }

    // 无请求体时 GET/POST 显式声明零长度,其余方法不携带 Content-Length
    let has_body = body.is_some();
    if !has_body {
        if *method == Method::GET || *method == Method::POST {
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        } else {
            headers.remove(CONTENT_LENGTH);
        }
    } else if let Some(size) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    }
    if let Some(md5) = body_md5 {
        headers.insert(CONTENT_MD5, header_value(md5)?);
    }

    // 每次尝试都重新取凭证、刷新 Date 并重新签名
    if request.presigned_url().is_none() {
        let credential = ctx
            .credentials_provider
            .get()
            .map_err(|err| ServiceError::new("SignError", err.to_string()))?;
        if credential.access_key_id().is_empty() || credential.access_key_secret().is_empty() {
            return Err(ServiceError::new(
                "SignError",
                "The access key id or access key secret is empty",
            ));
        }
        if let Some(token) = credential.security_token() {
            headers.insert(X_OSS_SECURITY_TOKEN, header_value(token)?);
        }

        let resource = canonical_resource(request.bucket(), request.key());
        let date = headers
            .get(DATE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let canonical = canonical_string(method, &resource, &date, &headers, parameters);
        debug!("canonical string:\n{}", canonical);
        let signature = ctx
            .signer
            .generate(&canonical, credential.access_key_secret());
        let auth_value = authorization(credential.access_key_id(), &signature);
        debug!("authorization: {}", auth_value);
        headers.insert(AUTHORIZATION, header_value(&auth_value)?);
    }

    let url = if let Some(presigned) = request.presigned_url() {
        Uri::try_from(presigned).map_err(|err| {
            ServiceError::new(
                "ValidateError",
                format!("The url `{}` is invalid: {}", presigned, err),
            )
        })?
    } else if request.flags().param_in_path() {
        let path = request.path_override().unwrap_or_default();
        let raw = format!(
            "{}://{}{}",
            ctx.endpoint.scheme(),
            combine_host(ctx.endpoint, "", configuration.is_cname()),
            path,
        );
        Uri::try_from(raw.as_str()).map_err(|err| {
            ServiceError::new(
                "ValidateError",
                format!("The url `{}` is invalid: {}", raw, err),
            )
        })?
    } else {
        let composed = compose_url(
            ctx.endpoint,
            request.bucket(),
            request.key(),
            configuration.is_cname(),
            parameters,
        )?;
        Uri::try_from(composed.as_str()).map_err(|err| {
            ServiceError::new(
                "ValidateError",
                format!("The url `{}` is invalid: {}", composed, err),
            )
        })?
    };

    let mut transfer = body.map(|body| {
        TransferBody::new(body, content_length)
            .with_crc64(crc_enabled)
            .with_progress(progress.clone())
            .with_limiter(configuration.send_rate_limiter().cloned())
            .with_cancellation(cancel.cloned())
    });

    let builder = HttpRequest::builder()
        .method(method.clone())
        .url(url)
        .headers(headers)
        .connect_timeout(configuration.connect_timeout())
        .request_timeout(configuration.request_timeout())
        .proxy(configuration.proxy().cloned())
        .verify_ssl(configuration.verify_ssl());
    let mut http_request = match transfer.as_mut() {
        Some(transfer) => builder
            .body(MaybeOwnedBody::from_referenced_reader(transfer))
            .build(),
        None => builder.build(),
    };

    let call_result = ctx.http_caller.call(&mut http_request);
    drop(http_request);

    let response = match call_result {
        Ok(response) => response,
        Err(err) => {
            if cancel.map_or(false, CancellationToken::is_cancelled) {
                return Err(cancelled_service_error());
            }
            return Err(ServiceError::from_transport(&err));
        }
    };

    let request_crc = transfer.as_ref().and_then(TransferBody::crc64);
    let sent_bytes = transfer
        .as_ref()
        .map_or(0, TransferBody::transferred_bytes);

    let (parts, mut response_body) = response.into_parts_and_body();
    let status_code = parts.status_code();

    if status_code.as_u16() >= 300 {
        // 错误包体很小,读入内存归类
        let mut raw = Vec::new();
        response_body
            .read_to_end(&mut raw)
            .map_err(io_error_to_service)?;
        let text = String::from_utf8_lossy(&raw);
        return Err(classify_error_response(status_code, parts.headers(), &text));
    }

    // 成功应答,响应体写入接收目标
    let mut sink = match request.response_sink_factory() {
        Some(factory) => factory().map_err(io_error_to_service)?,
        None => default_response_sink().map_err(io_error_to_service)?,
    };
    let total = parts
        .header(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let mut response_crc = if crc_enabled { Some(Crc64::new()) } else { None };
    let drained = ResponseDrain {
        crc: response_crc.as_mut(),
        progress: progress.as_ref(),
        limiter: configuration.recv_rate_limiter(),
        cancel,
        total,
    }
    .copy(&mut response_body, &mut sink);
    let received_bytes = match drained {
        Ok(received) => received,
        Err(err) => {
            if cancel.map_or(false, CancellationToken::is_cancelled) {
                return Err(cancelled_service_error());
            }
            return Err(ServiceError::new(
                TransportErrorKind::ReceiveError.as_str(),
                err.to_string(),
            )
            .with_status(ErrorStatus::Transport(TransportErrorKind::ReceiveError)));
        }
    };
    sink.seek(SeekFrom::Start(0)).map_err(io_error_to_service)?;

    let request_id = request_id_of(parts.headers());

    // CRC64 端到端校验,上传比较请求体,下载比较响应体
    if crc_enabled {
        if let Some(server_crc) = parts
            .header(X_OSS_HASH_CRC64ECMA)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
        {
            let (client_crc, transferred_bytes) = match request_crc {
                Some(crc) => (crc, sent_bytes),
                None => (response_crc.as_ref().map_or(0, Crc64::value), received_bytes),
            };
            if client_crc != server_crc {
                return Err(ServiceError::new(
                    "CrcCheckError",
                    format!(
                        "Crc64 validation failed. Expected hash:{} not equal to calculated hash:{}. Transferred bytes:{}. RequestId:{}",
                        server_crc, client_crc, transferred_bytes, request_id
                    ),
                )
                .with_status(ErrorStatus::CrcInconsistent)
                .with_request_id(request_id));
            }
        }
    }

    Ok(ServiceResult {
        request_id,
        status_code,
        headers: parts.headers().clone(),
        body: sink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::HmacSha1Signer,
        config::Scheme,
        endpoint::parse_endpoint,
        request::{Parameters, RequestFlags, ValidationError},
        retry::DefaultRetryStrategy,
    };
    use aliyun_oss_credential::StaticCredentialProvider;
    use aliyun_oss_crc64::crc64_of;
    use aliyun_oss_http::{Request, Response, ResponseBody};
    use std::{
        collections::VecDeque,
        io::Cursor,
        sync::{
            atomic::{AtomicUsize, Ordering as AtomicOrdering},
            Mutex,
        },
        time::{Duration, Instant},
    };

    #[derive(Debug)]
    struct ScriptedCaller {
        statuses: Mutex<VecDeque<u16>>,
        response_headers: Vec<(&'static str, String)>,
        response_body: Vec<u8>,
        calls: AtomicUsize,
        seen_headers: Mutex<Vec<HeaderMap>>,
        seen_urls: Mutex<Vec<String>>,
    }

    impl ScriptedCaller {
        fn new(statuses: Vec<u16>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                response_headers: Vec::new(),
                response_body: Vec::new(),
                calls: AtomicUsize::new(0),
                seen_headers: Mutex::new(Vec::new()),
                seen_urls: Mutex::new(Vec::new()),
            }
        }

        fn with_response_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
            self.response_headers.push((name, value.into()));
            self
        }

        fn with_response_body(mut self, body: Vec<u8>) -> Self {
            self.response_body = body;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }

        fn last_request_headers(&self) -> HeaderMap {
            self.seen_headers.lock().unwrap().last().cloned().unwrap()
        }

        fn last_url(&self) -> String {
            self.seen_urls.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl HttpCaller for ScriptedCaller {
        fn call(&self, request: &mut Request<'_>) -> aliyun_oss_http::Result<Response> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.seen_headers
                .lock()
                .unwrap()
                .push(request.headers().clone());
            self.seen_urls.lock().unwrap().push(request.url().to_string());

            // 模拟传输层完整读走请求体
            let mut sent = Vec::new();
            request
                .body_mut()
                .read_to_end(&mut sent)
                .map_err(|err| aliyun_oss_http::Error::new(TransportErrorKind::SendError, err))?;

            let status = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted caller ran out of responses");
            let mut builder = Response::builder()
                .status_code(StatusCode::from_u16(status).unwrap())
                .body(ResponseBody::from_bytes(self.response_body.clone()));
            for (name, value) in &self.response_headers {
                builder = builder.header(*name, HeaderValue::from_str(value).unwrap());
            }
            Ok(builder.build())
        }
    }

    struct TestRequest {
        bucket: String,
        key: String,
        flags: RequestFlags,
        headers: HeaderMap,
        parameters: Parameters,
        content: Option<Vec<u8>>,
        unseekable: bool,
    }

    impl Default for TestRequest {
        fn default() -> Self {
            Self {
                bucket: "examplebucket".to_owned(),
                key: "nelson".to_owned(),
                flags: RequestFlags::new(),
                headers: HeaderMap::new(),
                parameters: Parameters::new(),
                content: None,
                unseekable: false,
            }
        }
    }

    impl ServiceRequest for TestRequest {
        fn bucket(&self) -> &str {
            &self.bucket
        }

        fn key(&self) -> &str {
            &self.key
        }

        fn flags(&self) -> RequestFlags {
            self.flags
        }

        fn validate(&self) -> Result<(), ValidationError> {
            if !self.bucket.is_empty() && !crate::request::is_valid_bucket_name(&self.bucket) {
                return Err(ValidationError::InvalidBucketName);
            }
            Ok(())
        }

        fn special_headers(&self) -> HeaderMap {
            self.headers.clone()
        }

        fn special_parameters(&self) -> Parameters {
            self.parameters.clone()
        }

        fn payload(&self) -> IoResult<Option<RequestBody>> {
            Ok(self.content.as_ref().map(|content| {
                if self.unseekable {
                    RequestBody::from_reader(Cursor::new(content.clone()))
                } else {
                    RequestBody::from_bytes(content.clone())
                }
            }))
        }
    }

    struct TestContext {
        configuration: ClientConfiguration,
        endpoint: Url,
        provider: StaticCredentialProvider,
        signer: HmacSha1Signer,
        disabled: AtomicBool,
    }

    impl TestContext {
        fn new(configuration: ClientConfiguration) -> Self {
            Self {
                configuration,
                endpoint: parse_endpoint("oss-cn-hangzhou.aliyuncs.com", Scheme::Http).unwrap(),
                provider: StaticCredentialProvider::new("test-access-key-id", "test-secret"),
                signer: HmacSha1Signer,
                disabled: AtomicBool::new(false),
            }
        }

        fn execute(
            &self,
            caller: &ScriptedCaller,
            request: &dyn ServiceRequest,
            method: Method,
        ) -> ApiResult<ServiceResult> {
            let ctx = RequestContext {
                configuration: &self.configuration,
                endpoint: &self.endpoint,
                credentials_provider: &self.provider,
                signer: &self.signer,
                http_caller: caller,
                disabled: &self.disabled,
            };
            execute(&ctx, request, method, None)
        }
    }

    fn fast_retry_configuration() -> ClientConfiguration {
        ClientConfiguration::builder()
            .retry_strategy(Box::new(DefaultRetryStrategy::new(
                3,
                Duration::from_millis(10),
            )))
            .build()
    }

    #[test]
    fn test_validation_happens_before_network() {
        let caller = ScriptedCaller::new(vec![200]);
        let ctx = TestContext::new(ClientConfiguration::default());
        let request = TestRequest {
            bucket: "AB".to_owned(),
            ..Default::default()
        };
        let err = ctx.execute(&caller, &request, Method::GET).unwrap_err();
        assert_eq!(err.code(), "ValidateError");
        assert_eq!(err.status(), ErrorStatus::Client);
        assert_eq!(caller.calls(), 0);
    }

    #[test]
    fn test_successful_get_signs_and_composes_url() {
        let caller = ScriptedCaller::new(vec![200])
            .with_response_header("x-oss-request-id", "REQ-1")
            .with_response_body(b"file-content".to_vec());
        let ctx = TestContext::new(ClientConfiguration::default());
        let request = TestRequest::default();
        let mut result = ctx.execute(&caller, &request, Method::GET).unwrap();

        assert_eq!(result.request_id(), "REQ-1");
        assert_eq!(result.status_code(), StatusCode::OK);
        assert_eq!(result.read_body_to_string().unwrap(), "file-content");
        assert_eq!(
            caller.last_url(),
            "http://examplebucket.oss-cn-hangzhou.aliyuncs.com/nelson"
        );

        let headers = caller.last_request_headers();
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap();
        assert!(auth.starts_with("OSS test-access-key-id:"));
        assert!(headers.contains_key(DATE));
        assert!(headers.contains_key(USER_AGENT));
        assert_eq!(
            headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
            Some("0"),
        );
    }

    #[test]
    fn test_content_length_stripped_for_bodyless_delete() {
        let caller = ScriptedCaller::new(vec![204]);
        let ctx = TestContext::new(ClientConfiguration::default());
        let request = TestRequest::default();
        ctx.execute(&caller, &request, Method::DELETE).unwrap();
        assert!(!caller
            .last_request_headers()
            .contains_key(CONTENT_LENGTH));
    }

    #[test]
    fn test_body_content_length_and_md5() {
        let caller = ScriptedCaller::new(vec![200]);
        let ctx = TestContext::new(ClientConfiguration::default());
        let request = TestRequest {
            flags: RequestFlags::new().with_content_md5(),
            content: Some(b"0123456789".to_vec()),
            ..Default::default()
        };
        ctx.execute(&caller, &request, Method::PUT).unwrap();

        let headers = caller.last_request_headers();
        assert_eq!(
            headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
            Some("10"),
        );
        assert_eq!(
            headers.get(CONTENT_MD5).and_then(|v| v.to_str().ok()),
            Some("eB5eJF1ptWaXm4bijSPyxw=="),
        );
    }

    #[test]
    fn test_retry_on_503_then_success() {
        let caller = ScriptedCaller::new(vec![503, 503, 200]);
        let ctx = TestContext::new(fast_retry_configuration());
        let request = TestRequest {
            content: Some(b"retry-me".to_vec()),
            ..Default::default()
        };
        let begin = Instant::now();
        let result = ctx.execute(&caller, &request, Method::PUT).unwrap();
        assert_eq!(result.status_code(), StatusCode::OK);
        assert_eq!(caller.calls(), 3);
        // 退避序列为 10ms、20ms
        assert!(begin.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_retries_exhausted_surfaces_server_error() {
        let caller = ScriptedCaller::new(vec![503, 503, 503, 503]);
        let ctx = TestContext::new(fast_retry_configuration());
        let request = TestRequest::default();
        let err = ctx.execute(&caller, &request, Method::GET).unwrap_err();
        assert_eq!(caller.calls(), 4);
        assert_eq!(
            err.status(),
            ErrorStatus::Http(StatusCode::SERVICE_UNAVAILABLE)
        );
    }

    #[test]
    fn test_client_error_is_not_retried() {
        let caller = ScriptedCaller::new(vec![404]).with_response_body(
            b"<Error><Code>NoSuchKey</Code><Message>missing</Message><RequestId>R</RequestId></Error>"
                .to_vec(),
        );
        let ctx = TestContext::new(fast_retry_configuration());
        let request = TestRequest::default();
        let err = ctx.execute(&caller, &request, Method::GET).unwrap_err();
        assert_eq!(caller.calls(), 1);
        assert_eq!(err.code(), "NoSuchKey");
        assert_eq!(err.request_id(), "R");
    }

    #[test]
    fn test_unseekable_body_is_not_retried() {
        let caller = ScriptedCaller::new(vec![503, 200]);
        let ctx = TestContext::new(fast_retry_configuration());
        let mut headers = HeaderMap::new();
        // 调用方给定长度,避免不可定位的流被读入缓冲
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("6"));
        let request = TestRequest {
            headers,
            content: Some(b"stream".to_vec()),
            unseekable: true,
            ..Default::default()
        };
        let err = ctx.execute(&caller, &request, Method::PUT).unwrap_err();
        assert_eq!(caller.calls(), 1);
        assert_eq!(
            err.status(),
            ErrorStatus::Http(StatusCode::SERVICE_UNAVAILABLE)
        );
    }

    #[test]
    fn test_crc64_mismatch_yields_inconsistent_status() {
        let caller = ScriptedCaller::new(vec![200])
            .with_response_header("x-oss-hash-crc64ecma", "12345")
            .with_response_header("x-oss-request-id", "REQ-CRC");
        let ctx = TestContext::new(ClientConfiguration::default());
        let request = TestRequest {
            flags: RequestFlags::new().with_check_crc64(),
            content: Some(b"123456789".to_vec()),
            ..Default::default()
        };
        let err = ctx.execute(&caller, &request, Method::PUT).unwrap_err();
        assert_eq!(err.status(), ErrorStatus::CrcInconsistent);
        assert_eq!(err.code(), "CrcCheckError");
        assert!(err.message().contains("12345"));
        assert!(err
            .message()
            .contains(&crc64_of(b"123456789").to_string()));
        assert!(err.message().contains("REQ-CRC"));
        assert_eq!(caller.calls(), 1);
    }

    #[test]
    fn test_crc64_match_succeeds() {
        let crc = crc64_of(b"123456789").to_string();
        let caller =
            ScriptedCaller::new(vec![200]).with_response_header("x-oss-hash-crc64ecma", crc);
        let ctx = TestContext::new(ClientConfiguration::default());
        let request = TestRequest {
            flags: RequestFlags::new().with_check_crc64(),
            content: Some(b"123456789".to_vec()),
            ..Default::default()
        };
        assert!(ctx.execute(&caller, &request, Method::PUT).is_ok());
    }

    #[test]
    fn test_crc64_skipped_when_range_header_present() {
        let caller = ScriptedCaller::new(vec![206])
            .with_response_header("x-oss-hash-crc64ecma", "12345")
            .with_response_body(b"partial".to_vec());
        let ctx = TestContext::new(ClientConfiguration::default());
        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=0-6"));
        let request = TestRequest {
            flags: RequestFlags::new().with_check_crc64(),
            headers,
            ..Default::default()
        };
        assert!(ctx.execute(&caller, &request, Method::GET).is_ok());
    }

    #[test]
    fn test_disabled_client_short_circuits() {
        let caller = ScriptedCaller::new(vec![200]);
        let ctx = TestContext::new(ClientConfiguration::default());
        ctx.disabled.store(true, Ordering::SeqCst);
        let request = TestRequest::default();
        let err = ctx.execute(&caller, &request, Method::GET).unwrap_err();
        assert_eq!(err.code(), "ClientDisabled");
        assert_eq!(caller.calls(), 0);
    }

    #[test]
    fn test_security_token_header_is_set() {
        let caller = ScriptedCaller::new(vec![200]);
        let mut ctx = TestContext::new(ClientConfiguration::default());
        ctx.provider = StaticCredentialProvider::with_security_token(
            "token-ak",
            "token-sk",
            "session-token-value",
        );
        let request = TestRequest::default();
        ctx.execute(&caller, &request, Method::GET).unwrap();
        assert_eq!(
            caller
                .last_request_headers()
                .get(X_OSS_SECURITY_TOKEN)
                .and_then(|v| v.to_str().ok()),
            Some("session-token-value"),
        );
    }

    #[test]
    fn test_non_whitelisted_parameters_travel_on_the_wire() {
        let caller = ScriptedCaller::new(vec![200]);
        let ctx = TestContext::new(ClientConfiguration::default());
        let mut parameters = Parameters::new();
        parameters.insert("uploads".to_owned(), String::new());
        parameters.insert("prefix".to_owned(), "p".to_owned());
        let request = TestRequest {
            key: String::new(),
            parameters,
            ..Default::default()
        };
        ctx.execute(&caller, &request, Method::GET).unwrap();
        assert_eq!(
            caller.last_url(),
            "http://examplebucket.oss-cn-hangzhou.aliyuncs.com/?prefix=p&uploads"
        );
    }

    #[test]
    fn test_param_in_path_uses_verbatim_path() {
        struct PathRequest;
        impl ServiceRequest for PathRequest {
            fn flags(&self) -> RequestFlags {
                RequestFlags::new().with_param_in_path()
            }

            fn path_override(&self) -> Option<String> {
                Some("/examplebucket/nelson?uploads".to_owned())
            }
        }

        let caller = ScriptedCaller::new(vec![200]);
        let ctx = TestContext::new(ClientConfiguration::default());
        ctx.execute(&caller, &PathRequest, Method::GET).unwrap();
        assert_eq!(
            caller.last_url(),
            "http://oss-cn-hangzhou.aliyuncs.com/examplebucket/nelson?uploads"
        );
        assert!(caller.last_request_headers().contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_cancelled_token_short_circuits() {
        let caller = ScriptedCaller::new(vec![200]);
        let ctx = TestContext::new(ClientConfiguration::default());
        let request = TestRequest::default();
        let token = CancellationToken::new();
        token.cancel();
        let pipeline_ctx = RequestContext {
            configuration: &ctx.configuration,
            endpoint: &ctx.endpoint,
            credentials_provider: &ctx.provider,
            signer: &ctx.signer,
            http_caller: &caller,
            disabled: &ctx.disabled,
        };
        let err = execute(&pipeline_ctx, &request, Method::GET, Some(&token)).unwrap_err();
        assert_eq!(err.code(), "Cancelled");
        assert_eq!(caller.calls(), 0);
    }
}
