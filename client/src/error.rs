use aliyun_oss_http::{ErrorKind as TransportErrorKind, HeaderMap, StatusCode};
use quick_xml::{events::Event, Reader};
use std::{error, fmt, result};

/// OSS 操作结果
pub type ApiResult<T> = result::Result<T, ServiceError>;

/// 请求失败时的状态来源
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorStatus {
    /// 服务端返回的 HTTP 状态码
    Http(StatusCode),

    /// 传输层错误
    Transport(TransportErrorKind),

    /// CRC64 端到端校验不一致
    CrcInconsistent,

    /// 请求未发出，在客户端本地失败
    Client,
}

/// OSS 请求错误
///
/// 服务端错误携带应答中的错误码、描述、RequestId 和 HostId，
/// 本地错误与传输错误由客户端合成对应字段
#[derive(Clone, Debug)]
pub struct ServiceError {
    code: String,
    message: String,
    request_id: String,
    host_id: String,
    status: ErrorStatus,
}

impl ServiceError {
    /// 创建本地错误
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: String::new(),
            host_id: String::new(),
            status: ErrorStatus::Client,
        }
    }

    /// 由传输层错误合成请求错误
    pub fn from_transport(err: &aliyun_oss_http::Error) -> Self {
        Self::new(err.kind().as_str(), err.to_string())
            .with_status(ErrorStatus::Transport(err.kind()))
    }

    #[inline]
    #[must_use]
    pub(crate) fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    #[inline]
    #[must_use]
    pub(crate) fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// 错误码
    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 错误描述
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 服务端分配的请求标识，本地错误时为空
    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// 服务端标识，本地错误时为空
    #[inline]
    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    /// 错误的状态来源
    #[inline]
    pub fn status(&self) -> ErrorStatus {
        self.status
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if !self.request_id.is_empty() {
            write!(f, " (RequestId: {})", self.request_id)?;
        }
        Ok(())
    }
}

impl error::Error for ServiceError {}

enum Envelope {
    Parsed {
        code: String,
        message: String,
        request_id: String,
        host_id: String,
    },
    RootNotError,
    Malformed(String),
}

/// 解析服务端错误应答的 XML 包体
///
/// 根节点必须是 `Error`，缺失的子节点按空字符串处理
fn parse_error_envelope(raw: &str) -> Envelope {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(root)) => {
                if root.name().as_ref() != b"Error" {
                    return Envelope::RootNotError;
                }
                break;
            }
            Ok(Event::Eof) => return Envelope::Malformed("the error response is empty".to_owned()),
            Ok(_) => {}
            Err(err) => return Envelope::Malformed(err.to_string()),
        }
    }

    let mut code = String::new();
    let mut message = String::new();
    let mut request_id = String::new();
    let mut host_id = String::new();
    let mut current: Option<Vec<u8>> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(child)) => current = Some(child.name().as_ref().to_vec()),
            Ok(Event::Text(text)) => {
                if let Some(name) = current.as_deref() {
                    let value = text.unescape().unwrap_or_default().to_string();
                    match name {
                        b"Code" => code = value,
                        b"Message" => message = value,
                        b"RequestId" => request_id = value,
                        b"HostId" => host_id = value,
                        _ => {}
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Envelope::Malformed(err.to_string()),
        }
    }

    Envelope::Parsed {
        code,
        message,
        request_id,
        host_id,
    }
}

pub(crate) fn request_id_of(headers: &HeaderMap) -> String {
    headers
        .get("x-oss-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// 将非 2xx 应答归类为请求错误
///
/// 包体为空时退化为按状态码合成的错误；包体中缺少 RequestId 时从响应头回填
pub(crate) fn classify_error_response(
    status_code: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> ServiceError {
    let mut err = if body.is_empty() {
        ServiceError::new(
            status_code.canonical_reason().unwrap_or("UnknownError"),
            String::new(),
        )
    } else {
        match parse_error_envelope(body) {
            Envelope::Parsed {
                code,
                message,
                request_id,
                host_id,
            } => ServiceError {
                code,
                message,
                request_id,
                host_id,
                status: ErrorStatus::Client,
            },
            Envelope::RootNotError => ServiceError::new(
                "ParseXMLError",
                format!(
                    "Xml format invalid, root node name is not Error. the content is:\n{}",
                    body
                ),
            ),
            Envelope::Malformed(detail) => ServiceError::new("ParseXMLError", detail),
        }
    };

    err.status = ErrorStatus::Http(status_code);
    if err.request_id.is_empty() {
        err.request_id = request_id_of(headers);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliyun_oss_http::HeaderValue;

    const ENVELOPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>NoSuchKey</Code>
  <Message>The specified key does not exist.</Message>
  <RequestId>5C1B138A109F4E405B2D</RequestId>
  <HostId>examplebucket.oss-cn-hangzhou.aliyuncs.com</HostId>
</Error>"#;

    #[test]
    fn test_classify_server_error() {
        let err = classify_error_response(StatusCode::NOT_FOUND, &HeaderMap::new(), ENVELOPE);
        assert_eq!(err.code(), "NoSuchKey");
        assert_eq!(err.message(), "The specified key does not exist.");
        assert_eq!(err.request_id(), "5C1B138A109F4E405B2D");
        assert_eq!(err.host_id(), "examplebucket.oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(err.status(), ErrorStatus::Http(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_classify_missing_children() {
        let err = classify_error_response(
            StatusCode::FORBIDDEN,
            &HeaderMap::new(),
            "<Error><Code>AccessDenied</Code></Error>",
        );
        assert_eq!(err.code(), "AccessDenied");
        assert_eq!(err.message(), "");
        assert_eq!(err.request_id(), "");
    }

    #[test]
    fn test_classify_root_not_error() {
        let err = classify_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &HeaderMap::new(),
            "<NotError><Code>X</Code></NotError>",
        );
        assert_eq!(err.code(), "ParseXMLError");
        assert!(err
            .message()
            .starts_with("Xml format invalid, root node name is not Error. the content is:\n"));
        assert!(err.message().contains("<NotError>"));
    }

    #[test]
    fn test_classify_backfills_request_id_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-oss-request-id",
            HeaderValue::from_static("HEADER-REQ-ID"),
        );
        let err = classify_error_response(
            StatusCode::FORBIDDEN,
            &headers,
            "<Error><Code>AccessDenied</Code></Error>",
        );
        assert_eq!(err.request_id(), "HEADER-REQ-ID");
    }

    #[test]
    fn test_classify_empty_body() {
        let err =
            classify_error_response(StatusCode::SERVICE_UNAVAILABLE, &HeaderMap::new(), "");
        assert_eq!(err.code(), "Service Unavailable");
        assert_eq!(
            err.status(),
            ErrorStatus::Http(StatusCode::SERVICE_UNAVAILABLE)
        );
    }
}
