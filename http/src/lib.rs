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

mod callback;
mod error;
mod request;
mod response;

use assert_impl::assert_impl;
use auto_impl::auto_impl;
pub use callback::{CallbackResult, OnProgressCallback, TransferProgressInfo};
pub use error::{Error, ErrorKind, Result};
pub use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue},
    method::Method,
    status::{InvalidStatusCode, StatusCode},
    uri::{self, Uri},
};
pub use request::{MaybeOwnedBody, Proxy, Request, RequestBody, RequestBuilder, RequestParts};
pub use response::{Response, ResponseBody, ResponseBuilder, ResponseParts};
use std::{
    fmt::Debug,
    io::{Result as IoResult, Seek, SeekFrom},
};

/// HTTP 请求处理函数
///
/// 实现该接口，即可处理 SDK 发送的所有 HTTP 请求
///
/// 调用方保证请求体在 `call` 返回后才会被回收，响应体允许以流的方式返回
#[auto_impl(&, &mut, Box, Arc)]
pub trait HttpCaller: Debug + Send + Sync {
    /// 同步发送 HTTP 请求
    fn call(&self, request: &mut Request<'_>) -> Result<Response>;
}

/// 回卷接口，将数据来源重置到起始位置
pub trait Reset {
    fn reset(&mut self) -> IoResult<()>;
}

impl<T: Seek> Reset for T {
    #[inline]
    fn reset(&mut self) -> IoResult<()> {
        self.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

pub mod prelude {
    pub use super::{HttpCaller, Reset};
}

#[allow(dead_code)]
fn assert() {
    assert_impl!(Send: Request<'static>);
    assert_impl!(Send: Response);
}
