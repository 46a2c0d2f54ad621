use crate::{executor::CancellationToken, rate_limit::RateLimiter};
use aliyun_oss_crc64::Crc64;
use aliyun_oss_http::{
    OnProgressCallback, RequestBody, ResponseBody, TransferProgressInfo,
};
use md5::{Digest, Md5};
use std::{
    fmt,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write},
    sync::Arc,
};

pub(crate) const TRANSFER_BUFFER_SIZE: usize = 8 * 1024;

pub(crate) fn cancelled_error() -> IoError {
    IoError::new(IoErrorKind::Interrupted, "the request was cancelled")
}

/// 确定请求体长度
///
/// 可定位的请求体直接取长度；不可定位的输入流读入内存缓冲后替换，
/// 保证 Content-Length 一定可以给出
pub(crate) fn ensure_sized_body(body: RequestBody) -> IoResult<(RequestBody, u64)> {
    match body.size_hint() {
        Some(size) => Ok((body, size)),
        None => {
            let mut body = body;
            let mut buffer = Vec::new();
            body.read_to_end(&mut buffer)?;
            let size = buffer.len() as u64;
            Ok((RequestBody::from_bytes(buffer), size))
        }
    }
}

/// 计算请求体的 Content-MD5，读取完成后回卷到起始位置
pub(crate) fn content_md5(body: &mut RequestBody) -> IoResult<String> {
    let mut hasher = Md5::new();
    let mut buffer = [0u8; TRANSFER_BUFFER_SIZE];
    loop {
        let have_read = body.read(&mut buffer)?;
        if have_read == 0 {
            break;
        }
        Digest::update(&mut hasher, &buffer[..have_read]);
    }
    body.reset()?;
    Ok(base64::encode(hasher.finalize()))
}

/// 请求体读取适配器
///
/// 传输层读取数据的同一趟完成计数、CRC64、限速、进度回调与取消检查
pub(crate) struct TransferBody<'a> {
    inner: &'a mut RequestBody,
    total: Option<u64>,
    transferred: u64,
    crc: Option<Crc64>,
    progress: Option<OnProgressCallback>,
    limiter: Option<Arc<dyn RateLimiter>>,
    cancel: Option<CancellationToken>,
}

impl<'a> TransferBody<'a> {
    pub(crate) fn new(inner: &'a mut RequestBody, total: Option<u64>) -> Self {
        Self {
            inner,
            total,
            transferred: 0,
            crc: None,
            progress: None,
            limiter: None,
            cancel: None,
        }
    }

    #[must_use]
    pub(crate) fn with_crc64(mut self, enabled: bool) -> Self {
        self.crc = if enabled { Some(Crc64::new()) } else { None };
        self
    }

    #[must_use]
    pub(crate) fn with_progress(mut self, progress: Option<OnProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub(crate) fn with_limiter(mut self, limiter: Option<Arc<dyn RateLimiter>>) -> Self {
        self.limiter = limiter;
        self
    }

    #[must_use]
    pub(crate) fn with_cancellation(mut self, cancel: Option<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// 已经计算出的请求体 CRC64 值，未启用时为 `None`
    pub(crate) fn crc64(&self) -> Option<u64> {
        self.crc.as_ref().map(Crc64::value)
    }

    pub(crate) fn transferred_bytes(&self) -> u64 {
        self.transferred
    }
}

impl fmt::Debug for TransferBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TransferBody")
            .field("total", &self.total)
            .field("transferred", &self.transferred)
            .finish()
    }
}

impl Read for TransferBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        if let Some(cancel) = self.cancel.as_ref() {
            if cancel.is_cancelled() {
                return Err(cancelled_error());
            }
        }
        let have_read = self.inner.read(buf)?;
        if have_read > 0 {
            // 放行数据块之前先取得限速许可
            if let Some(limiter) = self.limiter.as_deref() {
                limiter.acquire(have_read);
            }
            if let Some(crc) = self.crc.as_mut() {
                aliyun_oss_crc64::Update::update(crc, &buf[..have_read]);
            }
            self.transferred += have_read as u64;
            if let Some(on_progress) = self.progress.as_ref() {
                let info =
                    TransferProgressInfo::new(self.transferred, self.total, &buf[..have_read]);
                if on_progress(&info).is_cancelled() {
                    return Err(cancelled_error());
                }
            }
        }
        Ok(have_read)
    }
}

/// 响应体落盘参数
pub(crate) struct ResponseDrain<'a> {
    pub(crate) crc: Option<&'a mut Crc64>,
    pub(crate) progress: Option<&'a OnProgressCallback>,
    pub(crate) limiter: Option<&'a Arc<dyn RateLimiter>>,
    pub(crate) cancel: Option<&'a CancellationToken>,
    pub(crate) total: Option<u64>,
}

impl ResponseDrain<'_> {
    /// 将响应体逐块写入接收目标，返回写入的字节数
    pub(crate) fn copy(
        mut self,
        body: &mut ResponseBody,
        sink: &mut dyn Write,
    ) -> IoResult<u64> {
        let mut buffer = [0u8; TRANSFER_BUFFER_SIZE];
        let mut transferred = 0u64;
        loop {
            if let Some(cancel) = self.cancel {
                if cancel.is_cancelled() {
                    return Err(cancelled_error());
                }
            }
            let have_read = body.read(&mut buffer)?;
            if have_read == 0 {
                break;
            }
            if let Some(limiter) = self.limiter {
                limiter.acquire(have_read);
            }
            sink.write_all(&buffer[..have_read])?;
            if let Some(crc) = self.crc.as_deref_mut() {
                aliyun_oss_crc64::Update::update(crc, &buffer[..have_read]);
            }
            transferred += have_read as u64;
            if let Some(on_progress) = self.progress {
                let info = TransferProgressInfo::new(transferred, self.total, &buffer[..have_read]);
                if on_progress(&info).is_cancelled() {
                    return Err(cancelled_error());
                }
            }
        }
        Ok(transferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliyun_oss_crc64::crc64_of;
    use aliyun_oss_http::CallbackResult;
    use std::{
        io::Cursor,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    #[test]
    fn test_ensure_sized_body_drains_unseekable_reader() -> IoResult<()> {
        let body = RequestBody::from_reader(Cursor::new(b"payload".to_vec()));
        assert_eq!(body.size_hint(), None);
        let (mut body, size) = ensure_sized_body(body)?;
        assert_eq!(size, 7);
        assert!(body.is_rewindable());
        let mut read_back = String::new();
        body.read_to_string(&mut read_back)?;
        assert_eq!(read_back, "payload");
        Ok(())
    }

    #[test]
    fn test_content_md5_known_vector() -> IoResult<()> {
        let mut body = RequestBody::from_bytes(b"0123456789".to_vec());
        assert_eq!(content_md5(&mut body)?, "eB5eJF1ptWaXm4bijSPyxw==");
        // 计算后回卷,再次读取仍然得到全部数据
        let mut read_back = Vec::new();
        body.read_to_end(&mut read_back)?;
        assert_eq!(read_back, b"0123456789");
        Ok(())
    }

    #[test]
    fn test_transfer_body_computes_crc_and_progress() -> IoResult<()> {
        let mut inner = RequestBody::from_bytes(b"123456789".to_vec());
        let progress_calls = Arc::new(AtomicUsize::new(0));
        let seen_totals = Arc::new(Mutex::new(Vec::new()));
        let callback: OnProgressCallback = {
            let progress_calls = progress_calls.clone();
            let seen_totals = seen_totals.clone();
            Arc::new(move |info| {
                progress_calls.fetch_add(1, Ordering::SeqCst);
                seen_totals
                    .lock()
                    .unwrap()
                    .push((info.transferred_bytes(), info.total_bytes()));
                CallbackResult::Continue
            })
        };

        let mut transfer = TransferBody::new(&mut inner, Some(9))
            .with_crc64(true)
            .with_progress(Some(callback));
        let mut sink = Vec::new();
        std::io::copy(&mut transfer, &mut sink)?;

        assert_eq!(sink, b"123456789");
        assert_eq!(transfer.transferred_bytes(), 9);
        assert_eq!(transfer.crc64(), Some(crc64_of(b"123456789")));
        assert!(progress_calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(seen_totals.lock().unwrap().last(), Some(&(9u64, Some(9u64))));
        Ok(())
    }

    #[test]
    fn test_transfer_body_observes_cancellation() {
        let mut inner = RequestBody::from_bytes(b"data".to_vec());
        let token = CancellationToken::new();
        token.cancel();
        let mut transfer = TransferBody::new(&mut inner, None).with_cancellation(Some(token));
        let mut buffer = [0u8; 16];
        let err = transfer.read(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), IoErrorKind::Interrupted);
    }

    #[test]
    fn test_progress_callback_can_cancel_transfer() {
        let mut inner = RequestBody::from_bytes(b"data".to_vec());
        let callback: OnProgressCallback = Arc::new(|_| CallbackResult::Cancel);
        let mut transfer = TransferBody::new(&mut inner, None).with_progress(Some(callback));
        let mut buffer = [0u8; 16];
        assert!(transfer.read(&mut buffer).is_err());
    }

    #[test]
    fn test_response_drain_computes_crc() -> IoResult<()> {
        let mut body = ResponseBody::from_bytes(b"hello world".to_vec());
        let mut sink = Cursor::new(Vec::new());
        let mut crc = Crc64::new();
        let transferred = ResponseDrain {
            crc: Some(&mut crc),
            progress: None,
            limiter: None,
            cancel: None,
            total: Some(11),
        }
        .copy(&mut body, &mut sink)?;
        assert_eq!(transferred, 11);
        assert_eq!(crc.value(), crc64_of(b"hello world"));
        assert_eq!(sink.into_inner(), b"hello world");
        Ok(())
    }

    #[test]
    fn test_response_drain_observes_cancellation() {
        let mut body = ResponseBody::from_bytes(b"hello world".to_vec());
        let mut sink = Vec::new();
        let token = CancellationToken::new();
        token.cancel();
        let err = ResponseDrain {
            crc: None,
            progress: None,
            limiter: None,
            cancel: Some(&token),
            total: None,
        }
        .copy(&mut body, &mut sink)
        .unwrap_err();
        assert_eq!(err.kind(), IoErrorKind::Interrupted);
    }
}
