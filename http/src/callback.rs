use smart_default::SmartDefault;
use std::sync::Arc;

/// 数据传输进度信息
pub struct TransferProgressInfo<'b> {
    transferred_bytes: u64,
    total_bytes: Option<u64>,
    body: &'b [u8],
}

impl<'b> TransferProgressInfo<'b> {
    /// 创建数据传输进度信息
    ///
    /// `total_bytes` 为 `None` 表示总量未知
    #[inline]
    pub fn new(transferred_bytes: u64, total_bytes: Option<u64>, body: &'b [u8]) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
            body,
        }
    }

    /// 获取已传输的数据量，单位为字节
    #[inline]
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// 获取总共需要传输的数据量，单位为字节
    #[inline]
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// 获取当前传输的数据块
    #[inline]
    pub fn body(&self) -> &[u8] {
        self.body
    }
}

/// 进度回调函数的返回值，决定传输是否继续
#[must_use]
#[derive(SmartDefault, Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum CallbackResult {
    #[default]
    Continue,

    Cancel,
}

impl CallbackResult {
    #[inline]
    pub fn is_continue(self) -> bool {
        self == Self::Continue
    }

    #[inline]
    pub fn is_cancelled(self) -> bool {
        self == Self::Cancel
    }
}

/// 进度回调函数
pub type OnProgressCallback =
    Arc<dyn Fn(&TransferProgressInfo<'_>) -> CallbackResult + Send + Sync>;
