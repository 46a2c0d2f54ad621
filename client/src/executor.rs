use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;

/// 协作式取消令牌
///
/// 任务在每个数据块边界检查该令牌，被取消的任务以 `Cancelled` 错误收尾
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// 请求取消关联的任务
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 执行器已经关闭
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("The executor has been shut down")]
pub struct ExecutorShutDown;

/// 异步任务执行器
///
/// 持有固定数量的工作线程。关闭后提交任务会失败，
/// 已经提交的任务仍会执行完毕，执行器销毁时等待全部任务结束
#[derive(Debug)]
pub struct Executor {
    pool: ThreadPool,
    shut_down: AtomicBool,
}

impl Executor {
    /// 创建执行器，`num_threads` 为工作线程数量
    pub fn new(num_threads: usize) -> Self {
        Self {
            pool: ThreadPoolBuilder::new()
                .thread_name(|index| format!("aliyun_oss_client_thread_{}", index))
                .num_threads(num_threads.max(1))
                .build()
                .unwrap(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// 提交任务到执行器
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<(), ExecutorShutDown> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ExecutorShutDown);
        }
        self.pool.spawn(task);
        Ok(())
    }

    /// 关闭执行器
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        debug!("executor shut down, pending tasks will still be drained");
    }

    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
