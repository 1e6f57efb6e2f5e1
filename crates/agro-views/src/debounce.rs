//! 單槽防抖計時器

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// 單槽防抖計時器
///
/// 每次 `schedule` 都會取代尚未觸發的工作；已觸發（正在執行）的工作不會被中斷。
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 在閒置 `delay` 後執行工作（需在 tokio runtime 內呼叫）
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                trace!(ticket, "防抖工作已被取代");
                return;
            }
            task.await;
        }));
    }

    /// 取消尚未觸發的工作
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending = None;
    }

    /// 是否有尚未完成的工作
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// 取出最近一次排程的工作控制代碼
    pub fn take_pending(&mut self) -> Option<JoinHandle<()>> {
        self.pending.take()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::Instant;

    fn counter_task(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_once_after_idle() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        let started = Instant::now();

        debouncer.schedule(counter_task(&counter));
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.schedule(counter_task(&counter));
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.schedule(counter_task(&counter));

        debouncer.take_pending().unwrap().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1800) && elapsed < Duration::from_millis(1810));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_firing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));

        debouncer.schedule(counter_task(&counter));
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_task_is_not_interrupted() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        let slow = {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        };
        debouncer.schedule(slow);
        let first = debouncer.take_pending().unwrap();

        // 第一個工作已開始執行後再排程
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule(counter_task(&counter));

        first.await.unwrap();
        debouncer.take_pending().unwrap().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
