use std::cell::Cell;
use std::time::Instant;

thread_local! {
    static PERF_DEPTH: Cell<u32> = Cell::new(0);
}

/// 性能统计 Guard：记录 elapsed_ms + 处理条目数
///
/// 使用方式：
/// ```ignore
/// let mut perf = inspection_assign::perf::PerfGuard::new("solve");
/// // do work...
/// perf.set_items(lots.len());
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    items: usize,
    depth: u32,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        let depth = PERF_DEPTH.with(|d| {
            let next = d.get().saturating_add(1);
            d.set(next);
            next
        });
        Self {
            op,
            start: Instant::now(),
            items: 0,
            depth,
        }
    }

    pub fn set_items(&mut self, items: usize) {
        self.items = items;
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            items = self.items,
            depth = self.depth,
            "done"
        );

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
