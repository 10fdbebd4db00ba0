use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    ingest_received: AtomicU64,
    ingest_poison: AtomicU64,
    ingest_invalid: AtomicU64,
    enriched: AtomicU64,
    persisted: AtomicU64,
    persist_retries: AtomicU64,
    persist_failures: AtomicU64,
    published: AtomicU64,
    matches: AtomicU64,
    alerts: AtomicU64,
    capacity_rejections: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_timed_out: AtomicU64,
}

impl Metrics {
    pub fn record_received(&self, count: usize) {
        self.ingest_received.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_poison(&self) {
        self.ingest_poison.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.ingest_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enriched(&self) {
        self.enriched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_retry(&self) {
        self.persist_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_matches(&self, count: usize) {
        self.matches.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_alerts(&self, count: usize) {
        self.alerts.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_timeout(&self) {
        self.tasks_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn capacity_rejections(&self) -> u64 {
        self.capacity_rejections.load(Ordering::Relaxed)
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        let mut counter = |name: &str, value: u64| {
            out.push_str(&format!("# TYPE {name} counter\n{name} {value}\n"));
        };
        counter(
            "vigil_ingest_received_total",
            self.ingest_received.load(Ordering::Relaxed),
        );
        counter(
            "vigil_ingest_poison_total",
            self.ingest_poison.load(Ordering::Relaxed),
        );
        counter(
            "vigil_ingest_invalid_total",
            self.ingest_invalid.load(Ordering::Relaxed),
        );
        counter("vigil_enriched_total", self.enriched.load(Ordering::Relaxed));
        counter("vigil_persisted_total", self.persisted.load(Ordering::Relaxed));
        counter(
            "vigil_persist_retries_total",
            self.persist_retries.load(Ordering::Relaxed),
        );
        counter(
            "vigil_persist_failures_total",
            self.persist_failures.load(Ordering::Relaxed),
        );
        counter("vigil_published_total", self.published.load(Ordering::Relaxed));
        counter("vigil_matches_total", self.matches.load(Ordering::Relaxed));
        counter("vigil_alerts_total", self.alerts.load(Ordering::Relaxed));
        counter(
            "vigil_capacity_rejections_total",
            self.capacity_rejections.load(Ordering::Relaxed),
        );
        counter(
            "vigil_tasks_completed_total",
            self.tasks_completed.load(Ordering::Relaxed),
        );
        counter(
            "vigil_tasks_failed_total",
            self.tasks_failed.load(Ordering::Relaxed),
        );
        counter(
            "vigil_tasks_timed_out_total",
            self.tasks_timed_out.load(Ordering::Relaxed),
        );
        out
    }
}
