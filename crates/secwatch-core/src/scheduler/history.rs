use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// Bounded record of notified titles, oldest evicted first
#[derive(Debug)]
pub struct DedupHistory {
    capacity: usize,
    order: VecDeque<String>,
    titles: HashSet<String>,
}

impl DedupHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            titles: HashSet::with_capacity(capacity),
        }
    }

    pub fn is_new(&self, title: &str) -> bool {
        !self.titles.contains(title)
    }

    /// Insert a title. Recording a title already present is a no-op.
    pub fn record(&mut self, title: &str) {
        if !self.titles.insert(title.to_string()) {
            return;
        }
        self.order.push_back(title.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.titles.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// History handle shared by every poll worker
#[derive(Debug, Clone)]
pub struct SharedHistory {
    inner: Arc<Mutex<DedupHistory>>,
}

impl SharedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DedupHistory::new(capacity))),
        }
    }

    /// Test and insert under one lock. Of several callers racing on the
    /// same title, exactly one gets `true`.
    pub fn check_and_record(&self, title: &str) -> bool {
        let mut history = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if history.is_new(title) {
            history.record(title);
            true
        } else {
            false
        }
    }

    pub fn is_new(&self, title: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_new(title)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
