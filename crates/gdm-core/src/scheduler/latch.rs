use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot flag guarding run completion.
#[derive(Debug, Default)]
pub struct CompletionLatch(AtomicBool);

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller only.
    pub fn fire(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_fired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fires_once() {
        let l = CompletionLatch::new();
        assert!(l.fire());
        assert!(!l.fire());
        assert!(l.is_fired());
        l.reset();
        assert!(l.fire());
    }

    #[test]
    fn fires_once_across_threads() {
        let l = Arc::new(CompletionLatch::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let l = Arc::clone(&l);
                thread::spawn(move || l.fire())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|w| *w)
            .count();
        assert_eq!(wins, 1);
    }
}
