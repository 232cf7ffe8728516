use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Identity of one caller session (one `Handle`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId {
    id: i64,
}

impl SessionId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.id)
    }
}

/// Position of a waiter in an `AsyncQueue`
pub type JobId = i64;

/// Thread-safe ID generator
#[derive(Debug)]
pub struct IdGen {
    next_id: AtomicI64,
}

impl IdGen {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
        }
    }

    /// Get the next unique ID
    pub fn get_next(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the next unique session ID
    pub fn next_session(&self) -> SessionId {
        SessionId::new(self.get_next())
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let idgen = IdGen::new();
        assert_eq!(idgen.get_next(), 1);
        assert_eq!(idgen.get_next(), 2);
        assert_eq!(idgen.next_session(), SessionId::new(3));
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let idgen = Arc::new(IdGen::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let idgen = Arc::clone(&idgen);
                std::thread::spawn(move || (0..100).map(|_| idgen.get_next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for id in worker.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 400);
    }

    #[test]
    fn test_session_display() {
        assert_eq!(SessionId::new(7).to_string(), "session#7");
    }
}
