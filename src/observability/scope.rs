//! ObservationScope for paired begin/complete logging
//!
//! - `{name}_BEGIN` on creation
//! - `{name}_COMPLETE` with `elapsed_ms` on success
//! - `{name}_FAILED` on explicit failure
//! - `{name}_INCOMPLETE` if dropped without either

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs the start and end of one unit of work.
///
/// ```ignore
/// let scope = ObservationScope::with_fields("CYCLE", &[("patron", "Alice")]);
/// // ... record snapshot, detect transitions ...
/// scope.complete_with_fields(&[("transitions", "3")]);
/// ```
pub struct ObservationScope {
    name: &'static str,
    completed: bool,
    fields: Vec<(&'static str, String)>,
    timer: Timer,
}

impl ObservationScope {
    /// Fields given here are repeated on every line the scope emits.
    pub fn with_fields(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            completed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
        }
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.completed = true;
        let elapsed = self.timer.elapsed_ms();

        let mut all_fields = self.field_refs();
        all_fields.push(("elapsed_ms", elapsed.as_str()));
        all_fields.extend(extra_fields.iter().copied());

        Logger::info(&format!("{}_COMPLETE", self.name), &all_fields);
    }

    /// Logs `{name}_FAILED` at ERROR, or FATAL when `fatal` is set.
    pub fn fail(mut self, code: &str, reason: &str, fatal: bool) {
        self.completed = true;

        let mut all_fields = self.field_refs();
        all_fields.push(("code", code));
        all_fields.push(("reason", reason));

        let event = format!("{}_FAILED", self.name);
        if fatal {
            Logger::fatal(&event, &all_fields);
        } else {
            Logger::error(&event, &all_fields);
        }
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            let mut fields = self.field_refs();
            fields.push(("reason", "scope dropped without completion"));
            Logger::warn(&format!("{}_INCOMPLETE", self.name), &fields);
        }
    }
}

/// Wall-clock timer for `elapsed_ms` fields
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_keeps_its_fields() {
        let scope = ObservationScope::with_fields("CYCLE", &[("patron", "Alice")]);
        assert!(!scope.completed);
        assert_eq!(scope.field_refs(), vec![("patron", "Alice")]);
        scope.complete();
    }

    #[test]
    fn test_scope_complete_with_extra_fields() {
        let scope = ObservationScope::with_fields("RETENTION", &[]);
        scope.complete_with_fields(&[("rows", "4")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::with_fields("CYCLE", &[("patron", "Bob")]);
        scope.fail("SHELF_STORAGE_WRITE_FAILED", "disk full", false);
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::with_fields("CYCLE", &[]);
        drop(scope);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 10);
    }
}
