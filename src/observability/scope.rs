//! Begin/complete logging around one operation

use std::time::Instant;

use super::logger::Logger;

/// Logs `<NAME>_BEGIN` on creation and exactly one of `<NAME>_COMPLETE`,
/// `<NAME>_FAILED` or `<NAME>_INCOMPLETE` afterwards. Every line carries the
/// scope's fields; terminal lines add `duration_ms`.
pub struct ObservationScope {
    name: String,
    fields: Vec<(String, String)>,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let scope = Self {
            name: name.into(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            started: Instant::now(),
            finished: false,
        };
        Logger::info(&format!("{}_BEGIN", scope.name), &scope.field_refs());
        scope
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let duration = self.elapsed_ms().to_string();
        let mut fields = self.field_refs();
        fields.extend(extra.iter().copied());
        fields.push(("duration_ms", duration.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        let duration = self.elapsed_ms().to_string();
        let mut fields = self.field_refs();
        fields.push(("reason", reason));
        fields.push(("duration_ms", duration.as_str()));
        Logger::error(&format!("{}_FAILED", self.name), &fields);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            let mut fields = self.field_refs();
            fields.push(("reason", "scope dropped before completion"));
            Logger::warn(&format!("{}_INCOMPLETE", self.name), &fields);
        }
    }
}
