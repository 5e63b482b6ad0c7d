use std::sync::Arc;

use crate::ports::OutputSink;

/// Errors raised while wiring sinks together.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("duplicate sink name={0}")]
    DuplicateSink(String),
}

/// Output sinks keyed by name.
///
/// Every event is handed to each sink in registration order. Names are
/// unique; `register` refuses a name that is already taken.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Register a sink. Names must be unique.
    pub fn register(&mut self, sink: Arc<dyn OutputSink>) -> Result<(), DispatchError> {
        if self.get(sink.name()).is_some() {
            return Err(DispatchError::DuplicateSink(sink.name().to_string()));
        }
        self.sinks.push(sink);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn OutputSink>> {
        self.sinks.iter().find(|s| s.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn OutputSink>> {
        self.sinks.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactEvent, UploadOutcome};
    use async_trait::async_trait;

    struct NamedSink(&'static str);

    #[async_trait]
    impl OutputSink for NamedSink {
        fn name(&self) -> &str {
            self.0
        }

        async fn handle(&self, _event: &ArtifactEvent) -> UploadOutcome {
            UploadOutcome::Uploaded
        }
    }

    #[test]
    fn register_and_get() {
        let mut reg = SinkRegistry::new();
        reg.register(Arc::new(NamedSink("s3:a"))).unwrap();
        reg.register(Arc::new(NamedSink("s3:b"))).unwrap();

        assert!(reg.get("s3:a").is_some());
        assert!(reg.get("missing").is_none());
        assert_eq!(reg.names(), vec!["s3:a".to_string(), "s3:b".to_string()]);
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut reg = SinkRegistry::new();
        for name in ["s3:z", "s3:a", "s3:m"] {
            reg.register(Arc::new(NamedSink(name))).unwrap();
        }
        let order: Vec<&str> = reg.iter().map(|s| s.name()).collect();
        assert_eq!(order, ["s3:z", "s3:a", "s3:m"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = SinkRegistry::new();
        reg.register(Arc::new(NamedSink("s3:a"))).unwrap();
        let err = reg.register(Arc::new(NamedSink("s3:a"))).unwrap_err();
        assert!(err.to_string().contains("s3:a"));
        assert_eq!(reg.len(), 1);
    }
}
