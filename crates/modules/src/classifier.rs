//! The `Classifier` trait and the built-in keyword/regex implementation.
//!
//! A real deployment could register an LLM-backed classifier under a
//! different name; the built-in keyword classifier exists so the engine
//! has a working default without requiring one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use thinksuit_core::fact::Fact;
use thinksuit_core::thread::Thread;

/// Anything that can turn a thread into a set of signal facts.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, thread: &Thread) -> Vec<Fact>;
}

/// A single keyword/regex rule: if `pattern` matches the text under
/// inspection, emit `(dimension, signal)` at `confidence`.
pub struct KeywordRule {
    pub dimension: String,
    pub signal: String,
    pub pattern: Regex,
    pub confidence: f64,
}

/// Matches each configured rule's pattern against the latest user message.
/// Multiple rules may fire; each becomes its own `Fact`.
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    /// The default rule set shipped with the built-in module: detects an
    /// explicit request to run a tool, and an urgency marker.
    pub fn default_rules() -> Self {
        Self::new(vec![
            KeywordRule {
                dimension: "task".into(),
                signal: "tool_request".into(),
                pattern: Regex::new(r"(?i)\b(run|execute|call|use)\b.{0,20}\b(tool|command|script)\b")
                    .expect("static pattern compiles"),
                confidence: 0.75,
            },
            KeywordRule {
                dimension: "tone".into(),
                signal: "urgent".into(),
                pattern: Regex::new(r"(?i)\b(urgent|asap|immediately|right now)\b")
                    .expect("static pattern compiles"),
                confidence: 0.6,
            },
        ])
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, thread: &Thread) -> Vec<Fact> {
        let text = thread
            .messages()
            .iter()
            .rev()
            .find(|m| matches!(m.role, thinksuit_core::thread::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("");

        self.rules
            .iter()
            .filter(|rule| rule.pattern.is_match(text))
            .map(|rule| Fact {
                fact_type: "signal".into(),
                dimension: Some(rule.dimension.clone()),
                signal: Some(rule.signal.clone()),
                name: None,
                confidence: rule.confidence,
            })
            .collect()
    }
}

/// A classifier that never fires, used when a module declares no
/// classifier dimensions.
pub struct NullClassifier;

#[async_trait]
impl Classifier for NullClassifier {
    async fn classify(&self, _thread: &Thread) -> Vec<Fact> {
        Vec::new()
    }
}

/// Named classifiers a module can reference from `classifiers.dimensions`.
pub struct ClassifierRegistry {
    classifiers: HashMap<String, Arc<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn with_builtin() -> Self {
        let mut classifiers: HashMap<String, Arc<dyn Classifier>> = HashMap::new();
        classifiers.insert("builtin/keyword".into(), Arc::new(KeywordClassifier::default_rules()));
        classifiers.insert("builtin/null".into(), Arc::new(NullClassifier));
        Self { classifiers }
    }

    pub fn register(&mut self, name: impl Into<String>, classifier: Arc<dyn Classifier>) {
        self.classifiers.insert(name.into(), classifier);
    }

    /// Resolve the classifier a module's `thinksuit/core-chat`-style
    /// `classifiers.dimensions` wiring names, falling back to the null
    /// classifier when the module declares no dimensions or names an
    /// unregistered one.
    pub fn for_module(&self, module: &thinksuit_core::module::Module) -> Arc<dyn Classifier> {
        let Some(name) = module.classifiers.dimensions.values().next() else {
            return Arc::new(NullClassifier);
        };
        self.classifiers
            .get(name)
            .cloned()
            .unwrap_or_else(|| {
                tracing::warn!(classifier = %name, module = %module.key(), "unknown classifier, using null");
                Arc::new(NullClassifier)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinksuit_core::thread::Message;

    fn thread(text: &str) -> Thread {
        Thread(vec![Message::user(text)])
    }

    #[tokio::test]
    async fn keyword_classifier_detects_tool_request() {
        let classifier = KeywordClassifier::default_rules();
        let facts = classifier.classify(&thread("please run a tool to check disk space")).await;
        assert!(facts.iter().any(|f| f.signal.as_deref() == Some("tool_request")));
    }

    #[tokio::test]
    async fn keyword_classifier_detects_urgency() {
        let classifier = KeywordClassifier::default_rules();
        let facts = classifier.classify(&thread("I need this ASAP please")).await;
        assert!(facts.iter().any(|f| f.signal.as_deref() == Some("urgent")));
    }

    #[tokio::test]
    async fn keyword_classifier_silent_on_plain_text() {
        let classifier = KeywordClassifier::default_rules();
        let facts = classifier.classify(&thread("what's the weather like")).await;
        assert!(facts.is_empty());
    }

    #[tokio::test]
    async fn null_classifier_never_fires() {
        let facts = NullClassifier.classify(&thread("run a tool now")).await;
        assert!(facts.is_empty());
    }
}
