use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Outcome of one title fallback lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleMatchAttempt<'a> {
    /// Title that was searched for.
    pub title: &'a str,
    /// Item type that was searched.
    pub item_type: &'a str,
    pub matched_item: Option<i64>,
}

/// Observer of topic sync activity.
///
/// Every method has a no-op default so observers implement only what they need.
pub trait SyncObserver: Send + Sync {
    /// Called with the raw webhook body before it is validated.
    fn before_sync(&self, _payload: &Value) {}

    /// Called after each title fallback lookup, whether or not it matched.
    fn after_title_match(&self, _attempt: &TitleMatchAttempt<'_>) {}

    /// Adjust the item type the title fallback searches.
    fn title_match_item_type(&self, item_type: String) -> String {
        item_type
    }
}

/// Registry of sync observers, notified in registration order.
#[derive(Clone, Default)]
pub struct SyncHooks {
    observers: Vec<Arc<dyn SyncObserver>>,
}

impl SyncHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn SyncObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn notify_before_sync(&self, payload: &Value) {
        for observer in &self.observers {
            observer.before_sync(payload);
        }
    }

    pub(crate) fn notify_title_match(&self, attempt: &TitleMatchAttempt<'_>) {
        for observer in &self.observers {
            observer.after_title_match(attempt);
        }
    }

    /// Run the item type through every observer's filter, in order.
    pub(crate) fn filter_title_match_item_type(&self, base: &str) -> String {
        self.observers
            .iter()
            .fold(base.to_string(), |item_type, observer| {
                observer.title_match_item_type(item_type)
            })
    }
}

impl fmt::Debug for SyncHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHooks")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Suffix(&'static str);

    impl SyncObserver for Suffix {
        fn title_match_item_type(&self, item_type: String) -> String {
            format!("{item_type}{}", self.0)
        }
    }

    #[derive(Default)]
    struct Recorder {
        titles: Mutex<Vec<String>>,
    }

    impl SyncObserver for Recorder {
        fn after_title_match(&self, attempt: &TitleMatchAttempt<'_>) {
            self.titles.lock().unwrap().push(attempt.title.to_string());
        }
    }

    #[test]
    fn test_item_type_filters_chain_in_order() {
        let mut hooks = SyncHooks::new();
        assert_eq!(hooks.filter_title_match_item_type("post"), "post");

        hooks.register(Arc::new(Suffix("-a")));
        hooks.register(Arc::new(Suffix("-b")));
        assert_eq!(hooks.filter_title_match_item_type("post"), "post-a-b");
    }

    #[test]
    fn test_default_methods_are_noops() {
        let recorder = Arc::new(Recorder::default());
        let mut hooks = SyncHooks::new();
        hooks.register(recorder.clone());
        hooks.register(Arc::new(Suffix("")));
        assert_eq!(hooks.len(), 2);

        hooks.notify_before_sync(&Value::Null);
        hooks.notify_title_match(&TitleMatchAttempt {
            title: "Foo",
            item_type: "post",
            matched_item: None,
        });

        assert_eq!(*recorder.titles.lock().unwrap(), vec!["Foo".to_string()]);
    }
}
