/// Content classification: tiered MIME detection.
///
/// 1. **Extension guess**: always computed, free.
/// 2. **Deep sniff**: only for files at or below the size threshold whose
///    guess is missing or too generic to be useful (or when forced).
///
/// Classification never fails: a deep-engine error degrades to the
/// extension guess (or [`UNKNOWN`]) and is handed back to the caller for
/// the error log.
pub mod deep;
pub mod extension;

pub use deep::{DeepClassifier, DeepEngine, NoDeepClassifier, SignatureSniffer};
pub use extension::guess_mime;

use crate::error::FailureCause;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Returned when neither tier produced a type.
pub const UNKNOWN: &str = "unknown";
/// Large files with an unknown extension.
pub const GENERIC_BINARY: &str = "application/octet-stream";
/// Fifos, sockets and devices. Never opened for sniffing.
pub const SPECIAL_FILE: &str = "inode/x-special";

/// Guesses that say too little to stop at the extension tier.
const TOO_GENERIC: [&str; 2] = [GENERIC_BINARY, "text/plain"];

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub content_type: String,
    /// `true` when the type came from the deep engine.
    pub deep: bool,
    /// Set when the deep engine failed and the result was degraded.
    pub failure: Option<(FailureCause, String)>,
}

impl Classification {
    fn shallow(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            deep: false,
            failure: None,
        }
    }
}

/// Tiered classifier shared by every scan worker.
pub struct Classifier {
    engine: Box<dyn DeepClassifier>,
    deep_scanned: AtomicU64,
}

impl Classifier {
    pub fn new(engine: Box<dyn DeepClassifier>) -> Self {
        Self {
            engine,
            deep_scanned: AtomicU64::new(0),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Number of successful deep-engine identifications so far.
    pub fn deep_scanned(&self) -> u64 {
        self.deep_scanned.load(Ordering::Relaxed)
    }

    /// Classify a regular file of `size` bytes.
    ///
    /// Files larger than `threshold` are never opened unless `force_deep` is set.
    pub fn classify(
        &self,
        path: &Path,
        size: u64,
        threshold: u64,
        force_deep: bool,
    ) -> Classification {
        let guess = guess_mime(path);

        if size > threshold && !force_deep {
            return Classification::shallow(guess.unwrap_or(GENERIC_BINARY));
        }
        if size == 0 {
            return Classification::shallow(guess.unwrap_or(UNKNOWN));
        }

        let escalate = force_deep || guess.map_or(true, |g| TOO_GENERIC.contains(&g));
        if !escalate {
            return Classification::shallow(guess.unwrap_or(UNKNOWN));
        }

        match self.engine.identify(path) {
            Ok(Some(content_type)) => {
                self.deep_scanned.fetch_add(1, Ordering::Relaxed);
                Classification {
                    content_type,
                    deep: true,
                    failure: None,
                }
            }
            Ok(None) => Classification::shallow(guess.unwrap_or(UNKNOWN)),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Deep classification failed");
                Classification {
                    failure: Some((FailureCause::from(&err), err.to_string())),
                    ..Classification::shallow(guess.unwrap_or(UNKNOWN))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    /// Engine that records every invocation and answers with a fixed result.
    struct CountingEngine {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl DeepClassifier for CountingEngine {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn identify(&self, _path: &Path) -> io::Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            } else {
                Ok(Some("application/x-deep".to_string()))
            }
        }
    }

    fn classifier(fail: bool) -> (Classifier, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = CountingEngine {
            calls: calls.clone(),
            fail,
        };
        (Classifier::new(Box::new(engine)), calls)
    }

    #[test]
    fn above_threshold_never_goes_deep() {
        let (c, calls) = classifier(false);
        let r = c.classify(Path::new("blob"), 101, 100, false);
        assert_eq!(r.content_type, GENERIC_BINARY);
        let r = c.classify(Path::new("notes.txt"), 101, 100, false);
        assert_eq!(r.content_type, "text/plain");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.deep_scanned(), 0);
    }

    #[test]
    fn force_deep_overrides_threshold() {
        let (c, calls) = classifier(false);
        let r = c.classify(Path::new("photo.png"), 10_000, 100, true);
        assert!(r.deep);
        assert_eq!(r.content_type, "application/x-deep");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.deep_scanned(), 1);
    }

    #[test]
    fn empty_file_uses_extension_only() {
        let (c, calls) = classifier(false);
        assert_eq!(
            c.classify(Path::new("a.json"), 0, 100, true).content_type,
            "application/json"
        );
        assert_eq!(c.classify(Path::new("a"), 0, 100, false).content_type, UNKNOWN);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn specific_guess_skips_deep_but_generic_escalates() {
        let (c, calls) = classifier(false);
        assert_eq!(
            c.classify(Path::new("x.png"), 10, 100, false).content_type,
            "image/png"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let r = c.classify(Path::new("x.txt"), 10, 100, false);
        assert!(r.deep);
        let r = c.classify(Path::new("Makefile"), 10, 100, false);
        assert!(r.deep);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.deep_scanned(), 2);
    }

    #[test]
    fn engine_failure_degrades_without_counting() {
        let (c, calls) = classifier(true);
        let r = c.classify(Path::new("x.txt"), 10, 100, false);
        assert_eq!(r.content_type, "text/plain");
        assert!(!r.deep);
        assert_eq!(
            r.failure.as_ref().map(|(cause, _)| *cause),
            Some(FailureCause::PermissionDenied)
        );

        let r = c.classify(Path::new("noext"), 10, 100, false);
        assert_eq!(r.content_type, UNKNOWN);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.deep_scanned(), 0);
    }

    #[test]
    fn extension_only_engine_keeps_guess() {
        let c = Classifier::new(DeepEngine::None.select());
        assert_eq!(c.classify(Path::new("raw"), 10, 100, false).content_type, UNKNOWN);
        assert_eq!(c.deep_scanned(), 0);
        assert_eq!(c.engine_name(), "none");
    }
}
