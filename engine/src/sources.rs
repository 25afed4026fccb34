//! Pull source registry for NOUTO
//!
//! Maps pull codes to sources, and metric names to pull codes. Populated
//! once from the sources handed to the hub builder and read-only for the
//! process lifetime, so lookups need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use nouto_core::{PullCode, PullSource};
use tracing::{info, warn};

/// Registry of pull sources
///
/// Read-only container built at engine construction. A source registers
/// for exactly one [`PullCode`]; its declared metric names feed the fixed
/// name→code table used by [`code_for`](SourceRegistry::code_for).
pub struct SourceRegistry {
    /// Sources keyed by pull code
    by_code: HashMap<PullCode, Arc<dyn PullSource>>,
    /// Metric name → pull code (case-sensitive exact match)
    by_name: HashMap<&'static str, PullCode>,
}

impl SourceRegistry {
    /// Build the registry from a fixed set of sources.
    ///
    /// Each source auto-registers under its `code()` and all of its
    /// `metric_names()`. A duplicate code or name keeps the first
    /// registration and logs a warning — construction never fails.
    pub fn new(sources: Vec<Arc<dyn PullSource>>) -> Self {
        let mut by_code: HashMap<PullCode, Arc<dyn PullSource>> = HashMap::new();
        let mut by_name: HashMap<&'static str, PullCode> = HashMap::new();

        for source in sources {
            let code = source.code();
            if by_code.contains_key(&code) {
                warn!(
                    source = source.name(),
                    code = %code,
                    "Duplicate pull code, keeping first registration"
                );
                continue;
            }

            info!(
                source = source.name(),
                code = %code,
                names = ?source.metric_names(),
                "Registered pull source"
            );

            for &name in source.metric_names() {
                if by_name.contains_key(name) {
                    warn!(
                        source = source.name(),
                        name, "Duplicate metric name, keeping first registration"
                    );
                    continue;
                }
                by_name.insert(name, code);
            }

            by_code.insert(code, source);
        }

        Self { by_code, by_name }
    }

    /// Look up the source for a pull code.
    ///
    /// Unknown codes resolve to `None`; the pull invoker turns that into
    /// an empty batch, never an error.
    pub fn resolve(&self, code: PullCode) -> Option<&Arc<dyn PullSource>> {
        self.by_code.get(&code)
    }

    /// Translate a metric name to its pull code.
    ///
    /// Pure function of the fixed table: same name always yields the same
    /// code, unknown names always yield `None`. Case-sensitive, O(1).
    pub fn code_for(&self, name: &str) -> Option<PullCode> {
        self.by_name.get(name).copied()
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// True if no sources are registered
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
