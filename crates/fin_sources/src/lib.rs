use std::sync::Arc;

use fin_core::{SourceAdapter, SourceConfig};

pub mod extract;
pub mod outlets;
pub mod relevance;

pub use outlets::economic_times::EconomicTimesAdapter;
pub use outlets::livemint::LivemintAdapter;
pub use outlets::moneycontrol::MoneycontrolAdapter;

/// Builds the enabled adapters for a configuration. Sources without a known
/// adapter are skipped with a warning rather than failing the run.
pub fn adapters_from_config(sources: &[SourceConfig]) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for source in sources.iter().filter(|s| s.enabled) {
        match source.name.as_str() {
            "Economic Times" => adapters.push(Arc::new(EconomicTimesAdapter::new(source.clone()))),
            "Livemint" => adapters.push(Arc::new(LivemintAdapter::new(source.clone()))),
            "Moneycontrol" => adapters.push(Arc::new(MoneycontrolAdapter::new(source.clone()))),
            other => {
                tracing::warn!(source = other, "no adapter registered for source, skipping");
            }
        }
    }
    adapters
}

pub mod prelude {
    pub use super::adapters_from_config;
    pub use fin_core::{Article, Result, SourceAdapter};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapters_from_default_config() {
        let adapters = adapters_from_config(&SourceConfig::defaults());
        let names: Vec<&str> = adapters.iter().map(|a| a.source_name()).collect();
        assert_eq!(names, vec!["Economic Times", "Livemint", "Moneycontrol"]);
    }

    #[test]
    fn test_disabled_and_unknown_sources_skipped() {
        let mut sources = SourceConfig::defaults();
        sources[0].enabled = false;
        sources.push(SourceConfig {
            name: "Unknown Outlet".to_string(),
            ..SourceConfig::default()
        });
        let adapters = adapters_from_config(&sources);
        assert_eq!(adapters.len(), 2);
    }
}
