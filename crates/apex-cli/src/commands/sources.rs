use apex_core::{BudgetSnapshot, DataType, ProviderId, Sport};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

use super::Context;

#[derive(Debug, Serialize)]
struct SourceStatus {
    provider: ProviderId,
    priority: usize,
    timeout_ms: u64,
    credential_configured: bool,
    supports: Vec<SportSupport>,
    budget: Option<BudgetSnapshot>,
}

#[derive(Debug, Serialize)]
struct SportSupport {
    sport: Sport,
    data_types: Vec<DataType>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceStatus>,
}

pub fn run(context: &Context) -> Result<Value, CliError> {
    let orchestrator = &context.orchestrator;
    let mut sources = Vec::with_capacity(orchestrator.priority().len());

    for (index, provider) in orchestrator.priority().iter().copied().enumerate() {
        let adapter = orchestrator.registry().get(provider)?;
        let settings = context.config.provider(provider);

        let supports = Sport::ALL
            .into_iter()
            .filter_map(|sport| {
                let data_types: Vec<DataType> = DataType::ALL
                    .into_iter()
                    .filter(|data_type| adapter.supports(sport, *data_type))
                    .collect();
                (!data_types.is_empty()).then_some(SportSupport { sport, data_types })
            })
            .collect();

        sources.push(SourceStatus {
            provider,
            priority: index + 1,
            timeout_ms: settings
                .map(|settings| u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or_default(),
            credential_configured: settings
                .and_then(|settings| settings.api_key.as_deref())
                .is_some_and(|key| !key.is_empty()),
            supports,
            budget: orchestrator.limiter().snapshot(provider),
        });
    }

    Ok(serde_json::to_value(SourcesResponseData { sources })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_sources_follow_priority_with_capabilities() {
        let context = Context::build(true).expect("mock context");
        let document = run(&context).expect("sources listed");
        let sources = document["sources"].as_array().expect("array");

        assert_eq!(sources.len(), 4);
        assert_eq!(sources[0]["provider"], "espn");
        assert_eq!(sources[0]["priority"], 1);
        assert_eq!(sources[0]["credential_configured"], false);
        assert_eq!(sources[0]["budget"]["minute_used"], 0);

        let balldontlie = &sources[1];
        assert_eq!(balldontlie["provider"], "balldontlie");
        assert_eq!(balldontlie["supports"].as_array().map(Vec::len), Some(1));
        assert_eq!(balldontlie["supports"][0]["sport"], "basketball");

        let oddsapi = &sources[3];
        assert_eq!(oddsapi["supports"][0]["data_types"], serde_json::json!(["games", "odds"]));
    }
}
