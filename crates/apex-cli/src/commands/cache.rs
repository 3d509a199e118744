use serde_json::{json, Value};

use crate::cli::{CacheCommand, RequestArgs};
use crate::error::CliError;

use super::{parse_request, Context};

pub async fn run(command: &CacheCommand, context: &Context) -> Result<Value, CliError> {
    let cache = context.orchestrator.cache();
    match command {
        CacheCommand::Stats => Ok(serde_json::to_value(cache.stats().await)?),
        CacheCommand::Clear => {
            let removed = cache.clear().await?;
            tracing::info!(removed, "cache cleared");
            Ok(json!({ "removed": removed }))
        }
        CacheCommand::Delete { key } => {
            let deleted = cache.delete(key).await?;
            Ok(json!({ "key": key, "deleted": deleted }))
        }
        CacheCommand::Sweep => {
            let removed = cache.sweep_expired().await?;
            Ok(json!({ "removed": removed }))
        }
        CacheCommand::Key(request) => key(request),
    }
}

pub fn key(args: &RequestArgs) -> Result<Value, CliError> {
    let request = parse_request(args)?;
    Ok(json!({ "cache_key": request.cache_key() }))
}
