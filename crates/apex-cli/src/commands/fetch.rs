use serde_json::Value;

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::{parse_request, Context};

pub async fn run(args: &FetchArgs, context: &Context) -> Result<Value, CliError> {
    let request = parse_request(&args.request)?.with_force_refresh(args.force_refresh);
    tracing::debug!(cache_key = %request.cache_key(), "fetch requested");

    let response = context.orchestrator.execute(&request).await?;
    Ok(serde_json::to_value(response)?)
}
