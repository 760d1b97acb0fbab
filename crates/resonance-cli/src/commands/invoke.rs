//! One-shot command invocation against freshly loaded plugins.

use clap::Args;
use serde_json::Value;

use resonance_core::config::AppConfig;
use resonance_core::error::AppError;
use resonance_plugin::registry::commands::CommandContext;

use crate::output;

/// Arguments for `invoke`
#[derive(Debug, Args)]
pub struct InvokeArgs {
    /// Command name, e.g. `example.hello`
    pub command: String,

    /// Positional arguments. Each is parsed as JSON when possible,
    /// otherwise passed as a string.
    pub args: Vec<String>,

    /// Player the command targets
    #[arg(short, long)]
    pub player: Option<String>,
}

/// Execute `invoke`
pub async fn execute(args: &InvokeArgs, config: &AppConfig) -> Result<(), AppError> {
    let manager = super::start_host(config).await?;

    let mut request = vec![Value::String(args.command.clone())];
    request.extend(args.args.iter().map(String::as_str).map(parse_arg));

    let mut ctx = CommandContext::new().with_client("resonance-cli");
    if let Some(player) = &args.player {
        ctx = ctx.with_player(player.clone());
    }

    let result = manager.dispatch(&ctx, &request).await;
    manager.shutdown().await;

    output::print_json(&result?);
    Ok(())
}

fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("42"), json!(42));
        assert_eq!(parse_arg("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(parse_arg("Ada"), json!("Ada"));
    }
}
