//! The `view` command: resolve one run and render it.
use crate::api::{ActionsApi, ReplayApi, RestClient};
use crate::cli::ViewArgs;
use crate::config;
use crate::render::{self, TerminalSink};
use crate::resolve::{resolve_effective_workflow, ResolveOptions};
use anyhow::{anyhow, Context, Result};
use std::io::IsTerminal;
use std::time::Duration;

pub(crate) fn run_view(args: ViewArgs) -> Result<()> {
    let run_id = args
        .run_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("run ID required when not running interactively"))?;
    let repo = config::resolve_repository(args.repo.as_deref())?;

    let api: Box<dyn ActionsApi> = match &args.replay {
        Some(dir) => {
            let replay = ReplayApi::new(dir.clone());
            tracing::info!(root = %replay.root().display(), "serving API responses from replay directory");
            Box::new(replay)
        }
        None => {
            let api_config =
                config::api_config(repo.host(), Duration::from_secs(args.timeout));
            tracing::debug!(
                base_url = %api_config.base_url,
                authenticated = api_config.token.is_some(),
                "using REST API"
            );
            Box::new(RestClient::new(&api_config))
        }
    };

    let options = ResolveOptions {
        git_ref: args.git_ref.clone(),
    };
    let effective = resolve_effective_workflow(api.as_ref(), &repo, run_id, &options)
        .with_context(|| format!("failed to view run {run_id} of {repo}"))?;

    let stdout = std::io::stdout();
    if args.json {
        return render::write_json(&effective, stdout.lock());
    }
    let color = args.color.enabled(stdout.is_terminal());
    let mut sink = TerminalSink::new(stdout.lock(), color, args.line_numbers);
    render::present(&effective, &mut sink)
}
