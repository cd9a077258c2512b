use anyhow::Result;
use clap::{Arg, CommandFactory};
use perfops_client::{ApiClient, KindRunner};
use perfops_common::{IpVersion, PerfOpsError, TestKind, TestParams, TestRequest};
use perfops_orchestrator::{DisplayMode, Orchestrator, RunConfig, Terminal};
use std::sync::Arc;
use tracing::{debug, info};

use crate::args::{Cli, Commands, GlobalOpts, TestArgs};

const DECLINED_TOKEN: &str =
    "The API token was declined. Please correct it or do not send a token to use the free plan.";
const FREE_LIMIT_EXCEEDED: &str =
    "For free users the maximum allowed number nodes for a single test is 20. Please change your limit.";

/// Exit status for usage errors, matching clap's own.
pub const USAGE_EXIT: u8 = 2;

/// Build the API client from the global options.
pub fn api_client(global: &GlobalOpts) -> ApiClient {
    let mut client = ApiClient::new();
    if let Some(key) = &global.key {
        client = client.with_api_key(key.as_str());
    }
    if let Some(url) = &global.base_url {
        client = client.with_base_url(url.as_str());
    }
    client
}

/// Kind and request for a test command, `None` for the other commands.
pub fn build_request(global: &GlobalOpts, command: &Commands) -> Option<(TestKind, TestRequest)> {
    let ip_version = |ipv6: bool| if ipv6 { IpVersion::V6 } else { IpVersion::V4 };
    let (kind, test, params, ipv) = match command {
        Commands::Ping { test } => (TestKind::Ping, test, TestParams::Basic, None),
        Commands::Mtr { test } => (TestKind::Mtr, test, TestParams::Basic, None),
        Commands::Traceroute { test, ipv6 } => {
            (TestKind::Traceroute, test, TestParams::Basic, Some(ip_version(*ipv6)))
        }
        Commands::Latency { test, ipv6 } => {
            (TestKind::Latency, test, TestParams::Basic, Some(ip_version(*ipv6)))
        }
        Commands::DnsPerf { test, dns_server } => (
            TestKind::DnsPerf,
            test,
            TestParams::DnsPerf {
                dns_server: dns_server.clone(),
            },
            None,
        ),
        Commands::Resolve {
            test,
            query_type,
            dns_server,
        } => (
            TestKind::DnsResolve,
            test,
            TestParams::DnsResolve {
                query_type: query_type.clone(),
                dns_server: dns_server.clone(),
            },
            None,
        ),
        Commands::Curl {
            test,
            head,
            insecure,
            http2,
        } => (
            TestKind::Curl,
            test,
            TestParams::Curl {
                head: *head,
                insecure: *insecure,
                http2: *http2,
            },
            None,
        ),
        Commands::Credits | Commands::List { .. } => return None,
    };

    let mut request = base_request(global, test).with_params(params);
    if let Some(version) = ipv {
        request = request.with_ip_version(version);
    }
    Some((kind, request))
}

fn base_request(global: &GlobalOpts, test: &TestArgs) -> TestRequest {
    TestRequest::new(test.target.as_str())
        .with_location(global.from.clone().unwrap_or_default())
        .with_nodes(global.node_ids.clone())
        .with_limit(test.limit)
}

/// How a test of `kind` is presented.
///
/// Short tests redraw in place; DNS and curl results stream. `--plain`
/// forces streaming and `--json` wins over both.
pub fn display_mode(kind: TestKind, global: &GlobalOpts) -> DisplayMode {
    if global.json {
        return DisplayMode::Json;
    }
    if global.plain {
        return DisplayMode::Stream;
    }
    match kind {
        TestKind::Ping | TestKind::Traceroute | TestKind::Mtr | TestKind::Latency => DisplayMode::Live,
        TestKind::DnsPerf | TestKind::DnsResolve | TestKind::Curl => DisplayMode::Stream,
    }
}

/// Submit the test and render it until it finishes.
pub async fn run_test(global: &GlobalOpts, kind: TestKind, request: TestRequest) -> Result<()> {
    let client = Arc::new(api_client(global));
    let runner = Arc::new(KindRunner::new(client, kind));
    let config = RunConfig::default()
        .with_mode(display_mode(kind, global))
        .with_debug(global.debug);
    info!(kind = %kind, target = %request.target, limit = request.limit, "running test");
    debug!(?config, "run configuration");

    let orchestrator = Orchestrator::new(runner, config, Terminal::stdout());
    orchestrator.run(&request).await?;
    Ok(())
}

/// What to print on stderr, and the exit status, for a failed command.
#[derive(Debug, PartialEq, Eq)]
pub struct Failure {
    pub text: String,
    pub code: u8,
}

/// Translate a command error into user-facing text.
pub fn explain(err: &anyhow::Error, command: &str) -> Failure {
    match err.downcast_ref::<PerfOpsError>() {
        Some(e) if e.is_unauthorized() => Failure {
            text: format!("Error: {}", DECLINED_TOKEN),
            code: 1,
        },
        Some(e) => match e.arg_name() {
            Some("limit") => Failure {
                text: FREE_LIMIT_EXCEEDED.to_string(),
                code: USAGE_EXIT,
            },
            Some(name) => Failure {
                text: invalid_args_help(command, name),
                code: USAGE_EXIT,
            },
            None => Failure {
                text: format!("Error: {}", e),
                code: 1,
            },
        },
        None => Failure {
            text: format!("Error: {:#}", err),
            code: 1,
        },
    }
}

/// Clap argument id for a validation error name.
fn arg_id(name: &str) -> &str {
    match name {
        "dns server" => "dns_server",
        "param" => "query_type",
        other => other,
    }
}

fn invalid_args_help(command: &str, name: &str) -> String {
    let cli = Cli::command();
    let mut lines = vec!["Missing or invalid arguments:".to_string()];
    if let Some(sub) = cli.find_subcommand(command) {
        let offending = arg_id(name);
        for arg in sub.get_arguments() {
            if arg.get_id().as_str() == offending || arg.is_required_set() {
                lines.push(short_usage(arg));
            }
        }
    }
    lines.join("\n")
}

fn short_usage(arg: &Arg) -> String {
    let value = arg
        .get_value_names()
        .and_then(|names| names.first())
        .map(|name| name.to_string())
        .unwrap_or_else(|| arg.get_id().as_str().to_uppercase());
    if arg.is_positional() {
        return format!("  <{}>", value);
    }

    let mut line = match (arg.get_short(), arg.get_long()) {
        (Some(short), Some(long)) => format!("  -{}, --{}", short, long),
        (Some(short), None) => format!("  -{}", short),
        (None, Some(long)) => format!("  --{}", long),
        (None, None) => format!("  {}", arg.get_id()),
    };
    if arg.get_action().takes_values() {
        line.push_str(&format!(" <{}>", value));
    }
    line
}
