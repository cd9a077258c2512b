use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "perfops")]
#[command(version)]
#[command(about = "Run network tests from PerfOps nodes around the world", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// The PerfOps API key
    #[arg(short = 'K', long, env = "PERFOPS_API_KEY", hide_env_values = true, global = true)]
    pub key: Option<String>,

    /// A continent, region (e.g eastern europe), country, US state or city
    #[arg(short = 'F', long, global = true)]
    pub from: Option<String>,

    /// A comma separated list of node IDs to run a test from
    #[arg(short = 'N', long = "nodeid", value_delimiter = ',', global = true)]
    pub node_ids: Vec<u32>,

    /// Print the final result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Print each node's result once instead of redrawing in place
    #[arg(long, global = true)]
    pub plain: bool,

    /// Enables debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Override the API endpoint
    #[arg(long, env = "PERFOPS_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Target and node limit taken by every test command.
#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    /// Host name or IP address to test
    pub target: String,

    /// The maximum number of nodes to use
    #[arg(short = 'L', long, default_value_t = 1)]
    pub limit: u32,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a ping test on a target
    Ping {
        #[command(flatten)]
        test: TestArgs,
    },

    /// Run a traceroute test on a target
    Traceroute {
        #[command(flatten)]
        test: TestArgs,

        /// Use IPv6
        #[arg(short = '6', long)]
        ipv6: bool,
    },

    /// Run an MTR test on a target
    Mtr {
        #[command(flatten)]
        test: TestArgs,
    },

    /// Measure the latency to a target
    Latency {
        #[command(flatten)]
        test: TestArgs,

        /// Use IPv6
        #[arg(short = '6', long)]
        ipv6: bool,
    },

    /// Find the time it takes to resolve a DNS record
    #[command(name = "dnsperf")]
    DnsPerf {
        #[command(flatten)]
        test: TestArgs,

        /// The DNS server to query; 127.0.0.1 uses the node's local resolver
        #[arg(short = 'S', long)]
        dns_server: String,
    },

    /// Resolve a DNS record
    Resolve {
        #[command(flatten)]
        test: TestArgs,

        /// The DNS query type. One of: A, AAAA, CNAME, MX, NAPTR, NS, PTR, SOA, SPF, SRV, TXT
        #[arg(short = 'T', long = "type")]
        query_type: String,

        /// The DNS server to query; 127.0.0.1 uses the node's local resolver
        #[arg(short = 'S', long)]
        dns_server: String,
    },

    /// Run a HTTP(S) request against a URL
    Curl {
        #[command(flatten)]
        test: TestArgs,

        /// Fetch the headers only
        #[arg(short = 'I', long, default_value_t = true, action = ArgAction::Set)]
        head: bool,

        /// Proceed with connections considered insecure
        #[arg(short = 'k', long)]
        insecure: bool,

        /// Use HTTP version 2
        #[arg(long)]
        http2: bool,
    },

    /// Show the credits left on the account
    Credits,

    /// List the locations where PerfOps nodes are present
    List {
        /// countries or cities
        kind: String,
    },
}

impl Commands {
    /// Name of the subcommand as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Ping { .. } => "ping",
            Commands::Traceroute { .. } => "traceroute",
            Commands::Mtr { .. } => "mtr",
            Commands::Latency { .. } => "latency",
            Commands::DnsPerf { .. } => "dnsperf",
            Commands::Resolve { .. } => "resolve",
            Commands::Curl { .. } => "curl",
            Commands::Credits => "credits",
            Commands::List { .. } => "list",
        }
    }
}
