//! Core data types shared by the API client, the orchestrator and the CLI
//!
//! Wire shapes follow the PerfOps API:
//! - requests encode node IDs as one comma-separated string
//! - the top-level `finished` flag is a string (`"true"`), though some
//!   responses carry a JSON boolean
//! - a result's `output` is a string, a list of lines or a number depending
//!   on the test kind

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output value a node reports when it could not reach the target in time.
pub const TIMEOUT_SENTINEL: &str = "-2";

/// Human-readable replacement for [`TIMEOUT_SENTINEL`].
pub const TIMEOUT_MESSAGE: &str = "The command timed-out. It either took too long to execute or we could not connect to your target at all.";

/// Message a node reports while it has nothing to show yet.
pub const NO_DATA: &str = "NO DATA";

/// Kind of test the API can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    Ping,
    Traceroute,
    Mtr,
    Latency,
    DnsPerf,
    DnsResolve,
    Curl,
}

impl TestKind {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TestKind::Ping => "ping",
            TestKind::Traceroute => "traceroute",
            TestKind::Mtr => "mtr",
            TestKind::Latency => "latency",
            TestKind::DnsPerf => "dns-perf",
            TestKind::DnsResolve => "dns-resolve",
            TestKind::Curl => "curl",
        }
    }

    /// API path tests of this kind are submitted to.
    #[must_use]
    pub fn run_path(&self) -> String {
        format!("/run/{}", self.as_str())
    }

    /// API path the output of test `id` is polled from.
    #[must_use]
    pub fn output_path(&self, id: &TestId) -> String {
        format!("/run/{}/{}", self.as_str(), id)
    }

    /// Decode a poll response body, normalizing each result's output
    /// payload to the shape this kind renders.
    pub fn decode_output(&self, body: &[u8]) -> serde_json::Result<RunOutput> {
        let mut output: RunOutput = serde_json::from_slice(body)?;
        for result in output.items.iter_mut().filter_map(|item| item.result.as_mut()) {
            self.normalize(result);
        }
        Ok(output)
    }

    fn normalize(&self, result: &mut RunResult) {
        match self {
            TestKind::DnsResolve => {
                result.output = match std::mem::take(&mut result.output) {
                    OutputPayload::Lines(lines) => OutputPayload::Lines(lines),
                    OutputPayload::Text(text) => {
                        OutputPayload::Lines(text.split('\n').map(str::to_string).collect())
                    }
                    _ => OutputPayload::Lines(vec!["-".to_string()]),
                };
            }
            TestKind::DnsPerf => {
                if result.message.is_empty() && !matches!(result.output, OutputPayload::Text(_)) {
                    result.output = OutputPayload::Text("-".to_string());
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier the API hands out for a submitted test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Node IDs, sent over the wire as `"1,2,3"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeIds(pub Vec<u32>);

impl NodeIds {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_wire(&self) -> String {
        self.0.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
    }
}

impl From<Vec<u32>> for NodeIds {
    fn from(ids: Vec<u32>) -> Self {
        Self(ids)
    }
}

impl Serialize for NodeIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for NodeIds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(NodeIds::default());
        }
        raw.split(',')
            .map(|id| id.trim().parse::<u32>().map_err(de::Error::custom))
            .collect::<Result<Vec<_>, _>>()
            .map(NodeIds)
    }
}

/// IP protocol version a test should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    #[inline]
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

/// Kind-specific request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TestParams {
    /// ping, traceroute, mtr and latency take nothing extra.
    #[default]
    Basic,
    DnsPerf { dns_server: String },
    DnsResolve { query_type: String, dns_server: String },
    Curl { head: bool, insecure: bool, http2: bool },
}

/// A test as submitted to the API. Built once per command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestRequest {
    pub target: String,
    pub location: String,
    pub nodes: NodeIds,
    pub limit: u32,
    pub ip_version: Option<IpVersion>,
    pub params: TestParams,
}

impl TestRequest {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = location.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_nodes<N: Into<NodeIds>>(mut self, nodes: N) -> Self {
        self.nodes = nodes.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_ip_version(mut self, ip_version: IpVersion) -> Self {
        self.ip_version = Some(ip_version);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_params(mut self, params: TestParams) -> Self {
        self.params = params;
        self
    }
}

impl Serialize for TestRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("target", &self.target)?;
        if !self.nodes.is_empty() {
            map.serialize_entry("nodes", &self.nodes)?;
        }
        if !self.location.is_empty() {
            map.serialize_entry("location", &self.location)?;
        }
        if self.limit != 0 {
            map.serialize_entry("limit", &self.limit)?;
        }
        if let Some(version) = self.ip_version {
            map.serialize_entry("ipversion", &version.as_u8())?;
        }
        match &self.params {
            TestParams::Basic => {}
            TestParams::DnsPerf { dns_server } => {
                if !dns_server.is_empty() {
                    map.serialize_entry("dnsServer", dns_server)?;
                }
            }
            TestParams::DnsResolve { query_type, dns_server } => {
                if !query_type.is_empty() {
                    map.serialize_entry("param", query_type)?;
                }
                if !dns_server.is_empty() {
                    map.serialize_entry("dnsServer", dns_server)?;
                }
            }
            TestParams::Curl { head, insecure, http2 } => {
                map.serialize_entry("head", head)?;
                if *insecure {
                    map.serialize_entry("insecure", insecure)?;
                }
                if *http2 {
                    map.serialize_entry("http2", http2)?;
                }
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Continent {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub iso: String,
}

/// Country metadata attached to nodes and returned by the country list.
///
/// `iso_numeric` is typed as a string; the list endpoint has been seen
/// using `isoNumeric` as the key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub iso: String,
    #[serde(default, alias = "isoNumeric", skip_serializing_if = "Option::is_none")]
    pub iso_numeric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<Continent>,
}

/// A probe host that executes tests.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub as_number: u64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub sub_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
}

impl Node {
    /// `Node<id>, <city>, <country>` header printed above a node's output.
    #[must_use]
    pub fn header(&self) -> String {
        let country = self.country.as_ref().map(|c| c.name.as_str()).unwrap_or("");
        format!("Node{}, {}, {}", self.id, self.city, country)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

/// Entry of the city list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<NamedRef>,
}

/// The `output` of a single node, whose JSON type varies by test kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputPayload {
    Text(String),
    Lines(Vec<String>),
    Number(serde_json::Number),
    #[default]
    Missing,
    Other(serde_json::Value),
}

impl OutputPayload {
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, OutputPayload::Missing)
    }

    /// Text shown for this payload: lists are joined with newlines.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            OutputPayload::Text(text) => text.clone(),
            OutputPayload::Lines(lines) => lines.join("\n"),
            OutputPayload::Number(n) => n.to_string(),
            OutputPayload::Missing => String::new(),
            OutputPayload::Other(value) => value.to_string(),
        }
    }
}

/// A `finished` flag as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finished {
    Text(String),
    Flag(bool),
    #[default]
    Missing,
}

impl Finished {
    /// Strict form: only the string `"true"` counts.
    #[inline]
    #[must_use]
    pub fn is_true_string(&self) -> bool {
        matches!(self, Finished::Text(s) if s == "true")
    }

    /// Lenient form: string `"true"` or boolean `true`.
    #[inline]
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Finished::Flag(true)) || self.is_true_string()
    }

    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Finished::Missing)
    }
}

/// One node's contribution to a test.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
    #[serde(default, skip_serializing_if = "OutputPayload::is_missing")]
    pub output: OutputPayload,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, rename = "dnsServer", skip_serializing_if = "Option::is_none")]
    pub dns_server: Option<String>,
    #[serde(default, skip_serializing_if = "Finished::is_missing")]
    pub finished: Finished,
}

impl RunResult {
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_true()
    }

    /// Header line naming the node that produced this result.
    #[must_use]
    pub fn node_header(&self) -> String {
        match &self.node {
            Some(node) => node.header(),
            None => Node::default().header(),
        }
    }

    /// Output text with the timeout sentinel replaced.
    #[must_use]
    pub fn display_output(&self) -> String {
        let text = self.output.to_text();
        if text == TIMEOUT_SENTINEL {
            TIMEOUT_MESSAGE.to_string()
        } else {
            text
        }
    }
}

/// A result plus the identifier used to de-duplicate it across polls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunItem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
}

impl RunItem {
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.result.as_ref().map(RunResult::is_finished).unwrap_or(false)
    }
}

/// Snapshot of a test returned by one poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunOutput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requested: String,
    #[serde(default)]
    pub finished: Finished,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<RunItem>,
}

impl RunOutput {
    /// Whether the whole test is complete. Only the string `"true"` counts.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_true_string()
    }

    /// Number of items whose own result is finished.
    #[must_use]
    pub fn finished_items(&self) -> usize {
        self.items.iter().filter(|item| item.is_finished()).count()
    }
}
