//! Orchestrator - submit a test, poll it and render it until it finishes

use perfops_common::{PerfOpsResult, RunOutput, TestRequest, TestRunner};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use crate::accumulator::ResultSlot;
use crate::poller::{Poller, DEFAULT_POLL_INTERVAL};
use crate::renderer::{print_output, print_output_json, Formatter, StreamRenderer};
use crate::terminal::Terminal;

/// Default delay between two render passes.
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(50);

/// How results are presented while a test runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Redraw the whole snapshot in place.
    #[default]
    Live,
    /// Append each node's result once.
    Stream,
    /// Print the final snapshot as JSON.
    Json,
}

/// Settings for a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: DisplayMode,
    pub debug: bool,
    pub poll_interval: Duration,
    pub render_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Live,
            debug: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            render_interval: DEFAULT_RENDER_INTERVAL,
        }
    }
}

impl RunConfig {
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: DisplayMode) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_render_interval(mut self, interval: Duration) -> Self {
        self.render_interval = interval;
        self
    }

    /// The test id is printed in debug runs, except in JSON mode where it is
    /// part of the document already.
    pub fn print_id(&self) -> bool {
        self.debug && self.mode != DisplayMode::Json
    }
}

/// Drives one test from submission to its final snapshot.
pub struct Orchestrator {
    runner: Arc<dyn TestRunner>,
    config: RunConfig,
    terminal: Terminal,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn TestRunner>, config: RunConfig, terminal: Terminal) -> Self {
        Self {
            runner,
            config,
            terminal,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Submit `request` and follow it until the output reports itself
    /// finished or an error is seen.
    ///
    /// The poller is cancelled and joined before this returns, whatever the
    /// outcome.
    #[instrument(skip(self, request), fields(target = %request.target, mode = ?self.config.mode))]
    pub async fn run(&self, request: &TestRequest) -> PerfOpsResult<RunOutput> {
        let formatter = Formatter::new(self.terminal.clone(), self.config.print_id());

        formatter.start_spinner();
        let submitted = self.runner.submit(request).await;
        formatter.stop_spinner();
        let id = submitted?;
        info!(test_id = %id, "test submitted");

        // live frames carry the id themselves
        if self.config.mode == DisplayMode::Stream && self.config.print_id() {
            let mut out = self.terminal.lock();
            writeln!(out, "Test ID: {}", id)?;
            out.flush()?;
        }

        let slot = Arc::new(ResultSlot::new());
        let poller = Poller::spawn(
            self.runner.clone(),
            id.clone(),
            self.config.poll_interval,
            slot.clone(),
        );

        let result = self.render_loop(&formatter, &slot).await;
        formatter.stop_spinner();
        poller.shutdown().await;

        let output = result?;
        debug!(test_id = %id, items = output.items.len(), "test finished");

        if self.config.mode == DisplayMode::Json {
            let mut out = self.terminal.lock();
            print_output_json(&mut **out, &*output)?;
        }
        Ok((*output).clone())
    }

    async fn render_loop(
        &self,
        formatter: &Formatter,
        slot: &ResultSlot,
    ) -> PerfOpsResult<Arc<RunOutput>> {
        let mut stream = StreamRenderer::new();
        let mut ticker = tokio::time::interval(self.config.render_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if self.config.mode != DisplayMode::Live {
            formatter.start_spinner();
        }

        loop {
            ticker.tick().await;

            let (output, error) = slot.output();
            if let Some(e) = error {
                return Err(e);
            }
            let Some(output) = output else {
                continue;
            };
            let finished = output.is_finished();

            match self.config.mode {
                DisplayMode::Live => print_output(formatter, &output)?,
                DisplayMode::Stream => {
                    if stream.has_new(&output) {
                        formatter.stop_spinner();
                        {
                            let mut out = self.terminal.lock();
                            stream.render(&mut **out, &output)?;
                        }
                        if !finished {
                            formatter.start_spinner();
                        }
                    }
                }
                DisplayMode::Json => {}
            }

            if finished {
                return Ok(output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{snapshot, FakeRunner, SharedBuffer};
    use perfops_common::PerfOpsError;

    const RUNNING: &str = r#"{"id":"test-123","requested":"example.com","finished":"false","items":[
        {"id":"a","result":{"output":"12.1","finished":true,"node":{"id":1,"city":"Paris","country":{"name":"France"}}}},
        {"id":"b","result":{"message":"NO DATA","node":{"id":2,"city":"Oslo","country":{"name":"Norway"}}}}
    ]}"#;
    const DONE: &str = r#"{"id":"test-123","requested":"example.com","finished":"true","items":[
        {"id":"a","result":{"output":"12.1","finished":true,"node":{"id":1,"city":"Paris","country":{"name":"France"}}}},
        {"id":"b","result":{"output":"-2","finished":true,"node":{"id":2,"city":"Oslo","country":{"name":"Norway"}}}}
    ]}"#;

    fn config(mode: DisplayMode) -> RunConfig {
        RunConfig::default()
            .with_mode(mode)
            .with_poll_interval(Duration::from_millis(10))
            .with_render_interval(Duration::from_millis(5))
    }

    fn orchestrator(runner: Arc<FakeRunner>, mode: DisplayMode) -> (Orchestrator, SharedBuffer) {
        let buf = SharedBuffer::default();
        let term = Terminal::from_writer(buf.clone()).with_size(200, 50);
        (Orchestrator::new(runner, config(mode), term), buf)
    }

    fn request() -> TestRequest {
        TestRequest::new("example.com")
    }

    #[test]
    fn print_id_only_in_debug_text_modes() {
        assert!(!RunConfig::default().print_id());
        assert!(RunConfig::default().with_debug(true).print_id());
        assert!(!RunConfig::default()
            .with_debug(true)
            .with_mode(DisplayMode::Json)
            .print_id());
    }

    #[tokio::test]
    async fn submit_error_skips_polling() {
        let mut fake = FakeRunner::new(vec![snapshot(DONE)]);
        fake.submit_error = Some("quota exceeded".into());
        let runner = Arc::new(fake);
        let (orch, _) = orchestrator(runner.clone(), DisplayMode::Live);

        let err = orch.run(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runner.fetch_count(), 0);
    }

    #[tokio::test]
    async fn fetch_error_is_returned() {
        let mut fake = FakeRunner::new(vec![]);
        fake.fail_fetch = Some("upstream unavailable".into());
        let runner = Arc::new(fake);
        let (orch, _) = orchestrator(runner.clone(), DisplayMode::Live);

        let err = orch.run(&request()).await.unwrap_err();
        assert!(matches!(err, PerfOpsError::Api(ref m) if m == "upstream unavailable"));
        assert_eq!(runner.fetch_count(), 1);
    }

    #[tokio::test]
    async fn live_mode_renders_final_snapshot() {
        let runner = Arc::new(FakeRunner::new(vec![snapshot(RUNNING), snapshot(DONE)]));
        let (orch, buf) = orchestrator(runner, DisplayMode::Live);

        let output = orch.run(&request()).await.unwrap();
        assert!(output.is_finished());
        assert_eq!(output.items.len(), 2);

        let text = buf.contents();
        let expected_tail = format!(
            "\x1b[200DNode1, Paris, France\n12.1\nNode2, Oslo, Norway\n{}\n",
            perfops_common::TIMEOUT_MESSAGE
        );
        assert!(text.ends_with(&expected_tail), "{:?}", text);
    }

    #[tokio::test]
    async fn stream_mode_prints_each_item_once() {
        let runner = Arc::new(FakeRunner::new(vec![
            snapshot(RUNNING),
            snapshot(RUNNING),
            snapshot(DONE),
        ]));
        let (orch, buf) = orchestrator(runner, DisplayMode::Stream);

        orch.run(&request()).await.unwrap();

        let text = buf.contents();
        assert_eq!(text.matches("Node1, Paris, France\n12.1\n").count(), 1, "{:?}", text);
        assert_eq!(text.matches("Node2, Oslo, Norway\n").count(), 1, "{:?}", text);
        assert!(text.contains(perfops_common::TIMEOUT_MESSAGE));
        assert!(!text.contains("NO DATA"));
    }

    #[tokio::test]
    async fn stream_mode_prints_test_id_in_debug() {
        let runner = Arc::new(FakeRunner::new(vec![snapshot(DONE)]));
        let buf = SharedBuffer::default();
        let term = Terminal::from_writer(buf.clone()).with_size(200, 50);
        let orch = Orchestrator::new(runner, config(DisplayMode::Stream).with_debug(true), term);

        orch.run(&request()).await.unwrap();

        let text = buf.contents();
        assert_eq!(text.matches("Test ID: test-123\n").count(), 1, "{:?}", text);
        let id_at = text.find("Test ID: test-123").unwrap();
        let node_at = text.find("Node1, Paris, France").unwrap();
        assert!(id_at < node_at, "{:?}", text);
    }

    #[tokio::test]
    async fn stream_mode_omits_test_id_without_debug() {
        let runner = Arc::new(FakeRunner::new(vec![snapshot(DONE)]));
        let (orch, buf) = orchestrator(runner, DisplayMode::Stream);

        orch.run(&request()).await.unwrap();
        assert!(!buf.contents().contains("Test ID:"));
    }

    #[tokio::test]
    async fn json_mode_prints_final_document() {
        let runner = Arc::new(FakeRunner::new(vec![snapshot(RUNNING), snapshot(DONE)]));
        let (orch, buf) = orchestrator(runner, DisplayMode::Json);

        orch.run(&request()).await.unwrap();

        let text = buf.contents();
        assert!(!text.contains("Node1, Paris"));
        let start = text.find('{').unwrap();
        let value: serde_json::Value = serde_json::from_str(text[start..].trim_end()).unwrap();
        assert_eq!(value["id"], "test-123");
        assert_eq!(value["finished"], "true");
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn poller_stops_after_return() {
        let runner = Arc::new(FakeRunner::new(vec![snapshot(DONE)]));
        let (orch, _) = orchestrator(runner.clone(), DisplayMode::Live);

        orch.run(&request()).await.unwrap();
        let count = runner.fetch_count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runner.fetch_count(), count);
    }

    #[tokio::test]
    async fn boolean_finished_keeps_polling() {
        let bool_done = r#"{"id":"test-123","finished":true,"items":[]}"#;
        let runner = Arc::new(FakeRunner::new(vec![snapshot(bool_done)]));
        let (orch, _) = orchestrator(runner.clone(), DisplayMode::Json);

        let run = tokio::time::timeout(Duration::from_millis(80), orch.run(&request())).await;
        assert!(run.is_err());
        assert!(runner.fetch_count() >= 2);
    }
}
