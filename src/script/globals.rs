//! The capability object a script runs against
//!
//! Scripts see the outside world only through this: line tags, the bridge
//! to the debugger, the test's paths and its output sink.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::ProcessBridge;
use crate::common::{Error, Result};
use crate::delta::DeltaGenerator;
use crate::record::Record;
use crate::source::LineTagMap;
use crate::testing::Transcript;

/// Default `expect` timeout when the script gives none
pub const DEFAULT_EXPECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything one test script can reach
pub struct ScriptGlobals {
    lines: LineTagMap,
    test_source: PathBuf,
    test_bin: PathBuf,
    bridge: ProcessBridge,
    output: Transcript,
    expect_timeout: Duration,
    delta: Option<Arc<dyn DeltaGenerator>>,
}

impl ScriptGlobals {
    /// Bundle a test's tags and paths with a live bridge
    ///
    /// The output sink is the bridge's transcript.
    pub fn new(
        lines: LineTagMap,
        test_source: impl Into<PathBuf>,
        test_bin: impl Into<PathBuf>,
        bridge: ProcessBridge,
    ) -> Self {
        let output = bridge.transcript().clone();
        Self {
            lines,
            test_source: test_source.into(),
            test_bin: test_bin.into(),
            bridge,
            output,
            expect_timeout: DEFAULT_EXPECT_TIMEOUT,
            delta: None,
        }
    }

    pub fn with_expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = timeout;
        self
    }

    pub fn with_delta(mut self, generator: Arc<dyn DeltaGenerator>) -> Self {
        self.delta = Some(generator);
        self
    }

    pub fn lines(&self) -> &LineTagMap {
        &self.lines
    }

    /// Line number of a tag
    pub fn line(&self, tag: &str) -> Option<usize> {
        self.lines.get(tag)
    }

    pub fn test_source(&self) -> &Path {
        &self.test_source
    }

    pub fn test_bin(&self) -> &Path {
        &self.test_bin
    }

    /// Write a line to the debugger
    pub async fn send(&mut self, text: &str) -> Result<()> {
        self.bridge.send(text).await
    }

    /// Wait for a line starting with `prefix`; `None` uses the default timeout
    pub async fn expect(&mut self, prefix: &str, timeout: Option<Duration>) -> Result<Record> {
        let timeout = timeout.unwrap_or(self.expect_timeout);
        self.bridge.expect(prefix, timeout).await
    }

    /// Append a line to the test output
    pub fn log(&self, text: impl Into<String>) {
        self.output.write_line(text);
    }

    /// Build a hot reload delta
    pub async fn generate_delta(
        &mut self,
        source_text: &str,
        target_file: &str,
    ) -> Result<PathBuf> {
        let generator = self.delta.as_ref().ok_or_else(|| {
            Error::delta_failed(target_file, "no delta generator is configured")
        })?;
        generator.generate(source_text, target_file).await
    }

    /// Close the bridge and hand back the output
    pub async fn close(mut self) -> Transcript {
        self.bridge.close().await;
        self.output
    }
}
