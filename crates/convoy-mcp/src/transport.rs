//! Stdio transport with Content-Length framing.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::error::{McpError, Result};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// A spawned MCP server process and its framed stdio channel.
pub struct StdioTransport {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl StdioTransport {
    /// Spawn the server process with piped stdio.
    ///
    /// stderr is inherited so server diagnostics reach the host logs.
    pub fn spawn(command: &str, args: &[String], env: &[(String, String)]) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::spawn_failed(format!("'{command}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::spawn_failed("failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::spawn_failed("failed to capture stdout"))?;

        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    /// Send a request and block for its response.
    pub fn send_request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.write_framed(&serde_json::to_value(request)?)?;
        self.read_framed()
    }

    /// Send a notification; no response is read.
    pub fn send_notification(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        self.write_framed(&serde_json::to_value(notification)?)
    }

    fn write_framed(&mut self, message: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(message)?;
        write!(self.stdin, "Content-Length: {}\r\n\r\n{}", json.len(), json)?;
        self.stdin.flush()?;
        tracing::trace!(bytes = json.len(), "sent MCP message");
        Ok(())
    }

    fn read_framed(&mut self) -> Result<JsonRpcResponse> {
        // Headers until the blank line; only Content-Length matters.
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(McpError::ConnectionClosed);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some(value) = trimmed.strip_prefix("Content-Length:") {
                content_length = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|e| McpError::protocol(format!("invalid Content-Length: {e}")))?,
                );
            }
        }

        let content_length =
            content_length.ok_or_else(|| McpError::protocol("missing Content-Length header"))?;
        let mut body = vec![0u8; content_length];
        self.stdout.read_exact(&mut body)?;
        tracing::trace!(bytes = content_length, "received MCP message");

        let text = String::from_utf8(body)
            .map_err(|e| McpError::protocol(format!("invalid UTF-8 in response: {e}")))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Kill the server process and reap it.
    pub fn shutdown(&mut self) -> Result<()> {
        let _ = self.child.kill();
        let _ = self.child.wait();
        Ok(())
    }

    /// True while the server process is running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_nonexistent_command() {
        let result = StdioTransport::spawn("nonexistent-mcp-server-12345", &[], &[]);
        assert!(matches!(result, Err(McpError::SpawnFailed(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_spawn_and_shutdown() {
        let mut transport = StdioTransport::spawn("cat", &[], &[]).unwrap();
        assert!(transport.is_alive());
        transport.shutdown().unwrap();
        assert!(!transport.is_alive());
    }

    #[test]
    #[cfg(unix)]
    fn test_read_framed_on_closed_stdout() {
        // `true` exits immediately, so the read hits EOF.
        let mut transport = StdioTransport::spawn("true", &[], &[]).unwrap();
        let err = transport.read_framed().unwrap_err();
        assert!(matches!(err, McpError::ConnectionClosed));
    }
}
