//! Session transports: real telnet consoles and the in-process simulator.
//!
//! The session state machine only sees the [`DeviceStream`] trait, so the
//! simulated responder and a live TCP console are interchangeable above
//! this layer. Dispatch on the `simulated` flag happens exactly once, in
//! [`TransportSelector::open`].

use crate::domain::{AutomationError, DeviceDescriptor, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default deadline for establishing a TCP console connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a bidirectional text stream to a device console.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceStream>>;
}

/// One open console stream.
#[async_trait]
pub trait DeviceStream: Send + std::fmt::Debug {
    /// Write bytes to the device. Each command line is sent in one call;
    /// there are no partial-line sends.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read until `pattern` appears in the accumulated output, returning
    /// everything up to and including the match. Fails with
    /// [`AutomationError::Timeout`] once `timeout` elapses.
    async fn read_until(&mut self, pattern: &str, timeout: Duration) -> Result<String>;

    /// Close the stream. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Default transport: routes simulated descriptors to the in-process
/// responder and everything else to a real telnet connection.
#[derive(Debug, Default)]
pub struct TransportSelector {
    telnet: TelnetTransport,
    simulated: SimulatedTransport,
}

impl TransportSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionTransport for TransportSelector {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceStream>> {
        if device.simulated {
            self.simulated.open(device).await
        } else {
            self.telnet.open(device).await
        }
    }
}

/// Real telnet-style transport over a TCP stream.
#[derive(Debug, Clone)]
pub struct TelnetTransport {
    connect_timeout: Duration,
}

impl Default for TelnetTransport {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl TelnetTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl SessionTransport for TelnetTransport {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceStream>> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&device.address))
            .await
            .map_err(|_| {
                AutomationError::Timeout(format!("connection to {}", device.address))
            })?
            .map_err(|e| {
                AutomationError::Connection(format!("{}: {}", device.address, e))
            })?;

        Ok(Box::new(TelnetStream {
            stream: Some(stream),
            buffer: Vec::new(),
            iac_carry: Vec::new(),
        }))
    }
}

#[derive(Debug)]
struct TelnetStream {
    stream: Option<TcpStream>,
    buffer: Vec<u8>,
    /// Tail of an IAC sequence cut off by a TCP read boundary, held back
    /// until the next chunk completes it.
    iac_carry: Vec<u8>,
}

impl TelnetStream {
    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| AutomationError::Connection("stream already closed".to_string()))
    }

    /// Strip telnet IAC option negotiation (0xFF escapes).
    ///
    /// Router consoles negotiate options on connect; the session layer
    /// only ever wants the text channel. A sequence cut off by a read
    /// boundary is held in `iac_carry` and finished with the next chunk,
    /// so `IAC WILL <opt>` split across two TCP reads never leaks the
    /// option byte as text.
    fn strip_iac(&mut self, data: &[u8]) -> Vec<u8> {
        let mut bytes = std::mem::take(&mut self.iac_carry);
        bytes.extend_from_slice(data);

        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != 0xFF {
                out.push(bytes[i]);
                i += 1;
                continue;
            }
            match bytes.get(i + 1).copied() {
                // lone IAC at the chunk end; the command byte is still in flight
                None => {
                    self.iac_carry.push(0xFF);
                    break;
                }
                // escaped 0xFF data byte
                Some(0xFF) => {
                    out.push(0xFF);
                    i += 2;
                }
                // WILL/WONT/DO/DONT carry one option byte
                Some(verb @ 0xFB..=0xFE) => {
                    if i + 2 < bytes.len() {
                        i += 3;
                    } else {
                        self.iac_carry.extend_from_slice(&[0xFF, verb]);
                        break;
                    }
                }
                // other single-byte commands
                Some(_) => i += 2,
            }
        }
        out
    }
}

#[async_trait]
impl DeviceStream for TelnetStream {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        stream
            .write_all(data)
            .await
            .map_err(|e| AutomationError::Connection(format!("write failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| AutomationError::Connection(format!("flush failed: {e}")))?;
        Ok(())
    }

    async fn read_until(&mut self, pattern: &str, timeout: Duration) -> Result<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut chunk = [0u8; 4096];

        loop {
            if let Some(pos) = find_subsequence(&self.buffer, pattern.as_bytes()) {
                let end = pos + pattern.len();
                let matched: Vec<u8> = self.buffer.drain(..end).collect();
                return Ok(String::from_utf8_lossy(&matched).into_owned());
            }

            let stream = self.stream_mut()?;
            let read = tokio::time::timeout_at(deadline, stream.read(&mut chunk))
                .await
                .map_err(|_| AutomationError::Timeout(format!("prompt {pattern:?}")))?
                .map_err(|e| AutomationError::Connection(format!("read failed: {e}")))?;

            if read == 0 {
                return Err(AutomationError::Connection(
                    "connection closed by device".to_string(),
                ));
            }
            let cleaned = self.strip_iac(&chunk[..read]);
            self.buffer.extend(cleaned);
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// In-process responder reproducing a Cisco IOS console.
///
/// Deterministic and network-free: `send` interprets each line against a
/// small prompt-mode machine and queues the echo plus the canned response,
/// `read_until` drains the queue. Indistinguishable from a live console to
/// the session state machine, which is the whole point of dummy devices.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransport;

impl SimulatedTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionTransport for SimulatedTransport {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DeviceStream>> {
        Ok(Box::new(SimulatedStream::new(device)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptMode {
    UserExec,
    PrivExec,
    Config,
    ConfigIf,
}

impl PromptMode {
    fn prompt(&self) -> &'static str {
        match self {
            PromptMode::UserExec => "Router>",
            PromptMode::PrivExec => "Router#",
            PromptMode::Config => "Router(config)#",
            PromptMode::ConfigIf => "Router(config-if)#",
        }
    }
}

#[derive(Debug)]
struct SimulatedStream {
    device_label: String,
    mode: PromptMode,
    pending: VecDeque<u8>,
    closed: bool,
}

impl SimulatedStream {
    fn new(device: &DeviceDescriptor) -> Self {
        let mut stream = Self {
            device_label: device.device_class.label().to_string(),
            mode: PromptMode::UserExec,
            pending: VecDeque::new(),
            closed: false,
        };
        stream.emit(&format!(
            "{} console is now available\r\n\r\n",
            device.name
        ));
        stream.emit_prompt();
        stream
    }

    fn emit(&mut self, text: &str) {
        self.pending.extend(text.as_bytes());
    }

    fn emit_prompt(&mut self) {
        let prompt = self.mode.prompt();
        self.emit(prompt);
    }

    fn handle_line(&mut self, line: &str) {
        // Echo, as a real console would.
        self.emit(line);
        self.emit("\r\n");

        let trimmed = line.trim();
        match self.mode {
            PromptMode::UserExec => match trimmed {
                "" => {}
                "enable" => self.mode = PromptMode::PrivExec,
                _ => self.emit("% Invalid input detected at '^' marker.\r\n"),
            },
            PromptMode::PrivExec => match trimmed {
                "" | "terminal length 0" => {}
                "configure terminal" => {
                    self.mode = PromptMode::Config;
                    self.emit(
                        "Enter configuration commands, one per line.  End with CNTL/Z.\r\n",
                    );
                }
                "show running-config" => {
                    let config = running_config_fixture(&self.device_label);
                    self.emit(&config);
                }
                "show ip interface brief" => {
                    let brief = interface_brief_fixture(&self.device_label);
                    self.emit(&brief);
                }
                "write memory" => self.emit("Building configuration...\r\n[OK]\r\n"),
                "exit" => self.closed = true,
                _ => {}
            },
            PromptMode::Config => match trimmed {
                "end" => {
                    self.mode = PromptMode::PrivExec;
                    self.emit("%SYS-5-CONFIG_I: Configured from console by console\r\n");
                }
                "exit" => self.mode = PromptMode::PrivExec,
                other if other.starts_with("interface ") => self.mode = PromptMode::ConfigIf,
                _ => {}
            },
            PromptMode::ConfigIf => match trimmed {
                "end" => {
                    self.mode = PromptMode::PrivExec;
                    self.emit("%SYS-5-CONFIG_I: Configured from console by console\r\n");
                }
                "exit" => self.mode = PromptMode::Config,
                other if other.starts_with("interface ") => {}
                _ => {}
            },
        }

        if !self.closed {
            self.emit_prompt();
        }
    }
}

#[async_trait]
impl DeviceStream for SimulatedStream {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(AutomationError::Connection(
                "stream already closed".to_string(),
            ));
        }
        let text = String::from_utf8_lossy(data).into_owned();
        let mut lines: Vec<&str> = text.split('\n').collect();
        // A trailing newline terminates the last line rather than opening
        // an empty one.
        if lines.last() == Some(&"") {
            lines.pop();
        }
        for line in lines {
            self.handle_line(line.trim_end_matches('\r'));
        }
        Ok(())
    }

    async fn read_until(&mut self, pattern: &str, _timeout: Duration) -> Result<String> {
        let buffered: Vec<u8> = self.pending.iter().copied().collect();
        match find_subsequence(&buffered, pattern.as_bytes()) {
            Some(pos) => {
                let end = pos + pattern.len();
                let matched: Vec<u8> = self.pending.drain(..end).collect();
                Ok(String::from_utf8_lossy(&matched).into_owned())
            }
            // Deterministic responder: no more data is ever coming.
            None => Err(AutomationError::Timeout(format!("prompt {pattern:?}"))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.pending.clear();
        Ok(())
    }
}

/// Canned `show running-config` output for simulated devices.
fn running_config_fixture(device_label: &str) -> String {
    format!(
        "Building configuration...\r\n\
         \r\n\
         ! {device_label}\r\n\
         version 12.4\r\n\
         service timestamps debug datetime msec\r\n\
         service timestamps log datetime msec\r\n\
         no service password-encryption\r\n\
         !\r\n\
         hostname Router\r\n\
         !\r\n\
         interface FastEthernet0/0\r\n\
         \x20description LAN Interface\r\n\
         \x20ip address 192.168.1.1 255.255.255.0\r\n\
         \x20no shutdown\r\n\
         !\r\n\
         interface FastEthernet0/1\r\n\
         \x20no ip address\r\n\
         \x20shutdown\r\n\
         !\r\n\
         router ospf 1\r\n\
         \x20network 192.168.1.0 0.0.0.255 area 0\r\n\
         !\r\n\
         line con 0\r\n\
         line vty 0 4\r\n\
         \x20login\r\n\
         !\r\n\
         end\r\n"
    )
}

/// Canned `show ip interface brief` output for simulated devices.
fn interface_brief_fixture(device_label: &str) -> String {
    format!(
        "! {device_label}\r\n\
         Interface                  IP-Address      OK? Method Status                Protocol\r\n\
         FastEthernet0/0            192.168.1.1     YES NVRAM  up                    up\r\n\
         FastEthernet0/1            unassigned      YES NVRAM  administratively down down\r\n"
    )
}
