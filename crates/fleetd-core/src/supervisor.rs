//! Owns one child process end to end: spawning it, draining its two output
//! streams into a shared [`RingBuffer`], and fanning live records out to a
//! [`SubscriberSet`].
//!
//! The lifecycle (start/stop/restart/write/status) is serialized through a
//! single actor task modeled on `database_logger.rs`'s `DatabaseLoggerWorker`:
//! a `Cmd` enum carried over an unbounded channel, processed one at a time by
//! a task that owns the `Child` handle directly. This keeps "never hold a
//! lock across awaiting child I/O or exit" (spec §5) true by construction:
//! the only thing guarded by a plain mutex is `Data` (the ring buffer and
//! subscriber set), and nothing in the actor loop ever locks it across an
//! `.await` on the child itself.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::error::SupervisorError;
use crate::line_assembler;
use crate::log_record::{LogRecord, StreamKind};
use crate::ring_buffer::RingBuffer;
use crate::subscriber::{SubscriberId, SubscriberSet};

/// Buffer capacity per supervisor, per spec §3.
const RING_BUFFER_CAPACITY: usize = 1000;

/// Snapshot of a supervisor's process-lifecycle state, as exposed by the
/// `status` operation and by the `running`/`pid`/`returncode` fields of the
/// external process descriptor.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusSnapshot {
    pub pid: Option<u32>,
    pub returncode: Option<i32>,
}

impl StatusSnapshot {
    /// A process is "running" once it has been started and hasn't yet
    /// produced a returncode.
    pub fn running(&self) -> bool {
        self.pid.is_some() && self.returncode.is_none()
    }

    /// Per spec §3/§4.4: deletion from the registry is forbidden while
    /// `returncode` is undefined, whether that's because the child is
    /// still running or because it was never started in the first place.
    pub fn deletable(&self) -> bool {
        self.returncode.is_some()
    }
}

/// A live subscription: a channel of [`LogRecord`]s plus the id needed to
/// tear it down via [`ProcessSupervisor::unsubscribe`].
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<LogRecord>,
}

struct Data {
    buffer: RingBuffer,
    subscribers: SubscriberSet,
}

enum Cmd {
    Start { reply: oneshot::Sender<Result<(), SupervisorError>> },
    Stop { force: bool, reply: oneshot::Sender<()> },
    Write { line: String, reply: oneshot::Sender<Result<(), SupervisorError>> },
    Status { reply: oneshot::Sender<StatusSnapshot> },
}

pub struct ProcessSupervisor {
    name: String,
    command: Vec<String>,
    data: Arc<Mutex<Data>>,
    cmd_tx: mpsc::UnboundedSender<Cmd>,
}

impl ProcessSupervisor {
    pub fn new(name: String, command: Vec<String>) -> Self {
        let data = Arc::new(Mutex::new(Data {
            buffer: RingBuffer::new(RING_BUFFER_CAPACITY),
            subscribers: SubscriberSet::new(),
        }));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let actor = LifecycleActor {
            command: command.clone(),
            data: data.clone(),
            child: None,
            stdin: None,
            workers: Vec::new(),
            last_pid: None,
            last_returncode: None,
        };
        tokio::spawn(actor.run(cmd_rx));
        Self { name, command, data, cmd_tx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub async fn start(&self) -> Result<(), SupervisorError> {
        let (reply, recv) = oneshot::channel();
        self.send(Cmd::Start { reply });
        recv.await.expect("lifecycle actor dropped its reply channel")
    }

    /// `force` selects `SIGKILL` over the default graceful `SIGTERM`. A
    /// no-op if the process isn't currently running.
    pub async fn stop(&self, force: bool) {
        let (reply, recv) = oneshot::channel();
        self.send(Cmd::Stop { force, reply });
        recv.await.expect("lifecycle actor dropped its reply channel");
    }

    /// Stop (if running), optionally clear the accumulated log buffer, then
    /// start again.
    pub async fn restart(&self, force: bool, clear_logs: bool) -> Result<(), SupervisorError> {
        self.stop(force).await;
        if clear_logs {
            self.data.lock().await.buffer.clear();
        }
        self.start().await
    }

    pub async fn write(&self, line: &str) -> Result<(), SupervisorError> {
        let (reply, recv) = oneshot::channel();
        self.send(Cmd::Write { line: line.to_string(), reply });
        recv.await.expect("lifecycle actor dropped its reply channel")
    }

    pub async fn status(&self) -> StatusSnapshot {
        let (reply, recv) = oneshot::channel();
        self.send(Cmd::Status { reply });
        recv.await.expect("lifecycle actor dropped its reply channel")
    }

    pub async fn tail(&self, n: i64, include_stderr: bool) -> Result<Vec<LogRecord>, SupervisorError> {
        let data = self.data.lock().await;
        Ok(data.buffer.tail(n, include_stderr)?)
    }

    /// Allocate a subscriber, seed it with the last `n` records (per the
    /// same rules as `tail`), and return the id and receiver. The replay is
    /// enqueued while still holding the data lock, so no drain worker can
    /// acquire it in between and broadcast a live record ahead of the
    /// replay — per spec §4.3 / §8 property 7, a subscriber must see
    /// `replay ++ live_since_subscribe` with the boundary exact.
    pub async fn subscribe(&self, n: i64, include_stderr: bool) -> Result<Subscription, SupervisorError> {
        let mut data = self.data.lock().await;
        let replay = data.buffer.tail(n, include_stderr)?;
        let (id, tx, receiver) = data.subscribers.add();

        for record in replay {
            // The channel was just created with full queue capacity and a
            // replay never exceeds capacity, so this cannot block.
            if tx.send(record).await.is_err() {
                break;
            }
        }
        Ok(Subscription { id, receiver })
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        self.data.lock().await.subscribers.remove(id);
    }

    fn send(&self, cmd: Cmd) {
        // The actor task only exits once every ProcessSupervisor handle
        // (and thus every cmd_tx clone) is dropped, so a send here never
        // fails in practice; unwrap would panic on a bug we'd want to know
        // about anyway.
        let _ = self.cmd_tx.send(cmd);
    }
}

/// Owns the live `Child` handle and processes one [`Cmd`] at a time.
/// Spawned once per [`ProcessSupervisor`] and outlives individual
/// start/stop cycles.
struct LifecycleActor {
    command: Vec<String>,
    data: Arc<Mutex<Data>>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    workers: Vec<JoinHandle<()>>,
    last_pid: Option<u32>,
    last_returncode: Option<i32>,
}

impl LifecycleActor {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Cmd>) {
        loop {
            let exited = async {
                match &mut self.child {
                    Some(child) => child.wait().await.ok(),
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle(cmd).await,
                        None => break,
                    }
                }
                status = exited => {
                    if let Some(status) = status {
                        self.on_exit(status.code()).await;
                    }
                }
            }
        }
        // No more handles exist; tear the child down rather than leak it.
        self.stop_process(true).await;
    }

    async fn handle(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::Start { reply } => {
                let _ = reply.send(self.start_process().await);
            }
            Cmd::Stop { force, reply } => {
                self.stop_process(force).await;
                let _ = reply.send(());
            }
            Cmd::Write { line, reply } => {
                let _ = reply.send(self.write_line(&line).await);
            }
            Cmd::Status { reply } => {
                let _ = reply.send(StatusSnapshot { pid: self.last_pid, returncode: self.last_returncode });
            }
        }
    }

    async fn start_process(&mut self) -> Result<(), SupervisorError> {
        if self.child.is_some() {
            return Err(SupervisorError::AlreadyStarted);
        }
        let mut command = Command::new(&self.command[0]);
        command
            .args(&self.command[1..])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(SupervisorError::SpawnFailed)?;
        self.last_pid = child.id();
        self.last_returncode = None;
        self.stdin = child.stdin.take();

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");
        self.workers = vec![
            tokio::spawn(drain(self.data.clone(), StreamKind::Stdout, stdout)),
            tokio::spawn(drain(self.data.clone(), StreamKind::Stderr, stderr)),
        ];
        self.child = Some(child);
        Ok(())
    }

    /// Signal the running child (if any) and wait for it to exit, updating
    /// `last_returncode` and tearing down drain workers and subscribers.
    /// A no-op when nothing is running.
    async fn stop_process(&mut self, force: bool) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        send_signal(&mut child, force);
        let status = child.wait().await.ok();
        self.on_exit(status.and_then(|s| s.code())).await;
    }

    async fn on_exit(&mut self, code: Option<i32>) {
        self.child = None;
        self.stdin = None;
        self.last_returncode = Some(code.unwrap_or(-1));
        for worker in self.workers.drain(..) {
            worker.abort();
        }
        // Terminating the process ends every live subscription too: the
        // spec's open question on restart semantics is resolved in favor
        // of closing subscribers rather than leaving them attached across
        // a new child's lifetime.
        self.data.lock().await.subscribers.clear();
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SupervisorError> {
        use tokio::io::AsyncWriteExt;
        let stdin = self.stdin.as_mut().ok_or(SupervisorError::StdinClosed)?;
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        stdin.write_all(&bytes).await.map_err(SupervisorError::WriteFailed)
    }
}

#[cfg(unix)]
fn send_signal(child: &mut Child, force: bool) {
    let Some(pid) = child.id() else { return };
    let signal = if force { nix::sys::signal::Signal::SIGKILL } else { nix::sys::signal::Signal::SIGTERM };
    let _ = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), signal);
}

#[cfg(not(unix))]
fn send_signal(child: &mut Child, _force: bool) {
    let _ = child.start_kill();
}

/// Read raw chunks from one child stream and fold them into the shared
/// buffer under `data`'s lock, one `read()` at a time rather than
/// line-buffered: a chunk boundary can fall mid-line, and it's exactly
/// that case `line_assembler::assemble` exists to handle.
async fn drain(data: Arc<Mutex<Data>>, kind: StreamKind, mut stream: impl tokio::io::AsyncRead + Unpin) {
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                let mut data = data.lock().await;
                let Data { buffer, subscribers } = &mut *data;
                line_assembler::assemble(buffer, subscribers, kind, &chunk);
            }
            Err(err) => {
                tracing::warn!(?kind, error = %err, "error reading child stream, ending drain worker");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_supervisor(text: &str) -> ProcessSupervisor {
        ProcessSupervisor::new(
            "echo-test".to_string(),
            vec!["sh".to_string(), "-c".to_string(), format!("printf '%s' \"{text}\"")],
        )
    }

    #[tokio::test]
    async fn start_runs_command_and_captures_output() {
        let supervisor = echo_supervisor("hello\\n");
        supervisor.start().await.unwrap();

        // Give the drain worker a beat to observe EOF after the short-lived
        // child exits.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let tail = supervisor.tail(10, true).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].text, "hello\n");
        assert!(!supervisor.status().await.running());
        assert_eq!(supervisor.status().await.returncode, Some(0));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let supervisor = ProcessSupervisor::new("sleeper".to_string(), vec!["sleep".to_string(), "1".to_string()]);
        supervisor.start().await.unwrap();
        assert!(matches!(supervisor.start().await, Err(SupervisorError::AlreadyStarted)));
        supervisor.stop(true).await;
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let supervisor = ProcessSupervisor::new("idle".to_string(), vec!["true".to_string()]);
        supervisor.stop(false).await;
        assert_eq!(supervisor.status().await.pid, None);
    }

    #[tokio::test]
    async fn write_without_a_running_process_is_an_error() {
        let supervisor = ProcessSupervisor::new("idle".to_string(), vec!["cat".to_string()]);
        assert!(matches!(supervisor.write("hi").await, Err(SupervisorError::StdinClosed)));
    }

    #[tokio::test]
    async fn write_is_echoed_back_through_cat() {
        let supervisor = ProcessSupervisor::new("cat".to_string(), vec!["cat".to_string()]);
        supervisor.start().await.unwrap();
        supervisor.write("ping").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let tail = supervisor.tail(10, true).await.unwrap();
        assert_eq!(tail[0].text, "ping\n");
        supervisor.stop(true).await;
    }

    #[tokio::test]
    async fn subscribe_replays_then_delivers_live_records() {
        let supervisor = ProcessSupervisor::new("cat".to_string(), vec!["cat".to_string()]);
        supervisor.start().await.unwrap();
        supervisor.write("first").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let mut sub = supervisor.subscribe(10, true).await.unwrap();
        assert_eq!(sub.receiver.recv().await.unwrap().text, "first\n");

        supervisor.write("second").await.unwrap();
        assert_eq!(sub.receiver.recv().await.unwrap().text, "second\n");

        supervisor.stop(true).await;
    }

    #[tokio::test]
    async fn stop_closes_subscriptions() {
        let supervisor = ProcessSupervisor::new("cat".to_string(), vec!["cat".to_string()]);
        supervisor.start().await.unwrap();
        let mut sub = supervisor.subscribe(0, true).await.unwrap();
        supervisor.stop(true).await;
        assert!(sub.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn restart_clears_logs_when_requested() {
        let supervisor = echo_supervisor("before\\n");
        supervisor.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!supervisor.tail(10, true).await.unwrap().is_empty());

        supervisor.restart(true, true).await.unwrap();
        assert!(supervisor.tail(10, true).await.unwrap().is_empty());
        supervisor.stop(true).await;
    }
}
