//! Full-stack tests for the temperature controller: real clock task,
//! real TCP server, real client sockets.

use std::sync::Arc;
use std::time::Duration;

use rig_devices::tempcon::{self, TempConConfig};
use rig_net::{
    run_server_task, DeviceHandle, InterfaceFactory, ServerCommand, ServerConfig,
    UnsolicitedFactory,
};
use rig_sim::{run_clock_task, ClockCommand, ClockConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

struct Stack {
    addr: std::net::SocketAddr,
    handle: DeviceHandle,
    clock_tx: mpsc::Sender<ClockCommand>,
    server_tx: mpsc::Sender<ServerCommand>,
}

async fn spawn_stack(status_period: Option<Duration>) -> Stack {
    let config = TempConConfig {
        initial_temperature: 0.0,
        setpoint: 0.0,
        ramp_rate: 200.0,
        status_period_ms: None,
    };
    let handle = DeviceHandle::new(tempcon::build_device(&config).unwrap());

    let interfaces: InterfaceFactory = Arc::new(|| tempcon::interface().unwrap());
    let unsolicited: Option<UnsolicitedFactory> = status_period
        .map(|p| Arc::new(move || tempcon::status_stream(p)) as UnsolicitedFactory);

    let (clock_tx, clock_rx) = mpsc::channel(1);
    tokio::spawn(run_clock_task(
        vec![handle.shared()],
        ClockConfig {
            period: Duration::from_millis(5),
        },
        clock_rx,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (server_tx, server_rx) = mpsc::channel(1);
    tokio::spawn(run_server_task(
        listener,
        handle.shared(),
        interfaces,
        unsolicited,
        ServerConfig::default(),
        server_rx,
    ));

    Stack {
        addr,
        handle,
        clock_tx,
        server_tx,
    }
}

impl Stack {
    async fn shutdown(self) {
        let _ = self.server_tx.send(ServerCommand::Shutdown).await;
        let _ = self.clock_tx.send(ClockCommand::Shutdown).await;
    }
}

struct Client {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let (read, writer) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, req: &str) {
        self.writer.write_all(req.as_bytes()).await.unwrap();
        self.writer.write_all(b"\r\n").await.unwrap();
    }

    async fn recv(&mut self) -> String {
        let mut line = String::new();
        timeout(Duration::from_secs(2), self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a reply")
            .unwrap();
        line.trim_end().to_string()
    }

    async fn query(&mut self, req: &str) -> String {
        self.send(req).await;
        self.recv().await
    }
}

#[tokio::test]
async fn test_ramp_to_setpoint_over_tcp() {
    let stack = spawn_stack(None).await;
    let mut client = Client::connect(stack.addr).await;

    assert_eq!(client.query("SETP:100.0").await, "OK");

    // 200 deg/s reaches 100 degrees well within the deadline
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let temp = client.query("TEMP?").await;
        if temp == "100.00" {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "never reached setpoint, last reading {temp}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Settled back to holding once the ramp completes
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.query("STATE?").await, "HOLDING");

    stack.shutdown().await;
}

#[tokio::test]
async fn test_backdoor_fault_silences_gated_query() {
    let stack = spawn_stack(None).await;
    let mut client = Client::connect(stack.addr).await;

    stack.handle.set_field("connected", false).await.unwrap();

    // Gated query goes unanswered
    client.send("TEMP?").await;
    let mut line = String::new();
    let res = timeout(
        Duration::from_millis(200),
        client.reader.read_line(&mut line),
    )
    .await;
    assert!(res.is_err(), "expected silence, got {line:?}");

    // Ungated commands still reply
    assert_eq!(client.query("SETP:5.0").await, "OK");

    // Restoring the link restores the query
    stack.handle.set_field("connected", true).await.unwrap();
    assert!(client.query("TEMP?").await.parse::<f64>().is_ok());

    stack.shutdown().await;
}

#[tokio::test]
async fn test_unsolicited_status_without_request() {
    let stack = spawn_stack(Some(Duration::from_millis(50))).await;
    let mut client = Client::connect(stack.addr).await;

    // Two consecutive reports arrive with no request sent
    for _ in 0..2 {
        let line = client.recv().await;
        assert!(line.starts_with("STATUS "), "unexpected line {line:?}");
        let state = line.rsplit(' ').next().unwrap();
        assert!(state == "HOLDING" || state == "RAMPING");
    }

    stack.shutdown().await;
}

#[tokio::test]
async fn test_reset_idempotent_through_backdoor() {
    let stack = spawn_stack(None).await;
    let mut client = Client::connect(stack.addr).await;

    assert_eq!(client.query("SETP:80.0").await, "OK");
    assert_eq!(client.query("*RST").await, "OK");
    let first = stack.handle.get_field("setpoint").await.unwrap();

    stack.handle.reset().await;
    let second = stack.handle.get_field("setpoint").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(client.query("SETP?").await, "0.00");

    stack.shutdown().await;
}
