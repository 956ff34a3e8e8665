//! Client/Server Tests
//!
//! These tests verify:
//! - Every client call against a live server on an ephemeral port
//! - Typed errors survive the wire
//! - Engine and client give the same results for the same sequence
//! - Connection limit, malformed frames, and the expiry sweep
//! - Concurrent clients on one key
//! - Busy workers never hold up a new client
//! - A failed exchange leaves the client unusable

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nimbuskv::network::{Server, ShutdownHandle};
use nimbuskv::protocol::{
    encode_error, encode_reply, read_command, read_response, write_response, Reply, Status,
};
use nimbuskv::record::TTL_NEVER_EXPIRE;
use nimbuskv::{
    Client, Config, ElementFilter, Engine, Key, NimbusError, Operation, Operations, Record,
    RemovePolicy, Result, Value, ValueType, WritePolicy,
};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    engine: Arc<Engine>,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start(config: Config) -> Self {
        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Server::bind(config, Arc::clone(&engine)).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            engine,
            shutdown,
            thread: Some(thread),
        }
    }

    fn client(&self) -> Client {
        let mut client = Client::connect(&self.addr.to_string()).unwrap();
        client.set_timeouts(5000, 5000).unwrap();
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn test_config() -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .worker_threads(4)
        .build()
}

fn key(user_key: &str) -> Key {
    Key::new("test", "net", user_key)
}

// =============================================================================
// Basic Calls
// =============================================================================

#[test]
fn test_ping() {
    let server = TestServer::start(test_config());
    let mut client = server.client();

    client.ping().unwrap();
    client.ping().unwrap();
}

#[test]
fn test_connect_refused_is_connectivity_error() {
    let addr = {
        let server = TestServer::start(test_config());
        server.addr
    };
    // Give the listener a moment to close
    thread::sleep(Duration::from_millis(50));

    match Client::connect(&addr.to_string()) {
        Err(NimbusError::Connectivity(_)) => {}
        Ok(mut client) => assert!(client.ping().is_err()),
        Err(e) => panic!("unexpected error: {}", e),
    }
}

#[test]
fn test_put_get_select_exists_remove() {
    let server = TestServer::start(test_config());
    let mut client = server.client();
    let k = key("foo");

    let record = Record::new()
        .with_bin("a", 123)
        .with_bin("b", "abc")
        .with_bin("c", 456)
        .with_bin("d", "def");
    assert_eq!(client.put(&k, &record, &WritePolicy::new()).unwrap(), 1);

    let rec = client.get(&k).unwrap();
    assert_eq!(rec.num_bins(), 4);
    assert_eq!(rec.get_int("a"), Some(123));

    let rec = client.select(&k, &["a", "b"]).unwrap();
    assert_eq!(rec.num_bins(), 2);
    assert_eq!(rec.get_str("b"), Some("abc"));

    let meta = client.exists(&k).unwrap();
    assert_eq!(meta.generation, 1);
    assert!(meta.ttl > 0);

    client.remove(&k, &RemovePolicy::new()).unwrap();
    assert!(matches!(client.get(&k), Err(NimbusError::RecordNotFound)));
    assert!(matches!(
        client.remove(&k, &RemovePolicy::new()),
        Err(NimbusError::RecordNotFound)
    ));
}

#[test]
fn test_client_sees_engine_writes() {
    let server = TestServer::start(test_config());
    let mut client = server.client();
    let k = key("shared");

    server
        .engine
        .put(&k, &Record::new().with_bin("x", 1), &WritePolicy::new())
        .unwrap();

    assert_eq!(client.get(&k).unwrap().get_int("x"), Some(1));
}

#[test]
fn test_send_key_over_wire() {
    let server = TestServer::start(test_config());
    let mut client = server.client();
    let k = key("with_key");
    let bytes = vec![7u8; 20000];

    client
        .put(
            &k,
            &Record::new().with_bin("a", bytes.clone()),
            &WritePolicy::new().send_key(),
        )
        .unwrap();

    let rec = client.get(&k).unwrap();
    assert_eq!(rec.key, Some(k.user_key().clone()));
    assert_eq!(rec.get_bytes("a"), Some(bytes.as_slice()));
}

// =============================================================================
// Errors Over The Wire
// =============================================================================

#[test]
fn test_generation_mismatch_over_wire() {
    let server = TestServer::start(test_config());
    let mut client = server.client();
    let k = key("gen");

    client
        .put(&k, &Record::new().with_bin("a", 1), &WritePolicy::new())
        .unwrap();

    let err = client
        .put(
            &k,
            &Record::new().with_bin("a", 2),
            &WritePolicy::new().generation_eq(2),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        NimbusError::RecordGenerationMismatch {
            expected: 2,
            actual: 1
        }
    ));

    let err = client
        .remove(&k, &RemovePolicy::new().generation_eq(9))
        .unwrap_err();
    assert!(matches!(
        err,
        NimbusError::RecordGenerationMismatch {
            expected: 9,
            actual: 1
        }
    ));
}

#[test]
fn test_request_errors_over_wire() {
    let server = TestServer::start(test_config());
    let mut client = server.client();

    let err = client
        .put(
            &Key::new("missing", "net", "k"),
            &Record::new().with_bin("a", 1),
            &WritePolicy::new(),
        )
        .unwrap_err();
    assert!(matches!(err, NimbusError::NamespaceNotFound(ref ns) if ns == "missing"));

    let err = client
        .put(&key("k"), &Record::new(), &WritePolicy::new())
        .unwrap_err();
    assert!(matches!(err, NimbusError::Parameter(_)));

    // The connection stays usable after errors
    assert!(!client.is_broken());
    client.ping().unwrap();
}

#[test]
fn test_operate_over_wire() {
    let server = TestServer::start(test_config());
    let mut client = server.client();
    let k = key("ops");

    let record = Record::new()
        .with_bin("a", 123)
        .with_bin("b", "abc")
        .with_bin("d", "def");
    client.put(&k, &record, &WritePolicy::new()).unwrap();

    let ops = Operations::new()
        .incr("a", 321)
        .append("b", "def")
        .prepend("d", "abc")
        .read("a")
        .read("d");
    let rec = client
        .operate(&k, &ops, &WritePolicy::new())
        .unwrap()
        .unwrap();

    assert_eq!(rec.get_int("a"), Some(444));
    assert_eq!(rec.get_str("d"), Some("abcdef"));
    assert_eq!(rec.generation, 2);
    assert_eq!(client.get(&k).unwrap().get_str("b"), Some("abcdef"));

    let err = client
        .operate(&k, &Operations::new().incr("b", 1), &WritePolicy::new())
        .unwrap_err();
    assert!(matches!(
        err,
        NimbusError::BinTypeMismatch {
            expected: ValueType::Integer,
            found: ValueType::String,
            ..
        }
    ));
}

#[test]
fn test_llist_over_wire() {
    let server = TestServer::start(test_config());
    let mut client = server.client();
    let k = key("list");

    client.llist_add(&k, "myllist", 12000).unwrap();
    client.llist_add(&k, "myllist", 2000).unwrap();
    client.llist_add(&k, "myllist", 22000).unwrap();
    client
        .llist_add_all(&k, "myllist", vec![Value::from(7000), Value::from(30000)])
        .unwrap();
    assert_eq!(client.llist_size(&k, "myllist").unwrap(), 5);

    assert_eq!(
        client.llist_filter(&k, "myllist", None).unwrap(),
        vec![
            Value::from(2000),
            Value::from(7000),
            Value::from(12000),
            Value::from(22000),
            Value::from(30000)
        ]
    );
    assert_eq!(
        client
            .llist_filter(&k, "myllist", Some(&ElementFilter::range(5000, 20000)))
            .unwrap(),
        vec![Value::from(7000), Value::from(12000)]
    );

    let err = client.llist_add(&k, "myllist", "llist value").unwrap_err();
    assert!(matches!(err, NimbusError::BinTypeMismatch { .. }));

    assert_eq!(
        client.llist_find(&k, "myllist", 2000).unwrap(),
        vec![Value::from(2000)]
    );
    assert!(client.llist_exists(&k, "myllist", 2000).unwrap());

    client.llist_remove(&k, "myllist", 2000).unwrap();
    assert!(!client.llist_exists(&k, "myllist", 2000).unwrap());
    assert!(matches!(
        client.llist_remove(&k, "myllist", 2000),
        Err(NimbusError::ElementNotFound { .. })
    ));
    assert!(matches!(
        client.llist_find(&k, "myllist", 2000),
        Err(NimbusError::ElementNotFound { .. })
    ));

    client.llist_destroy(&k, "myllist").unwrap();
    assert!(matches!(
        client.llist_size(&k, "myllist"),
        Err(NimbusError::BinNotFound { .. })
    ));
}

// =============================================================================
// Engine / Client Parity
// =============================================================================

/// The subset of calls the parity scenario drives
trait Store {
    fn put(&mut self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<u32>;
    fn get(&mut self, key: &Key) -> Result<Record>;
    fn remove(&mut self, key: &Key, policy: &RemovePolicy) -> Result<()>;
    fn operate(&mut self, key: &Key, ops: &[Operation], policy: &WritePolicy)
        -> Result<Option<Record>>;
    fn llist_add(&mut self, key: &Key, bin: &str, value: Value) -> Result<()>;
    fn llist_filter(&mut self, key: &Key, bin: &str) -> Result<Vec<Value>>;
    fn llist_size(&mut self, key: &Key, bin: &str) -> Result<u64>;
}

impl Store for Engine {
    fn put(&mut self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<u32> {
        Engine::put(self, key, record, policy)
    }
    fn get(&mut self, key: &Key) -> Result<Record> {
        Engine::get(self, key)
    }
    fn remove(&mut self, key: &Key, policy: &RemovePolicy) -> Result<()> {
        Engine::remove(self, key, policy)
    }
    fn operate(
        &mut self,
        key: &Key,
        ops: &[Operation],
        policy: &WritePolicy,
    ) -> Result<Option<Record>> {
        Engine::operate(self, key, ops, policy)
    }
    fn llist_add(&mut self, key: &Key, bin: &str, value: Value) -> Result<()> {
        Engine::llist_add(self, key, bin, value)
    }
    fn llist_filter(&mut self, key: &Key, bin: &str) -> Result<Vec<Value>> {
        Engine::llist_filter(self, key, bin, None)
    }
    fn llist_size(&mut self, key: &Key, bin: &str) -> Result<u64> {
        Engine::llist_size(self, key, bin)
    }
}

impl Store for Client {
    fn put(&mut self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<u32> {
        Client::put(self, key, record, policy)
    }
    fn get(&mut self, key: &Key) -> Result<Record> {
        Client::get(self, key)
    }
    fn remove(&mut self, key: &Key, policy: &RemovePolicy) -> Result<()> {
        Client::remove(self, key, policy)
    }
    fn operate(
        &mut self,
        key: &Key,
        ops: &[Operation],
        policy: &WritePolicy,
    ) -> Result<Option<Record>> {
        Client::operate(self, key, ops, policy)
    }
    fn llist_add(&mut self, key: &Key, bin: &str, value: Value) -> Result<()> {
        Client::llist_add(self, key, bin, value)
    }
    fn llist_filter(&mut self, key: &Key, bin: &str) -> Result<Vec<Value>> {
        Client::llist_filter(self, key, bin, None)
    }
    fn llist_size(&mut self, key: &Key, bin: &str) -> Result<u64> {
        Client::llist_size(self, key, bin)
    }
}

/// Run a fixed sequence and record every outcome
fn scenario(store: &mut dyn Store) -> Vec<String> {
    let k = key("parity");
    let never = |r: Record| r.with_ttl(TTL_NEVER_EXPIRE);
    let mut log = Vec::new();

    log.push(format!("{:?}", store.get(&k)));
    log.push(format!(
        "{:?}",
        store.put(&k, &never(Record::new().with_bin("n", 1).with_bin("s", "x")), &WritePolicy::new())
    ));
    log.push(format!(
        "{:?}",
        store.put(&k, &never(Record::new().with_bin("n", 5)), &WritePolicy::new().generation_eq(7))
    ));
    log.push(format!(
        "{:?}",
        store.operate(
            &k,
            &Operations::new().incr("n", 10).append("s", "yz").read("n").read("s"),
            &WritePolicy::new().generation_eq(1),
        )
    ));
    log.push(format!(
        "{:?}",
        store.operate(&k, &Operations::new().append("n", "bad"), &WritePolicy::new())
    ));
    log.push(format!("{:?}", store.llist_add(&k, "l", Value::from(3))));
    log.push(format!("{:?}", store.llist_add(&k, "l", Value::from(1))));
    log.push(format!("{:?}", store.llist_add(&k, "l", Value::from("no"))));
    log.push(format!("{:?}", store.llist_filter(&k, "l")));
    log.push(format!("{:?}", store.llist_size(&k, "missing")));
    log.push(format!("{:?}", store.get(&k)));
    log.push(format!(
        "{:?}",
        store.remove(&k, &RemovePolicy::new().generation_eq(1))
    ));
    log.push(format!("{:?}", store.remove(&k, &RemovePolicy::new())));
    log.push(format!("{:?}", store.get(&k)));
    log
}

#[test]
fn test_engine_and_client_agree() {
    let mut engine = Engine::open(Config::default()).unwrap();
    let expected = scenario(&mut engine);

    let server = TestServer::start(test_config());
    let mut client = server.client();
    let actual = scenario(&mut client);

    assert_eq!(actual, expected);
    // Sanity check that the scenario exercised both outcomes
    assert!(expected.iter().any(|line| line.starts_with("Ok")));
    assert!(expected.iter().any(|line| line.starts_with("Err")));
}

// =============================================================================
// Server Behavior
// =============================================================================

#[test]
fn test_malformed_frame_gets_error_and_server_keeps_running() {
    let server = TestServer::start(test_config());

    let mut raw = TcpStream::connect(server.addr).unwrap();
    raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    raw.write_all(&[0xFF, 0x00, 0x00, 0x00, 0x00]).unwrap();

    let response = read_response(&mut raw).unwrap();
    assert_eq!(response.status, Status::ServerError);

    let mut client = server.client();
    client.ping().unwrap();
}

#[test]
fn test_connection_limit() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_connections(1)
        .worker_threads(2)
        .build();
    let server = TestServer::start(config);

    let mut first = server.client();
    first.ping().unwrap();

    let second = Client::connect(&server.addr.to_string());
    if let Ok(mut second) = second {
        second.set_timeouts(5000, 5000).unwrap();
        let err = second.ping().unwrap_err();
        assert!(matches!(
            err,
            NimbusError::Server(_) | NimbusError::Connectivity(_)
        ));
    }

    // The first connection is unaffected
    first.ping().unwrap();
}

#[test]
fn test_concurrent_clients_increment_one_key() {
    let server = TestServer::start(test_config());
    let k = key("counter");
    server
        .engine
        .put(&k, &Record::new().with_bin("n", 0), &WritePolicy::new())
        .unwrap();

    let clients = 4;
    let per_client = 50;
    let mut handles = vec![];

    for _ in 0..clients {
        let mut client = server.client();
        let k = k.clone();
        handles.push(thread::spawn(move || {
            let ops = Operations::new().incr("n", 1);
            for _ in 0..per_client {
                client.operate(&k, &ops, &WritePolicy::new()).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let rec = server.engine.get(&k).unwrap();
    assert_eq!(rec.get_int("n"), Some(clients * per_client));
    assert_eq!(rec.generation as i64, clients * per_client + 1);
}

#[test]
fn test_background_sweep_evicts_expired_records() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .expiry_scan_interval_ms(50)
        .build();
    let server = TestServer::start(config);
    let mut client = server.client();

    for i in 0..5 {
        let record = Record::new().with_bin("a", i).with_ttl(1);
        client
            .put(&key(&format!("ttl{}", i)), &record, &WritePolicy::new())
            .unwrap();
    }
    assert_eq!(server.engine.record_count("test").unwrap(), 5);

    thread::sleep(Duration::from_millis(1300));

    assert_eq!(server.engine.record_count("test").unwrap(), 0);
    // Nothing left for a manual sweep
    assert_eq!(server.engine.evict_expired(), 0);
}

#[test]
fn test_busy_workers_do_not_block_new_clients() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .worker_threads(1)
        .build();
    let server = TestServer::start(config);

    // Holds the only worker while it stays connected
    let mut first = server.client();
    first.ping().unwrap();

    let mut second = Client::connect(&server.addr.to_string()).unwrap();
    second.set_timeouts(1000, 1000).unwrap();
    second.ping().unwrap();
    second
        .put(&key("other"), &Record::new().with_bin("a", 1), &WritePolicy::new())
        .unwrap();

    let mut third = Client::connect(&server.addr.to_string()).unwrap();
    third.set_timeouts(1000, 1000).unwrap();
    assert_eq!(third.get(&key("other")).unwrap().get_int("a"), Some(1));

    first.ping().unwrap();
}

// =============================================================================
// Broken Connections
// =============================================================================

#[test]
fn test_timed_out_call_leaves_client_unusable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Answers the first command late, and the second with an error
    let slow_server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_command(&mut stream).unwrap();
        thread::sleep(Duration::from_millis(400));
        let _ = write_response(&mut stream, &encode_reply(&Reply::Done).unwrap());

        if read_command(&mut stream).is_ok() {
            let _ = write_response(&mut stream, &encode_error(&NimbusError::RecordNotFound));
        }
    });

    let mut client = Client::connect(&addr.to_string()).unwrap();
    client.set_timeouts(100, 1000).unwrap();
    let k = key("late");

    let first = client.remove(&k, &RemovePolicy::new());
    assert!(matches!(first, Err(NimbusError::Connectivity(_))));
    assert!(client.is_broken());

    // Let the late reply arrive; it must never be read as the next answer
    thread::sleep(Duration::from_millis(500));

    let second = client.remove(&k, &RemovePolicy::new());
    assert!(matches!(
        second,
        Err(NimbusError::Connectivity(ref msg)) if msg == "connection is unusable"
    ));
    assert!(matches!(client.ping(), Err(NimbusError::Connectivity(_))));

    slow_server.join().unwrap();
}
