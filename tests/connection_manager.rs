use secrecy::SecretString;
use stationctl::wifi::sim::{Attempt, SimOp, SimulatedDriver};
use stationctl::{
    AuthMode, ConnectionManager, ConnectionRequest, DriverError, ManagerError, Phase, ScanResult,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const REASON_NO_AP_FOUND: u32 = 201;

fn sim() -> SimulatedDriver {
    SimulatedDriver::new()
        .with_event_delay(Duration::from_millis(1))
        .with_scan_duration(Duration::from_millis(5))
}

fn request(max_retry: u32) -> ConnectionRequest {
    ConnectionRequest::new("robot-net", SecretString::from("s3cret-passphrase"), max_retry)
        .unwrap()
        .with_timeout(Duration::from_secs(5))
}

fn disconnects(count: usize) -> impl Iterator<Item = Attempt> {
    std::iter::repeat_n(Attempt::Disconnect(REASON_NO_AP_FOUND), count)
}

#[test]
fn connects_after_retries_within_budget() {
    let address = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
    let driver = Arc::new(sim().with_fallback(Attempt::Silent));
    driver.push_attempts(disconnects(5));
    driver.push_attempts([Attempt::Associate(Some(address))]);
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    let connected = manager.connect(&request(5)).unwrap();

    assert_eq!(connected.ssid, "robot-net");
    assert_eq!(connected.address, Some(address));
    assert!(manager.is_connected());
    let status = manager.status();
    assert_eq!(status.retry_count, 0);
    assert_eq!(status.phase, Phase::Connected);
    assert_eq!(driver.count(SimOp::Connect), 6);
}

#[test]
fn fails_when_disconnects_exceed_budget() {
    let driver = Arc::new(sim());
    driver.push_attempts(disconnects(6));
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    let err = manager.connect(&request(5)).unwrap_err();

    assert!(matches!(
        err,
        ManagerError::ConnectFailed {
            attempts: 5,
            last_reason: Some(REASON_NO_AP_FOUND),
            ..
        }
    ));
    assert!(!manager.is_connected());
    assert_eq!(manager.status().phase, Phase::Failed);
    // The initial attempt plus five retries, none after giving up.
    thread::sleep(Duration::from_millis(20));
    assert_eq!(driver.count(SimOp::Connect), 6);
}

#[test]
fn zero_budget_fails_on_first_disconnect() {
    let driver = Arc::new(sim());
    driver.push_attempts(disconnects(1));
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    let err = manager.connect(&request(0)).unwrap_err();

    assert!(matches!(err, ManagerError::ConnectFailed { attempts: 0, .. }));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(driver.count(SimOp::Connect), 1);
}

#[test]
fn budget_boundary_for_several_limits() {
    for max_retry in [0u32, 1, 3] {
        let driver = Arc::new(sim());
        driver.push_attempts(disconnects(max_retry as usize));
        let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();
        assert!(
            manager.connect(&request(max_retry)).is_ok(),
            "{max_retry} disconnects should still connect"
        );

        let driver = Arc::new(sim());
        driver.push_attempts(disconnects(max_retry as usize + 1));
        let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();
        assert!(
            manager.connect(&request(max_retry)).is_err(),
            "{} disconnects should fail",
            max_retry + 1
        );
    }
}

#[test]
fn scan_returns_driver_order_and_stops_station() {
    let access_points = vec![
        ScanResult {
            ssid: "zeta".to_string(),
            rssi: -80,
            auth_mode: AuthMode::Wpa2Psk,
        },
        ScanResult {
            ssid: "alpha".to_string(),
            rssi: -40,
            auth_mode: AuthMode::Open,
        },
        ScanResult {
            ssid: "mid".to_string(),
            rssi: -60,
            auth_mode: AuthMode::Wpa3Psk,
        },
    ];
    let driver = Arc::new(sim().with_access_points(access_points.clone()));
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    let found = manager.scan_networks().unwrap();

    assert_eq!(found, access_points);
    assert!(!driver.is_running());
    assert_eq!(
        driver.journal(),
        vec![SimOp::RegisterHandler, SimOp::Start, SimOp::Scan, SimOp::Stop]
    );
}

#[test]
fn scan_error_is_propagated_and_station_stopped() {
    let driver = Arc::new(sim());
    driver.fail_next(SimOp::Scan, DriverError::ScanFailed { code: 0x3006 });
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    let err = manager.scan_networks().unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Driver(DriverError::ScanFailed { code: 0x3006 })
    ));
    assert!(!driver.is_running());
    assert_eq!(manager.status().phase, Phase::Idle);
}

#[test]
fn scan_start_failure_is_propagated() {
    let driver = Arc::new(sim());
    driver.fail_next(SimOp::Start, DriverError::StartFailed { code: 0x3001 });
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    assert!(matches!(
        manager.scan_networks(),
        Err(ManagerError::Driver(DriverError::StartFailed { code: 0x3001 }))
    ));
    assert!(!driver.journal().contains(&SimOp::Scan));
}

#[test]
fn new_session_starts_clean_after_failure() {
    let driver = Arc::new(sim());
    driver.push_attempts(disconnects(3));
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    assert!(manager.connect(&request(2)).is_err());
    assert_eq!(manager.status().retry_count, 2);

    let connected = manager.connect(&request(2)).unwrap();
    assert_eq!(connected.ssid, "robot-net");
    assert!(manager.is_connected());
    assert_eq!(manager.status().retry_count, 0);
    assert_eq!(manager.status().max_retry, 2);
}

#[test]
fn new_session_clears_connected_bit() {
    let driver = Arc::new(sim());
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();
    manager.connect(&request(1)).unwrap();
    assert!(manager.is_connected());

    driver.push_attempts(disconnects(2));
    assert!(manager.connect(&request(1)).is_err());
    assert!(!manager.is_connected());
}

#[test]
fn disconnect_stops_station_but_keeps_outcome() {
    let driver = Arc::new(sim());
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();
    manager.connect(&request(1)).unwrap();

    manager.disconnect().unwrap();

    assert!(!driver.is_running());
    assert!(manager.is_connected());
    assert_eq!(manager.status().phase, Phase::Idle);
}

#[test]
fn start_failure_is_reported_from_connect() {
    let driver = Arc::new(sim());
    driver.fail_next(SimOp::Start, DriverError::StartFailed { code: 0x3001 });
    let manager = ConnectionManager::init(Arc::clone(&driver)).unwrap();

    let err = manager.connect(&request(3)).unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Driver(DriverError::StartFailed { code: 0x3001 })
    ));
    assert_eq!(manager.status().phase, Phase::Idle);
}

#[test]
fn handler_registration_failure_fails_init() {
    let driver = Arc::new(sim());
    driver.fail_next(
        SimOp::RegisterHandler,
        DriverError::HandlerRegistrationFailed { code: 1 },
    );

    assert!(matches!(
        ConnectionManager::init(driver),
        Err(ManagerError::Driver(
            DriverError::HandlerRegistrationFailed { code: 1 }
        ))
    ));
}

#[test]
fn is_connected_does_not_block_during_session() {
    let driver = Arc::new(sim().with_event_delay(Duration::from_millis(20)));
    driver.push_attempts(disconnects(3));
    let manager = Arc::new(ConnectionManager::init(Arc::clone(&driver)).unwrap());

    let session = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.connect(&request(5)))
    };

    thread::sleep(Duration::from_millis(30));
    assert!(!manager.is_connected());
    assert_eq!(manager.status().phase, Phase::Connecting);

    assert!(session.join().unwrap().is_ok());
    assert!(manager.is_connected());
}

#[test]
fn scan_waits_for_running_connect() {
    let driver = Arc::new(sim().with_event_delay(Duration::from_millis(10)));
    driver.push_attempts(disconnects(2));
    let manager = Arc::new(ConnectionManager::init(Arc::clone(&driver)).unwrap());

    let session = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.connect(&request(5)))
    };
    while manager.status().phase != Phase::Connecting {
        thread::sleep(Duration::from_millis(1));
    }
    manager.scan_networks().unwrap();

    assert!(session.join().unwrap().is_ok());
    let journal = driver.journal();
    let scan_at = journal.iter().position(|op| *op == SimOp::Scan).unwrap();
    let last_connect = journal.iter().rposition(|op| *op == SimOp::Connect).unwrap();
    assert!(last_connect < scan_at);
}

#[test]
fn disconnect_cancels_running_session() {
    let driver = Arc::new(sim().with_event_delay(Duration::from_millis(50)));
    driver.push_attempts(disconnects(3));
    let manager = Arc::new(ConnectionManager::init(Arc::clone(&driver)).unwrap());

    let session = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.connect(&request(5)))
    };
    while manager.status().phase != Phase::Connecting {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(30));
    manager.disconnect().unwrap();

    let err = session.join().unwrap().unwrap_err();
    assert!(matches!(err, ManagerError::Cancelled { .. }));
    assert!(!manager.is_connected());
    assert_eq!(manager.status().phase, Phase::Idle);

    thread::sleep(Duration::from_millis(100));
    assert!(!driver.is_running());
    assert_eq!(manager.status().phase, Phase::Idle);
}
