//! Session lifecycle through the bridge
//!
//! Drives the application callbacks the way a FIX engine would and checks
//! what reaches the engine's send primitive:
//! - logon triggers discovery and instruments feed the scheduler
//! - logout racing a tick is absorbed and the scheduler goes idle
//! - bad credentials stop the bridge before any session exists

mod common;

use bridge_config::{keys, ConfigError, SessionSettings};
use common::{session, valid_config, EngineSender};
use fix_bridge::{
    Application, BridgeError, MarketDataScheduler, PriceBridge, RequestIds, SessionState,
    TickReport,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_test::assert_ok;
use types::fix::tags;
use types::{Message, MsgType};

fn definition(symbol: &str) -> Message {
    let mut message = Message::new(MsgType::SecurityDefinition);
    message.body.set(tags::SYMBOL, symbol);
    message
}

fn bridge(engine: &Arc<EngineSender>) -> PriceBridge {
    let bridge = PriceBridge::new(valid_config("ws://127.0.0.1:1/"), engine.clone()).unwrap();
    engine.attach(bridge.handoff().clone());
    bridge
}

fn scheduler(bridge: &PriceBridge, engine: &Arc<EngineSender>) -> Arc<MarketDataScheduler> {
    let config = valid_config("ws://127.0.0.1:1/");
    Arc::new(MarketDataScheduler::new(
        config.scheduler,
        bridge.registry().clone(),
        engine.clone(),
        bridge.handoff().clone(),
        Arc::new(RequestIds::new()),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_logon_discovery_then_scheduled_request() {
    let engine = EngineSender::new();
    let bridge = bridge(&engine);
    let app = bridge.application();
    let handle = scheduler(&bridge, &engine).spawn();

    let s = session("TESTSELL1");
    app.on_create(&s);
    app.on_logon(&s);
    assert_eq!(app.state(), SessionState::LoggedOn);

    let discovery = engine.sent_of(MsgType::SecurityDefinitionRequest);
    assert_eq!(discovery.len(), 1);
    assert_eq!(discovery[0].0.body.get(tags::SECURITY_REQ_ID), Some("1"));
    assert_eq!(discovery[0].1, s);

    assert_ok!(app.from_app(&definition("LNUX"), &s));
    assert_eq!(bridge.registry().snapshot(), vec!["LNUX"]);

    sleep(Duration::from_millis(29_000)).await;
    assert!(engine.requested_symbols().is_empty());

    sleep(Duration::from_millis(1_100)).await;
    assert_eq!(engine.requested_symbols(), vec!["LNUX"]);

    let request = &engine.sent_of(MsgType::MarketDataRequest)[0];
    assert_eq!(request.1, s);
    assert!(request.0.body.get(tags::MD_REQ_ID).is_some());

    handle.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_logout_during_tick_returns_scheduler_to_idle() {
    let engine = EngineSender::new();
    let bridge = bridge(&engine);
    let app = bridge.application();
    let scheduler = scheduler(&bridge, &engine);

    let s = session("TESTSELL1");
    app.on_logon(&s);
    assert_ok!(app.from_app(&definition("BCHUSD"), &s));
    assert_ok!(app.from_app(&definition("LNUX"), &s));

    // first send of the tick races the logout; the rest is skipped
    engine.logout_on_next_market_data();
    assert_eq!(
        scheduler.tick(&s),
        TickReport {
            sent: 0,
            failed: 1,
            skipped: 1
        }
    );
    assert!(bridge.handoff().current().is_none());

    let handle = scheduler.clone().spawn();
    sleep(Duration::from_secs(120)).await;
    assert!(engine.requested_symbols().is_empty());
    assert!(!handle.is_finished());

    // next logon re-arms it
    let next = session("TESTSELL2");
    app.on_logon(&next);
    sleep(Duration::from_millis(30_100)).await;
    let requests = engine.sent_of(MsgType::MarketDataRequest);
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|(_, target)| *target == next));

    handle.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_logout_callback_after_reconnect_keeps_new_session() {
    let engine = EngineSender::new();
    let bridge = bridge(&engine);
    let app = bridge.application();

    let old = session("TESTSELL1");
    let new = session("TESTSELL2");
    app.on_logon(&old);
    app.on_logon(&new);
    // late logout for the replaced session
    app.on_logout(&old);

    assert_eq!(bridge.handoff().current(), Some(new.clone()));
    assert_eq!(app.state(), SessionState::LoggedOn);

    app.on_logout(&new);
    assert_eq!(bridge.handoff().current(), None);
    assert_eq!(app.state(), SessionState::LoggedOut);
}

#[test]
fn test_missing_credential_reported_before_any_session() {
    let engine = EngineSender::new();
    let mut config = valid_config("ws://127.0.0.1:1/");
    config.session = SessionSettings::new()
        .with(keys::SENDER_COMP_ID, "TESTBUY1")
        .with(keys::PASSWORD, "secret");

    match PriceBridge::new(config, engine.clone()) {
        Err(BridgeError::Config(ConfigError::MissingSetting { key })) => {
            assert_eq!(key, keys::TARGET_COMP_ID)
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("bridge built without a target comp id"),
    }
    assert!(engine.sent().is_empty());
}

#[test]
fn test_missing_password_in_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    fs::write(
        &path,
        "[session]\nsender_comp_id = \"TESTBUY1\"\ntarget_comp_id = \"TESTSELL1\"\n",
    )
    .unwrap();

    let err = bridge_config::load_config(Some(&path), None).unwrap_err();
    assert!(format!("{:#}", err).contains("password"));
}

#[test]
fn test_outbound_messages_carry_credentials() {
    let engine = EngineSender::new();
    let mut config = valid_config("ws://127.0.0.1:1/");
    config.session.set(keys::USERNAME, "trader");
    config.session.set(keys::CLIENT_ID, "CLIENT7");
    let bridge = PriceBridge::new(config, engine).unwrap();
    let app = bridge.application();
    let s = session("TESTSELL1");

    let mut logon = Message::new(MsgType::Logon);
    app.to_admin(&mut logon, &s);
    assert_eq!(logon.header.get(tags::PASSWORD), Some("secret"));
    assert_eq!(logon.header.get(tags::USERNAME), Some("trader"));

    let mut request = Message::new(MsgType::MarketDataRequest);
    app.to_app(&mut request, &s);
    assert_eq!(request.header.get(tags::CLIENT_ID), Some("CLIENT7"));
}
