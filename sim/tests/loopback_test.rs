use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use arm_link::drivers::{ArmDriver, ArmDriverConfig, CommandSink, DriverEvent, LinkState};
use arm_link::packets::{ArmCommand, JogAxis, JogDirection};
use arm_link::{ArmClient, JogStopCause, Keyframe, Pose, UiEvent};
use sim::{serve, Simulator};

async fn start_sim() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(listener, Simulator::new()));
    port
}

fn config(port: u16) -> ArmDriverConfig {
    ArmDriverConfig {
        reconnect_delay_ms: 50,
        ..ArmDriverConfig::new("127.0.0.1".to_string(), port)
    }
}

/// Feeds driver events to the client until `done` holds.
async fn pump_until(
    client: &mut ArmClient,
    events: &mut broadcast::Receiver<DriverEvent>,
    what: &str,
    done: impl Fn(&ArmClient) -> bool,
) {
    let waited = timeout(Duration::from_secs(5), async {
        while !done(client) {
            assert!(client.pump(events).await, "driver went away");
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

#[tokio::test]
async fn test_client_round_trip_against_simulator() {
    let port = start_sim().await;
    let driver = Arc::new(ArmDriver::connect(config(port)).await.unwrap());
    let mut events = driver.subscribe();
    let sink: Arc<dyn CommandSink> = driver.clone();
    let mut client = ArmClient::new(sink);

    // Connect resync: get + act_list come back as pose and act_list.
    pump_until(&mut client, &mut events, "resync", |c| {
        c.link_state() == LinkState::Connected && c.pose().revision() > 0 && c.library().refreshes() > 0
    })
    .await;
    assert_eq!(client.pose().snapshot(), Pose::STARTUP);
    assert!(client.library().is_empty());

    client.handle_ui(UiEvent::SetJoint { index: 0, degrees: 45 }).unwrap();
    client
        .handle_ui(UiEvent::JogPress {
            axis: JogAxis::Yaw,
            direction: JogDirection::Positive,
        })
        .unwrap();
    client.handle_ui(UiEvent::JogRelease(JogStopCause::Release)).unwrap();
    pump_until(&mut client, &mut events, "jogged pose", |c| c.pose().snapshot().get(0) == Some(47)).await;

    client.handle_ui(UiEvent::SetActionName("pick_1".into())).unwrap();
    client.handle_ui(UiEvent::AddFrame { hold_ms: Some(100) }).unwrap();
    client.handle_ui(UiEvent::SetJoint { index: 1, degrees: 30 }).unwrap();
    client.handle_ui(UiEvent::AddFrame { hold_ms: Some(200) }).unwrap();
    let recorded = client.recorder().frames().to_vec();
    client.handle_ui(UiEvent::SaveAction).unwrap();
    pump_until(&mut client, &mut events, "saved action", |c| c.library().contains("pick_1")).await;
    assert!(client.status_log().any(|msg| msg.contains("saved pick_1")));

    client.handle_ui(UiEvent::NewAction).unwrap();
    client.handle_ui(UiEvent::LoadAction("pick_1".into())).unwrap();
    pump_until(&mut client, &mut events, "loaded action", |c| c.recorder().name() == "pick_1").await;
    assert_eq!(client.recorder().frames(), &recorded[..]);
    assert_eq!(recorded[1], Keyframe::new(Pose([47, 30, 180, 180, 90, 90]), 200));

    client.handle_ui(UiEvent::DeleteAction("pick_1".into())).unwrap();
    pump_until(&mut client, &mut events, "deleted action", |c| !c.library().contains("pick_1")).await;

    driver.shutdown();
    pump_until(&mut client, &mut events, "disconnect", |c| c.link_state() == LinkState::Disconnected).await;
    assert!(!driver.is_open());
}

#[tokio::test]
async fn test_run_reports_play_state() {
    let port = start_sim().await;
    let driver = Arc::new(ArmDriver::connect(config(port)).await.unwrap());
    let mut events = driver.subscribe();
    let sink: Arc<dyn CommandSink> = driver.clone();
    let mut client = ArmClient::new(sink);
    pump_until(&mut client, &mut events, "connect", |c| c.link_state() == LinkState::Connected).await;

    client.handle_ui(UiEvent::SetActionName("wave".into())).unwrap();
    client.handle_ui(UiEvent::AddFrame { hold_ms: Some(300) }).unwrap();
    client.handle_ui(UiEvent::SaveAction).unwrap();
    pump_until(&mut client, &mut events, "saved action", |c| c.library().contains("wave")).await;

    client.handle_ui(UiEvent::RunAction("wave".into())).unwrap();
    pump_until(&mut client, &mut events, "playback start", |c| c.play_state() == "RUNNING").await;
    client.handle_ui(UiEvent::Stop).unwrap();
    pump_until(&mut client, &mut events, "playback stop", |c| c.play_state() == "IDLE").await;

    driver.shutdown();
}

#[tokio::test]
async fn test_unreachable_controller_reports_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let driver = ArmDriver::connect(config(port)).await.unwrap();
    let mut events = driver.subscribe();

    let event = timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
    assert_eq!(event, DriverEvent::Disconnected);
    assert!(!driver.is_open());

    // Sends while closed are dropped without error.
    driver.send(arm_link::packets::ArmCommand::GetPose);
    driver.shutdown();
}

/// Controller that hangs up once the first connection has resynced, then
/// reports every command seen on the second one.
fn start_flaky_controller(listener: TcpListener) -> mpsc::UnboundedReceiver<ArmCommand> {
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut first = accept_async(stream).await.unwrap();
        let mut resync = 0;
        while let Some(Ok(Message::Text(text))) = first.next().await {
            if matches!(ArmCommand::parse(&text), Ok(ArmCommand::GetPose | ArmCommand::ActList)) {
                resync += 1;
            }
            if resync == 2 {
                break;
            }
        }
        let _ = first.close(None).await;
        drop(first);

        let (stream, _) = listener.accept().await.unwrap();
        let mut second = accept_async(stream).await.unwrap();
        while let Some(Ok(Message::Text(text))) = second.next().await {
            if let Ok(command) = ArmCommand::parse(&text) {
                let _ = seen_tx.send(command);
            }
        }
    });
    seen_rx
}

#[tokio::test]
async fn test_driver_redials_and_resyncs_after_remote_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut seen = start_flaky_controller(listener);

    let driver = Arc::new(ArmDriver::connect(config(port)).await.unwrap());
    let mut events = driver.subscribe();
    let sink: Arc<dyn CommandSink> = driver.clone();
    let mut client = ArmClient::new(sink);

    let mut history = Vec::new();
    let reconnected = timeout(Duration::from_secs(5), async {
        while history.iter().filter(|e| **e == DriverEvent::Connected).count() < 2 {
            let event = events.recv().await.unwrap();
            client.handle_driver(event.clone());
            history.push(event);
        }
    })
    .await;
    assert!(reconnected.is_ok(), "driver never redialled");
    let first_drop = history.iter().position(|e| *e == DriverEvent::Disconnected);
    let second_connect = history.iter().rposition(|e| *e == DriverEvent::Connected);
    assert!(first_drop.is_some() && first_drop < second_connect);
    assert_eq!(client.link_state(), LinkState::Connected);

    let mut resync = Vec::new();
    let resynced = timeout(Duration::from_secs(5), async {
        while resync.len() < 2 {
            resync.push(seen.recv().await.unwrap());
        }
    })
    .await;
    assert!(resynced.is_ok(), "no resync on the second connection");
    assert_eq!(resync, vec![ArmCommand::GetPose, ArmCommand::ActList]);

    driver.shutdown();
}
