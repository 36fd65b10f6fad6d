// Console tests — the driver that wires poller views and operator input to
// the overlay and dispatcher.
//
// The poller runs on a paused tokio clock; overlay timing is walked with
// synthetic instants passed to the console.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crowdwatch::api::models::{AlertStatus, QuickAction, ResponseValue};
use crowdwatch::console::{Console, OperatorInput};
use crowdwatch::sos::dispatcher::ResponseDispatcher;
use crowdwatch::sos::overlay::OverlayPhase;
use crowdwatch::sos::poller::{AlertPoller, PollerSettings};
use support::{recording_engine, sos, FakeApi, RecordingOutput};

const EVENT: &str = "evt";

struct Rig {
    api: Arc<FakeApi>,
    output: Arc<RecordingOutput>,
    poller: AlertPoller,
    console: Console,
}

/// A console watching `EVENT`, with `a1` already fetched and presented.
async fn watching_a1(t0: Instant) -> Rig {
    let api = FakeApi::new();
    let (engine, output) = recording_engine();
    let poller = AlertPoller::new(api.clone(), engine, PollerSettings::default());
    let mut console = Console::new(poller.clone(), ResponseDispatcher::new(poller.clone()));

    api.set_alerts(EVENT, vec![sos("a1")]);
    poller.start_polling(EVENT);
    tokio::time::sleep(Duration::from_millis(10)).await;

    console.on_view(&poller.view(), t0);
    Rig {
        api,
        output,
        poller,
        console,
    }
}

fn presented(console: &Console) -> Option<String> {
    console.overlay().alert().map(|a| a.id.clone())
}

#[tokio::test(start_paused = true)]
async fn latest_alert_is_presented() {
    let t0 = Instant::now();
    let rig = watching_a1(t0).await;

    assert_eq!(presented(&rig.console).as_deref(), Some("a1"));
    assert_eq!(rig.console.overlay().phase(t0), OverlayPhase::ShownStatic);
    assert!(rig.poller.audio().is_playing());
}

#[tokio::test(start_paused = true)]
async fn new_sos_waits_while_responding_then_shows() {
    let t0 = Instant::now();
    let mut rig = watching_a1(t0).await;

    let t = t0 + Duration::from_millis(100);
    rig.console
        .on_input(OperatorInput::Action(QuickAction::Acknowledged), t)
        .await;
    assert_eq!(rig.console.overlay().phase(t), OverlayPhase::Responding);

    // a2 arrives mid-response and becomes the poller's latest alert
    rig.api.set_alerts(EVENT, vec![sos("a1"), sos("a2")]);
    rig.poller.refresh().await.unwrap();
    rig.console.on_view(&rig.poller.view(), t + Duration::from_millis(100));
    assert_eq!(presented(&rig.console).as_deref(), Some("a1"));

    // Response lands, then the next view brings a2 up
    let t_emit = t + Duration::from_millis(500);
    rig.console.on_timer(t_emit).await;
    assert_eq!(
        rig.api.resolves(),
        vec![(
            "a1".to_string(),
            Some(ResponseValue::Action(QuickAction::Acknowledged))
        )]
    );

    rig.console.on_view(&rig.poller.view(), t_emit);
    assert_eq!(presented(&rig.console).as_deref(), Some("a2"));
    assert_eq!(rig.console.overlay().phase(t_emit), OverlayPhase::ShownStatic);
}

#[tokio::test(start_paused = true)]
async fn confirmed_response_plays_the_chime() {
    let t0 = Instant::now();
    let mut rig = watching_a1(t0).await;
    assert_eq!(rig.output.start_count(), 1);

    let t = t0 + Duration::from_millis(1600);
    rig.console.on_input(OperatorInput::Drag(100), t).await;
    assert!(!rig.poller.audio().is_playing());

    rig.console.on_timer(t + Duration::from_millis(500)).await;

    assert_eq!(rig.output.start_count(), 2);
    let durations = rig.output.durations.lock().unwrap().clone();
    assert!(durations[1] < Duration::from_secs(1));
    // The chime isn't a warning tone
    assert!(!rig.poller.audio().is_playing());

    rig.console
        .on_view(&rig.poller.view(), t + Duration::from_millis(600));
    assert_eq!(presented(&rig.console), None);
}

#[tokio::test(start_paused = true)]
async fn failed_response_keeps_the_alert_up_without_chime() {
    let t0 = Instant::now();
    let mut rig = watching_a1(t0).await;
    rig.api.fail_resolves(true);

    let t = t0 + Duration::from_millis(1600);
    rig.console.on_input(OperatorInput::Drag(100), t).await;
    rig.console.on_timer(t + Duration::from_millis(500)).await;

    assert_eq!(rig.output.start_count(), 1);
    let after = t + Duration::from_millis(600);
    rig.console.on_view(&rig.poller.view(), after);
    assert_eq!(presented(&rig.console).as_deref(), Some("a1"));
    assert_eq!(rig.console.overlay().phase(after), OverlayPhase::ShownInteractive);
    assert_eq!(rig.console.overlay().drag_value(), 0);
}

#[tokio::test(start_paused = true)]
async fn map_action_resolves_and_the_overlay_closes_on_next_view() {
    let t0 = Instant::now();
    let mut rig = watching_a1(t0).await;

    let t = t0 + Duration::from_millis(200);
    rig.console
        .on_input(OperatorInput::Action(QuickAction::ViewMap), t)
        .await;

    // Sent straight away, no Responding delay
    assert_eq!(
        rig.api.resolves(),
        vec![(
            "a1".to_string(),
            Some(ResponseValue::Action(QuickAction::ViewMap))
        )]
    );
    assert_eq!(rig.output.start_count(), 1);

    let view = rig.poller.view();
    assert!(view.latest_alert.is_none());
    assert_eq!(view.alerts[0].status, AlertStatus::Resolved);

    rig.console.on_view(&view, t + Duration::from_millis(10));
    assert_eq!(presented(&rig.console), None);
}

#[tokio::test(start_paused = true)]
async fn dismiss_hides_and_snoozes_without_resolving() {
    let t0 = Instant::now();
    let mut rig = watching_a1(t0).await;

    rig.console.on_input(OperatorInput::Dismiss, t0).await;

    assert_eq!(presented(&rig.console), None);
    assert!(rig.api.resolves().is_empty());
    assert!(!rig.poller.audio().is_playing());
    assert!(!rig.poller.is_known("a1"));
}

#[tokio::test(start_paused = true)]
async fn mute_silences_and_hides_on_next_view() {
    let t0 = Instant::now();
    let mut rig = watching_a1(t0).await;

    rig.console.on_input(OperatorInput::Mute, t0).await;
    assert!(!rig.poller.audio().is_playing());

    rig.console.on_view(&rig.poller.view(), t0);
    assert_eq!(presented(&rig.console), None);
    assert!(rig.poller.is_known("a1"));
}

#[tokio::test(start_paused = true)]
async fn quit_ends_the_session() {
    let t0 = Instant::now();
    let mut rig = watching_a1(t0).await;

    assert!(rig.console.on_input(OperatorInput::Help, t0).await);
    assert!(!rig.console.on_input(OperatorInput::Quit, t0).await);
}
