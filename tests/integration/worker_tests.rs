//! Worker loop: command ticks, recovery tiers, and supervisor hand-off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use remote_switch::adapters::wifi::LinkEvent;
use remote_switch::app::commands::PendingResponse;
use remote_switch::app::events::ServiceEvent;
use remote_switch::app::plane::ControlPlane;
use remote_switch::app::worker::{PULSE_MS, Worker};
use remote_switch::config::DeviceConfig;
use remote_switch::error::{ActuatorError, RemoteError, SensorError};
use remote_switch::fsm::session::SessionPhase;
use remote_switch::fsm::{SupervisorState, TransitionError, TransitionOutcome};

use crate::mock_hw::{
    Indicator, MockClock, MockDelay, MockHardware, MockLink, MockRemote, MockSystem, VecSink,
    serving_config, wait_until,
};

type TestWorker<'a> = Worker<'a, MockLink, MockRemote, MockHardware, MockDelay, VecSink, MockSystem>;

fn worker<'a>(plane: &'a ControlPlane<MockLink>, remote: MockRemote, sink: VecSink) -> TestWorker<'a> {
    Worker::new(plane, remote, MockHardware::new(), MockDelay, sink, MockSystem::new(150_000))
}

fn online_plane(config: DeviceConfig) -> ControlPlane<MockLink> {
    let plane = ControlPlane::new(config, MockLink::new());
    plane.wifi.handle_event(LinkEvent::AddressAcquired);
    plane
}

// ── Single ticks ──────────────────────────────────────────────

#[test]
fn state_request_commits_supply_reading() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::new();
    let sink = VecSink::new();
    let mut w = worker(&plane, remote.clone(), sink.clone());

    plane.mailbox.post(PendingResponse::ReportState);
    w.tick().unwrap();
    assert_eq!(remote.commits(), vec!["OFF"]);
    assert!(sink.snapshot().contains(&ServiceEvent::Heap(150_000)));

    let mut hw = MockHardware::new();
    hw.supply_on = true;
    let mut w = Worker::new(&plane, remote.clone(), hw, MockDelay, sink, MockSystem::new(1));
    plane.mailbox.post(PendingResponse::ReportState);
    w.tick().unwrap();
    assert_eq!(remote.commits(), vec!["OFF", "ON"]);
}

#[test]
fn press_pulses_relay_and_commits_done() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::new();
    let sink = VecSink::new();
    let mut w = worker(&plane, remote.clone(), sink.clone());

    plane.mailbox.post(PendingResponse::SwitchPress);
    w.tick().unwrap();

    assert_eq!(w.hardware().pulses, vec![PULSE_MS]);
    assert_eq!(remote.commits(), vec!["DONE"]);
    assert_eq!(plane.mailbox.peek(), PendingResponse::None);
}

#[test]
fn idle_tick_emits_nothing() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::new();
    let sink = VecSink::new();
    let mut w = worker(&plane, remote.clone(), sink.clone());

    w.tick().unwrap();
    assert!(sink.snapshot().is_empty());
    assert!(remote.commits().is_empty());
}

#[test]
fn hardware_failures_are_reported_not_committed() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::new();
    let sink = VecSink::new();
    let mut hw = MockHardware::new();
    hw.detect_error = Some(SensorError::AdcReadFailed(-1));
    hw.pulse_error = Some(ActuatorError::GpioWriteFailed(-1));
    let mut w = Worker::new(&plane, remote.clone(), hw, MockDelay, sink.clone(), MockSystem::new(1));

    plane.mailbox.post(PendingResponse::ReportState);
    w.tick().unwrap();
    assert_eq!(plane.mailbox.peek(), PendingResponse::None);
    w.tick().unwrap();
    let report_taken = |e: &ServiceEvent| *e == ServiceEvent::CommandTaken(PendingResponse::ReportState);
    assert_eq!(sink.count(report_taken), 1);

    plane.mailbox.post(PendingResponse::SwitchPress);
    w.tick().unwrap();
    assert_eq!(plane.mailbox.peek(), PendingResponse::None);

    assert!(remote.commits().is_empty());
    let events = sink.snapshot();
    assert!(events.contains(&ServiceEvent::SenseFailed(SensorError::AdcReadFailed(-1))));
    assert!(events.contains(&ServiceEvent::PulseFailed(ActuatorError::GpioWriteFailed(-1))));
}

#[test]
fn failed_check_leaves_the_mailbox_alone() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::with_checks([Err(RemoteError::Transport)]);
    let mut w = worker(&plane, remote, VecSink::new());

    plane.mailbox.post(PendingResponse::SwitchPress);
    assert_eq!(w.tick(), Err(RemoteError::Transport));
    assert_eq!(plane.mailbox.peek(), PendingResponse::SwitchPress);
}

#[test]
fn commit_failure_is_reported() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::new();
    remote.script.lock().unwrap().fail_commits = true;
    let sink = VecSink::new();
    let mut w = worker(&plane, remote, sink.clone());

    plane.mailbox.post(PendingResponse::ReportState);
    w.tick().unwrap();
    assert!(sink.snapshot().contains(&ServiceEvent::CommitFailed {
        event: "OFF",
        error: RemoteError::Transport,
    }));
}

// ── Serving loop ──────────────────────────────────────────────

/// Run `w.step()` on a scoped thread until `quit`, then hand the worker back.
fn drive<'a>(w: TestWorker<'a>, quit: &AtomicBool) -> TestWorker<'a> {
    let mut w = w;
    while !quit.load(Ordering::Relaxed) {
        w.step();
    }
    w
}

#[test]
fn init_failures_retry_until_session_is_established() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::new();
    remote
        .script
        .lock()
        .unwrap()
        .init_results
        .extend([Err(RemoteError::Transport), Err(RemoteError::Auth)]);
    let sink = VecSink::new();
    let quit = AtomicBool::new(false);

    thread::scope(|s| {
        let runner = s.spawn(|| drive(worker(&plane, remote.clone(), sink.clone()), &quit));

        assert_eq!(plane.supervisor.request_start(), Ok(TransitionOutcome::Settled));
        wait_until("session", || {
            sink.count(|e| matches!(e, ServiceEvent::SessionEstablished { .. })) == 1
        });
        assert_eq!(plane.supervisor.request_stop(), Ok(TransitionOutcome::Settled));

        quit.store(true, Ordering::Relaxed);
        let w = runner.join().unwrap();
        assert_eq!(w.session().phase(), SessionPhase::Uninitialized);
    });

    let events = sink.snapshot();
    assert_eq!(remote.inits(), 3);
    assert!(events.contains(&ServiceEvent::InitRetry { failures: 2, error: RemoteError::Auth }));
    assert!(events.contains(&ServiceEvent::SessionEstablished { failures: 2 }));
    assert_eq!(events.last(), Some(&ServiceEvent::Stopped));
}

#[test]
fn failed_update_check_reinitialises_the_session() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::with_checks([Err(RemoteError::Protocol(7))]);
    let sink = VecSink::new();
    let quit = AtomicBool::new(false);

    thread::scope(|s| {
        let runner = s.spawn(|| drive(worker(&plane, remote.clone(), sink.clone()), &quit));

        plane.supervisor.request_start().unwrap();
        wait_until("second session", || remote.inits() == 2);
        plane.supervisor.request_stop().unwrap();

        quit.store(true, Ordering::Relaxed);
        runner.join().unwrap();
    });

    assert_eq!(
        sink.count(|e| *e == ServiceEvent::Resync { error: RemoteError::Protocol(7) }),
        1
    );
}

#[test]
fn remote_press_is_answered_while_serving() {
    let plane = online_plane(serving_config());
    let remote = MockRemote::with_checks([Ok(None), Ok(Some("PRESS\nrelay"))]);
    let sink = VecSink::new();
    let quit = AtomicBool::new(false);

    thread::scope(|s| {
        let runner = s.spawn(|| drive(worker(&plane, remote.clone(), sink.clone()), &quit));

        plane.supervisor.request_start().unwrap();
        wait_until("DONE commit", || remote.commits() == vec!["DONE"]);
        plane.supervisor.request_stop().unwrap();

        quit.store(true, Ordering::Relaxed);
        let w = runner.join().unwrap();
        assert_eq!(w.hardware().pulses, vec![PULSE_MS]);
        assert_eq!(w.hardware().indicator, Indicator::Idle);
    });
}

#[test]
fn start_without_identity_is_refused() {
    let plane = online_plane(DeviceConfig::default());
    let quit = AtomicBool::new(false);

    thread::scope(|s| {
        let runner = s.spawn(|| drive(worker(&plane, MockRemote::new(), VecSink::new()), &quit));

        assert_eq!(
            plane.supervisor.request_start(),
            Err(TransitionError::Rejected { settled: SupervisorState::Stopped })
        );
        assert_eq!(plane.supervisor.state(), SupervisorState::Stopped);

        quit.store(true, Ordering::Relaxed);
        runner.join().unwrap();
    });
}

#[test]
fn stop_is_honoured_while_waiting_for_wifi() {
    // Never associated: the session cannot get past Uninitialized.
    let plane = ControlPlane::new(serving_config(), MockLink::new());
    let remote = MockRemote::new();
    let quit = AtomicBool::new(false);

    thread::scope(|s| {
        let runner = s.spawn(|| drive(worker(&plane, remote.clone(), VecSink::new()), &quit));

        plane.supervisor.request_start().unwrap();
        assert_eq!(plane.supervisor.request_stop(), Ok(TransitionOutcome::Settled));

        quit.store(true, Ordering::Relaxed);
        runner.join().unwrap();
    });
    assert_eq!(remote.inits(), 0);
}

// ── Boot phase ────────────────────────────────────────────────

#[test]
fn boot_autostarts_when_online_and_configured() {
    let plane = online_plane(serving_config());
    let mut w = worker(&plane, MockRemote::new(), VecSink::new());

    w.boot(&MockClock::synced());
    assert!(plane.supervisor.is_serving());
    assert_eq!(w.hardware().indicator, Indicator::Idle);
}

#[test]
fn boot_stays_idle_without_autostart() {
    let mut cfg = serving_config();
    cfg.settings.autostart = false;
    let plane = online_plane(cfg);
    let mut w = worker(&plane, MockRemote::new(), VecSink::new());

    w.boot(&MockClock::synced());
    assert_eq!(plane.supervisor.state(), SupervisorState::Stopped);
}

#[test]
fn boot_tolerates_an_unsynced_clock() {
    let plane = online_plane(serving_config());
    let mut w = worker(&plane, MockRemote::new(), VecSink::new());

    w.boot(&MockClock::unsynced());
    assert!(plane.supervisor.is_serving());
}
