//! Client adapter against a scripted host over loopback TCP.

use hostbridge_link::{CallGate, ConnectionSettings, HostAdapter, Link, MemorySink, TcpLink};
use hostbridge_protocol::{
    CommandArgs, CommandEnvelope, DomainObject, Event, FilterQuery, PushType, ResultPackage,
    Severity, Value, WireMessage,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct ScriptedHost {
    commands: Arc<TcpLink>,
    results: Arc<TcpLink>,
    settings: ConnectionSettings,
}

/// Echoes pushed objects back with host ids and reports one removal per
/// delete. Anything else is answered with an error event.
fn scripted_host() -> ScriptedHost {
    let commands = Arc::new(TcpLink::bind("127.0.0.1:0").unwrap());
    let results = Arc::new(TcpLink::bind("127.0.0.1:0").unwrap());
    let settings = ConnectionSettings::new()
        .with_push_port(commands.address().port())
        .with_pull_port(results.address().port())
        .with_probe_timeout(Duration::from_secs(5))
        .with_max_minutes_to_wait(0.5);

    let reply_link = Arc::clone(&results);
    commands
        .on_receive(Box::new(move |body| {
            let Ok(WireMessage::Command(envelope)) = WireMessage::decode(&body) else {
                return;
            };
            let mut package = ResultPackage::new(envelope.correlation_id);
            match envelope.args().unwrap() {
                CommandArgs::ConnectionCheck => {}
                CommandArgs::Push { objects, .. } => {
                    package.data = objects
                        .into_iter()
                        .zip(1..)
                        .map(|(mut o, id)| {
                            o.host_id = Some(id);
                            o.to_value()
                        })
                        .collect();
                    package.events.push(Event::note("pushed"));
                }
                CommandArgs::Delete { .. } => {
                    package.data = vec![Value::Integer(1)];
                    package.events.push(Event::warning("deleted"));
                }
                _ => package.events.push(Event::error("unsupported")),
            }
            let bytes = WireMessage::Result(package).encode().unwrap();
            reply_link.send(&bytes).unwrap();
        }))
        .unwrap();

    ScriptedHost {
        commands,
        results,
        settings,
    }
}

fn wait_for_peers(host: &ScriptedHost) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while host.commands.peer_count() == 0 || host.results.peer_count() == 0 {
        assert!(Instant::now() < deadline, "client never connected");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn push_round_trip_over_tcp() {
    let host = scripted_host();
    let sink = Arc::new(MemorySink::new());
    let adapter = HostAdapter::connect(host.settings.clone())
        .unwrap()
        .with_sink(sink.clone());
    wait_for_peers(&host);

    let objects = vec![DomainObject::new("Wall", "W1"), DomainObject::new("Wall", "W2")];
    let applied = adapter.push(&objects, PushType::CreateOnly, "", None);

    assert_eq!(applied.len(), 2);
    assert_eq!(applied[0].guid, objects[0].guid);
    assert_eq!(applied[1].host_id, Some(2));
    assert_eq!(sink.take(), vec![Event::note("pushed")]);
}

#[test]
fn events_replayed_for_every_command() {
    let host = scripted_host();
    let sink = Arc::new(MemorySink::new());
    let adapter = HostAdapter::connect(host.settings.clone())
        .unwrap()
        .with_sink(sink.clone());
    wait_for_peers(&host);

    assert_eq!(adapter.delete(&FilterQuery::all()), 1);
    assert!(adapter.pull(&FilterQuery::all()).is_empty());

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].severity, Severity::Warning);
    assert_eq!(events[1], Event::error("unsupported"));
}

#[test]
fn concurrent_callers_share_one_gate() {
    let host = scripted_host();
    let client_commands = TcpLink::connect(host.settings.push_addr()).unwrap();
    let client_results = TcpLink::connect(host.settings.pull_addr()).unwrap();
    wait_for_peers(&host);
    let gate = Arc::new(
        CallGate::new(
            Arc::new(client_commands),
            Arc::new(client_results),
            host.settings.clone(),
        )
        .unwrap(),
    );

    let callers: Vec<_> = (0..4)
        .map(|i| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let object = DomainObject::new("Beam", format!("B{i}"));
                let envelope =
                    CommandEnvelope::push(&[object.clone()], PushType::CreateOnly, "", None);
                let package = gate.call(envelope).unwrap();
                let echoed = DomainObject::from_value(&package.data[0]).unwrap();
                assert_eq!(echoed.guid, object.guid);
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }
    assert_eq!(gate.in_flight(), 0);
}

#[test]
fn two_clients_only_see_their_own_results() {
    let host = scripted_host();
    let pusher = HostAdapter::connect(host.settings.clone()).unwrap();
    let deleter = HostAdapter::connect(host.settings.clone()).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while host.commands.peer_count() < 2 || host.results.peer_count() < 2 {
        assert!(Instant::now() < deadline, "clients never connected");
        thread::sleep(Duration::from_millis(5));
    }

    let pusher_sink = Arc::new(MemorySink::new());
    let deleter_sink = Arc::new(MemorySink::new());
    let pusher = pusher.with_sink(pusher_sink.clone());
    let deleter = deleter.with_sink(deleter_sink.clone());

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..50 {
                let object = DomainObject::new("Wall", format!("W{i}"));
                let applied = pusher.push(&[object.clone()], PushType::CreateOnly, "", None);
                assert_eq!(applied.len(), 1);
                assert_eq!(applied[0].guid, object.guid);
            }
        });
        scope.spawn(|| {
            for _ in 0..50 {
                assert_eq!(deleter.delete(&FilterQuery::all()), 1);
            }
        });
    });

    assert_eq!(pusher_sink.count(Severity::Error), 0);
    assert_eq!(pusher_sink.len(), 50);
    assert_eq!(deleter_sink.count(Severity::Error), 0);
    assert_eq!(deleter_sink.len(), 50);
}
