#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use voxlink_client::{ClientConfig, ConnectionEvent, VoiceClient};
use voxlink_transport::{CompanionListener, Endpoint, IpcStream};
use voxlink_wire::{ConfigToggle, InboundMessage, TriggerKind};

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "vxl-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn config_for(path: &std::path::Path) -> ClientConfig {
    ClientConfig {
        reconnect_backoff: Duration::from_millis(20),
        idle_interval: Duration::from_millis(2),
        ..ClientConfig::with_endpoint(Endpoint::socket(path))
    }
}

/// Read lines from the companion side until `count` arrive.
fn read_lines(reader: &mut BufReader<IpcStream>, count: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(count);
    for _ in 0..count {
        let mut line = String::new();
        reader.read_line(&mut line).expect("line should arrive");
        lines.push(line.trim_end_matches('\n').to_string());
    }
    lines
}

fn accept(listener: &CompanionListener) -> (BufReader<IpcStream>, IpcStream) {
    let stream = listener.accept().expect("companion should accept");
    stream
        .set_write_timeout(Some(Duration::from_secs(5)))
        .expect("write timeout should apply");
    let writer = stream.try_clone().expect("stream should clone");
    (BufReader::new(stream), writer)
}

fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(value) = poll() {
            return value;
        }
        assert!(Instant::now() < deadline, "timed out waiting");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn config_precedes_shout_listen_and_survives_reconnect() {
    let dir = temp_dir("reconnect");
    let sock_path = dir.join("companion.sock");
    let listener = CompanionListener::bind(&sock_path).expect("listener should bind");

    let client = VoiceClient::new(config_for(&sock_path));
    client.start().expect("engine should start");

    let (mut reader, writer) = accept(&listener);
    assert_eq!(
        wait_for(|| client.take_connection_event()),
        ConnectionEvent::Connected
    );

    client.set_config(ConfigToggle::Shouts, true);
    client.set_listen_shouts(true);
    assert_eq!(
        read_lines(&mut reader, 2),
        vec!["CFG|SHOUTS|1", "LISTEN|SHOUTS|1"]
    );

    // Companion restarts: the channel breaks from its side.
    writer.shutdown().expect("shutdown should succeed");
    drop(writer);
    drop(reader);
    assert_eq!(
        wait_for(|| client.take_connection_event()),
        ConnectionEvent::Disconnected
    );

    client.set_dialogue_options(["Farewell"]);
    let (mut reader, _writer) = accept(&listener);
    assert_eq!(
        read_lines(&mut reader, 4),
        vec!["CFG|SHOUTS|1", "OPEN|1", "OPT|Farewell", "END"]
    );

    client.stop();
    drop(listener);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn companion_messages_reach_consumer_in_order() {
    let dir = temp_dir("inbound");
    let sock_path = dir.join("companion.sock");
    let listener = CompanionListener::bind(&sock_path).expect("listener should bind");

    let client = VoiceClient::new(config_for(&sock_path));
    client.start().expect("engine should start");
    let (_reader, mut writer) = accept(&listener);

    writer
        .write_all(
            b"effective: open=1 shouts=1\n\
              RES|abc|xyz\n\
              TRIG|shout|Skyrim.esm|0x00013E07|2|0.660|fus ro\n\
              DBG|hello|world\n",
        )
        .expect("companion write should succeed");

    let first = wait_for(|| client.next_response());
    assert_eq!(
        first,
        InboundMessage::Result {
            index: -1,
            score: 0.0
        }
    );
    let second = wait_for(|| client.next_response());
    match second {
        InboundMessage::Trigger(trigger) => {
            assert_eq!(trigger.kind, TriggerKind::Shout);
            assert_eq!(trigger.text, "fus ro");
            assert_eq!(trigger.form_id(), Some("0x00013E07"));
        }
        other => panic!("expected trigger, got {other:?}"),
    }
    assert_eq!(
        wait_for(|| client.next_response()),
        InboundMessage::Debug {
            text: "hello|world".to_string()
        }
    );

    client.stop();
    drop(listener);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn response_queue_keeps_latest_128() {
    let dir = temp_dir("bounded");
    let sock_path = dir.join("companion.sock");
    let listener = CompanionListener::bind(&sock_path).expect("listener should bind");

    let client = VoiceClient::new(config_for(&sock_path));
    client.start().expect("engine should start");
    let (_reader, mut writer) = accept(&listener);

    let mut burst = String::new();
    for i in 0..200 {
        burst.push_str(&format!("RES|{i}|0.5\n"));
    }
    burst.push_str("DBG|done\n");
    writer
        .write_all(burst.as_bytes())
        .expect("companion write should succeed");

    wait_for(|| (client.pending_responses() == 128).then_some(()));
    std::thread::sleep(Duration::from_millis(100));

    let kept = client.drain_responses();
    assert_eq!(kept.len(), 128);
    assert_eq!(
        kept.last(),
        Some(&InboundMessage::Debug {
            text: "done".to_string()
        })
    );
    for (message, expected) in kept.iter().zip(73..200) {
        match message {
            InboundMessage::Result { index, .. } => assert_eq!(*index, expected),
            other => panic!("unexpected message {other:?}"),
        }
    }

    client.stop();
    drop(listener);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn client_keeps_retrying_until_companion_appears() {
    let dir = temp_dir("late");
    let sock_path = dir.join("companion.sock");

    let client = VoiceClient::new(config_for(&sock_path));
    client.set_language("ja");
    client.start().expect("engine should start");
    std::thread::sleep(Duration::from_millis(60));
    assert!(!client.is_connected());
    assert_eq!(client.take_connection_event(), None);

    let listener = CompanionListener::bind(&sock_path).expect("listener should bind");
    let (mut reader, _writer) = accept(&listener);
    assert_eq!(read_lines(&mut reader, 1), vec!["LANG|ja"]);

    client.stop();
    drop(listener);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stop_returns_while_companion_is_not_reading() {
    let dir = temp_dir("stalled");
    let sock_path = dir.join("companion.sock");
    let listener = CompanionListener::bind(&sock_path).expect("listener should bind");

    let config = ClientConfig {
        write_timeout: None,
        ..config_for(&sock_path)
    };
    let client = VoiceClient::new(config);
    client.start().expect("engine should start");
    let (_reader, _writer) = accept(&listener);
    assert_eq!(
        wait_for(|| client.take_connection_event()),
        ConnectionEvent::Connected
    );

    // Far more than the socket buffer holds; the companion reads none of it.
    let option = "x".repeat(200);
    for _ in 0..200 {
        client.set_dialogue_options(vec![option.clone(); 200]);
        std::thread::sleep(Duration::from_millis(1));
    }

    let started = Instant::now();
    client.stop();
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "stop took {:?}",
        started.elapsed()
    );
    assert_eq!(client.take_connection_event(), None);

    drop(listener);
    let _ = std::fs::remove_dir_all(&dir);
}

