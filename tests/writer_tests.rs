//! End-to-end behaviour of `TandemLog` against real folders.

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::rstest;
use tandemlog::{BuildError, LogMessageType, TandemLog};

mod test_utils;
use test_utils::fixtures::APP;
use test_utils::{CollectingNotifier, Folders, folders, quick_builder, read_lines, wait_for};

const SUFFIX: &str = " | Username: alice | Computer name: ws-01";

#[rstest]
fn offline_error_line_is_formatted(folders: Folders) {
    let log = quick_builder(folders.unreachable_online(), &folders.offline)
        .build()
        .expect("build writer");
    log.enqueue("disk full", LogMessageType::Error, true);
    assert!(log.shutdown().is_clean());

    let lines = read_lines(&log.offline_destination().current_file_path());
    let line = lines
        .iter()
        .find(|line| line.contains("disk full"))
        .expect("error line written offline");
    assert!(line.starts_with("-E- "), "{line}");
    assert!(line.ends_with(&format!(" disk full{SUFFIX}")), "{line}");
    assert!(
        lines
            .iter()
            .any(|line| line.starts_with("-W- ") && line.contains("Could not create online log folder")),
        "{lines:?}"
    );
}

#[rstest]
fn messages_reach_the_online_file_in_order(folders: Folders) {
    let log = quick_builder(&folders.online, &folders.offline)
        .build()
        .expect("build writer");
    for i in 0..12 {
        log.info(format!("message {i}"));
    }
    let report = log.shutdown();
    assert!(report.is_clean(), "{report:?}");

    let lines = read_lines(&log.online_destination().current_file_path());
    assert_eq!(lines.len(), 12);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.starts_with("-I- "), "{line}");
        assert!(line.ends_with(&format!(" message {i}{SUFFIX}")), "{line}");
    }
    assert!(!log.offline_destination().current_file_path().exists());
}

#[rstest]
fn messages_without_identity_omit_the_suffix(folders: Folders) {
    let log = quick_builder(&folders.online, &folders.offline)
        .build()
        .expect("build writer");
    log.enqueue("bare", LogMessageType::Verbose, false);
    log.shutdown();

    let lines = read_lines(&log.online_destination().current_file_path());
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("-V- "));
    assert!(lines[0].ends_with(" bare"));
}

#[rstest]
#[case(4, 1)]
#[case(4, 4)]
#[case(1024, 1)]
fn bursts_keep_arrival_order(folders: Folders, #[case] capacity: usize, #[case] threads: usize) {
    let log = quick_builder(&folders.online, &folders.offline)
        .with_channel_capacity(capacity)
        .with_normalizer_threads(threads)
        .build()
        .expect("build writer");
    for i in 0..2000 {
        log.info(format!("m{i}"));
    }
    assert!(log.shutdown().is_clean());

    let order: Vec<usize> = read_lines(&log.online_destination().current_file_path())
        .iter()
        .filter_map(|line| {
            let rest = line.split(" m").nth(1)?;
            rest.split(' ').next()?.parse().ok()
        })
        .collect();
    assert_eq!(order, (0..2000).collect::<Vec<_>>());
}

#[rstest]
fn concurrent_producers_lose_nothing(folders: Folders) {
    let log = Arc::new(
        quick_builder(&folders.online, &folders.offline)
            .build()
            .expect("build writer"),
    );
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..25 {
                    log.debug(format!("t{t} m{i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer thread");
    }
    log.shutdown();

    let lines = read_lines(&log.online_destination().current_file_path());
    assert_eq!(lines.len(), 100);
    for t in 0..4 {
        let own: Vec<usize> = lines
            .iter()
            .filter_map(|line| {
                let rest = line.split(&format!(" t{t} m")).nth(1)?;
                rest.split(' ').next()?.parse().ok()
            })
            .collect();
        assert_eq!(own, (0..25).collect::<Vec<_>>(), "thread {t} out of order");
    }
}

#[rstest]
fn backlog_is_merged_when_online_returns(folders: Folders) {
    let online = folders.unreachable_online();
    let log = quick_builder(&online, &folders.offline)
        .build()
        .expect("build writer");
    for i in 0..3 {
        log.info(format!("while offline {i}"));
    }
    let offline_file = log.offline_destination().current_file_path();
    wait_for(Duration::from_secs(5), || {
        read_lines(&offline_file)
            .iter()
            .any(|line| line.contains("while offline 2"))
    });
    assert!(!log.is_online());

    fs::remove_file(folders.blocker()).expect("remove blocker");
    let online_file = log.online_destination().current_file_path();
    wait_for(Duration::from_secs(5), || !offline_file.exists());
    assert!(log.is_online());

    log.info("after reconnect");
    log.shutdown();

    let lines = read_lines(&online_file);
    let ours: Vec<_> = lines
        .iter()
        .filter(|line| line.contains("while offline") || line.contains("after reconnect"))
        .collect();
    assert_eq!(ours.len(), 4, "{lines:?}");
    for (i, line) in ours.iter().take(3).enumerate() {
        assert!(line.contains(&format!("while offline {i}")), "{line}");
    }
    assert!(ours[3].contains("after reconnect"));
    assert!(
        lines
            .iter()
            .any(|line| line.contains("Could not create online log folder"))
    );
}

#[rstest]
fn failed_online_writes_are_retried_later(folders: Folders) {
    let log = quick_builder(&folders.online, &folders.offline)
        .build()
        .expect("build writer");
    let online_file = log.online_destination().current_file_path();
    fs::create_dir_all(&online_file).expect("directory in place of the online file");

    log.warning("first");
    log.warning("second");
    thread::sleep(Duration::from_millis(100));
    assert!(!log.offline_destination().current_file_path().exists());
    assert!(log.pending_len() >= 2);

    fs::remove_dir(&online_file).expect("clear the obstruction");
    assert!(log.shutdown().is_clean());

    let lines = read_lines(&online_file);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" first"));
    assert!(lines[1].contains(" second"));
}

#[rstest]
fn no_usable_folder_disables_and_notifies_once(folders: Folders) {
    let notifier = CollectingNotifier::default();
    let blocker = folders.blocker();
    let log = quick_builder(blocker.join("online"), blocker.join("offline"))
        .with_notifier(Arc::new(notifier.clone()))
        .build()
        .expect("build writer");
    wait_for(Duration::from_secs(5), || log.is_initialized());
    assert!(log.is_disabled());

    log.error("nowhere to go");
    log.shutdown();
    log.shutdown();

    let seen = notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, APP);
    assert!(seen[0].1.contains("could not create a folder for its logs"));
    assert_eq!(log.pending_len(), 0);
}

#[rstest]
fn shutdown_is_idempotent_and_later_enqueues_are_inert(folders: Folders) {
    let log = quick_builder(&folders.online, &folders.offline)
        .build()
        .expect("build writer");
    log.info("before");
    let first = log.shutdown();
    let second = log.shutdown();
    assert_eq!(first, second);

    log.info("after");
    assert_eq!(log.in_flight(), 0);
    assert_eq!(log.pending_len(), 0);
    let lines = read_lines(&log.online_destination().current_file_path());
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("before"));
}

#[rstest]
fn dropping_the_writer_flushes(folders: Folders) {
    let log = quick_builder(&folders.online, &folders.offline)
        .build()
        .expect("build writer");
    let online_file = log.online_destination().current_file_path();
    log.info("flushed on drop");
    drop(log);

    let lines = read_lines(&online_file);
    assert_eq!(lines.len(), 1);
}

#[rstest]
fn tracked_objects_log_their_lifecycle(folders: Folders) {
    struct Scanner;

    let log = quick_builder(&folders.online, &folders.offline)
        .build()
        .expect("build writer");
    let first = log.track::<Scanner>(false);
    let second = log.track::<Scanner>(false);
    assert_eq!(log.objects().live_count("Scanner"), 2);
    second.log("scanning", LogMessageType::Verbose);
    drop(second);
    drop(first);
    assert_eq!(log.objects().live_count("Scanner"), 0);
    log.shutdown();

    let lines = read_lines(&log.online_destination().current_file_path());
    assert_eq!(lines.len(), 5, "{lines:?}");
    assert!(lines[0].contains("Scanner1: Constructor called. | Scanner count: 1."));
    assert!(lines[1].starts_with("-W- "));
    assert!(lines[1].contains("does not expect to have more than one instance"));
    assert!(lines[2].contains("Scanner2: scanning | ProcessId: "));
    assert!(lines[3].contains("New Scanner count: 1."));
    assert!(lines[4].contains("Scanner1: Disposing of tracked object. New Scanner count: 0."));
}

#[rstest]
#[case("")]
#[case("bad/name")]
fn invalid_app_names_are_rejected(folders: Folders, #[case] name: &str) {
    let result = TandemLog::new(&folders.online, &folders.offline, name);
    assert!(matches!(result, Err(BuildError::InvalidConfig(_))));
}
