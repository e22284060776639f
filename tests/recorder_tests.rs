// Integration tests for session recording
//
// These drive a SessionRecorder tick by tick with synthetic frames and check
// what ends up on disk for committed, discarded, aborted and failed sessions.

use anyhow::Result;
use phrase_capture::sensor::synthetic::{
    synthetic_body_frame, synthetic_color_frame, synthetic_depth_frame,
};
use phrase_capture::storage::SessionLayout;
use phrase_capture::{
    BodyFrame, CaptureConfig, CaptureError, CaptureResult, FileJointWriter, GuardPolicy,
    JointStreamWriter, MultiSourceFrame, RunState, SessionOutcome, SessionRecorder,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

const PERIOD: Duration = Duration::from_millis(33);

fn small_config(root: &Path, policy: GuardPolicy) -> CaptureConfig {
    CaptureConfig {
        phrase: Some("hello".to_string()),
        color_width: 8,
        color_height: 6,
        depth_width: 4,
        depth_height: 3,
        guard_policy: policy,
        ..CaptureConfig::new(root)
    }
}

fn recorder(root: &Path, policy: GuardPolicy) -> Result<SessionRecorder> {
    Ok(SessionRecorder::new(
        &small_config(root, policy),
        Box::new(FileJointWriter::new()),
    )?)
}

/// Hold the request for `ticks` body ticks, feeding one color/depth pair per tick
fn record_ticks(recorder: &mut SessionRecorder, ticks: u64, bodies: usize) -> Result<()> {
    for tick in 0..ticks {
        let outcome = recorder.on_body_frame(true, &synthetic_body_frame(tick, bodies, PERIOD))?;
        assert!(outcome.is_none());
        recorder.on_multi_frame(MultiSourceFrame {
            color: Some(synthetic_color_frame(tick, 8, 6)),
            depth: Some(synthetic_depth_frame(tick, 4, 3)),
        });
    }
    Ok(())
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn test_session_with_enough_samples_is_committed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    record_ticks(&mut recorder, 30, 1)?;
    assert_eq!(recorder.state(), RunState::Recording);
    assert_eq!(recorder.status().frames_captured, 30);

    let outcome = recorder
        .on_body_frame(false, &BodyFrame::default())?
        .expect("session should close");

    let session_dir = temp_dir.path().join("hello").join("1");
    match &outcome {
        SessionOutcome::Committed {
            session_id,
            color_files,
            depth_files,
            log_path,
            ..
        } => {
            assert_eq!(*session_id, 1);
            assert_eq!(*color_files, 30);
            assert_eq!(*depth_files, 30);
            assert_eq!(log_path, &session_dir.join("hello_1.txt"));
        }
        other => panic!("expected commit, got {:?}", other),
    }

    assert_eq!(count_files(&session_dir.join("color")), 30);
    assert_eq!(count_files(&session_dir.join("depth")), 30);
    assert!(session_dir.join("color").join("hello_color_1.jpg").exists());
    assert!(session_dir.join("color").join("hello_color_30.jpg").exists());
    assert!(session_dir.join("depth").join("hello_depth_30.jpg").exists());

    let log = fs::read_to_string(session_dir.join("hello_1.txt"))?;
    assert_eq!(log.lines().count(), 30);
    assert!(log.lines().all(|line| line.contains(" ||| ")));

    assert_eq!(recorder.state(), RunState::Written);
    assert_eq!(recorder.next_session_id(), Some(2));
    Ok(())
}

#[test]
fn test_short_session_is_discarded() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    record_ticks(&mut recorder, 10, 1)?;
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;

    assert_eq!(
        outcome,
        Some(SessionOutcome::Discarded {
            session_id: 1,
            phrase: "hello".to_string(),
            frames_captured: 10,
        })
    );

    let session_dir = temp_dir.path().join("hello").join("1");
    assert!(!session_dir.join("hello_1.txt").exists(), "log should be deleted");
    assert!(!session_dir.exists(), "empty session directory should be released");
    assert_eq!(recorder.current_session_log_path(), None);

    // Gate discards still count as written
    assert_eq!(recorder.state(), RunState::Written);
    assert_eq!(recorder.next_session_id(), Some(1));
    Ok(())
}

#[test]
fn test_exactly_min_frames_commits() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    record_ticks(&mut recorder, 25, 1)?;
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;

    assert!(outcome.is_some_and(|o| o.is_committed()));
    Ok(())
}

#[test]
fn test_every_tracked_body_counts_as_a_sample() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    // 13 ticks with two bodies gives 26 samples
    record_ticks(&mut recorder, 13, 2)?;
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;

    match outcome {
        Some(SessionOutcome::Committed { color_files, .. }) => assert_eq!(color_files, 13),
        other => panic!("expected commit, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_no_tracked_body_aborts_with_tracked_body_policy() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::TrackedBody)?;

    record_ticks(&mut recorder, 40, 0)?;
    assert_eq!(recorder.state(), RunState::Recording);

    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;
    assert_eq!(
        outcome,
        Some(SessionOutcome::Aborted {
            session_id: 1,
            phrase: "hello".to_string(),
        })
    );

    assert_eq!(recorder.state(), RunState::NotRunning);
    assert!(!recorder.poll_write_complete());
    assert!(!temp_dir.path().join("hello").join("1").exists());
    assert_eq!(recorder.next_session_id(), Some(1));
    Ok(())
}

#[test]
fn test_no_tracked_body_is_discarded_with_default_policy() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    record_ticks(&mut recorder, 40, 0)?;
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;

    assert!(matches!(
        outcome,
        Some(SessionOutcome::Discarded {
            frames_captured: 0,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_allocation_probes_past_existing_sessions() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let phrase_root = temp_dir.path().join("hello");
    fs::create_dir_all(phrase_root.join("1"))?;
    fs::create_dir_all(phrase_root.join("2"))?;

    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;
    record_ticks(&mut recorder, 30, 1)?;
    assert_eq!(recorder.status().session_id, Some(3));

    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;
    assert_eq!(outcome.map(|o| o.session_id()), Some(3));
    assert!(phrase_root.join("3").join("hello_3.txt").exists());
    assert_eq!(recorder.next_session_id(), Some(4));
    Ok(())
}

#[test]
fn test_write_complete_fires_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    assert!(!recorder.poll_write_complete());

    record_ticks(&mut recorder, 30, 1)?;
    recorder.on_body_frame(false, &BodyFrame::default())?;

    assert!(recorder.poll_write_complete());
    assert!(!recorder.poll_write_complete());
    assert_eq!(recorder.state(), RunState::NotRunning);

    // Log path survives the poll until the next session starts
    assert!(recorder.current_session_log_path().is_some());
    recorder.on_body_frame(true, &synthetic_body_frame(0, 1, PERIOD))?;
    assert_eq!(recorder.current_session_log_path(), None);
    Ok(())
}

#[test]
fn test_consecutive_sessions_get_new_ids() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    for expected in 1..=3 {
        record_ticks(&mut recorder, 26, 1)?;
        let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;
        assert_eq!(outcome.map(|o| o.session_id()), Some(expected));
        recorder.poll_write_complete();
    }

    // Frame index restarts for every session
    let third = temp_dir.path().join("hello").join("3").join("color");
    assert!(third.join("hello_color_1.jpg").exists());
    assert!(!third.join("hello_color_27.jpg").exists());
    Ok(())
}

#[test]
fn test_missing_phrase_fails_fast() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = CaptureConfig {
        phrase: None,
        ..small_config(temp_dir.path(), GuardPolicy::WhileRequested)
    };
    let mut recorder = SessionRecorder::new(&config, Box::new(FileJointWriter::new()))?;

    assert!(matches!(recorder.check_ready(), Err(CaptureError::MissingPhrase)));

    let err = recorder
        .on_body_frame(true, &synthetic_body_frame(0, 1, PERIOD))
        .unwrap_err();
    assert!(matches!(err, CaptureError::MissingPhrase));
    assert_eq!(recorder.state(), RunState::NotRunning);

    // Nothing was created under the root
    assert_eq!(count_files(temp_dir.path()), 0);
    Ok(())
}

#[test]
fn test_invalid_phrase_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    for bad in ["", "  ", "..", "a/b", "a\\b"] {
        assert!(
            matches!(recorder.set_phrase(bad), Err(CaptureError::InvalidPhrase(_))),
            "{:?} should be rejected",
            bad
        );
    }
    assert_eq!(recorder.phrase(), Some("hello"));
    Ok(())
}

#[test]
fn test_phrase_change_applies_to_next_session_only() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    record_ticks(&mut recorder, 5, 1)?;
    recorder.set_phrase("goodbye")?;
    record_ticks(&mut recorder, 25, 1)?;

    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;
    match outcome {
        Some(SessionOutcome::Committed { phrase, .. }) => assert_eq!(phrase, "hello"),
        other => panic!("expected commit, got {:?}", other),
    }

    let color_dir = temp_dir.path().join("hello").join("1").join("color");
    assert!(color_dir.join("hello_color_1.jpg").exists());
    assert_eq!(recorder.next_session_id(), Some(1), "goodbye has no sessions yet");
    Ok(())
}

#[test]
fn test_frames_outside_a_session_are_ignored() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    let accepted = recorder.on_multi_frame(MultiSourceFrame {
        color: Some(synthetic_color_frame(0, 8, 6)),
        depth: Some(synthetic_depth_frame(0, 4, 3)),
    });
    assert!(!accepted);
    assert_eq!(recorder.status().queued_color, 0);
    Ok(())
}

#[test]
fn test_wrong_size_frames_are_rejected_at_ingest() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    recorder.on_body_frame(true, &synthetic_body_frame(0, 1, PERIOD))?;
    let accepted = recorder.on_multi_frame(MultiSourceFrame {
        color: Some(synthetic_color_frame(0, 16, 6)),
        depth: None,
    });

    assert!(!accepted);
    assert_eq!(recorder.status().queued_color, 0);
    Ok(())
}

#[test]
fn test_failed_commit_is_rolled_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    record_ticks(&mut recorder, 30, 1)?;

    // A file where the color directory should go makes the commit fail
    let session_dir = temp_dir.path().join("hello").join("1");
    fs::write(session_dir.join("color"), b"in the way")?;

    let err = recorder
        .on_body_frame(false, &BodyFrame::default())
        .unwrap_err();
    assert!(matches!(err, CaptureError::CommitFailed { session_id: 1, .. }));

    assert_eq!(recorder.state(), RunState::NotRunning);
    assert!(!recorder.poll_write_complete());
    assert_eq!(recorder.current_session_log_path(), None);
    assert!(!session_dir.join("hello_1.txt").exists());
    assert!(!session_dir.join("depth").exists());
    assert!(matches!(
        recorder.last_outcome(),
        Some(SessionOutcome::Failed { session_id: 1, .. })
    ));

    // Id not advanced; a new session can still be opened
    assert_eq!(recorder.next_session_id(), Some(1));
    record_ticks(&mut recorder, 1, 1)?;
    assert!(recorder.is_recording());
    Ok(())
}

#[test]
fn test_commit_failing_mid_drain_removes_written_frames() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    record_ticks(&mut recorder, 30, 1)?;

    // Every color frame is written, then the first depth write hits a directory
    let session_dir = temp_dir.path().join("hello").join("1");
    fs::create_dir_all(session_dir.join("depth").join("hello_depth_1.jpg"))?;

    let err = recorder
        .on_body_frame(false, &BodyFrame::default())
        .unwrap_err();
    match err {
        CaptureError::CommitFailed {
            session_id,
            frames_written,
            ..
        } => {
            assert_eq!(session_id, 1);
            assert_eq!(frames_written, 30);
        }
        other => panic!("expected commit failure, got {:?}", other),
    }

    assert!(!session_dir.join("color").exists(), "written color frames should be removed");
    assert!(!session_dir.join("depth").exists());
    assert!(!session_dir.exists(), "empty session directory should be released");
    assert_eq!(recorder.state(), RunState::NotRunning);
    assert!(matches!(
        recorder.last_outcome(),
        Some(SessionOutcome::Failed { session_id: 1, .. })
    ));

    // The id is reused and its frames are numbered from 1 again
    record_ticks(&mut recorder, 30, 1)?;
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;
    assert!(matches!(
        outcome,
        Some(SessionOutcome::Committed {
            session_id: 1,
            color_files: 30,
            depth_files: 30,
            ..
        })
    ));

    let color_dir = session_dir.join("color");
    let depth_dir = session_dir.join("depth");
    assert!(color_dir.join("hello_color_1.jpg").is_file());
    assert!(color_dir.join("hello_color_30.jpg").is_file());
    assert!(!color_dir.join("hello_color_31.jpg").exists());
    assert!(depth_dir.join("hello_depth_1.jpg").is_file());
    assert!(depth_dir.join("hello_depth_30.jpg").is_file());
    Ok(())
}

#[test]
fn test_uneven_color_and_depth_counts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    // Color on every tick, depth on every third tick
    for tick in 0..30 {
        recorder.on_body_frame(true, &synthetic_body_frame(tick, 1, PERIOD))?;
        recorder.on_multi_frame(MultiSourceFrame {
            color: Some(synthetic_color_frame(tick, 8, 6)),
            depth: (tick % 3 == 0).then(|| synthetic_depth_frame(tick, 4, 3)),
        });
    }
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;

    assert!(matches!(
        outcome,
        Some(SessionOutcome::Committed {
            color_files: 30,
            depth_files: 10,
            ..
        })
    ));
    let session_dir = temp_dir.path().join("hello").join("1");
    assert_eq!(count_files(&session_dir.join("color")), 30);
    assert_eq!(count_files(&session_dir.join("depth")), 10);
    assert!(session_dir.join("depth").join("hello_depth_10.jpg").exists());
    Ok(())
}

#[test]
fn test_depth_only_session() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    for tick in 0..30 {
        recorder.on_body_frame(true, &synthetic_body_frame(tick, 1, PERIOD))?;
        recorder.on_multi_frame(MultiSourceFrame {
            color: None,
            depth: Some(synthetic_depth_frame(tick, 4, 3)),
        });
    }
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;

    assert!(matches!(
        outcome,
        Some(SessionOutcome::Committed {
            color_files: 0,
            depth_files: 30,
            ..
        })
    ));
    let session_dir = temp_dir.path().join("hello").join("1");
    assert_eq!(count_files(&session_dir.join("color")), 0);
    assert_eq!(count_files(&session_dir.join("depth")), 30);
    Ok(())
}

#[test]
fn test_write_complete_reports_its_log_path() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = recorder(temp_dir.path(), GuardPolicy::WhileRequested)?;

    assert_eq!(recorder.poll_write_complete_with_log(), (false, None));

    record_ticks(&mut recorder, 30, 1)?;
    recorder.on_body_frame(false, &BodyFrame::default())?;

    let expected = temp_dir.path().join("hello").join("1").join("hello_1.txt");
    assert_eq!(recorder.poll_write_complete_with_log(), (true, Some(expected)));
    assert_eq!(recorder.poll_write_complete_with_log(), (false, None));
    Ok(())
}

#[test]
fn test_png_depth_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = CaptureConfig {
        depth_format: phrase_capture::DepthFormat::Png,
        ..small_config(temp_dir.path(), GuardPolicy::WhileRequested)
    };
    let mut recorder = SessionRecorder::new(&config, Box::new(FileJointWriter::new()))?;

    record_ticks(&mut recorder, 25, 1)?;
    recorder.on_body_frame(false, &BodyFrame::default())?;

    let depth_dir = temp_dir.path().join("hello").join("1").join("depth");
    assert!(depth_dir.join("hello_depth_1.png").exists());
    assert!(!depth_dir.join("hello_depth_1.jpg").exists());
    Ok(())
}

#[test]
fn test_empty_data_root_is_rejected() {
    let config = CaptureConfig::new("");
    let result = SessionRecorder::new(&config, Box::new(FileJointWriter::new()));
    assert!(matches!(result, Err(CaptureError::MissingRoot(_))));
}

/// File-backed writer whose close always fails
struct UnclosableWriter(FileJointWriter);

impl JointStreamWriter for UnclosableWriter {
    fn set_current_phrase(&mut self, phrase: &str) {
        self.0.set_current_phrase(phrase);
    }

    fn start_new_phrase(&mut self, layout: &SessionLayout) -> CaptureResult<PathBuf> {
        self.0.start_new_phrase(layout)
    }

    fn write_line(&mut self, line: &str) -> CaptureResult<()> {
        self.0.write_line(line)
    }

    fn end_phrase(&mut self) -> CaptureResult<()> {
        Err(CaptureError::io(
            "skeletal.txt",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        ))
    }

    fn delete_last_sample(&mut self, layout: &SessionLayout) -> CaptureResult<()> {
        self.0.delete_last_sample(layout)
    }
}

#[test]
fn test_discard_survives_log_close_failure() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = small_config(temp_dir.path(), GuardPolicy::WhileRequested);
    let mut recorder =
        SessionRecorder::new(&config, Box::new(UnclosableWriter(FileJointWriter::new())))?;

    record_ticks(&mut recorder, 5, 1)?;
    let outcome = recorder.on_body_frame(false, &BodyFrame::default())?;

    assert!(matches!(
        outcome,
        Some(SessionOutcome::Discarded {
            frames_captured: 5,
            ..
        })
    ));
    assert_eq!(recorder.state(), RunState::Written);
    assert!(!temp_dir.path().join("hello").join("1").exists());
    Ok(())
}

#[test]
fn test_commit_fails_when_log_cannot_close() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = small_config(temp_dir.path(), GuardPolicy::WhileRequested);
    let mut recorder =
        SessionRecorder::new(&config, Box::new(UnclosableWriter(FileJointWriter::new())))?;

    record_ticks(&mut recorder, 30, 1)?;
    let err = recorder
        .on_body_frame(false, &BodyFrame::default())
        .unwrap_err();

    assert!(matches!(
        err,
        CaptureError::CommitFailed {
            frames_written: 0,
            ..
        }
    ));
    assert_eq!(recorder.state(), RunState::NotRunning);
    Ok(())
}
