//! End-to-end pipeline tests.
//!
//! Tests that reach the encoder skip themselves when FFmpeg has no H.264
//! encoder on this platform.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use huegene_reel::{
    CancellationToken, CapturedRelay, OperationType, Orchestrator, ProgressCallback, ProgressInfo,
    ReelError, ReelOptions, RunSummary,
};
use image::{Rgb, RgbImage};

// Tests that spawn processes hold this lock so a fork never inherits the
// write descriptor of a freshly written generator script.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn spawn_lock() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_frames(directory: &Path, count: usize) -> Vec<PathBuf> {
    fs::create_dir_all(directory).expect("Failed to create frame directory");
    (0..count)
        .map(|index| {
            let path = directory.join(format!("Image{index}.bmp"));
            let shade = (index * 20 % 256) as u8;
            RgbImage::from_pixel(64, 48, Rgb([shade, 255 - shade, 128]))
                .save(&path)
                .expect("Failed to write bitmap");
            path
        })
        .collect()
}

fn assemble_only(working_directory: &Path) -> ReelOptions {
    ReelOptions::new()
        .with_working_directory(working_directory)
        .skip_generator()
}

/// `None` when the encoder is unavailable and the test should be skipped.
fn run_or_skip(options: ReelOptions) -> Option<RunSummary> {
    let result = Orchestrator::new(options).run_with_relay(&mut CapturedRelay::default());
    if let Err(ReelError::Encode(ref message)) = result {
        if message.contains("not available") || message.contains("cannot open encoder") {
            eprintln!("Skipping: H264 encoder not available ({message})");
            return None;
        }
    }
    Some(result.expect("Pipeline failed"))
}

#[test]
fn successful_run_writes_video_and_removes_frames() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&temporary_directory.path().join("Images"), 3);

    let Some(summary) = run_or_skip(assemble_only(temporary_directory.path())) else {
        return;
    };

    let output = temporary_directory.path().join("test.mp4");
    assert_eq!(summary.output, output);
    assert!(output.exists());
    assert!(fs::metadata(&output).unwrap().len() > 0, "output file should be non-empty");
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.removed, 3);
    assert!(summary.generator.is_none());
    assert!(frames.iter().all(|frame| !frame.exists()));
}

#[test]
fn ten_frames_encode_to_seven() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    write_frames(&temporary_directory.path().join("Images"), 10);

    let Some(summary) = run_or_skip(assemble_only(temporary_directory.path())) else {
        return;
    };

    assert_eq!(summary.frames, 10);
    assert_eq!(summary.encoded_frames, 7);
}

#[test]
fn keep_frames_skips_cleanup() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&temporary_directory.path().join("Images"), 2);

    let options = assemble_only(temporary_directory.path()).keep_frames();
    let Some(summary) = run_or_skip(options) else {
        return;
    };

    assert_eq!(summary.removed, 0);
    assert!(frames.iter().all(|frame| frame.exists()));
}

#[test]
fn progress_is_reported_for_both_steps() {
    struct Recorder(Mutex<Vec<(OperationType, u64)>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push((info.operation, info.current));
        }
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    write_frames(&temporary_directory.path().join("Images"), 4);

    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    let options = assemble_only(temporary_directory.path()).with_progress(recorder.clone());
    if run_or_skip(options).is_none() {
        return;
    }

    let seen = recorder.0.lock().unwrap();
    let encoded = seen.iter().filter(|(operation, _)| *operation == OperationType::Encoding).count();
    let cleaned = seen.iter().filter(|(operation, _)| *operation == OperationType::Cleanup).count();
    // 4 frames × 30 ms × 24 fps = 2.88 → 3 encoded frames.
    assert_eq!(encoded, 3);
    assert_eq!(cleaned, 4);
}

#[test]
fn empty_directory_writes_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let images = temporary_directory.path().join("Images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("notes.txt"), b"not a frame").unwrap();

    let result = Orchestrator::new(assemble_only(temporary_directory.path()))
        .run_with_relay(&mut CapturedRelay::default());

    assert!(matches!(result, Err(ReelError::EmptyInput { .. })));
    assert!(!temporary_directory.path().join("test.mp4").exists());
    assert!(images.join("notes.txt").exists());
}

#[test]
fn missing_directory_fails_before_reading() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");

    let result = Orchestrator::new(assemble_only(temporary_directory.path()))
        .run_with_relay(&mut CapturedRelay::default());

    assert!(matches!(result, Err(ReelError::EmptyInput { .. })));
    assert!(!temporary_directory.path().join("test.mp4").exists());
}

#[test]
fn encode_failure_keeps_frames() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&temporary_directory.path().join("Images"), 3);
    let unwritable = temporary_directory.path().join("no/such/dir/test.mp4");

    let options = assemble_only(temporary_directory.path()).with_output(&unwritable);
    let result = Orchestrator::new(options).run_with_relay(&mut CapturedRelay::default());

    assert!(matches!(result, Err(ReelError::Encode(_))), "got {result:?}");
    assert!(frames.iter().all(|frame| frame.exists()));
    assert!(!unwritable.exists());
}

#[test]
fn corrupt_frame_is_decode_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&temporary_directory.path().join("Images"), 3);
    fs::write(&frames[1], b"this is not a bitmap").unwrap();

    let result = Orchestrator::new(assemble_only(temporary_directory.path()))
        .run_with_relay(&mut CapturedRelay::default());

    match result {
        Err(ReelError::Decode { path, .. }) => assert_eq!(path, frames[1]),
        other => panic!("Expected Decode, got: {other:?}"),
    }
    assert!(frames.iter().all(|frame| frame.exists()));
    assert!(!temporary_directory.path().join("test.mp4").exists());
}

#[test]
fn truncated_frame_body_is_decode_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&temporary_directory.path().join("Images"), 10);
    // Image3 is never shown at 30 ms / 24 fps; its header stays intact.
    let bytes = fs::read(&frames[3]).unwrap();
    fs::write(&frames[3], &bytes[..200]).unwrap();

    let result = Orchestrator::new(assemble_only(temporary_directory.path()))
        .run_with_relay(&mut CapturedRelay::default());

    match result {
        Err(ReelError::Decode { path, .. }) => assert_eq!(path, frames[3]),
        Err(ReelError::Encode(message))
            if message.contains("not available") || message.contains("cannot open encoder") =>
        {
            eprintln!("Skipping: H264 encoder not available ({message})");
            return;
        }
        other => panic!("Expected Decode, got: {other:?}"),
    }
    assert!(!temporary_directory.path().join("test.mp4").exists());
    assert!(frames.iter().all(|frame| frame.exists()));
}

#[test]
fn cleanup_failure_keeps_video() {
    // Removes the second frame behind the cleanup's back once the first is gone.
    struct Saboteur(PathBuf);

    impl ProgressCallback for Saboteur {
        fn on_progress(&self, info: &ProgressInfo) {
            if info.operation == OperationType::Cleanup && info.current == 1 {
                fs::remove_file(&self.0).expect("Failed to remove frame");
            }
        }
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&temporary_directory.path().join("Images"), 3);

    let options = assemble_only(temporary_directory.path())
        .with_progress(Arc::new(Saboteur(frames[1].clone())));
    let result = Orchestrator::new(options).run_with_relay(&mut CapturedRelay::default());

    match result {
        Err(ReelError::Cleanup { path, .. }) => assert_eq!(path, frames[1]),
        Err(ReelError::Encode(message))
            if message.contains("not available") || message.contains("cannot open encoder") =>
        {
            eprintln!("Skipping: H264 encoder not available ({message})");
            return;
        }
        other => panic!("Expected Cleanup, got: {other:?}"),
    }
    let output = temporary_directory.path().join("test.mp4");
    assert!(output.exists());
    assert!(fs::metadata(&output).unwrap().len() > 0, "output file should be non-empty");
    assert!(frames[2].exists());
}

#[test]
fn cancelled_run_keeps_frames() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&temporary_directory.path().join("Images"), 3);

    let token = CancellationToken::new();
    token.cancel();
    let options = assemble_only(temporary_directory.path()).with_cancellation(token);
    let result = Orchestrator::new(options).run_with_relay(&mut CapturedRelay::default());

    match result {
        Err(ReelError::Cancelled) => {}
        Err(ReelError::Encode(message)) => {
            eprintln!("Skipping: encoder not available ({message})");
            return;
        }
        other => panic!("Expected Cancelled, got: {other:?}"),
    }
    assert!(frames.iter().all(|frame| frame.exists()));
    assert!(!temporary_directory.path().join("test.mp4").exists());
}

#[test]
fn missing_generator_aborts_before_assembly() {
    let _guard = spawn_lock();
    let install_root = tempfile::tempdir().expect("Failed to create temp dir");
    let working_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let frames = write_frames(&working_directory.path().join("Images"), 2);

    let options = ReelOptions::new()
        .with_install_root(install_root.path())
        .with_working_directory(working_directory.path());
    let result = Orchestrator::new(options).run_with_relay(&mut CapturedRelay::default());

    assert!(matches!(result, Err(ReelError::Launch { .. })));
    assert!(frames.iter().all(|frame| frame.exists()));
}

#[cfg(unix)]
mod with_generator {
    use std::os::unix::fs::PermissionsExt;

    use huegene_reel::ExitPolicy;

    use super::*;

    /// Install a fake generator that prints progress and moves staged
    /// frames into `Images`.
    fn install_generator(install_root: &Path, exit_code: i32) {
        let path = install_root.join(huegene_reel::options::DEFAULT_GENERATOR);
        let script = format!(
            "#!/bin/sh\necho generating\nmkdir -p Images\nmv staging/*.bmp Images/\necho generated\nexit {exit_code}\n"
        );
        fs::write(&path, script).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to mark script executable");
    }

    #[test]
    fn generator_output_is_relayed_before_assembly() {
        let _guard = spawn_lock();
        let install_root = tempfile::tempdir().expect("Failed to create temp dir");
        let working_directory = tempfile::tempdir().expect("Failed to create temp dir");
        install_generator(install_root.path(), 0);
        write_frames(&working_directory.path().join("staging"), 3);

        let options = ReelOptions::new()
            .with_install_root(install_root.path())
            .with_working_directory(working_directory.path());
        let mut relay = CapturedRelay::default();
        let result = Orchestrator::new(options).run_with_relay(&mut relay);

        assert_eq!(relay.lines, ["generating", "generated"]);
        let summary = match result {
            Ok(summary) => summary,
            Err(ReelError::Encode(message)) => {
                eprintln!("Skipping: encoder not available ({message})");
                return;
            }
            Err(other) => panic!("Pipeline failed: {other}"),
        };

        let report = summary.generator.expect("generator report");
        assert!(report.success());
        assert_eq!(report.stdout_lines, 2);
        assert_eq!(summary.frames, 3);
        assert!(working_directory.path().join("test.mp4").exists());
        assert_eq!(fs::read_dir(working_directory.path().join("Images")).unwrap().count(), 0);
    }

    #[test]
    fn failing_generator_aborts_under_abort_policy() {
        let _guard = spawn_lock();
        let install_root = tempfile::tempdir().expect("Failed to create temp dir");
        let working_directory = tempfile::tempdir().expect("Failed to create temp dir");
        install_generator(install_root.path(), 2);
        write_frames(&working_directory.path().join("staging"), 2);

        let options = ReelOptions::new()
            .with_install_root(install_root.path())
            .with_working_directory(working_directory.path())
            .with_exit_policy(ExitPolicy::Abort);
        let result = Orchestrator::new(options).run_with_relay(&mut CapturedRelay::default());

        match result {
            Err(ReelError::GeneratorFailed { code }) => assert_eq!(code, Some(2)),
            other => panic!("Expected GeneratorFailed, got: {other:?}"),
        }
        assert!(working_directory.path().join("Images/Image1.bmp").exists());
        assert!(!working_directory.path().join("test.mp4").exists());
    }
}
