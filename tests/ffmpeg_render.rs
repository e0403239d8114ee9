//! End-to-end rendering through the real ffmpeg/ffprobe binaries.
//!
//! Skipped (with a note on stderr) when either binary is missing.

use std::path::{Path, PathBuf};
use std::process::Command;

use vidmaker::{Compositor, CompositorConfig, MediaEncoder};

fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

/// Run ffmpeg with lavfi inputs to produce a fixture file.
fn make_fixture(args: &[&str], output: &Path) {
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
        .args(args)
        .arg(output)
        .status()
        .expect("ffmpeg should run");
    assert!(status.success(), "fixture generation failed for {output:?}");
}

fn tone(dir: &Path, name: &str, seconds: f64) -> PathBuf {
    let path = dir.join(name);
    let source = format!("sine=frequency=440:duration={seconds}");
    make_fixture(&["-f", "lavfi", "-i", &source, "-c:a", "aac"], &path);
    path
}

fn still(dir: &Path, name: &str, color: &str) -> PathBuf {
    let path = dir.join(name);
    let source = format!("color=c={color}:s=320x240");
    make_fixture(&["-f", "lavfi", "-i", &source, "-frames:v", "1"], &path);
    path
}

/// Largest gap allowed between a track and its target length: one frame
/// at `fps`, plus encoder rounding.
fn frame_slack(fps: u32) -> f64 {
    1.0 / f64::from(fps) + 0.05
}

async fn render_clip(
    compositor: &Compositor,
    dir: &Path,
    name: &str,
    seconds: f64,
) -> (PathBuf, f64) {
    let audio = tone(dir, &format!("{name}.m4a"), seconds);
    let image = still(dir, &format!("{name}.png"), "blue");
    let length = compositor.probe_duration(&audio).await.unwrap();
    assert!((length - seconds).abs() < 0.2, "probed {length}");

    let clip = dir.join(format!("{name}.mp4"));
    compositor
        .render_still(&image, &audio, length, &clip)
        .await
        .unwrap();
    (clip, length)
}

#[tokio::test]
async fn clip_video_track_ends_with_the_narration() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    for fps in [1, 5] {
        let compositor = Compositor::with_config(CompositorConfig {
            fps,
            ..Default::default()
        });
        let (clip, length) =
            render_clip(&compositor, dir.path(), &format!("fps{fps}"), 2.3).await;

        let durations = compositor.stream_durations(&clip).await.unwrap();
        let video = durations.video.expect("clip has a video stream");
        let container = durations.container.expect("clip has a container duration");

        assert!(
            (video - length).abs() <= frame_slack(fps),
            "video track lasts {video}s for {length}s of audio at {fps} fps"
        );
        assert!(
            (container - length).abs() <= frame_slack(fps),
            "clip lasts {container}s for {length}s of audio at {fps} fps"
        );
    }
}

#[tokio::test]
async fn joined_video_is_the_sum_of_its_narrations() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let fps = 1;
    let compositor = Compositor::with_config(CompositorConfig {
        fps,
        ..Default::default()
    });

    // Fractional lengths make the 1 fps video track overrun each clip
    let mut clips = Vec::new();
    let mut expected = 0.0;
    for (name, seconds) in [("a", 2.3), ("b", 1.6), ("c", 3.4)] {
        let (clip, length) = render_clip(&compositor, dir.path(), name, seconds).await;
        expected += length;
        clips.push(clip);
    }

    let joined = dir.path().join("joined.mp4");
    let inputs: Vec<&Path> = clips.iter().map(PathBuf::as_path).collect();
    compositor.concat(&inputs, &joined).await.unwrap();

    let durations = compositor.stream_durations(&joined).await.unwrap();
    let audio = durations.audio.expect("joined video keeps its soundtrack");
    let container = durations.container.expect("joined video has a duration");

    assert!(
        (audio - expected).abs() <= 0.2,
        "joined narration lasts {audio}s, expected {expected}s"
    );
    assert!(
        (container - expected).abs() <= frame_slack(fps),
        "joined video lasts {container}s, expected {expected}s"
    );
}

#[tokio::test]
async fn render_reports_ffmpeg_errors() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let compositor = Compositor::new();
    let bogus = dir.path().join("not-an-image.png");
    std::fs::write(&bogus, b"definitely not a png").unwrap();
    let audio = tone(dir.path(), "a.m4a", 1.0);

    let err = compositor
        .render_still(&bogus, &audio, 1.0, &dir.path().join("out.mp4"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("ffmpeg"), "{err}");
}
