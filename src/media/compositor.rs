//! ffmpeg-based clip renderer
//!
//! Supports:
//! - Audio duration probing via ffprobe
//! - Still image + narration clips at a low, fixed frame rate
//! - Concat-demuxer joining with re-encode at the same frame rate

use std::fmt::Write as _;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use super::MediaEncoder;
use crate::error::{GenerationError, Result};

/// Configuration for the compositor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Output frame rate of every clip and of the final video
    pub fps: u32,
    /// Video codec
    pub video_codec: String,
    /// Audio codec
    pub audio_codec: String,
    /// Audio bitrate (e.g., "128k")
    pub audio_bitrate: Option<String>,
    /// Additional ffmpeg output arguments
    pub output_args: Vec<String>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: locate("ffmpeg"),
            ffprobe_path: locate("ffprobe"),
            fps: 1,
            video_codec: "mpeg4".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: Some("128k".to_string()),
            output_args: Vec::new(),
        }
    }
}

fn locate(binary: &str) -> String {
    which::which(binary).map_or_else(
        |_| binary.to_string(),
        |p| p.to_string_lossy().to_string(),
    )
}

/// ffmpeg-based clip renderer
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    /// Create a new compositor with default config
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CompositorConfig::default())
    }

    /// Create a new compositor with custom config
    #[must_use]
    pub fn with_config(config: CompositorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Check that ffmpeg and ffprobe can be executed
    pub async fn check_available(&self) -> Vec<(String, bool)> {
        let mut results = Vec::with_capacity(2);
        for binary in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let ok = Command::new(binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map(|s| s.success())
                .unwrap_or(false);
            results.push((binary.clone(), ok));
        }
        results
    }

    fn base_args() -> Vec<String> {
        ["-hide_banner", "-loglevel", "error", "-nostdin", "-y"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect()
    }

    /// Codec, bitrate and frame rate arguments shared by render and concat
    fn encode_args(&self, args: &mut Vec<String>) {
        args.push("-r".to_string());
        args.push(self.config.fps.to_string());

        args.push("-c:v".to_string());
        args.push(self.config.video_codec.clone());
        args.push("-pix_fmt".to_string());
        args.push("yuv420p".to_string());

        args.push("-c:a".to_string());
        args.push(self.config.audio_codec.clone());

        if let Some(ref bitrate) = self.config.audio_bitrate {
            args.push("-b:a".to_string());
            args.push(bitrate.clone());
        }

        args.extend(self.config.output_args.clone());
    }

    /// Build ffmpeg arguments for a still clip
    fn render_args(&self, image: &Path, audio: &Path, duration: f64, output: &Path) -> Vec<String> {
        let mut args = Self::base_args();

        // Image looped at the output frame rate
        args.push("-loop".to_string());
        args.push("1".to_string());
        args.push("-framerate".to_string());
        args.push(self.config.fps.to_string());
        args.push("-i".to_string());
        args.push(image.to_string_lossy().to_string());

        args.push("-i".to_string());
        args.push(audio.to_string_lossy().to_string());

        args.push("-map".to_string());
        args.push("0:v:0".to_string());
        args.push("-map".to_string());
        args.push("1:a:0".to_string());

        // yuv420p needs even dimensions
        args.push("-vf".to_string());
        args.push("scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string());

        self.encode_args(&mut args);

        // The looped image has no end; the probed audio length bounds the clip
        args.push("-shortest".to_string());
        args.push("-t".to_string());
        args.push(format!("{duration:.3}"));

        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Build ffmpeg arguments for the concat demuxer
    fn concat_args(&self, list_file: &Path, output: &Path) -> Vec<String> {
        let mut args = Self::base_args();

        args.extend(
            ["-f", "concat", "-safe", "0", "-i"]
                .iter()
                .map(std::string::ToString::to_string),
        );
        args.push(list_file.to_string_lossy().to_string());

        self.encode_args(&mut args);

        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Per-stream and container durations of a media file
    pub async fn stream_durations(&self, path: &Path) -> Result<MediaDurations> {
        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                GenerationError::Media(format!(
                    "failed to run {}: {e}",
                    self.config.ffprobe_path
                ))
            })?;

        if !output.status.success() {
            return Err(GenerationError::Media(format!(
                "ffprobe failed on {}",
                path.display()
            )));
        }

        let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
        Ok(probe.durations())
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        debug!("ffmpeg args: {:?}", args);

        let output = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                GenerationError::Media(format!(
                    "failed to run {}: {e}",
                    self.config.ffmpeg_path
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::Media(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEncoder for Compositor {
    async fn probe_duration(&self, audio: &Path) -> Result<f64> {
        self.stream_durations(audio).await?.narration().ok_or_else(|| {
            GenerationError::Media(format!("no duration reported for {}", audio.display()))
        })
    }

    async fn render_still(
        &self,
        image: &Path,
        audio: &Path,
        duration: f64,
        output: &Path,
    ) -> Result<()> {
        let args = self.render_args(image, audio, duration, output);
        self.run_ffmpeg(&args).await?;

        info!("Rendered {:.2}s clip to {:?}", duration, output);
        Ok(())
    }

    async fn concat(&self, inputs: &[&Path], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(GenerationError::Media("nothing to concatenate".to_string()));
        }

        // Each clip ends where its narration ends, so the next one starts
        // there instead of after the last whole video frame
        let mut clips = Vec::with_capacity(inputs.len());
        for input in inputs {
            clips.push((*input, self.probe_duration(input).await?));
        }

        let list = concat_list(&clips);
        let list_file = tempfile::Builder::new()
            .prefix("vidmaker-concat-")
            .suffix(".txt")
            .tempfile()?;
        tokio::fs::write(list_file.path(), list).await?;

        let args = self.concat_args(list_file.path(), output);
        self.run_ffmpeg(&args).await?;

        info!("Concatenated {} clips to {:?}", inputs.len(), output);
        Ok(())
    }
}

/// Concat demuxer list: one quoted `file` line per input, cut at its
/// narration length
fn concat_list(clips: &[(&Path, f64)]) -> String {
    let mut list = String::new();
    for (input, outpoint) in clips {
        let quoted = input.to_string_lossy().replace('\'', r"'\''");
        let _ = writeln!(list, "file '{quoted}'");
        let _ = writeln!(list, "outpoint {outpoint:.3}");
    }
    list
}

/// Durations reported by ffprobe, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaDurations {
    /// First video stream
    pub video: Option<f64>,
    /// First audio stream
    pub audio: Option<f64>,
    /// Whole container
    pub container: Option<f64>,
}

impl MediaDurations {
    /// Play length of the audio track, falling back to the container.
    #[must_use]
    pub fn narration(&self) -> Option<f64> {
        self.audio.or(self.container)
    }
}

/// `FFprobe` JSON output structure
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

impl FfprobeOutput {
    fn stream_duration(&self, kind: &str) -> Option<f64> {
        self.streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some(kind))
            .find_map(|s| s.duration.as_deref().and_then(parse_duration))
    }

    fn durations(&self) -> MediaDurations {
        MediaDurations {
            video: self.stream_duration("video"),
            audio: self.stream_duration("audio"),
            container: self
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(parse_duration),
        }
    }
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|d| d.is_finite() && *d > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn compositor() -> Compositor {
        Compositor::with_config(CompositorConfig {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn render_args_hold_image_for_audio_length() {
        let args = compositor().render_args(
            Path::new("/tmp/a.png"),
            Path::new("/tmp/a.mp3"),
            12.3456,
            Path::new("/tmp/a.mp4"),
        );

        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "12.346");
        assert!(args.contains(&"-loop".to_string()));
        assert!(args.contains(&"/tmp/a.png".to_string()));
        assert!(args.contains(&"/tmp/a.mp3".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/a.mp4");
    }

    #[test]
    fn render_args_use_low_frame_rate_and_mpeg4() {
        let args = compositor().render_args(
            Path::new("i.png"),
            Path::new("a.mp3"),
            1.0,
            Path::new("o.mp4"),
        );

        let r = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r + 1], "1");
        let cv = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[cv + 1], "mpeg4");
    }

    #[test]
    fn concat_args_read_list_with_unsafe_paths() {
        let args = compositor().concat_args(Path::new("/tmp/list.txt"), Path::new("/tmp/out.mp4"));

        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "concat"));
        assert!(args.windows(2).any(|w| w[0] == "-safe" && w[1] == "0"));
        assert!(args.contains(&"/tmp/list.txt".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }

    #[test]
    fn render_args_stop_at_shortest_stream() {
        let args = compositor().render_args(
            Path::new("still.png"),
            Path::new("voice.mp3"),
            2.5,
            Path::new("clip.mp4"),
        );

        let shortest = args.iter().position(|a| a == "-shortest").unwrap();
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert!(shortest < args.len() - 1);
        assert_eq!(args[t + 1], "2.500");
    }

    #[test]
    fn concat_list_preserves_order_and_escapes_quotes() {
        let a = PathBuf::from("/tmp/a.mp4");
        let b = PathBuf::from("/tmp/it's.mp4");
        let c = PathBuf::from("/tmp/c.mp4");
        let list = concat_list(&[(a.as_path(), 2.0), (b.as_path(), 3.25), (c.as_path(), 1.5)]);

        assert_eq!(
            list,
            "file '/tmp/a.mp4'\noutpoint 2.000\n\
             file '/tmp/it'\\''s.mp4'\noutpoint 3.250\n\
             file '/tmp/c.mp4'\noutpoint 1.500\n"
        );
    }

    #[test]
    fn concat_list_cuts_each_clip_at_its_narration() {
        let clip = PathBuf::from("/tmp/clip.mp4");
        let list = concat_list(&[(clip.as_path(), 2.0433)]);

        let outpoints: Vec<&str> = list
            .lines()
            .filter_map(|l| l.strip_prefix("outpoint "))
            .collect();
        assert_eq!(outpoints, ["2.043"]);
    }

    #[test]
    fn probe_prefers_audio_stream_duration() {
        let json = r#"{
            "streams": [{"codec_type": "audio", "duration": "3.240000"}],
            "format": {"duration": "3.300000"}
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert!((probe.durations().narration().unwrap() - 3.24).abs() < 1e-9);
    }

    #[test]
    fn durations_are_reported_per_stream() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "duration": "3.000000"},
                {"codec_type": "audio", "duration": "2.043000"}
            ],
            "format": {"duration": "3.000000"}
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let durations = probe.durations();

        assert_eq!(durations.video, Some(3.0));
        assert_eq!(durations.audio, Some(2.043));
        assert_eq!(durations.container, Some(3.0));
    }

    #[test]
    fn probe_falls_back_to_container_duration() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "7.5"}}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert!((probe.durations().narration().unwrap() - 7.5).abs() < 1e-9);
    }

    #[test]
    fn probe_rejects_missing_duration() {
        let json = r#"{"streams": [], "format": {}}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert!(probe.durations().narration().is_none());
    }

    #[tokio::test]
    async fn concat_of_nothing_is_an_error() {
        let err = compositor()
            .concat(&[], Path::new("/tmp/never.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Media(_)));
    }
}
