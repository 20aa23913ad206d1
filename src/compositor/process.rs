//! Process-backed compositor: ImageMagick for stills, ffmpeg/ffprobe for video.

use super::{
    ClipInfo, CompositionCommand, MediaCompositor, AUDIO_BITRATE, VIDEO_CRF, VIDEO_FPS,
    VIDEO_PIXEL_FORMAT, VIDEO_PRESET,
};
use crate::error::CompositorError;
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCompositor {
    magick: String,
    ffmpeg: String,
    ffprobe: String,
}

impl Default for ProcessCompositor {
    fn default() -> Self {
        Self {
            magick: "magick".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

/// Program plus arguments for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
}

impl Invocation {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn video_profile(self) -> Self {
        self.args([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            VIDEO_PRESET.to_string(),
            "-crf".to_string(),
            VIDEO_CRF.to_string(),
            "-r".to_string(),
            VIDEO_FPS.to_string(),
            "-pix_fmt".to_string(),
            VIDEO_PIXEL_FORMAT.to_string(),
        ])
    }
}

impl ProcessCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_programs(
        magick: impl Into<String>,
        ffmpeg: impl Into<String>,
        ffprobe: impl Into<String>,
    ) -> Self {
        Self {
            magick: magick.into(),
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Build the argv for a command without running it
    pub fn invocation(&self, command: &CompositionCommand) -> Invocation {
        match command {
            CompositionCommand::AppendHorizontal {
                inputs,
                gutter,
                output,
            } => Invocation::new(&self.magick)
                .args(inputs.iter().map(|p| p.as_os_str().to_owned()))
                .args(["+smush".to_string(), gutter.to_string()])
                .arg(output.as_os_str()),
            CompositionCommand::AppendVertical {
                inputs,
                gutter,
                output,
            } => Invocation::new(&self.magick)
                .args(inputs.iter().map(|p| p.as_os_str().to_owned()))
                .args(["-smush".to_string(), gutter.to_string()])
                .arg(output.as_os_str()),
            CompositionCommand::Tile {
                inputs,
                columns,
                gutter,
                output,
            } => Invocation::new(&self.magick)
                .arg("montage")
                .args(inputs.iter().map(|p| p.as_os_str().to_owned()))
                .args([
                    "-tile".to_string(),
                    format!("{}x", columns),
                    "-geometry".to_string(),
                    format!("+{}+{}", gutter, gutter),
                ])
                .arg(output.as_os_str()),
            CompositionCommand::StillClip {
                image,
                duration,
                width,
                height,
                output,
            } => Invocation::new(&self.ffmpeg)
                .args(["-y", "-loop", "1", "-i"])
                .arg(image.as_os_str())
                .args([
                    "-t".to_string(),
                    duration.to_string(),
                    "-vf".to_string(),
                    format!(
                        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
                        w = width,
                        h = height
                    ),
                ])
                .video_profile()
                .arg("-an")
                .arg(output.as_os_str()),
            CompositionCommand::ReEncode { input, output } => Invocation::new(&self.ffmpeg)
                .args(["-y", "-i"])
                .arg(input.as_os_str())
                .video_profile()
                .arg("-an")
                .arg(output.as_os_str()),
            CompositionCommand::Crossfade {
                first,
                second,
                duration,
                offset,
                fade_out_start,
                fade_out,
                output,
            } => Invocation::new(&self.ffmpeg)
                .args(["-y", "-i"])
                .arg(first.as_os_str())
                .arg("-i")
                .arg(second.as_os_str())
                .args([
                    "-filter_complex".to_string(),
                    format!(
                        "[0:v][1:v]xfade=transition=fade:duration={}:offset={},fade=t=out:st={}:d={}[v]",
                        duration, offset, fade_out_start, fade_out
                    ),
                    "-map".to_string(),
                    "[v]".to_string(),
                    "-c:v".to_string(),
                    "libx264".to_string(),
                    "-preset".to_string(),
                    VIDEO_PRESET.to_string(),
                    "-crf".to_string(),
                    VIDEO_CRF.to_string(),
                    "-movflags".to_string(),
                    "+faststart".to_string(),
                    "-an".to_string(),
                ])
                .arg(output.as_os_str()),
            CompositionCommand::AudioMix {
                video,
                audio,
                fade_in,
                fade_out_start,
                fade_out,
                volume,
                output,
            } => Invocation::new(&self.ffmpeg)
                .args(["-y", "-i"])
                .arg(video.as_os_str())
                .arg("-i")
                .arg(audio.as_os_str())
                .args([
                    "-filter_complex".to_string(),
                    format!(
                        "[1:a]afade=t=in:d={},afade=t=out:st={}:d={},volume={}[a]",
                        fade_in, fade_out_start, fade_out, volume
                    ),
                    "-map".to_string(),
                    "0:v".to_string(),
                    "-map".to_string(),
                    "[a]".to_string(),
                    "-c:v".to_string(),
                    "copy".to_string(),
                    "-c:a".to_string(),
                    "aac".to_string(),
                    "-b:a".to_string(),
                    AUDIO_BITRATE.to_string(),
                    "-shortest".to_string(),
                    "-movflags".to_string(),
                    "+faststart".to_string(),
                ])
                .arg(output.as_os_str()),
        }
    }

    fn clip_info_invocation(&self, clip: &Path) -> Invocation {
        Invocation::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(clip.as_os_str())
    }

    async fn execute(&self, invocation: &Invocation) -> Result<Vec<u8>, CompositorError> {
        debug!(program = %invocation.program, args = ?invocation.args, "Running compositor");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .await
            .map_err(|source| CompositorError::SpawnFailed {
                tool: invocation.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(CompositorError::CommandFailed {
                tool: invocation.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ClipInfoOut {
    #[serde(default)]
    streams: Vec<ClipStream>,
    format: Option<ClipFormat>,
}

#[derive(Debug, Deserialize)]
struct ClipStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ClipFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json` output into clip info
pub fn parse_clip_info_output(clip: &Path, stdout: &[u8]) -> Result<ClipInfo, CompositorError> {
    let fail = |message: String| CompositorError::ClipInfoFailed {
        path: clip.to_path_buf(),
        message,
    };
    let parsed: ClipInfoOut = serde_json::from_slice(stdout)
        .map_err(|e| fail(format!("ffprobe json parse failed: {}", e)))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| fail("no video stream found".to_string()))?;
    let width = video
        .width
        .ok_or_else(|| fail("missing video width".to_string()))?;
    let height = video
        .height
        .ok_or_else(|| fail("missing video height".to_string()))?;
    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| fail("missing or invalid duration".to_string()))?;
    Ok(ClipInfo {
        duration,
        width,
        height,
    })
}

#[async_trait]
impl MediaCompositor for ProcessCompositor {
    async fn compose(&self, command: &CompositionCommand) -> Result<(), CompositorError> {
        if let Some(parent) = command.output().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        self.execute(&self.invocation(command)).await.map(|_| ())
    }

    async fn clip_info(&self, clip: &Path) -> Result<ClipInfo, CompositorError> {
        let stdout = self.execute(&self.clip_info_invocation(clip)).await?;
        parse_clip_info_output(clip, &stdout)
    }
}
