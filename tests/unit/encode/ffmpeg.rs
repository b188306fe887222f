use super::*;
use crate::capture::transcode::ImageCodec;
use crate::encode::encoder::{AudioTrack, EncoderParams};
use crate::foundation::core::{Fps, PixelSize};

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

fn window(args: &[String], needle: &[&str]) -> bool {
    args.windows(needle.len())
        .any(|w| w.iter().zip(needle).all(|(a, b)| a == b))
}

fn image_job(audio: Option<AudioTrack>) -> EncodeJob {
    EncodeJob {
        fps: Fps::new(30000, 1001).unwrap(),
        input: EncodeInput::ImageSequence {
            dir: PathBuf::from("/stage/frames"),
            pattern: "frame_%05d.jpg".to_string(),
            start_number: 1,
            frame_count: 10,
            codec: ImageCodec::Jpeg,
        },
        audio,
        params: EncoderParams::new("veryfast", 23),
        output_path: PathBuf::from("/stage/output.mp4"),
    }
}

#[test]
fn image_sequence_args() {
    let args = strings(&FfmpegEncoder::build_args(&image_job(None)).unwrap());
    assert!(window(&args, &["-framerate", "30000/1001"]));
    assert!(window(&args, &["-start_number", "1"]));
    assert!(args.iter().any(|a| a.ends_with("frame_%05d.jpg")));
    assert!(window(&args, &["-preset", "veryfast", "-crf", "23"]));
    assert!(window(&args, &["-pix_fmt", "yuv420p"]));
    assert!(args.contains(&"-an".to_string()));
    assert!(!args.contains(&"-shortest".to_string()));
    assert_eq!(args.last().unwrap(), "/stage/output.mp4");
}

#[test]
fn raw_args_declare_geometry_before_input() {
    let job = EncodeJob {
        input: EncodeInput::RawPixels {
            path: PathBuf::from("/stage/frames.rgba"),
            size: PixelSize::new(810, 1440),
            pixel_format: "rgba".to_string(),
            frame_count: 5,
        },
        ..image_job(None)
    };
    let args = strings(&FfmpegEncoder::build_args(&job).unwrap());
    assert!(window(&args, &["-f", "rawvideo", "-pix_fmt", "rgba", "-s", "810x1440"]));
    let r = args.iter().position(|a| a == "-r").unwrap();
    let i = args.iter().position(|a| a == "-i").unwrap();
    assert!(r < i);
}

#[test]
fn odd_raw_geometry_is_rejected() {
    let job = EncodeJob {
        input: EncodeInput::RawPixels {
            path: PathBuf::from("/stage/frames.rgba"),
            size: PixelSize::new(15, 16),
            pixel_format: "rgba".to_string(),
            frame_count: 5,
        },
        ..image_job(None)
    };
    assert!(FfmpegEncoder::build_args(&job).is_err());
}

#[test]
fn looped_audio_args() {
    let job = image_job(Some(AudioTrack {
        path: PathBuf::from("/stage/audio.mp3"),
        looped: true,
    }));
    let args = strings(&FfmpegEncoder::build_args(&job).unwrap());
    assert!(window(&args, &["-stream_loop", "-1", "-i", "/stage/audio.mp3"]));
    assert!(args.contains(&"-shortest".to_string()));
    assert!(window(&args, &["-c:a", "aac", "-b:a", "192k"]));

    let once = image_job(Some(AudioTrack {
        path: PathBuf::from("/stage/audio.mp3"),
        looped: false,
    }));
    let args = strings(&FfmpegEncoder::build_args(&once).unwrap());
    assert!(!args.contains(&"-stream_loop".to_string()));
}

#[test]
fn missing_program_is_an_encoding_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = image_job(None);
    job.output_path = dir.path().join("out.mp4");
    let mut enc = FfmpegEncoder::with_program(dir.path().join("no-such-ffmpeg"));
    assert!(matches!(enc.encode(&job), Err(CaptureError::Encoding(_))));
}
