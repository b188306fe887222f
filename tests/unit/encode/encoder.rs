use super::*;

fn fps() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn in_memory_encoder_reads_back_image_sequences() {
    let dir = tempfile::tempdir().unwrap();
    for seq in 1..=3u8 {
        std::fs::write(dir.path().join(format!("frame_{seq:05}.jpg")), [seq; 4]).unwrap();
    }
    let job = EncodeJob {
        fps: fps(),
        input: EncodeInput::ImageSequence {
            dir: dir.path().to_path_buf(),
            pattern: "frame_%05d.jpg".to_string(),
            start_number: 1,
            frame_count: 3,
            codec: ImageCodec::Jpeg,
        },
        audio: None,
        params: EncoderParams::default(),
        output_path: dir.path().join("out.mp4"),
    };

    let mut enc = InMemoryEncoder::new();
    let out = enc.encode(&job).unwrap();
    assert_eq!(out, b"framestage:images:3@30/1:audio=false".to_vec());
    assert_eq!(enc.jobs().len(), 1);
    match &enc.jobs()[0].input {
        RecordedInput::Images(images) => {
            assert_eq!(images.len(), 3);
            assert_eq!(images[2], vec![3u8; 4]);
        }
        other => panic!("unexpected input: {other:?}"),
    }
}

#[test]
fn in_memory_encoder_records_raw_blob_and_audio() {
    let dir = tempfile::tempdir().unwrap();
    let blob = dir.path().join("frames.rgba");
    std::fs::write(&blob, vec![9u8; 2 * 2 * 4 * 2]).unwrap();
    let audio = dir.path().join("audio.wav");
    std::fs::write(&audio, b"RIFF").unwrap();

    let job = EncodeJob {
        fps: fps(),
        input: EncodeInput::RawPixels {
            path: blob,
            size: PixelSize::new(2, 2),
            pixel_format: "rgba".to_string(),
            frame_count: 2,
        },
        audio: Some(AudioTrack {
            path: audio,
            looped: true,
        }),
        params: EncoderParams::default(),
        output_path: dir.path().join("out.mp4"),
    };

    let mut enc = InMemoryEncoder::new();
    enc.encode(&job).unwrap();
    let rec = &enc.jobs()[0];
    assert_eq!(rec.input, RecordedInput::Raw(vec![9u8; 32]));
    assert_eq!(rec.audio.as_deref(), Some(&b"RIFF"[..]));
    assert!(job.input.image_path(1).is_none());
}

#[test]
fn failing_encoder_reports_encoding_error() {
    let dir = tempfile::tempdir().unwrap();
    let blob = dir.path().join("frames.rgba");
    std::fs::write(&blob, [0u8; 16]).unwrap();
    let job = EncodeJob {
        fps: fps(),
        input: EncodeInput::RawPixels {
            path: blob,
            size: PixelSize::new(2, 2),
            pixel_format: "rgba".to_string(),
            frame_count: 1,
        },
        audio: None,
        params: EncoderParams::default(),
        output_path: dir.path().join("out.mp4"),
    };
    let mut enc = InMemoryEncoder::failing("boom");
    assert!(matches!(enc.encode(&job), Err(CaptureError::Encoding(m)) if m == "boom"));
    assert_eq!(enc.jobs().len(), 1);
}

#[test]
fn missing_frame_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let job = EncodeJob {
        fps: fps(),
        input: EncodeInput::ImageSequence {
            dir: dir.path().to_path_buf(),
            pattern: "frame_%05d.png".to_string(),
            start_number: 1,
            frame_count: 1,
            codec: ImageCodec::Png,
        },
        audio: None,
        params: EncoderParams::default(),
        output_path: dir.path().join("out.mp4"),
    };
    assert!(matches!(
        InMemoryEncoder::new().encode(&job),
        Err(CaptureError::Other(_))
    ));
}
