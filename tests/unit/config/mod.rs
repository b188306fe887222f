use super::*;

fn settings(preset: QualityPreset) -> ExportSettings {
    ExportSettings {
        preset,
        frame_count: Some(24),
        ..ExportSettings::default()
    }
}

#[test]
fn standard_preset_scales_to_three_quarters() {
    let cfg = CaptureConfig::derive(
        &settings(QualityPreset::Standard),
        PixelSize::new(1080, 1920),
    )
    .unwrap();
    assert_eq!(cfg.export, PixelSize::new(810, 1440));
    assert_eq!(cfg.frame_bytes(), 810 * 1440 * 4);
    assert_eq!(cfg.batch_size, 20);
    assert!(cfg.use_raw_pixels);
    assert!(cfg.needs_resample());
}

#[test]
fn full_scale_keeps_even_source_size() {
    let cfg = CaptureConfig::derive(&settings(QualityPreset::High), PixelSize::new(640, 360))
        .unwrap();
    assert_eq!(cfg.export, PixelSize::new(640, 360));
    assert!(!cfg.needs_resample());
}

#[test]
fn full_scale_rounds_odd_source_down_to_even() {
    for preset in [QualityPreset::High, QualityPreset::Lossless] {
        let cfg = CaptureConfig::derive(&settings(preset), PixelSize::new(1081, 1921)).unwrap();
        assert_eq!(cfg.export, PixelSize::new(1080, 1920));
        assert!(cfg.needs_resample());
    }

    let mut s = settings(QualityPreset::Standard);
    s.resolution_scale = Some(1.0);
    let cfg = CaptureConfig::derive(&s, PixelSize::new(641, 361)).unwrap();
    assert_eq!(cfg.export, PixelSize::new(640, 360));

    let job = crate::encode::encoder::EncodeJob {
        fps: cfg.fps,
        input: crate::encode::encoder::EncodeInput::RawPixels {
            path: std::path::PathBuf::from("frames.rgba"),
            size: cfg.export,
            pixel_format: "rgba".to_string(),
            frame_count: cfg.frame_count,
        },
        audio: None,
        params: cfg.encoder.clone(),
        output_path: std::path::PathBuf::from("out.mp4"),
    };
    assert!(crate::encode::ffmpeg::FfmpegEncoder::build_args(&job).is_ok());
}

#[test]
fn frame_count_falls_back_to_duration() {
    let s = ExportSettings {
        fps: 30,
        duration_secs: 2.5,
        ..ExportSettings::default()
    };
    let cfg = CaptureConfig::derive(&s, PixelSize::new(64, 64)).unwrap();
    assert_eq!(cfg.frame_count, 75);
}

#[test]
fn overrides_win_over_preset() {
    let s = ExportSettings {
        batch_size: Some(3),
        compression_quality: Some(50),
        use_raw_pixels: Some(false),
        resolution_scale: Some(0.5),
        ..settings(QualityPreset::High)
    };
    let cfg = CaptureConfig::derive(&s, PixelSize::new(100, 60)).unwrap();
    assert_eq!(cfg.batch_size, 3);
    assert_eq!(cfg.compression_quality, 50);
    assert!(!cfg.use_raw_pixels);
    assert_eq!(cfg.export, PixelSize::new(50, 30));
}

#[test]
fn invalid_values_are_rejected() {
    let zero_scale = ExportSettings {
        resolution_scale: Some(0.0),
        ..settings(QualityPreset::Standard)
    };
    assert!(matches!(
        CaptureConfig::derive(&zero_scale, PixelSize::new(64, 64)),
        Err(CaptureError::Validation(_))
    ));

    let zero_batch = ExportSettings {
        batch_size: Some(0),
        ..settings(QualityPreset::Standard)
    };
    assert!(CaptureConfig::derive(&zero_batch, PixelSize::new(64, 64)).is_err());

    let zero_frames = ExportSettings {
        frame_count: Some(0),
        ..ExportSettings::default()
    };
    assert!(CaptureConfig::derive(&zero_frames, PixelSize::new(64, 64)).is_err());

    assert!(CaptureConfig::derive(&settings(QualityPreset::High), PixelSize::new(0, 64)).is_err());
}

#[test]
fn lossless_uses_png_frames() {
    let cfg = CaptureConfig::derive(&settings(QualityPreset::Lossless), PixelSize::new(64, 64))
        .unwrap();
    assert_eq!(cfg.image_codec, ImageCodec::Png);
    assert_eq!(cfg.encoder.crf, 0);
}

#[test]
fn settings_parse_from_json() {
    let s = ExportSettings::from_json_str(
        r#"{ "preset": "draft", "fps": 24, "frame_count": 10, "batch_size": 4 }"#,
    )
    .unwrap();
    assert_eq!(s.preset, QualityPreset::Draft);
    assert_eq!(s.fps, 24);
    assert_eq!(s.frame_count().unwrap(), 10);
    assert_eq!(s.batch_size, Some(4));

    assert!(matches!(
        ExportSettings::from_json_str(r#"{ "presett": "draft" }"#),
        Err(CaptureError::Validation(_))
    ));
}

#[test]
fn settings_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");
    std::fs::write(&path, r#"{ "preset": "high", "duration_secs": 1.0 }"#).unwrap();
    let s = ExportSettings::from_path(&path).unwrap();
    assert_eq!(s.preset, QualityPreset::High);
    assert_eq!(s.frame_count().unwrap(), 30);

    let missing = ExportSettings::from_path(dir.path().join("nope.json"));
    assert!(matches!(missing, Err(CaptureError::Other(_))));
}

#[test]
fn preset_names_match_settings_files() {
    for preset in QualityPreset::ALL {
        let json = format!(r#"{{ "preset": "{}" }}"#, preset.name());
        assert_eq!(ExportSettings::from_json_str(&json).unwrap().preset, preset);
    }
}

#[test]
fn preset_batch_sizes_decrease_with_quality() {
    let sizes: Vec<usize> = QualityPreset::ALL
        .iter()
        .map(|p| p.params().batch_size)
        .collect();
    assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn audio_settings_default_to_none() {
    let s = ExportSettings::from_json_str(r#"{ "audio_path": "music.mp3", "audio_loop": true }"#)
        .unwrap();
    assert_eq!(s.audio_path.as_deref(), Some(std::path::Path::new("music.mp3")));
    assert!(s.audio_loop);
    assert_eq!(ExportSettings::default().audio_path, None);
}
