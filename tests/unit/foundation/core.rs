use super::*;

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(2)).is_err());
}

#[test]
fn chunks_truncate_last_batch() {
    let chunks: Vec<_> = FrameRange::first(24).chunks(20).collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len_frames(), 20);
    assert_eq!(chunks[1].start, FrameIndex(20));
    assert_eq!(chunks[1].len_frames(), 4);
}

#[test]
fn chunks_of_zero_size_fall_back_to_single_frames() {
    assert_eq!(FrameRange::first(3).chunks(0).count(), 3);
    assert_eq!(FrameRange::first(0).chunks(8).count(), 0);
}

#[test]
fn fps_frames_secs_roundtrip_floor() {
    let fps = Fps::new(30000, 1001).unwrap();
    let secs = fps.frames_to_secs(123);
    assert_eq!(fps.secs_to_frames_floor(secs), 123);
    assert_eq!(fps.to_ffmpeg_rate(), "30000/1001");
}

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn scaled_even_matches_three_quarter_portrait_export() {
    let src = PixelSize::new(1080, 1920);
    let out = src.scaled_even(0.75);
    assert_eq!(out, PixelSize::new(810, 1440));
    assert_eq!(out.rgba_len(), 810 * 1440 * 4);
}

#[test]
fn scaled_even_rounds_odd_results_down_to_even() {
    assert_eq!(
        PixelSize::new(101, 99).scaled_even(1.0),
        PixelSize::new(100, 98)
    );
    assert_eq!(PixelSize::new(3, 3).scaled_even(0.1), PixelSize::new(2, 2));
}

#[test]
fn sequence_numbers_are_one_based() {
    assert_eq!(FrameIndex(0).sequence_number(), 1);
    assert_eq!(FrameIndex(41).sequence_number(), 42);
}
