use super::*;
use crate::render::pool::PoolOpts;

fn gradient(size: PixelSize) -> Vec<u8> {
    let mut out = Vec::with_capacity(size.rgba_len());
    for y in 0..size.height {
        for x in 0..size.width {
            out.extend_from_slice(&[
                (x * 255 / size.width.max(1)) as u8,
                (y * 255 / size.height.max(1)) as u8,
                96,
                255,
            ]);
        }
    }
    out
}

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[test]
fn jpeg_roundtrip_stays_within_lossy_tolerance() {
    let size = PixelSize::new(32, 16);
    let src = gradient(size);
    let mut pool = BufferPool::new(PoolOpts::default());

    let jpg = PixelTranscoder::new(ImageCodec::Jpeg)
        .to_compressed_image(&src, size, 92, &mut pool)
        .unwrap();
    assert_eq!(&jpg[..2], &[0xFF, 0xD8]);

    let decoded = decode(&jpg);
    assert_eq!(decoded.dimensions(), (32, 16));
    assert_eq!(decoded.as_raw().len(), src.len());
    let max_err = decoded
        .as_raw()
        .chunks_exact(4)
        .zip(src.chunks_exact(4))
        .flat_map(|(d, s)| (0..3).map(move |c| (i16::from(d[c]) - i16::from(s[c])).abs()))
        .max()
        .unwrap();
    assert!(max_err <= 24, "max channel error {max_err}");
}

#[test]
fn png_roundtrip_is_exact() {
    let size = PixelSize::new(8, 8);
    let src = gradient(size);
    let mut pool = BufferPool::new(PoolOpts::default());

    let png = PixelTranscoder::new(ImageCodec::Png)
        .to_compressed_image(&src, size, 100, &mut pool)
        .unwrap();
    assert_eq!(decode(&png).as_raw(), &src);
}

#[test]
fn channel_order_is_preserved() {
    let size = PixelSize::new(16, 16);
    let src: Vec<u8> = std::iter::repeat_n([250u8, 10, 10, 255], 256)
        .flatten()
        .collect();
    let mut pool = BufferPool::new(PoolOpts::default());
    let jpg = PixelTranscoder::new(ImageCodec::Jpeg)
        .to_compressed_image(&src, size, 90, &mut pool)
        .unwrap();
    let px = decode(&jpg).get_pixel(8, 8).0;
    assert!(px[0] > 200 && px[1] < 60 && px[2] < 60, "{px:?}");
}

#[test]
fn mis_sized_buffer_is_rejected() {
    let mut pool = BufferPool::new(PoolOpts::default());
    let err = PixelTranscoder::default()
        .to_compressed_image(&[0u8; 10], PixelSize::new(2, 2), 80, &mut pool)
        .unwrap_err();
    assert!(matches!(err, CaptureError::PixelSizeMismatch { .. }));
}

#[test]
fn drawing_surface_returns_to_pool() {
    let size = PixelSize::new(4, 4);
    let src = gradient(size);
    let mut pool = BufferPool::new(PoolOpts::default());
    let t = PixelTranscoder::default();
    t.to_compressed_image(&src, size, 80, &mut pool).unwrap();
    t.to_compressed_image(&src, size, 80, &mut pool).unwrap();
    let st = pool.stats();
    assert_eq!(st.alloc_surfaces, 1);
    assert_eq!(st.retained_surfaces, 1);
}

#[test]
fn downsample_produces_exact_target_len() {
    let src_size = PixelSize::new(40, 20);
    let dst_size = PixelSize::new(30, 14);
    let out = PixelTranscoder::default()
        .downsample(&gradient(src_size), src_size, dst_size)
        .unwrap();
    assert_eq!(out.len(), dst_size.rgba_len());
}

#[test]
fn downsample_keeps_flat_colour() {
    let src_size = PixelSize::new(8, 8);
    let src: Vec<u8> = std::iter::repeat_n([12u8, 200, 40, 255], 64)
        .flatten()
        .collect();
    let out = PixelTranscoder::default()
        .downsample(&src, src_size, PixelSize::new(4, 4))
        .unwrap();
    assert!(out.chunks_exact(4).all(|px| px == [12, 200, 40, 255]));
}
