mod common;

use common::{
    bordered_geometry, engine_with, run_frame, step_to_line, wide_engine, wide_geometry,
};
use emu_core::{SnapshotError, SnapshotReader, SnapshotWriter};
use emu_raster::{RasterConfig, RasterError};

#[test]
fn frame_buffer_survives_round_trip() {
    let mut source = wide_engine();
    source.state_mut().background_color = 3;
    source.chip_mut().symbols[5] = 9;
    run_frame(&mut source);
    run_frame(&mut source);
    step_to_line(&mut source, 6);

    let mut w = SnapshotWriter::new();
    source.write_snapshot(&mut w);
    let bytes = w.into_bytes();

    let mut restored = wide_engine();
    let mut r = SnapshotReader::new(&bytes);
    restored.read_snapshot(&mut r).expect("snapshot restores");

    assert_eq!(r.remaining(), 0);
    assert_eq!(restored.current_line(), 6);
    let (a, b) = (source.canvas().buffer(), restored.canvas().buffer());
    assert_eq!(a.width(), b.width());
    assert_eq!(a.height(), b.height());
    assert_eq!(a.padded(0), b.padded(0));
    assert!(restored.dont_cache(), "restored frame is repainted");
}

#[test]
fn interlaced_fields_survive_round_trip() {
    let config = RasterConfig {
        interlace_allowed: true,
        ..RasterConfig::default()
    };
    let mut source = engine_with(wide_geometry(), config);
    source.canvas_mut().interlaced = true;
    source.state_mut().background_color = 4;
    run_frame(&mut source);
    source.state_mut().background_color = 7;
    run_frame(&mut source);
    run_frame(&mut source);
    assert_eq!(source.canvas().buffer().active_field(), 1);

    let mut w = SnapshotWriter::new();
    source.write_snapshot(&mut w);
    let bytes = w.into_bytes();

    let mut restored = engine_with(wide_geometry(), config);
    restored
        .read_snapshot(&mut SnapshotReader::new(&bytes))
        .expect("snapshot restores");

    let (a, b) = (source.canvas().buffer(), restored.canvas().buffer());
    assert_eq!(b.active_field(), 1);
    assert_eq!(a.padded(0), b.padded(0));
    assert_eq!(a.padded(1), b.padded(1));
}

#[test]
fn truncated_snapshot_leaves_engine_untouched() {
    let mut source = wide_engine();
    run_frame(&mut source);
    let mut w = SnapshotWriter::new();
    source.write_snapshot(&mut w);
    let bytes = w.into_bytes();

    let mut target = wide_engine();
    step_to_line(&mut target, 3);
    let err = target
        .read_snapshot(&mut SnapshotReader::new(&bytes[..bytes.len() - 1]))
        .expect_err("short data is rejected");

    assert!(matches!(
        err,
        RasterError::Snapshot(SnapshotError::UnexpectedEnd { .. })
    ));
    assert_eq!(target.current_line(), 3);
}

#[test]
fn zero_sized_frame_buffer_is_rejected() {
    let mut w = SnapshotWriter::new();
    for word in [0, 0, 12, 0] {
        w.write_u32(word);
    }
    let bytes = w.into_bytes();

    let mut engine = wide_engine();
    let err = engine
        .read_snapshot(&mut SnapshotReader::new(&bytes))
        .expect_err("zero width is rejected");
    assert!(matches!(
        err,
        RasterError::SnapshotGeometry {
            width: 0,
            height: 12
        }
    ));
}

#[test]
fn snapshot_from_other_geometry_is_rejected() {
    let mut source = engine_with(bordered_geometry(), RasterConfig::default());
    run_frame(&mut source);
    let mut w = SnapshotWriter::new();
    source.write_snapshot(&mut w);
    let bytes = w.into_bytes();

    let mut target = wide_engine();
    run_frame(&mut target);
    let err = target
        .read_snapshot(&mut SnapshotReader::new(&bytes))
        .expect_err("narrower frame buffer is rejected");
    assert!(matches!(
        err,
        RasterError::SnapshotGeometry {
            width: 64,
            height: 10
        }
    ));

    assert_eq!(target.canvas().buffer().width(), 320);
    let (width, _, _) = target.screenshot_rgba(&[0xFF00_0000]).expect("screenshot");
    assert_eq!(width, 320);
}

#[test]
fn out_of_range_line_restarts_the_frame() {
    let engine = wide_engine();
    let buffer = engine.canvas().buffer();
    let mut w = SnapshotWriter::new();
    w.write_u32(500);
    w.write_u32(buffer.width());
    w.write_u32(buffer.height());
    w.write_u32(0);
    w.write_bytes(buffer.padded(0));
    let bytes = w.into_bytes();

    let mut restored = wide_engine();
    step_to_line(&mut restored, 4);
    restored
        .read_snapshot(&mut SnapshotReader::new(&bytes))
        .expect("snapshot restores");
    assert_eq!(restored.current_line(), 0);
}

#[test]
fn screenshot_encodes_displayed_lines() {
    let mut engine = wide_engine();
    engine.state_mut().background_color = 2;
    run_frame(&mut engine);

    let palette = [0xFF00_0000, 0xFFFF_FFFF, 0xFF88_0000];
    let (width, height, rgba) = engine.screenshot_rgba(&palette).expect("screenshot");
    assert_eq!((width, height), (320, 12));
    // Line 4 is a graphics line showing the background colour.
    let offset = (4 * 320) * 4;
    assert_eq!(&rgba[offset..offset + 4], &[0x88, 0x00, 0x00, 0xFF]);

    let mut png_bytes = Vec::new();
    engine
        .write_screenshot(&palette, &mut png_bytes)
        .expect("png encodes");

    let decoder = png::Decoder::new(png_bytes.as_slice());
    let mut reader = decoder.read_info().expect("png header");
    let mut decoded = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut decoded).expect("png frame");
    assert_eq!((info.width, info.height), (320, 12));
    assert_eq!(&decoded[..info.buffer_size()], rgba.as_slice());
}
