//! End-to-end decode tests over synthetic SXM files.

use nanonis_sxm::{
    BodyError, CalibrationMode, Direction, HeaderError, LoadOptions, ScanDirection, SpmImage,
    SxmError,
};

// =============================================================================
// Fixture builders
// =============================================================================

/// Serialize header fields into the on-disk text layout, sentinel included.
fn header(fields: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (key, value) in fields {
        out.push_str(&format!(":{key}:\n{value}\n"));
    }
    out.push_str(":SCANIT_END:\n");
    out
}

fn body(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn file(header_text: &str, samples: &[f32]) -> Vec<u8> {
    let mut bytes = header_text.as_bytes().to_vec();
    bytes.extend_from_slice(&body(samples));
    bytes
}

/// The standard two-channel fixture header: Z and Current, both directions,
/// 4x4 pixels, 1x1 um, scanned up.
fn two_channel_header() -> String {
    header(&[
        ("NANONIS_VERSION", "2"),
        ("SCAN_PIXELS", "4 4"),
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", "up"),
        (
            "DATA_INFO",
            "\tChannel\tName\tUnit\tDirection\tCalibration\tOffset\n\
             \t14\tZ\tm\tboth\t9.000E-9\t0.000E+0\n\
             \t0\tCurrent\tA\tboth\t1.000E-9\t0.000E+0",
        ),
    ])
}

fn decode(bytes: &[u8]) -> Result<SpmImage, SxmError> {
    SpmImage::from_bytes(bytes, LoadOptions::default())
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[test]
fn two_channel_bidirectional_file_decodes_in_full() {
    // 2 channels x 2 directions x 16 samples x 4 bytes = 256 body bytes.
    let samples: Vec<f32> = (0..64).map(|v| v as f32).collect();
    let bytes = file(&two_channel_header(), &samples);
    assert_eq!(bytes.len() - two_channel_header().len(), 256);

    let image = decode(&bytes).unwrap();
    assert_eq!(image.scan_pixels(), [4, 4]);
    assert_eq!(image.scan_size(), [1e-6, 1e-6]);
    assert_eq!(image.scan_direction(), ScanDirection::Up);
    assert_eq!(image.channel_names(), vec!["Z", "Current"]);

    // Current forward is the third grid on disk: samples 32..48, row-major,
    // unflipped since the scan direction is up.
    let current = image.grid("Current", Direction::Forward).unwrap();
    assert_eq!(current.shape(), &[4, 4]);
    for r in 0..4 {
        for c in 0..4 {
            assert_eq!(current[[r, c]], (32 + r * 4 + c) as f32);
        }
    }
}

#[test]
fn metadata_round_trips_from_synthetic_header() {
    let fields = [
        ("NANONIS_VERSION", "2"),
        ("SCAN_PIXELS", "8 6"),
        ("SCAN_RANGE", "2.0E-6 1.5E-6"),
        ("SCAN_DIR", "down"),
        ("BIAS", "0.35"),
        ("COMMENT", "test grid"),
        (
            "DATA_INFO",
            "\tChannel\tName\tUnit\tDirection\tCalibration\tOffset\n\
             \t14\tZ\tm\tfwd\t1.0\t0.0",
        ),
    ];
    let samples = vec![0.0f32; 48];
    let bytes = file(&header(&fields), &samples);

    let image = decode(&bytes).unwrap();
    assert_eq!(image.scan_pixels(), [8, 6]);
    assert_eq!(image.scan_size(), [2.0e-6, 1.5e-6]);
    assert_eq!(image.scan_direction(), ScanDirection::Down);
    assert_eq!(image.channel_names(), vec!["Z"]);
    assert_eq!(image.header().bias(), Some(0.35));
    assert_eq!(image.header().comment(), Some("test grid"));
}

#[test]
fn non_square_grid_shape_is_rows_by_columns() {
    let fields = [
        ("SCAN_PIXELS", "3 2"), // 3 columns, 2 rows
        ("SCAN_RANGE", "3E-7 2E-7"),
        ("SCAN_DIR", "up"),
        ("DATA_INFO", "\t14\tZ\tm\tfwd\t1.0\t0.0"),
    ];
    let samples: Vec<f32> = (0..6).map(|v| v as f32).collect();
    let bytes = file(&header(&fields), &samples);

    let image = decode(&bytes).unwrap();
    let grid = image.grid("Z", Direction::Forward).unwrap();
    assert_eq!(grid.shape(), &[2, 3]);
    assert_eq!(grid[[1, 2]], 5.0);
}

// =============================================================================
// Body length properties
// =============================================================================

/// Three channels, one bidirectional: required length is
/// 4 * rows * cols * (N + K) with N = 3, K = 1.
fn three_channel_header() -> String {
    header(&[
        ("SCAN_PIXELS", "4 4"),
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", "up"),
        (
            "DATA_INFO",
            "\tChannel\tName\tUnit\tDirection\tCalibration\tOffset\n\
             \t14\tZ\tm\tboth\t1.0\t0.0\n\
             \t0\tCurrent\tA\tfwd\t1.0\t0.0\n\
             \t2\tPhase\tdeg\tbwd\t1.0\t0.0",
        ),
    ])
}

#[test]
fn exact_body_length_decodes() {
    let required = 4 * 4 * 4 * (3 + 1);
    let samples = vec![1.0f32; required / 4];
    let bytes = file(&three_channel_header(), &samples);
    assert!(decode(&bytes).is_ok());
}

#[test]
fn one_byte_short_fails_truncated() {
    let required = 4 * 4 * 4 * (3 + 1);
    let samples = vec![1.0f32; required / 4];
    let mut bytes = file(&three_channel_header(), &samples);
    bytes.pop();

    let result = decode(&bytes);
    match result {
        Err(SxmError::Body(BodyError::Truncated {
            required: r,
            actual,
        })) => {
            assert_eq!(r, required);
            assert_eq!(actual, required - 1);
        }
        other => panic!("expected Truncated, got {other:?}"),
    }
}

#[test]
fn trailing_bytes_warn_but_decode() {
    let required = 4 * 4 * 4 * (3 + 1);
    let samples = vec![1.0f32; required / 4];
    let mut bytes = file(&three_channel_header(), &samples);
    bytes.extend_from_slice(&[0u8; 32]);
    assert!(decode(&bytes).is_ok());
}

// =============================================================================
// Orientation properties
// =============================================================================

fn directional_header(direction: &str) -> String {
    header(&[
        ("SCAN_PIXELS", "2 2"),
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", direction),
        ("DATA_INFO", "\t14\tZ\tm\tfwd\t1.0\t0.0"),
    ])
}

#[test]
fn down_scan_normalizes_to_up_scan_row_order() {
    // Up file stores rows start-of-scan first.
    let up_samples = [0.0f32, 1.0, 2.0, 3.0];
    // The equivalent down file stores the same rows in reverse on-disk order.
    let down_samples = [2.0f32, 3.0, 0.0, 1.0];

    let up = decode(&file(&directional_header("up"), &up_samples)).unwrap();
    let down = decode(&file(&directional_header("down"), &down_samples)).unwrap();

    let up_grid = up.grid("Z", Direction::Forward).unwrap();
    let down_grid = down.grid("Z", Direction::Forward).unwrap();
    assert_eq!(up_grid, down_grid);
    assert_eq!(up_grid[[0, 0]], 0.0);
}

#[test]
fn backward_columns_reversed_match_forward() {
    let fields = [
        ("SCAN_PIXELS", "4 2"),
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", "up"),
        ("DATA_INFO", "\t14\tZ\tm\tboth\t1.0\t0.0"),
    ];
    // Symmetric fixture: the backward sweep re-records the forward samples,
    // so on disk both grids are identical.
    let grid: Vec<f32> = (0..8).map(|v| v as f32).collect();
    let samples: Vec<f32> = grid.iter().chain(grid.iter()).copied().collect();
    let bytes = file(&header(&fields), &samples);

    let image = decode(&bytes).unwrap();
    let forward = image.grid("Z", Direction::Forward).unwrap();
    let backward = image.grid("Z", Direction::Backward).unwrap();

    let columns = forward.shape()[1];
    for r in 0..forward.shape()[0] {
        for c in 0..columns {
            assert_eq!(backward[[r, c]], forward[[r, columns - 1 - c]]);
        }
    }
}

// =============================================================================
// Header error properties
// =============================================================================

#[test]
fn missing_sentinel_is_malformed_header() {
    let bytes = b":SCAN_PIXELS:\n4 4\n:SCAN_DIR:\nup\n".to_vec();
    assert!(matches!(
        decode(&bytes),
        Err(SxmError::Header(HeaderError::Malformed { .. }))
    ));
}

#[test]
fn corrupt_pixel_dimensions_are_invalid_field_format() {
    let fields = [
        ("SCAN_PIXELS", "256 abc"),
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", "up"),
        ("DATA_INFO", "\t14\tZ\tm\tboth\t1.0\t0.0"),
    ];
    let bytes = file(&header(&fields), &[]);
    match decode(&bytes) {
        Err(SxmError::Header(HeaderError::InvalidFieldFormat { key, .. })) => {
            assert_eq!(key, "SCAN_PIXELS");
        }
        other => panic!("expected InvalidFieldFormat, got {other:?}"),
    }
}

#[test]
fn missing_pixel_dimensions_are_missing_required_field() {
    let fields = [
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", "up"),
        ("DATA_INFO", "\t14\tZ\tm\tboth\t1.0\t0.0"),
    ];
    let bytes = file(&header(&fields), &[]);
    assert!(matches!(
        decode(&bytes),
        Err(SxmError::Header(HeaderError::MissingRequiredField {
            key: "SCAN_PIXELS"
        }))
    ));
}

#[test]
fn unknown_keys_are_preserved_as_text() {
    let samples = vec![0.0f32; 16];
    let fields = [
        ("SCAN_PIXELS", "4 4"),
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", "up"),
        ("VENDOR_EXTENSION", "opaque payload"),
        ("DATA_INFO", "\t14\tZ\tm\tfwd\t1.0\t0.0"),
    ];
    let bytes = file(&header(&fields), &samples);

    let image = decode(&bytes).unwrap();
    let value = image.header().get("VENDOR_EXTENSION").unwrap();
    assert_eq!(value.as_text(), Some("opaque payload"));
    assert!(matches!(
        image.header().get("NO_SUCH_KEY"),
        Err(HeaderError::UnknownKey { .. })
    ));
}

// =============================================================================
// Calibration modes
// =============================================================================

#[test]
fn apply_calibration_transforms_samples() {
    let fields = [
        ("SCAN_PIXELS", "2 2"),
        ("SCAN_RANGE", "1E-6 1E-6"),
        ("SCAN_DIR", "up"),
        ("DATA_INFO", "\t14\tZ\tm\tfwd\t2.0\t0.5"),
    ];
    let bytes = file(&header(&fields), &[1.0f32; 4]);

    let stored = SpmImage::from_bytes(&bytes, LoadOptions::default()).unwrap();
    assert_eq!(stored.grid("Z", Direction::Forward).unwrap()[[0, 0]], 1.0);

    let options = LoadOptions {
        calibration: CalibrationMode::Apply,
        ..LoadOptions::default()
    };
    let applied = SpmImage::from_bytes(&bytes, options).unwrap();
    assert_eq!(applied.grid("Z", Direction::Forward).unwrap()[[0, 0]], 2.5);
}

// =============================================================================
// Real-file padding
// =============================================================================

#[test]
fn escape_marker_before_samples_is_skipped() {
    let header_text = directional_header("up");
    let mut bytes = header_text.as_bytes().to_vec();
    bytes.extend_from_slice(b"\n\n\x1a\x04");
    bytes.extend_from_slice(&body(&[0.0, 1.0, 2.0, 3.0]));

    let image = decode(&bytes).unwrap();
    let grid = image.grid("Z", Direction::Forward).unwrap();
    assert_eq!(grid[[0, 0]], 0.0);
    assert_eq!(grid[[1, 1]], 3.0);
}

// =============================================================================
// Loading from disk
// =============================================================================

#[test]
fn load_from_path_and_io_error() {
    let samples: Vec<f32> = (0..64).map(|v| v as f32).collect();
    let bytes = file(&two_channel_header(), &samples);

    let path = std::env::temp_dir().join(format!("sxm-decode-test-{}.sxm", std::process::id()));
    std::fs::write(&path, &bytes).unwrap();

    let image = SpmImage::load(&path).unwrap();
    assert_eq!(image.source(), Some(path.as_path()));
    assert_eq!(image.scan_pixels(), [4, 4]);
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(
        SpmImage::load(&path),
        Err(SxmError::Io { .. })
    ));
}
