//! Integration tests for building tile sets from real image files.
//!
//! Tiles are written as PNGs into temporary directories and probed with
//! [`ImageFileProbe`], exercising the grid, directory, and layout-file paths
//! end to end.

use image::{GrayImage, Luma, RgbImage, Rgb};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tilegrid::config::StitchingParameters;
use tilegrid::layout::{build_from_directory, build_from_layout_file, build_grid, GridLayout, LayoutError};
use tilegrid::models::Dimensionality;
use tilegrid::probe::{ImageFileProbe, PixelType};
use tilegrid::registration::GridRegistration;
use tilegrid::stitch::{run, Backends, StitchJob, TileSource};
use tilegrid::tile_config::{read_tile_configuration, write_initial};
use tilegrid::traversal::{Corner, GridType, TraversalOrder};

fn write_tile(dir: &Path, name: &str, width: u32, height: u32) {
    GrayImage::from_pixel(width, height, Luma([128u8]))
        .save(dir.join(name))
        .expect("should write tile image");
}

fn grid(dir: &Path, grid_type: GridType, size_x: usize, size_y: usize, file_names: &str) -> GridLayout {
    GridLayout {
        grid_type,
        size_x,
        size_y,
        overlap: 0.1,
        first_index: 1,
        first_x: 1,
        first_y: 1,
        file_names: file_names.to_string(),
        directory: dir.to_path_buf(),
    }
}

fn names(paths: impl Iterator<Item = PathBuf>) -> Vec<String> {
    paths.map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect()
}

// ============================================================================
// Grid layouts
// ============================================================================

#[test]
fn test_snake_grid_from_png_tiles() {
    let temp = TempDir::new().expect("should create temp dir");
    for i in 1..=6 {
        write_tile(temp.path(), &format!("tile_{}.png", i), 100, 50);
    }
    let snake = GridType::Sequential { order: TraversalOrder::SnakeByRows, corner: Corner::RightDown };

    let layout = build_grid(&grid(temp.path(), snake, 3, 2, "tile_{i}.png"), &ImageFileProbe)
        .expect("grid should build");
    let tiles = layout.tiles.tiles();

    assert_eq!(
        names(tiles.iter().map(|t| t.path.clone())),
        vec!["tile_1.png", "tile_2.png", "tile_3.png", "tile_6.png", "tile_5.png", "tile_4.png"]
    );
    let indices: Vec<_> = tiles.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 5, 4, 3]);

    let offsets: Vec<_> = tiles.iter().map(|t| t.offset.clone()).collect();
    assert_eq!(
        offsets,
        vec![
            vec![0.0, 0.0],
            vec![90.0, 0.0],
            vec![180.0, 0.0],
            vec![0.0, 45.0],
            vec![90.0, 45.0],
            vec![180.0, 45.0],
        ]
    );

    let summary = layout.summary.expect("grid tiles are probed");
    assert_eq!(summary.dimensionality, Dimensionality::Two);
    assert_eq!(summary.pixel_types, vec![PixelType::Gray8; 6]);
}

#[test]
fn test_grid_offsets_use_smallest_tile() {
    let temp = TempDir::new().expect("should create temp dir");
    write_tile(temp.path(), "t_1.png", 120, 60);
    write_tile(temp.path(), "t_2.png", 100, 80);
    let row = GridType::Sequential { order: TraversalOrder::RowByRow, corner: Corner::RightDown };

    let layout = build_grid(&grid(temp.path(), row, 2, 1, "t_{i}.png"), &ImageFileProbe).expect("grid should build");
    assert_eq!(layout.tiles.tiles()[1].offset, vec![90.0, 0.0]);
}

#[test]
fn test_fixed_position_grid() {
    let temp = TempDir::new().expect("should create temp dir");
    for y in 1..=2 {
        for x in 1..=2 {
            write_tile(temp.path(), &format!("r{:02}_c{:02}.png", y, x), 40, 40);
        }
    }

    let layout = build_grid(&grid(temp.path(), GridType::FixedPosition, 2, 2, "r{yy}_c{xx}.png"), &ImageFileProbe)
        .expect("grid should build");
    let tiles = layout.tiles.tiles();
    assert_eq!(
        names(tiles.iter().map(|t| t.path.clone())),
        vec!["r01_c01.png", "r01_c02.png", "r02_c01.png", "r02_c02.png"]
    );
    assert_eq!(tiles[3].offset, vec![36.0, 36.0]);
    assert_eq!(tiles[2].grid_position.map(|p| (p.x, p.y)), Some((0, 1)));
}

#[test]
fn test_grid_missing_tile_fails() {
    let temp = TempDir::new().expect("should create temp dir");
    write_tile(temp.path(), "tile_1.png", 10, 10);
    let row = GridType::Sequential { order: TraversalOrder::RowByRow, corner: Corner::RightDown };

    let err = build_grid(&grid(temp.path(), row, 2, 1, "tile_{i}.png"), &ImageFileProbe).unwrap_err();
    assert!(matches!(err, LayoutError::Probe(_)));
    assert!(err.to_string().contains("tile_2.png"));
}

#[test]
fn test_grid_rejects_channel_mismatch() {
    let temp = TempDir::new().expect("should create temp dir");
    write_tile(temp.path(), "tile_1.png", 10, 10);
    RgbImage::from_pixel(10, 10, Rgb([1, 2, 3])).save(temp.path().join("tile_2.png")).expect("should write tile");
    let row = GridType::Sequential { order: TraversalOrder::RowByRow, corner: Corner::RightDown };

    let err = build_grid(&grid(temp.path(), row, 2, 1, "tile_{i}.png"), &ImageFileProbe).unwrap_err();
    assert!(matches!(err, LayoutError::ChannelMismatch { expected: 1, found: 3, .. }));
}

// ============================================================================
// Directory layouts
// ============================================================================

#[test]
fn test_directory_with_one_image_fails() {
    let temp = TempDir::new().expect("should create temp dir");
    write_tile(temp.path(), "only.png", 10, 10);
    fs::write(temp.path().join("notes.txt"), "not a tile").expect("should write notes");

    let err = build_from_directory(temp.path(), &ImageFileProbe).unwrap_err();
    assert!(matches!(err, LayoutError::TooFewFiles { found: 1, .. }));
}

#[test]
fn test_directory_ignores_hidden_and_text_files() {
    let temp = TempDir::new().expect("should create temp dir");
    write_tile(temp.path(), "b.png", 10, 10);
    write_tile(temp.path(), "a.png", 12, 10);
    write_tile(temp.path(), ".hidden.png", 10, 10);
    fs::write(temp.path().join("TileConfiguration.TXT"), "dim = 2\n").expect("should write config");
    fs::create_dir(temp.path().join("subdir")).expect("should create subdir");

    let layout = build_from_directory(temp.path(), &ImageFileProbe).expect("directory should build");
    let tiles = layout.tiles.tiles();
    assert_eq!(names(tiles.iter().map(|t| t.path.clone())), vec!["a.png", "b.png"]);
    assert!(tiles.iter().all(|t| t.offset == vec![0.0, 0.0]));
    assert_eq!(tiles[1].index, 1);
}

// ============================================================================
// Layout files
// ============================================================================

#[test]
fn test_written_configuration_rebuilds_same_tiles() {
    let temp = TempDir::new().expect("should create temp dir");
    for i in 1..=4 {
        write_tile(temp.path(), &format!("tile_{}.png", i), 64, 48);
    }
    let columns = GridType::Sequential { order: TraversalOrder::ColumnByColumn, corner: Corner::LeftUp };
    let built = build_grid(&grid(temp.path(), columns, 2, 2, "tile_{i}.png"), &ImageFileProbe)
        .expect("grid should build");

    let config_path = temp.path().join("TileConfiguration.txt");
    write_initial(&config_path, &built.tiles).expect("should write configuration");

    let reloaded = build_from_layout_file(temp.path(), Path::new("TileConfiguration.txt"), Some(&ImageFileProbe))
        .expect("layout file should load");
    let expected: Vec<_> = built.tiles.iter().map(|t| (t.path.clone(), t.offset.clone())).collect();
    let reread: Vec<_> = reloaded.tiles.iter().map(|t| (t.path.clone(), t.offset.clone())).collect();
    assert_eq!(expected, reread);
    assert_eq!(reloaded.summary.map(|s| s.channels), Some(1));
}

#[test]
fn test_layout_file_with_unknown_image_fails_when_probed() {
    let temp = TempDir::new().expect("should create temp dir");
    write_tile(temp.path(), "a.png", 10, 10);
    fs::write(temp.path().join("layout.txt"), "dim = 2\na.png; ; (0, 0)\ngone.png; ; (5, 0)\n")
        .expect("should write layout");

    assert!(build_from_layout_file(temp.path(), Path::new("layout.txt"), None).is_ok());
    let err = build_from_layout_file(temp.path(), Path::new("layout.txt"), Some(&ImageFileProbe)).unwrap_err();
    assert!(matches!(err, LayoutError::Probe(_)));
}

// ============================================================================
// Full run
// ============================================================================

#[test]
fn test_run_with_approximate_registration() {
    let temp = TempDir::new().expect("should create temp dir");
    for i in 1..=4 {
        write_tile(temp.path(), &format!("tile_{:03}.png", i), 200, 100);
    }
    let snake = GridType::Sequential { order: TraversalOrder::SnakeByColumns, corner: Corner::RightDown };
    let job = StitchJob {
        source: TileSource::Grid(grid(temp.path(), snake, 2, 2, "tile_{iii}.png")),
        tile_configuration: "TileConfiguration.txt".to_string(),
        parameters: StitchingParameters::default(),
    };
    let backends = Backends { probe: &ImageFileProbe, registration: &GridRegistration, fusion: None };

    let outcome = run(&job, &backends).expect("run should succeed");
    let initial = read_tile_configuration(&outcome.initial_configuration.expect("initial file written"))
        .expect("initial file parses");
    let registered = read_tile_configuration(&outcome.registered_configuration.expect("registered file written"))
        .expect("registered file parses");

    assert_eq!(initial, registered);
    let names: Vec<_> = initial.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["tile_001.png", "tile_004.png", "tile_002.png", "tile_003.png"]);
    assert_eq!(initial.records[3].coordinates, vec![180.0, 90.0]);
}
