use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_pixelwipe")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "pixelwipe.exe"
            } else {
                "pixelwipe"
            });
            p
        })
}

#[test]
fn cli_frame_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let image_path = dir.join("source.png");
    let out_path = dir.join("out.png");
    let config_path = dir.join("config.json");
    let _ = std::fs::remove_file(&out_path);

    let source = image::RgbaImage::from_fn(16, 12, |x, y| {
        image::Rgba([(x * 16) as u8, (y * 20) as u8, 90, 255])
    });
    source.save(&image_path).unwrap();

    let config = pixelwipe::WipeConfig {
        seed: Some(5),
        ..pixelwipe::WipeConfig::default()
    };
    let f = std::fs::File::create(&config_path).unwrap();
    serde_json::to_writer_pretty(f, &config).unwrap();

    let status = std::process::Command::new(exe())
        .args(["frame", "--progress", "1.0"])
        .arg("--image")
        .arg(&image_path)
        .arg("--out")
        .arg(&out_path)
        .arg("--config")
        .arg(&config_path)
        .status()
        .unwrap();

    assert!(status.success());
    let rendered = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(rendered.dimensions(), (16, 12));
    // Progress 1 means a completed reveal: fully opaque everywhere.
    assert!(rendered.pixels().all(|px| px[3] == 255));
}

#[test]
fn cli_rejects_out_of_range_progress() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let image_path = dir.join("source_range.png");
    image::RgbaImage::new(4, 4).save(&image_path).unwrap();

    let status = std::process::Command::new(exe())
        .args(["frame", "--progress", "1.5"])
        .arg("--image")
        .arg(&image_path)
        .arg("--out")
        .arg(dir.join("never.png"))
        .status()
        .unwrap();
    assert!(!status.success());
}
