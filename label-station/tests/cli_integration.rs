use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::json;
use tempfile::TempDir;

fn run_station(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_label-station"))
        .args(args)
        .current_dir(cwd)
        .env_remove("LABEL_PRINTER")
        .env("RUST_LOG", "warn")
        .output()
        .expect("run label-station")
}

/// 5.5 x 2 cm label using only the builtin bitmap faces.
fn write_config(dir: &TempDir, printer: serde_json::Value) -> String {
    let config = json!({
        "label": {
            "width": 5.5,
            "height": 2.0,
            "barcode": { "data": "55667788" },
            "lines": [
                { "text": "{barcode}", "font_px": 16 },
                { "text": "Ward 8", "font_px": 12 }
            ]
        },
        "printer": printer,
        "fonts": { "preferred": null, "fallbacks": [] }
    });
    let path = dir.path().join("station.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).expect("write config");
    path.to_string_lossy().into_owned()
}

#[test]
fn preview_writes_render_resolution_png() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, json!({}));
    let out = dir.path().join("preview.png");

    let output = run_station(&["preview", &config, &out.to_string_lossy()], dir.path());
    assert!(output.status.success(), "process failed: {output:?}");

    let img = image::open(&out).expect("open preview").to_luma8();
    assert_eq!(img.dimensions(), (650, 236));
    assert!(img.pixels().any(|p| p.0[0] < 128), "preview has no ink");
}

#[test]
fn print_to_png_backend_uses_device_density() {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("pages");
    let config = write_config(
        &dir,
        json!({ "backend": "png", "device": "proof", "dpi": 600, "output_dir": pages }),
    );

    let output = run_station(&["print", &config], dir.path());
    assert!(output.status.success(), "process failed: {output:?}");

    let page = image::open(pages.join("proof.png")).expect("open page").to_luma8();
    assert_eq!(page.dimensions(), (1299, 472));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("proof.png"), "expected page path, got: {stdout}");
}

#[test]
fn device_flag_and_preview_option() {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("pages");
    let config = write_config(&dir, json!({ "dpi": 300, "output_dir": pages }));
    let preview = dir.path().join("render.png");

    let output = run_station(
        &["print", &config, "--device", "Bench Printer", "--preview", &preview.to_string_lossy()],
        dir.path(),
    );
    assert!(output.status.success(), "process failed: {output:?}");
    assert!(preview.exists());
    let page = image::open(pages.join("Bench_Printer.png")).unwrap().to_luma8();
    assert_eq!(page.dimensions(), (650, 236));
}

#[test]
fn printer_env_overrides_config_device() {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("pages");
    let config = write_config(&dir, json!({ "device": "configured", "output_dir": pages }));

    let output = Command::new(env!("CARGO_BIN_EXE_label-station"))
        .args(["print", &config])
        .current_dir(dir.path())
        .env("LABEL_PRINTER", "from-env")
        .output()
        .expect("run label-station");
    assert!(output.status.success(), "process failed: {output:?}");
    assert!(pages.join("from_env.png").exists());
    assert!(!pages.join("configured.png").exists());
}

#[test]
fn print_without_device_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, json!({}));

    let output = run_station(&["print", &config], dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no printer given"), "unexpected stderr: {stderr}");
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{ "label": { "width": 5.5, "height": 2.0, "barcode": { "data": "" } } }"#,
    )
    .unwrap();

    let output = run_station(&["preview", &path.to_string_lossy(), "out.png"], dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("barcode data is empty"), "unexpected stderr: {stderr}");
}

#[test]
fn printers_command_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_station(&["printers"], dir.path());
    assert!(output.status.success(), "process failed: {output:?}");
}
