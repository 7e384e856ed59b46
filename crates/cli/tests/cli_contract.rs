use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const ANNOTATIONS: &str = r##"[
    {"kind": "Rect", "x": 100, "y": 50, "width": 200, "height": 100, "stroke": "#e74c3c", "label": "car"},
    {"kind": "circle", "x": 500, "y": 250, "radius": 25, "stroke": "#3498db"},
    {"kind": "Polygon", "x": 0, "y": 0, "stroke": "black"}
]"##;

fn write_annotations(dir: &Path) -> PathBuf {
    let path = dir.join("annotations.json");
    fs::write(&path, ANNOTATIONS).expect("fixture should be written");
    path
}

fn write_png(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("image.png");
    image::RgbImage::new(width, height).save(&path).expect("png should be written");
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should contain valid json")
}

fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|actual| (actual - expected).abs() < 1e-6)
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("annotator-cli")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn fit_reports_scale_and_origin() {
    let output = cargo_bin_cmd!("annotator-cli")
        .args(["fit", "--container", "800x600", "--image-size", "1000x500"])
        .assert()
        .success()
        .get_output()
        .clone();

    let value = stdout_json(&output);
    assert!(approx(&value["fit_scale"], 0.8));
    assert!(approx(&value["image_origin"]["x"], 0.0));
    assert!(approx(&value["image_origin"]["y"], 100.0));
    assert!(approx(&value["displayed_size"]["width"], 800.0));
}

#[test]
fn fit_reads_dimensions_from_image_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let png = write_png(temp.path(), 40, 20);

    let output = cargo_bin_cmd!("annotator-cli")
        .args(["fit", "--container", "400x400", "--image"])
        .arg(&png)
        .assert()
        .success()
        .get_output()
        .clone();

    let value = stdout_json(&output);
    assert!(approx(&value["fit_scale"], 10.0));
    assert!(approx(&value["image_origin"]["y"], 100.0));
}

#[test]
fn fit_rejects_both_image_sources() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let png = write_png(temp.path(), 40, 20);

    cargo_bin_cmd!("annotator-cli")
        .args(["fit", "--container", "400x400", "--image-size", "10x10", "--image"])
        .arg(&png)
        .assert()
        .failure();
}

#[test]
fn fit_fails_for_undecodable_image() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let bogus = temp.path().join("broken.png");
    fs::write(&bogus, b"not an image").expect("fixture should be written");

    cargo_bin_cmd!("annotator-cli")
        .args(["fit", "--container", "400x400", "--image"])
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to decode image"));
}

#[test]
fn project_maps_annotations_to_display_space() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_annotations(temp.path());

    let output = cargo_bin_cmd!("annotator-cli")
        .arg("project")
        .arg(&file)
        .args(["--container", "800x600", "--image-size", "1000x500"])
        .assert()
        .success()
        .get_output()
        .clone();

    let value = stdout_json(&output);
    assert!(approx(&value["stroke_width"], 2.0));
    let annotations = value["annotations"].as_array().expect("annotations array");
    assert_eq!(annotations.len(), 2);

    let rect = &annotations[0];
    assert_eq!(rect["kind"], "Rect");
    assert!(approx(&rect["x"], 80.0));
    assert!(approx(&rect["y"], 140.0));
    assert!(approx(&rect["width"], 160.0));
    assert_eq!(rect["label"], "car");

    let circle = &annotations[1];
    assert_eq!(circle["kind"], "Circle");
    assert!(approx(&circle["radius"], 20.0));
    assert!(approx(&circle["bounds"]["x"], 380.0));
}

#[test]
fn project_honours_config_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_annotations(temp.path());
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{"base_stroke_width": 4.0}"#).expect("config should be written");

    let output = cargo_bin_cmd!("annotator-cli")
        .arg("project")
        .arg(&file)
        .args(["--container", "800x600", "--image-size", "1000x500", "--config"])
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .clone();

    assert!(approx(&stdout_json(&output)["stroke_width"], 4.0));
}

#[test]
fn normalize_drops_unknown_kinds_and_assigns_ids() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_annotations(temp.path());

    let output = cargo_bin_cmd!("annotator-cli")
        .arg("normalize")
        .arg(&file)
        .args(["--image-size", "1000x500"])
        .assert()
        .success()
        .get_output()
        .clone();

    let value = stdout_json(&output);
    let records = value.as_array().expect("record array");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record["id"].is_string()));
    assert_eq!(records[1]["kind"], "Circle");
    assert!(approx(&records[0]["x"], 100.0));
    assert!(approx(&records[1]["radius"], 25.0));
}

#[test]
fn normalize_imports_exported_boxes_as_rects() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_annotations(temp.path());

    let exported = cargo_bin_cmd!("annotator-cli")
        .arg("bbox")
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let boxes = temp.path().join("boxes.json");
    fs::write(&boxes, &exported).expect("boxes should be written");

    let output = cargo_bin_cmd!("annotator-cli")
        .arg("normalize")
        .arg(&boxes)
        .args(["--boxes", "--image-size", "1000x500"])
        .assert()
        .success()
        .get_output()
        .clone();

    let value = stdout_json(&output);
    let records = value.as_array().expect("record array");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record["kind"] == "Rect"));

    let car = &records[0];
    assert!(approx(&car["x"], 100.0));
    assert!(approx(&car["y"], 50.0));
    assert!(approx(&car["width"], 200.0));
    assert!(approx(&car["height"], 100.0));
    assert_eq!(car["label"], "car");

    // The circle comes back as the rectangle that bounded it
    let circle_box = &records[1];
    assert!(approx(&circle_box["x"], 475.0));
    assert!(approx(&circle_box["y"], 225.0));
    assert!(approx(&circle_box["width"], 50.0));
    assert!(approx(&circle_box["height"], 50.0));
}

#[test]
fn normalize_boxes_flips_inverted_boxes() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let boxes = temp.path().join("boxes.json");
    fs::write(
        &boxes,
        r#"[{"id": "box-1", "xmin": 40, "ymin": 30, "xmax": 10, "ymax": 20}, {"xmin": 1}]"#,
    )
    .expect("boxes should be written");

    let output = cargo_bin_cmd!("annotator-cli")
        .arg("normalize")
        .arg(&boxes)
        .args(["--boxes", "--image-size", "100x100"])
        .assert()
        .success()
        .get_output()
        .clone();

    let value = stdout_json(&output);
    let records = value.as_array().expect("record array");
    assert_eq!(records.len(), 1);
    assert!(records[0]["id"].is_string());
    assert_ne!(records[0]["id"], "box-1");
    assert!(approx(&records[0]["x"], 10.0));
    assert!(approx(&records[0]["y"], 20.0));
    assert!(approx(&records[0]["width"], 30.0));
    assert!(approx(&records[0]["height"], 10.0));
}

#[test]
fn bbox_exports_image_space_boxes() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_annotations(temp.path());

    let output = cargo_bin_cmd!("annotator-cli")
        .arg("bbox")
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .clone();

    let value = stdout_json(&output);
    let boxes = value.as_array().expect("box array");
    assert_eq!(boxes.len(), 2);
    assert!(approx(&boxes[0]["xmax"], 300.0));
    assert_eq!(boxes[0]["label"], "car");
    assert!(approx(&boxes[1]["ymin"], 225.0));
}

#[test]
fn bbox_fails_for_missing_file() {
    cargo_bin_cmd!("annotator-cli")
        .arg("bbox")
        .arg("does-not-exist.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn bbox_fails_for_malformed_json() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = temp.path().join("broken.json");
    fs::write(&file, "{\"kind\": ").expect("fixture should be written");

    cargo_bin_cmd!("annotator-cli")
        .arg("bbox")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse annotations"));
}
