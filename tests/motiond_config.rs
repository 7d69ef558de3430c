use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use motion_kernel::config::MotionConfig;
use motion_kernel::{Connectivity, FrameDims};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "MOTION_CONFIG",
        "MOTION_SOURCE_URL",
        "MOTION_WIDTH",
        "MOTION_HEIGHT",
        "MOTION_FPS",
        "MOTION_MIRROR",
        "MOTION_SCALE",
        "MOTION_WINDOW",
        "MOTION_DIFF_THRESHOLD",
        "MOTION_MIN_AREA",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "url": "stub://porch",
            "target_fps": 15,
            "width": 800,
            "height": 600,
            "mirror": false
        },
        "model": {
            "scale": 4,
            "window": 20
        },
        "detection": {
            "diff_threshold": 25,
            "min_area": 100,
            "connectivity": 4
        },
        "capture": {
            "queue_depth": 3,
            "health_log_secs": 30
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("MOTION_CONFIG", file.path());
    std::env::set_var("MOTION_MIN_AREA", "400");
    std::env::set_var("MOTION_WINDOW", "50");

    let cfg = MotionConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "stub://porch");
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.source.dims(), FrameDims::new(800, 600));
    assert!(!cfg.mirror);
    assert!(cfg.blur);
    assert_eq!(cfg.detection.scale_factor, 4);
    assert_eq!(cfg.working_dims(), FrameDims::new(200, 150));
    assert_eq!(cfg.model.window, 50);
    assert_eq!(cfg.model.resync_interval, 50);
    assert_eq!(cfg.detection.diff_threshold, 25);
    assert_eq!(cfg.detection.min_area, 400);
    assert_eq!(cfg.connectivity, Connectivity::Four);
    assert_eq!(cfg.queue_depth, 3);
    assert_eq!(cfg.health_log_interval, Duration::from_secs(30));

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[source]
url = "stub://garage"
width = 320
height = 240

[model]
window = 10
resync_interval = 0

[detection]
min_area = 50
blur = false
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("MOTION_CONFIG", file.path());

    let cfg = MotionConfig::load().expect("load config");
    assert_eq!(cfg.source.url, "stub://garage");
    assert_eq!(cfg.working_dims(), FrameDims::new(160, 120));
    assert_eq!(cfg.model.window, 10);
    assert_eq!(cfg.model.resync_interval, 0);
    assert_eq!(cfg.detection.min_area, 50);
    assert!(!cfg.blur);
    assert_eq!(cfg.connectivity, Connectivity::Eight);

    clear_env();
}

#[test]
fn defaults_apply_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MotionConfig::load().expect("load config");
    assert_eq!(cfg.source.url, "stub://camera");
    assert_eq!(cfg.working_dims(), FrameDims::new(320, 240));
    assert_eq!(cfg.detection.diff_threshold, 15);
    assert_eq!(cfg.detection.min_area, 250);
    assert!(cfg.mirror);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOTION_WINDOW", "0");
    assert!(MotionConfig::load().is_err());
    clear_env();

    std::env::set_var("MOTION_DIFF_THRESHOLD", "300");
    assert!(MotionConfig::load().is_err());
    clear_env();

    std::env::set_var("MOTION_SCALE", "not-a-number");
    assert!(MotionConfig::load().is_err());
    clear_env();

    std::env::set_var("MOTION_CONFIG", "/nonexistent/motion.json");
    assert!(MotionConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_malformed_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"detection": {"connectivity": 6}}"#)
        .expect("write config");
    std::env::set_var("MOTION_CONFIG", file.path());
    assert!(MotionConfig::load().is_err());

    std::io::Write::write_all(&mut file, b"not json").expect("write config");
    assert!(MotionConfig::load().is_err());

    clear_env();
}
