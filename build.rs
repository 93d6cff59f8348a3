fn exactly_one<const N: usize>(options: [(bool, &'static str); N]) -> Option<&'static str> {
    let mut selected = None;
    for (enabled, name) in options {
        if enabled {
            if selected.is_some() {
                return None;
            }
            selected = Some(name);
        }
    }
    selected
}

fn main() {
    if !cfg!(feature = "esp32s3") {
        panic!("The MCU must be selected via its Cargo feature (esp32s3)");
    }

    // The gauge family decides which registers are polled and the GaugeType
    // label the host sees.
    let Some(gauge_type) = exactly_one([
        (cfg!(feature = "gauge_smbus"), "SMBus Standard"),
        (cfg!(feature = "gauge_bq"), "TI BQ Series"),
    ]) else {
        panic!(
            "Exactly 1 gauge variant must be selected via its Cargo feature (gauge_smbus, gauge_bq)"
        );
    };

    // Trigger mechanisms are mutually exclusive polling strategies.
    let Some(trigger) = exactly_one([
        (cfg!(feature = "trigger_serial"), "serial"),
        (cfg!(feature = "trigger_timer"), "timer"),
    ]) else {
        panic!(
            "Exactly 1 trigger must be selected via its Cargo feature (trigger_serial, trigger_timer)"
        );
    };

    if cfg!(feature = "defmt") {
        println!("cargo:rustc-link-arg=-Tdefmt.x");
    }

    let pkg_version = env!("CARGO_PKG_VERSION");
    let git_hash_bytes = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .map(|output| output.stdout)
        .unwrap_or_default();

    let git_hash = std::str::from_utf8(&git_hash_bytes).unwrap_or("").trim();
    if git_hash.is_empty() {
        println!("cargo:rustc-env=FW_VERSION={pkg_version}");
    } else {
        println!("cargo:rustc-env=FW_VERSION={pkg_version}-{git_hash}");
    }

    println!("cargo:rustc-env=GAUGE_TYPE={gauge_type}");
    println!("cargo:rustc-env=TRIGGER_VARIANT={trigger}");
}
