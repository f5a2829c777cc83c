use std::env;
use std::fs;
use std::path::Path;

const DEFAULT_MAX_IRQS: usize = 128;
const DEFAULT_MAX_IRQ_HANDLERS: usize = 8;
const DEFAULT_LOG_LEVEL: &str = "info";

fn capacity(var: &str, default: usize) -> usize {
    println!("cargo:rerun-if-env-changed={var}");
    match env::var(var) {
        Ok(raw) => {
            let value: usize = raw
                .trim()
                .parse()
                .unwrap_or_else(|_| panic!("{var} must be an unsigned integer, got {raw:?}"));
            assert!(value > 0, "{var} must be non-zero");
            value
        }
        Err(_) => default,
    }
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let config_rs_path = Path::new(&out_dir).join("config.rs");

    let max_irqs = capacity("METAL_MAX_IRQS", DEFAULT_MAX_IRQS);
    let max_handlers = capacity("METAL_MAX_IRQ_HANDLERS", DEFAULT_MAX_IRQ_HANDLERS);

    println!("cargo:rerun-if-env-changed=METAL_LOG_LEVEL");
    let log_level = env::var("METAL_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());

    let config = format!(
        "/// Number of interrupt vectors in the dispatch table.\n\
         pub const MAX_IRQS: usize = {max_irqs};\n\
         /// Handler slots available to each vector.\n\
         pub const MAX_IRQ_HANDLERS: usize = {max_handlers};\n\
         /// Default log filter, as accepted by `log::LevelFilter::from_str`.\n\
         pub const LOG_LEVEL: &str = {log_level:?};\n"
    );
    fs::write(&config_rs_path, config).expect("Failed to write config.rs to OUT_DIR");

    println!("cargo:rustc-env=CONFIG_RS_PATH={}", config_rs_path.display());
}
