//! Selects the linker memory map of the demo board.

use std::{env, fs, path::PathBuf};

const DISCO_MEMORY: &str = "MEMORY
{
  FLASH : ORIGIN = 0x08000000, LENGTH = 64K
  RAM : ORIGIN = 0x20000000, LENGTH = 12K
}
";

const EVAL_MEMORY: &str = "MEMORY
{
  FLASH : ORIGIN = 0x08000000, LENGTH = 256K
  RAM : ORIGIN = 0x20000000, LENGTH = 32K
}
";

fn main() {
    let memory: &str = if env::var_os("CARGO_FEATURE_STM32373C_EVAL").is_some() {
        EVAL_MEMORY
    } else {
        DISCO_MEMORY
    };

    let out: PathBuf = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out.join("memory.x"), memory).expect("failed to write memory.x");
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=build.rs");
}
