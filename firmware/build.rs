//! Put `memory.x` where the linker can find it and rebuild when it changes.

use std::{env, fs::File, io::Write, path::PathBuf};

fn main() {
	let out = PathBuf::from(env::var_os("OUT_DIR").unwrap());
	File::create(out.join("memory.x"))
		.unwrap()
		.write_all(include_bytes!("memory.x"))
		.unwrap();
	println!("cargo:rustc-link-search={}", out.display());

	println!("cargo:rerun-if-changed=memory.x");
}
