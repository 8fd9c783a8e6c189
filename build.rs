fn main() {
    // Reference runtime in C, linked into the test harness to cross-check
    // rounding and formatting against the platform libc.
    cc::Build::new().file("c/rsc_ref.c").compile("rsc_ref");

    // round() lives in libm on Linux
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("linux") {
        println!("cargo:rustc-link-lib=m");
    }

    println!("cargo:rerun-if-changed=c/rsc_ref.h");
    println!("cargo:rerun-if-changed=c/rsc_ref.c");
}
