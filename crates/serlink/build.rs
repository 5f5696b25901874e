fn main() {
    for (from, to) in [("TARGET", "SERLINK_BUILD_TARGET"), ("PROFILE", "SERLINK_BUILD_PROFILE")] {
        if let Ok(value) = std::env::var(from) {
            println!("cargo:rustc-env={to}={value}");
        }
        println!("cargo:rerun-if-env-changed={from}");
    }
}
