fn main() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=SHEETGRADE_BUILD_PROFILE={profile}");
    println!("cargo:rerun-if-changed=build.rs");
}
