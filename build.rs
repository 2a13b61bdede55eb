fn main() {
    // The headless library has no Tauri context to generate.
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
