fn main() -> Result<(), eframe::Error> {
    // Set up logging; RUST_LOG controls verbosity
    env_logger::init();

    // File dialogs and export run on Tokio; keep a runtime entered for the app's lifetime
    let runtime = tokio::runtime::Runtime::new().map_err(|e| eframe::Error::AppCreation(Box::new(e)))?;
    let _guard = runtime.enter();

    floorplan_measure::run_app()
}
