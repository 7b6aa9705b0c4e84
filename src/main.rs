//! Binary entry point: resolve configuration, start logging, open the
//! database and bucket, then hand control to the Ratatui event loop.
use clap::Parser;
use orchestra_sheet_music::{
    init_logging, open_database, run_app, App, AppConfig, Catalog, CliArgs, LocalBucket, Session,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = AppConfig::resolve(&args)?;
    init_logging(&config)?;
    info!(
        data_dir = %config.data_dir.display(),
        account = %config.account,
        "starting sheet-music manager"
    );

    let conn = open_database(&config.database_path)?;
    let bucket = LocalBucket::open(&config.bucket_root, &config.bucket_name)?;
    info!(bucket = bucket.name(), "opened bucket");
    let session = Session::new(config.account.clone())?;

    let mut app = App::new(Catalog::new(conn, bucket), session)?;
    let result = run_app(&mut app);
    info!("sheet-music manager exited");
    result
}
