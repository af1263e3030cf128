use camino::Utf8PathBuf;

#[derive(clap::Parser)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[clap(long, default_value = "media-catalog.toml")]
    pub config: Utf8PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Rescan the music directory and exit.
    Scan,
    /// Rescan (if needed) and serve the media-sharing and RSP protocols over HTTP.
    Serve,
}
