use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

use docfill::cli::{Cli, Commands, GlobalOpts};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior so piping into `head` exits quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Init(args) => docfill::cli::commands::init::run(args),
        Commands::Generate(args) => docfill::cli::commands::generate::run(args, &global),
        Commands::Scan(args) => docfill::cli::commands::scan::run(args, &global),
        Commands::Config(cmd) => docfill::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => docfill::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; DOCFILL_LOG overrides the level chosen by -v/-q
fn init_logging(global: &GlobalOpts) {
    let default_level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("DOCFILL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("docfill={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
