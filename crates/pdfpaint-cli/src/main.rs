mod cli;
mod fonts_cmd;
mod page_range;
mod render_cmd;
mod shared;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            ref file,
            ref pages,
            format,
            unicode_norm,
            max_operators,
            decode_jpeg,
            warnings,
        } => {
            let options = cli::render_options(unicode_norm, max_operators, decode_jpeg);
            render_cmd::run(file, pages.as_deref(), format, &options, warnings)
        }
        Commands::Fonts {
            ref file,
            ref pages,
            format,
            warnings,
        } => fonts_cmd::run(file, pages.as_deref(), format, warnings),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
