//! Output formatting for CLI.

use ccapi_fetch::ApiError;

use crate::{Cli, OutputFormat};

mod json;
mod text;

pub use json::{JsonFormatter, StatusOutput, TokenOutput};
pub use text::TextFormatter;


/// Prints a command failure: JSON on stdout, text on stderr.
pub fn print_error(error: &anyhow::Error, cli: &Cli) {
    let api_error = error.downcast_ref::<ApiError>();
    match (cli.format, api_error) {
        (OutputFormat::Json, Some(e)) => match JsonFormatter::new(cli.pretty).format_error(e) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error: {error}"),
        },
        (OutputFormat::Text, Some(e)) => {
            eprintln!("Error: {}", TextFormatter::new(!cli.no_color).format_error(e));
        }
        (_, None) => eprintln!("Error: {error:#}"),
    }
}
