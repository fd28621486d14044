pub mod cookie;
pub mod logging;
pub mod provider;

use crate::enrol::keys::DEFAULT_KEY_PATH;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const CMD_KEYGEN: &str = "keygen";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("enrol")
        .about("Endpoint registration gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_negates_reqs(true)
        .subcommand(
            Command::new(CMD_KEYGEN)
                .about(format!("Generate a P-256 private key at {DEFAULT_KEY_PATH}")),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("ENROL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("private-key")
                .long("private-key")
                .help("EC private key, SEC1 PEM text (see `enrol keygen`)")
                .env("ENROL_PRIVATE_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "PostgreSQL connection string. When unset, registrations are kept in memory and lost on restart.",
                )
                .env("ENROL_DSN"),
        )
        .arg(
            Arg::new("registration-key")
                .long("registration-key")
                .help("Key registrations by the resolved identity or by the credential")
                .env("ENROL_REGISTRATION_KEY")
                .default_value("identity")
                .value_parser(["identity", "credential"]),
        )
        .arg(
            Arg::new("assets-dir")
                .long("assets-dir")
                .help("Directory served for paths not matched by the API")
                .env("ENROL_ASSETS_DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        );

    let command = provider::with_args(command);
    let command = cookie::with_args(command);
    logging::with_args(command)
}
