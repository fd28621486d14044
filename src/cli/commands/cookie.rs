use clap::{Arg, ArgAction, Command};

pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_COOKIE_HTTP_ONLY: &str = "cookie-http-only";
pub const ARG_COOKIE_SAME_SITE: &str = "cookie-same-site";
pub const ARG_COOKIE_MAX_AGE_SECONDS: &str = "cookie-max-age-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the token cookie Secure (HTTPS only)")
                .env("ENROL_COOKIE_SECURE")
                .default_value("true")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_COOKIE_HTTP_ONLY)
                .long(ARG_COOKIE_HTTP_ONLY)
                .help("Mark the token cookie HttpOnly")
                .env("ENROL_COOKIE_HTTP_ONLY")
                .default_value("true")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SAME_SITE)
                .long(ARG_COOKIE_SAME_SITE)
                .help("SameSite attribute of the token cookie")
                .env("ENROL_COOKIE_SAME_SITE")
                .default_value("lax")
                .value_parser(["strict", "lax", "none"]),
        )
        .arg(
            Arg::new(ARG_COOKIE_MAX_AGE_SECONDS)
                .long(ARG_COOKIE_MAX_AGE_SECONDS)
                .help("Max-Age of the token cookie; session cookie when unset")
                .env("ENROL_COOKIE_MAX_AGE_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
}
