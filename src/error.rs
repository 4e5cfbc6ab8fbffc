use anyhow::Error;
use colored::Colorize;

/// Adds methods for failing without panic. Like `unwrap` but without panic.
pub trait NiceError<T> {
    /// Fail exiting with `1` printing the error chain, if there is an error. Otherwise return
    /// the content.
    fn nice_unwrap(self) -> T;
}

/// The error and its causes, one per line.
pub fn format_error(error: &Error) -> String {
    let mut lines = vec![format!("{} {}", "error:".red().bold(), error)];
    let mut last = error.to_string();
    for cause in error.chain().skip(1) {
        let cause = cause.to_string();
        // transparent wrappers repeat the message of their source
        if cause != last {
            lines.push(format!("  {} {}", "caused by:".bold(), cause));
        }
        last = cause;
    }
    lines.join("\n")
}

impl<T> NiceError<T> for Result<T, Error> {
    fn nice_unwrap(self) -> T {
        match self {
            Ok(x) => x,
            Err(e) => {
                debug!("{:?}", e);
                eprintln!("{}", format_error(&e));
                std::process::exit(1);
            }
        }
    }
}
