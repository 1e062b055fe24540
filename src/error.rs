use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the store")]
    Database,
    #[display("command failed")]
    Command,
    /// The command line asked for something that can't be done.
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
}
