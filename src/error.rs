//! Binary Error Types
//!
//! Anything that reaches `main` as an error is fatal and exits with status 1.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not set up the photo service client")]
    Client,
    #[display("could not open the output directory")]
    Output,
    #[display("no folder cache available; run `albumlink cache` first")]
    NeedCache,
    #[display("could not write the folder cache")]
    SaveCache,
    #[display("no user could be processed")]
    NoUsers,
}
