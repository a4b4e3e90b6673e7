use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ConfigError(#[from] crate::config::Error),

    #[error(transparent)]
    ParamError(#[from] crate::params::Error),

    #[error(transparent)]
    RenderError(#[from] crate::render::Error),

    #[cfg(feature = "jack")]
    #[error(transparent)]
    JackError(#[from] crate::jack_host::Error),
}
