use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Rectangle {width}x{height} does not fit a {bin_width}x{bin_height} texture")]
    Oversize {
        width: u32,
        height: u32,
        bin_width: u32,
        bin_height: u32,
    },
    #[error("Texture limit reached: placed {placed} of {total} rectangles")]
    PackingExhausted { placed: usize, total: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid character range: {0}")]
    InvalidRange(String),
    #[error("Font error: {0}")]
    Font(String),
    #[error("Nothing to pack")]
    Empty,
}

pub type Result<T> = std::result::Result<T, AtlasError>;
