pub mod image;
pub mod linkedin;
pub mod text;

pub use self::image::*;
pub use linkedin::*;
pub use text::*;
