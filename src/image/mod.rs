pub mod f32;
pub mod io;
pub mod mask;

pub use self::f32::ImageF32;
pub use self::io::{load_grayscale, save_grayscale, save_mask, write_json_file};
pub use self::mask::MaskU8;
