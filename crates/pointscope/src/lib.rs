#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use pointscope_image as image;

#[doc(inline)]
pub use pointscope_io as io;

#[doc(inline)]
pub use pointscope_calib as calib;

#[doc(inline)]
pub use pointscope_3d as p3d;
