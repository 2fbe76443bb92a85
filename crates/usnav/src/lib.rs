#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use usnav_pose as pose;

#[doc(inline)]
pub use usnav_io as io;

#[doc(inline)]
pub use usnav_nav as nav;
